//! A small console host: one singleton greeter, one scoped writer per "request".
//!
//! Run with `RUST_LOG=fibre_di=trace` to see the container's own events.

use fibre_di::{Constructor, Dispose, DisposeError, Implementation, ServiceCollection};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

trait Greeter: Send + Sync {
  fn greet(&self, name: &str) -> String;
}

#[derive(Default)]
struct HelloGreeter;

impl Greeter for HelloGreeter {
  fn greet(&self, name: &str) -> String {
    format!("Hello, {name}!")
  }
}

// Writes greetings prefixed with the time the scope started.
struct TodayWriter {
  greeter: Arc<dyn Greeter>,
  started: u64,
  lines: AtomicUsize,
}

impl TodayWriter {
  fn write(&self, name: &str) {
    self.lines.fetch_add(1, Ordering::Relaxed);
    println!("[{}] {}", self.started, self.greeter.greet(name));
  }
}

impl Dispose for TodayWriter {
  fn dispose(&self) -> Result<(), DisposeError> {
    println!("writer closed after {} line(s)", self.lines.load(Ordering::Relaxed));
    Ok(())
  }
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let mut services = ServiceCollection::new();
  services
    .add_singleton_trait::<dyn Greeter, _>(Implementation::<HelloGreeter>::from_default(), |g| g)
    .add_scoped(
      Implementation::<TodayWriter>::new()
        .constructor(
          Constructor::new(|args| {
            let started = SystemTime::now()
              .duration_since(UNIX_EPOCH)
              .map(|d| d.as_secs())
              .unwrap_or_default();
            Ok(TodayWriter {
              greeter: args.required::<dyn Greeter>()?,
              started,
              lines: AtomicUsize::new(0),
            })
          })
          .param::<dyn Greeter>(),
        )
        .disposable(),
    );

  let provider = match services.build() {
    Ok(provider) => provider,
    Err(err) => {
      eprintln!("invalid registrations: {err}");
      std::process::exit(1);
    }
  };

  for request in ["Ada", "Grace"] {
    let result = provider.with_scope(|scope| {
      let writer = scope.get::<TodayWriter>()?;
      writer.write(request);
      writer.write("again");
      Ok::<_, fibre_di::ResolveError>(())
    });
    if let Err(err) = result.and_then(|inner| inner) {
      eprintln!("request failed: {err}");
    }
  }

  let report = provider.dispose();
  println!("released {} singleton(s), {} fault(s)", report.released(), report.faults().len());
}

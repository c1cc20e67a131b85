//! Release hooks and the fault barrier used when a resolver disposes its cache.

use crate::core::Instance;
use crate::error::{DisposeError, ReleaseFault};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Implemented by services that hold resources needing explicit teardown.
///
/// Register the implementation with
/// [`Implementation::disposable`](crate::Implementation::disposable) so the
/// owning resolver calls `dispose` when it is itself disposed. Transient
/// instances are never tracked and therefore never disposed by the container.
pub trait Dispose: Send + Sync {
  fn dispose(&self) -> Result<(), DisposeError>;
}

/// Outcome of disposing a resolver.
///
/// Faults are reported here instead of being propagated: one failing release
/// hook never prevents the remaining instances from being released.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisposeReport {
  released: usize,
  faults: Vec<ReleaseFault>,
}

impl DisposeReport {
  /// Number of release hooks that completed successfully.
  pub fn released(&self) -> usize {
    self.released
  }

  pub fn faults(&self) -> &[ReleaseFault] {
    &self.faults
  }

  pub fn is_clean(&self) -> bool {
    self.faults.is_empty()
  }
}

/// Runs every release hook, newest instance first, isolating each failure.
pub(crate) fn release_all(owner: &str, mut instances: Vec<Instance>) -> DisposeReport {
  instances.sort_by(|a, b| b.sequence().cmp(&a.sequence()));

  let mut report = DisposeReport::default();
  for instance in &instances {
    let Some(hook) = instance.release_hook() else {
      continue;
    };

    let message = match panic::catch_unwind(AssertUnwindSafe(|| hook())) {
      Ok(Ok(())) => {
        report.released += 1;
        continue;
      }
      Ok(Err(err)) => err.to_string(),
      Err(payload) => format!("release hook panicked: {}", panic_message(payload.as_ref())),
    };

    let fault = ReleaseFault {
      contract: instance.contract().type_name(),
      implementation: instance.implementation().type_name(),
      message,
    };
    tracing::error!(
      owner,
      contract = fault.contract,
      implementation = fault.implementation,
      error = %fault.message,
      "release hook failed during disposal"
    );
    report.faults.push(fault);
  }
  report
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
  if let Some(message) = payload.downcast_ref::<&'static str>() {
    message
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.as_str()
  } else {
    "unknown panic payload"
  }
}

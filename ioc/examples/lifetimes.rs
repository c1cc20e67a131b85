use fibre_di::{Constructor, Implementation, ServiceCollection};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

// A simple service that gets a unique ID upon creation.
struct RequestTracker {
  id: usize,
}

// Distinct contracts so one tracker type can be registered under each lifetime.
struct SingletonTracker(RequestTracker);
struct TransientTracker(RequestTracker);
struct ScopedTracker(RequestTracker);

// A global, thread-safe counter to generate unique IDs.
static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn next_tracker(kind: &str) -> RequestTracker {
  println!("Creating {kind} RequestTracker...");
  RequestTracker {
    id: ID_COUNTER.fetch_add(1, Ordering::SeqCst),
  }
}

fn main() {
  let mut services = ServiceCollection::new();
  services
    // This factory will only be called ONCE per provider.
    .add_singleton(
      Implementation::<SingletonTracker>::new()
        .constructor(Constructor::new(|_| Ok(SingletonTracker(next_tracker("SINGLETON"))))),
    )
    // This factory will be called EVERY time the service is resolved.
    .add_transient(
      Implementation::<TransientTracker>::new()
        .constructor(Constructor::new(|_| Ok(TransientTracker(next_tracker("TRANSIENT"))))),
    )
    // This factory will be called once per scope.
    .add_scoped(
      Implementation::<ScopedTracker>::new()
        .constructor(Constructor::new(|_| Ok(ScopedTracker(next_tracker("SCOPED"))))),
    );
  let provider = services.build().expect("registrations are valid");

  println!("--- Resolving Singletons ---");
  let s1 = provider.get::<SingletonTracker>().unwrap();
  let s2 = provider.get::<SingletonTracker>().unwrap();
  println!("Singleton 1 ID: {}, Singleton 2 ID: {}", s1.0.id, s2.0.id);
  assert!(Arc::ptr_eq(&s1, &s2), "Singleton instances should be identical");
  println!("Singleton instances are the same pointer, as expected.\n");

  println!("--- Resolving Transients ---");
  let t1 = provider.get::<TransientTracker>().unwrap();
  let t2 = provider.get::<TransientTracker>().unwrap();
  println!("Transient 1 ID: {}, Transient 2 ID: {}", t1.0.id, t2.0.id);
  assert!(!Arc::ptr_eq(&t1, &t2), "Transient instances should be different");
  println!("Transient instances are different pointers, as expected.\n");

  println!("--- Resolving Scoped ---");
  match provider.get::<ScopedTracker>() {
    Err(err) => println!("From the root: {err}"),
    Ok(_) => unreachable!("scoped services are not available from the root"),
  }
  let first = provider.create_scope().unwrap();
  let second = provider.create_scope().unwrap();
  let a1 = first.get::<ScopedTracker>().unwrap();
  let a2 = first.get::<ScopedTracker>().unwrap();
  let b = second.get::<ScopedTracker>().unwrap();
  println!("Scope 1 IDs: {}, {}; Scope 2 ID: {}", a1.0.id, a2.0.id, b.0.id);
  assert!(Arc::ptr_eq(&a1, &a2));
  assert!(!Arc::ptr_eq(&a1, &b));
  println!("One instance per scope, as expected.");
}

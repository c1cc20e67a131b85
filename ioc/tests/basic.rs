use fibre_di::{resolve, Constructor, Implementation, ResolveError, ServiceCollection};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// --- Test Fixtures ---

// The trait must be Send + Sync for the container to accept it.
trait Greeter: Send + Sync {
  fn greet(&self) -> String;
}

#[derive(Default)]
struct EnglishGreeter;
impl Greeter for EnglishGreeter {
  fn greet(&self) -> String {
    "Hello!".to_string()
  }
}

// A simple struct for testing.
#[derive(Debug, PartialEq, Eq)]
struct SimpleService {
  id: u32,
}

fn counting_service(counter: &'static AtomicU32) -> Implementation<SimpleService> {
  Implementation::new().constructor(Constructor::new(move |_| {
    Ok(SimpleService {
      id: counter.fetch_add(1, Ordering::SeqCst),
    })
  }))
}

// --- Basic Tests ---

#[test]
fn test_singleton_resolves_same_instance() {
  // Arrange
  static COUNTER: AtomicU32 = AtomicU32::new(101);
  let mut services = ServiceCollection::new();
  services.add_singleton(counting_service(&COUNTER));
  let provider = services.build().unwrap();

  // Act
  let r1 = provider.get::<SimpleService>().unwrap();
  let r2 = provider.get::<SimpleService>().unwrap();

  // Assert
  assert_eq!(r1.id, 101);
  // Ensure it's a singleton by checking pointer equality.
  assert!(Arc::ptr_eq(&r1, &r2));
}

#[test]
fn test_transient_resolves_distinct_instances() {
  // Arrange
  static COUNTER: AtomicU32 = AtomicU32::new(0);
  let mut services = ServiceCollection::new();
  services.add_transient(counting_service(&COUNTER));
  let provider = services.build().unwrap();

  // Act
  let r1 = provider.get::<SimpleService>().unwrap();
  let r2 = provider.get::<SimpleService>().unwrap();

  // Assert
  assert_eq!(r1.id, 0);
  assert_eq!(r2.id, 1);
  // Ensure it's a transient by checking the pointers are different.
  assert!(!Arc::ptr_eq(&r1, &r2));
}

#[test]
fn test_trait_resolution() {
  // Arrange
  let mut services = ServiceCollection::new();
  services.add_singleton_trait::<dyn Greeter, _>(Implementation::<EnglishGreeter>::from_default(), |g| g);
  let provider = services.build().unwrap();

  // Act
  let greeter = provider.get::<dyn Greeter>().unwrap();

  // Assert
  assert_eq!(greeter.greet(), "Hello!");
  assert!(provider.contains::<dyn Greeter>());
  assert!(!provider.contains::<EnglishGreeter>());
}

#[test]
fn test_unregistered_service_is_an_error() {
  struct MissingService;
  let provider = ServiceCollection::new().build().unwrap();

  let err = provider.get::<MissingService>().err().unwrap();

  assert_eq!(
    err,
    ResolveError::UnregisteredService {
      contract: std::any::type_name::<MissingService>(),
    }
  );
}

#[test]
fn test_unregistered_dependency_fails_the_constructor() {
  // A required parameter with no registration leaves no usable constructor.
  struct Missing;
  struct NeedsMissing {
    _missing: Arc<Missing>,
  }

  let mut services = ServiceCollection::new();
  services.add_transient(Implementation::<NeedsMissing>::new().constructor(
    Constructor::new(|args| {
      Ok(NeedsMissing {
        _missing: args.required::<Missing>()?,
      })
    })
    .param::<Missing>(),
  ));
  let provider = services.build().unwrap();

  assert!(matches!(
    provider.get::<NeedsMissing>(),
    Err(ResolveError::NoResolvableConstructor { .. })
  ));
}

#[test]
fn test_independent_containers_do_not_share_registrations() {
  // Arrange
  let mut first = ServiceCollection::new();
  first.add_singleton_trait::<dyn Greeter, _>(Implementation::<EnglishGreeter>::from_default(), |g| g);
  let first = first.build().unwrap();
  let second = ServiceCollection::new().build().unwrap();

  // Act & Assert
  assert_eq!(first.get::<dyn Greeter>().unwrap().greet(), "Hello!");
  assert!(second.get::<dyn Greeter>().is_err());
}

#[test]
#[should_panic(expected = "Failed to resolve required service")]
fn test_resolve_panics_on_missing_concrete_service() {
  struct MissingService;
  let provider = ServiceCollection::new().build().unwrap();
  resolve!(provider, MissingService);
}

#[test]
#[should_panic(expected = "Failed to resolve required trait service")]
fn test_resolve_panics_on_missing_trait_service() {
  // The test trait must also be Send + Sync to be a valid type for `get`.
  trait MissingTrait: Send + Sync {}
  let provider = ServiceCollection::new().build().unwrap();
  resolve!(provider, trait MissingTrait);
}

use thiserror::Error;

/// The error type a release hook may return.
pub type DisposeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by [`ServiceCollection::build`](crate::ServiceCollection::build).
///
/// A failed build produces no provider and leaves the collection untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
  /// The implementation registered for a contract is abstract.
  #[error("implementation '{implementation}' registered for '{contract}' is not instantiable")]
  NotInstantiable {
    contract: &'static str,
    implementation: &'static str,
  },

  /// The implementation declares no public constructor.
  #[error("implementation '{implementation}' registered for '{contract}' has no public constructor")]
  NoPublicConstructor {
    contract: &'static str,
    implementation: &'static str,
  },

  /// The contract was registered more than once under `DuplicatePolicy::Reject`.
  #[error("contract '{contract}' is registered {count} times")]
  DuplicateRegistration { contract: &'static str, count: usize },
}

/// Errors raised while resolving or constructing a service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
  #[error("service '{contract}' is not registered")]
  UnregisteredService { contract: &'static str },

  #[error("no constructor of '{implementation}' can be satisfied by the registered services")]
  NoResolvableConstructor { implementation: &'static str },

  #[error("'{implementation}' has several equally specific constructors with different parameter types")]
  AmbiguousConstructor { implementation: &'static str },

  #[error("scoped service '{contract}' cannot be resolved from the root provider")]
  ScopedFromRoot { contract: &'static str },

  #[error("nested scopes are not supported")]
  NestedScopeUnsupported,

  #[error("the resolver has been disposed")]
  ResolverDisposed,

  #[error("circular dependency detected: {cycle}")]
  CyclicDependency { cycle: String },

  /// A constructor asked for an argument its declaration does not provide.
  #[error("constructor of '{implementation}' requested argument {position} as '{expected}', which was not supplied")]
  ArgumentMismatch {
    implementation: &'static str,
    position: usize,
    expected: &'static str,
  },

  #[error("instance produced for '{contract}' has an unexpected type")]
  TypeMismatch { contract: &'static str },
}

/// A release hook that failed during disposal.
///
/// Faults are logged and collected into a
/// [`DisposeReport`](crate::DisposeReport); they never abort the disposal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("releasing '{implementation}' (as '{contract}') failed: {message}")]
pub struct ReleaseFault {
  pub contract: &'static str,
  pub implementation: &'static str,
  pub message: String,
}

/// A specialized `Result` type for resolution.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;

//! The service collection and the validated registration table it builds.

use crate::core::ServiceKey;
use crate::descriptor::{Lifetime, ServiceDescriptor};
use crate::error::BuildError;
use crate::implementation::{Implementation, TypeKind};
use crate::options::{ContainerOptions, DuplicatePolicy};
use crate::provider::ServiceProvider;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// An ordered collection of service registrations.
///
/// Populate it, then call [`build`](Self::build) to validate every descriptor
/// and obtain the root [`ServiceProvider`].
///
/// ```
/// use fibre_di::{Implementation, ServiceCollection};
///
/// #[derive(Default)]
/// struct Clock;
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Implementation::<Clock>::from_default());
///
/// let provider = services.build().unwrap();
/// let a = provider.get::<Clock>().unwrap();
/// let b = provider.get::<Clock>().unwrap();
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// ```
#[derive(Default)]
pub struct ServiceCollection {
  descriptors: Vec<Arc<ServiceDescriptor>>,
  options: ContainerOptions,
}

impl ServiceCollection {
  /// Creates a new, empty collection with default options.
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_options(options: ContainerOptions) -> Self {
    Self {
      descriptors: Vec::new(),
      options,
    }
  }

  pub fn options(&self) -> &ContainerOptions {
    &self.options
  }

  // --- Registration ---

  /// Registers `I` as the implementation of contract `C`.
  ///
  /// `upcast` converts the concrete instance to the contract; for a trait
  /// object contract the identity closure `|i| i` performs the coercion.
  pub fn register<C, I>(
    &mut self,
    lifetime: Lifetime,
    implementation: Implementation<I>,
    upcast: fn(Arc<I>) -> Arc<C>,
  ) -> &mut Self
  where
    C: ?Sized + Any + Send + Sync,
    I: ?Sized + Any + Send + Sync,
  {
    self
      .descriptors
      .push(Arc::new(ServiceDescriptor::new(lifetime, implementation, upcast)));
    self
  }

  pub fn add_singleton<I: ?Sized + Any + Send + Sync>(&mut self, implementation: Implementation<I>) -> &mut Self {
    self.register::<I, I>(Lifetime::Singleton, implementation, |instance| instance)
  }

  pub fn add_transient<I: ?Sized + Any + Send + Sync>(&mut self, implementation: Implementation<I>) -> &mut Self {
    self.register::<I, I>(Lifetime::Transient, implementation, |instance| instance)
  }

  pub fn add_scoped<I: ?Sized + Any + Send + Sync>(&mut self, implementation: Implementation<I>) -> &mut Self {
    self.register::<I, I>(Lifetime::Scoped, implementation, |instance| instance)
  }

  pub fn add_singleton_trait<C, I>(&mut self, implementation: Implementation<I>, upcast: fn(Arc<I>) -> Arc<C>) -> &mut Self
  where
    C: ?Sized + Any + Send + Sync,
    I: ?Sized + Any + Send + Sync,
  {
    self.register(Lifetime::Singleton, implementation, upcast)
  }

  pub fn add_transient_trait<C, I>(&mut self, implementation: Implementation<I>, upcast: fn(Arc<I>) -> Arc<C>) -> &mut Self
  where
    C: ?Sized + Any + Send + Sync,
    I: ?Sized + Any + Send + Sync,
  {
    self.register(Lifetime::Transient, implementation, upcast)
  }

  pub fn add_scoped_trait<C, I>(&mut self, implementation: Implementation<I>, upcast: fn(Arc<I>) -> Arc<C>) -> &mut Self
  where
    C: ?Sized + Any + Send + Sync,
    I: ?Sized + Any + Send + Sync,
  {
    self.register(Lifetime::Scoped, implementation, upcast)
  }

  // --- Inspection ---

  pub fn len(&self) -> usize {
    self.descriptors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.descriptors.is_empty()
  }

  /// Descriptors in registration order.
  pub fn descriptors(&self) -> impl Iterator<Item = &ServiceDescriptor> {
    self.descriptors.iter().map(Arc::as_ref)
  }

  pub fn contains<C: ?Sized + Any>(&self) -> bool {
    let key = ServiceKey::of::<C>();
    self.descriptors.iter().any(|d| d.contract() == key)
  }

  // --- Build ---

  /// Validates every registration and returns the root provider.
  ///
  /// On failure nothing is built and the collection is left as it was, so the
  /// offending registration can be corrected and `build` retried.
  pub fn build(&self) -> Result<ServiceProvider, BuildError> {
    let registrations = Registrations::validate(self.descriptors.clone(), self.options.clone())?;
    tracing::debug!(
      descriptors = registrations.len(),
      contracts = registrations.index.len(),
      "built service provider"
    );
    Ok(ServiceProvider::new(Arc::new(registrations)))
  }
}

/// The validated, read-only descriptor set owned by a root provider.
pub(crate) struct Registrations {
  descriptors: Vec<Arc<ServiceDescriptor>>,
  index: HashMap<ServiceKey, usize>,
  options: ContainerOptions,
}

impl Registrations {
  fn validate(descriptors: Vec<Arc<ServiceDescriptor>>, options: ContainerOptions) -> Result<Self, BuildError> {
    for descriptor in &descriptors {
      let implementation = descriptor.implementation();
      let contract = descriptor.contract().type_name();
      let implementation_name = implementation.key().type_name();

      if implementation.kind() == TypeKind::Abstract {
        return Err(BuildError::NotInstantiable {
          contract,
          implementation: implementation_name,
        });
      }
      if implementation.public_constructors().next().is_none() {
        return Err(BuildError::NoPublicConstructor {
          contract,
          implementation: implementation_name,
        });
      }
    }

    let mut index = HashMap::with_capacity(descriptors.len());
    for (position, descriptor) in descriptors.iter().enumerate() {
      match options.duplicate_policy {
        DuplicatePolicy::FirstWins => {
          index.entry(descriptor.contract()).or_insert(position);
        }
        DuplicatePolicy::LastWins => {
          index.insert(descriptor.contract(), position);
        }
        DuplicatePolicy::Reject => {
          if index.insert(descriptor.contract(), position).is_some() {
            let contract = descriptor.contract();
            return Err(BuildError::DuplicateRegistration {
              contract: contract.type_name(),
              count: descriptors.iter().filter(|d| d.contract() == contract).count(),
            });
          }
        }
      }
    }

    Ok(Self {
      descriptors,
      index,
      options,
    })
  }

  /// The descriptor answering lookups for `key`, per the duplicate policy.
  pub(crate) fn lookup(&self, key: &ServiceKey) -> Option<&Arc<ServiceDescriptor>> {
    self.index.get(key).map(|&position| &self.descriptors[position])
  }

  pub(crate) fn contains(&self, key: &ServiceKey) -> bool {
    self.index.contains_key(key)
  }

  pub(crate) fn options(&self) -> &ContainerOptions {
    &self.options
  }

  pub(crate) fn len(&self) -> usize {
    self.descriptors.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::implementation::Constructor;
  use pretty_assertions::assert_eq;

  trait Shape: Send + Sync {
    fn corners(&self) -> u32;
  }

  #[derive(Default)]
  struct Square;
  impl Shape for Square {
    fn corners(&self) -> u32 {
      4
    }
  }

  #[derive(Default)]
  struct Triangle;
  impl Shape for Triangle {
    fn corners(&self) -> u32 {
      3
    }
  }

  fn shapes(options: ContainerOptions) -> ServiceCollection {
    let mut services = ServiceCollection::with_options(options);
    services
      .add_singleton_trait::<dyn Shape, _>(Implementation::<Square>::from_default(), |s| s)
      .add_singleton_trait::<dyn Shape, _>(Implementation::<Triangle>::from_default(), |s| s);
    services
  }

  #[test]
  fn abstract_implementation_is_not_instantiable() {
    let mut services = ServiceCollection::new();
    services.add_singleton(Implementation::<dyn Shape>::abstract_type());

    let err = services.build().err().unwrap();
    assert!(matches!(err, BuildError::NotInstantiable { .. }));
  }

  #[test]
  fn private_only_constructors_are_rejected() {
    struct Hidden;
    let mut services = ServiceCollection::new();
    services.add_transient(Implementation::<Hidden>::new().constructor(Constructor::new(|_| Ok(Hidden)).private()));

    let err = services.build().err().unwrap();
    assert_eq!(
      err,
      BuildError::NoPublicConstructor {
        contract: std::any::type_name::<Hidden>(),
        implementation: std::any::type_name::<Hidden>(),
      }
    );
  }

  #[test]
  fn implementation_without_constructors_is_rejected() {
    struct Bare;
    let mut services = ServiceCollection::new();
    services.add_transient(Implementation::<Bare>::new());
    assert!(matches!(services.build(), Err(BuildError::NoPublicConstructor { .. })));
  }

  #[test]
  fn failed_build_has_no_side_effects() {
    let mut services = ServiceCollection::new();
    services.add_singleton(Implementation::<Square>::from_default());
    services.add_singleton(Implementation::<dyn Shape>::abstract_type());

    let first = services.build().err().unwrap();
    let second = services.build().err().unwrap();
    assert_eq!(first, second);
    assert_eq!(services.len(), 2);
  }

  #[test]
  fn valid_collection_builds_repeatedly() {
    let services = shapes(ContainerOptions::default());
    let a = services.build().unwrap();
    let b = services.build().unwrap();
    // Independent providers never share singletons.
    assert!(!Arc::ptr_eq(&a.get::<dyn Shape>().unwrap(), &b.get::<dyn Shape>().unwrap()));
  }

  #[test]
  fn first_registration_wins_by_default() {
    let provider = shapes(ContainerOptions::default()).build().unwrap();
    assert_eq!(provider.get::<dyn Shape>().unwrap().corners(), 4);
  }

  #[test]
  fn last_registration_wins_when_configured() {
    let options = ContainerOptions::default().duplicate_policy(DuplicatePolicy::LastWins);
    let provider = shapes(options).build().unwrap();
    assert_eq!(provider.get::<dyn Shape>().unwrap().corners(), 3);
  }

  #[test]
  fn duplicates_fail_the_build_when_rejected() {
    let options = ContainerOptions::default().duplicate_policy(DuplicatePolicy::Reject);
    let err = shapes(options).build().err().unwrap();
    assert_eq!(
      err,
      BuildError::DuplicateRegistration {
        contract: std::any::type_name::<dyn Shape>(),
        count: 2,
      }
    );
  }

  #[test]
  fn inspection_reflects_registration_order() {
    let services = shapes(ContainerOptions::default());
    assert_eq!(services.len(), 2);
    assert!(!services.is_empty());
    assert!(services.contains::<dyn Shape>());
    assert!(!services.contains::<Square>());

    let implementations: Vec<_> = services.descriptors().map(|d| d.implementation_type()).collect();
    assert_eq!(
      implementations,
      vec![ServiceKey::of::<Square>(), ServiceKey::of::<Triangle>()]
    );
    let ids: Vec<_> = services.descriptors().map(|d| d.id()).collect();
    assert_ne!(ids[0], ids[1]);
  }
}

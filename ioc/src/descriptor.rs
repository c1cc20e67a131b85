use crate::core::ServiceKey;
use crate::implementation::{ErasedImplementation, Implementation};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// How long a resolved instance lives and who caches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Lifetime {
  /// One instance for the life of the root provider.
  Singleton,
  /// A new instance per resolution, never cached.
  Transient,
  /// One instance per scope; only resolvable through a scope.
  Scoped,
}

impl fmt::Display for Lifetime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Lifetime::Singleton => write!(f, "singleton"),
      Lifetime::Transient => write!(f, "transient"),
      Lifetime::Scoped => write!(f, "scoped"),
    }
  }
}

/// Identity of one registration.
///
/// Two registrations of the same contract are distinct descriptors, so caches
/// are keyed by this id rather than by the contract type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(u64);

static NEXT_DESCRIPTOR_ID: AtomicU64 = AtomicU64::new(1);

impl DescriptorId {
  fn next() -> Self {
    Self(NEXT_DESCRIPTOR_ID.fetch_add(1, Ordering::Relaxed))
  }
}

/// An immutable binding of contract, implementation and lifetime.
pub struct ServiceDescriptor {
  id: DescriptorId,
  contract: ServiceKey,
  lifetime: Lifetime,
  implementation: ErasedImplementation,
}

impl ServiceDescriptor {
  pub(crate) fn new<C, I>(
    lifetime: Lifetime,
    implementation: Implementation<I>,
    upcast: fn(Arc<I>) -> Arc<C>,
  ) -> Self
  where
    C: ?Sized + Any + Send + Sync,
    I: ?Sized + Any + Send + Sync,
  {
    Self {
      id: DescriptorId::next(),
      contract: ServiceKey::of::<C>(),
      lifetime,
      implementation: implementation.erase(upcast),
    }
  }

  pub fn id(&self) -> DescriptorId {
    self.id
  }

  pub fn contract(&self) -> ServiceKey {
    self.contract
  }

  pub fn lifetime(&self) -> Lifetime {
    self.lifetime
  }

  pub fn implementation_type(&self) -> ServiceKey {
    self.implementation.key()
  }

  pub(crate) fn implementation(&self) -> &ErasedImplementation {
    &self.implementation
  }
}

impl fmt::Debug for ServiceDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ServiceDescriptor")
      .field("id", &self.id)
      .field("contract", &self.contract)
      .field("implementation", &self.implementation.key())
      .field("lifetime", &self.lifetime)
      .finish()
  }
}

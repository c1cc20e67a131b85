//! Core, mostly non-public data structures shared by both resolvers.

use crate::error::{DisposeError, ResolveError};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies a contract or implementation type.
///
/// Equality and hashing only consider the `TypeId`; the type name is carried
/// along so errors and logs can say which type was involved.
#[derive(Clone, Copy)]
pub struct ServiceKey {
  type_id: TypeId,
  type_name: &'static str,
}

impl ServiceKey {
  /// The key of `T`, which may be unsized (e.g. `dyn Trait`).
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      type_id: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
    }
  }

  pub fn type_id(&self) -> TypeId {
    self.type_id
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }
}

impl PartialEq for ServiceKey {
  fn eq(&self, other: &Self) -> bool {
    self.type_id == other.type_id
  }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.type_id.hash(state);
  }
}

impl fmt::Debug for ServiceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Key({})", self.type_name)
  }
}

impl fmt::Display for ServiceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.type_name)
  }
}

/// The chain of contracts currently being resolved by one `get` call.
///
/// Each top-level resolution owns its own path, so independent containers and
/// threads never see each other's entries.
pub(crate) struct ResolutionPath {
  stack: RefCell<Vec<ServiceKey>>,
  detect_cycles: bool,
}

impl ResolutionPath {
  pub(crate) fn new(detect_cycles: bool) -> Self {
    Self {
      stack: RefCell::new(Vec::new()),
      detect_cycles,
    }
  }

  #[cfg(test)]
  pub(crate) fn depth(&self) -> usize {
    self.stack.borrow().len()
  }
}

/// An RAII guard marking a contract as "being resolved" on a path.
///
/// Entering a contract that is already on the path fails with
/// `CyclicDependency`. Dropping the guard pops the contract again.
pub(crate) struct ResolutionGuard<'a> {
  path: &'a ResolutionPath,
}

impl<'a> ResolutionGuard<'a> {
  /// Enters an uncached (transient) contract. Checked only when cycle detection is on.
  pub(crate) fn enter(path: &'a ResolutionPath, key: ServiceKey) -> Result<Self, ResolveError> {
    Self::enter_checked(path, key, path.detect_cycles)
  }

  /// Enters a cached (singleton or scoped) contract.
  ///
  /// Always checked: re-entering a cache slot that is still being initialized
  /// on the same path would block forever instead of recursing.
  pub(crate) fn enter_cached(path: &'a ResolutionPath, key: ServiceKey) -> Result<Self, ResolveError> {
    Self::enter_checked(path, key, true)
  }

  fn enter_checked(path: &'a ResolutionPath, key: ServiceKey, check: bool) -> Result<Self, ResolveError> {
    let mut stack = path.stack.borrow_mut();
    if check {
      if let Some(start) = stack.iter().position(|entry| *entry == key) {
        let cycle = stack[start..]
          .iter()
          .chain(std::iter::once(&key))
          .map(ServiceKey::type_name)
          .collect::<Vec<_>>()
          .join(" -> ");
        return Err(ResolveError::CyclicDependency { cycle });
      }
    }
    stack.push(key);
    Ok(Self { path })
  }
}

impl Drop for ResolutionGuard<'_> {
  fn drop(&mut self) {
    self.path.stack.borrow_mut().pop();
  }
}

pub(crate) type ReleaseHook = Arc<dyn Fn() -> Result<(), DisposeError> + Send + Sync>;

// Monotonic construction counter; disposal releases newest first.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A constructed service, type-erased.
///
/// `value` always holds an `Arc<C>` where `C` is the contract the instance was
/// built for.
#[derive(Clone)]
pub(crate) struct Instance {
  value: Arc<dyn Any + Send + Sync>,
  release: Option<ReleaseHook>,
  contract: ServiceKey,
  implementation: ServiceKey,
  sequence: u64,
}

impl Instance {
  pub(crate) fn new<C: ?Sized + Any + Send + Sync>(
    value: Arc<C>,
    implementation: ServiceKey,
    release: Option<ReleaseHook>,
  ) -> Self {
    Self {
      value: Arc::new(value),
      release,
      contract: ServiceKey::of::<C>(),
      implementation,
      sequence: NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed),
    }
  }

  pub(crate) fn downcast<C: ?Sized + Any + Send + Sync>(&self) -> Option<Arc<C>> {
    self.value.downcast_ref::<Arc<C>>().cloned()
  }

  pub(crate) fn release_hook(&self) -> Option<&ReleaseHook> {
    self.release.as_ref()
  }

  pub(crate) fn contract(&self) -> ServiceKey {
    self.contract
  }

  pub(crate) fn implementation(&self) -> ServiceKey {
    self.implementation
  }

  pub(crate) fn sequence(&self) -> u64 {
    self.sequence
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  trait Marker: Send + Sync {}
  struct A;
  struct B;

  #[test]
  fn keys_compare_by_type() {
    assert_eq!(ServiceKey::of::<A>(), ServiceKey::of::<A>());
    assert_ne!(ServiceKey::of::<A>(), ServiceKey::of::<B>());
    assert_ne!(ServiceKey::of::<dyn Marker>(), ServiceKey::of::<A>());
    assert!(ServiceKey::of::<dyn Marker>().type_name().contains("Marker"));
  }

  #[test]
  fn guard_pops_on_drop() {
    let path = ResolutionPath::new(true);
    {
      let _a = ResolutionGuard::enter(&path, ServiceKey::of::<A>()).unwrap();
      let _b = ResolutionGuard::enter(&path, ServiceKey::of::<B>()).unwrap();
      assert_eq!(path.depth(), 2);
    }
    assert_eq!(path.depth(), 0);
  }

  #[test]
  fn guard_reports_the_cycle() {
    let path = ResolutionPath::new(true);
    let _a = ResolutionGuard::enter(&path, ServiceKey::of::<A>()).unwrap();
    let _b = ResolutionGuard::enter(&path, ServiceKey::of::<B>()).unwrap();

    let err = ResolutionGuard::enter(&path, ServiceKey::of::<A>())
      .err()
      .expect("re-entering A must fail");
    match err {
      ResolveError::CyclicDependency { cycle } => {
        assert_eq!(cycle.matches(" -> ").count(), 2);
        assert!(cycle.starts_with(std::any::type_name::<A>()));
        assert!(cycle.ends_with(std::any::type_name::<A>()));
      }
      other => panic!("unexpected error: {other}"),
    }
    // The failed entry must not have been pushed.
    assert_eq!(path.depth(), 2);
  }

  #[test]
  fn disabled_detection_allows_reentry() {
    let path = ResolutionPath::new(false);
    let _a = ResolutionGuard::enter(&path, ServiceKey::of::<A>()).unwrap();
    let _again = ResolutionGuard::enter(&path, ServiceKey::of::<A>()).unwrap();
    assert_eq!(path.depth(), 2);
  }

  #[test]
  fn cached_entries_are_checked_even_when_detection_is_off() {
    let path = ResolutionPath::new(false);
    let _a = ResolutionGuard::enter_cached(&path, ServiceKey::of::<A>()).unwrap();
    let _b = ResolutionGuard::enter(&path, ServiceKey::of::<B>()).unwrap();

    assert!(matches!(
      ResolutionGuard::enter_cached(&path, ServiceKey::of::<A>()),
      Err(ResolveError::CyclicDependency { .. })
    ));
    // A transient re-entry is still let through.
    assert!(ResolutionGuard::enter(&path, ServiceKey::of::<B>()).is_ok());
  }

  #[test]
  fn instance_downcasts_to_its_contract_only() {
    struct Impl;
    impl Marker for Impl {}
    let contract: Arc<dyn Marker> = Arc::new(Impl);
    let instance = Instance::new(contract, ServiceKey::of::<Impl>(), None);

    assert!(instance.downcast::<dyn Marker>().is_some());
    assert!(instance.downcast::<Impl>().is_none());
    assert_eq!(instance.contract(), ServiceKey::of::<dyn Marker>());
    assert_eq!(instance.implementation(), ServiceKey::of::<Impl>());
  }
}

//! Scopes: bounded units of resolution with their own instance cache.

use crate::activation::{self, Resolve};
use crate::core::{Instance, ResolutionGuard, ResolutionPath, ServiceKey};
use crate::descriptor::Lifetime;
use crate::dispose::{self, DisposeReport};
use crate::error::{ResolveError, Result};
use crate::lazy::Lazy;
use crate::provider::{self, InstanceCache, RootInner, State};
use crate::registry::Registrations;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// The resolver of one scope.
///
/// Scoped services are cached here, one instance per contract for the life of
/// the scope. Singletons are delegated to the root so their identity stays
/// root-owned; transients are built here so their scoped dependencies bind
/// to this scope.
///
/// Scopes are flat: a scoped resolver cannot open another scope.
#[derive(Clone)]
pub struct ScopedServiceProvider {
  inner: Arc<ScopeInner>,
}

struct ScopeInner {
  id: u64,
  root: Weak<RootInner>,
  registrations: Arc<Registrations>,
  instances: InstanceCache,
  state: RwLock<State>,
  disposing: AtomicBool,
}

impl ScopedServiceProvider {
  pub(crate) fn new(root: Weak<RootInner>, registrations: Arc<Registrations>) -> Self {
    let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(scope = id, "opened scope");
    Self {
      inner: Arc::new(ScopeInner {
        id,
        root,
        registrations,
        instances: DashMap::new(),
        state: RwLock::new(State::Active),
        disposing: AtomicBool::new(false),
      }),
    }
  }

  pub fn get<C: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<C>> {
    activation::resolve_as::<C>(self.inner.as_ref())
  }

  pub fn get_lazy<C: ?Sized + Any + Send + Sync>(&self) -> Lazy<C> {
    Lazy::new(self.inner.clone())
  }

  pub fn contains<C: ?Sized + Any>(&self) -> bool {
    self.inner.registrations.contains(&ServiceKey::of::<C>())
  }

  /// Always fails: nested scopes are not supported.
  pub fn create_scope(&self) -> Result<ServiceScope> {
    if self.is_disposed() {
      return Err(ResolveError::ResolverDisposed);
    }
    Err(ResolveError::NestedScopeUnsupported)
  }

  /// Releases the scoped instances created in this scope. Idempotent.
  pub fn dispose(&self) -> DisposeReport {
    self.inner.dispose()
  }

  /// Whether disposal of this scope has begun.
  pub fn is_disposed(&self) -> bool {
    self.inner.disposing.load(Ordering::Acquire)
  }

  /// Process-unique id of the scope, used in log events.
  pub fn id(&self) -> u64 {
    self.inner.id
  }
}

impl fmt::Debug for ScopedServiceProvider {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ScopedServiceProvider")
      .field("id", &self.inner.id)
      .field("instances", &self.inner.instances.len())
      .field("disposed", &self.is_disposed())
      .finish()
  }
}

impl ScopeInner {
  fn dispose(&self) -> DisposeReport {
    self.disposing.store(true, Ordering::Release);
    let instances = {
      let mut state = self.state.write();
      if *state == State::Disposed {
        return DisposeReport::default();
      }
      *state = State::Disposed;
      provider::drain(&self.instances)
    };

    let report = dispose::release_all("scope", instances);
    tracing::debug!(
      scope = self.id,
      released = report.released(),
      faults = report.faults().len(),
      "disposed scope"
    );
    report
  }
}

impl Resolve for ScopeInner {
  fn resolve_in(&self, key: &ServiceKey, path: &ResolutionPath) -> Result<Instance> {
    if self.disposing.load(Ordering::Acquire) {
      return Err(ResolveError::ResolverDisposed);
    }
    let state = self.state.read_recursive();
    if *state == State::Disposed || self.disposing.load(Ordering::Acquire) {
      return Err(ResolveError::ResolverDisposed);
    }
    // A scope cannot outlive the usefulness of its root.
    let root = self.root.upgrade().ok_or(ResolveError::ResolverDisposed)?;
    if root.is_disposed() {
      return Err(ResolveError::ResolverDisposed);
    }

    let descriptor = self
      .registrations
      .lookup(key)
      .ok_or(ResolveError::UnregisteredService {
        contract: key.type_name(),
      })?;

    match descriptor.lifetime() {
      Lifetime::Scoped => {
        let _guard = ResolutionGuard::enter_cached(path, *key)?;
        provider::cached_or_construct(&self.instances, descriptor, self, path)
      }
      Lifetime::Singleton => root.resolve_in(key, path),
      Lifetime::Transient => {
        let _guard = ResolutionGuard::enter(path, *key)?;
        activation::construct(descriptor, self, path)
      }
    }
  }

  fn registrations(&self) -> &Registrations {
    &self.registrations
  }

  fn is_disposed(&self) -> bool {
    self.disposing.load(Ordering::Acquire) || self.root.upgrade().map_or(true, |root| root.is_disposed())
  }
}

impl Drop for ScopeInner {
  fn drop(&mut self) {
    self.dispose();
  }
}

/// A scope handle that disposes its resolver when dropped.
///
/// Dropping the scope (normal exit, early return or unwinding) and calling
/// [`dispose`](Self::dispose) explicitly are equivalent; whichever happens
/// first releases the scoped instances, exactly once. Only an explicit
/// `dispose` hands back the [`DisposeReport`]; when the drop does the work,
/// release faults are logged at error level and otherwise discarded.
///
/// ```
/// use fibre_di::{Implementation, ServiceCollection};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct RequestContext;
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped(Implementation::<RequestContext>::from_default());
/// let provider = services.build().unwrap();
///
/// let scope = provider.create_scope().unwrap();
/// let a = scope.get::<RequestContext>().unwrap();
/// let b = scope.resolver().get::<RequestContext>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
pub struct ServiceScope {
  resolver: ScopedServiceProvider,
}

impl ServiceScope {
  pub(crate) fn new(resolver: ScopedServiceProvider) -> Self {
    Self { resolver }
  }

  pub fn resolver(&self) -> &ScopedServiceProvider {
    &self.resolver
  }

  /// Shorthand for `self.resolver().get::<C>()`.
  pub fn get<C: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<C>> {
    self.resolver.get::<C>()
  }

  pub fn dispose(&self) -> DisposeReport {
    self.resolver.dispose()
  }
}

impl fmt::Debug for ServiceScope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("ServiceScope").field(&self.resolver).finish()
  }
}

impl Drop for ServiceScope {
  fn drop(&mut self) {
    self.resolver.dispose();
  }
}

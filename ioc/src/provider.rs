//! The root resolver.

use crate::activation::{self, Resolve};
use crate::core::{Instance, ResolutionGuard, ResolutionPath, ServiceKey};
use crate::descriptor::{DescriptorId, Lifetime, ServiceDescriptor};
use crate::dispose::{self, DisposeReport};
use crate::error::{ResolveError, Result};
use crate::lazy::Lazy;
use crate::registry::Registrations;
use crate::scope::{ScopedServiceProvider, ServiceScope};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle of a resolver. Disposal is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
  Active,
  Disposed,
}

/// Lazily populated instance slots, one per descriptor.
///
/// A slot's `OnceCell` serializes "check, construct, store" for its own
/// descriptor only, so unrelated contracts resolve concurrently and a cached
/// service is constructed at most once.
pub(crate) type InstanceCache = DashMap<DescriptorId, Arc<OnceCell<Instance>>>;

pub(crate) fn cached_or_construct(
  cache: &InstanceCache,
  descriptor: &ServiceDescriptor,
  resolver: &dyn Resolve,
  path: &ResolutionPath,
) -> Result<Instance> {
  // Clone the slot out so no map shard stays locked while constructing.
  let slot = cache.entry(descriptor.id()).or_default().clone();
  slot
    .get_or_try_init(|| activation::construct(descriptor, resolver, path))
    .cloned()
}

/// Empties `cache`, returning the instances that were actually constructed.
pub(crate) fn drain(cache: &InstanceCache) -> Vec<Instance> {
  let instances = cache
    .iter()
    .filter_map(|slot| slot.value().get().cloned())
    .collect();
  cache.clear();
  instances
}

/// The root of the dependency graph.
///
/// Resolves singleton and transient services and owns the singleton cache.
/// Scoped services are only reachable through a scope opened with
/// [`create_scope`](Self::create_scope).
///
/// `ServiceProvider` is a cheap handle; clones share the same container.
/// When the last handle is dropped the provider disposes itself.
#[derive(Clone)]
pub struct ServiceProvider {
  inner: Arc<RootInner>,
}

pub(crate) struct RootInner {
  registrations: Arc<Registrations>,
  singletons: InstanceCache,
  state: RwLock<State>,
  // Set before the write lock is requested, so new resolutions stop taking
  // the shared lock and a waiting disposal cannot be starved.
  disposing: AtomicBool,
}

impl ServiceProvider {
  pub(crate) fn new(registrations: Arc<Registrations>) -> Self {
    Self {
      inner: Arc::new(RootInner {
        registrations,
        singletons: DashMap::new(),
        state: RwLock::new(State::Active),
        disposing: AtomicBool::new(false),
      }),
    }
  }

  /// Resolves contract `C`.
  ///
  /// Fails with `ScopedFromRoot` for scoped contracts and with
  /// `ResolverDisposed` once the provider has been disposed.
  pub fn get<C: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<C>> {
    activation::resolve_as::<C>(self.inner.as_ref())
  }

  /// Defers resolving `C` until the returned handle is first read.
  pub fn get_lazy<C: ?Sized + Any + Send + Sync>(&self) -> Lazy<C> {
    Lazy::new(self.inner.clone())
  }

  /// Whether a registration answers lookups for `C`.
  pub fn contains<C: ?Sized + Any>(&self) -> bool {
    self.inner.registrations.contains(&ServiceKey::of::<C>())
  }

  /// Opens a new scope bound to this provider.
  pub fn create_scope(&self) -> Result<ServiceScope> {
    if self.is_disposed() {
      return Err(ResolveError::ResolverDisposed);
    }
    let resolver = ScopedServiceProvider::new(Arc::downgrade(&self.inner), self.inner.registrations.clone());
    Ok(ServiceScope::new(resolver))
  }

  /// Runs `f` inside a fresh scope, disposing the scope however `f` exits.
  ///
  /// Release faults from that disposal are only logged. To inspect them,
  /// call `dispose` on the scope from inside `f`; the report it returns is
  /// the only one, and the disposal on exit then does nothing.
  pub fn with_scope<R>(&self, f: impl FnOnce(&ScopedServiceProvider) -> R) -> Result<R> {
    let scope = self.create_scope()?;
    Ok(f(scope.resolver()))
  }

  /// Releases every cached singleton and makes the provider unusable.
  ///
  /// Idempotent: calls after the first return an empty report.
  pub fn dispose(&self) -> DisposeReport {
    self.inner.dispose()
  }

  /// Whether disposal has begun. Resolution fails from that point on.
  pub fn is_disposed(&self) -> bool {
    self.inner.is_disposed()
  }
}

impl fmt::Debug for ServiceProvider {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ServiceProvider")
      .field("descriptors", &self.inner.registrations.len())
      .field("singletons", &self.inner.singletons.len())
      .field("disposed", &self.is_disposed())
      .finish()
  }
}

impl RootInner {
  pub(crate) fn is_disposed(&self) -> bool {
    self.disposing.load(Ordering::Acquire)
  }

  fn dispose(&self) -> DisposeReport {
    self.disposing.store(true, Ordering::Release);
    let instances = {
      let mut state = self.state.write();
      if *state == State::Disposed {
        return DisposeReport::default();
      }
      *state = State::Disposed;
      drain(&self.singletons)
    };

    // Hooks run outside the gate so a hook touching the provider cannot deadlock.
    let report = dispose::release_all("root", instances);
    tracing::debug!(
      released = report.released(),
      faults = report.faults().len(),
      "disposed service provider"
    );
    report
  }
}

impl Resolve for RootInner {
  fn resolve_in(&self, key: &ServiceKey, path: &ResolutionPath) -> Result<Instance> {
    if self.is_disposed() {
      return Err(ResolveError::ResolverDisposed);
    }
    // Held for the whole resolution: disposal waits for in-flight resolutions
    // and everything after it observes `Disposed`.
    let state = self.state.read_recursive();
    if *state == State::Disposed || self.is_disposed() {
      return Err(ResolveError::ResolverDisposed);
    }

    let descriptor = self
      .registrations
      .lookup(key)
      .ok_or(ResolveError::UnregisteredService {
        contract: key.type_name(),
      })?;

    match descriptor.lifetime() {
      Lifetime::Singleton => {
        let _guard = ResolutionGuard::enter_cached(path, *key)?;
        cached_or_construct(&self.singletons, descriptor, self, path)
      }
      Lifetime::Transient => {
        let _guard = ResolutionGuard::enter(path, *key)?;
        activation::construct(descriptor, self, path)
      }
      Lifetime::Scoped => Err(ResolveError::ScopedFromRoot {
        contract: key.type_name(),
      }),
    }
  }

  fn registrations(&self) -> &Registrations {
    &self.registrations
  }

  fn is_disposed(&self) -> bool {
    RootInner::is_disposed(self)
  }
}

impl Drop for RootInner {
  fn drop(&mut self) {
    self.dispose();
  }
}

//! Deferred resolution.

use crate::activation::{self, Resolve};
use crate::error::{ResolveError, Result};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A service resolved on first access rather than when the handle is created.
///
/// Obtained from [`ServiceProvider::get_lazy`](crate::ServiceProvider::get_lazy)
/// or [`ScopedServiceProvider::get_lazy`](crate::ScopedServiceProvider::get_lazy).
/// The first successful [`value`](Self::value) is memoized; a failed attempt
/// is not, so it can be retried. Once the resolver it came from is disposed,
/// `value` fails with `ResolverDisposed` even if an instance was memoized,
/// since that instance may already have been released.
///
/// ```
/// use fibre_di::{Implementation, ServiceCollection};
///
/// #[derive(Default)]
/// struct Expensive;
///
/// let mut services = ServiceCollection::new();
/// services.add_transient(Implementation::<Expensive>::from_default());
/// let provider = services.build().unwrap();
///
/// let lazy = provider.get_lazy::<Expensive>();
/// assert!(!lazy.is_value_created());
/// let _service = lazy.value().unwrap();
/// assert!(lazy.is_value_created());
/// ```
pub struct Lazy<C: ?Sized> {
  resolver: Arc<dyn Resolve>,
  cell: OnceCell<Arc<C>>,
}

impl<C: ?Sized + Any + Send + Sync> Lazy<C> {
  pub(crate) fn new(resolver: Arc<dyn Resolve>) -> Self {
    Self {
      resolver,
      cell: OnceCell::new(),
    }
  }

  /// Resolves the service on first call and returns the same instance afterwards.
  pub fn value(&self) -> Result<Arc<C>> {
    if self.resolver.is_disposed() {
      return Err(ResolveError::ResolverDisposed);
    }
    self
      .cell
      .get_or_try_init(|| activation::resolve_as::<C>(self.resolver.as_ref()))
      .cloned()
  }

  /// Whether an instance was ever memoized, including one made unreachable by disposal.
  pub fn is_value_created(&self) -> bool {
    self.cell.get().is_some()
  }
}

impl<C: ?Sized> fmt::Debug for Lazy<C> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Lazy")
      .field("contract", &std::any::type_name::<C>())
      .field("created", &self.cell.get().is_some())
      .finish()
  }
}

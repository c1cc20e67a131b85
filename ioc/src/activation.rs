//! Constructor selection and instance activation.
//!
//! Both resolvers build instances through [`construct`], passing themselves
//! as the [`Resolve`] used for the constructor's parameters. A scoped
//! resolution therefore resolves its whole dependency graph through the scope
//! (and, for singletons, the root), never through some other resolver.

use crate::core::{Instance, ResolutionPath, ServiceKey};
use crate::descriptor::ServiceDescriptor;
use crate::error::{ResolveError, Result};
use crate::implementation::{Arguments, ErasedConstructor, ErasedImplementation};
use crate::registry::Registrations;
use std::any::Any;
use std::sync::Arc;

/// The seam between the activation engine and a concrete resolver.
pub(crate) trait Resolve: Send + Sync {
  /// Resolves `key` as part of the resolution tracked by `path`.
  fn resolve_in(&self, key: &ServiceKey, path: &ResolutionPath) -> Result<Instance>;

  fn registrations(&self) -> &Registrations;

  /// Whether this resolver (or the root it depends on) has begun disposal.
  fn is_disposed(&self) -> bool;
}

/// Starts a fresh resolution of `C` on `resolver`.
pub(crate) fn resolve_as<C: ?Sized + Any + Send + Sync>(resolver: &dyn Resolve) -> Result<Arc<C>> {
  let key = ServiceKey::of::<C>();
  let path = ResolutionPath::new(resolver.registrations().options().detect_cycles);
  let instance = resolver.resolve_in(&key, &path)?;
  instance.downcast::<C>().ok_or(ResolveError::TypeMismatch {
    contract: key.type_name(),
  })
}

/// Picks the constructor to use for `implementation`.
///
/// A public constructor is a candidate when every parameter is either
/// registered or optional. The candidate with the most parameters wins; a tie
/// between different parameter type sequences is ambiguous.
pub(crate) fn select_constructor<'a>(
  implementation: &'a ErasedImplementation,
  is_registered: impl Fn(&ServiceKey) -> bool,
) -> Result<&'a ErasedConstructor> {
  let mut best: Option<&ErasedConstructor> = None;
  let mut ambiguous = false;

  let candidates = implementation.public_constructors().filter(|constructor| {
    constructor
      .parameters()
      .iter()
      .all(|p| p.is_optional() || is_registered(&p.key()))
  });

  for candidate in candidates {
    match best {
      None => best = Some(candidate),
      Some(current) => {
        let (arity, best_arity) = (candidate.parameters().len(), current.parameters().len());
        if arity > best_arity {
          best = Some(candidate);
          ambiguous = false;
        } else if arity == best_arity && !current.same_signature(candidate) {
          ambiguous = true;
        }
      }
    }
  }

  let implementation_name = implementation.key().type_name();
  match best {
    None => Err(ResolveError::NoResolvableConstructor {
      implementation: implementation_name,
    }),
    Some(_) if ambiguous => Err(ResolveError::AmbiguousConstructor {
      implementation: implementation_name,
    }),
    Some(constructor) => Ok(constructor),
  }
}

/// Builds a new instance for `descriptor`, resolving parameters through `resolver`.
pub(crate) fn construct(
  descriptor: &ServiceDescriptor,
  resolver: &dyn Resolve,
  path: &ResolutionPath,
) -> Result<Instance> {
  let registrations = resolver.registrations();
  let implementation = descriptor.implementation();
  let constructor = select_constructor(implementation, |key| registrations.contains(key))?;

  let mut values = Vec::with_capacity(constructor.parameters().len());
  for parameter in constructor.parameters() {
    let value = if registrations.contains(&parameter.key()) {
      Some(resolver.resolve_in(&parameter.key(), path)?)
    } else {
      None
    };
    values.push((*parameter, value));
  }

  tracing::trace!(
    contract = %descriptor.contract(),
    implementation = %implementation.key(),
    lifetime = %descriptor.lifetime(),
    arguments = values.len(),
    "constructing service"
  );
  let mut args = Arguments::new(implementation.key().type_name(), values);
  constructor.invoke(&mut args)
}

//! Registration-time description of how to build an implementation type.
//!
//! Rust has no constructor reflection, so every implementation declares its
//! constructors up front: the ordered parameter types each one needs and a
//! factory closure that receives the resolved values as [`Arguments`]. The
//! resolver then picks among them at construction time.

use crate::core::{Instance, ReleaseHook, ServiceKey};
use crate::dispose::Dispose;
use crate::error::{DisposeError, ResolveError, Result};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Whether an implementation type can be instantiated at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
  Concrete,
  /// An interface or abstract type, e.g. `dyn Trait`. Never constructible.
  Abstract,
}

/// Who may call a constructor. Only public constructors are considered by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
  #[default]
  Public,
  Private,
}

/// One declared constructor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
  key: ServiceKey,
  optional: bool,
}

impl Parameter {
  pub fn key(&self) -> ServiceKey {
    self.key
  }

  /// Optional parameters resolve to `None` when their type is not registered.
  pub fn is_optional(&self) -> bool {
    self.optional
  }
}

type Factory<I> = Arc<dyn Fn(&mut Arguments) -> Result<Arc<I>> + Send + Sync>;

/// A constructor of `I`: ordered parameters plus the factory that consumes them.
///
/// ```
/// use fibre_di::Constructor;
/// use std::sync::Arc;
///
/// struct Clock;
/// struct Report {
///   clock: Arc<Clock>,
///   title: Option<Arc<String>>,
/// }
///
/// let ctor = Constructor::new(|args| {
///   Ok(Report {
///     clock: args.required::<Clock>()?,
///     title: args.optional::<String>()?,
///   })
/// })
/// .param::<Clock>()
/// .optional::<String>();
///
/// assert_eq!(ctor.parameters().len(), 2);
/// ```
pub struct Constructor<I: ?Sized> {
  params: Vec<Parameter>,
  visibility: Visibility,
  factory: Factory<I>,
}

impl<I: Any + Send + Sync> Constructor<I> {
  pub fn new(factory: impl Fn(&mut Arguments) -> Result<I> + Send + Sync + 'static) -> Self {
    Self {
      params: Vec::new(),
      visibility: Visibility::Public,
      factory: Arc::new(move |args: &mut Arguments| factory(args).map(Arc::new)),
    }
  }
}

impl<I: ?Sized + Any + Send + Sync> Constructor<I> {
  /// Appends a required parameter of type `P`.
  pub fn param<P: ?Sized + Any>(mut self) -> Self {
    self.params.push(Parameter {
      key: ServiceKey::of::<P>(),
      optional: false,
    });
    self
  }

  /// Appends a parameter of type `P` that defaults to absent when `P` is unregistered.
  pub fn optional<P: ?Sized + Any>(mut self) -> Self {
    self.params.push(Parameter {
      key: ServiceKey::of::<P>(),
      optional: true,
    });
    self
  }

  /// Hides this constructor from the resolver.
  pub fn private(mut self) -> Self {
    self.visibility = Visibility::Private;
    self
  }

  pub fn parameters(&self) -> &[Parameter] {
    &self.params
  }

  pub fn visibility(&self) -> Visibility {
    self.visibility
  }
}

type ReleaseFn<I> = Arc<dyn Fn(&I) -> std::result::Result<(), DisposeError> + Send + Sync>;

/// Describes an implementation type: its kind, constructors and release hook.
pub struct Implementation<I: ?Sized> {
  key: ServiceKey,
  kind: TypeKind,
  constructors: Vec<Constructor<I>>,
  release: Option<ReleaseFn<I>>,
}

impl<I: Any + Send + Sync> Implementation<I> {
  /// A concrete implementation with no constructors yet.
  pub fn new() -> Self {
    Self {
      key: ServiceKey::of::<I>(),
      kind: TypeKind::Concrete,
      constructors: Vec::new(),
      release: None,
    }
  }
}

impl<I: Any + Send + Sync> Default for Implementation<I> {
  fn default() -> Self {
    Self::new()
  }
}

impl<I: Default + Any + Send + Sync> Implementation<I> {
  /// A concrete implementation with one public zero-argument constructor backed by `Default`.
  pub fn from_default() -> Self {
    Self::new().constructor(Constructor::new(|_| Ok(I::default())))
  }
}

impl<I: ?Sized + Dispose + Any> Implementation<I> {
  /// Uses `I`'s [`Dispose`] impl as the release hook.
  pub fn disposable(self) -> Self {
    self.on_release(|instance: &I| instance.dispose())
  }
}

impl<I: ?Sized + Any + Send + Sync> Implementation<I> {
  /// An abstract implementation. Registering it fails the build with `NotInstantiable`.
  pub fn abstract_type() -> Self {
    Self {
      key: ServiceKey::of::<I>(),
      kind: TypeKind::Abstract,
      constructors: Vec::new(),
      release: None,
    }
  }

  pub fn constructor(mut self, constructor: Constructor<I>) -> Self {
    self.constructors.push(constructor);
    self
  }

  /// Sets the hook invoked once when an owning resolver disposes a cached instance.
  pub fn on_release(
    mut self,
    release: impl Fn(&I) -> std::result::Result<(), DisposeError> + Send + Sync + 'static,
  ) -> Self {
    self.release = Some(Arc::new(release));
    self
  }

  pub fn kind(&self) -> TypeKind {
    self.kind
  }

  pub fn constructors(&self) -> &[Constructor<I>] {
    &self.constructors
  }

  /// Erases `I` behind contract `C`, wiring the release hook into every constructor.
  pub(crate) fn erase<C: ?Sized + Any + Send + Sync>(
    self,
    upcast: fn(Arc<I>) -> Arc<C>,
  ) -> ErasedImplementation {
    let key = self.key;
    let release = self.release;
    let constructors = self
      .constructors
      .into_iter()
      .map(|constructor| {
        let factory = constructor.factory;
        let release = release.clone();
        ErasedConstructor {
          params: constructor.params,
          visibility: constructor.visibility,
          factory: Arc::new(move |args: &mut Arguments| {
            let concrete = factory(args)?;
            let hook = release.as_ref().map(|release| {
              let release = Arc::clone(release);
              let target = Arc::clone(&concrete);
              Arc::new(move || release(&*target)) as ReleaseHook
            });
            Ok(Instance::new(upcast(concrete), key, hook))
          }),
        }
      })
      .collect();

    ErasedImplementation {
      key,
      kind: self.kind,
      constructors,
    }
  }
}

impl<I: ?Sized> fmt::Debug for Implementation<I> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Implementation")
      .field("type", &self.key)
      .field("kind", &self.kind)
      .field("constructors", &self.constructors.len())
      .field("releasable", &self.release.is_some())
      .finish()
  }
}

type ErasedFactory = Arc<dyn Fn(&mut Arguments) -> Result<Instance> + Send + Sync>;

pub(crate) struct ErasedConstructor {
  params: Vec<Parameter>,
  visibility: Visibility,
  factory: ErasedFactory,
}

impl ErasedConstructor {
  pub(crate) fn parameters(&self) -> &[Parameter] {
    &self.params
  }

  pub(crate) fn is_public(&self) -> bool {
    self.visibility == Visibility::Public
  }

  /// Two constructors share a signature when their parameter types match in order.
  pub(crate) fn same_signature(&self, other: &ErasedConstructor) -> bool {
    self.params.len() == other.params.len()
      && self
        .params
        .iter()
        .zip(&other.params)
        .all(|(a, b)| a.key == b.key)
  }

  pub(crate) fn invoke(&self, args: &mut Arguments) -> Result<Instance> {
    (self.factory)(args)
  }
}

pub(crate) struct ErasedImplementation {
  key: ServiceKey,
  kind: TypeKind,
  constructors: Vec<ErasedConstructor>,
}

impl ErasedImplementation {
  pub(crate) fn key(&self) -> ServiceKey {
    self.key
  }

  pub(crate) fn kind(&self) -> TypeKind {
    self.kind
  }

  #[cfg(test)]
  pub(crate) fn constructors(&self) -> &[ErasedConstructor] {
    &self.constructors
  }

  pub(crate) fn public_constructors(&self) -> impl Iterator<Item = &ErasedConstructor> {
    self.constructors.iter().filter(|c| c.is_public())
  }
}

/// The resolved parameter values handed to a constructor, in declaration order.
pub struct Arguments {
  implementation: &'static str,
  values: std::vec::IntoIter<(Parameter, Option<Instance>)>,
  position: usize,
}

impl Arguments {
  pub(crate) fn new(implementation: &'static str, values: Vec<(Parameter, Option<Instance>)>) -> Self {
    Self {
      implementation,
      values: values.into_iter(),
      position: 0,
    }
  }

  /// Takes the next argument, which must have been resolved.
  pub fn required<T: ?Sized + Any + Send + Sync>(&mut self) -> Result<Arc<T>> {
    let position = self.position;
    match self.next_value::<T>()? {
      Some(value) => Ok(value),
      None => Err(self.mismatch::<T>(position)),
    }
  }

  /// Takes the next argument; `None` when it was optional and unregistered.
  pub fn optional<T: ?Sized + Any + Send + Sync>(&mut self) -> Result<Option<Arc<T>>> {
    self.next_value::<T>()
  }

  /// Number of arguments not yet taken.
  pub fn remaining(&self) -> usize {
    self.values.len()
  }

  fn next_value<T: ?Sized + Any + Send + Sync>(&mut self) -> Result<Option<Arc<T>>> {
    let position = self.position;
    self.position += 1;

    let (parameter, value) = self.values.next().ok_or_else(|| self.mismatch::<T>(position))?;
    if parameter.key != ServiceKey::of::<T>() {
      return Err(self.mismatch::<T>(position));
    }
    match value {
      None => Ok(None),
      Some(instance) => instance
        .downcast::<T>()
        .map(Some)
        .ok_or_else(|| self.mismatch::<T>(position)),
    }
  }

  fn mismatch<T: ?Sized>(&self, position: usize) -> ResolveError {
    ResolveError::ArgumentMismatch {
      implementation: self.implementation,
      position,
      expected: std::any::type_name::<T>(),
    }
  }
}

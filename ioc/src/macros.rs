//! Public macros for ergonomic service resolution.

/// Resolves a service from a resolver, panicking if it cannot be resolved.
///
/// Works with anything exposing `get::<T>()`: a
/// [`ServiceProvider`](crate::ServiceProvider), a
/// [`ScopedServiceProvider`](crate::ScopedServiceProvider) or a
/// [`ServiceScope`](crate::ServiceScope). For a non-panicking version, call
/// `get` directly.
///
/// # Panics
///
/// Panics with the underlying [`ResolveError`](crate::ResolveError) if the
/// service cannot be resolved.
///
/// # Examples
///
/// ```
/// use fibre_di::{resolve, Implementation, ServiceCollection};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
///
/// #[derive(Default)]
/// struct EnglishGreeter;
/// impl Greeter for EnglishGreeter { fn greet(&self) -> String { "Hello!".to_string() } }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton_trait::<dyn Greeter, _>(Implementation::<EnglishGreeter>::from_default(), |g| g);
/// let provider = services.build().unwrap();
///
/// let greeter = resolve!(provider, trait Greeter);
/// assert_eq!(greeter.greet(), "Hello!");
///
/// // Only the trait is registered, so resolving the concrete type would panic.
/// assert!(provider.get::<EnglishGreeter>().is_err());
/// ```
#[macro_export]
macro_rules! resolve {
    // Arm for resolving a trait object: resolve!(resolver, trait MyTrait)
    ($resolver:expr, trait $trait_ident:ident) => {
        $resolver
            .get::<dyn $trait_ident>()
            .unwrap_or_else(|err| {
                panic!(
                    "Failed to resolve required trait service {}: {}",
                    std::any::type_name::<dyn $trait_ident>(),
                    err
                )
            })
    };

    // Arm for resolving a concrete type: resolve!(resolver, MyService)
    ($resolver:expr, $type:ty) => {
        $resolver
            .get::<$type>()
            .unwrap_or_else(|err| {
                panic!(
                    "Failed to resolve required service {}: {}",
                    std::any::type_name::<$type>(),
                    err
                )
            })
    };
}

/// Resolves a service from a resolver, returning `None` if it cannot be resolved.
///
/// The error itself is discarded; call `get` when the reason matters.
///
/// ```
/// use fibre_di::{maybe_resolve, ServiceCollection};
///
/// struct Unregistered;
///
/// let provider = ServiceCollection::new().build().unwrap();
/// assert!(maybe_resolve!(provider, Unregistered).is_none());
/// ```
#[macro_export]
macro_rules! maybe_resolve {
    ($resolver:expr, trait $trait_ident:ident) => {
        $resolver.get::<dyn $trait_ident>().ok()
    };

    ($resolver:expr, $type:ty) => {
        $resolver.get::<$type>().ok()
    };
}

//! # Fibre DI
//!
//! A thread-safe Inversion of Control container for Rust with three lifetime
//! policies and deterministic disposal.
//!
//! Services are registered in a [`ServiceCollection`], which is validated and
//! built into a root [`ServiceProvider`]. Singleton and transient services are
//! resolved from the root; scoped services are resolved through a
//! [`ServiceScope`], which keeps one instance per contract and releases them
//! when it is disposed or dropped.
//!
//! ## Core Concepts
//!
//! - **Implementation**: how to build a type. Rust has no constructor
//!   reflection, so each [`Implementation`] declares its [`Constructor`]s and
//!   the parameter types they need. When several constructors can be
//!   satisfied, the one with the most parameters is used; equally rich
//!   constructors with different parameter types are rejected as ambiguous.
//! - **Lifetime**: [`Lifetime::Singleton`] (one per provider),
//!   [`Lifetime::Transient`] (one per resolution) and [`Lifetime::Scoped`]
//!   (one per scope).
//! - **Disposal**: instances cached by a resolver are released through their
//!   [`Dispose`] hook when that resolver is disposed. Hook failures are
//!   isolated and reported in a [`DisposeReport`].
//! - **No global state**: every container is an explicit value, so any number
//!   of independent containers can coexist.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_di::{Constructor, Implementation, ServiceCollection};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!   fn greet(&self) -> String;
//! }
//!
//! struct EnglishGreeter;
//! impl Greeter for EnglishGreeter {
//!   fn greet(&self) -> String {
//!     "Hello, World!".to_string()
//!   }
//! }
//!
//! struct Welcome {
//!   greeter: Arc<dyn Greeter>,
//! }
//!
//! let mut services = ServiceCollection::new();
//! services
//!   .add_singleton_trait::<dyn Greeter, _>(
//!     Implementation::<EnglishGreeter>::new().constructor(Constructor::new(|_| Ok(EnglishGreeter))),
//!     |greeter| greeter,
//!   )
//!   .add_scoped(Implementation::<Welcome>::new().constructor(
//!     Constructor::new(|args| Ok(Welcome { greeter: args.required::<dyn Greeter>()? }))
//!       .param::<dyn Greeter>(),
//!   ));
//!
//! let provider = services.build().unwrap();
//! let scope = provider.create_scope().unwrap();
//! let welcome = scope.get::<Welcome>().unwrap();
//! assert_eq!(welcome.greeter.greet(), "Hello, World!");
//! ```

mod activation;
mod core;
mod descriptor;
mod dispose;
mod error;
mod implementation;
mod lazy;
mod macros;
mod options;
mod provider;
mod registry;
mod scope;

pub use crate::core::ServiceKey;
pub use descriptor::{DescriptorId, Lifetime, ServiceDescriptor};
pub use dispose::{Dispose, DisposeReport};
pub use error::{BuildError, DisposeError, ReleaseFault, ResolveError, Result};
pub use implementation::{Arguments, Constructor, Implementation, Parameter, TypeKind, Visibility};
pub use lazy::Lazy;
pub use options::{ContainerOptions, DuplicatePolicy};
pub use provider::ServiceProvider;
pub use registry::ServiceCollection;
pub use scope::{ScopedServiceProvider, ServiceScope};

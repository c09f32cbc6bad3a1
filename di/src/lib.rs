//! # Fibre DI
//!
//! A thread-safe dependency-injection container keyed by structural type
//! identity and an optional name.
//!
//! Fibre DI separates configuration from use: a [`Container`] is configured
//! once through a closure, then frozen. After that it only resolves.
//!
//! ## Core Concepts
//!
//! - **Keys**: every binding is identified by a [`TypeKey`] (the full,
//!   generic-aware type) plus an optional name. `Vec<String>` and `Vec<i32>`
//!   are different keys; so are `bind::<Config>()` and
//!   `bind::<Config>().named("test")`.
//! - **Lifecycles**: provider, singleton, thread singleton, factory, instance,
//!   and singletons scoped to an external [`ScopeStore`].
//! - **Modules**: reusable bundles of bindings, imported into any number of
//!   containers. Overriding an existing binding is always explicit.
//! - **Extension**: a container may fall back to a parent for the keys it does
//!   not bind itself.
//! - **Injection**: an [`Injector`] hands out typed lookups before any
//!   container exists and resolves them once one is injected.
//! - **Loops**: a creator that ends up depending on itself fails with
//!   [`DiError::DependencyLoop`] instead of overflowing the stack.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_di::{resolve, type_token, Container};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!   fn greet(&self) -> String;
//! }
//!
//! struct EnglishGreeter {
//!   message: Arc<String>,
//! }
//!
//! impl Greeter for EnglishGreeter {
//!   fn greet(&self) -> String {
//!     self.message.to_string()
//!   }
//! }
//!
//! type_token!(dyn Greeter);
//!
//! let container = Container::new(|b| {
//!   b.constant("greeting_message").with(String::from("Hello, World!"))?;
//!
//!   // Creators resolve their own dependencies from the container.
//!   b.bind::<dyn Greeter>().with(fibre_di::Lifecycle::Singleton, |c| {
//!     let message = c.instance::<String>(Some("greeting_message"))?;
//!     Ok(Arc::new(EnglishGreeter { message }))
//!   })
//! })?;
//!
//! let greeter = resolve!(&container, trait Greeter);
//! assert_eq!(greeter.greet(), "Hello, World!");
//! # Ok::<(), fibre_di::DiError>(())
//! ```

mod container;
mod core;
mod error;
mod injector;
mod key;
mod macros;
mod registry;
mod resolver;
mod scope;
mod type_key;

pub use container::{Container, ContainerBuilder};
pub use error::{BoxError, DiError, Result};
pub use injector::{InjectedFactory, InjectedInstance, InjectedProvider, Injector};
pub use key::BindingKey;
pub use registry::{BindingReceiver, Builder, ConstantBinder, Module};
pub use resolver::{Factory, Provider, WithArgument};
pub use scope::{Lifecycle, ScopeCache, ScopeStore, ScopedValue};
pub use type_key::{RawType, TypeExpr, TypeKey, TypeToken};

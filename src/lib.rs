//! # ferrous-wire
//!
//! Constructor-driven component wiring. Components are registered as plain
//! functions or closures; their parameter types are their dependencies.
//! The container derives a dependency graph from those signatures, rejects
//! cycles at registration time and builds components on demand through
//! pluggable scopes.
//!
//! ## Features
//!
//! - **Signature analysis**: parameters of type `Arc<T>`, [`Qualified`],
//!   [`Provider`], [`Unmanaged`], [`Context`] and [`Container`]
//! - **Cycle detection**: a registration closing a cycle is refused and
//!   leaves the container untouched
//! - **Disambiguation**: primary, alternative and priority markers plus
//!   qualifiers and trait-object casts
//! - **Scopes**: singleton, prototype, and per-[`Context`] sessions
//! - **Lifecycle**: initializer and disposer hooks, ordered startup and
//!   newest-first teardown
//! - **Hierarchy**: child containers delegate to their parent
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_wire::{Container, Context, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = Container::new();
//! container
//!     .register_value(Arc::new(Database { url: "postgres://localhost".to_string() }))
//!     .register()
//!     .unwrap();
//! container
//!     .register(|db: Arc<Database>| Arc::new(UserService { db }))
//!     .unwrap();
//!
//! let ctx = Context::background();
//! container.initialize(&ctx).unwrap();
//!
//! let users = container.get::<UserService>(&ctx).unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! ## Fallible constructors
//!
//! ```rust
//! use ferrous_wire::{Container, Context, DiError, Resolver};
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Settings { port: u16 }
//!
//! let container = Container::new();
//! container
//!     .register(|| -> Result<Arc<Settings>, std::num::ParseIntError> {
//!         Ok(Arc::new(Settings { port: "not a port".parse()? }))
//!     })
//!     .unwrap();
//!
//! let err = container.get::<Settings>(&Context::background()).unwrap_err();
//! assert!(matches!(err, DiError::ConstructorFailed { .. }));
//! ```
//!
//! ## Scoped components
//!
//! ```rust
//! use ferrous_wire::{Container, Context, ContextScope, Resolver};
//! use std::sync::Arc;
//!
//! struct RequestId(u64);
//!
//! let requests = ContextScope::new("request");
//! let container = Container::new();
//! container.register_scope("request", Arc::new(requests.clone())).unwrap();
//! container
//!     .factory(|| Arc::new(RequestId(7)))
//!     .scoped("request")
//!     .register()
//!     .unwrap();
//!
//! let (ctx, session) = requests.enter(&Context::background());
//! let a = container.get::<RequestId>(&ctx).unwrap();
//! let b = container.get::<RequestId>(&ctx).unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! session.end();
//! ```

mod container;
mod context;
mod creation;
mod error;
mod factory;
mod filter;
mod global;
mod graph;
mod internal;
mod key;
mod registry;
mod resolver;
mod signature;
mod wrappers;

pub mod observer;
pub mod scope;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
mod testing;

pub use container::Container;
pub use context::Context;
pub use creation::{Created, DisposalHandle, Instance, ObjectFactory};
pub use error::{BoxError, DiError, DiResult};
pub use factory::{Condition, Factory, FactoryBuilder, FactoryId};
pub use filter::{default_order, FactoryFilter, FilteredFactories};
pub use global::global;
pub use graph::Graph;
pub use key::{key_of_type, Key};
pub use observer::{DiObserver, MetricsObserver, TracingObserver};
pub use scope::{ContextScope, PrototypeScope, Scope, ScopeSession, SingletonScope, SCOPE_PROTOTYPE, SCOPE_SINGLETON};
pub use signature::{
    Argument, Constructor, ConstructorError, ConstructorOutput, Dependency, MatchKind, ParamKind, Parameter,
    ReturnShape, Signature,
};
pub use traits::{Dispose, Initialize, Resolver, ResolverCore};
pub use wrappers::{Provider, Qualified, Unmanaged};

#[cfg(any(test, feature = "testing"))]
pub use testing::MockGuard;

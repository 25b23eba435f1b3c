//! Instance lifetimes.
//!
//! A [`Scope`] decides whether a factory's instance is reused. The container
//! always has a [`SingletonScope`] (one instance per container, the default)
//! and a [`PrototypeScope`] (a new instance per resolution). Further scopes
//! are added with [`Container::register_scope`](crate::Container::register_scope);
//! [`ContextScope`] is the stock one, caching per session carried by the
//! [`Context`].

mod context;
mod singleton;

pub use context::{ContextScope, ScopeSession};
pub use singleton::SingletonScope;

use crate::creation::{Created, Instance};
use crate::error::DiResult;
use crate::factory::Factory;
use crate::Context;

pub const SCOPE_SINGLETON: &str = "singleton";
pub const SCOPE_PROTOTYPE: &str = "prototype";

/// Builds a new instance when a scope has none to reuse.
pub type CreateFn<'a> = dyn FnMut() -> DiResult<Created> + 'a;

/// Storage policy for one named lifetime.
///
/// Implementations must never call `create` while holding a lock that a
/// nested resolution could need: constructors resolve their own
/// dependencies through the same scopes.
pub trait Scope: Send + Sync {
    /// Returns the reusable instance of `factory`, creating it when needed.
    fn get(&self, ctx: &Context, factory: &Factory, create: &mut CreateFn<'_>) -> DiResult<Option<Instance>>;

    /// Forgets the instance of `factory` after running its disposers.
    fn remove(&self, factory: &Factory) -> Option<Instance>;

    /// Disposes everything this scope owns, newest first.
    fn destroy(&self);
}

/// Never reuses instances and never disposes them.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrototypeScope;

impl Scope for PrototypeScope {
    fn get(&self, _ctx: &Context, _factory: &Factory, create: &mut CreateFn<'_>) -> DiResult<Option<Instance>> {
        create().map(|created| created.instance)
    }

    fn remove(&self, _factory: &Factory) -> Option<Instance> {
        None
    }

    fn destroy(&self) {}
}

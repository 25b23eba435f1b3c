//! Resolver traits for typed resolution.

use std::sync::Arc;

use crate::creation::Instance;
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::signature::Parameter;
use crate::Context;

/// Object-safe resolution.
///
/// Works on type-erased [`Instance`]s; [`Resolver`] layers typed helpers on
/// top of it.
pub trait ResolverCore: Send + Sync {
    /// Resolves the component described by `param`.
    ///
    /// `Ok(None)` is only returned for factories that produce no value.
    fn resolve_parameter(&self, param: &Parameter, ctx: &Context) -> DiResult<Option<Instance>>;

    /// Every local component assignable to `key`, in registration order.
    fn resolve_all(&self, key: Key, ctx: &Context) -> DiResult<Vec<Instance>>;
}

/// Typed resolution helpers.
///
/// # Examples
///
/// ```
/// use ferrous_wire::{Container, Context, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn prefix(&self) -> &'static str;
/// }
///
/// struct Console;
/// impl Logger for Console {
///     fn prefix(&self) -> &'static str { "console" }
/// }
///
/// let container = Container::new();
/// container.register_value(Arc::new(42usize)).register().unwrap();
/// container.register_value(Arc::new(Console) as Arc<dyn Logger>).register().unwrap();
///
/// let ctx = Context::background();
/// assert_eq!(*container.get_required::<usize>(&ctx), 42);
/// assert_eq!(container.get::<dyn Logger>(&ctx).unwrap().prefix(), "console");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves the component of type `T`.
    fn get<T: ?Sized + Send + Sync + 'static>(&self, ctx: &Context) -> DiResult<Arc<T>> {
        let param = Parameter::direct(Key::of::<T>());
        downcast::<T>(self.resolve_parameter(&param, ctx)?)
    }

    /// Resolves the component of type `T` registered with qualifier `Q`.
    fn get_qualified<T, Q>(&self, ctx: &Context) -> DiResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
        Q: ?Sized + 'static,
    {
        let param = Parameter::qualified(
            Key::of::<crate::Qualified<T, Q>>(),
            Key::of::<T>(),
            Key::of::<Q>(),
        );
        downcast::<T>(self.resolve_parameter(&param, ctx)?)
    }

    /// Like [`get`](Resolver::get), panicking on failure.
    ///
    /// # Panics
    ///
    /// When the component cannot be resolved.
    fn get_required<T: ?Sized + Send + Sync + 'static>(&self, ctx: &Context) -> Arc<T> {
        match self.get::<T>(ctx) {
            Ok(value) => value,
            Err(err) => panic!("failed to resolve {}: {}", std::any::type_name::<T>(), err),
        }
    }

    /// Every local component assignable to `T`.
    fn get_all<T: ?Sized + Send + Sync + 'static>(&self, ctx: &Context) -> DiResult<Vec<Arc<T>>> {
        self.resolve_all(Key::of::<T>(), ctx)?
            .into_iter()
            .map(|instance| downcast::<T>(Some(instance)))
            .collect()
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}

fn downcast<T: ?Sized + Send + Sync + 'static>(instance: Option<Instance>) -> DiResult<Arc<T>> {
    instance
        .ok_or(DiError::CandidateNotFound(std::any::type_name::<T>()))?
        .downcast::<T>()
        .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))
}

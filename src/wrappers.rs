//! Dependency wrapper shapes.
//!
//! A constructor parameter of type `Arc<T>` asks for one resolved `T`. The
//! wrappers in this module change how that `T` is delivered:
//!
//! - [`Qualified<T, Q>`] only accepts factories registered with qualifier `Q`
//! - [`Provider<T>`] defers resolution and goes through `T`'s scope on every call
//! - [`Unmanaged<T>`] defers resolution and hands ownership (and disposal) to the caller
//!
//! Deferred wrappers add no edge to the dependency graph, which is how two
//! components that need each other lazily can still be registered.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use crate::creation::{DisposalHandle, ObjectFactory};
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::signature::{Argument, Dependency, Parameter};

/// A dependency restricted to factories carrying the qualifier `Q`.
///
/// `Q` is any `'static` marker type; factories opt in with
/// [`FactoryBuilder::qualify`](crate::FactoryBuilder::qualify).
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{Container, Context, Qualified, Resolver};
/// use std::sync::Arc;
///
/// struct Replica;
/// struct Pool(&'static str);
///
/// let container = Container::new();
/// container.factory(|| Arc::new(Pool("primary"))).primary().register().unwrap();
/// container.factory(|| Arc::new(Pool("replica"))).qualify::<Replica>().register().unwrap();
///
/// let ctx = Context::background();
/// let replica = container.inject::<Qualified<Pool, Replica>>(&ctx).unwrap();
/// assert_eq!(replica.0, "replica");
/// assert_eq!(container.get::<Pool>(&ctx).unwrap().0, "primary");
/// ```
pub struct Qualified<T: ?Sized, Q: ?Sized> {
    value: Arc<T>,
    _qualifier: PhantomData<fn() -> Box<Q>>,
}

impl<T: ?Sized, Q: ?Sized> Qualified<T, Q> {
    pub fn new(value: Arc<T>) -> Self {
        Self { value, _qualifier: PhantomData }
    }

    pub fn get(&self) -> Arc<T> {
        self.value.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.value
    }
}

impl<T: ?Sized, Q: ?Sized> Deref for Qualified<T, Q> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: ?Sized, Q: ?Sized> Clone for Qualified<T, Q> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T: ?Sized, Q: ?Sized> fmt::Debug for Qualified<T, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Qualified<{}, {}>", std::any::type_name::<T>(), std::any::type_name::<Q>())
    }
}

impl<T, Q> Dependency for Qualified<T, Q>
where
    T: ?Sized + Send + Sync + 'static,
    Q: ?Sized + 'static,
{
    fn parameter() -> Parameter {
        Parameter::qualified(Key::of::<Self>(), Key::of::<T>(), Key::of::<Q>())
    }

    fn from_argument(argument: Argument) -> DiResult<Self> {
        Arc::<T>::from_argument(argument).map(Self::new)
    }
}

/// Deferred access to a `T` resolved through its scope.
///
/// Every [`get`](Provider::get) behaves like a fresh resolution of `T`: a
/// singleton hands back the cached instance, a prototype a new one. Calling
/// it while the owning component is still being constructed, and the
/// requested component is further up the same creation chain, fails with
/// [`DiError::CurrentlyInCreation`].
pub struct Provider<T: ?Sized> {
    factory: ObjectFactory,
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Provider<T> {
    pub(crate) fn new(factory: ObjectFactory) -> Self {
        Self { factory, _marker: PhantomData }
    }

    pub fn get(&self) -> DiResult<Arc<T>> {
        let created = self.factory.create()?;
        created
            .instance
            .ok_or(DiError::CandidateNotFound(std::any::type_name::<T>()))?
            .downcast::<T>()
            .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))
    }
}

impl<T: ?Sized> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self { factory: self.factory.clone(), _marker: PhantomData }
    }
}

impl<T: ?Sized> fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Provider<{}>", std::any::type_name::<T>())
    }
}

impl<T> Dependency for Provider<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn parameter() -> Parameter {
        Parameter::provider(Key::of::<Self>(), Key::of::<T>())
    }

    fn from_argument(argument: Argument) -> DiResult<Self> {
        match argument {
            Argument::Provider(factory) => Ok(Self::new(factory)),
            _ => Err(DiError::TypeMismatch(std::any::type_name::<Self>())),
        }
    }
}

/// Deferred access to caller-owned instances of `T`.
///
/// Each [`get`](Unmanaged::get) builds a new instance that bypasses every
/// scope cache. When `T` has disposers, the returned [`DisposalHandle`] is
/// the only way to run them.
pub struct Unmanaged<T: ?Sized> {
    factory: ObjectFactory,
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Unmanaged<T> {
    pub(crate) fn new(factory: ObjectFactory) -> Self {
        Self { factory, _marker: PhantomData }
    }

    pub fn get(&self) -> DiResult<(Arc<T>, Option<DisposalHandle>)> {
        let created = self.factory.create()?;
        let instance = created
            .instance
            .ok_or(DiError::CandidateNotFound(std::any::type_name::<T>()))?
            .downcast::<T>()
            .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))?;
        Ok((instance, created.disposer))
    }
}

impl<T: ?Sized> Clone for Unmanaged<T> {
    fn clone(&self) -> Self {
        Self { factory: self.factory.clone(), _marker: PhantomData }
    }
}

impl<T: ?Sized> fmt::Debug for Unmanaged<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unmanaged<{}>", std::any::type_name::<T>())
    }
}

impl<T> Dependency for Unmanaged<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn parameter() -> Parameter {
        Parameter::unmanaged(Key::of::<Self>(), Key::of::<T>())
    }

    fn from_argument(argument: Argument) -> DiResult<Self> {
        match argument {
            Argument::Unmanaged(factory) => Ok(Self::new(factory)),
            _ => Err(DiError::TypeMismatch(std::any::type_name::<Self>())),
        }
    }
}

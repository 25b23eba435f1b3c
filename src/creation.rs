//! The creation protocol.
//!
//! Resolution selects a factory, asks the factory's scope for an instance
//! and, when the scope has nothing cached, builds one:
//!
//! 1. mocks short-circuit everything
//! 2. missing direct dependencies are reported all at once
//! 3. the factory is entered on the creation trail
//! 4. arguments are resolved, recursively going through the same steps
//! 5. the constructor runs, then the initializers
//! 6. a [`DisposalHandle`] is produced when the factory has disposers

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{DiError, DiResult};
use crate::factory::Factory;
use crate::internal::CreationTrail;
use crate::key::Key;
use crate::resolver;
use crate::scope::Scope;
use crate::signature::{Argument, Dependency, ParamKind, Parameter};
use crate::{Container, Context};

/// A type-erased component instance.
///
/// The payload is always an `Arc<T>`, so concrete types and trait objects
/// are stored the same way. Cloning is cheap.
#[derive(Clone)]
pub struct Instance(Arc<dyn Any + Send + Sync>);

impl Instance {
    pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Instance(Arc::new(value))
    }

    /// The typed component, if this instance holds a `T`.
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.0.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn is<T: ?Sized + Send + Sync + 'static>(&self) -> bool {
        self.0.is::<Arc<T>>()
    }

    /// True when both handles share the same cached instance.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Instance")
    }
}

/// Output of one creation.
pub struct Created {
    /// `None` only for constructors that return no value
    pub instance: Option<Instance>,
    pub disposer: Option<DisposalHandle>,
}

/// Runs a component's disposers exactly once.
///
/// Scopes keep the handles of the instances they own; unmanaged creations
/// hand them to the caller.
#[derive(Clone)]
pub struct DisposalHandle {
    inner: Arc<DisposalInner>,
}

struct DisposalInner {
    instance: Instance,
    factory: Arc<Factory>,
    context: Context,
    disposed: AtomicBool,
}

impl DisposalHandle {
    pub(crate) fn new(instance: Instance, factory: Arc<Factory>, context: Context) -> Self {
        Self {
            inner: Arc::new(DisposalInner {
                instance,
                factory,
                context,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Context the instance was created with.
    pub fn context(&self) -> &Context {
        &self.inner.context
    }

    pub fn component(&self) -> &'static str {
        self.inner.factory.name()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Runs the disposers in registration order. Later calls do nothing.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        trace!(component = self.component(), "disposing");
        for disposer in self.inner.factory.disposers() {
            disposer(&self.inner.instance);
        }
    }
}

impl fmt::Debug for DisposalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposalHandle")
            .field("component", &self.component())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Deferred creation bound to a container and a context.
#[derive(Clone)]
pub struct ObjectFactory {
    create: Arc<dyn Fn() -> DiResult<Created> + Send + Sync>,
}

impl ObjectFactory {
    pub(crate) fn new(create: impl Fn() -> DiResult<Created> + Send + Sync + 'static) -> Self {
        Self { create: Arc::new(create) }
    }

    pub fn create(&self) -> DiResult<Created> {
        (self.create)()
    }
}

impl fmt::Debug for ObjectFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ObjectFactory")
    }
}

impl Container {
    /// Resolves `param` with full observer notification.
    pub(crate) fn resolve_param(
        &self,
        param: &Parameter,
        ctx: &Context,
        trail: &CreationTrail,
    ) -> DiResult<Option<Instance>> {
        let key = param.value();
        let started = self.inner.observers.read().resolving(&key);
        let result = self.resolve_param_inner(param, ctx, trail);
        self.inner.observers.read().finished(&key, started, &result);
        result
    }

    fn resolve_param_inner(
        &self,
        param: &Parameter,
        ctx: &Context,
        trail: &CreationTrail,
    ) -> DiResult<Option<Instance>> {
        if let Some(parent) = self.delegate(param) {
            return parent.resolve_param(param, ctx, trail);
        }

        let factory = self.select_factory(param)?;
        match self.create_managed(&factory, ctx, trail)? {
            Some(instance) => factory.convert(instance, param.value()).map(Some),
            None => Ok(None),
        }
    }

    /// The ancestor to hand `param` to when nothing local can satisfy it.
    fn delegate(&self, param: &Parameter) -> Option<&Container> {
        self.inner.parent.as_ref().filter(|_| !self.contains_param(param))
    }

    pub(crate) fn contains_param(&self, param: &Parameter) -> bool {
        self.mock_for(param.value()).is_some() || self.inner.registry.read().has_candidates(param)
    }

    /// Local candidates, mocks or any ancestor able to satisfy `param`.
    fn satisfies(&self, param: &Parameter) -> bool {
        self.contains_param(param) || self.inner.parent.as_ref().map_or(false, |p| p.satisfies(param))
    }

    pub(crate) fn select_factory(&self, param: &Parameter) -> DiResult<Arc<Factory>> {
        let mock = self.mock_for(param.value());
        let registry = self.inner.registry.read();
        registry.with_candidates(param, |candidates| match mock {
            Some(mock) => {
                let mut all = Vec::with_capacity(candidates.preferred().len() + 1);
                all.push(mock);
                all.extend(candidates.preferred().iter().cloned());
                resolver::select(param.value(), &all)
            }
            None => resolver::select(param.value(), candidates.preferred()),
        })
    }

    pub(crate) fn scope_for(&self, factory: &Factory) -> DiResult<Arc<dyn Scope>> {
        if let Some(scope) = self.inner.scopes.read().get(factory.scope()) {
            return Ok(scope.clone());
        }
        match &self.inner.parent {
            Some(parent) => parent.scope_for(factory),
            None => Err(DiError::NoScopeRegistered(factory.scope().to_string())),
        }
    }

    /// Creates or fetches `factory`'s instance through its scope.
    pub(crate) fn create_managed(
        &self,
        factory: &Arc<Factory>,
        ctx: &Context,
        trail: &CreationTrail,
    ) -> DiResult<Option<Instance>> {
        if factory.is_mock() {
            return self.create_object(factory, ctx, trail).map(|created| created.instance);
        }
        let scope = self.scope_for(factory)?;
        scope.get(ctx, factory, &mut || self.create_object(factory, ctx, trail))
    }

    /// Runs the constructor of `factory` without consulting any scope.
    pub(crate) fn create_object(
        &self,
        factory: &Arc<Factory>,
        ctx: &Context,
        trail: &CreationTrail,
    ) -> DiResult<Created> {
        if let Some(mock) = factory.mock() {
            return Ok(Created { instance: Some(mock(ctx)), disposer: None });
        }

        self.check_missing_dependencies(factory)?;

        let guard = trail.enter(factory.id(), factory.name())?;
        let args = self.resolve_args_with(factory, ctx, trail)?;

        trace!(component = factory.name(), "invoking constructor");
        let instance = factory.invoke(args).map_err(|err| {
            debug!(component = factory.name(), error = %err, "constructor failed");
            err
        })?;

        if let Some(instance) = &instance {
            for initializer in factory.initializers() {
                initializer(instance);
            }
        }
        drop(guard);

        let disposer = match &instance {
            Some(instance) if factory.has_disposers() => {
                Some(DisposalHandle::new(instance.clone(), factory.clone(), ctx.clone()))
            }
            _ => None,
        };
        Ok(Created { instance, disposer })
    }

    fn check_missing_dependencies(&self, factory: &Factory) -> DiResult<()> {
        let missing: Vec<&'static str> = factory
            .parameters()
            .iter()
            .filter(|p| matches!(p.kind(), ParamKind::Direct | ParamKind::Qualified(_)))
            .filter(|p| !self.satisfies(p))
            .map(|p| p.key().display_name())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DiError::MissingDependency { component: factory.name(), missing })
        }
    }

    pub(crate) fn resolve_args_with(
        &self,
        factory: &Factory,
        ctx: &Context,
        trail: &CreationTrail,
    ) -> DiResult<Vec<Argument>> {
        factory
            .parameters()
            .iter()
            .map(|param| self.argument_for(param, ctx, trail))
            .collect()
    }

    pub(crate) fn argument_for(
        &self,
        param: &Parameter,
        ctx: &Context,
        trail: &CreationTrail,
    ) -> DiResult<Argument> {
        Ok(match param.kind() {
            ParamKind::Context => Argument::Context(ctx.clone()),
            ParamKind::Container => Argument::Container(self.bound(trail.clone())),
            ParamKind::Provider => {
                Argument::Provider(self.deferred(param.value(), true, ctx.clone(), Some(trail.clone())))
            }
            ParamKind::Unmanaged => {
                Argument::Unmanaged(self.deferred(param.value(), false, ctx.clone(), Some(trail.clone())))
            }
            ParamKind::Direct | ParamKind::Qualified(_) => self
                .resolve_param(param, ctx, trail)?
                .map(Argument::Instance)
                .ok_or(DiError::CandidateNotFound(param.value().display_name()))?,
        })
    }

    /// Object factory resolving `key` on every call.
    pub(crate) fn deferred(
        &self,
        key: Key,
        managed: bool,
        ctx: Context,
        trail: Option<CreationTrail>,
    ) -> ObjectFactory {
        let container = self.unbound();
        let param = self.param_for(key);
        ObjectFactory::new(move || {
            let trail = trail.as_ref().map(CreationTrail::fork).unwrap_or_default();
            container.create_for(&param, managed, &ctx, &trail)
        })
    }

    fn create_for(
        &self,
        param: &Parameter,
        managed: bool,
        ctx: &Context,
        trail: &CreationTrail,
    ) -> DiResult<Created> {
        if let Some(parent) = self.delegate(param) {
            return parent.create_for(param, managed, ctx, trail);
        }

        let factory = self.select_factory(param)?;
        if managed {
            let instance = match self.create_managed(&factory, ctx, trail)? {
                Some(instance) => Some(factory.convert(instance, param.value())?),
                None => None,
            };
            Ok(Created { instance, disposer: None })
        } else {
            let created = self.create_object(&factory, ctx, trail)?;
            let instance = match created.instance {
                Some(instance) => Some(factory.convert(instance, param.value())?),
                None => None,
            };
            Ok(Created { instance, disposer: created.disposer })
        }
    }

    /// Object factory for one specific registered factory.
    pub(crate) fn deferred_factory(&self, factory: Arc<Factory>, managed: bool, ctx: Context) -> ObjectFactory {
        let container = self.unbound();
        let trail = self.trail.clone();
        ObjectFactory::new(move || {
            let trail = trail.as_ref().map(CreationTrail::fork).unwrap_or_default();
            if managed {
                let instance = container.create_managed(&factory, &ctx, &trail)?;
                Ok(Created { instance, disposer: None })
            } else {
                container.create_object(&factory, &ctx, &trail)
            }
        })
    }

    /// Resolves any [`Dependency`] shape directly.
    ///
    /// `inject::<Arc<T>>` is a plain lookup, `inject::<Qualified<T, Q>>`
    /// applies the qualifier and `inject::<Provider<T>>` hands back a
    /// deferred handle, exactly as a constructor parameter of that type would
    /// receive.
    pub fn inject<D: Dependency>(&self, ctx: &Context) -> DiResult<D> {
        let param = D::parameter();
        let trail = self.entry_trail();
        let argument = self.argument_for(&param, ctx, &trail)?;
        D::from_argument(argument)
    }

    /// Starting trail for a resolution entering through this handle.
    pub(crate) fn entry_trail(&self) -> CreationTrail {
        self.trail.as_ref().map(CreationTrail::fork).unwrap_or_default()
    }
}

//! The container façade.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::creation::{Instance, ObjectFactory};
use crate::error::{DiError, DiResult};
use crate::factory::{ErasedCtor, Factory, FactoryBuilder};
use crate::filter::{FactoryFilter, FilteredFactories};
use crate::internal::CreationTrail;
use crate::key::Key;
use crate::observer::{DiObserver, Observers};
use crate::registry::Registry;
use crate::scope::{PrototypeScope, Scope, SingletonScope, SCOPE_PROTOTYPE, SCOPE_SINGLETON};
use crate::signature::{Argument, Constructor, ConstructorOutput, Parameter, Signature};
use crate::traits::ResolverCore;
use crate::Context;

/// Component container.
///
/// Registration happens through [`factory`](Container::factory),
/// [`register`](Container::register) and
/// [`register_value`](Container::register_value) until
/// [`initialize`](Container::initialize) locks the container and builds the
/// startup components. Resolution is available at any time and from any
/// thread; `Container` is a cheap handle around shared state.
///
/// A child created with [`with_parent`](Container::with_parent) resolves
/// locally when it has a candidate (or a mock) for the requested identity
/// and hands the whole request to its parent otherwise.
///
/// Components holding on to a `Container` or a [`Provider`](crate::Provider)
/// keep the container alive until [`destroy`](Container::destroy) releases
/// the cached instances.
///
/// # Examples
///
/// ```
/// use ferrous_wire::{Container, Context, Resolver};
/// use std::sync::Arc;
///
/// struct Config { url: &'static str }
/// struct Repository { config: Arc<Config> }
///
/// let container = Container::new();
/// container.register_value(Arc::new(Config { url: "postgres://localhost" })).register().unwrap();
/// container
///     .register(|config: Arc<Config>| Arc::new(Repository { config }))
///     .unwrap();
///
/// let ctx = Context::background();
/// container.initialize(&ctx).unwrap();
///
/// let repository = container.get::<Repository>(&ctx).unwrap();
/// assert_eq!(repository.config.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
    /// Set on handles injected into constructors
    pub(crate) trail: Option<CreationTrail>,
}

pub(crate) struct ContainerInner {
    pub(crate) parent: Option<Container>,
    pub(crate) locked: AtomicBool,
    pub(crate) registry: RwLock<Registry>,
    pub(crate) scopes: RwLock<AHashMap<String, Arc<dyn Scope>>>,
    pub(crate) singletons: Arc<SingletonScope>,
    pub(crate) mocks: RwLock<AHashMap<Key, Arc<Factory>>>,
    pub(crate) has_mocks: AtomicBool,
    pub(crate) observers: RwLock<Observers>,
}

impl Container {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Child container delegating unknown identities to `parent`.
    pub fn with_parent(parent: &Container) -> Self {
        Self::build(Some(parent.unbound()))
    }

    fn build(parent: Option<Container>) -> Self {
        let singletons = Arc::new(SingletonScope::new());
        let mut scopes: AHashMap<String, Arc<dyn Scope>> = AHashMap::new();
        scopes.insert(SCOPE_SINGLETON.to_string(), singletons.clone());
        scopes.insert(SCOPE_PROTOTYPE.to_string(), Arc::new(PrototypeScope));

        Container {
            inner: Arc::new(ContainerInner {
                parent,
                locked: AtomicBool::new(false),
                registry: RwLock::new(Registry::new()),
                scopes: RwLock::new(scopes),
                singletons,
                mocks: RwLock::new(AHashMap::new()),
                has_mocks: AtomicBool::new(false),
                observers: RwLock::new(Observers::default()),
            }),
            trail: None,
        }
    }

    pub(crate) fn unbound(&self) -> Container {
        Container { inner: self.inner.clone(), trail: None }
    }

    pub(crate) fn bound(&self, trail: CreationTrail) -> Container {
        Container { inner: self.inner.clone(), trail: Some(trail) }
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    /// True once [`initialize`](Container::initialize) ran.
    pub fn is_locked(&self) -> bool {
        self.inner.locked.load(Ordering::Acquire)
    }

    /// True when both handles refer to the same container.
    pub fn same(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Starts registering the constructor `ctor`.
    pub fn factory<C, Args>(&self, ctor: C) -> FactoryBuilder<'_, <C::Output as ConstructorOutput>::Component>
    where
        C: Constructor<Args>,
    {
        let name = std::any::type_name::<<C::Output as ConstructorOutput>::Component>();
        let factory = Signature::of::<C, Args>().map(|signature| {
            let erased: ErasedCtor = Arc::new(move |args: Vec<Argument>| {
                let output = ctor.construct(args)?;
                let value = output.into_result().map_err(|err| DiError::constructor(name, err))?;
                Ok(value.map(Instance::new))
            });
            Factory::new(signature, erased)
        });
        FactoryBuilder::new(self, factory)
    }

    /// Registers `ctor` with default options.
    pub fn register<C, Args>(&self, ctor: C) -> DiResult<Option<Arc<Factory>>>
    where
        C: Constructor<Args>,
    {
        self.factory(ctor).register()
    }

    /// Starts registering an existing value. Values are always singletons.
    pub fn register_value<T>(&self, value: Arc<T>) -> FactoryBuilder<'_, T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let factory = Signature::of_value::<T>().map(|signature| {
            let erased: ErasedCtor = Arc::new(move |_| Ok(Some(Instance::new(value.clone()))));
            Factory::new(signature, erased)
        });
        FactoryBuilder::for_value(self, factory)
    }

    pub(crate) fn register_factory(&self, factory: Factory) -> DiResult<Option<Arc<Factory>>> {
        if self.is_locked() {
            return Err(DiError::ContainerLocked);
        }
        if !factory.conditions().iter().all(|condition| condition(self, &factory)) {
            debug!(component = factory.name(), "registration skipped by condition");
            return Ok(None);
        }

        let mut registry = self.inner.registry.write();
        if self.is_locked() {
            return Err(DiError::ContainerLocked);
        }
        registry.register(factory).map(Some)
    }

    /// Adds a named scope.
    ///
    /// The built-in `singleton` and `prototype` scopes cannot be replaced.
    pub fn register_scope(&self, name: &str, scope: Arc<dyn Scope>) -> DiResult<()> {
        if self.is_locked() {
            return Err(DiError::ContainerLocked);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(DiError::InvalidScope("scope name must not be empty".into()));
        }
        if name == SCOPE_SINGLETON || name == SCOPE_PROTOTYPE {
            return Err(DiError::InvalidScope(format!("scope '{}' cannot be replaced", name)));
        }
        self.inner.scopes.write().insert(name.to_string(), scope);
        debug!(scope = name, "registered scope");
        Ok(())
    }

    /// Attaches an observer. Only allowed before the container is locked.
    pub fn add_observer(&self, observer: Arc<dyn DiObserver>) -> DiResult<()> {
        if self.is_locked() {
            return Err(DiError::ContainerLocked);
        }
        self.inner.observers.write().add(observer);
        Ok(())
    }

    /// Locks registration and creates every startup component, in ascending
    /// priority and then registration order. Stops at the first failure.
    pub fn initialize(&self, ctx: &Context) -> DiResult<()> {
        {
            let _registry = self.inner.registry.write();
            if self.inner.locked.swap(true, Ordering::AcqRel) {
                return Err(DiError::ContainerLocked);
            }
        }

        let startup = self.filter(FactoryFilter::new().startup()).sort();
        debug!(components = startup.len(), "initializing container");
        startup.for_each(|factory| {
            debug!(component = factory.name(), priority = factory.priority(), "creating startup component");
            self.get_object_factory(factory, true, ctx).create()?;
            Ok(ControlFlow::Continue(()))
        })
    }

    /// Resolves the component registered for `key`.
    pub fn resolve(&self, key: Key, ctx: &Context) -> DiResult<Option<Instance>> {
        let param = self.param_for(key);
        self.resolve_param(&param, ctx, &self.entry_trail())
    }

    /// True when this container (not its ancestors) can satisfy `key`.
    pub fn contains(&self, key: Key) -> bool {
        self.contains_param(&self.param_for(key))
    }

    /// Deferred creation of one specific factory.
    ///
    /// With `managed` the factory's scope is used; otherwise every call
    /// builds a new instance and returns its disposal handle.
    pub fn get_object_factory(&self, factory: &Arc<Factory>, managed: bool, ctx: &Context) -> ObjectFactory {
        self.deferred_factory(factory.clone(), managed, ctx.clone())
    }

    /// Deferred creation of whatever factory resolves `key` at call time.
    pub fn get_object_factory_for(&self, key: Key, managed: bool, ctx: &Context) -> ObjectFactory {
        self.deferred(key, managed, ctx.clone(), self.trail.clone())
    }

    /// Resolves the arguments `factory`'s constructor would receive.
    pub fn resolve_args(&self, factory: &Factory, ctx: &Context) -> DiResult<Vec<Argument>> {
        self.resolve_args_with(factory, ctx, &self.entry_trail())
    }

    /// Local factories matching `filter`, in registration order.
    pub fn filter(&self, filter: FactoryFilter) -> FilteredFactories {
        let factories: Vec<Arc<Factory>> = self.inner.registry.read().factories().to_vec();
        FilteredFactories::new(
            factories
                .into_iter()
                .filter(|factory| filter.matches(self, factory))
                .collect(),
        )
    }

    /// Disposes every singleton, newest first, and empties the cache.
    pub fn destroy_singletons(&self) {
        debug!(instances = self.inner.singletons.len(), "destroying singletons");
        self.inner.singletons.destroy();
    }

    /// Disposes singletons, then every custom scope.
    pub fn destroy(&self) {
        self.destroy_singletons();
        let scopes: Vec<(String, Arc<dyn Scope>)> = self
            .inner
            .scopes
            .read()
            .iter()
            .filter(|(name, _)| name.as_str() != SCOPE_SINGLETON && name.as_str() != SCOPE_PROTOTYPE)
            .map(|(name, scope)| (name.clone(), scope.clone()))
            .collect();
        for (name, scope) in scopes {
            debug!(scope = %name, "destroying scope");
            scope.destroy();
        }
    }

    /// Removes and disposes the cached instance resolved for `key`.
    pub fn destroy_object(&self, key: Key) -> DiResult<Option<Instance>> {
        let param = self.param_for(key);
        let factory = self.select_factory(&param)?;
        let scope = self.scope_for(&factory)?;
        Ok(scope.remove(&factory))
    }

    /// Descriptor for `key`, shared with the registry when known.
    pub(crate) fn param_for(&self, key: Key) -> Arc<Parameter> {
        self.inner
            .registry
            .read()
            .param(key)
            .unwrap_or_else(|| Arc::new(Parameter::direct(key)))
    }

    pub(crate) fn mock_for(&self, key: Key) -> Option<Arc<Factory>> {
        if !self.inner.has_mocks.load(Ordering::Acquire) {
            return None;
        }
        self.inner.mocks.read().get(&key).cloned()
    }

    /// Multi-line dump of the registered factories.
    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        use std::fmt::Write;

        let registry = self.inner.registry.read();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Container {{ factories: {}, locked: {}, child: {} }}",
            registry.len(),
            self.is_locked(),
            self.inner.parent.is_some()
        );
        for factory in registry.factories() {
            let deps: Vec<_> = factory.parameters().iter().map(|p| p.key().display_name()).collect();
            let _ = writeln!(
                out,
                "  #{} {} [{}] priority={}{}{}{} deps={:?}",
                factory.order(),
                factory.name(),
                factory.scope(),
                factory.priority(),
                if factory.is_primary() { " primary" } else { "" },
                if factory.is_alternative() { " alternative" } else { "" },
                if factory.is_startup() { " startup" } else { "" },
                deps
            );
        }
        out
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("factories", &self.inner.registry.read().len())
            .field("locked", &self.is_locked())
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}

impl ResolverCore for Container {
    fn resolve_parameter(&self, param: &Parameter, ctx: &Context) -> DiResult<Option<Instance>> {
        self.resolve_param(param, ctx, &self.entry_trail())
    }

    fn resolve_all(&self, key: Key, ctx: &Context) -> DiResult<Vec<Instance>> {
        let trail = self.entry_trail();
        let factories = self.filter(FactoryFilter::new().assignable_to_key(key));
        let mut instances = Vec::with_capacity(factories.len());
        for factory in &factories {
            if let Some(instance) = self.create_managed(factory, ctx, &trail)? {
                instances.push(factory.convert(instance, key)?);
            }
        }
        Ok(instances)
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        let pending = self.singletons.pending_disposals();
        if pending > 0 {
            warn!(pending, "container dropped without destroy(); singleton disposers did not run");
        }
    }
}

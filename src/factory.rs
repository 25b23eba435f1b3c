//! Factory descriptors and the registration builder.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::creation::Instance;
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::scope::{SCOPE_PROTOTYPE, SCOPE_SINGLETON};
use crate::signature::{Argument, Parameter, ReturnShape, Signature};
use crate::traits::{Dispose, Initialize};
use crate::{Container, Context};

/// Process-unique factory identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactoryId(u64);

impl FactoryId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        FactoryId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) type ErasedCtor = Arc<dyn Fn(Vec<Argument>) -> DiResult<Option<Instance>> + Send + Sync>;
pub(crate) type Hook = Arc<dyn Fn(&Instance) + Send + Sync>;
pub(crate) type Caster = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;
pub(crate) type MockFn = Arc<dyn Fn(&Context) -> Instance + Send + Sync>;

/// Registration-time predicate; returning `false` skips the registration.
pub type Condition = Arc<dyn Fn(&Container, &Factory) -> bool + Send + Sync>;

/// A registered constructor plus its metadata.
///
/// Factories are immutable once registered and are shared as
/// `Arc<Factory>` between the registry, the graph and the scopes.
pub struct Factory {
    id: FactoryId,
    order: usize,
    key: Key,
    returns: ReturnShape,
    parameters: SmallVec<[Arc<Parameter>; 4]>,
    scope: String,
    primary: bool,
    alternative: bool,
    startup: bool,
    priority: i32,
    qualifiers: SmallVec<[Key; 2]>,
    casts: SmallVec<[(Key, Caster); 1]>,
    initializers: Vec<Hook>,
    disposers: Vec<Hook>,
    conditions: Vec<Condition>,
    ctor: ErasedCtor,
    mock: Option<MockFn>,
}

impl Factory {
    pub(crate) fn new(signature: Signature, ctor: ErasedCtor) -> Self {
        Self {
            id: FactoryId::next(),
            order: 0,
            key: signature.key(),
            returns: signature.returns,
            parameters: signature.params.into_iter().map(Arc::new).collect(),
            scope: SCOPE_SINGLETON.to_string(),
            primary: false,
            alternative: false,
            startup: false,
            priority: 0,
            qualifiers: SmallVec::new(),
            casts: SmallVec::new(),
            initializers: Vec::new(),
            disposers: Vec::new(),
            conditions: Vec::new(),
            ctor,
            mock: None,
        }
    }

    /// Test double standing in for every factory of `key`.
    #[cfg_attr(not(any(test, feature = "testing")), allow(dead_code))]
    pub(crate) fn mocked(key: Key, mock: MockFn) -> Self {
        let signature = Signature {
            returns: ReturnShape { value: Some(key), error: false },
            params: Vec::new(),
        };
        let name = key.display_name();
        let ctor: ErasedCtor = Arc::new(move |_| Err(DiError::TypeMismatch(name)));
        let mut factory = Self::new(signature, ctor);
        factory.scope = SCOPE_PROTOTYPE.to_string();
        factory.mock = Some(mock);
        factory
    }

    pub fn id(&self) -> FactoryId {
        self.id
    }

    /// Position in registration order within the owning container.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Identity the constructor provides.
    pub fn key(&self) -> Key {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.display_name()
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn is_singleton(&self) -> bool {
        self.scope == SCOPE_SINGLETON
    }

    pub fn is_prototype(&self) -> bool {
        self.scope == SCOPE_PROTOTYPE
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_alternative(&self) -> bool {
        self.alternative
    }

    pub fn is_startup(&self) -> bool {
        self.startup
    }

    /// Lower values win disambiguation and run first at startup.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_mock(&self) -> bool {
        self.mock.is_some()
    }

    pub(crate) fn mock(&self) -> Option<&MockFn> {
        self.mock.as_ref()
    }

    pub fn qualifiers(&self) -> &[Key] {
        &self.qualifiers
    }

    pub fn has_qualifier(&self, qualifier: Key) -> bool {
        self.qualifiers.contains(&qualifier)
    }

    pub fn parameters(&self) -> &[Arc<Parameter>] {
        &self.parameters
    }

    pub fn returns_value(&self) -> bool {
        self.returns.value.is_some()
    }

    pub fn returns_error(&self) -> bool {
        self.returns.error
    }

    pub fn has_disposers(&self) -> bool {
        !self.disposers.is_empty()
    }

    /// True when instances can be handed out as `target` through a declared cast.
    pub fn is_assignable_to(&self, target: Key) -> bool {
        self.casts.iter().any(|(key, _)| *key == target)
    }

    /// Identities declared through [`FactoryBuilder::implements`].
    pub fn implemented(&self) -> impl Iterator<Item = Key> + '_ {
        self.casts.iter().map(|(key, _)| *key)
    }

    pub(crate) fn set_order(&mut self, order: usize) {
        self.order = order;
    }

    pub(crate) fn parameters_mut(&mut self) -> &mut SmallVec<[Arc<Parameter>; 4]> {
        &mut self.parameters
    }

    pub(crate) fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub(crate) fn initializers(&self) -> &[Hook] {
        &self.initializers
    }

    pub(crate) fn disposers(&self) -> &[Hook] {
        &self.disposers
    }

    pub(crate) fn invoke(&self, args: Vec<Argument>) -> DiResult<Option<Instance>> {
        (self.ctor)(args)
    }

    /// Converts an instance of this factory's key into `target`.
    pub(crate) fn convert(&self, instance: Instance, target: Key) -> DiResult<Instance> {
        if target == self.key {
            return Ok(instance);
        }
        self.casts
            .iter()
            .find(|(key, _)| *key == target)
            .and_then(|(_, cast)| cast(&instance))
            .ok_or(DiError::TypeMismatch(target.display_name()))
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("key", &self.key)
            .field("order", &self.order)
            .field("scope", &self.scope)
            .field("primary", &self.primary)
            .field("alternative", &self.alternative)
            .field("priority", &self.priority)
            .field("startup", &self.startup)
            .field("qualifiers", &self.qualifiers)
            .finish()
    }
}

/// Fluent registration of a single constructor.
///
/// Obtained from [`Container::factory`] or [`Container::register_value`].
/// Nothing is registered until [`register`](FactoryBuilder::register) is
/// called.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{Container, Context, Resolver};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// let container = Container::new();
/// container
///     .factory(|| Arc::new(English))
///     .implements::<dyn Greeter>(|english| english as Arc<dyn Greeter>)
///     .prototype()
///     .register()
///     .unwrap();
///
/// let greeter = container.get::<dyn Greeter>(&Context::background()).unwrap();
/// assert_eq!(greeter.greet(), "hello");
/// ```
#[must_use = "nothing is registered until register() is called"]
pub struct FactoryBuilder<'c, T: ?Sized> {
    container: &'c Container,
    factory: DiResult<Factory>,
    force_singleton: bool,
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<'c, T> FactoryBuilder<'c, T>
where
    T: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(container: &'c Container, factory: DiResult<Factory>) -> Self {
        Self { container, factory, force_singleton: false, _marker: PhantomData }
    }

    pub(crate) fn for_value(container: &'c Container, factory: DiResult<Factory>) -> Self {
        Self { container, factory, force_singleton: true, _marker: PhantomData }
    }

    fn update(mut self, f: impl FnOnce(&mut Factory)) -> Self {
        if let Ok(factory) = &mut self.factory {
            f(factory);
        }
        self
    }

    /// Applies a reusable bundle of options.
    ///
    /// ```rust
    /// use ferrous_wire::{Container, FactoryBuilder};
    /// use std::sync::Arc;
    ///
    /// fn request_handler<T: ?Sized + Send + Sync + 'static>(b: FactoryBuilder<'_, T>) -> FactoryBuilder<'_, T> {
    ///     b.prototype().alternative().priority(5)
    /// }
    ///
    /// let container = Container::new();
    /// container.factory(|| Arc::new(1u16)).apply(request_handler).register().unwrap();
    /// ```
    pub fn apply(self, options: impl FnOnce(Self) -> Self) -> Self {
        options(self)
    }

    /// Wins disambiguation over non-primary candidates.
    pub fn primary(self) -> Self {
        self.update(|f| f.primary = true)
    }

    /// Loses disambiguation to any non-alternative candidate.
    pub fn alternative(self) -> Self {
        self.update(|f| f.alternative = true)
    }

    pub fn priority(self, priority: i32) -> Self {
        self.update(|f| f.priority = priority)
    }

    /// Eagerly created by [`Container::initialize`], in ascending `priority`.
    pub fn startup(self, priority: i32) -> Self {
        self.update(|f| {
            f.startup = true;
            f.priority = priority;
        })
    }

    pub fn singleton(self) -> Self {
        self.scoped(SCOPE_SINGLETON)
    }

    pub fn prototype(self) -> Self {
        self.scoped(SCOPE_PROTOTYPE)
    }

    /// Binds the factory to a named scope registered with
    /// [`Container::register_scope`].
    pub fn scoped(self, name: impl Into<String>) -> Self {
        let name = name.into().trim().to_string();
        self.update(|f| f.scope = name)
    }

    /// Tags the factory with the marker type `Q`.
    pub fn qualify<Q: ?Sized + 'static>(self) -> Self {
        self.update(|f| {
            let key = Key::of::<Q>();
            if !f.qualifiers.contains(&key) {
                f.qualifiers.push(key);
            }
        })
    }

    /// Makes the component available as `I` (typically a trait object).
    ///
    /// Requests for `I` match this factory as a structural candidate; exact
    /// registrations of `I` take precedence.
    pub fn implements<I>(self, cast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let caster: Caster = Arc::new(move |instance: &Instance| {
            instance.downcast::<T>().map(|value| Instance::new(cast(value)))
        });
        self.update(|f| {
            let key = Key::of::<I>();
            if key != f.key && !f.casts.iter().any(|(k, _)| *k == key) {
                f.casts.push((key, caster));
            }
        })
    }

    /// Runs after construction, before the instance is cached or returned.
    pub fn initializer(self, hook: impl Fn(&Arc<T>) + Send + Sync + 'static) -> Self {
        let hook: Hook = Arc::new(move |instance: &Instance| {
            if let Some(value) = instance.downcast::<T>() {
                hook(&value);
            }
        });
        self.update(|f| f.initializers.push(hook))
    }

    /// Runs when the owning scope releases the instance.
    pub fn disposer(self, hook: impl Fn(&Arc<T>) + Send + Sync + 'static) -> Self {
        let hook: Hook = Arc::new(move |instance: &Instance| {
            if let Some(value) = instance.downcast::<T>() {
                hook(&value);
            }
        });
        self.update(|f| f.disposers.push(hook))
    }

    /// Registration is skipped when any condition returns `false`.
    pub fn condition(self, condition: impl Fn(&Container, &Factory) -> bool + Send + Sync + 'static) -> Self {
        let condition: Condition = Arc::new(condition);
        self.update(|f| f.conditions.push(condition))
    }

    /// Registers the factory.
    ///
    /// Returns `Ok(None)` when a condition vetoed the registration.
    pub fn register(self) -> DiResult<Option<Arc<Factory>>> {
        let mut factory = self.factory?;
        if self.force_singleton {
            factory.scope = SCOPE_SINGLETON.to_string();
        }
        if !factory.returns_value() {
            factory.initializers.clear();
            factory.disposers.clear();
            factory.casts.clear();
        }
        if factory.scope.is_empty() {
            return Err(DiError::InvalidScope(String::new()));
        }
        self.container.register_factory(factory)
    }
}

impl<'c, T> FactoryBuilder<'c, T>
where
    T: Initialize + Send + Sync + 'static,
{
    /// Calls [`Initialize::initialize`] on every new instance.
    pub fn initializable(self) -> Self {
        self.initializer(|value| value.initialize())
    }
}

impl<'c, T> FactoryBuilder<'c, T>
where
    T: Dispose + Send + Sync + 'static,
{
    /// Calls [`Dispose::dispose`] when the instance is released.
    pub fn disposable(self) -> Self {
        self.disposer(|value| value.dispose())
    }
}

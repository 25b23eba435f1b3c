//! Lifecycle traits.

/// Post-construction hook, opted into with
/// [`FactoryBuilder::initializable`](crate::FactoryBuilder::initializable).
///
/// Runs after the constructor returned and before the instance is cached or
/// handed out.
///
/// # Examples
///
/// ```
/// use ferrous_wire::{Container, Context, Initialize, Resolver};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Cache {
///     warm: AtomicBool,
/// }
///
/// impl Initialize for Cache {
///     fn initialize(&self) {
///         self.warm.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let container = Container::new();
/// container.factory(|| Arc::new(Cache::default())).initializable().register().unwrap();
///
/// let cache = container.get::<Cache>(&Context::background()).unwrap();
/// assert!(cache.warm.load(Ordering::SeqCst));
/// ```
pub trait Initialize: Send + Sync + 'static {
    fn initialize(&self);
}

/// Pre-destruction hook, opted into with
/// [`FactoryBuilder::disposable`](crate::FactoryBuilder::disposable).
///
/// Runs when the owning scope releases the instance: on
/// [`Container::destroy`](crate::Container::destroy) for singletons, at the
/// end of a session for context scopes, or through the
/// [`DisposalHandle`](crate::DisposalHandle) for unmanaged instances.
///
/// # Examples
///
/// ```
/// use ferrous_wire::{Container, Context, Dispose, Resolver};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Pool {
///     closed: AtomicBool,
/// }
///
/// impl Dispose for Pool {
///     fn dispose(&self) {
///         self.closed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let container = Container::new();
/// container.factory(|| Arc::new(Pool::default())).disposable().register().unwrap();
///
/// let pool = container.get::<Pool>(&Context::background()).unwrap();
/// container.destroy();
/// assert!(pool.closed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    fn dispose(&self);
}

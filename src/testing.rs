//! Test doubles.
//!
//! A mock replaces every candidate for one identity: resolutions of `T`
//! return the mock's value without consulting any scope, and dependencies
//! of the replaced factories are never checked. Available in unit tests and
//! with the `testing` feature.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::creation::Instance;
use crate::factory::{Factory, FactoryId, MockFn};
use crate::key::Key;
use crate::{Container, Context};

impl Container {
    /// Returns `value` for every resolution of `T` until the guard drops.
    ///
    /// # Examples
    ///
    /// Requires the `testing` feature outside unit tests.
    ///
    /// ```ignore
    /// use ferrous_wire::{Container, Context, Resolver};
    /// use std::sync::Arc;
    ///
    /// let container = Container::new();
    /// container.register_value(Arc::new(String::from("real"))).register().unwrap();
    ///
    /// let ctx = Context::background();
    /// {
    ///     let _guard = container.mock(Arc::new(String::from("fake")));
    ///     assert_eq!(*container.get::<String>(&ctx).unwrap(), "fake");
    /// }
    /// assert_eq!(*container.get::<String>(&ctx).unwrap(), "real");
    /// ```
    pub fn mock<T>(&self, value: Arc<T>) -> MockGuard
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.mock_with::<T>(move |_| value.clone())
    }

    /// Calls `supply` for every resolution of `T` until the guard drops.
    pub fn mock_with<T>(&self, supply: impl Fn(&Context) -> Arc<T> + Send + Sync + 'static) -> MockGuard
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = Key::of::<T>();
        let mock: MockFn = Arc::new(move |ctx: &Context| Instance::new(supply(ctx)));
        let factory = Arc::new(Factory::mocked(key, mock));
        let id = factory.id();

        self.inner.mocks.write().insert(key, factory);
        self.inner.has_mocks.store(true, Ordering::Release);
        tracing::debug!(component = key.display_name(), "mock installed");

        MockGuard { container: self.unbound(), key, id, active: true }
    }

    fn remove_mock(&self, key: Key, id: FactoryId) {
        let mut mocks = self.inner.mocks.write();
        if mocks.get(&key).map_or(false, |mock| mock.id() == id) {
            mocks.remove(&key);
        }
        self.inner.has_mocks.store(!mocks.is_empty(), Ordering::Release);
    }
}

/// Removes its mock when dropped.
///
/// Installing a second mock for the same type replaces the first; the
/// replaced guard then has nothing left to remove.
#[must_use = "the mock is removed as soon as the guard is dropped"]
pub struct MockGuard {
    container: Container,
    key: Key,
    id: FactoryId,
    active: bool,
}

impl MockGuard {
    /// Removes the mock now.
    pub fn cleanup(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.active) {
            self.container.remove_mock(self.key, self.id);
        }
    }
}

impl Drop for MockGuard {
    fn drop(&mut self) {
        self.release();
    }
}

//! Resolution observers.
//!
//! Observers are notified synchronously around every resolution, including
//! the nested resolutions of constructor arguments. Keep implementations
//! cheap: they run on the resolving thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::DiError;
use crate::Key;

/// Observer of resolution events.
///
/// # Examples
///
/// ```
/// use ferrous_wire::{Container, Context, DiObserver, Key, Resolver};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Recorder(Mutex<Vec<String>>);
///
/// impl DiObserver for Recorder {
///     fn resolving(&self, key: &Key) {
///         self.0.lock().unwrap().push(format!("resolving {}", key.display_name()));
///     }
///
///     fn resolved(&self, key: &Key, _duration: Duration) {
///         self.0.lock().unwrap().push(format!("resolved {}", key.display_name()));
///     }
/// }
///
/// let recorder = Arc::new(Recorder::default());
/// let container = Container::new();
/// container.add_observer(recorder.clone()).unwrap();
/// container.factory(|| Arc::new(42u32)).register().unwrap();
///
/// container.get::<u32>(&Context::background()).unwrap();
/// assert_eq!(recorder.0.lock().unwrap().as_slice(), ["resolving u32", "resolved u32"]);
/// ```
pub trait DiObserver: Send + Sync {
    /// Called before candidate selection.
    fn resolving(&self, key: &Key);

    /// Called after a successful resolution.
    ///
    /// `duration` covers selection plus, on a cache miss, construction of
    /// the component and all of its dependencies.
    fn resolved(&self, key: &Key, duration: Duration);

    /// Called when resolution fails.
    fn resolution_failed(&self, key: &Key, error: &DiError) {
        let _ = (key, error);
    }
}

/// Observers registered on one container.
#[derive(Default)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    /// Notifies `resolving` and returns the start time when anyone listens.
    #[inline]
    pub(crate) fn resolving(&self, key: &Key) -> Option<Instant> {
        if !self.has_observers() {
            return None;
        }
        for observer in &self.observers {
            observer.resolving(key);
        }
        Some(Instant::now())
    }

    #[inline]
    pub(crate) fn finished<T>(&self, key: &Key, started: Option<Instant>, result: &Result<T, DiError>) {
        let Some(started) = started else { return };
        match result {
            Ok(_) => {
                let duration = started.elapsed();
                for observer in &self.observers {
                    observer.resolved(key, duration);
                }
            }
            Err(error) => {
                for observer in &self.observers {
                    observer.resolution_failed(key, error);
                }
            }
        }
    }
}

/// Emits resolution events through `tracing`.
///
/// Events are logged at `TRACE` (resolving), `DEBUG` (resolved) and `WARN`
/// (failures) under the `ferrous_wire::resolve` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl DiObserver for TracingObserver {
    fn resolving(&self, key: &Key) {
        tracing::trace!(target: "ferrous_wire::resolve", component = key.display_name(), "resolving");
    }

    fn resolved(&self, key: &Key, duration: Duration) {
        tracing::debug!(
            target: "ferrous_wire::resolve",
            component = key.display_name(),
            elapsed_us = duration.as_micros() as u64,
            "resolved"
        );
    }

    fn resolution_failed(&self, key: &Key, error: &DiError) {
        tracing::warn!(target: "ferrous_wire::resolve", component = key.display_name(), %error, "resolution failed");
    }
}

/// Counts resolutions, failures and time spent resolving.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    resolutions: AtomicU64,
    failures: AtomicU64,
    total_nanos: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution_count(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn total_resolution_time(&self) -> Duration {
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
    }

    pub fn average_resolution_time(&self) -> Option<Duration> {
        match self.resolution_count() {
            0 => None,
            count => Some(self.total_resolution_time() / count as u32),
        }
    }

    pub fn reset(&self) {
        self.resolutions.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.total_nanos.store(0, Ordering::Relaxed);
    }
}

impl DiObserver for MetricsObserver {
    fn resolving(&self, _key: &Key) {}

    fn resolved(&self, _key: &Key, duration: Duration) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn resolution_failed(&self, _key: &Key, _error: &DiError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }
}

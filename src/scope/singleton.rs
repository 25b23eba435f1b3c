use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::creation::{Created, Instance};
use crate::error::DiResult;
use crate::factory::{Factory, FactoryId};
use crate::internal::DisposeBag;
use crate::scope::{CreateFn, Scope};
use crate::Context;

/// One instance per factory for the lifetime of the container.
///
/// Creation happens outside the cache lock. When two threads race on the
/// same factory, the first insert wins; the loser's instance is disposed and
/// both callers observe the winner.
#[derive(Default)]
pub struct SingletonScope {
    objects: RwLock<AHashMap<FactoryId, Instance>>,
    disposers: Mutex<DisposeBag>,
}

impl SingletonScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Instances still waiting for disposal.
    pub fn pending_disposals(&self) -> usize {
        self.disposers.lock().len()
    }

    pub(crate) fn store(&self, factory: &Factory, created: Created) -> Option<Instance> {
        let Created { instance, disposer } = created;
        let instance = instance?;

        let mut objects = self.objects.write();
        if let Some(winner) = objects.get(&factory.id()) {
            let winner = winner.clone();
            drop(objects);
            if let Some(loser) = disposer {
                trace!(component = factory.name(), "discarding concurrently created singleton");
                loser.dispose();
            }
            return Some(winner);
        }

        objects.insert(factory.id(), instance.clone());
        if let Some(disposer) = disposer {
            self.disposers.lock().push(factory.id(), disposer);
        }
        Some(instance)
    }
}

impl Scope for SingletonScope {
    fn get(&self, _ctx: &Context, factory: &Factory, create: &mut CreateFn<'_>) -> DiResult<Option<Instance>> {
        if let Some(instance) = self.objects.read().get(&factory.id()) {
            return Ok(Some(instance.clone()));
        }
        let created = create()?;
        Ok(self.store(factory, created))
    }

    fn remove(&self, factory: &Factory) -> Option<Instance> {
        let instance = self.objects.write().remove(&factory.id());
        let disposer = self.disposers.lock().take(factory.id());
        if let Some(disposer) = disposer {
            disposer.dispose();
        }
        instance
    }

    fn destroy(&self) {
        let handles = self.disposers.lock().drain_reverse();
        for handle in handles {
            handle.dispose();
        }
        self.objects.write().clear();
    }
}

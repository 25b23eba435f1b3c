//! Re-entrant creation detection.
//!
//! A [`CreationTrail`] records the factories whose constructors are running
//! in one resolution chain. Entering a factory already on the trail means
//! the chain came back to it before it finished, which is reported as
//! [`DiError::CurrentlyInCreation`] instead of recursing forever.
//!
//! Trails are passed explicitly through resolution rather than kept in
//! thread-local state, so a chain that hops threads (or that is resumed
//! later through a provider) keeps its own view.

use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::error::{DiError, DiResult};
use crate::factory::FactoryId;

const MAX_DEPTH: usize = 1024;

type Entries = SmallVec<[(FactoryId, &'static str); 8]>;

/// Set of factories currently under construction in one chain.
#[derive(Clone, Default)]
pub(crate) struct CreationTrail {
    live: Arc<Mutex<Entries>>,
}

impl CreationTrail {
    /// Marks `id` as in creation until the returned guard drops.
    pub(crate) fn enter(&self, id: FactoryId, name: &'static str) -> DiResult<TrailGuard> {
        let mut live = self.live.lock();
        if live.iter().any(|(entry, _)| *entry == id) {
            let path: Vec<_> = live.iter().map(|(_, n)| *n).chain(std::iter::once(name)).collect();
            tracing::debug!(component = name, path = ?path, "re-entrant creation");
            return Err(DiError::CurrentlyInCreation(name));
        }
        if live.len() >= MAX_DEPTH {
            return Err(DiError::CurrentlyInCreation(name));
        }
        live.push((id, name));
        Ok(TrailGuard { trail: self.clone(), id })
    }

    /// Independent copy of the current entries.
    ///
    /// Deferred handles fork the trail of the constructor that received
    /// them: calling back into a factory that is still running is caught,
    /// while later or concurrent calls start from a clean slate once the
    /// entries present at fork time are gone.
    pub(crate) fn fork(&self) -> Self {
        let live = self.live.lock();
        Self { live: Arc::new(Mutex::new(live.clone())) }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: FactoryId) -> bool {
        self.live.lock().iter().any(|(entry, _)| *entry == id)
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.live.lock().len()
    }
}

/// Removes its factory from the trail on drop.
pub(crate) struct TrailGuard {
    trail: CreationTrail,
    id: FactoryId,
}

impl Drop for TrailGuard {
    fn drop(&mut self) {
        let mut live = self.trail.live.lock();
        if let Some(pos) = live.iter().rposition(|(entry, _)| *entry == self.id) {
            live.remove(pos);
        }
    }
}

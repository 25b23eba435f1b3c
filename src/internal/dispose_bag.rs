//! Ordered disposal of scope-owned instances.

use crate::creation::DisposalHandle;
use crate::factory::FactoryId;

/// Disposal handles in creation order, run last-in first-out.
#[derive(Default)]
pub(crate) struct DisposeBag {
    handles: Vec<(FactoryId, DisposalHandle)>,
}

impl DisposeBag {
    pub(crate) fn push(&mut self, id: FactoryId, handle: DisposalHandle) {
        self.handles.push((id, handle));
    }

    /// Takes the handle registered for `id`, if any.
    pub(crate) fn take(&mut self, id: FactoryId) -> Option<DisposalHandle> {
        let pos = self.handles.iter().rposition(|(entry, _)| *entry == id)?;
        Some(self.handles.remove(pos).1)
    }

    /// Drains every handle, newest first.
    ///
    /// Handles are returned instead of run so callers can dispose without
    /// holding their own locks.
    pub(crate) fn drain_reverse(&mut self) -> Vec<DisposalHandle> {
        let mut handles: Vec<_> = self.handles.drain(..).map(|(_, h)| h).collect();
        handles.reverse();
        handles
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }
}

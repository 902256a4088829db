//! Targets waiting to hear that their controls changed.
//!
//! A non-empty batch always has exactly one after-commit callback outstanding
//! with the compositor: the callback is requested when the first target is
//! queued and the batch is emptied in the same step that delivers it.

use crate::host::InsetsHost;
use crate::types::ControlTarget;
use log::trace;

#[derive(Debug, Clone, Default)]
pub struct ControlChangeBatch {
    /// Insertion-ordered, no duplicates.
    targets: Vec<ControlTarget>,
}

impl ControlChangeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `target` once. The first target of a batch requests the
    /// after-commit callback.
    pub fn enqueue(&mut self, target: ControlTarget, host: &mut dyn InsetsHost) {
        if self.targets.contains(&target) {
            return;
        }
        if self.targets.is_empty() {
            trace!("scheduling insets control flush after next commit");
            host.schedule_after_commit();
        }
        self.targets.push(target);
    }

    /// An after-commit callback is outstanding.
    pub fn is_scheduled(&self) -> bool {
        !self.targets.is_empty()
    }

    pub fn targets(&self) -> &[ControlTarget] {
        &self.targets
    }

    /// Empties the batch for delivery.
    pub fn take(&mut self) -> Vec<ControlTarget> {
        std::mem::take(&mut self.targets)
    }
}

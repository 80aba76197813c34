//! Per-tick accounting.

use cronfleet_config::ErrorPolicy;
use cronfleet_protocols::ErrorClass;

use crate::error::DispatchError;

/// What one tick of a loop did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Units of work completed.
    pub processed: usize,
    /// Items put back on their queue for a later tick.
    pub requeued: usize,
    pub transient: usize,
    pub corrupt: usize,
    pub configuration: usize,
    pub delivery: usize,
}

impl TickReport {
    /// Count a failure by class.
    pub fn record(&mut self, err: &DispatchError) {
        match err.class() {
            ErrorClass::Transient => self.transient += 1,
            ErrorClass::Corrupt => self.corrupt += 1,
            ErrorClass::Configuration => self.configuration += 1,
            ErrorClass::Delivery => self.delivery += 1,
        }
    }

    /// Count a failure and decide whether the loop keeps going.
    pub fn settle(&mut self, policy: ErrorPolicy, err: DispatchError) -> Result<(), DispatchError> {
        self.record(&err);
        match policy {
            ErrorPolicy::Isolate => Ok(()),
            ErrorPolicy::FailFast => Err(err),
        }
    }

    pub fn failures(&self) -> usize {
        self.transient + self.corrupt + self.configuration + self.delivery
    }

    /// Whether the loop should back off before the next tick.
    pub fn is_failing(&self) -> bool {
        self.transient > 0
    }

    pub fn is_idle(&self) -> bool {
        self.processed == 0 && self.requeued == 0 && self.failures() == 0
    }
}

//! Display collaborator.
//!
//! The scheduler pushes a [`StatusFrame`] every display period and on wake.
//! Implementations decide how to present it; the core never reads back.

use crate::calibrator::TriggerLevel;
use crate::sampler::FilteredPressure;
use crate::status::DeviceState;

/// Snapshot of everything a status screen shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFrame {
    pub pressure: FilteredPressure,
    pub trigger_level: TriggerLevel,
    /// Draft level while adjusting, otherwise `None`.
    pub draft_level: Option<TriggerLevel>,
    pub state: DeviceState,
    pub output_on: bool,
    pub adjust_remaining_ms: Option<u64>,
    pub persistence_fault: bool,
    pub sensor_faults: u64,
}

impl StatusFrame {
    /// Level the screen should show: the draft while adjusting.
    pub fn shown_level(&self) -> TriggerLevel {
        self.draft_level.unwrap_or(self.trigger_level)
    }
}

pub trait StatusDisplay {
    fn render(&mut self, frame: &StatusFrame);
    fn set_awake(&mut self, awake: bool);
}

impl<T: StatusDisplay + ?Sized> StatusDisplay for Box<T> {
    fn render(&mut self, frame: &StatusFrame) {
        (**self).render(frame);
    }
    fn set_awake(&mut self, awake: bool) {
        (**self).set_awake(awake);
    }
}

/// Display that discards everything (headless runs and benches).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl StatusDisplay for NullDisplay {
    fn render(&mut self, _frame: &StatusFrame) {}
    fn set_awake(&mut self, _awake: bool) {}
}

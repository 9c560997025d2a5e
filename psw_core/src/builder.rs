//! Builder for `SchedulerLoop`.
//!
//! Collects the four hardware capabilities plus optional config, clock and
//! display, validates, loads the persisted trigger level and assembles the
//! loop. Missing parts are reported as `BuildError`.

use std::sync::Arc;

use psw_traits::{Bridge, Clock, DigitalInputs, DigitalOutputs, MonotonicClock, NvStore};

use crate::calibrator::Calibrator;
use crate::config::SwitchConfig;
use crate::display::{NullDisplay, StatusDisplay};
use crate::error::{BuildError, Result};
use crate::scheduler::SchedulerLoop;

pub struct SwitchBuilder<B, I, O, N> {
    bridge: Option<B>,
    inputs: Option<I>,
    outputs: Option<O>,
    store: Option<N>,
    config: Option<SwitchConfig>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    display: Option<Box<dyn StatusDisplay>>,
}

impl<B, I, O, N> Default for SwitchBuilder<B, I, O, N> {
    fn default() -> Self {
        Self {
            bridge: None,
            inputs: None,
            outputs: None,
            store: None,
            config: None,
            clock: None,
            display: None,
        }
    }
}

impl<B, I, O, N> SwitchBuilder<B, I, O, N>
where
    B: Bridge,
    I: DigitalInputs,
    O: DigitalOutputs,
    N: NvStore,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bridge(mut self, bridge: B) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn with_inputs(mut self, inputs: I) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn with_outputs(mut self, outputs: O) -> Self {
        self.outputs = Some(outputs);
        self
    }

    pub fn with_store(mut self, store: N) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_config(mut self, cfg: SwitchConfig) -> Self {
        self.config = Some(cfg);
        self
    }

    /// Inject a clock (tests use `ManualClock`). Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Defaults to `NullDisplay`.
    pub fn with_display(mut self, display: impl StatusDisplay + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }

    /// Validate, load the persisted trigger level and assemble the loop.
    pub fn build(self) -> Result<SchedulerLoop<B, I, O, N>> {
        let bridge = self
            .bridge
            .ok_or_else(|| eyre::Report::new(BuildError::MissingBridge))?;
        let inputs = self
            .inputs
            .ok_or_else(|| eyre::Report::new(BuildError::MissingInputs))?;
        let outputs = self
            .outputs
            .ok_or_else(|| eyre::Report::new(BuildError::MissingOutputs))?;
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        let cfg = self.config.unwrap_or_default();
        cfg.validate()?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let display = self.display.unwrap_or_else(|| Box::new(NullDisplay));

        let mut calibrator = Calibrator::new(store, &cfg);
        let level = calibrator.load();
        tracing::info!(
            level = level.get(),
            self_healed = calibrator.stats().self_heals > 0,
            "trigger level loaded"
        );

        Ok(SchedulerLoop::from_parts(
            cfg, clock, bridge, inputs, outputs, calibrator, display,
        ))
    }
}

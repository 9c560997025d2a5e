//! Fixed-tick cooperative scheduler.
//!
//! One call to [`SchedulerLoop::tick`] runs every component once, in order:
//! inputs and debounce, encoder decode, tare, adjustment (and store), sample,
//! threshold, actuator, display, diagnostics. All timeouts compare monotonic
//! milliseconds from the injected clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use psw_traits::{Bridge, Clock, DigitalInputs, DigitalOutputs, InputLine, NvStore};

use crate::actuator::ActuatorDriver;
use crate::adjust::{AdjustEvent, AdjustmentInput, AdjustmentStateMachine};
use crate::calibrator::{Calibrator, TriggerLevel};
use crate::config::SwitchConfig;
use crate::debounce::{Debouncer, Edge};
use crate::diagnostics::Diagnostics;
use crate::display::{StatusDisplay, StatusFrame};
use crate::encoder::EncoderDecoder;
use crate::hw_error::map_hw_error;
use crate::sampler::{FilteredPressure, SensorSampler};
use crate::status::DeviceState;
use crate::threshold::{ActuatorCommand, ThresholdEngine};
use crate::util::elapsed_at_least;

/// Outcome of one tick, for drivers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub now_ms: u64,
    pub pressure: FilteredPressure,
    pub command: ActuatorCommand,
    pub output_on: bool,
    pub state: DeviceState,
    pub adjust: AdjustEvent,
    pub tared: bool,
    pub frame_rendered: bool,
}

/// Debounced edges seen in one tick.
#[derive(Debug, Default, Clone, Copy)]
struct InputEdges {
    switch: Option<Edge>,
    tare: Option<Edge>,
    stretch: Option<Edge>,
    phase: bool,
}

impl InputEdges {
    fn any(&self) -> bool {
        self.switch.is_some() || self.tare.is_some() || self.stretch.is_some() || self.phase
    }
}

struct InputDebouncers {
    switch: Debouncer,
    tare: Debouncer,
    stretch: Debouncer,
    phase_a: Debouncer,
    phase_b: Debouncer,
}

impl InputDebouncers {
    fn new(cfg: &SwitchConfig) -> Self {
        Self {
            switch: Debouncer::new(cfg.input.debounce_ms),
            tare: Debouncer::new(cfg.input.debounce_ms),
            stretch: Debouncer::new(cfg.input.debounce_ms),
            phase_a: Debouncer::new(cfg.input.phase_debounce_ms),
            phase_b: Debouncer::new(cfg.input.phase_debounce_ms),
        }
    }

    fn for_line(&mut self, line: InputLine) -> &mut Debouncer {
        match line {
            InputLine::EncoderA => &mut self.phase_a,
            InputLine::EncoderB => &mut self.phase_b,
            InputLine::EncoderSwitch => &mut self.switch,
            InputLine::TareButton => &mut self.tare,
            InputLine::StretchEnable => &mut self.stretch,
        }
    }
}

pub struct SchedulerLoop<B, I, O, N>
where
    B: Bridge,
    I: DigitalInputs,
    O: DigitalOutputs,
    N: NvStore,
{
    cfg: SwitchConfig,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    sampler: SensorSampler<B>,
    inputs: I,
    debounce: InputDebouncers,
    encoder: EncoderDecoder,
    calibrator: Calibrator<N>,
    adjust: AdjustmentStateMachine,
    threshold: ThresholdEngine,
    actuator: ActuatorDriver<O>,
    display: Box<dyn StatusDisplay>,
    awake: bool,
    last_activity_ms: u64,
    last_frame_ms: Option<u64>,
    activity_state: DeviceState,
    state: DeviceState,
    last_command: ActuatorCommand,
    feedback_until: Option<u64>,
    last_diag_ms: u64,
    ticks: u64,
    overruns: u64,
    input_errors: u64,
}

impl<B, I, O, N> SchedulerLoop<B, I, O, N>
where
    B: Bridge,
    I: DigitalInputs,
    O: DigitalOutputs,
    N: NvStore,
{
    /// Assemble the loop from validated parts. The calibrator must already
    /// have been loaded.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        cfg: SwitchConfig,
        clock: Arc<dyn Clock + Send + Sync>,
        bridge: B,
        inputs: I,
        outputs: O,
        calibrator: Calibrator<N>,
        mut display: Box<dyn StatusDisplay>,
    ) -> Self {
        let epoch = clock.now();
        display.set_awake(true);
        let mut encoder = EncoderDecoder::new();
        // debounced phases start released
        encoder.observe(false, false);
        Self {
            sampler: SensorSampler::new(bridge, &cfg),
            debounce: InputDebouncers::new(&cfg),
            encoder,
            adjust: AdjustmentStateMachine::new(&cfg),
            threshold: ThresholdEngine::new(&cfg),
            actuator: ActuatorDriver::new(outputs, &cfg),
            cfg,
            clock,
            epoch,
            inputs,
            calibrator,
            display,
            awake: true,
            last_activity_ms: 0,
            last_frame_ms: None,
            activity_state: DeviceState::Idle,
            state: DeviceState::Idle,
            last_command: ActuatorCommand::Off,
            feedback_until: None,
            last_diag_ms: 0,
            ticks: 0,
            overruns: 0,
            input_errors: 0,
        }
    }

    /// Milliseconds since the loop was built.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    fn poll(&mut self, line: InputLine, now: u64) -> Option<Edge> {
        let level = match self.inputs.read_digital(line) {
            Ok(level) => level,
            Err(e) => {
                self.input_errors += 1;
                tracing::warn!(?line, error = %map_hw_error(&*e), "input read failed");
                return None;
            }
        };
        let edge = self.debounce.for_line(line).update(level, now);
        if let Some(edge) = edge {
            tracing::debug!(?line, ?edge, at_ms = now, "input edge");
        }
        edge
    }

    fn read_inputs(&mut self, now: u64) -> InputEdges {
        let a = self.poll(InputLine::EncoderA, now);
        let b = self.poll(InputLine::EncoderB, now);
        InputEdges {
            switch: self.poll(InputLine::EncoderSwitch, now),
            tare: self.poll(InputLine::TareButton, now),
            stretch: self.poll(InputLine::StretchEnable, now),
            phase: a.is_some() || b.is_some(),
        }
    }

    /// Run every component once.
    pub fn tick(&mut self) -> TickReport {
        let now = self.now_ms();

        let edges = self.read_inputs(now);

        if edges.phase {
            self.encoder
                .observe(self.debounce.phase_a.level(), self.debounce.phase_b.level());
        }
        let delta = self.encoder.take_delta();

        let tared = edges.tare.is_some_and(Edge::is_pressed) && self.sampler.tare().is_some();

        let adjust = self.adjust.step(
            &AdjustmentInput {
                switch: edges.switch,
                other_edge: edges.tare.is_some() || edges.stretch.is_some(),
                delta,
                now_ms: now,
            },
            &mut self.calibrator,
        );
        if matches!(adjust, AdjustEvent::Confirmed { .. }) && self.cfg.actuator.feedback_pulse_ms > 0 {
            self.feedback_until = Some(now.saturating_add(self.cfg.actuator.feedback_pulse_ms));
        }

        let pressure = self.sampler.sample();

        let adjusting = self.adjust.is_adjusting();
        let current = DeviceState::activity(adjusting, self.threshold.is_latched());
        let mut command = self
            .threshold
            .decide(pressure, self.calibrator.level(), current);
        if let Some(until) = self.feedback_until {
            if now < until {
                if command == ActuatorCommand::Off {
                    command = ActuatorCommand::Pulsing(until - now);
                }
            } else {
                self.feedback_until = None;
            }
        }
        self.last_command = command;

        let output_on = self
            .actuator
            .apply(command, now, self.debounce.stretch.level());

        let frame_rendered = self.update_display(now, &edges, adjusting);

        if self.cfg.diagnostics.enabled
            && elapsed_at_least(now, self.last_diag_ms, self.cfg.diagnostics.interval_ms)
        {
            self.last_diag_ms = now;
            self.diagnostics().emit();
        }

        self.ticks += 1;
        TickReport {
            now_ms: now,
            pressure,
            command,
            output_on,
            state: self.state,
            adjust,
            tared,
            frame_rendered,
        }
    }

    /// Sleep/wake bookkeeping and frame pacing. Returns `true` if a frame
    /// was pushed.
    fn update_display(&mut self, now: u64, edges: &InputEdges, adjusting: bool) -> bool {
        let latched = self.threshold.is_latched();
        let activity_state = DeviceState::activity(adjusting, latched);
        let mut woke = false;
        if edges.any() || activity_state != self.activity_state {
            self.last_activity_ms = now;
            if !self.awake {
                self.awake = true;
                self.display.set_awake(true);
                woke = true;
                tracing::debug!(at_ms = now, "display wake");
            }
        }
        self.activity_state = activity_state;

        if self.awake && elapsed_at_least(now, self.last_activity_ms, self.cfg.timing.screen_timeout_ms) {
            self.awake = false;
            self.display.set_awake(false);
            tracing::debug!(at_ms = now, "display sleep");
        }

        let state = DeviceState::resolve(adjusting, latched, self.awake);
        if state != self.state {
            tracing::debug!(from = %self.state, to = %state, "device state");
            self.state = state;
        }

        let due = self
            .last_frame_ms
            .is_none_or(|t| elapsed_at_least(now, t, self.cfg.timing.screen_update_ms));
        if self.awake && (woke || due) {
            let frame = self.frame(now);
            self.display.render(&frame);
            self.last_frame_ms = Some(now);
            return true;
        }
        false
    }

    /// Current status snapshot for the display.
    pub fn frame(&self, now_ms: u64) -> StatusFrame {
        let sampler = self.sampler.stats();
        StatusFrame {
            pressure: self.sampler.filtered(),
            trigger_level: self.calibrator.level(),
            draft_level: self.adjust.draft(),
            state: self.state,
            output_on: self.actuator.is_asserted(),
            adjust_remaining_ms: self.adjust.remaining_ms(now_ms),
            persistence_fault: self.calibrator.persistence_fault(),
            sensor_faults: sampler.timeouts + sampler.errors,
        }
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let sampler = self.sampler.stats();
        let cal = self.calibrator.stats();
        Diagnostics {
            uptime_ms: self.now_ms(),
            ticks: self.ticks,
            overruns: self.overruns,
            raw: self.sampler.last_raw(),
            pressure_centi: self.sampler.filtered().centi(),
            trigger_level: self.calibrator.level().get(),
            state: self.state,
            output_on: self.actuator.is_asserted(),
            sensor_timeouts: sampler.timeouts,
            sensor_errors: sampler.errors,
            input_errors: self.input_errors,
            output_write_errors: self.actuator.write_errors(),
            encoder_rejected: self.encoder.rejected(),
            store_calls: cal.store_calls,
            storage_writes: cal.writes,
            verify_failures: cal.verify_failures,
            self_heals: cal.self_heals,
            persistence_fault: self.calibrator.persistence_fault(),
        }
    }

    /// Drive `n` ticks, sleeping one tick period on the clock after each.
    pub fn run_ticks<F: FnMut(&TickReport)>(&mut self, n: u64, mut on_tick: F) {
        let period = Duration::from_millis(self.cfg.timing.tick_ms);
        for _ in 0..n {
            let report = self.tick();
            on_tick(&report);
            self.clock.sleep(period);
        }
    }

    /// Tick at the configured rate until `shutdown` is set, then release
    /// the outputs. Returns the number of ticks run.
    pub fn run_until(&mut self, shutdown: &AtomicBool) -> u64 {
        let period = Duration::from_millis(self.cfg.timing.tick_ms);
        let start_ticks = self.ticks;
        tracing::info!(tick_ms = self.cfg.timing.tick_ms, level = self.calibrator.level().get(), "scheduler started");
        while !shutdown.load(Ordering::Relaxed) {
            let started = self.clock.now();
            self.tick();
            let spent = self.clock.now().saturating_duration_since(started);
            if spent >= period {
                self.overruns += 1;
                tracing::debug!(spent_us = u64::try_from(spent.as_micros()).unwrap_or(u64::MAX), "tick overrun");
            } else {
                self.clock.sleep(period - spent);
            }
        }
        self.shutdown();
        self.ticks - start_ticks
    }

    /// Release every output and blank the display.
    pub fn shutdown(&mut self) {
        self.actuator.release_all();
        self.display.set_awake(false);
        self.awake = false;
        tracing::info!(ticks = self.ticks, "scheduler stopped; outputs released");
    }

    pub fn trigger_level(&self) -> TriggerLevel {
        self.calibrator.level()
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn pressure(&self) -> FilteredPressure {
        self.sampler.filtered()
    }

    pub fn last_command(&self) -> ActuatorCommand {
        self.last_command
    }

    pub fn is_display_awake(&self) -> bool {
        self.awake
    }

    pub fn calibrator(&self) -> &Calibrator<N> {
        &self.calibrator
    }

    pub fn adjustment(&self) -> &AdjustmentStateMachine {
        &self.adjust
    }

    pub fn actuator(&self) -> &ActuatorDriver<O> {
        &self.actuator
    }

    pub fn sampler(&self) -> &SensorSampler<B> {
        &self.sampler
    }

    pub fn config(&self) -> &SwitchConfig {
        &self.cfg
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

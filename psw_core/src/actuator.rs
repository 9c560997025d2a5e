//! Output driving with minimum-on stretching.
//!
//! The driver owns the physical output level. A rising `On` opens a stretch
//! window; the outputs stay asserted while the command is `On` or the window
//! is open. `Pulsing` extends the same window. Pins are written only when the
//! level changes.

use psw_traits::{DigitalOutputs, OutputLine};

use crate::config::SwitchConfig;
use crate::hw_error::map_hw_error;
use crate::threshold::ActuatorCommand;

pub struct ActuatorDriver<O: DigitalOutputs> {
    outputs: O,
    lines: Vec<OutputLine>,
    stretch_ms: u64,
    gate_on_input: bool,
    window_end: Option<u64>,
    prev_on: bool,
    asserted: Option<bool>,
    write_errors: u64,
}

impl<O: DigitalOutputs> ActuatorDriver<O> {
    pub fn new(outputs: O, cfg: &SwitchConfig) -> Self {
        Self {
            outputs,
            lines: cfg.actuator.lines.clone(),
            stretch_ms: cfg.actuator.stretch_ms,
            gate_on_input: cfg.actuator.gate_on_input,
            window_end: None,
            prev_on: false,
            asserted: None,
            write_errors: 0,
        }
    }

    /// Apply this tick's command. `stretch_input` is the debounced
    /// stretch-enable level, consulted only when gating is configured.
    /// Returns the resulting output level.
    pub fn apply(&mut self, cmd: ActuatorCommand, now_ms: u64, stretch_input: bool) -> bool {
        let on = cmd.is_on();
        let stretch = self.stretch_ms > 0 && (!self.gate_on_input || stretch_input);
        if on && !self.prev_on && stretch {
            self.window_end = Some(now_ms.saturating_add(self.stretch_ms));
        }
        self.prev_on = on;

        if let ActuatorCommand::Pulsing(ms) = cmd {
            let end = now_ms.saturating_add(ms);
            self.window_end = Some(self.window_end.map_or(end, |w| w.max(end)));
        }

        let in_window = self.window_end.is_some_and(|end| now_ms < end);
        if !in_window {
            self.window_end = None;
        }
        let level = on || in_window;
        if self.asserted != Some(level) {
            self.write_all(level);
        }
        level
    }

    fn write_all(&mut self, level: bool) {
        for &line in &self.lines {
            if let Err(e) = self.outputs.write_digital(line, level) {
                self.write_errors += 1;
                tracing::warn!(?line, level, error = %map_hw_error(&*e), "output write failed");
            }
        }
        tracing::debug!(level, "outputs {}", if level { "asserted" } else { "released" });
        self.asserted = Some(level);
    }

    /// Drive every line low and forget any open window.
    pub fn release_all(&mut self) {
        self.window_end = None;
        self.prev_on = false;
        self.write_all(false);
    }

    pub fn is_asserted(&self) -> bool {
        self.asserted.unwrap_or(false)
    }

    /// Milliseconds until the stretch window closes, if one is open.
    pub fn window_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.window_end.map(|end| end.saturating_sub(now_ms))
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    pub fn lines(&self) -> &[OutputLine] {
        &self.lines
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }
}

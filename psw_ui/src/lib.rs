#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Text status display for terminals and log pipes.

use std::io::Write;

use psw_core::{DeviceState, StatusDisplay, StatusFrame};

/// Bar with `width` cells filled in proportion to pressure, with `|` at
/// the trigger level.
pub fn render_bar(pressure_pct: f32, level_pct: u8, width: usize) -> String {
    let width = width.max(2);
    let cells = |pct: f32| -> usize {
        let clamped = if pct.is_finite() { pct.clamp(0.0, 100.0) } else { 0.0 };
        ((clamped / 100.0) * (width - 1) as f32).round() as usize
    };
    let fill = if pressure_pct > 0.0 { cells(pressure_pct) + 1 } else { 0 };
    let marker = cells(f32::from(level_pct));
    (0..width)
        .map(|i| {
            if i == marker {
                '|'
            } else if i < fill {
                '#'
            } else {
                '.'
            }
        })
        .collect()
}

/// One status line for a frame.
pub fn format_status(frame: &StatusFrame, bar_width: usize) -> String {
    let pressure = frame.pressure.as_pct_f32();
    let level = frame.shown_level();
    let mut line = format!(
        "P {pressure:6.2}% [{}] L {:>3}% {:<9} {}",
        render_bar(pressure, level.get(), bar_width),
        level.get(),
        frame.state.as_str(),
        if frame.output_on { "ON" } else { "off" },
    );
    if frame.state == DeviceState::Adjusting
        && let Some(ms) = frame.adjust_remaining_ms
    {
        line.push_str(&format!(" ({}s)", ms.div_ceil(1000)));
    }
    if frame.persistence_fault {
        line.push_str(" !EEPROM");
    }
    if frame.sensor_faults > 0 {
        line.push_str(&format!(" !sensor x{}", frame.sensor_faults));
    }
    line
}

/// Status display writing one line per frame. In inline mode the line is
/// redrawn in place with a carriage return.
pub struct TerminalDisplay<W: Write> {
    out: W,
    inline: bool,
    bar_width: usize,
    awake: bool,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            inline: false,
            bar_width: 20,
            awake: true,
        }
    }

    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    pub fn bar_width(mut self, width: usize) -> Self {
        self.bar_width = width;
        self
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        let res = if self.inline {
            write!(self.out, "\r\x1b[2K{text}")
        } else {
            writeln!(self.out, "{text}")
        };
        if let Err(e) = res.and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "status display write failed");
        }
    }
}

impl<W: Write> StatusDisplay for TerminalDisplay<W> {
    fn render(&mut self, frame: &StatusFrame) {
        if !self.awake {
            return;
        }
        let line = format_status(frame, self.bar_width);
        self.emit(&line);
    }

    fn set_awake(&mut self, awake: bool) {
        if awake == self.awake {
            return;
        }
        self.awake = awake;
        if !awake {
            self.emit("-- display sleeping --");
        }
    }
}

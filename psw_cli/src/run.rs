//! `psw run`: assemble the scheduler and drive it.

use std::io::{IsTerminal, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use psw_config::Config;
use psw_core::{SchedulerLoop, StatusDisplay, StatusFrame, SwitchBuilder, SwitchConfig};
use psw_traits::ManualClock;
use psw_ui::TerminalDisplay;
use serde_json::json;

use crate::backend::{self, DynBridge, DynInputs, DynOutputs, DynStore, Parts};
use crate::cli::SimProfile;

pub type Switch = SchedulerLoop<DynBridge, DynInputs, DynOutputs, DynStore>;

/// Status frames as JSON lines.
pub struct JsonFrames<W: Write> {
    out: W,
}

impl<W: Write> JsonFrames<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

pub fn frame_json(frame: &StatusFrame) -> serde_json::Value {
    json!({
        "pressure_pct": frame.pressure.as_pct_f32(),
        "trigger_level": frame.trigger_level.get(),
        "draft_level": frame.draft_level.map(|l| l.get()),
        "state": frame.state.as_str(),
        "output_on": frame.output_on,
        "adjust_remaining_ms": frame.adjust_remaining_ms,
        "persistence_fault": frame.persistence_fault,
        "sensor_faults": frame.sensor_faults,
    })
}

impl<W: Write> StatusDisplay for JsonFrames<W> {
    fn render(&mut self, frame: &StatusFrame) {
        let line = frame_json(frame);
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "frame write failed");
        }
    }

    fn set_awake(&mut self, awake: bool) {
        tracing::debug!(awake, "display power");
    }
}

#[cfg_attr(feature = "hardware", allow(dead_code))]
pub struct RunOptions<'a> {
    pub ticks: Option<u64>,
    pub profile: SimProfile,
    pub peak: u8,
    pub eeprom: Option<&'a Path>,
    pub json: bool,
}

fn display(json: bool) -> Box<dyn StatusDisplay> {
    if json {
        Box::new(JsonFrames::new(std::io::stdout()))
    } else {
        let stdout = std::io::stdout();
        let inline = stdout.is_terminal();
        Box::new(TerminalDisplay::new(stdout).inline(inline))
    }
}

#[cfg(not(feature = "hardware"))]
fn parts(cfg: &Config, opts: &RunOptions<'_>) -> eyre::Result<Parts> {
    Ok(backend::sim_parts(cfg, opts.profile, opts.peak))
}

#[cfg(feature = "hardware")]
fn parts(cfg: &Config, _opts: &RunOptions<'_>) -> eyre::Result<Parts> {
    backend::hardware_parts(cfg)
}

/// Build the loop. A bounded simulated run uses a manual clock so it
/// completes as fast as the host allows.
pub fn build(cfg: &Config, opts: &RunOptions<'_>) -> eyre::Result<Switch> {
    let Parts {
        bridge,
        inputs,
        outputs,
    } = parts(cfg, opts)?;
    let store = backend::open_store(cfg, opts.eeprom)?;
    let mut builder = SwitchBuilder::new()
        .with_bridge(bridge)
        .with_inputs(inputs)
        .with_outputs(outputs)
        .with_store(store)
        .with_config(SwitchConfig::from(cfg))
        .with_display(display(opts.json));
    if opts.ticks.is_some() && cfg!(not(feature = "hardware")) {
        builder = builder.with_clock(ManualClock::new());
    }
    builder.build()
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn summary(sw: &Switch, ticks: u64, wall_ms: u64) -> serde_json::Value {
    let d = sw.diagnostics();
    json!({
        "timestamp": std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0),
        "ticks": ticks,
        "uptime_ms": d.uptime_ms,
        "wall_ms": wall_ms,
        "trigger_level": d.trigger_level,
        "pressure_pct": sw.pressure().as_pct_f32(),
        "state": d.state.as_str(),
        "output_on": d.output_on,
        "overruns": d.overruns,
        "faults": d.fault_total(),
        "persistence_fault": d.persistence_fault,
    })
}

pub fn run(cfg: &Config, opts: &RunOptions<'_>, shutdown: &AtomicBool) -> eyre::Result<()> {
    let mut sw = build(cfg, opts)?;
    let started = Instant::now();
    // Summary reflects the last tick; a bounded run releases the outputs after it.
    let s = match opts.ticks {
        Some(n) => {
            sw.run_ticks(n, |report| {
                if report.tared {
                    tracing::info!(now_ms = report.now_ms, "tare applied");
                }
            });
            let s = summary(&sw, n, elapsed_ms(started));
            sw.shutdown();
            s
        }
        None => {
            let ticks = sw.run_until(shutdown);
            summary(&sw, ticks, elapsed_ms(started))
        }
    };
    if opts.json {
        println!("{s}");
    } else {
        println!(
            "run complete: {} ticks, level {}%, pressure {:.2}%, state {}, output {}, faults {}",
            s["ticks"],
            s["trigger_level"],
            sw.pressure().as_pct_f32(),
            s["state"].as_str().unwrap_or("?"),
            if s["output_on"].as_bool().unwrap_or(false) { "on" } else { "off" },
            s["faults"],
        );
    }
    Ok(())
}

//! Periodic status snapshot for the diagnostic channel.

use crate::status::DeviceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    pub uptime_ms: u64,
    pub ticks: u64,
    pub overruns: u64,
    pub raw: Option<i32>,
    pub pressure_centi: i32,
    pub trigger_level: u8,
    pub state: DeviceState,
    pub output_on: bool,
    pub sensor_timeouts: u64,
    pub sensor_errors: u64,
    pub input_errors: u64,
    pub output_write_errors: u64,
    pub encoder_rejected: u64,
    pub store_calls: u64,
    pub storage_writes: u64,
    pub verify_failures: u64,
    pub self_heals: u64,
    pub persistence_fault: bool,
}

impl Diagnostics {
    /// Emit the snapshot as one structured `info` event.
    pub fn emit(&self) {
        tracing::info!(
            uptime_ms = self.uptime_ms,
            ticks = self.ticks,
            overruns = self.overruns,
            raw = ?self.raw,
            pressure_pct = f64::from(self.pressure_centi) / 100.0,
            trigger_level = self.trigger_level,
            state = %self.state,
            output_on = self.output_on,
            sensor_timeouts = self.sensor_timeouts,
            sensor_errors = self.sensor_errors,
            input_errors = self.input_errors,
            output_write_errors = self.output_write_errors,
            encoder_rejected = self.encoder_rejected,
            store_calls = self.store_calls,
            storage_writes = self.storage_writes,
            verify_failures = self.verify_failures,
            self_heals = self.self_heals,
            persistence_fault = self.persistence_fault,
            "status"
        );
    }

    /// Total faults of any kind seen so far.
    pub fn fault_total(&self) -> u64 {
        self.sensor_timeouts
            + self.sensor_errors
            + self.input_errors
            + self.output_write_errors
            + self.verify_failures
    }
}

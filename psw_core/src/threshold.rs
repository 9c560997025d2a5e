//! Hysteretic comparison of pressure against the trigger level.

use crate::calibrator::TriggerLevel;
use crate::config::SwitchConfig;
use crate::fixed_point::CENTI;
use crate::sampler::FilteredPressure;
use crate::status::DeviceState;

/// What the actuator should do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActuatorCommand {
    #[default]
    Off,
    On,
    /// Assert for the given number of milliseconds from now.
    Pulsing(u64),
}

impl ActuatorCommand {
    #[inline]
    pub fn is_on(self) -> bool {
        matches!(self, ActuatorCommand::On)
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdEngine {
    hysteresis_centi: i32,
    latched: bool,
}

impl ThresholdEngine {
    pub fn new(cfg: &SwitchConfig) -> Self {
        Self {
            hysteresis_centi: i32::from(cfg.threshold.hysteresis_pct) * CENTI,
            latched: false,
        }
    }

    /// Engage at `pressure >= level`; release below `level - hysteresis`.
    /// Always `Off` (and unlatched) while adjusting.
    pub fn decide(
        &mut self,
        pressure: FilteredPressure,
        level: TriggerLevel,
        state: DeviceState,
    ) -> ActuatorCommand {
        if state == DeviceState::Adjusting {
            if self.latched {
                tracing::debug!("threshold latch released for adjustment");
            }
            self.latched = false;
            return ActuatorCommand::Off;
        }
        let engage = i32::from(level.get()) * CENTI;
        let release = engage - self.hysteresis_centi;
        let p = pressure.centi();
        if !self.latched && p >= engage {
            self.latched = true;
            tracing::debug!(pressure = p, level = level.get(), "threshold engaged");
        } else if self.latched && p < release {
            self.latched = false;
            tracing::debug!(pressure = p, level = level.get(), "threshold released");
        }
        if self.latched {
            ActuatorCommand::On
        } else {
            ActuatorCommand::Off
        }
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lvl(p: u8) -> TriggerLevel {
        TriggerLevel::new(p).unwrap()
    }

    #[test]
    fn hysteresis_band_holds_output() {
        let mut t = ThresholdEngine::new(&SwitchConfig::default());
        let seq = [(48, false), (51, true), (49, true), (48, true), (47, false)];
        for (pct, on) in seq {
            let cmd = t.decide(FilteredPressure::from_pct(pct), lvl(50), DeviceState::Idle);
            assert_eq!(cmd.is_on(), on, "at {pct}%");
        }
    }

    #[test]
    fn adjusting_forces_off_and_unlatches() {
        let mut t = ThresholdEngine::new(&SwitchConfig::default());
        t.decide(FilteredPressure::from_pct(60), lvl(50), DeviceState::Idle);
        assert!(t.is_latched());
        let cmd = t.decide(FilteredPressure::from_pct(60), lvl(50), DeviceState::Adjusting);
        assert_eq!(cmd, ActuatorCommand::Off);
        assert!(!t.is_latched());
    }

    #[test]
    fn zero_level_triggers_at_zero() {
        let mut t = ThresholdEngine::new(&SwitchConfig::default());
        let cmd = t.decide(FilteredPressure::ZERO, lvl(0), DeviceState::Idle);
        assert_eq!(cmd, ActuatorCommand::On);
    }
}

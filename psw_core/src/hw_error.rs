//! Maps `Box<dyn Error>` from trait boundaries to typed `SwitchError`.
//!
//! The traits in `psw_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our typed error enum, with an optional feature-gated path
//! for `psw_hardware::HwError` downcasting.

use crate::error::SwitchError;

/// Map a bridge/IO error to a typed `SwitchError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> SwitchError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<psw_hardware::error::HwError>() {
            return match hw {
                psw_hardware::error::HwError::Timeout { .. } => SwitchError::SensorTimeout,
                psw_hardware::error::HwError::Storage(msg) => SwitchError::Storage(msg.clone()),
                other => SwitchError::Hardware(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        SwitchError::SensorTimeout
    } else {
        SwitchError::Hardware(s)
    }
}

/// Storage failures are never timeouts from the core's point of view.
pub fn map_storage_error(e: &(dyn std::error::Error + 'static)) -> SwitchError {
    match map_hw_error(e) {
        SwitchError::Storage(msg) => SwitchError::Storage(msg),
        _ => SwitchError::Storage(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_heuristic_detects_timeouts() {
        let e = std::io::Error::new(std::io::ErrorKind::TimedOut, "bridge timed out");
        assert_eq!(map_hw_error(&e), SwitchError::SensorTimeout);
        let e = std::io::Error::other("wire fell off");
        assert_eq!(
            map_hw_error(&e),
            SwitchError::Hardware("wire fell off".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn downcasts_typed_hardware_errors() {
        let e = psw_hardware::error::HwError::Timeout { polls: 3 };
        assert_eq!(map_hw_error(&e), SwitchError::SensorTimeout);
        let e = psw_hardware::error::HwError::Storage("eeprom busy".into());
        assert_eq!(map_storage_error(&e), SwitchError::Storage("eeprom busy".into()));
    }
}

//! Device state reported each tick.

/// Externally visible mode of the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceState {
    /// Monitoring, output released.
    #[default]
    Idle,
    /// Trigger level is being edited; actuation suppressed.
    Adjusting,
    /// Threshold latch engaged.
    Triggered,
    /// Display asleep; sensing and actuation continue.
    Sleeping,
}

impl DeviceState {
    /// Resolve with priority Adjusting > Triggered > Sleeping > Idle.
    pub fn resolve(adjusting: bool, triggered: bool, display_awake: bool) -> Self {
        if adjusting {
            DeviceState::Adjusting
        } else if triggered {
            DeviceState::Triggered
        } else if !display_awake {
            DeviceState::Sleeping
        } else {
            DeviceState::Idle
        }
    }

    /// State ignoring display visibility; changes here count as activity.
    pub fn activity(adjusting: bool, triggered: bool) -> Self {
        Self::resolve(adjusting, triggered, true)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceState::Idle => "idle",
            DeviceState::Adjusting => "adjusting",
            DeviceState::Triggered => "triggered",
            DeviceState::Sleeping => "sleeping",
        }
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order() {
        assert_eq!(DeviceState::resolve(true, true, false), DeviceState::Adjusting);
        assert_eq!(DeviceState::resolve(false, true, false), DeviceState::Triggered);
        assert_eq!(DeviceState::resolve(false, false, false), DeviceState::Sleeping);
        assert_eq!(DeviceState::resolve(false, false, true), DeviceState::Idle);
        assert_eq!(DeviceState::default(), DeviceState::Idle);
    }
}

//! Trigger-level adjustment mode.
//!
//! A switch press enters adjustment with the current level as the draft.
//! Encoder steps move the draft; a second press or a period without input
//! confirms it, which stores the draft exactly once.

use psw_traits::NvStore;

use crate::calibrator::{Calibrator, TriggerLevel};
use crate::config::SwitchConfig;
use crate::debounce::Edge;
use crate::util::elapsed_at_least;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustState {
    Idle,
    Adjusting {
        draft: TriggerLevel,
        last_input_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmReason {
    Switch,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustEvent {
    None,
    Entered { draft: TriggerLevel },
    Changed { draft: TriggerLevel },
    Confirmed {
        level: TriggerLevel,
        reason: ConfirmReason,
        persisted: bool,
    },
}

/// Inputs consumed by one step of the state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjustmentInput {
    /// Debounced edge of the encoder push switch.
    pub switch: Option<Edge>,
    /// Any other accepted input edge this tick (counts as activity).
    pub other_edge: bool,
    /// Encoder steps since the previous tick.
    pub delta: i32,
    pub now_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AdjustmentStateMachine {
    state: AdjustState,
    step_pct: i32,
    timeout_ms: u64,
}

impl AdjustmentStateMachine {
    pub fn new(cfg: &SwitchConfig) -> Self {
        Self {
            state: AdjustState::Idle,
            step_pct: i32::from(cfg.input.step_pct.max(1)),
            timeout_ms: cfg.timing.adjustment_timeout_ms,
        }
    }

    pub fn step<N: NvStore>(
        &mut self,
        input: &AdjustmentInput,
        cal: &mut Calibrator<N>,
    ) -> AdjustEvent {
        let now = input.now_ms;
        let pressed = input.switch.is_some_and(Edge::is_pressed);
        match self.state {
            AdjustState::Idle => {
                if !pressed {
                    return AdjustEvent::None;
                }
                let draft = cal.level();
                self.state = AdjustState::Adjusting {
                    draft,
                    last_input_ms: now,
                };
                tracing::debug!(draft = draft.get(), "adjustment started");
                AdjustEvent::Entered { draft }
            }
            AdjustState::Adjusting {
                mut draft,
                mut last_input_ms,
            } => {
                let before = draft;
                if input.delta != 0 {
                    draft = draft.offset(input.delta.saturating_mul(self.step_pct));
                }
                if input.delta != 0 || input.switch.is_some() || input.other_edge {
                    last_input_ms = now;
                }
                if pressed {
                    return self.confirm(draft, ConfirmReason::Switch, cal);
                }
                if elapsed_at_least(now, last_input_ms, self.timeout_ms) {
                    return self.confirm(draft, ConfirmReason::Timeout, cal);
                }
                self.state = AdjustState::Adjusting {
                    draft,
                    last_input_ms,
                };
                if draft == before {
                    AdjustEvent::None
                } else {
                    tracing::debug!(draft = draft.get(), "adjustment draft changed");
                    AdjustEvent::Changed { draft }
                }
            }
        }
    }

    fn confirm<N: NvStore>(
        &mut self,
        draft: TriggerLevel,
        reason: ConfirmReason,
        cal: &mut Calibrator<N>,
    ) -> AdjustEvent {
        self.state = AdjustState::Idle;
        let persisted = match cal.store(draft) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, level = draft.get(), "trigger level not persisted");
                false
            }
        };
        tracing::info!(level = draft.get(), ?reason, persisted, "adjustment confirmed");
        AdjustEvent::Confirmed {
            level: draft,
            reason,
            persisted,
        }
    }

    pub fn state(&self) -> AdjustState {
        self.state
    }

    pub fn is_adjusting(&self) -> bool {
        matches!(self.state, AdjustState::Adjusting { .. })
    }

    pub fn draft(&self) -> Option<TriggerLevel> {
        match self.state {
            AdjustState::Adjusting { draft, .. } => Some(draft),
            AdjustState::Idle => None,
        }
    }

    /// Time left before an idle adjustment confirms itself.
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        match self.state {
            AdjustState::Adjusting { last_input_ms, .. } => Some(
                self.timeout_ms
                    .saturating_sub(now_ms.saturating_sub(last_input_ms)),
            ),
            AdjustState::Idle => None,
        }
    }
}

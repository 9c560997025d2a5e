//! Quadrature decoding for the trigger-level encoder.
//!
//! Phase pair is packed as `(A << 1) | B`; the forward sequence is
//! `00 -> 01 -> 11 -> 10 -> 00`. A detent counts only when a full cycle
//! returns to `00`, so partial turns that reverse cancel out.

/// Next phase in the forward direction.
#[inline]
const fn forward(phase: u8) -> u8 {
    match phase & 0b11 {
        0b00 => 0b01,
        0b01 => 0b11,
        0b11 => 0b10,
        _ => 0b00,
    }
}

/// Sub-steps per full quadrature cycle.
const STEPS_PER_CYCLE: i8 = 4;

#[derive(Debug, Clone, Default)]
pub struct EncoderDecoder {
    phase: Option<u8>,
    acc: i8,
    delta: i32,
    rejected: u64,
}

impl EncoderDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe debounced phase levels. Returns `false` if the transition
    /// was invalid (both phases changed) and was discarded.
    pub fn observe(&mut self, a: bool, b: bool) -> bool {
        let p = (u8::from(a) << 1) | u8::from(b);
        let Some(prev) = self.phase else {
            self.phase = Some(p);
            return true;
        };
        if p == prev {
            return true;
        }
        if forward(prev) == p {
            self.acc += 1;
        } else if forward(p) == prev {
            self.acc -= 1;
        } else {
            self.rejected += 1;
            tracing::trace!(from = prev, to = p, "invalid quadrature transition");
            return false;
        }
        self.phase = Some(p);
        if p == 0 {
            if self.acc >= STEPS_PER_CYCLE {
                self.delta += 1;
            } else if self.acc <= -STEPS_PER_CYCLE {
                self.delta -= 1;
            }
            self.acc = 0;
        }
        true
    }

    /// Steps accumulated since the last call; resets to zero.
    pub fn take_delta(&mut self) -> i32 {
        std::mem::take(&mut self.delta)
    }

    pub fn pending(&self) -> i32 {
        self.delta
    }

    /// Count of discarded double-phase transitions.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

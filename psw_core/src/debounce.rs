//! Time-based debouncing for discrete inputs.

use crate::util::elapsed_at_least;

/// Accepted transition of a debounced input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    Released,
}

impl Edge {
    #[inline]
    pub fn is_pressed(self) -> bool {
        matches!(self, Edge::Pressed)
    }
}

/// Debounce state for one input line.
///
/// A new level is accepted once the raw input has held it for `period_ms`
/// and at least `period_ms` has passed since the previous accepted edge.
/// A zero period accepts every change immediately.
///
/// This is a hold debouncer, not a lockout one: the first sample of a new
/// level does not fire. Each accepted edge therefore lags the physical
/// change by one full period (500 ms for the panel buttons), and a press
/// released before the period runs out is dropped.
#[derive(Debug, Clone)]
pub struct Debouncer {
    period_ms: u64,
    stable: bool,
    candidate_since: Option<u64>,
    last_accepted: Option<u64>,
}

impl Debouncer {
    pub fn new(period_ms: u64) -> Self {
        Self::with_level(period_ms, false)
    }

    pub fn with_level(period_ms: u64, initial: bool) -> Self {
        Self {
            period_ms,
            stable: initial,
            candidate_since: None,
            last_accepted: None,
        }
    }

    /// Feed one raw observation; returns the edge if one was accepted.
    pub fn update(&mut self, raw: bool, now_ms: u64) -> Option<Edge> {
        if raw == self.stable {
            // reversal: restart the candidate timer
            self.candidate_since = None;
            return None;
        }
        let since = *self.candidate_since.get_or_insert(now_ms);
        let held = elapsed_at_least(now_ms, since, self.period_ms);
        let spaced = self
            .last_accepted
            .is_none_or(|t| elapsed_at_least(now_ms, t, self.period_ms));
        if !(held && spaced) {
            return None;
        }
        self.stable = raw;
        self.candidate_since = None;
        self.last_accepted = Some(now_ms);
        Some(if raw { Edge::Pressed } else { Edge::Released })
    }

    #[inline]
    pub fn level(&self) -> bool {
        self.stable
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_period_accepts_immediately() {
        let mut d = Debouncer::new(0);
        assert_eq!(d.update(true, 0), Some(Edge::Pressed));
        assert_eq!(d.update(false, 0), Some(Edge::Released));
    }

    #[test]
    fn level_must_hold_for_full_period() {
        let mut d = Debouncer::new(500);
        assert_eq!(d.update(true, 0), None);
        assert_eq!(d.update(true, 499), None);
        assert_eq!(d.update(true, 500), Some(Edge::Pressed));
        assert!(d.level());
        assert_eq!(d.update(true, 600), None);
    }

    #[test]
    fn short_press_is_dropped() {
        let mut d = Debouncer::new(500);
        assert_eq!(d.update(true, 0), None);
        assert_eq!(d.update(true, 300), None);
        assert_eq!(d.update(false, 400), None);
        assert_eq!(d.update(false, 2000), None);
        assert!(!d.level());
    }

    #[test]
    fn bounce_restarts_candidate() {
        let mut d = Debouncer::new(100);
        assert_eq!(d.update(true, 0), None);
        assert_eq!(d.update(false, 50), None);
        assert_eq!(d.update(true, 60), None);
        assert_eq!(d.update(true, 150), None);
        assert_eq!(d.update(true, 160), Some(Edge::Pressed));
    }

    #[test]
    fn edges_are_spaced_by_period() {
        let mut d = Debouncer::new(100);
        d.update(true, 0);
        assert_eq!(d.update(true, 100), Some(Edge::Pressed));
        assert_eq!(d.update(false, 110), None);
        assert_eq!(d.update(false, 199), None);
        assert_eq!(d.update(false, 210), Some(Edge::Released));
    }
}

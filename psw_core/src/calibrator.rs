//! Trigger-level ownership and persistence.
//!
//! The level lives in a 3-byte record `[MARKER, level, !level]` at a fixed
//! address in non-volatile storage. Writes are verified by reading back; a
//! record that fails validation on load is replaced with the default.

use psw_traits::NvStore;

use crate::config::SwitchConfig;
use crate::error::SwitchError;
use crate::hw_error::map_storage_error;

pub const RECORD_MARKER: u8 = 0x5A;
pub const RECORD_LEN: usize = 3;

/// Trigger level in whole percent, always within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriggerLevel(u8);

impl TriggerLevel {
    pub const MAX: u8 = 100;

    pub const fn new(pct: u8) -> Option<Self> {
        if pct <= Self::MAX { Some(Self(pct)) } else { None }
    }

    /// Clamp an arbitrary signed value into range.
    pub fn saturating(pct: i32) -> Self {
        Self(u8::try_from(pct.clamp(0, i32::from(Self::MAX))).unwrap_or(Self::MAX))
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Offset by `delta` percent, clamped to range.
    pub fn offset(self, delta: i32) -> Self {
        Self::saturating(i32::from(self.0).saturating_add(delta))
    }
}

impl std::fmt::Display for TriggerLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

pub fn encode_record(level: TriggerLevel) -> [u8; RECORD_LEN] {
    [RECORD_MARKER, level.0, !level.0]
}

pub fn decode_record(buf: &[u8; RECORD_LEN]) -> Result<TriggerLevel, SwitchError> {
    let [marker, level, check] = *buf;
    if marker != RECORD_MARKER {
        return Err(SwitchError::StorageCorruption(format!(
            "bad marker 0x{marker:02X}"
        )));
    }
    if check != !level {
        return Err(SwitchError::StorageCorruption(format!(
            "check byte 0x{check:02X} does not match level {level}"
        )));
    }
    TriggerLevel::new(level)
        .ok_or_else(|| SwitchError::StorageCorruption(format!("level {level} out of range")))
}

/// Result of a successful [`Calibrator::store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Storage already held this level; nothing written.
    Unchanged,
    /// Written and verified on the given attempt.
    Written { attempts: u8 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalibratorStats {
    pub store_calls: u64,
    pub writes: u64,
    pub verify_failures: u64,
    pub self_heals: u64,
}

pub struct Calibrator<N: NvStore> {
    store: N,
    address: u16,
    default_level: TriggerLevel,
    level: TriggerLevel,
    max_attempts: u8,
    fault: bool,
    stats: CalibratorStats,
}

impl<N: NvStore> Calibrator<N> {
    /// Create a calibrator holding the default level. Call [`load`](Self::load)
    /// to pick up the persisted value.
    pub fn new(store: N, cfg: &SwitchConfig) -> Self {
        let default_level = TriggerLevel::saturating(i32::from(cfg.default_trigger_level));
        Self {
            store,
            address: cfg.storage.address,
            default_level,
            level: default_level,
            max_attempts: cfg.storage.max_write_retries.max(1),
            fault: false,
            stats: CalibratorStats::default(),
        }
    }

    fn read_image(&mut self) -> Result<[u8; RECORD_LEN], SwitchError> {
        let mut buf = [0u8; RECORD_LEN];
        self.store
            .read(self.address, &mut buf)
            .map_err(|e| map_storage_error(&*e))?;
        Ok(buf)
    }

    fn read_record(&mut self) -> Result<TriggerLevel, SwitchError> {
        let buf = self.read_image()?;
        decode_record(&buf)
    }

    /// Load the persisted level, replacing an invalid or unreadable record
    /// with the default.
    pub fn load(&mut self) -> TriggerLevel {
        match self.read_record() {
            Ok(level) => {
                tracing::debug!(level = level.get(), "calibration loaded");
                self.level = level;
            }
            Err(e) => {
                tracing::warn!(error = %e, default = self.default_level.get(), "calibration record invalid; restoring default");
                self.stats.self_heals += 1;
                self.level = self.default_level;
                if let Err(e) = self.store(self.default_level) {
                    tracing::warn!(error = %e, "could not rewrite calibration record");
                }
            }
        }
        self.level
    }

    /// Persist `level`, verifying by read-back.
    ///
    /// On success the in-memory level is updated and any persistence fault
    /// cleared. If every attempt fails the previous level is kept and the
    /// fault flag is raised.
    pub fn store(&mut self, level: TriggerLevel) -> Result<StoreOutcome, SwitchError> {
        self.stats.store_calls += 1;
        if matches!(self.read_record(), Ok(current) if current == level) {
            self.level = level;
            self.fault = false;
            tracing::debug!(level = level.get(), "calibration unchanged; skipping write");
            return Ok(StoreOutcome::Unchanged);
        }

        let image = encode_record(level);
        for attempt in 1..=self.max_attempts {
            self.stats.writes += 1;
            if let Err(e) = self.store.write(self.address, &image) {
                self.stats.verify_failures += 1;
                tracing::warn!(attempt, error = %map_storage_error(&*e), "calibration write failed");
                continue;
            }
            match self.read_image() {
                Ok(back) if back == image => {
                    self.level = level;
                    self.fault = false;
                    tracing::info!(level = level.get(), attempt, "calibration stored");
                    return Ok(StoreOutcome::Written { attempts: attempt });
                }
                Ok(back) => {
                    self.stats.verify_failures += 1;
                    tracing::warn!(attempt, ?back, "calibration read-back mismatch");
                }
                Err(e) => {
                    self.stats.verify_failures += 1;
                    tracing::warn!(attempt, error = %e, "calibration read-back failed");
                }
            }
        }

        self.fault = true;
        tracing::warn!(
            level = level.get(),
            kept = self.level.get(),
            "calibration not persisted; keeping previous level"
        );
        Err(SwitchError::StorageWriteMismatch {
            attempts: self.max_attempts,
        })
    }

    #[inline]
    pub fn level(&self) -> TriggerLevel {
        self.level
    }

    pub fn default_level(&self) -> TriggerLevel {
        self.default_level
    }

    /// `true` after a store that could not be verified, until the next
    /// successful one.
    pub fn persistence_fault(&self) -> bool {
        self.fault
    }

    pub fn stats(&self) -> CalibratorStats {
        self.stats
    }

    pub fn store_ref(&self) -> &N {
        &self.store
    }

    pub fn into_store(self) -> N {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Mem {
        bytes: Vec<u8>,
        drop_writes: u32,
        writes: u32,
    }

    impl NvStore for Mem {
        fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let a = usize::from(addr);
            buf.copy_from_slice(&self.bytes[a..a + buf.len()]);
            Ok(())
        }
        fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.writes += 1;
            if self.drop_writes > 0 {
                self.drop_writes -= 1;
                return Ok(());
            }
            let a = usize::from(addr);
            self.bytes[a..a + data.len()].copy_from_slice(data);
            Ok(())
        }
    }

    fn mem(bytes: &[u8]) -> Mem {
        let mut m = Mem { bytes: vec![0xFF; 16], ..Default::default() };
        m.bytes[..bytes.len()].copy_from_slice(bytes);
        m
    }

    #[test]
    fn record_layout() {
        let level = TriggerLevel::new(53).unwrap();
        assert_eq!(encode_record(level), [0x5A, 53, !53]);
        assert_eq!(decode_record(&[0x5A, 53, !53]), Ok(level));
    }

    #[test]
    fn decode_rejects_blank_images() {
        assert!(decode_record(&[0, 0, 0]).is_err());
        assert!(decode_record(&[0xFF, 0xFF, 0xFF]).is_err());
        assert!(decode_record(&[0x5A, 101, !101]).is_err());
        assert!(decode_record(&[0x5A, 40, 40]).is_err());
    }

    #[test]
    fn load_heals_invalid_record() {
        let mut cal = Calibrator::new(mem(&[0, 0, 0]), &SwitchConfig::default());
        assert_eq!(cal.load().get(), 50);
        assert_eq!(cal.stats().self_heals, 1);
        assert_eq!(&cal.store_ref().bytes[..3], &[0x5A, 50, !50]);
    }

    #[test]
    fn equal_store_skips_write() {
        let mut cal = Calibrator::new(mem(&[0x5A, 70, !70]), &SwitchConfig::default());
        assert_eq!(cal.load().get(), 70);
        let out = cal.store(TriggerLevel::new(70).unwrap());
        assert_eq!(out, Ok(StoreOutcome::Unchanged));
        assert_eq!(cal.store_ref().writes, 0);
    }

    #[test]
    fn retries_then_succeeds() {
        let mut m = mem(&[0x5A, 10, !10]);
        m.drop_writes = 2;
        let mut cal = Calibrator::new(m, &SwitchConfig::default());
        cal.load();
        let out = cal.store(TriggerLevel::new(20).unwrap());
        assert_eq!(out, Ok(StoreOutcome::Written { attempts: 3 }));
        assert_eq!(cal.stats().verify_failures, 2);
        assert!(!cal.persistence_fault());
    }

    #[test]
    fn exhausted_retries_keep_previous_level() {
        let mut m = mem(&[0x5A, 10, !10]);
        m.drop_writes = 3;
        let mut cal = Calibrator::new(m, &SwitchConfig::default());
        cal.load();
        let err = cal.store(TriggerLevel::new(20).unwrap()).unwrap_err();
        assert_eq!(err, SwitchError::StorageWriteMismatch { attempts: 3 });
        assert!(cal.persistence_fault());
        assert_eq!(cal.level().get(), 10);
        // next good store clears the fault
        assert!(cal.store(TriggerLevel::new(20).unwrap()).is_ok());
        assert!(!cal.persistence_fault());
        assert_eq!(cal.level().get(), 20);
    }

    #[test]
    fn level_helpers_clamp() {
        assert_eq!(TriggerLevel::saturating(-4).get(), 0);
        assert_eq!(TriggerLevel::saturating(140).get(), 100);
        assert_eq!(TriggerLevel::new(99).unwrap().offset(5).get(), 100);
        assert!(TriggerLevel::new(101).is_none());
    }
}

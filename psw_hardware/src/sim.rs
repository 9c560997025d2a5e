//! Simulated adapters for running the switch without a board.
//!
//! Every adapter hands out a cloneable handle sharing its state, so a test
//! or driver can poke inputs and inspect outputs while the scheduler owns
//! the adapter itself.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use psw_traits::{Bridge, DigitalInputs, DigitalOutputs, InputLine, NvStore, OutputLine};

use crate::atomic::write_atomic;
use crate::error::HwError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ── Bridge ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct BridgeState {
    raw: i32,
    fail_next: u32,
    reads: u64,
}

/// Bridge returning whatever raw value the handle last set.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBridge {
    state: Rc<RefCell<BridgeState>>,
}

impl SimulatedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> SimulatedBridge {
        self.clone()
    }

    pub fn set_raw(&self, raw: i32) {
        self.state.borrow_mut().raw = raw;
    }

    /// Make the next `n` reads time out.
    pub fn fail_next(&self, n: u32) {
        self.state.borrow_mut().fail_next = n;
    }

    pub fn reads(&self) -> u64 {
        self.state.borrow().reads
    }
}

impl Bridge for SimulatedBridge {
    fn read(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        let mut s = self.state.borrow_mut();
        if s.fail_next > 0 {
            s.fail_next -= 1;
            return Err(Box::new(HwError::Timeout { polls: 0 }));
        }
        s.reads += 1;
        Ok(s.raw)
    }
}

/// Pressure waveform for [`ProfileBridge`], in raw counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Triangle from 0 to `peak` and back, `half_period` samples each way.
    Ramp { peak: i32, half_period: u32 },
    /// Square wave between 0 and `peak`, switching every `half_period` samples.
    Step { peak: i32, half_period: u32 },
    /// Constant `peak`.
    Hold { peak: i32 },
}

impl Profile {
    /// Value at sample index `n`.
    pub fn at(&self, n: u64) -> i32 {
        match *self {
            Profile::Ramp { peak, half_period } => {
                let hp = u64::from(half_period.max(1));
                let phase = n % (2 * hp);
                let pos = if phase <= hp { phase } else { 2 * hp - phase };
                let scaled = i64::from(peak) * i64::try_from(pos).unwrap_or(0)
                    / i64::try_from(hp).unwrap_or(1);
                i32::try_from(scaled).unwrap_or(peak)
            }
            Profile::Step { peak, half_period } => {
                let hp = u64::from(half_period.max(1));
                if (n / hp) % 2 == 1 { peak } else { 0 }
            }
            Profile::Hold { peak } => peak,
        }
    }
}

/// Bridge replaying a [`Profile`] on top of a fixed offset, with optional
/// deterministic noise.
#[derive(Debug, Clone)]
pub struct ProfileBridge {
    profile: Profile,
    offset: i32,
    noise: i32,
    n: u64,
    rng: u32,
}

impl ProfileBridge {
    pub fn new(profile: Profile, offset: i32) -> Self {
        Self {
            profile,
            offset,
            noise: 0,
            n: 0,
            rng: 0x2545_F491,
        }
    }

    /// Add uniform noise in `[-amplitude, amplitude]` counts.
    pub fn with_noise(mut self, amplitude: i32) -> Self {
        self.noise = amplitude.max(0);
        self
    }

    fn next_noise(&mut self) -> i32 {
        if self.noise == 0 {
            return 0;
        }
        // xorshift32
        self.rng ^= self.rng << 13;
        self.rng ^= self.rng >> 17;
        self.rng ^= self.rng << 5;
        let span = u32::try_from(self.noise)
            .unwrap_or(0)
            .saturating_mul(2)
            .saturating_add(1);
        i32::try_from(self.rng % span).unwrap_or(0) - self.noise
    }
}

impl Bridge for ProfileBridge {
    fn read(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        let v = self.profile.at(self.n);
        self.n += 1;
        let noise = self.next_noise();
        Ok(self.offset.saturating_add(v).saturating_add(noise))
    }
}

// ── Panel inputs ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PanelState {
    levels: HashMap<InputLine, bool>,
    fail: bool,
}

/// Logical input lines settable from a handle. Unset lines read released.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPanel {
    state: Rc<RefCell<PanelState>>,
}

impl SimulatedPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> SimulatedPanel {
        self.clone()
    }

    pub fn set(&self, line: InputLine, level: bool) {
        self.state.borrow_mut().levels.insert(line, level);
    }

    pub fn press(&self, line: InputLine) {
        self.set(line, true);
    }

    pub fn release(&self, line: InputLine) {
        self.set(line, false);
    }

    /// Set both encoder phases at once.
    pub fn set_phases(&self, a: bool, b: bool) {
        let mut s = self.state.borrow_mut();
        s.levels.insert(InputLine::EncoderA, a);
        s.levels.insert(InputLine::EncoderB, b);
    }

    /// Make every read fail until cleared.
    pub fn set_fail(&self, fail: bool) {
        self.state.borrow_mut().fail = fail;
    }

    pub fn level(&self, line: InputLine) -> bool {
        self.state.borrow().levels.get(&line).copied().unwrap_or(false)
    }
}

impl DigitalInputs for SimulatedPanel {
    fn read_digital(&mut self, line: InputLine) -> Result<bool, BoxError> {
        let s = self.state.borrow();
        if s.fail {
            return Err(Box::new(HwError::Gpio(format!("{line:?} unreadable"))));
        }
        Ok(s.levels.get(&line).copied().unwrap_or(false))
    }
}

// ── Outputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct OutputState {
    levels: HashMap<OutputLine, bool>,
    writes: u64,
    fail: bool,
}

/// Outputs that remember the last level per line and count writes.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutputs {
    state: Rc<RefCell<OutputState>>,
}

impl RecordingOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> RecordingOutputs {
        self.clone()
    }

    pub fn level(&self, line: OutputLine) -> bool {
        self.state.borrow().levels.get(&line).copied().unwrap_or(false)
    }

    pub fn writes(&self) -> u64 {
        self.state.borrow().writes
    }

    pub fn set_fail(&self, fail: bool) {
        self.state.borrow_mut().fail = fail;
    }
}

impl DigitalOutputs for RecordingOutputs {
    fn write_digital(&mut self, line: OutputLine, level: bool) -> Result<(), BoxError> {
        let mut s = self.state.borrow_mut();
        if s.fail {
            return Err(Box::new(HwError::Gpio(format!("{line:?} write rejected"))));
        }
        s.writes += 1;
        s.levels.insert(line, level);
        Ok(())
    }
}

// ── EEPROM ───────────────────────────────────────────────────────────────────

fn range(addr: u16, len: usize, capacity: usize) -> Result<std::ops::Range<usize>, HwError> {
    let start = usize::from(addr);
    let end = start
        .checked_add(len)
        .filter(|&end| end <= capacity)
        .ok_or_else(|| HwError::Storage(format!("access {start}+{len} beyond capacity {capacity}")))?;
    Ok(start..end)
}

#[derive(Debug, Default)]
struct RamState {
    bytes: Vec<u8>,
    writes: u64,
    drop_writes: u32,
    fail: bool,
}

/// RAM-backed EEPROM. Clones share the same cells, so a clone kept by a
/// test survives the scheduler being dropped (a simulated power cycle).
#[derive(Debug, Clone, Default)]
pub struct RamEeprom {
    state: Rc<RefCell<RamState>>,
}

impl RamEeprom {
    /// Erased part: every byte `0xFF`.
    pub fn blank(capacity: usize) -> Self {
        Self::from_bytes(vec![0xFF; capacity])
    }

    pub fn zeroed(capacity: usize) -> Self {
        Self::from_bytes(vec![0; capacity])
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            state: Rc::new(RefCell::new(RamState {
                bytes,
                ..RamState::default()
            })),
        }
    }

    pub fn handle(&self) -> RamEeprom {
        self.clone()
    }

    /// Overwrite one byte behind the owner's back.
    pub fn corrupt(&self, addr: usize, byte: u8) {
        if let Some(b) = self.state.borrow_mut().bytes.get_mut(addr) {
            *b = byte;
        }
    }

    /// Accept but discard the next `n` writes, so read-back verification fails.
    pub fn drop_next_writes(&self, n: u32) {
        self.state.borrow_mut().drop_writes = n;
    }

    /// Make every access fail with a storage error until cleared.
    pub fn set_fail(&self, fail: bool) {
        self.state.borrow_mut().fail = fail;
    }

    pub fn writes(&self) -> u64 {
        self.state.borrow().writes
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.state.borrow().bytes.clone()
    }
}

impl NvStore for RamEeprom {
    fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), BoxError> {
        let s = self.state.borrow();
        if s.fail {
            return Err(Box::new(HwError::Storage("eeprom not responding".into())));
        }
        let r = range(addr, buf.len(), s.bytes.len())?;
        buf.copy_from_slice(&s.bytes[r]);
        Ok(())
    }

    fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), BoxError> {
        let mut s = self.state.borrow_mut();
        if s.fail {
            return Err(Box::new(HwError::Storage("eeprom not responding".into())));
        }
        let r = range(addr, data.len(), s.bytes.len())?;
        s.writes += 1;
        if s.drop_writes > 0 {
            s.drop_writes -= 1;
            tracing::trace!(addr, "simulated eeprom dropped write");
            return Ok(());
        }
        s.bytes[r].copy_from_slice(data);
        Ok(())
    }
}

/// EEPROM image kept in a file. Every write replaces the file atomically;
/// every read goes back to disk.
#[derive(Debug, Clone)]
pub struct FileEeprom {
    path: PathBuf,
    capacity: usize,
}

impl FileEeprom {
    /// Open `path`, creating an erased image of `capacity` bytes if absent.
    /// Short images are padded with `0xFF`.
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self, HwError> {
        let path = path.as_ref().to_path_buf();
        match std::fs::read(&path) {
            Ok(mut bytes) if bytes.len() < capacity => {
                bytes.resize(capacity, 0xFF);
                write_atomic(&path, &bytes)?;
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), capacity, "creating eeprom image");
                write_atomic(&path, &vec![0xFF; capacity])?;
            }
            Err(e) => return Err(HwError::Io(e)),
        }
        Ok(Self { path, capacity })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn image(&self) -> Result<Vec<u8>, HwError> {
        let mut bytes = std::fs::read(&self.path)?;
        bytes.resize(self.capacity, 0xFF);
        Ok(bytes)
    }
}

impl NvStore for FileEeprom {
    fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), BoxError> {
        let bytes = self.image()?;
        let r = range(addr, buf.len(), self.capacity)?;
        buf.copy_from_slice(&bytes[r]);
        Ok(())
    }

    fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), BoxError> {
        let mut bytes = self.image()?;
        let r = range(addr, data.len(), self.capacity)?;
        bytes[r].copy_from_slice(data);
        write_atomic(&self.path, &bytes).map_err(HwError::Io)?;
        Ok(())
    }
}

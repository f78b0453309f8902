use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::error;

/// Subsystem that detected an unrecoverable error.
///
/// Values start at 1 so that a packed fault record is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultSource {
    /// Host-link framing state machine.
    FrameChannel = 0x1,
    /// Emulated I2C peripheral.
    I2cPeriph = 0x2,
}

impl FaultSource {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x1 => Some(Self::FrameChannel),
            0x2 => Some(Self::I2cPeriph),
            _ => None,
        }
    }
}

/// First-writer-wins record of an unrecoverable error.
///
/// Handles are cheap clones sharing one atomic cell, so every component of
/// a device instance can both report and observe faults without any global
/// state. A latched value survives until the instance is dropped; there is
/// no in-band reset, matching the power-cycle-only recovery of the device.
#[derive(Debug, Clone, Default)]
pub struct FaultLatch {
    record: Arc<AtomicU32>,
}

impl FaultLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a fault. Only the first recorded fault is kept; later calls
    /// from either context are no-ops.
    ///
    /// The record packs to `(source << 16) | line_or_code`.
    pub fn record(&self, source: FaultSource, line_or_code: u16) {
        let packed = (u32::from(source as u8) << 16) | u32::from(line_or_code);
        if self
            .record
            .compare_exchange(0, packed, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            error!(?source, code = line_or_code, "fault latched");
        }
    }

    /// Whether a fault has been recorded.
    pub fn is_active(&self) -> bool {
        self.record.load(Ordering::SeqCst) != 0
    }

    /// The packed fault record, or 0 if none has been recorded.
    pub fn value(&self) -> u32 {
        self.record.load(Ordering::SeqCst)
    }

    /// Source of the latched fault, if any.
    pub fn source(&self) -> Option<FaultSource> {
        FaultSource::from_raw(((self.value() >> 16) & 0xff) as u8)
    }

    /// Line number or error code of the latched fault.
    pub fn code(&self) -> u16 {
        (self.value() & 0xffff) as u16
    }
}

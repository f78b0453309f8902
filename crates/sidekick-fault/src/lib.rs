//! Process-wide fault recording for the companion firmware core.
//!
//! A fault is the terminal marker of the system: the first unrecoverable
//! error latches a `(source, location)` pair and everything downstream
//! stops processing. The only observable output after that point is the
//! diagnostic pulse train encoded by [`diag`].

pub mod diag;
pub mod latch;

pub use diag::{diagnostic_word, pulse_train, Pulse, DEFAULT_BIT_PERIOD_MS, DIAG_MARKER};
pub use latch::{FaultLatch, FaultSource};

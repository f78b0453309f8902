//! Byte-stream transports for the device <-> host interface.
//!
//! The framing layer polls a [`Link`]: a non-blocking byte stream with the
//! count-based read/write contract of a firmware serial port. Two
//! implementations are provided: an in-process [`MemoryLink`] pair for
//! tests and examples, and a Unix-domain-socket link for running the
//! simulated device against real host tooling.

pub mod error;
pub mod memory;
pub mod traits;
#[cfg(unix)]
pub mod uds;

pub use error::{LinkError, Result};
pub use memory::{pair, MemoryLink};
pub use traits::Link;
#[cfg(unix)]
pub use uds::{UdsLink, UdsListener};

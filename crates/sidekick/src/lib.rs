//! Companion-device firmware core for bus-level bootloader assessment.
//!
//! A host machine drives this device over a framed serial-style link; the
//! device acts as a follower on the target's I2C bus, exposing exchange
//! buffers the target's bootloader can be made to read and write. This
//! crate holds the command vocabulary, the dispatcher, and the top-level
//! [`Companion`] device context; the lower layers live in their own crates.
//!
//! # Crate Structure
//!
//! - [`fault`] — First-writer-wins fault latch and diagnostic encoding
//! - [`link`] — Host-link byte-stream transports
//! - [`frame`] — Wire frames and the framing state machine
//! - [`bus`] — Emulated I2C peripheral
//!
//! The `cli` feature adds the `sidekick` binary: a hosted simulator that
//! serves the device over a Unix domain socket for host-tooling work
//! without hardware.

pub mod caps;
pub mod command;
pub mod companion;
pub mod dispatch;
pub mod version;

pub use caps::Capabilities;
pub use command::{Command, Status};
pub use companion::{Companion, DeviceState};
pub use dispatch::Dispatcher;

/// Re-export fault types.
pub mod fault {
    pub use sidekick_fault::*;
}

/// Re-export link types.
pub mod link {
    pub use sidekick_link::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sidekick_frame::*;
}

/// Re-export bus types.
pub mod bus {
    pub use sidekick_bus::*;
}

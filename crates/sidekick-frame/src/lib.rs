//! Host-link wire protocol: frame assembly and serialization.
//!
//! Every request and response is `[command: 1][length: 1][payload: length]`
//! with `length <= 64`. There is no checksum and no end marker; framing
//! relies entirely on the declared length, so a violated length bound or a
//! short transfer is unrecoverable and latches the device fault.
//!
//! [`FrameChannel`] owns no business logic; it assembles requests
//! incrementally across polls and serializes responses.

pub mod channel;
pub mod frame;

pub use channel::{ChannelState, FrameChannel};
pub use frame::{Frame, HEADER_SIZE, MAX_DATA_SIZE};

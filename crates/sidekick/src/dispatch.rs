use sidekick_bus::{BusController, BusEvents, I2cPeriph};
use sidekick_fault::FaultLatch;
use sidekick_frame::Frame;
use tracing::trace;

use crate::caps::Capabilities;
use crate::command::{Command, Status};
use crate::version::version_bytes;

/// Maps command identifiers to handler semantics against the peripheral
/// and capability state.
///
/// [`handle`] rewrites the request into its response in place: the frame
/// buffer is reused for both directions, so no handler ever allocates.
/// Every outcome is a response; command-level errors are status codes in
/// payload byte 0 and never touch the channel state or the fault latch.
///
/// [`handle`]: Dispatcher::handle
pub struct Dispatcher<C> {
    caps: Capabilities,
    i2c: I2cPeriph<C>,
}

impl<C: BusController> Dispatcher<C> {
    pub fn new(fault: FaultLatch) -> Self {
        Self {
            caps: Capabilities::empty(),
            i2c: I2cPeriph::new(fault),
        }
    }

    /// Attach the I2C peripheral subsystem and advertise it.
    pub fn attach_i2c(&mut self, controller: C, address: u8, speed_hz: u32) {
        self.i2c.attach(controller, address, speed_hz);
        self.caps |= Capabilities::I2C_PERIPH;
    }

    /// The emulated peripheral this dispatcher operates on.
    pub fn i2c(&self) -> &I2cPeriph<C> {
        &self.i2c
    }

    /// Handle for the asynchronous bus-event context.
    pub fn i2c_events(&self) -> BusEvents<C> {
        self.i2c.events()
    }

    /// Advertised capability mask.
    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Execute one request, rewriting `msg` into the response.
    pub fn handle(&mut self, msg: &mut Frame) {
        trace!(command = msg.command, length = msg.length, "dispatching");

        match Command::from_u8(msg.command) {
            Some(Command::FwGetVersion) => {
                msg.length = 4;
                msg.data[..4].copy_from_slice(&version_bytes());
            }

            Some(Command::FwGetCapabilities) => {
                msg.length = 4;
                msg.data[..4].copy_from_slice(&self.caps.bits().to_le_bytes());
            }

            Some(Command::I2cGetAddr) => {
                msg.length = 1;
                msg.data[0] = if self.i2c.attached() {
                    self.i2c.address()
                } else {
                    Status::NotSupported.as_u8()
                };
            }

            Some(Command::I2cSetAddr) => {
                if msg.length != 1 || msg.data[0] > 0x7f {
                    msg.data[0] = Status::InvalidParam.as_u8();
                } else if self.i2c.attached() {
                    self.i2c.set_address(msg.data[0]);
                    msg.data[0] = Status::Success.as_u8();
                } else {
                    msg.data[0] = Status::NotSupported.as_u8();
                }
                msg.length = 1;
            }

            Some(Command::I2cGetSpeed) => {
                if self.i2c.attached() {
                    msg.data[..4].copy_from_slice(&self.i2c.speed().to_le_bytes());
                    msg.length = 4;
                } else {
                    msg.data[0] = Status::NotSupported.as_u8();
                    msg.length = 1;
                }
            }

            Some(Command::I2cSetSpeed) => {
                let speed = u32::from_le_bytes([msg.data[0], msg.data[1], msg.data[2], msg.data[3]]);
                if msg.length != 4 || speed == 0 {
                    msg.data[0] = Status::InvalidParam.as_u8();
                } else if self.i2c.attached() {
                    self.i2c.set_speed(speed);
                    msg.data[0] = Status::Success.as_u8();
                } else {
                    msg.data[0] = Status::NotSupported.as_u8();
                }
                msg.length = 1;
            }

            Some(Command::I2cGetSubaddrLen) => {
                msg.data[0] = if self.i2c.attached() {
                    self.i2c.subaddress_skip()
                } else {
                    Status::NotSupported.as_u8()
                };
                msg.length = 1;
            }

            Some(Command::I2cSetSubaddrLen) => {
                if self.i2c.attached() {
                    self.i2c.set_subaddress_skip(msg.data[0]);
                    msg.data[0] = Status::Success.as_u8();
                } else {
                    msg.data[0] = Status::NotSupported.as_u8();
                }
                msg.length = 1;
            }

            Some(Command::I2cGetModeFlags | Command::I2cSetModeFlags) => {
                msg.length = 1;
                msg.data[0] = Status::Unimplemented.as_u8();
            }

            Some(Command::I2cSetReadBuffer) => {
                if msg.length < 1 {
                    msg.data[0] = Status::InvalidParam.as_u8();
                } else if self.i2c.attached() {
                    self.i2c.set_read_buffer(&msg.data[..usize::from(msg.length)]);
                    msg.data[0] = Status::Success.as_u8();
                } else {
                    msg.data[0] = Status::NotSupported.as_u8();
                }
                msg.length = 1;
            }

            Some(Command::I2cGetWriteBuffer) => {
                if self.i2c.attached() {
                    let n = self.i2c.write_buffer(&mut msg.data);
                    msg.length = n as u8;
                } else {
                    msg.length = 1;
                    msg.data[0] = Status::NotSupported.as_u8();
                }
            }

            None => {
                msg.length = 1;
                msg.data[0] = Status::InvalidCmd.as_u8();
            }
        }
    }
}

/// Host-protocol command identifiers.
///
/// 0x02-0x07 are reserved for future device-level settings, 0x20-0x2f for
/// SPI peripheral operation, and 0x80-0xff for downstream forks; none of
/// those ranges will be claimed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    FwGetVersion = 0x00,
    FwGetCapabilities = 0x01,

    I2cGetAddr = 0x08,
    I2cSetAddr = 0x09,
    I2cGetSpeed = 0x0a,
    I2cSetSpeed = 0x0b,
    I2cGetSubaddrLen = 0x0c,
    I2cSetSubaddrLen = 0x0d,
    I2cGetModeFlags = 0x0e,
    I2cSetModeFlags = 0x0f,
    I2cSetReadBuffer = 0x10,
    I2cGetWriteBuffer = 0x11,
}

impl Command {
    /// Decode a command identifier; `None` for anything outside the table.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0x00 => Some(Self::FwGetVersion),
            0x01 => Some(Self::FwGetCapabilities),
            0x08 => Some(Self::I2cGetAddr),
            0x09 => Some(Self::I2cSetAddr),
            0x0a => Some(Self::I2cGetSpeed),
            0x0b => Some(Self::I2cSetSpeed),
            0x0c => Some(Self::I2cGetSubaddrLen),
            0x0d => Some(Self::I2cSetSubaddrLen),
            0x0e => Some(Self::I2cGetModeFlags),
            0x0f => Some(Self::I2cSetModeFlags),
            0x10 => Some(Self::I2cSetReadBuffer),
            0x11 => Some(Self::I2cGetWriteBuffer),
            _ => None,
        }
    }
}

/// Single-byte status codes carried in payload byte 0 of a response.
///
/// These are the recoverable tier of the error model: the host may keep
/// issuing commands after any of them. Exactly this six-value vocabulary is
/// on the wire; nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Operation was successful, without error.
    Success = 0x00,
    /// Functionality stubbed, but not implemented.
    Unimplemented = 0xfb,
    /// Attempt to use uninitialized functionality.
    Uninitialized = 0xfc,
    /// Invalid parameter in request.
    InvalidParam = 0xfd,
    /// Not supported in this firmware or mode.
    NotSupported = 0xfe,
    /// Invalid command identifier.
    InvalidCmd = 0xff,
}

impl Status {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

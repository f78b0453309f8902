use bitflags::bitflags;

bitflags! {
    /// Bitset advertising which optional subsystems are active.
    ///
    /// Set once per attached subsystem at configuration time; read-only
    /// during normal operation. Reported to the host as a 4-byte
    /// little-endian value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities: u32 {
        /// I2C peripheral-mode emulation is attached.
        const I2C_PERIPH = 1 << 0;
        /// Reserved for SPI peripheral-mode emulation.
        const SPI_PERIPH = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        assert_eq!(Capabilities::default(), Capabilities::empty());
    }

    #[test]
    fn wire_encoding_is_little_endian() {
        let caps = Capabilities::I2C_PERIPH;
        assert_eq!(caps.bits().to_le_bytes(), [0x01, 0x00, 0x00, 0x00]);
    }
}

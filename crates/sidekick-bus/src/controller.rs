/// Hardware seam for an I2C controller operating in peripheral mode.
///
/// This mirrors the subset of a two-wire peripheral API the firmware needs:
/// re-initialize with a follower address, set the bus clock, pull latched
/// bytes out of the receive FIFO during a write event, and queue bytes for
/// the controller to clock out on a read request. Implementations back this
/// with real silicon on hardware and with in-memory FIFOs in tests and the
/// simulator.
pub trait BusController: Send {
    /// Re-initialize the peripheral with a new follower address.
    fn begin(&mut self, address: u8);

    /// Set the bus clock, in Hz.
    fn set_clock(&mut self, speed_hz: u32);

    /// Consume the next byte from the receive FIFO.
    ///
    /// Only meaningful while servicing a bus-write event; some hardware
    /// returns a filler byte (commonly 0) on an empty FIFO rather than
    /// signalling an error.
    fn read(&mut self) -> u8;

    /// Queue bytes for the controller to transmit on the bus.
    fn write(&mut self, data: &[u8]);
}

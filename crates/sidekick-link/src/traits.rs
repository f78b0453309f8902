/// A non-blocking byte stream between the device and the host.
///
/// This is the serial-port contract the framing layer polls against: no
/// framing, no errors, just counts. `read` and `write` return the number of
/// bytes actually transferred; the caller decides whether a short transfer
/// is tolerable. A transport whose backing stream has died stops yielding
/// and accepting bytes rather than failing.
pub trait Link {
    /// Number of bytes currently readable without blocking.
    fn available(&mut self) -> usize;

    /// Copy up to `buf.len()` buffered bytes into `buf`. Returns the count
    /// transferred; never blocks.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Write bytes toward the host. Returns the count accepted.
    fn write(&mut self, buf: &[u8]) -> usize;
}

use sidekick_fault::{FaultLatch, FaultSource};
use sidekick_link::Link;
use tracing::trace;

use crate::frame::{Frame, HEADER_SIZE, MAX_DATA_SIZE};

/// Assembly state of the host-protocol channel.
///
/// Owned exclusively by [`FrameChannel`]; transitions happen only inside
/// explicit `poll` calls. `Faulted` is terminal; the only way out is a
/// device reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Uninitialized,
    Idle,
    ReadingHeader,
    ReadingBody,
    Ready,
    Faulted,
}

/// Incremental, non-blocking parser/serializer for the host link.
///
/// The transport delivers bytes in arbitrary chunk sizes, so a request is
/// assembled across as many polls as it takes; each poll advances the state
/// machine at most one step and never blocks. The main loop must keep
/// polling every iteration, since it also has the fault latch and the
/// output driver to service.
pub struct FrameChannel<L> {
    state: ChannelState,
    link: Option<L>,
    req: Frame,
    received: usize,
    fault: FaultLatch,
}

impl<L: Link> FrameChannel<L> {
    /// Create a detached channel. It yields nothing until [`attach`] binds
    /// it to a link.
    ///
    /// [`attach`]: FrameChannel::attach
    pub fn new(fault: FaultLatch) -> Self {
        Self {
            state: ChannelState::Uninitialized,
            link: None,
            req: Frame::default(),
            received: 0,
            fault,
        }
    }

    /// Bind the channel to its host link. Only the first attach takes
    /// effect; later calls are ignored.
    pub fn attach(&mut self, link: L) {
        if self.state == ChannelState::Uninitialized {
            self.link = Some(link);
            self.req = Frame::default();
            self.state = ChannelState::Idle;
        }
    }

    /// Current assembly state.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Whether the channel has hit an unrecoverable protocol error.
    pub fn is_faulted(&self) -> bool {
        self.state == ChannelState::Faulted
    }

    /// Advance the state machine one step and return a request if one has
    /// fully arrived.
    ///
    /// Bytes past the request's declared length read back as zero.
    pub fn poll(&mut self) -> Option<Frame> {
        match self.state {
            ChannelState::Uninitialized | ChannelState::Faulted => None,

            ChannelState::Idle => {
                self.received = 0;
                let link = self.link.as_mut()?;
                if link.available() >= HEADER_SIZE {
                    self.state = ChannelState::ReadingHeader;
                }
                None
            }

            ChannelState::ReadingHeader => {
                let link = self.link.as_mut()?;
                let mut header = [0u8; HEADER_SIZE];
                let n = link.read(&mut header);
                if n != HEADER_SIZE {
                    self.latch_fault(line!() as u16);
                    return None;
                }

                self.req.command = header[0];
                self.req.length = header[1];
                if self.req.length == 0 {
                    self.state = ChannelState::Ready;
                } else if usize::from(self.req.length) <= MAX_DATA_SIZE {
                    self.received = 0;
                    self.state = ChannelState::ReadingBody;
                } else {
                    // Declared length exceeds the maximum payload; the host
                    // and device no longer agree on where frames start.
                    self.latch_fault(line!() as u16);
                }
                None
            }

            ChannelState::ReadingBody => {
                let link = self.link.as_mut()?;
                let avail = link.available();
                if avail > 0 {
                    let remaining = usize::from(self.req.length) - self.received;
                    let to_read = avail.min(remaining);
                    let start = self.received;
                    let n = link.read(&mut self.req.data[start..start + to_read]);
                    if n != to_read {
                        self.latch_fault(line!() as u16);
                        return None;
                    }

                    self.received += to_read;
                    if self.received >= usize::from(self.req.length) {
                        self.state = ChannelState::Ready;
                    }
                }
                None
            }

            ChannelState::Ready => {
                let mut out = self.req;
                out.data[usize::from(out.length)..].fill(0);
                trace!(command = out.command, length = out.length, "request assembled");
                self.state = ChannelState::Idle;
                Some(out)
            }
        }
    }

    /// Serialize a response onto the link.
    ///
    /// A declared length above [`MAX_DATA_SIZE`] is silently clamped;
    /// responses are trusted to originate from the dispatcher, which never
    /// exceeds the bound. A short write means the link lost bytes and
    /// latches a fault.
    pub fn send(&mut self, frame: &Frame) {
        if matches!(self.state, ChannelState::Faulted) {
            return;
        }
        let Some(link) = self.link.as_mut() else {
            return;
        };

        let len = usize::from(frame.length).min(MAX_DATA_SIZE);
        let mut wire = [0u8; HEADER_SIZE + MAX_DATA_SIZE];
        wire[0] = frame.command;
        wire[1] = len as u8;
        wire[HEADER_SIZE..HEADER_SIZE + len].copy_from_slice(&frame.data[..len]);

        let total = HEADER_SIZE + len;
        let written = link.write(&wire[..total]);
        if written != total {
            self.latch_fault(line!() as u16);
        }
    }

    fn latch_fault(&mut self, line: u16) {
        self.fault.record(FaultSource::FrameChannel, line);
        self.state = ChannelState::Faulted;
    }
}

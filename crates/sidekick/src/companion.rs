use sidekick_bus::{BusController, BusEvents};
use sidekick_fault::{diagnostic_word, FaultLatch};
use sidekick_frame::FrameChannel;
use sidekick_link::Link;

use crate::caps::Capabilities;
use crate::dispatch::Dispatcher;

/// Top-level device run state, as seen by the main loop.
///
/// `Faulted` is terminal within a power cycle and carries the 32-bit
/// diagnostic word for the external output driver to pulse out. Modeling
/// the halt as a value keeps it observable in tests; there is no hidden
/// infinite loop anywhere in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Running,
    Faulted(u32),
}

/// The companion device context, the top-level design entity.
///
/// Owns the framing channel, the dispatcher, the emulated peripheral, and
/// the shared fault latch. The platform port constructs one of these,
/// attaches the host link and whichever bus subsystems the board supports,
/// and then calls [`process_events`] every iteration of its main loop.
///
/// [`process_events`]: Companion::process_events
pub struct Companion<L, C> {
    channel: FrameChannel<L>,
    dispatcher: Dispatcher<C>,
    fault: FaultLatch,
}

impl<L: Link, C: BusController> Companion<L, C> {
    pub fn new() -> Self {
        let fault = FaultLatch::new();
        Self {
            channel: FrameChannel::new(fault.clone()),
            dispatcher: Dispatcher::new(fault.clone()),
            fault,
        }
    }

    /// Bind the serial-style link used to receive host requests.
    pub fn attach_host_interface(&mut self, link: L) {
        self.channel.attach(link);
    }

    /// Attach the I2C peripheral subsystem.
    pub fn attach_i2c(&mut self, controller: C, address: u8, speed_hz: u32) {
        self.dispatcher.attach_i2c(controller, address, speed_hz);
    }

    /// Handle for the asynchronous bus-event context.
    pub fn i2c_events(&self) -> BusEvents<C> {
        self.dispatcher.i2c_events()
    }

    /// Advertised capability mask.
    pub fn capabilities(&self) -> Capabilities {
        self.dispatcher.capabilities()
    }

    /// The shared fault latch.
    pub fn fault_latch(&self) -> &FaultLatch {
        &self.fault
    }

    /// Run one main-loop iteration: check the latch, poll for a request,
    /// dispatch it, and send the response.
    ///
    /// Once this returns [`DeviceState::Faulted`] it will never process
    /// another frame; the caller must divert to the diagnostic output and
    /// stay there until a physical reset.
    pub fn process_events(&mut self) -> DeviceState {
        if self.fault.is_active() {
            return DeviceState::Faulted(diagnostic_word(self.fault.value()));
        }

        if let Some(mut msg) = self.channel.poll() {
            self.dispatcher.handle(&mut msg);
            self.channel.send(&msg);
        }

        if self.fault.is_active() {
            DeviceState::Faulted(diagnostic_word(self.fault.value()))
        } else {
            DeviceState::Running
        }
    }
}

impl<L: Link, C: BusController> Default for Companion<L, C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use sidekick_bus::BusController;
    use sidekick_fault::FaultSource;
    use sidekick_link::{pair, Link, MemoryLink};

    use super::*;
    use crate::command::{Command, Status};

    struct NullController;

    impl BusController for NullController {
        fn begin(&mut self, _address: u8) {}
        fn set_clock(&mut self, _speed_hz: u32) {}
        fn read(&mut self) -> u8 {
            0
        }
        fn write(&mut self, _data: &[u8]) {}
    }

    fn companion_with_host() -> (MemoryLink, Companion<MemoryLink, NullController>) {
        let (host, device) = pair();
        let mut companion = Companion::new();
        companion.attach_host_interface(device);
        (host, companion)
    }

    fn run_until_response(
        host: &mut MemoryLink,
        companion: &mut Companion<MemoryLink, NullController>,
    ) -> Vec<u8> {
        for _ in 0..16 {
            assert_eq!(companion.process_events(), DeviceState::Running);
            let mut buf = [0u8; 128];
            let n = host.read(&mut buf);
            if n > 0 {
                return buf[..n].to_vec();
            }
        }
        panic!("no response from device");
    }

    #[test]
    fn idle_iterations_stay_running() {
        let (_host, mut companion) = companion_with_host();
        for _ in 0..8 {
            assert_eq!(companion.process_events(), DeviceState::Running);
        }
    }

    #[test]
    fn serves_a_version_request() {
        let (mut host, mut companion) = companion_with_host();

        host.write(&[Command::FwGetVersion as u8, 0x00]);
        let response = run_until_response(&mut host, &mut companion);

        assert_eq!(response[0], Command::FwGetVersion as u8);
        assert_eq!(response[1], 4);
        assert_eq!(&response[2..], &crate::version::version_bytes());
    }

    #[test]
    fn attach_i2c_advertises_capability() {
        let (_host, mut companion) = companion_with_host();
        assert_eq!(companion.capabilities(), Capabilities::empty());

        companion.attach_i2c(NullController, 0x78, 100_000);
        assert_eq!(companion.capabilities(), Capabilities::I2C_PERIPH);
    }

    #[test]
    fn i2c_gated_until_attached() {
        let (mut host, mut companion) = companion_with_host();

        host.write(&[Command::I2cGetAddr as u8, 0x00]);
        let response = run_until_response(&mut host, &mut companion);
        assert_eq!(&response[2..], &[Status::NotSupported.as_u8()]);

        companion.attach_i2c(NullController, 0x78, 100_000);
        host.write(&[Command::I2cGetAddr as u8, 0x00]);
        let response = run_until_response(&mut host, &mut companion);
        assert_eq!(&response[2..], &[0x78]);
    }

    #[test]
    fn protocol_violation_is_terminal() {
        let (mut host, mut companion) = companion_with_host();

        host.write(&[0x00, 65]);
        let mut state = DeviceState::Running;
        for _ in 0..8 {
            state = companion.process_events();
            if state != DeviceState::Running {
                break;
            }
        }

        let DeviceState::Faulted(word) = state else {
            panic!("device should have faulted");
        };
        assert_eq!(word >> 24, 0xAA);
        assert_eq!(
            companion.fault_latch().source(),
            Some(FaultSource::FrameChannel)
        );

        // Terminal: further iterations report the same fault and answer
        // nothing, even for a well-formed request.
        host.write(&[Command::FwGetVersion as u8, 0x00]);
        for _ in 0..8 {
            assert_eq!(companion.process_events(), DeviceState::Faulted(word));
        }
        let mut buf = [0u8; 8];
        assert_eq!(host.read(&mut buf), 0);
    }

    #[test]
    fn double_attach_surfaces_on_next_iteration() {
        let (_host, mut companion) = companion_with_host();
        companion.attach_i2c(NullController, 0x78, 100_000);
        companion.attach_i2c(NullController, 0x10, 400_000);

        assert!(matches!(
            companion.process_events(),
            DeviceState::Faulted(_)
        ));
        assert_eq!(
            companion.fault_latch().source(),
            Some(FaultSource::I2cPeriph)
        );
    }
}

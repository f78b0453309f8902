use std::sync::Arc;

use parking_lot::Mutex;
use sidekick_fault::{FaultLatch, FaultSource};
use tracing::trace;

use crate::controller::BusController;

/// Capacity of each exchange buffer, in bytes. An implicit limit of common
/// embedded two-wire APIs.
pub const BUFFER_SIZE: usize = 32;

/// Follower address platform ports should default to.
pub const DEFAULT_ADDRESS: u8 = 0x78;

/// Bus speed platform ports should default to, in Hz.
pub const DEFAULT_SPEED_HZ: u32 = 100_000;

/// Address reported while no bus is attached.
const UNATTACHED_ADDRESS: u8 = 0xff;

const DEFAULT_SUBADDR_SKIP: u8 = 1;

struct Shared<C> {
    controller: Option<C>,
    address: u8,
    speed_hz: u32,
    subaddr_skip: u8,
    rbuf: [u8; BUFFER_SIZE],
    rcount: usize,
    wbuf: [u8; BUFFER_SIZE],
    wcount: usize,
}

impl<C> Shared<C> {
    fn new() -> Self {
        Self {
            controller: None,
            address: UNATTACHED_ADDRESS,
            speed_hz: 0,
            subaddr_skip: DEFAULT_SUBADDR_SKIP,
            rbuf: [0; BUFFER_SIZE],
            rcount: 0,
            wbuf: [0; BUFFER_SIZE],
            wcount: 0,
        }
    }
}

/// The emulated I2C peripheral: main-context API.
///
/// The read buffer is filled here for the target's bus controller to fetch;
/// the write buffer holds whatever the controller most recently wrote. Both
/// are also touched by the asynchronous bus-event context ([`BusEvents`]),
/// so every access takes the shared lock for its duration; a partially
/// updated buffer must never be observable from the other context.
pub struct I2cPeriph<C> {
    shared: Arc<Mutex<Shared<C>>>,
    fault: FaultLatch,
}

impl<C> Clone for I2cPeriph<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            fault: self.fault.clone(),
        }
    }
}

impl<C: BusController> I2cPeriph<C> {
    pub fn new(fault: FaultLatch) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::new())),
            fault,
        }
    }

    /// Bind a bus controller and configure the follower address and clock.
    ///
    /// Attaching twice latches a fault and leaves the first configuration
    /// intact: multi-bus operation is unsupported, and the misconfiguration
    /// must surface at configuration time rather than as silent
    /// misbehavior later.
    pub fn attach(&self, mut controller: C, address: u8, speed_hz: u32) {
        let mut shared = self.shared.lock();
        if shared.controller.is_some() {
            self.fault.record(FaultSource::I2cPeriph, line!() as u16);
            return;
        }

        shared.rbuf = [0; BUFFER_SIZE];
        shared.rcount = 0;
        shared.wbuf = [0; BUFFER_SIZE];
        shared.wcount = 0;

        // The controller must be re-initialized with its address before the
        // clock is configured; reversing the order hangs some parts.
        controller.begin(address);
        shared.address = address;
        if speed_hz != 0 {
            controller.set_clock(speed_hz);
            shared.speed_hz = speed_hz;
        }
        shared.controller = Some(controller);
    }

    /// Whether a bus controller is attached.
    pub fn attached(&self) -> bool {
        self.shared.lock().controller.is_some()
    }

    /// Handle for the asynchronous bus-event context.
    pub fn events(&self) -> BusEvents<C> {
        BusEvents {
            shared: Arc::clone(&self.shared),
            fault: self.fault.clone(),
        }
    }

    /// Current follower address, or `0xff` if unattached.
    pub fn address(&self) -> u8 {
        self.shared.lock().address
    }

    /// Re-initialize the controller with a new follower address.
    pub fn set_address(&self, address: u8) {
        let mut shared = self.shared.lock();
        if let Some(controller) = shared.controller.as_mut() {
            controller.begin(address);
            shared.address = address;
        }
    }

    /// Current bus speed, in Hz.
    pub fn speed(&self) -> u32 {
        self.shared.lock().speed_hz
    }

    /// Set the bus clock. A zero speed is ignored.
    pub fn set_speed(&self, speed_hz: u32) {
        if speed_hz == 0 {
            return;
        }
        let mut shared = self.shared.lock();
        if let Some(controller) = shared.controller.as_mut() {
            controller.set_clock(speed_hz);
            shared.speed_hz = speed_hz;
        }
    }

    /// Number of leading bytes discarded from each incoming bus write.
    pub fn subaddress_skip(&self) -> u8 {
        self.shared.lock().subaddr_skip
    }

    /// Set the number of leading bytes to discard from incoming bus writes.
    pub fn set_subaddress_skip(&self, skip: u8) {
        self.shared.lock().subaddr_skip = skip;
    }

    /// Fill the outgoing buffer for the bus controller's next read.
    /// Excess bytes are truncated, not an error.
    pub fn set_read_buffer(&self, bytes: &[u8]) {
        let mut shared = self.shared.lock();
        let len = bytes.len().min(BUFFER_SIZE);
        shared.rbuf[..len].copy_from_slice(&bytes[..len]);
        shared.rcount = len;
    }

    /// Copy the most recently captured incoming bytes into `out`; returns
    /// the count copied (capped at `out.len()`).
    pub fn write_buffer(&self, out: &mut [u8]) -> usize {
        let shared = self.shared.lock();
        let n = shared.wcount.min(out.len());
        out[..n].copy_from_slice(&shared.wbuf[..n]);
        n
    }
}

/// The emulated I2C peripheral: asynchronous bus-event context.
///
/// Invoked by the bus controller when the target writes to or reads from
/// the device. Handlers run to completion under the shared lock and never
/// call back into the main-context API.
pub struct BusEvents<C> {
    shared: Arc<Mutex<Shared<C>>>,
    fault: FaultLatch,
}

impl<C> Clone for BusEvents<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            fault: self.fault.clone(),
        }
    }
}

impl<C: BusController> BusEvents<C> {
    /// The bus controller latched `count` bytes written by the target.
    ///
    /// The first `subaddress_skip` bytes are consumed from the controller
    /// but not stored. A negative count, or one exceeding the buffer, means
    /// we are no longer in control of the transaction: both latch a fault,
    /// but an oversized write is still captured up to capacity so the bytes
    /// are available for post-mortem inspection.
    pub fn on_bus_write(&self, count: i32) {
        let shared = &mut *self.shared.lock();
        let Shared {
            controller,
            subaddr_skip,
            wbuf,
            wcount,
            ..
        } = shared;
        let Some(controller) = controller.as_mut() else {
            return;
        };

        if count < 0 {
            self.fault.record(FaultSource::I2cPeriph, line!() as u16);
            return;
        }
        let mut count = count as usize;
        if count > BUFFER_SIZE {
            self.fault.record(FaultSource::I2cPeriph, line!() as u16);
            count = BUFFER_SIZE;
        }

        for _ in 0..*subaddr_skip {
            let _ = controller.read();
        }

        *wcount = count;
        for slot in wbuf[..count].iter_mut() {
            *slot = controller.read();
        }
        trace!(count, "captured bus write");
    }

    /// The target requested a read; clock out the current read buffer.
    pub fn on_bus_read_request(&self) {
        let shared = &mut *self.shared.lock();
        let Shared {
            controller,
            rbuf,
            rcount,
            ..
        } = shared;
        if let Some(controller) = controller.as_mut() {
            controller.write(&rbuf[..*rcount]);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// In-memory controller recording configuration calls and backing the
    /// FIFOs with queues.
    #[derive(Default)]
    struct MockController {
        calls: Vec<String>,
        incoming: VecDeque<u8>,
        outgoing: Vec<u8>,
    }

    impl BusController for MockController {
        fn begin(&mut self, address: u8) {
            self.calls.push(format!("begin({address:#04x})"));
        }

        fn set_clock(&mut self, speed_hz: u32) {
            self.calls.push(format!("set_clock({speed_hz})"));
        }

        fn read(&mut self) -> u8 {
            self.incoming.pop_front().unwrap_or(0)
        }

        fn write(&mut self, data: &[u8]) {
            self.outgoing.extend_from_slice(data);
        }
    }

    fn attached() -> (I2cPeriph<MockController>, FaultLatch) {
        let fault = FaultLatch::new();
        let periph = I2cPeriph::new(fault.clone());
        periph.attach(MockController::default(), DEFAULT_ADDRESS, DEFAULT_SPEED_HZ);
        (periph, fault)
    }

    fn feed(periph: &I2cPeriph<MockController>, bytes: &[u8]) {
        let mut shared = periph.shared.lock();
        let controller = shared.controller.as_mut().unwrap();
        controller.incoming.extend(bytes.iter().copied());
    }

    #[test]
    fn attach_configures_address_before_clock() {
        let (periph, fault) = attached();

        let shared = periph.shared.lock();
        let calls = &shared.controller.as_ref().unwrap().calls;
        assert_eq!(calls, &["begin(0x78)", "set_clock(100000)"]);
        drop(shared);

        assert!(periph.attached());
        assert_eq!(periph.address(), DEFAULT_ADDRESS);
        assert_eq!(periph.speed(), DEFAULT_SPEED_HZ);
        assert!(!fault.is_active());
    }

    #[test]
    fn unattached_reports_placeholder_address() {
        let periph: I2cPeriph<MockController> = I2cPeriph::new(FaultLatch::new());
        assert!(!periph.attached());
        assert_eq!(periph.address(), 0xff);
        assert_eq!(periph.speed(), 0);
    }

    #[test]
    fn double_attach_faults_and_keeps_first_config() {
        let (periph, fault) = attached();

        periph.attach(MockController::default(), 0x42, 400_000);

        assert!(fault.is_active());
        assert_eq!(fault.source(), Some(FaultSource::I2cPeriph));
        assert_eq!(periph.address(), DEFAULT_ADDRESS);
        assert_eq!(periph.speed(), DEFAULT_SPEED_HZ);
    }

    #[test]
    fn set_speed_ignores_zero() {
        let (periph, _fault) = attached();
        periph.set_speed(0);
        assert_eq!(periph.speed(), DEFAULT_SPEED_HZ);

        periph.set_speed(400_000);
        assert_eq!(periph.speed(), 400_000);
    }

    #[test]
    fn set_address_reinitializes_controller() {
        let (periph, _fault) = attached();
        periph.set_address(0x2a);

        assert_eq!(periph.address(), 0x2a);
        let shared = periph.shared.lock();
        let calls = &shared.controller.as_ref().unwrap().calls;
        assert_eq!(calls.last().unwrap(), "begin(0x2a)");
    }

    #[test]
    fn read_buffer_is_truncated_to_capacity() {
        let (periph, _fault) = attached();
        periph.set_read_buffer(&[0xCC; BUFFER_SIZE + 10]);

        let events = periph.events();
        events.on_bus_read_request();

        let shared = periph.shared.lock();
        assert_eq!(
            shared.controller.as_ref().unwrap().outgoing,
            vec![0xCC; BUFFER_SIZE]
        );
    }

    #[test]
    fn bus_write_skips_subaddress_bytes() {
        let (periph, fault) = attached();
        // Default skip is one byte: the register/sub-address selector.
        feed(&periph, &[0xA0, 1, 2, 3]);

        periph.events().on_bus_write(3);

        let mut out = [0u8; BUFFER_SIZE];
        let n = periph.write_buffer(&mut out);
        assert_eq!(&out[..n], &[1, 2, 3]);
        assert!(!fault.is_active());
    }

    #[test]
    fn subaddress_skip_can_be_disabled() {
        let (periph, _fault) = attached();
        periph.set_subaddress_skip(0);
        feed(&periph, &[0xA0, 1, 2]);

        periph.events().on_bus_write(3);

        let mut out = [0u8; BUFFER_SIZE];
        let n = periph.write_buffer(&mut out);
        assert_eq!(&out[..n], &[0xA0, 1, 2]);
    }

    #[test]
    fn negative_count_faults_without_capture() {
        let (periph, fault) = attached();
        feed(&periph, &[1, 2, 3]);

        periph.events().on_bus_write(-1);

        assert!(fault.is_active());
        let mut out = [0u8; BUFFER_SIZE];
        assert_eq!(periph.write_buffer(&mut out), 0);
    }

    #[test]
    fn oversized_count_faults_but_captures_to_capacity() {
        let (periph, fault) = attached();
        periph.set_subaddress_skip(0);
        let bytes: Vec<u8> = (0..48).map(|i| i as u8).collect();
        feed(&periph, &bytes);

        periph.events().on_bus_write(48);

        assert!(fault.is_active());
        assert_eq!(fault.source(), Some(FaultSource::I2cPeriph));

        let mut out = [0u8; 64];
        let n = periph.write_buffer(&mut out);
        assert_eq!(n, BUFFER_SIZE);
        assert_eq!(&out[..n], &bytes[..BUFFER_SIZE]);
    }

    #[test]
    fn read_request_writes_nothing_until_buffer_set() {
        let (periph, _fault) = attached();
        periph.events().on_bus_read_request();

        let shared = periph.shared.lock();
        assert!(shared.controller.as_ref().unwrap().outgoing.is_empty());
    }

    #[test]
    fn events_before_attach_are_ignored() {
        let fault = FaultLatch::new();
        let periph: I2cPeriph<MockController> = I2cPeriph::new(fault.clone());
        let events = periph.events();

        events.on_bus_write(4);
        events.on_bus_read_request();

        assert!(!fault.is_active());
    }

    #[test]
    fn bus_events_fire_from_another_thread() {
        let (periph, fault) = attached();
        periph.set_subaddress_skip(0);
        feed(&periph, &[9, 8, 7]);

        let events = periph.events();
        std::thread::spawn(move || events.on_bus_write(3))
            .join()
            .unwrap();

        let mut out = [0u8; BUFFER_SIZE];
        let n = periph.write_buffer(&mut out);
        assert_eq!(&out[..n], &[9, 8, 7]);
        assert!(!fault.is_active());
    }
}

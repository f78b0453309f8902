//! Wire-level end-to-end tests: a host endpoint drives a complete device
//! through the in-memory link and observes raw response bytes.

use sidekick::bus::BusController;
use sidekick::link::{pair, Link, MemoryLink};
use sidekick::{Companion, DeviceState, Status};

struct NullController;

impl BusController for NullController {
    fn begin(&mut self, _address: u8) {}
    fn set_clock(&mut self, _speed_hz: u32) {}
    fn read(&mut self) -> u8 {
        0
    }
    fn write(&mut self, _data: &[u8]) {}
}

type SimCompanion = Companion<MemoryLink, NullController>;

fn device_with_i2c() -> (MemoryLink, SimCompanion) {
    let (host, device) = pair();
    let mut companion = SimCompanion::new();
    companion.attach_host_interface(device);
    companion.attach_i2c(NullController, 0x78, 100_000);
    (host, companion)
}

fn transact(host: &mut MemoryLink, companion: &mut SimCompanion, request: &[u8]) -> Vec<u8> {
    host.write(request);
    for _ in 0..32 {
        assert_eq!(companion.process_events(), DeviceState::Running);
        let mut buf = [0u8; 128];
        let n = host.read(&mut buf);
        if n > 0 {
            return buf[..n].to_vec();
        }
    }
    panic!("no response for request {request:?}");
}

#[test]
fn full_command_sweep() {
    let (mut host, mut companion) = device_with_i2c();

    // Version: 4 payload bytes.
    let resp = transact(&mut host, &mut companion, &[0x00, 0x00]);
    assert_eq!(resp[..2], [0x00, 4]);

    // Capabilities: I2C bit, little-endian.
    let resp = transact(&mut host, &mut companion, &[0x01, 0x00]);
    assert_eq!(resp, vec![0x01, 4, 0x01, 0x00, 0x00, 0x00]);

    // Address get, set, get.
    let resp = transact(&mut host, &mut companion, &[0x08, 0x00]);
    assert_eq!(resp, vec![0x08, 1, 0x78]);
    let resp = transact(&mut host, &mut companion, &[0x09, 0x01, 0x2a]);
    assert_eq!(resp, vec![0x09, 1, Status::Success.as_u8()]);
    let resp = transact(&mut host, &mut companion, &[0x08, 0x00]);
    assert_eq!(resp, vec![0x08, 1, 0x2a]);

    // Speed get, set, get (little-endian).
    let resp = transact(&mut host, &mut companion, &[0x0a, 0x00]);
    assert_eq!(resp, vec![0x0a, 4, 0xa0, 0x86, 0x01, 0x00]);
    let mut request = vec![0x0b, 0x04];
    request.extend_from_slice(&400_000u32.to_le_bytes());
    let resp = transact(&mut host, &mut companion, &request);
    assert_eq!(resp, vec![0x0b, 1, Status::Success.as_u8()]);
    let resp = transact(&mut host, &mut companion, &[0x0a, 0x00]);
    assert_eq!(resp, vec![0x0a, 4, 0x80, 0x1a, 0x06, 0x00]);

    // Subaddress skip round trip.
    let resp = transact(&mut host, &mut companion, &[0x0c, 0x00]);
    assert_eq!(resp, vec![0x0c, 1, 1]);
    let resp = transact(&mut host, &mut companion, &[0x0d, 0x01, 0x00]);
    assert_eq!(resp, vec![0x0d, 1, Status::Success.as_u8()]);
    let resp = transact(&mut host, &mut companion, &[0x0c, 0x00]);
    assert_eq!(resp, vec![0x0c, 1, 0]);

    // Mode flags are reserved.
    let resp = transact(&mut host, &mut companion, &[0x0e, 0x00]);
    assert_eq!(resp, vec![0x0e, 1, Status::Unimplemented.as_u8()]);
    let resp = transact(&mut host, &mut companion, &[0x0f, 0x00]);
    assert_eq!(resp, vec![0x0f, 1, Status::Unimplemented.as_u8()]);

    // Read buffer accepted; write buffer empty so far.
    let resp = transact(&mut host, &mut companion, &[0x10, 0x03, 1, 2, 3]);
    assert_eq!(resp, vec![0x10, 1, Status::Success.as_u8()]);
    let resp = transact(&mut host, &mut companion, &[0x11, 0x00]);
    assert_eq!(resp, vec![0x11, 0]);

    // Unknown command.
    let resp = transact(&mut host, &mut companion, &[0x42, 0x00]);
    assert_eq!(resp, vec![0x42, 1, Status::InvalidCmd.as_u8()]);
}

#[test]
fn detached_device_gates_i2c_commands() {
    let (mut host, device) = pair();
    let mut companion = SimCompanion::new();
    companion.attach_host_interface(device);

    // Capabilities are empty.
    let resp = transact(&mut host, &mut companion, &[0x01, 0x00]);
    assert_eq!(resp, vec![0x01, 4, 0x00, 0x00, 0x00, 0x00]);

    for command in [0x08u8, 0x0a, 0x0c, 0x11] {
        let resp = transact(&mut host, &mut companion, &[command, 0x00]);
        assert_eq!(resp, vec![command, 1, Status::NotSupported.as_u8()]);
    }

    // Invalid parameter wins over the attachment gate.
    let resp = transact(&mut host, &mut companion, &[0x09, 0x01, 0x80]);
    assert_eq!(resp, vec![0x09, 1, Status::InvalidParam.as_u8()]);
}

#[test]
fn oversize_length_faults_and_silences_the_device() {
    let (mut host, mut companion) = device_with_i2c();

    host.write(&[0x00, 65]);

    let mut faulted = None;
    for _ in 0..16 {
        if let DeviceState::Faulted(word) = companion.process_events() {
            faulted = Some(word);
            break;
        }
    }
    let word = faulted.expect("oversize length must fault");
    assert_eq!(word >> 24, 0xAA);

    // No response was ever produced, and none will be.
    host.write(&[0x00, 0x00]);
    for _ in 0..8 {
        assert!(matches!(companion.process_events(), DeviceState::Faulted(_)));
    }
    let mut buf = [0u8; 8];
    assert_eq!(host.read(&mut buf), 0);
}

#[test]
fn requests_survive_byte_at_a_time_delivery() {
    let (mut host, mut companion) = device_with_i2c();

    for &byte in &[0x08u8, 0x00] {
        host.write(&[byte]);
        assert_eq!(companion.process_events(), DeviceState::Running);
    }

    let mut buf = [0u8; 8];
    let mut got = Vec::new();
    for _ in 0..16 {
        assert_eq!(companion.process_events(), DeviceState::Running);
        let n = host.read(&mut buf);
        got.extend_from_slice(&buf[..n]);
        if !got.is_empty() {
            break;
        }
    }
    assert_eq!(got, vec![0x08, 1, 0x78]);
}

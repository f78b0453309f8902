//! Drive the firmware core end-to-end in memory, with no hardware and no
//! sockets involved.
//!
//! Run with:
//!   cargo run --example loopback

use sidekick::bus::BusController;
use sidekick::link::{pair, Link, MemoryLink};
use sidekick::{Companion, DeviceState};

/// Bus controller that goes nowhere; the emulated bus is idle in this demo.
struct NullController;

impl BusController for NullController {
    fn begin(&mut self, _address: u8) {}
    fn set_clock(&mut self, _speed_hz: u32) {}
    fn read(&mut self) -> u8 {
        0
    }
    fn write(&mut self, _data: &[u8]) {}
}

fn main() {
    let (mut host, device) = pair();

    let mut companion: Companion<MemoryLink, NullController> = Companion::new();
    companion.attach_host_interface(device);
    companion.attach_i2c(NullController, 0x78, 100_000);

    exchange(&mut host, &mut companion, "FW_GET_VERSION", 0x00, &[]);
    exchange(&mut host, &mut companion, "FW_GET_CAPABILITIES", 0x01, &[]);
    exchange(&mut host, &mut companion, "I2C_GET_ADDR", 0x08, &[]);
    exchange(&mut host, &mut companion, "I2C_GET_SPEED", 0x0a, &[]);
    exchange(
        &mut host,
        &mut companion,
        "I2C_SET_READ_BUFFER",
        0x10,
        b"hello, target",
    );
    exchange(&mut host, &mut companion, "(unknown command)", 0x42, &[]);
}

fn exchange(
    host: &mut MemoryLink,
    companion: &mut Companion<MemoryLink, NullController>,
    name: &str,
    command: u8,
    payload: &[u8],
) {
    host.write(&[command, payload.len() as u8]);
    host.write(payload);

    let mut response = [0u8; 66];
    loop {
        match companion.process_events() {
            DeviceState::Running => {}
            DeviceState::Faulted(word) => {
                eprintln!("device faulted: {word:#010x}");
                return;
            }
        }
        let n = host.read(&mut response);
        if n > 0 {
            let hex: Vec<String> = response[..n].iter().map(|b| format!("{b:02x}")).collect();
            println!("{name}: [{}]", hex.join(" "));
            return;
        }
    }
}

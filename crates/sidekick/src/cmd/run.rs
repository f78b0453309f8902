use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sidekick::bus::BusController;
use sidekick::link::{UdsLink, UdsListener};
use sidekick::{Companion, DeviceState};
use tracing::{debug, info, warn};

use crate::cmd::RunArgs;
use crate::exit::{link_error, CliError, CliResult, INTERNAL, SUCCESS};

const IDLE_POLL_SLEEP: Duration = Duration::from_millis(1);

/// Stand-in bus controller for hosted runs: configuration calls are logged
/// and the FIFOs are memory-backed. Nothing drives the emulated bus in the
/// simulator, so the exchange buffers simply hold whatever the host
/// protocol puts in them.
#[derive(Default)]
struct SimController {
    incoming: VecDeque<u8>,
    outgoing: Vec<u8>,
}

impl BusController for SimController {
    fn begin(&mut self, address: u8) {
        debug!(address = format_args!("{address:#04x}"), "bus controller re-initialized");
    }

    fn set_clock(&mut self, speed_hz: u32) {
        debug!(speed_hz, "bus clock configured");
    }

    fn read(&mut self) -> u8 {
        self.incoming.pop_front().unwrap_or(0)
    }

    fn write(&mut self, data: &[u8]) {
        self.outgoing.extend_from_slice(data);
        debug!(len = data.len(), "bus read request served");
    }
}

pub fn run(args: RunArgs) -> CliResult<i32> {
    let listener = UdsListener::bind(&args.path).map_err(|err| link_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    info!(path = %args.path.display(), "device simulator ready");

    while running.load(Ordering::SeqCst) {
        let link = match listener.accept() {
            Ok(link) => link,
            Err(err) => return Err(link_error("accept failed", err)),
        };
        let hangup = link.hangup_flag();

        let mut companion: Companion<UdsLink, SimController> = Companion::new();
        companion.attach_host_interface(link);
        if !args.no_i2c {
            companion.attach_i2c(SimController::default(), args.i2c_addr, args.i2c_speed);
        }

        info!("host connected");
        while running.load(Ordering::SeqCst) {
            match companion.process_events() {
                DeviceState::Running => {
                    if hangup.load(Ordering::SeqCst) {
                        info!("host disconnected");
                        break;
                    }
                    std::thread::sleep(IDLE_POLL_SLEEP);
                }
                DeviceState::Faulted(word) => {
                    // A real device pulses the word forever; the simulator
                    // reports it once and waits for the next connection.
                    warn!(
                        word = format_args!("{word:#010x}"),
                        "device faulted; awaiting reset (next connection)"
                    );
                    break;
                }
            }
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

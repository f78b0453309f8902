use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod fault;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the simulated device over a Unix domain socket.
    Run(RunArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Decode a fault diagnostic word into source, code, and pulse train.
    FaultDecode(FaultDecodeArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args),
        Command::Version(args) => version::run(args),
        Command::FaultDecode(args) => fault::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// I2C follower address presented on the emulated bus.
    #[arg(long, value_parser = parse_u8_arg, default_value = "0x78")]
    pub i2c_addr: u8,
    /// I2C bus speed, in Hz.
    #[arg(long, value_parser = parse_u32_arg, default_value = "100000")]
    pub i2c_speed: u32,
    /// Leave the I2C peripheral detached (I2C commands answer NOT_SUPPORTED).
    #[arg(long)]
    pub no_i2c: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug)]
pub struct FaultDecodeArgs {
    /// Diagnostic word, decimal or 0x-prefixed hex. A bare fault record
    /// (without the 0xAA marker byte) is accepted too.
    #[arg(value_parser = parse_u32_arg)]
    pub word: u32,
    /// Pulse bit period, in milliseconds.
    #[arg(long, value_parser = parse_u32_arg, default_value = "50")]
    pub bit_period: u32,
}

fn parse_u32_arg(arg: &str) -> Result<u32, String> {
    let arg = arg.trim();
    let (digits, radix) = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (arg, 10),
    };
    u32::from_str_radix(digits, radix).map_err(|err| format!("invalid number {arg:?}: {err}"))
}

fn parse_u8_arg(arg: &str) -> Result<u8, String> {
    let value = parse_u32_arg(arg)?;
    u8::try_from(value).map_err(|_| format!("value out of range for u8: {arg}"))
}

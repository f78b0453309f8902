use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("sidekick {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let [major, minor, patch, extra] = sidekick::version::version_bytes();

    println!("name: sidekick");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("protocol_version: {major}.{minor}.{patch}+{extra}");
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);

    Ok(SUCCESS)
}

use sttrelay_asr::{DEFAULT_API_URL, DEFAULT_MODEL_ID};
use sttrelay_frame::PROTOCOL_VERSION;
use sttrelay_transport::DEFAULT_PORT;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("sttrelay {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: sttrelay");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("STTRELAY_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("STTRELAY_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("wyoming_frame_version: {PROTOCOL_VERSION}");
    println!("default_port: {DEFAULT_PORT}");
    println!("default_model: {DEFAULT_MODEL_ID}");
    println!("default_api_url: {DEFAULT_API_URL}");
    println!("unix_sockets: {}", cfg!(unix));

    Ok(SUCCESS)
}

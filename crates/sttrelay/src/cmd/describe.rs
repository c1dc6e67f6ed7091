use std::time::Duration;

use sttrelay_frame::{Info, Message};
use sttrelay_transport::Endpoint;
use tracing::debug;

use crate::cmd::{connect_framed, parse_endpoint, parse_timeout, DescribeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_info, OutputFormat};

pub fn run(args: DescribeArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = parse_endpoint(&args.uri)?;
    let timeout = parse_timeout(&args.timeout)?;

    let info = describe(&endpoint, timeout)?;
    print_info(&endpoint.to_string(), &info, format);
    Ok(SUCCESS)
}

fn describe(endpoint: &Endpoint, timeout: Duration) -> CliResult<Info> {
    let (mut reader, mut writer) = connect_framed(endpoint, timeout)?;

    writer
        .send_message(Message::Describe)
        .map_err(|err| frame_error("describe failed", err))?;

    loop {
        match reader
            .read_message()
            .map_err(|err| frame_error("waiting for info failed", err))?
        {
            Message::Info(info) => return Ok(info),
            other => debug!(event_type = other.event_type(), "skipping message"),
        }
    }
}

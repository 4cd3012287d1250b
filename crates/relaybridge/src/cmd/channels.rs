use relaybridge_frame::ChannelRegistry;

use crate::cmd::{load_config, ChannelsArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_channels, OutputFormat};

pub fn run(args: ChannelsArgs, format: OutputFormat) -> CliResult<i32> {
    let config = load_config(args.config.as_ref())?;
    let registry = ChannelRegistry::with_defaults(&config.channels)
        .map_err(|err| frame_error("channel registry invalid", err))?;

    print_channels(&registry, format);
    Ok(SUCCESS)
}

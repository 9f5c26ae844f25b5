use clap::Parser;
use shared_utils::colors;
use shared_utils::logging::{init_logging, LogConfig};
use tracing::{error, Level};

use vid_target::cli::Cli;
use vid_target::transcode;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.colour {
        colors::force_colors();
    }

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    if let Err(e) = init_logging(
        "vid-target",
        LogConfig::default()
            .with_level(level)
            .with_console(cli.verbose),
    ) {
        colors::print_warning(&format!("Logging disabled: {:#}", e));
    }

    if let Err(e) = transcode::run(cli) {
        error!(error = %format!("{:#}", e), "Run aborted");
        colors::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

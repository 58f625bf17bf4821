//! SFD CLI - Command line tool for streamflow depletion analysis.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "sfd-cli",
    version,
    about = "Stream gauge snapping and streamflow depletion toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: sfd_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("[SFD] cli: starting");
    sfd_cmd::run(cli.command)
}

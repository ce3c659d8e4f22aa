//! WSD CLI - Command line tool for publishing water supply dashboard data.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "wsd-cli",
    version,
    about = "Water supply dashboard data toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: wsd_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    wsd_cmd::run(cli.command)
}

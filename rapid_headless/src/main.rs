// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

mod circuits;
mod commands;
mod gps;

use clap::{Parser, Subcommand};
use commands::{laptimer_run, livetiming_run};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the lap-timer core against a file replay or simulator.
    Laptimer {
        #[command(subcommand)]
        action: LaptimerCommand,
    },
    /// Run the live-timing board.
    Livetiming {
        #[command(subcommand)]
        action: LivetimingCommand,
    },
}

#[derive(Subcommand, Debug)]
enum LaptimerCommand {
    Run(laptimer_run::LaptimerRunArgs),
}

#[derive(Subcommand, Debug)]
enum LivetimingCommand {
    Run(livetiming_run::LivetimingRunArgs),
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Laptimer { action: LaptimerCommand::Run(args) } => laptimer_run::run(args).await,
        Command::Livetiming { action: LivetimingCommand::Run(args) } => livetiming_run::run(args).await,
    }
}

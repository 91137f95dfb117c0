//! Canvasport CLI: the `canvasport` command.

mod cli;
mod commands;
mod config;
mod logging;
mod snapshot;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use logging::{LogConfig, init_logging};

fn main() {
    let cli = Cli::parse();
    let config = support::load_config_or_exit(cli.config.as_deref());

    let log_config = LogConfig::resolve(&config.logging.level, &config.logging.format, cli.verbose)
        .unwrap_or_else(|e| {
            eprintln!("error: [logging] {e}");
            std::process::exit(1);
        });
    init_logging(&log_config);

    match cli.command {
        Commands::Export {
            snapshot,
            output,
            exported_at,
            json,
        } => commands::export::run(&config, snapshot, output, exported_at, json),

        Commands::Inspect { file, json } => commands::inspect::run(file, json),

        Commands::Verify { file, json } => commands::verify::run(file, json),

        Commands::Import {
            file,
            store,
            report,
            json,
        } => commands::import::run(&config, file, store, report, json),
    }
}

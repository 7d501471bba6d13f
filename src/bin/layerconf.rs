//! Layerconf CLI Binary
//!
//! Command-line interface for layered JSON configuration.

use clap::Parser;
use layerconf::logging::init_logging;
use layerconf::tooling::cli::{Cli, CliContext};
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(Some(&cli.logging_config())) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    let mut context = match CliContext::new(&cli.app, cli.config_options()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    match context.execute(&cli.command).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            tracing::error!(kind = ?e.kind(), "command failed");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

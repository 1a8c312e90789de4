//! Redline CLI entry point.

use clap::Parser;

use redline::cli::{self, Cli, Commands};
use redline::infrastructure::config::ConfigLoader;
use redline::infrastructure::logging::Logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(err) => {
            cli::handle_error(&err, cli.json);
            return;
        }
    };
    let _logger = match Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => {
            cli::handle_error(&err, cli.json);
            return;
        }
    };

    let result = match cli.command {
        Commands::Show { file } => cli::commands::show::execute(&file, cli.json),
        Commands::Session { file, phase } => {
            cli::commands::session::execute(&file, phase, &config).await
        }
    };

    if let Err(err) = result {
        cli::handle_error(&err, cli.json);
    }
}

mod cli;
mod commands;
mod config;

use std::process;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    config::AppConfig,
};

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "kick_api=info,kick_cli=info";

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet, args.json_logs);

    if let Err(e) = run(args).await {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config_path = args.config.unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::read(&config_path).await?;
    config.kick = config.kick.with_env_overrides();
    if let Some(client_id) = args.client_id {
        config.kick.client_id = client_id;
    }
    if let Some(client_secret) = args.client_secret {
        config.kick.client_secret = client_secret;
    }

    let executor = CommandExecutor::new(config, config_path);
    match args.command {
        Commands::Authorize {
            port,
            path,
            scopes,
            no_save,
        } => executor.authorize(port, path, scopes, !no_save).await,
        Commands::Serve { bind, port, path } => executor.serve(bind, port, path).await,
        Commands::Subscribe {
            events,
            broadcaster_user_id,
        } => executor.subscribe(events, broadcaster_user_id).await,
        Commands::Chat {
            message,
            broadcaster_user_id,
            reply_to,
        } => executor.chat(message, broadcaster_user_id, reply_to).await,
        Commands::Whoami => executor.whoami().await,
    }
}

fn init_logging(verbose: bool, quiet: bool, json: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("kick_api=debug,kick_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry
            .with(fmt::layer().with_target(verbose).with_writer(std::io::stderr))
            .init();
    }
}

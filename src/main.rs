// src/main.rs — walkly entry point

use clap::Parser;
use std::time::Duration;

use walkly::cli::replay::ReplayArgs;
use walkly::cli::{history, migrate, replay, route, Cli, Commands};
use walkly::infra::config::Config;
use walkly::infra::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Respects WALKLY_LOG / RUST_LOG before --log-level
    logger::init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Route { args, json } => route::run_route(args, json, &config).await,
        Commands::Alternatives { args, count } => {
            route::run_alternatives(args, count, &config).await
        }
        Commands::Replay {
            track,
            title,
            duration,
            interval_ms,
            moment,
            user,
        } => {
            let args = ReplayArgs {
                title,
                duration_minutes: duration,
                interval: Duration::from_millis(interval_ms),
                moment,
                user,
            };
            replay::run_replay(&track, args, &config).await
        }
        Commands::History { limit, user } => history::run_history(limit, user, &config).await,
        Commands::Show { id, json } => history::run_show(id, json, &config).await,
        Commands::Delete { id } => history::run_delete(id, &config).await,
        Commands::Migrate { status, rollback } => {
            migrate::run_migrate(status, rollback, &config).await
        }
    }
}

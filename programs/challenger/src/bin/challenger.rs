use challenger::{
    cli::{ChallengerCli, Commands},
    metrics::spawn_metrics_server,
    observability::init_observability,
    query,
};
use challenger_executor::{ChallengerConfig, Executor};
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = ChallengerCli::parse();
    match cli.command {
        Commands::Start(args) => {
            let config = ChallengerConfig::from_file(&args.config)?;
            let _guard = init_observability(&config.log)?;
            info!("Logging initialized with level: {}", config.log.level());

            let executor = Executor::from_config(&config)?;
            let metrics_server = spawn_metrics_server(&config.metrics)?;

            let (shutdown, shutdown_rx) = watch::channel(false);
            let tasks = executor.spawn_background_tasks(&shutdown_rx);
            info!(address = executor.address(), "challenger started");

            tokio::signal::ctrl_c().await?;
            info!("shutdown requested");
            shutdown.send_replace(true);
            for task in tasks {
                task.await?;
            }
            if let Some(server) = metrics_server {
                server.abort();
            }
            info!("challenger stopped");
        }
        Commands::Query(args) => {
            // stdout carries the query result only
            let config = ChallengerConfig::from_file(&args.config)?;
            let executor = Executor::from_config(&config)?;
            println!("{}", query::run(&executor, &args.target).await?);
        }
    }
    Ok(())
}

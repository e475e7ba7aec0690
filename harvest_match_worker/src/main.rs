use clap::Parser;
use dotenvy::dotenv;
use harvest_match_engine::{db_types::BatchId, events::EventHandlers, MatchingApi, SqliteDatabase};
use harvest_match_worker::{
    cli::{display_config, Arguments},
    config::WorkerConfig,
    errors::WorkerError,
    notifications::notification_hooks,
    worker::{match_batches, match_unmatched_batches, start_matching_worker},
};
use log::*;
use tokio::{sync::watch, task::JoinHandle};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let args = Arguments::parse();
    let config = WorkerConfig::from_env_or_default();
    if args.show_config {
        display_config(&config);
        return;
    }
    match run(args, config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        },
    }
}

async fn run(args: Arguments, config: WorkerConfig) -> Result<(), WorkerError> {
    info!("🚀️ Connecting to {}", config.database_url);
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| WorkerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.migrate().await.map_err(|e| WorkerError::InitializeError(e.to_string()))?;
    }
    let handlers = EventHandlers::new(config.event_buffer_size, notification_hooks());
    let producers = handlers.producers();
    let notifier = tokio::spawn(handlers.run_handlers());
    let api = MatchingApi::new(db, producers);

    if !args.is_one_shot() {
        let (stop, shutdown) = watch::channel(false);
        let worker = start_matching_worker(api, config.poll_interval, config.match_timeout, shutdown);
        tokio::signal::ctrl_c().await.map_err(|e| WorkerError::InitializeError(e.to_string()))?;
        info!("🚀️ Shutting down. Waiting for the current pass to finish");
        // An error here means the worker has already stopped
        let _ = stop.send(true);
        if let Err(e) = worker.await {
            warn!("🚀️ The matching worker did not shut down cleanly. {e}");
        }
        wait_for_notifier(notifier).await;
        return Ok(());
    }

    let summary = if args.batches.is_empty() {
        match_unmatched_batches(&api, config.match_timeout).await?
    } else {
        let ids = args.batches.iter().copied().map(BatchId::from).collect::<Vec<_>>();
        match_batches(&api, &ids, config.match_timeout).await
    };
    info!(
        "🚀️ {} of {} batches matched. {} requests reserved.",
        summary.batches_matched,
        summary.batches_attempted(),
        summary.requests_reserved
    );
    // Dropping the API closes the event channels, so the notifier drains what is queued and stops
    drop(api);
    wait_for_notifier(notifier).await;
    let failed = summary.failures + summary.retriable_failures;
    if failed > 0 {
        return Err(WorkerError::IncompleteRun(failed));
    }
    Ok(())
}

async fn wait_for_notifier(notifier: JoinHandle<()>) {
    if let Err(e) = notifier.await {
        warn!("🚀️ The notifier did not shut down cleanly. {e}");
    }
}

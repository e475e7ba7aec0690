use std::{env, env::VarError};

use clap::Parser;

use crate::config::WorkerConfig;

/// Matches published harvest supply batches to pending demand requests.
///
/// With no arguments, the worker polls the ledger for batches that have never been matched and runs the matching
/// engine against each of them, indefinitely.
#[derive(Parser, Debug, Default)]
#[command(version, about)]
pub struct Arguments {
    /// Match the batches that are waiting right now, then exit
    #[arg(long)]
    pub once: bool,
    /// Match only this batch, then exit. Can be given more than once.
    #[arg(short, long = "batch", value_name = "BATCH_ID")]
    pub batches: Vec<i64>,
    /// Print the effective configuration and exit
    #[arg(long)]
    pub show_config: bool,
}

impl Arguments {
    /// True if the worker should do a single pass and exit rather than poll.
    pub fn is_one_shot(&self) -> bool {
        self.once || !self.batches.is_empty()
    }
}

pub fn display_config(config: &WorkerConfig) {
    println!("Effective configuration:");
    println!("  {:<25} {}", "database url", config.database_url);
    println!("  {:<25} {}", "max connections", config.max_connections);
    println!("  {:<25} {}s", "poll interval", config.poll_interval.as_secs());
    println!("  {:<25} {}s", "match timeout", config.match_timeout.as_secs());
    println!("  {:<25} {}", "event buffer size", config.event_buffer_size);
    println!("  {:<25} {}", "run migrations", config.run_migrations);
    display_envs();
}

fn display_envs() {
    const DISPLAY_ENVS: [&str; 7] = [
        "RUST_LOG",
        "HMW_DATABASE_URL",
        "HMW_MAX_CONNECTIONS",
        "HMW_POLL_INTERVAL",
        "HMW_MATCH_TIMEOUT",
        "HMW_EVENT_BUFFER_SIZE",
        "HMW_RUN_MIGRATIONS",
    ];

    println!("Current environment values:");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}

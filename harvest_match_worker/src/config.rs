use std::{env, fmt::Display, str::FromStr, time::Duration};

use hm_common::helpers::{parse_boolean_flag, parse_positive};
use log::*;

const DEFAULT_HMW_DATABASE_URL: &str = "sqlite://data/harvest_match.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_MATCH_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// How long the worker waits between scans for unmatched batches.
    pub poll_interval: Duration,
    /// A matching run that has not committed within this time is abandoned and rolled back.
    pub match_timeout: Duration,
    /// Capacity of each event channel. Publishers wait when a channel is full.
    pub event_buffer_size: usize,
    /// If true, pending schema migrations are applied at startup.
    pub run_migrations: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_HMW_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            match_timeout: DEFAULT_MATCH_TIMEOUT,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            run_migrations: true,
        }
    }
}

impl WorkerConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any key-value source. Missing or invalid values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let database_url = lookup("HMW_DATABASE_URL").unwrap_or_else(|| {
            warn!("🪛️ HMW_DATABASE_URL is not set. Using the default, {DEFAULT_HMW_DATABASE_URL}.");
            DEFAULT_HMW_DATABASE_URL.to_string()
        });
        let max_connections = parse_value(&lookup, "HMW_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let poll_interval = parse_seconds(&lookup, "HMW_POLL_INTERVAL", DEFAULT_POLL_INTERVAL);
        let match_timeout = parse_seconds(&lookup, "HMW_MATCH_TIMEOUT", DEFAULT_MATCH_TIMEOUT);
        let event_buffer_size = parse_value(&lookup, "HMW_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE);
        let run_migrations = parse_boolean_flag(lookup("HMW_RUN_MIGRATIONS"), true);
        Self { database_url, max_connections, poll_interval, match_timeout, event_buffer_size, run_migrations }
    }
}

fn parse_value<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display + PartialOrd + Default,
    T::Err: Display,
{
    let Some(s) = lookup(name) else {
        info!("🪛️ {name} is not set. Using the default value of {default}.");
        return default;
    };
    parse_positive(&s).unwrap_or_else(|e| {
        warn!("🪛️ Invalid configuration value for {name}. {e}. Using the default value of {default}.");
        default
    })
}

fn parse_seconds<F>(lookup: &F, name: &str, default: Duration) -> Duration
where F: Fn(&str) -> Option<String> {
    let secs = parse_value(lookup, name, default.as_secs());
    Duration::from_secs(secs)
}

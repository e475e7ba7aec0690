//! # Harvest match worker
//!
//! The worker is the trigger for the harvest match engine. It watches the allocation ledger for supply batches that
//! have been published but never matched, and runs the engine against each one. Every reservation the engine makes is
//! handed to the notification hook once the matching transaction has committed.
//!
//! ## Configuration
//! The worker is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Modes
//! * Polling (the default): scan for unmatched batches every `HMW_POLL_INTERVAL` seconds, forever.
//! * `--once`: scan once, match whatever is waiting, and exit.
//! * `--batch <id>`: match the given batches, whether or not they have been matched before, and exit.
pub mod cli;
pub mod config;
pub mod errors;
pub mod notifications;
pub mod worker;

use harvest_match_engine::MatchingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Could not initialize the worker. {0}")]
    InitializeError(String),
    #[error("{0} batches could not be matched")]
    IncompleteRun(usize),
    #[error("Matching failed. {0}")]
    MatchingError(#[from] MatchingError),
}

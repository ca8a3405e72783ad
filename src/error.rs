use thiserror::Error;

/// Errors produced by the clustering engine and the worker group runtime.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cluster count must be at least 1")]
    InvalidClusterCount,

    #[error("cluster spread must be finite and non-negative")]
    InvalidSpread,

    #[error("worker group needs at least one worker")]
    EmptyGroup,

    #[error("a peer worker disconnected during a collective operation")]
    PeerDisconnected,

    #[error("collective protocol violation in {0}")]
    CollectiveMismatch(&'static str),

    #[error("worker {rank} panicked")]
    WorkerPanicked { rank: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

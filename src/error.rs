use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("replay buffer holds {available} transitions, {requested} requested")]
    InsufficientData { requested: usize, available: usize },

    #[error("action must be 0 (left), 1 (no-op) or 2 (right), got {0}")]
    InvalidAction(usize),

    #[error("observation has {actual} values, the agent expects {expected}")]
    ObservationSize { expected: usize, actual: usize },

    #[error("episode is over, call reset() before stepping again")]
    EpisodeFinished,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("training interrupted after {episodes_completed} completed episodes")]
    Interrupted { episodes_completed: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("model serialization failed: {0}")]
    Serialization(#[from] bincode::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

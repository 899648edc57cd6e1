pub mod error;
pub mod config;
pub mod logging;

pub use error::{Error, Result};
pub use config::{GameMode, GameConfig, AgentConfig, TrainConfig};

pub mod sequential;

pub use sequential::tensor::Tensor;
pub use sequential::layer::{
    Layer,
    Dense,
    ReLU,
};
pub use sequential::loss::{
    Loss,
    MeanSquaredError
};
pub use sequential::optimizer::{
    Optimizer,
    SGD,
    Adam,
};
pub use sequential::Sequential;

pub mod game;

pub use game::{Game, Action, Display, Frame};

pub mod agent;

pub use agent::Agent;
pub use agent::approximator::Approximator;
pub use agent::replaybuffer::{ReplayBuffer, Transition};

pub mod trainer;
pub mod report;
pub mod render;

pub use trainer::{Trainer, TrainerState, EpisodeRecord};

use clap::ValueEnum;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::game::reward::RewardScheme;

/// Which reward convention the game runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum GameMode {
    /// Catch every falling obstacle; letting one through ends the episode.
    Seek,
    /// Dodge every falling obstacle; touching one ends the episode.
    Avoid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// distance between the player's centre and the bottom edge
    pub bottom_offset: f32,
    pub radius: f32,
    pub speed: f32,
    /// horizontal margin the player's centre cannot cross
    pub padding: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            bottom_offset: 40.0,
            radius: 15.0,
            speed: 15.0,
            padding: 9.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleConfig {
    pub radius: f32,
    pub speed: f32,
    /// first obstacle spawns somewhere in [-first_spawn_depth, 0]
    pub first_spawn_depth: f32,
    /// random vertical jitter added above the spacing for later spawns
    pub spawn_jitter: f32,
    pub seek_spacing: f32,
    pub avoid_spacing: f32,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            radius: 25.0,
            speed: 14.0,
            first_spawn_depth: 100.0,
            spawn_jitter: 100.0,
            seek_spacing: 250.0,
            avoid_spacing: 150.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub mode: GameMode,
    pub render: bool,
    pub width: f32,
    pub height: f32,
    pub num_obstacles: usize,
    pub player: PlayerConfig,
    pub obstacle: ObstacleConfig,
    pub rewards: RewardScheme,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::Seek,
            render: false,
            width: 300.0,
            height: 300.0,
            num_obstacles: 2,
            player: PlayerConfig::default(),
            obstacle: ObstacleConfig::default(),
            rewards: RewardScheme::default(),
        }
    }
}

impl GameConfig {
    pub fn new(mode: GameMode, render: bool) -> Self {
        Self {
            mode,
            render,
            ..Default::default()
        }
    }

    /// Vertical gap between consecutive spawns; seek mode leaves more room to reach the next target.
    pub fn spawn_spacing(&self) -> f32 {
        match self.mode {
            GameMode::Seek => self.obstacle.seek_spacing,
            GameMode::Avoid => self.obstacle.avoid_spacing,
        }
    }

    /// Length of the observation vector the game produces.
    pub fn observation_size(&self) -> usize {
        2 * self.num_obstacles
    }

    pub fn validate(&self) -> Result<()> {
        let (player, obstacle, rewards) = (&self.player, &self.obstacle, &self.rewards);
        let values = [
            ("width", self.width), ("height", self.height),
            ("player.bottom_offset", player.bottom_offset), ("player.radius", player.radius),
            ("player.speed", player.speed), ("player.padding", player.padding),
            ("obstacle.radius", obstacle.radius), ("obstacle.speed", obstacle.speed),
            ("obstacle.first_spawn_depth", obstacle.first_spawn_depth), ("obstacle.spawn_jitter", obstacle.spawn_jitter),
            ("obstacle.seek_spacing", obstacle.seek_spacing), ("obstacle.avoid_spacing", obstacle.avoid_spacing),
            ("rewards.move_cost", rewards.move_cost), ("rewards.collect_reward", rewards.collect_reward),
            ("rewards.failure_penalty", rewards.failure_penalty),
        ];
        if let Some((name, value)) = values.iter().find(|(_, value)| !value.is_finite()) {
            return Err(Error::InvalidConfig(format!("{} must be finite, got {}", name, value)));
        }

        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(Error::InvalidConfig(format!("field must have a positive size, got {}x{}", self.width, self.height)));
        }
        if self.num_obstacles == 0 {
            return Err(Error::InvalidConfig("at least one obstacle is required".to_owned()));
        }
        if self.player.padding < 0.0 || 2.0 * self.player.padding > self.width {
            return Err(Error::InvalidConfig(format!("player padding {} does not fit a field of width {}", self.player.padding, self.width)));
        }
        if self.player.speed <= 0.0 || self.obstacle.speed <= 0.0 {
            return Err(Error::InvalidConfig("player and obstacle speeds must be positive".to_owned()));
        }
        if self.player.radius < 0.0 || self.obstacle.radius < 0.0 {
            return Err(Error::InvalidConfig("radii must not be negative".to_owned()));
        }
        if self.obstacle.first_spawn_depth < 0.0 || self.obstacle.spawn_jitter < 0.0 {
            return Err(Error::InvalidConfig("spawn ranges must not be negative".to_owned()));
        }
        if self.obstacle.seek_spacing < 0.0 || self.obstacle.avoid_spacing < 0.0 {
            return Err(Error::InvalidConfig("spawn spacings must not be negative".to_owned()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub gamma: f32,
    pub batch_size: usize,
    pub buffer_capacity: usize,
    pub epsilon_start: f32,
    pub epsilon_min: f32,
    pub epsilon_decay: f32,
    pub learning_rate: f32,
    pub hidden_layers: Vec<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            gamma: 0.95,
            batch_size: 64,
            buffer_capacity: 100_000,
            epsilon_start: 1.0,
            epsilon_min: 0.01,
            epsilon_decay: 0.995,
            learning_rate: 0.0025,
            hidden_layers: vec![64, 64],
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.gamma > 0.0 && self.gamma < 1.0) {
            return Err(Error::InvalidConfig(format!("gamma must lie in (0, 1), got {}", self.gamma)));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be positive".to_owned()));
        }
        if self.buffer_capacity < self.batch_size {
            return Err(Error::InvalidConfig(format!(
                "buffer capacity {} is smaller than batch size {}", self.buffer_capacity, self.batch_size
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon_min) || !(0.0..=1.0).contains(&self.epsilon_start) || self.epsilon_min > self.epsilon_start {
            return Err(Error::InvalidConfig(format!(
                "need 0 <= epsilon_min <= epsilon_start <= 1, got {} and {}", self.epsilon_min, self.epsilon_start
            )));
        }
        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return Err(Error::InvalidConfig(format!("epsilon decay must lie in (0, 1], got {}", self.epsilon_decay)));
        }
        if self.learning_rate <= 0.0 {
            return Err(Error::InvalidConfig("learning rate must be positive".to_owned()));
        }
        if self.hidden_layers.contains(&0) {
            return Err(Error::InvalidConfig("hidden layers must have at least one unit".to_owned()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub episodes: usize,
    /// hard cap on steps per episode
    pub max_steps: usize,
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            episodes: 500,
            max_steps: 10_000,
            seed: None,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.episodes == 0 {
            return Err(Error::InvalidConfig("episode count must be positive".to_owned()));
        }
        if self.max_steps == 0 {
            return Err(Error::InvalidConfig("step cap must be positive".to_owned()));
        }
        Ok(())
    }

    /// Generators for the game and the agent. A fixed seed makes a whole run
    /// reproducible; without one both come from OS entropy.
    pub fn rngs(&self) -> (StdRng, StdRng) {
        match self.seed {
            Some(seed) => (StdRng::seed_from_u64(seed), StdRng::seed_from_u64(seed.wrapping_add(1))),
            None => (StdRng::from_os_rng(), StdRng::from_os_rng()),
        }
    }
}

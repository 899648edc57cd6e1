use serde::{Serialize, Deserialize};

use crate::config::GameMode;

/// Reward magnitudes shared by both modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardScheme {
    /// paid for every left/right move
    pub move_cost: f32,
    /// paid for a caught (seek) or dodged (avoid) obstacle
    pub collect_reward: f32,
    /// charged when the episode is lost
    pub failure_penalty: f32,
}

impl Default for RewardScheme {
    fn default() -> Self {
        Self {
            move_cost: 1.0,
            collect_reward: 200.0,
            failure_penalty: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// obstacle overlaps the player
    Collision,
    /// obstacle fell past the bottom edge
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub reward: f32,
    pub score: i32,
    pub terminal: bool,
}

impl Outcome {
    pub const NONE: Outcome = Outcome { reward: 0.0, score: 0, terminal: false };

    fn success(reward: f32) -> Self {
        Self { reward, score: 1, terminal: false }
    }

    fn failure(penalty: f32) -> Self {
        Self { reward: -penalty, score: 0, terminal: true }
    }
}

/// Resolved once per game from its mode; maps an obstacle event to its outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum RewardPolicy {
    Seek { catch: Outcome, miss: Outcome },
    Avoid { crash: Outcome, dodge: Outcome },
}

impl RewardPolicy {
    pub fn new(mode: GameMode, scheme: &RewardScheme) -> Self {
        match mode {
            GameMode::Seek => RewardPolicy::Seek {
                catch: Outcome::success(scheme.collect_reward),
                miss: Outcome::failure(scheme.failure_penalty),
            },
            GameMode::Avoid => RewardPolicy::Avoid {
                crash: Outcome::failure(scheme.failure_penalty),
                dodge: Outcome::success(scheme.collect_reward),
            },
        }
    }

    /// An obstacle that was already resolved yields nothing.
    pub fn resolve(&self, event: Event, already_hit: bool) -> Outcome {
        if already_hit {
            return Outcome::NONE;
        }
        match (self, event) {
            (RewardPolicy::Seek { catch, .. }, Event::Collision) => *catch,
            (RewardPolicy::Seek { miss, .. }, Event::Exit) => *miss,
            (RewardPolicy::Avoid { crash, .. }, Event::Collision) => *crash,
            (RewardPolicy::Avoid { dodge, .. }, Event::Exit) => *dodge,
        }
    }
}

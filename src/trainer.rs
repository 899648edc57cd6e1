use crate::agent::Agent;
use crate::agent::approximator::Approximator;
use crate::agent::replaybuffer::Transition;
use crate::config::TrainConfig;
use crate::error::{Error, Result};
use crate::game::Game;
use crate::sequential::Sequential;

use log::{info, warn};
use serde::{Serialize, Deserialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Idle,
    Running { episode: usize },
    Complete,
    Interrupted,
}

/// Summary of one finished episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode: usize,
    pub net_reward: f32,
    pub score: i32,
    pub steps: usize,
}

struct EpisodeProgress {
    observation: Vec<f32>,
    net_reward: f32,
    steps: usize,
}

/// Drives episodes of reset, then act / step / remember / learn until the
/// game ends or the step cap is hit.
pub struct Trainer<Q: Approximator = Sequential> {
    game: Game,
    agent: Agent<Q>,
    config: TrainConfig,

    state: TrainerState,
    progress: Option<EpisodeProgress>,
    records: Vec<EpisodeRecord>,
    interrupt: Arc<AtomicBool>,
}

impl<Q: Approximator> Trainer<Q> {
    pub fn new(game: Game, agent: Agent<Q>, config: TrainConfig) -> Result<Self> {
        config.validate()?;
        if agent.action_size() != game.action_size() {
            return Err(Error::InvalidConfig(format!(
                "agent chooses among {} actions, game accepts {}", agent.action_size(), game.action_size()
            )));
        }
        if agent.state_size() != game.observation_size() {
            return Err(Error::ObservationSize { expected: agent.state_size(), actual: game.observation_size() });
        }

        Ok(Self {
            game,
            agent,
            records: Vec::with_capacity(config.episodes),
            config,
            state: TrainerState::Idle,
            progress: None,
            interrupt: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn state(&self) -> TrainerState {self.state}
    pub fn records(&self) -> &[EpisodeRecord] {&self.records}
    pub fn game(&self) -> &Game {&self.game}
    pub fn agent(&self) -> &Agent<Q> {&self.agent}
    pub fn config(&self) -> &TrainConfig {&self.config}

    pub fn scores(&self) -> Vec<i32> {
        self.records.iter().map(|record| record.score).collect()
    }

    /// Flag that stops training at the next step boundary once set.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn into_parts(self) -> (Game, Agent<Q>, Vec<EpisodeRecord>) {
        (self.game, self.agent, self.records)
    }

    /// Runs every remaining episode.
    pub fn run(&mut self) -> Result<&[EpisodeRecord]> {
        if self.state == TrainerState::Idle {
            info!("starting training for {} episodes", self.config.episodes);
        }
        while self.tick()? != TrainerState::Complete {}
        Ok(&self.records)
    }

    /// Advances training by exactly one environment step, opening and
    /// closing episodes as needed.
    pub fn tick(&mut self) -> Result<TrainerState> {
        let episode = match self.state {
            TrainerState::Complete => return Ok(TrainerState::Complete),
            TrainerState::Interrupted => return Err(self.interrupted_error()),
            TrainerState::Idle => 0,
            TrainerState::Running { episode } => episode,
        };

        if self.interrupt.load(Ordering::SeqCst) {
            // an unfinished episode is dropped, finished ones stay recorded
            self.progress = None;
            self.state = TrainerState::Interrupted;
            warn!("training interrupted during episode {}/{}", episode + 1, self.config.episodes);
            return Err(self.interrupted_error());
        }

        let mut progress = match self.progress.take() {
            Some(progress) => progress,
            None => EpisodeProgress {
                observation: self.game.reset(),
                net_reward: 0.0,
                steps: 0,
            },
        };
        self.state = TrainerState::Running { episode };

        let action = self.agent.act(&progress.observation)?;
        let (reward, next_observation, done) = self.game.step(action)?;
        progress.net_reward += reward;
        progress.steps += 1;

        let state = std::mem::replace(&mut progress.observation, next_observation.clone());
        self.agent.remember(Transition {
            state,
            action,
            reward,
            next_state: next_observation,
            done,
        })?;
        self.agent.learn()?;

        if done || progress.steps >= self.config.max_steps {
            self.finish_episode(episode, progress);
        } else {
            self.progress = Some(progress);
        }

        Ok(self.state)
    }

    fn finish_episode(&mut self, episode: usize, progress: EpisodeProgress) {
        let record = EpisodeRecord {
            episode,
            net_reward: progress.net_reward,
            score: self.game.score(),
            steps: progress.steps,
        };
        info!(
            "episode: {}/{}, net rewards: {}, game score: {}, steps: {}, epsilon: {:.4}",
            episode + 1, self.config.episodes, record.net_reward, record.score, record.steps, self.agent.epsilon()
        );
        self.records.push(record);

        self.state = if episode + 1 >= self.config.episodes {
            info!("training complete");
            TrainerState::Complete
        } else {
            TrainerState::Running { episode: episode + 1 }
        };
    }

    fn interrupted_error(&self) -> Error {
        Error::Interrupted { episodes_completed: self.records.len() }
    }
}

pub mod approximator;
pub mod replaybuffer;

use approximator::Approximator;
use replaybuffer::{Batch, ReplayBuffer, Transition};
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::sequential::{
    tensor::Tensor,
    loss::MeanSquaredError,
    optimizer::Adam,
    Sequential
};

use log::debug;
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Epsilon-greedy deep Q-learning agent.
pub struct Agent<Q: Approximator = Sequential> {
    q_network: Q,
    replay_buffer: ReplayBuffer,
    config: AgentConfig,
    epsilon: f32,
    state_size: usize,
    action_size: usize,
    rng: StdRng,
}

impl Agent<Sequential> {
    pub fn new(state_size: usize, action_size: usize, config: AgentConfig, mut rng: StdRng) -> Result<Self> {
        config.validate()?;
        let q_network = Sequential::mlp(
            state_size,
            &config.hidden_layers,
            action_size,
            Box::new(MeanSquaredError),
            Box::new(Adam::new(config.learning_rate)),
            &mut rng,
        );
        Self::with_approximator(q_network, state_size, action_size, config, rng)
    }

    pub fn store<P: AsRef<Path>>(&self, filepath: P) -> Result<()> {
        let file = File::create(filepath)?;
        let checkpoint = CheckpointRef {
            config: &self.config,
            epsilon: self.epsilon,
            action_size: self.action_size,
            q_network: &self.q_network,
        };
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &checkpoint)?;
        writer.flush()?;
        Ok(())
    }

    // the replay buffer is not part of a checkpoint and starts out empty
    pub fn load<P: AsRef<Path>>(filepath: P, rng: StdRng) -> Result<Self> {
        let file = File::open(filepath)?;
        let checkpoint: Checkpoint = bincode::deserialize_from(BufReader::new(file))?;

        if checkpoint.q_network.output_size() != Some(checkpoint.action_size) {
            return Err(Error::InvalidConfig(format!(
                "stored network does not produce {} action values", checkpoint.action_size
            )));
        }
        let state_size = checkpoint.q_network.input_size()
            .ok_or_else(|| Error::InvalidConfig("stored network has no dense layers".to_owned()))?;

        let mut agent = Self::with_approximator(checkpoint.q_network, state_size, checkpoint.action_size, checkpoint.config, rng)?;
        agent.epsilon = checkpoint.epsilon.clamp(agent.config.epsilon_min, agent.config.epsilon_start);
        Ok(agent)
    }
}

impl<Q: Approximator> Agent<Q> {
    pub fn with_approximator(q_network: Q, state_size: usize, action_size: usize, config: AgentConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;
        if state_size == 0 || action_size == 0 {
            return Err(Error::InvalidConfig("observation and action spaces must not be empty".to_owned()));
        }

        Ok(Self {
            q_network,
            replay_buffer: ReplayBuffer::new(config.buffer_capacity),
            epsilon: config.epsilon_start,
            state_size,
            action_size,
            config,
            rng,
        })
    }

    pub fn epsilon(&self) -> f32 {self.epsilon}
    pub fn state_size(&self) -> usize {self.state_size}
    pub fn action_size(&self) -> usize {self.action_size}
    pub fn config(&self) -> &AgentConfig {&self.config}
    pub fn replay_buffer(&self) -> &ReplayBuffer {&self.replay_buffer}
    pub fn approximator(&self) -> &Q {&self.q_network}

    /// Random action with probability epsilon, greedy otherwise.
    pub fn act(&mut self, observation: &[f32]) -> Result<usize> {
        self.check_observation(observation)?;
        if self.rng.random::<f32>() < self.epsilon {
            Ok(self.rng.random_range(0..self.action_size))
        } else {
            self.greedy_action(observation)
        }
    }

    pub fn greedy_action(&mut self, observation: &[f32]) -> Result<usize> {
        self.check_observation(observation)?;
        let state = Tensor::from_vec(observation.to_vec(), vec![1, observation.len()]);
        let q_values = self.q_network.predict(&state);
        Ok(argmax(&q_values.read()))
    }

    /// Stores a transition; malformed ones are rejected before they reach the buffer.
    pub fn remember(&mut self, transition: Transition) -> Result<()> {
        if transition.action >= self.action_size {
            return Err(Error::InvalidAction(transition.action));
        }
        self.check_observation(&transition.state)?;
        self.check_observation(&transition.next_state)?;
        self.replay_buffer.append(transition);
        Ok(())
    }

    fn check_observation(&self, observation: &[f32]) -> Result<()> {
        if observation.len() != self.state_size {
            return Err(Error::ObservationSize { expected: self.state_size, actual: observation.len() });
        }
        Ok(())
    }

    /// One Q-learning update on a sampled minibatch. Returns the loss, or
    /// `None` while the buffer holds fewer transitions than a minibatch.
    pub fn learn(&mut self) -> Result<Option<f32>> {
        let batch = match self.replay_buffer.sample_batch(self.config.batch_size, &mut self.rng) {
            Ok(batch) => batch,
            Err(err) => {
                debug!("learning deferred: {}", err);
                return Ok(None);
            }
        };

        let targets = self.compute_targets(&batch)?;
        let loss = self.q_network.fit(&batch.states, &targets);

        if self.epsilon > self.config.epsilon_min {
            self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
        }

        debug!("learned on {} transitions, loss {:.4}, epsilon {:.4}", batch.len(), loss, self.epsilon);
        Ok(Some(loss))
    }

    /// The network's own predictions for `states`, with the taken action's
    /// column of every row replaced by its one-step bootstrapped target.
    pub fn compute_targets(&mut self, batch: &Batch) -> Result<Tensor> {
        if let Some(&action) = batch.actions.iter().find(|&&action| action >= self.action_size) {
            return Err(Error::InvalidAction(action));
        }
        for observations in [&batch.states, &batch.next_states] {
            if observations.rows() != batch.len() || observations.cols() != self.state_size {
                return Err(Error::ObservationSize { expected: self.state_size, actual: observations.cols() });
            }
        }

        let max_next_q = self.q_network.predict(&batch.next_states).max_per_row();
        let predictions = self.q_network.predict(&batch.states);
        assert_eq!(predictions.shape, vec![batch.len(), self.action_size], "approximator returned unexpected shape");

        let targets = predictions.deep_clone();
        {
            let mut targets_data = targets.write();
            for i in 0..batch.len() {
                let target = if batch.dones[i] {
                    batch.rewards[i]
                } else {
                    batch.rewards[i] + self.config.gamma * max_next_q[i]
                };
                targets_data[i * self.action_size + batch.actions[i]] = target;
            }
        }
        Ok(targets)
    }
}

// first index wins ties
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = i;
        }
    }
    best
}

#[derive(Serialize)]
struct CheckpointRef<'a> {
    config: &'a AgentConfig,
    epsilon: f32,
    action_size: usize,
    q_network: &'a Sequential,
}

#[derive(Deserialize)]
struct Checkpoint {
    config: AgentConfig,
    epsilon: f32,
    action_size: usize,
    q_network: Sequential,
}

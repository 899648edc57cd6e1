pub mod entity;
pub mod reward;

use log::debug;
use rand::Rng;
use rand::rngs::StdRng;

use crate::config::GameConfig;
use crate::error::{Error, Result};
use entity::{Obstacle, Player};
use reward::{Event, Outcome, RewardPolicy};

pub const ACTION_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Left = 0,
    Noop = 1,
    Right = 2,
}

impl Action {
    pub const ALL: [Action; ACTION_SIZE] = [Action::Left, Action::Noop, Action::Right];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for Action {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self> {
        Action::ALL.get(value).copied().ok_or(Error::InvalidAction(value))
    }
}

/// Read-only view of one simulation frame handed to a display.
pub struct Frame<'a> {
    pub width: f32,
    pub height: f32,
    pub player: &'a Player,
    pub obstacles: &'a [Obstacle],
    pub score: i32,
}

/// Something that can draw frames. Drawing never feeds back into the simulation.
pub trait Display {
    fn draw(&mut self, frame: &Frame<'_>);
}

pub struct Game {
    config: GameConfig,
    policy: RewardPolicy,
    rng: StdRng,

    player: Player,
    obstacles: Vec<Obstacle>,
    score: i32,
    over: bool,

    display: Option<Box<dyn Display>>,
}

impl Game {
    pub fn new(config: GameConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;

        let mut instance = Self {
            policy: RewardPolicy::new(config.mode, &config.rewards),
            player: Player::new(&config),
            obstacles: Vec::with_capacity(config.num_obstacles),
            score: 0,
            over: false,
            display: None,
            rng,
            config,
        };
        instance.reset();

        Ok(instance)
    }

    pub fn player(&self) -> &Player {&self.player}
    pub fn obstacles(&self) -> &[Obstacle] {&self.obstacles}
    pub fn score(&self) -> i32 {self.score}
    pub fn over(&self) -> bool {self.over}
    pub fn config(&self) -> &GameConfig {&self.config}
    pub fn observation_size(&self) -> usize {self.config.observation_size()}
    pub fn action_size(&self) -> usize {ACTION_SIZE}

    pub fn attach_display(&mut self, display: Box<dyn Display>) {
        self.display = Some(display);
    }

    pub fn detach_display(&mut self) -> Option<Box<dyn Display>> {
        self.display.take()
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            width: self.config.width,
            height: self.config.height,
            player: &self.player,
            obstacles: &self.obstacles,
            score: self.score,
        }
    }


    // new episode; returns the first observation
    pub fn reset(&mut self) -> Vec<f32> {
        self.player = Player::new(&self.config);
        self.score = 0;
        self.over = false;

        self.obstacles.clear();
        for _ in 0..self.config.num_obstacles {
            let above = self.obstacles.last().map(|o| o.y);
            let obstacle = self.spawn_obstacle(above);
            self.obstacles.push(obstacle);
        }

        self.render();
        self.get_state()
    }

    // returns (reward, next_state, done)
    pub fn step(&mut self, action: usize) -> Result<(f32, Vec<f32>, bool)> {
        let action = Action::try_from(action)?;
        if self.over {
            return Err(Error::EpisodeFinished);
        }

        // build the next snapshot from the current one, then commit it
        let player = self.player.moved(action);
        let mut reward = match action {
            Action::Noop => 0.0,
            _ => -self.config.rewards.move_cost,
        };
        let mut score = self.score;
        let mut over = false;

        let mut apply = |outcome: Outcome| {
            reward += outcome.reward;
            score += outcome.score;
            over |= outcome.terminal;
        };

        let mut next_obstacles = Vec::with_capacity(self.obstacles.len());
        let mut exited = 0;
        for obstacle in &self.obstacles {
            let mut next = obstacle.clone();
            if !next.hit && next.collides_with(&player) {
                apply(self.policy.resolve(Event::Collision, false));
                next.hit = true;
            }

            let next = next.moved_down();
            if next.y > self.config.height {
                apply(self.policy.resolve(Event::Exit, next.hit));
                exited += 1;
            } else {
                next_obstacles.push(next);
            }
        }

        // keep the active count constant
        for _ in 0..exited {
            let above = next_obstacles.last().map(|o| o.y);
            let replacement = self.spawn_obstacle(above);
            next_obstacles.push(replacement);
        }

        self.player = player;
        self.obstacles = next_obstacles;
        self.score = score;
        self.over = over;

        self.render();
        Ok((reward, self.get_state(), self.over))
    }

    // state: per obstacle [dx / width, dy / height] relative to the player
    pub fn get_state(&self) -> Vec<f32> {
        self.obstacles.iter()
            .flat_map(|obstacle| [
                (self.player.x - obstacle.x) / self.config.width,
                (self.player.y - obstacle.y) / self.config.height,
            ])
            .collect()
    }

    // spawns off-screen; staggered above the obstacle at `above` when there is one
    fn spawn_obstacle(&mut self, above: Option<f32>) -> Obstacle {
        let spawn = &self.config.obstacle;
        let y = match above {
            Some(above_y) => {
                let top = (above_y - self.config.spawn_spacing()).min(0.0);
                self.rng.random_range(top - spawn.spawn_jitter..=top)
            }
            None => self.rng.random_range(-spawn.first_spawn_depth..=0.0),
        };
        let x = self.rng.random_range(0.0..=self.config.width);

        debug!("spawned obstacle at ({:.1}, {:.1})", x, y);
        Obstacle::new(x, y, spawn)
    }

    fn render(&mut self) {
        if !self.config.render {
            return;
        }
        if let Some(display) = self.display.as_mut() {
            let frame = Frame {
                width: self.config.width,
                height: self.config.height,
                player: &self.player,
                obstacles: &self.obstacles,
                score: self.score,
            };
            display.draw(&frame);
        }
    }
}

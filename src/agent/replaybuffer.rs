use crate::error::{Error, Result};
use crate::sequential::tensor::Tensor;

use rand::Rng;
use std::collections::VecDeque;

/// One environment step. Owns copies of both observations so later game
/// mutation cannot reach stored history.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Vec<f32>,
    pub done: bool,
}

/// A sampled minibatch stacked for the network.
pub struct Batch {
    pub states: Tensor,
    pub actions: Vec<usize>,
    pub rewards: Vec<f32>,
    pub next_states: Tensor,
    pub dones: Vec<bool>,
}

impl Batch {
    pub fn from_transitions(transitions: &[&Transition]) -> Self {
        let states: Vec<&[f32]> = transitions.iter().map(|t| t.state.as_slice()).collect();
        let next_states: Vec<&[f32]> = transitions.iter().map(|t| t.next_state.as_slice()).collect();

        Self {
            states: Tensor::from_rows(&states),
            actions: transitions.iter().map(|t| t.action).collect(),
            rewards: transitions.iter().map(|t| t.reward).collect(),
            next_states: Tensor::from_rows(&next_states),
            dones: transitions.iter().map(|t| t.done).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Fixed-capacity FIFO of transitions; the oldest is evicted once full.
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be positive");
        Self {
            buffer: VecDeque::with_capacity(capacity.min(1 << 16)),
            capacity
        }
    }

    pub fn append(&mut self, transition: Transition) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }

    /// `n` distinct transitions drawn uniformly without replacement, in no particular order.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<&Transition>> {
        if self.buffer.len() < n {
            return Err(Error::InsufficientData { requested: n, available: self.buffer.len() });
        }

        let indices = rand::seq::index::sample(rng, self.buffer.len(), n);
        Ok(indices.iter().map(|index| &self.buffer[index]).collect())
    }

    pub fn sample_batch<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Batch> {
        let transitions = self.sample(n, rng)?;
        Ok(Batch::from_transitions(&transitions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn transition(i: usize) -> Transition {
        Transition {
            state: vec![i as f32; 4],
            action: i % 3,
            reward: i as f32 * 10.0,
            next_state: vec![(i + 1) as f32; 4],
            done: i % 5 == 4,
        }
    }

    #[test]
    fn test_capacity_and_fifo_eviction() {
        let mut buffer = ReplayBuffer::new(100);
        for i in 0..100 {
            buffer.append(transition(i));
        }
        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer.iter().next().unwrap().state[0], 0.0);

        buffer.append(transition(100));

        assert_eq!(buffer.len(), 100);
        assert!(buffer.iter().all(|t| t.state[0] != 0.0), "oldest transition must be evicted");
        assert_eq!(buffer.iter().next().unwrap().state[0], 1.0);
        assert_eq!(buffer.iter().last().unwrap(), &transition(100));
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut buffer = ReplayBuffer::new(7);
        for i in 0..50 {
            buffer.append(transition(i));
            assert!(buffer.len() <= buffer.capacity());
        }
        assert_eq!(buffer.len(), 7);
    }

    #[test]
    fn test_sample_insufficient_data() {
        let mut buffer = ReplayBuffer::new(10);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(buffer.sample(1, &mut rng), Err(Error::InsufficientData { requested: 1, available: 0 })));

        for i in 0..4 {
            buffer.append(transition(i));
        }
        assert!(matches!(buffer.sample(5, &mut rng), Err(Error::InsufficientData { requested: 5, available: 4 })));
        assert!(buffer.sample_batch(5, &mut rng).is_err());
    }

    #[test]
    fn test_sample_returns_distinct_transitions() {
        let mut buffer = ReplayBuffer::new(100);
        for i in 0..30 {
            buffer.append(transition(i));
        }
        let mut rng = StdRng::seed_from_u64(9);

        for n in [1, 5, 29, 30] {
            let sample = buffer.sample(n, &mut rng).unwrap();
            assert_eq!(sample.len(), n);
            let distinct: HashSet<usize> = sample.iter().map(|t| t.state[0] as usize).collect();
            assert_eq!(distinct.len(), n);
        }
    }

    #[test]
    fn test_sample_batch_shapes() {
        let mut buffer = ReplayBuffer::new(100);
        for i in 0..10 {
            buffer.append(transition(i));
        }

        let batch = buffer.sample_batch(5, &mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(batch.len(), 5);
        assert_eq!(batch.states.shape, vec![5, 4]);
        assert_eq!(batch.next_states.shape, vec![5, 4]);
        for row in 0..5 {
            let i = batch.states.row(row)[0] as usize;
            assert_eq!(batch.actions[row], i % 3);
            assert_eq!(batch.rewards[row], i as f32 * 10.0);
            assert_eq!(batch.next_states.row(row)[0], (i + 1) as f32);
            assert_eq!(batch.dones[row], i % 5 == 4);
        }
    }
}

use crate::sequential::Sequential;
use crate::sequential::tensor::Tensor;

/// Action-value function the agent learns through.
///
/// `predict` maps a `[n, observation]` batch to `[n, actions]` values.
/// `fit` performs one synchronous training update towards `targets` and
/// returns the loss measured before that update.
pub trait Approximator {
    fn predict(&mut self, batch: &Tensor) -> Tensor;
    fn fit(&mut self, batch: &Tensor, targets: &Tensor) -> f32;
}

impl Approximator for Sequential {
    fn predict(&mut self, batch: &Tensor) -> Tensor {
        Sequential::predict(self, batch)
    }

    fn fit(&mut self, batch: &Tensor, targets: &Tensor) -> f32 {
        self.train_on_batch(batch, targets)
    }
}

pub mod tensor;
pub mod layer;
pub mod loss;
pub mod optimizer;

use tensor::Tensor;
use layer::{Layer, Dense, ReLU};
use loss::Loss;
use optimizer::Optimizer;

use rand::Rng;
use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize)]
pub struct Sequential {
    pub layers: Vec<Box<dyn Layer>>,
    pub loss: Box<dyn Loss>,
    pub optimizer: Box<dyn Optimizer>
}

impl Sequential {
    pub fn new(layers: Vec<Box<dyn Layer>>, loss: Box<dyn Loss>, optimizer: Box<dyn Optimizer>) -> Self {
        Self {
            layers,
            loss,
            optimizer
        }
    }

    /// Dense layers of the given widths with a ReLU after every hidden one and a linear output.
    pub fn mlp<R: Rng + ?Sized>(
        input_size: usize,
        hidden: &[usize],
        output_size: usize,
        loss: Box<dyn Loss>,
        optimizer: Box<dyn Optimizer>,
        rng: &mut R,
    ) -> Self {
        let mut layers: Vec<Box<dyn Layer>> = Vec::with_capacity(2 * hidden.len() + 1);
        let mut width = input_size;
        for &units in hidden {
            layers.push(Box::new(Dense::new(width, units, rng)));
            layers.push(Box::new(ReLU::new()));
            width = units;
        }
        layers.push(Box::new(Dense::new(width, output_size, rng)));

        Self::new(layers, loss, optimizer)
    }

    pub fn input_size(&self) -> Option<usize> {
        self.dense_layers().next().map(Dense::input_size)
    }

    pub fn output_size(&self) -> Option<usize> {
        self.dense_layers().last().map(Dense::output_size)
    }

    fn dense_layers(&self) -> impl Iterator<Item = &Dense> {
        self.layers.iter().filter_map(|layer| layer.as_any().downcast_ref::<Dense>())
    }

    pub fn predict(&mut self, input: &Tensor) -> Tensor {
        let mut output = input.clone();
        for layer in &mut self.layers {
            output = layer.forward(&output);
        }
        output
    }

    // one gradient step on a single batch; returns the loss before the update
    pub fn train_on_batch(&mut self, x_batch: &Tensor, y_batch: &Tensor) -> f32 {
        let y_pred = self.predict(x_batch);
        let loss = self.loss.calculate(&y_pred, y_batch);
        let mut d_output = self.loss.gradient(&y_pred, y_batch);
        for layer in self.layers.iter_mut().rev() {
            d_output = layer.backward(&d_output);
        }
        self.optimizer.step(&mut self.layers);
        loss
    }
}

impl Clone for Sequential {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.iter().map(|layer| layer.clone_box()).collect(),
            loss: self.loss.clone_box(),
            optimizer: self.optimizer.clone_box()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequential::loss::MeanSquaredError;
    use crate::sequential::optimizer::{Adam, SGD};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;

    fn single_dense_model() -> Sequential {
        let dense_layer = Dense::from_parameters(
            Tensor::from_vec(vec![0.5, -0.5], vec![2, 1]),
            Tensor::from_vec(vec![0.1], vec![1, 1]),
        );
        Sequential::new(vec![Box::new(dense_layer)], Box::new(MeanSquaredError), Box::new(SGD::new(0.1)))
    }

    #[test]
    fn test_mlp_layout() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut model = Sequential::mlp(4, &[64, 64], 3, Box::new(MeanSquaredError), Box::new(Adam::new(0.001)), &mut rng);

        assert_eq!(model.layers.len(), 5);
        assert_eq!(model.input_size(), Some(4));
        assert_eq!(model.output_size(), Some(3));

        let output = model.predict(&Tensor::zeros(vec![7, 4]));
        assert_eq!(output.shape, vec![7, 3]);
    }

    #[test]
    fn test_train_on_batch() {
        let mut model = single_dense_model();
        let initial_weights = model.layers[0].as_any().downcast_ref::<Dense>().unwrap().weights.deep_clone();

        let x_batch = Tensor::from_vec(vec![1.0, 2.0], vec![1, 2]);
        let y_batch = Tensor::from_vec(vec![1.0], vec![1, 1]);

        // prediction 0.5 - 1.0 + 0.1 = -0.4, squared error 1.96
        let loss = model.train_on_batch(&x_batch, &y_batch);
        assert!((loss - 1.96).abs() < 1e-5);

        let final_layer = model.layers[0].as_any().downcast_ref::<Dense>().unwrap();
        assert_ne!(*initial_weights.read(), *final_layer.weights.read(), "weights did not update after a training step");
    }

    #[test]
    fn test_repeated_fitting_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut model = Sequential::mlp(2, &[8], 2, Box::new(MeanSquaredError), Box::new(Adam::new(0.01)), &mut rng);
        let x = Tensor::from_vec(vec![0.1, 0.2, -0.3, 0.4, 0.5, -0.6], vec![3, 2]);
        let y = Tensor::from_vec(vec![1.0, 0.0, 0.0, 1.0, 0.5, 0.5], vec![3, 2]);

        let first = model.train_on_batch(&x, &y);
        let mut last = first;
        for _ in 0..200 {
            last = model.train_on_batch(&x, &y);
        }
        assert!(last < first * 0.5, "loss went from {} to {}", first, last);
    }

    #[test]
    fn test_clone_is_independent() {
        let model = single_dense_model();
        let mut cloned = model.clone();

        let x_batch = Tensor::from_vec(vec![1.0, 2.0], vec![1, 2]);
        cloned.train_on_batch(&x_batch, &Tensor::from_vec(vec![1.0], vec![1, 1]));

        let original = model.layers[0].as_any().downcast_ref::<Dense>().unwrap();
        let trained = cloned.layers[0].as_any().downcast_ref::<Dense>().unwrap();
        assert_eq!(*original.weights.read(), vec![0.5, -0.5]);
        assert!(!Arc::ptr_eq(&original.weights.data, &trained.weights.data));
    }

    #[test]
    fn test_serde_round_trip() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut model = Sequential::mlp(3, &[5], 2, Box::new(MeanSquaredError), Box::new(Adam::new(0.01)), &mut rng);
        let bytes = bincode::serialize(&model).unwrap();
        let mut restored: Sequential = bincode::deserialize(&bytes).unwrap();

        let input = Tensor::from_vec(vec![0.3, -0.2, 0.9], vec![1, 3]);
        assert_eq!(model.predict(&input), restored.predict(&input));
    }
}

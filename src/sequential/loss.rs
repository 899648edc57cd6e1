use super::tensor::Tensor;
use serde::{Serialize, Deserialize};

#[typetag::serde]
pub trait Loss: Send {
    fn calculate(&self, y_pred: &Tensor, y_true: &Tensor) -> f32;
    fn gradient(&self, y_pred: &Tensor, y_true: &Tensor) -> Tensor;
    fn clone_box(&self) -> Box<dyn Loss>;
}


// mean squared error, averaged over the batch

#[derive(Serialize, Deserialize, Clone)]
pub struct MeanSquaredError;

#[typetag::serde]
impl Loss for MeanSquaredError {
    fn calculate(&self, y_pred: &Tensor, y_true: &Tensor) -> f32 {
        let batch_size = y_pred.shape[0];
        if batch_size == 0 {
            return 0.0;
        }
        let squared_errors = y_pred.map2(y_true, |pred, truth| (pred - truth) * (pred - truth));
        squared_errors.read().iter().sum::<f32>() / batch_size as f32
    }

    fn gradient(&self, y_pred: &Tensor, y_true: &Tensor) -> Tensor {
        let batch_size = y_pred.shape[0].max(1) as f32;
        y_pred.map2(y_true, |pred, truth| 2.0 * (pred - truth) / batch_size)
    }

    fn clone_box(&self) -> Box<dyn Loss> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mse_calculation() {
        let y_pred = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let y_true = Tensor::from_vec(vec![1.0, 0.0, 3.0, 1.0], vec![2, 2]);
        // (0 + 4 + 0 + 9) / 2
        assert!((MeanSquaredError.calculate(&y_pred, &y_true) - 6.5).abs() < 1e-6);
    }

    #[test]
    fn test_mse_gradient_only_where_targets_differ() {
        let y_pred = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let y_true = Tensor::from_vec(vec![1.0, 0.0, 3.0, 1.0], vec![2, 2]);
        let gradient = MeanSquaredError.gradient(&y_pred, &y_true);
        assert_eq!(*gradient.read(), vec![0.0, 2.0, 0.0, 3.0]);
    }
}

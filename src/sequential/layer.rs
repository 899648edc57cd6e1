use super::tensor::Tensor;
use std::any::Any;
use rand::Rng;
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

#[typetag::serde]
pub trait Layer: Send {
    fn forward(&mut self, input: &Tensor) -> Tensor;
    fn backward(&mut self, d_output: &Tensor) -> Tensor;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn Layer>;
}


// dense layer

#[derive(Serialize, Deserialize, Clone)]
pub struct Dense {
    pub weights: Tensor,
    pub biases: Tensor,
    #[serde(skip)]
    cached_input: Option<Tensor>, // for back propagation
    #[serde(skip)]
    pub d_weights: Option<Tensor>,
    #[serde(skip)]
    pub d_biases: Option<Tensor>
}

impl Dense {
    // He initialisation, suited to the ReLU layers that follow
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let std_dev = (2.0 / input_size.max(1) as f32).sqrt();
        Self::from_parameters(
            Tensor::random(vec![input_size, output_size], std_dev, rng),
            Tensor::zeros(vec![1, output_size]),
        )
    }

    pub fn from_parameters(weights: Tensor, biases: Tensor) -> Self {
        assert_eq!(weights.shape.len(), 2, "weights must be a 2D tensor");
        assert_eq!(biases.shape, vec![1, weights.shape[1]], "biases must be [1, output_size]");
        Self {
            weights,
            biases,
            cached_input: None,
            d_weights: None,
            d_biases: None
        }
    }

    pub fn input_size(&self) -> usize {self.weights.shape[0]}
    pub fn output_size(&self) -> usize {self.weights.shape[1]}
}

#[typetag::serde]
impl Layer for Dense {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        self.cached_input = Some(input.clone());

        let output = input.matmul(&self.weights);

        // add biases
        {
            let mut output_data = output.write();
            let biases_data = self.biases.read();
            let output_size = output.shape[1];

            output_data.par_chunks_mut(output_size.max(1)).for_each(|row_chunk| {
                for (value, bias) in row_chunk.iter_mut().zip(biases_data.iter()) {
                    *value += bias;
                }
            });
        }

        output
    }

    fn backward(&mut self, d_output: &Tensor) -> Tensor {
        let cached_input = self.cached_input.as_ref().expect("complete forward pass first.");

        // dL/dW = input.T @ dL/dY
        self.d_weights = Some(cached_input.transpose().matmul(d_output));
        // dL/db = dL/dY summed over the batch
        self.d_biases = Some(d_output.sum_rows());
        // dL/dX = dL/dY @ weights.T
        d_output.matmul(&self.weights.transpose())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(Dense::from_parameters(self.weights.deep_clone(), self.biases.deep_clone()))
    }
}


// relu layer

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct ReLU {
    #[serde(skip)]
    cached_input: Option<Tensor>
}

impl ReLU {
    pub fn new() -> Self {
        Self::default()
    }
}

#[typetag::serde]
impl Layer for ReLU {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        self.cached_input = Some(input.clone());
        input.map(|x| x.max(0.0))
    }

    fn backward(&mut self, d_output: &Tensor) -> Tensor {
        let cached_input = self.cached_input.as_ref().expect("complete forward pass first.");
        cached_input.map2(d_output, |input_val, output_val| {
            if input_val > 0.0 { output_val } else { 0.0 }
        })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(ReLU::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_vec_approx_eq(a: &[f32], b: &[f32]) {
        let tolerance = 1e-6;
        assert_eq!(a.len(), b.len(), "vectors have different lengths");
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert!((x - y).abs() < tolerance, "mismatch at index {}: {} vs {}", i, x, y);
        }
    }

    fn fixed_dense() -> Dense {
        Dense::from_parameters(
            Tensor::from_vec(vec![10.0, 20.0, 30.0, 40.0], vec![2, 2]),
            Tensor::from_vec(vec![1.0, 2.0], vec![1, 2]),
        )
    }

    #[test]
    fn test_dense_new_shapes() {
        let layer = Dense::new(4, 3, &mut StdRng::seed_from_u64(0));
        assert_eq!(layer.weights.shape, vec![4, 3]);
        assert_eq!(layer.biases.shape, vec![1, 3]);
        assert_eq!((layer.input_size(), layer.output_size()), (4, 3));
        assert!(layer.biases.read().iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_dense_forward_batch() {
        // [[1, 2], [0, 1]] @ [[10, 20], [30, 40]] + [1, 2]
        let input = Tensor::from_vec(vec![1.0, 2.0, 0.0, 1.0], vec![2, 2]);
        let mut layer = fixed_dense();

        let output = layer.forward(&input);

        assert_eq!(output.shape, vec![2, 2]);
        assert_vec_approx_eq(&output.read(), &[71.0, 102.0, 31.0, 42.0]);
    }

    #[test]
    fn test_dense_backward() {
        let input = Tensor::from_vec(vec![1.0, 2.0], vec![1, 2]);
        let d_output = Tensor::from_vec(vec![5.0, 8.0], vec![1, 2]);
        let mut layer = fixed_dense();

        layer.forward(&input);
        let d_input = layer.backward(&d_output);

        // [5, 8] @ [[10, 30], [20, 40]]
        assert_vec_approx_eq(&d_input.read(), &[210.0, 470.0]);
        // [[1], [2]] @ [[5, 8]]
        assert_vec_approx_eq(&layer.d_weights.as_ref().unwrap().read(), &[5.0, 8.0, 10.0, 16.0]);
        assert_vec_approx_eq(&layer.d_biases.as_ref().unwrap().read(), &[5.0, 8.0]);
    }

    #[test]
    #[should_panic(expected = "complete forward pass first.")]
    fn test_dense_backward_without_forward() {
        let mut layer = fixed_dense();
        layer.backward(&Tensor::zeros(vec![1, 2]));
    }

    #[test]
    fn test_clone_box_detaches_parameters() {
        let layer = fixed_dense();
        let mut cloned = layer.clone_box();
        let cloned_dense = cloned.as_any_mut().downcast_mut::<Dense>().unwrap();
        cloned_dense.weights.write()[0] = -1.0;
        assert_eq!(layer.weights.read()[0], 10.0);
    }

    #[test]
    fn test_relu_forward_backward() {
        let input = Tensor::from_vec(vec![-10.0, -0.5, 0.0, 0.5, 10.0], vec![1, 5]);
        let mut layer = ReLU::new();

        let output = layer.forward(&input);
        assert_vec_approx_eq(&output.read(), &[0.0, 0.0, 0.0, 0.5, 10.0]);

        let d_input = layer.backward(&Tensor::from_vec(vec![1.0; 5], vec![1, 5]));
        assert_vec_approx_eq(&d_input.read(), &[0.0, 0.0, 0.0, 1.0, 1.0]);
    }
}

use super::layer::{Layer, Dense};
use super::tensor::Tensor;
use serde::{Serialize, Deserialize};

#[typetag::serde]
pub trait Optimizer: Send {
    fn step(&mut self, layers: &mut [Box<dyn Layer>]);
    fn clone_box(&self) -> Box<dyn Optimizer>;
}


// SGD

#[derive(Serialize, Deserialize, Clone)]
pub struct SGD {
    learning_rate: f32
}

impl SGD {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate
        }
    }
}

#[typetag::serde]
impl Optimizer for SGD {
    fn step(&mut self, layers: &mut [Box<dyn Layer>]) {
        for layer in layers {
            if let Some(dense_layer) = layer.as_any_mut().downcast_mut::<Dense>() {
                if let (Some(d_weights), Some(d_biases)) = (&dense_layer.d_weights, &dense_layer.d_biases) {
                    let lr = self.learning_rate;
                    let new_weights = dense_layer.weights.map2(d_weights, |w, dw| w - lr * dw);
                    let new_biases = dense_layer.biases.map2(d_biases, |b, db| b - lr * db);

                    dense_layer.weights = new_weights;
                    dense_layer.biases = new_biases;
                }
            }
        }
    }

    fn clone_box(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}


// Adam

#[derive(Clone, Copy)]
struct StepConstants {
    beta1: f32,
    beta2: f32,
    correction1: f32,
    correction2: f32,
    lr: f32,
    eps: f32,
}

#[derive(Serialize, Deserialize, Clone)]
struct Moments {
    m: Tensor,
    v: Tensor,
}

impl Moments {
    fn zeros_like(t: &Tensor) -> Self {
        Self {
            m: Tensor::zeros(t.shape.clone()),
            v: Tensor::zeros(t.shape.clone()),
        }
    }

    // updates the running moments and returns the bias-corrected parameter step
    fn update(&mut self, grad: &Tensor, c: StepConstants) -> Tensor {
        self.m = self.m.map2(grad, |m, g| c.beta1 * m + (1.0 - c.beta1) * g);
        self.v = self.v.map2(grad, |v, g| c.beta2 * v + (1.0 - c.beta2) * g * g);
        self.m.map2(&self.v, |m, v| c.lr * (m / c.correction1) / ((v / c.correction2).sqrt() + c.eps))
    }

    fn deep_clone(&self) -> Self {
        Self { m: self.m.deep_clone(), v: self.v.deep_clone() }
    }
}

#[derive(Serialize, Deserialize)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: i32,
    // (weights, biases) moments per layer index, filled lazily
    moments: Vec<Option<(Moments, Moments)>>,
}

impl Adam {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            t: 0,
            moments: Vec::new(),
        }
    }
}

impl Clone for Adam {
    fn clone(&self) -> Self {
        Self {
            moments: self.moments.iter()
                .map(|slot| slot.as_ref().map(|(w, b)| (w.deep_clone(), b.deep_clone())))
                .collect(),
            ..*self
        }
    }
}

#[typetag::serde]
impl Optimizer for Adam {
    fn step(&mut self, layers: &mut [Box<dyn Layer>]) {
        self.t += 1;
        let constants = StepConstants {
            beta1: self.beta1,
            beta2: self.beta2,
            correction1: 1.0 - self.beta1.powi(self.t),
            correction2: 1.0 - self.beta2.powi(self.t),
            lr: self.learning_rate,
            eps: self.epsilon,
        };
        if self.moments.len() < layers.len() {
            self.moments.resize_with(layers.len(), || None);
        }

        for (layer, slot) in layers.iter_mut().zip(self.moments.iter_mut()) {
            let Some(dense_layer) = layer.as_any_mut().downcast_mut::<Dense>() else {
                continue;
            };
            let (Some(d_weights), Some(d_biases)) = (&dense_layer.d_weights, &dense_layer.d_biases) else {
                continue;
            };

            let (w_moments, b_moments) = slot.get_or_insert_with(|| {
                (Moments::zeros_like(&dense_layer.weights), Moments::zeros_like(&dense_layer.biases))
            });

            let w_step = w_moments.update(d_weights, constants);
            let b_step = b_moments.update(d_biases, constants);

            let new_weights = dense_layer.weights.map2(&w_step, |w, s| w - s);
            let new_biases = dense_layer.biases.map2(&b_step, |b, s| b - s);
            dense_layer.weights = new_weights;
            dense_layer.biases = new_biases;
        }
    }

    fn clone_box(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}

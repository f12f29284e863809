use burn::tensor::{activation::sigmoid, backend::Backend, Tensor};

use crate::utils::tensors;

use super::batcher::Infer;

/// Fitted logistic regression weights
#[derive(Clone, Debug)]
pub struct Model<B: Backend> {
    /// Feature weights, `[dim, 1]`
    weights: Tensor<B, 2>,

    /// Intercept
    bias: f32,
}

/// Raw scores and calibrated probabilities for a batch
#[derive(Clone, Debug)]
pub struct Output<B: Backend> {
    /// Linear scores, `[batch_size, 1]`
    pub scores: Tensor<B, 2>,

    /// `sigmoid(scores)`, `[batch_size, 1]`
    pub probabilities: Tensor<B, 2>,
}

/// Define model behavior
impl<B: Backend> Model<B> {
    /// Creates a model from dense weights
    pub fn new(weights: Vec<f32>, bias: f32, device: &B::Device) -> Self {
        let dim = weights.len();

        Self {
            weights: tensors::from_values(weights, [dim, 1], device),
            bias,
        }
    }

    /// Number of input features
    pub fn dim(&self) -> usize {
        let [dim, _] = self.weights.dims();

        dim
    }

    /// The weights as a flat vector
    pub fn weights(&self) -> Vec<f32> {
        tensors::to_vec(self.weights.clone())
    }

    /// Defines forward pass for inference
    pub fn forward(&self, input: Infer<B>) -> Output<B> {
        let scores = input
            .features
            .matmul(self.weights.clone())
            .add_scalar(self.bias);

        let probabilities = sigmoid(scores.clone());

        Output {
            scores,
            probabilities,
        }
    }
}

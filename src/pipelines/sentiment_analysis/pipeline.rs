use std::sync::Arc;

use burn::{data::dataloader::batcher::Batcher as _, tensor::backend::Backend};
use derive_new::new;

use crate::utils::tensors;

use super::{
    batcher::{Eval, Infer},
    model::Output,
    Batcher, Featurizer, Model,
};

/// Score and probability for one input row
#[derive(Clone, Copy, Debug, PartialEq, new)]
pub struct Scored {
    /// Raw linear score
    pub score: f32,

    /// Calibrated positive-class probability
    pub probability: f32,
}

/// A fitted featurizer + logistic regression pipeline.
///
/// Built once by [`train`](super::train) and only read afterwards.
#[derive(Clone)]
pub struct Pipeline<B: Backend> {
    batcher: Batcher<B>,
    model: Model<B>,
    threshold: f32,
}

impl<B: Backend> Pipeline<B> {
    /// Compose a fitted featurizer and model
    pub fn new(featurizer: Featurizer, model: Model<B>, threshold: f32, device: B::Device) -> Self {
        let batcher = Batcher::new(Arc::new(featurizer), device);

        Self {
            batcher,
            model,
            threshold,
        }
    }

    /// The fitted featurizer
    pub fn featurizer(&self) -> &Featurizer {
        self.batcher.featurizer()
    }

    /// The fitted model
    pub fn model(&self) -> &Model<B> {
        &self.model
    }

    /// The decision threshold applied to probabilities
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// The batcher used to featurize inputs for this pipeline
    pub fn batcher(&self) -> &Batcher<B> {
        &self.batcher
    }

    /// Apply the threshold to a probability
    pub fn decide(&self, probability: f32) -> bool {
        probability >= self.threshold
    }

    /// Score raw texts, one result per text in input order
    pub(crate) fn score_texts(&self, texts: Vec<String>) -> Vec<Scored> {
        if texts.is_empty() {
            return Vec::new();
        }

        let input: Infer<B> = self.batcher.batch(texts);

        self.score(input)
    }

    /// Score a labelled batch, returning the labels alongside
    pub(crate) fn score_eval(&self, batch: Eval<B>) -> (Vec<Scored>, Vec<bool>) {
        (self.score(batch.input), batch.labels)
    }

    fn score(&self, input: Infer<B>) -> Vec<Scored> {
        let Output {
            scores,
            probabilities,
        } = self.model.forward(input);

        tensors::to_vec(scores)
            .into_iter()
            .zip(tensors::to_vec(probabilities))
            .map(|(score, probability)| Scored::new(score, probability))
            .collect()
    }
}

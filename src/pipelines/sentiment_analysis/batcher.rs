use std::sync::Arc;

use burn::{
    data::dataloader,
    tensor::{backend::Backend, Tensor},
};
use derive_new::new;

use crate::utils::tensors;

use super::{Featurizer, Item};

/// An inference batch: one dense feature row per text
#[derive(Clone, Debug, new)]
pub struct Infer<B: Backend> {
    /// Featurized text, `[batch_size, dim]`
    pub features: Tensor<B, 2>,
}

/// An evaluation batch with the ground-truth labels
#[derive(Clone, Debug, new)]
pub struct Eval<B: Backend> {
    /// Model input
    pub input: Infer<B>,

    /// Expected labels, in batch order
    pub labels: Vec<bool>,
}

/// Struct for batching sentiment analysis items
#[derive(Clone)]
pub struct Batcher<B: Backend> {
    /// The fitted featurizer shared with the pipeline
    featurizer: Arc<Featurizer>,

    /// Device on which to perform computation
    device: B::Device,
}

impl<B: Backend> Batcher<B> {
    /// Creates a new batcher
    pub fn new(featurizer: Arc<Featurizer>, device: B::Device) -> Self {
        Self { featurizer, device }
    }

    /// The featurizer used to build batches
    pub fn featurizer(&self) -> &Featurizer {
        &self.featurizer
    }

    fn featurize<'a, T>(&self, texts: T) -> Infer<B>
    where
        T: IntoIterator<Item = &'a str>,
    {
        let rows: Vec<_> = texts
            .into_iter()
            .map(|text| self.featurizer.transform(text))
            .collect();

        let features = tensors::dense_rows(&rows, self.featurizer.dim(), &self.device);

        Infer { features }
    }
}

/// Implement Batcher trait for Batcher struct for inference
impl<B: Backend> dataloader::batcher::Batcher<String, Infer<B>> for Batcher<B> {
    /// Featurizes raw texts into an inference batch
    fn batch(&self, items: Vec<String>) -> Infer<B> {
        self.featurize(items.iter().map(String::as_str))
    }
}

/// Implement Batcher trait for Batcher struct for evaluation
impl<B: Backend, I: Item> dataloader::batcher::Batcher<I, Eval<B>> for Batcher<B> {
    /// Featurizes labelled items into an evaluation batch
    fn batch(&self, items: Vec<I>) -> Eval<B> {
        let input = self.featurize(items.iter().map(|item| item.input()));
        let labels = items.iter().map(|item| item.label()).collect();

        Eval { input, labels }
    }
}

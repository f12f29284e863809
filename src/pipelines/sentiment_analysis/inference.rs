use std::fmt::Display;

use burn::tensor::backend::Backend;
use derive_new::new;

use super::{pipeline::Scored, Pipeline};

/// The outcome of running one text through the pipeline
#[derive(Clone, Debug, PartialEq, new)]
pub struct Prediction {
    /// The input text
    pub text: String,

    /// `true` for positive sentiment
    pub prediction: bool,

    /// Calibrated positive-class probability
    pub probability: f32,

    /// Raw linear score
    pub score: f32,
}

impl Prediction {
    /// "Positive" or "Negative"
    pub fn sentiment(&self) -> &'static str {
        if self.prediction {
            "Positive"
        } else {
            "Negative"
        }
    }
}

impl Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sentiment: {} | Prediction: {} | Probability: {}",
            self.text,
            self.sentiment(),
            self.probability
        )
    }
}

impl<B: Backend> Pipeline<B> {
    /// Predict the sentiment of a single text
    pub fn predict(&self, text: &str) -> Prediction {
        self.predict_batch(&[text]).remove(0)
    }

    /// Predict the sentiment of each text, preserving input order
    pub fn predict_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Prediction> {
        let texts: Vec<String> = texts.iter().map(|text| text.as_ref().to_string()).collect();
        let scored = self.score_texts(texts.clone());

        texts
            .into_iter()
            .zip(scored)
            .map(|(text, Scored { score, probability })| {
                Prediction::new(text, self.decide(probability), probability, score)
            })
            .collect()
    }
}

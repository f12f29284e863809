use std::fmt::Display;

use burn::{
    data::{dataloader::batcher::Batcher as _, dataset::Dataset},
    tensor::backend::Backend,
};
use log::debug;

use super::{batcher::Eval, Item, Pipeline};

/// Number of records featurized per evaluation batch
const BATCH_SIZE: usize = 64;

/// Probabilities are clipped to `[EPSILON, 1 - EPSILON]` for the log loss
const EPSILON: f64 = 1e-15;

/// Confusion matrix for binary classification
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    /// True positives
    pub tp: usize,
    /// True negatives
    pub tn: usize,
    /// False positives
    pub fp: usize,
    /// False negatives
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Tally predicted against expected labels
    pub fn from_predictions(predicted: &[bool], expected: &[bool]) -> Self {
        let mut matrix = Self::default();

        for (predicted, expected) in predicted.iter().zip(expected) {
            match (predicted, expected) {
                (true, true) => matrix.tp += 1,
                (false, false) => matrix.tn += 1,
                (true, false) => matrix.fp += 1,
                (false, true) => matrix.fn_ += 1,
            }
        }

        matrix
    }

    /// Total number of samples
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// (TP + TN) / Total
    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// Harmonic mean of precision and recall
    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();

        if precision + recall == 0.0 {
            return 0.0;
        }

        2.0 * precision * recall / (precision + recall)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Model quality metrics over a labelled dataset
#[derive(Clone, Debug, PartialEq)]
pub struct Metrics {
    /// Share of correctly labelled records
    pub accuracy: f64,

    /// Area under the ROC curve
    pub auc: f64,

    /// F1 score at the pipeline threshold
    pub f1: f64,

    /// Positive precision
    pub precision: f64,

    /// Positive recall
    pub recall: f64,

    /// Mean binary cross-entropy of the probabilities
    pub log_loss: f64,

    /// Counts behind accuracy, precision and recall
    pub confusion_matrix: ConfusionMatrix,
}

impl Metrics {
    /// Compute every metric from ground truth and predicted probabilities
    pub fn compute(expected: &[bool], probabilities: &[f32], threshold: f32) -> Self {
        let predicted: Vec<bool> = probabilities.iter().map(|p| *p >= threshold).collect();
        let confusion_matrix = ConfusionMatrix::from_predictions(&predicted, expected);

        Self {
            accuracy: confusion_matrix.accuracy(),
            auc: area_under_roc(expected, probabilities),
            f1: confusion_matrix.f1(),
            precision: confusion_matrix.precision(),
            recall: confusion_matrix.recall(),
            log_loss: log_loss(expected, probabilities),
            confusion_matrix,
        }
    }
}

impl Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Accuracy: {:.2}%", self.accuracy * 100.0)?;
        writeln!(f, "Auc: {:.2}%", self.auc * 100.0)?;
        write!(f, "F1Score: {:.2}%", self.f1 * 100.0)
    }
}

/// Mann-Whitney estimate of the ROC AUC, averaging the ranks of tied scores.
/// Falls back to 0.5 when only one class is present.
fn area_under_roc(expected: &[bool], probabilities: &[f32]) -> f64 {
    let positives = expected.iter().filter(|label| **label).count();
    let negatives = expected.len() - positives;

    if positives == 0 || negatives == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|a, b| probabilities[*a].total_cmp(&probabilities[*b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;

    while start < order.len() {
        let mut end = start;

        while end + 1 < order.len() && probabilities[order[end + 1]] == probabilities[order[start]] {
            end += 1;
        }

        // 1-based ranks start..=end share their mean
        let rank = (start + end) as f64 / 2.0 + 1.0;

        positive_rank_sum += rank
            * order[start..=end]
                .iter()
                .filter(|index| expected[**index])
                .count() as f64;

        start = end + 1;
    }

    let positives = positives as f64;
    let negatives = negatives as f64;

    (positive_rank_sum - positives * (positives + 1.0) / 2.0) / (positives * negatives)
}

fn log_loss(expected: &[bool], probabilities: &[f32]) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }

    let total: f64 = expected
        .iter()
        .zip(probabilities)
        .map(|(label, p)| {
            let p = f64::from(*p).clamp(EPSILON, 1.0 - EPSILON);

            if *label {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();

    total / expected.len() as f64
}

/// Evaluation errors
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum EvaluationError {
    /// Nothing to evaluate on
    #[error("the test set is empty")]
    EmptyDataset,
}

/// Run every record of a labelled dataset through the pipeline and score the results
pub fn evaluate<B, I, D>(pipeline: &Pipeline<B>, dataset: &D) -> Result<Metrics, EvaluationError>
where
    B: Backend,
    I: Item,
    D: Dataset<I>,
{
    let items: Vec<I> = dataset.iter().collect();

    if items.is_empty() {
        return Err(EvaluationError::EmptyDataset);
    }

    let mut expected = Vec::with_capacity(items.len());
    let mut probabilities = Vec::with_capacity(items.len());

    for chunk in items.chunks(BATCH_SIZE) {
        let batch: Eval<B> = pipeline.batcher().batch(chunk.to_vec());
        let (scored, labels) = pipeline.score_eval(batch);

        probabilities.extend(scored.iter().map(|scored| scored.probability));
        expected.extend(labels);
    }

    let metrics = Metrics::compute(&expected, &probabilities, pipeline.threshold());

    debug!(
        "Evaluated {} records: precision {:.4}, recall {:.4}, log loss {:.4}, {:?}",
        expected.len(),
        metrics.precision,
        metrics.recall,
        metrics.log_loss,
        metrics.confusion_matrix
    );

    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        data::{dataloader::batcher::Batcher as _, dataset::InMemDataset},
    };
    use pretty_assertions::assert_eq;

    use crate::{
        datasets::labelled,
        pipelines::sentiment_analysis::{Featurizer, FeaturizerConfig, Model},
    };

    use super::*;

    fn pipeline() -> Pipeline<NdArray> {
        let device = NdArrayDevice::Cpu;
        let featurizer = Featurizer::fit(
            FeaturizerConfig::new().with_char_ngram_length(0),
            ["love great bad awful"],
        );
        let model = Model::new(vec![2.0, 1.5, -2.5, -1.0], 0.25, &device);

        Pipeline::new(featurizer, model, 0.5, device)
    }

    fn items() -> Vec<labelled::Item> {
        [
            ("love it", true),
            ("awful", false),
            ("great great great", true),
            ("bad", false),
            ("nothing known here", true),
            ("bad bad", false),
        ]
        .into_iter()
        .map(|(text, label)| labelled::Item::new(text.to_string(), label))
        .collect()
    }

    #[test]
    fn test_evaluation_batch_scores_match_predictions() {
        let pipeline = pipeline();
        let items = items();

        let batch: Eval<NdArray> = pipeline.batcher().batch(items.clone());
        let (scored, labels) = pipeline.score_eval(batch);

        assert_eq!(scored.len(), items.len());
        assert_eq!(
            labels,
            items.iter().map(|item| item.label).collect::<Vec<_>>()
        );

        for (scored, item) in scored.iter().zip(&items) {
            let prediction = pipeline.predict(&item.text);

            assert_eq!(scored.probability, prediction.probability);
            assert_eq!(scored.score, prediction.score);
        }
    }

    #[test]
    fn test_evaluate_matches_metrics_from_predictions() {
        let pipeline = pipeline();
        let items = items();

        let expected: Vec<bool> = items.iter().map(|item| item.label).collect();
        let probabilities: Vec<f32> = items
            .iter()
            .map(|item| pipeline.predict(&item.text).probability)
            .collect();

        let metrics = evaluate(&pipeline, &InMemDataset::new(items)).unwrap();

        assert_eq!(metrics, Metrics::compute(&expected, &probabilities, 0.5));
    }

    #[test]
    fn test_evaluate_empty_dataset() {
        let dataset: InMemDataset<labelled::Item> = InMemDataset::new(Vec::new());

        assert_eq!(
            evaluate(&pipeline(), &dataset),
            Err(EvaluationError::EmptyDataset)
        );
    }

    #[test]
    fn test_confusion_matrix_counts() {
        let predicted = [true, true, false, false, true];
        let expected = [true, false, false, true, true];

        let matrix = ConfusionMatrix::from_predictions(&predicted, &expected);

        assert_eq!(
            matrix,
            ConfusionMatrix {
                tp: 2,
                tn: 1,
                fp: 1,
                fn_: 1
            }
        );
        assert!((matrix.accuracy() - 0.6).abs() < 1e-12);
        assert!((matrix.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((matrix.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((matrix.f1() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_f1_without_positive_predictions_is_zero() {
        let matrix = ConfusionMatrix::from_predictions(&[false, false], &[true, false]);

        assert_eq!(matrix.f1(), 0.0);
    }

    #[test]
    fn test_auc_perfect_and_inverted() {
        let expected = [true, true, false, false];

        assert_eq!(area_under_roc(&expected, &[0.9, 0.8, 0.2, 0.1]), 1.0);
        assert_eq!(area_under_roc(&expected, &[0.1, 0.2, 0.8, 0.9]), 0.0);
    }

    #[test]
    fn test_auc_averages_ties() {
        let expected = [true, false, true, false];

        assert_eq!(area_under_roc(&expected, &[0.5, 0.5, 0.5, 0.5]), 0.5);
        assert_eq!(area_under_roc(&expected, &[0.7, 0.7, 0.9, 0.1]), 0.875);
    }

    #[test]
    fn test_auc_single_class_falls_back() {
        assert_eq!(area_under_roc(&[true, true], &[0.3, 0.9]), 0.5);
    }

    #[test]
    fn test_metrics_report() {
        let metrics = Metrics::compute(&[true, false], &[0.75, 0.25], 0.5);

        assert_eq!(metrics.accuracy, 1.0);
        assert!((metrics.log_loss - (-(0.75f64).ln())).abs() < 1e-9);
        assert_eq!(
            metrics.to_string(),
            "Accuracy: 100.00%\nAuc: 100.00%\nF1Score: 100.00%"
        );
    }
}

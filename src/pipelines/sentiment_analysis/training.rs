use burn::{config::Config, data::dataset::Dataset, tensor::backend::Backend};
use log::{debug, info, warn};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use super::{
    featurizer::SparseVector, Featurizer, FeaturizerConfig, Item, Model, Pipeline,
};

/// Number of strongest terms per class reported after training
const TOP_TERMS: usize = 5;

/// Define configuration struct for the experiment
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Text featurization settings
    #[config(default = "FeaturizerConfig::new()")]
    pub featurizer: FeaturizerConfig,

    /// Share of the dataset held out for evaluation
    #[config(default = 0.2)]
    pub test_fraction: f64,

    /// Seed for the train/test split and the solver's visiting order
    #[config(default = 42)]
    pub seed: u64,

    /// L2 regularization strength; the solver uses `regularization / n`
    #[config(default = 1.0)]
    pub regularization: f64,

    /// Upper bound on passes over the training set
    #[config(default = 100)]
    pub max_epochs: usize,

    /// Stop once the duality gap falls below this share of the primal loss
    #[config(default = 0.01)]
    pub convergence_tolerance: f64,

    /// Probability at or above which a text is labelled positive
    #[config(default = 0.5)]
    pub threshold: f32,
}

/// Model fitting errors
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TrainingError {
    /// Nothing to train on
    #[error("the training set is empty")]
    EmptyDataset,

    /// Logistic regression needs both classes
    #[error("the training set only contains {} records", class_name(.0))]
    SingleClass(bool),

    /// No n-gram could be extracted from the training texts
    #[error("no features could be extracted from the training set")]
    EmptyVocabulary,

    /// The solver produced NaN or infinite weights
    #[error("the solver diverged after {0} epochs")]
    Diverged(usize),
}

fn class_name(positive: &bool) -> &'static str {
    if *positive {
        "positive"
    } else {
        "negative"
    }
}

/// Fit the featurizer and the classifier on a training set
pub fn train<B, I, D>(
    dataset: &D,             // Training dataset
    config: &TrainingConfig, // Experiment configuration
    device: &B::Device,      // Device on which to perform computation
) -> Result<Pipeline<B>, TrainingError>
where
    B: Backend,
    I: Item,
    D: Dataset<I>,
{
    println!("=============== Create and Train the Model ===============");

    let items: Vec<I> = dataset.iter().collect();

    if items.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }

    let labels: Vec<bool> = items.iter().map(|item| item.label()).collect();
    let positives = labels.iter().filter(|label| **label).count();

    if positives == 0 || positives == labels.len() {
        return Err(TrainingError::SingleClass(positives > 0));
    }

    let featurizer = Featurizer::fit(
        config.featurizer.clone(),
        items.iter().map(|item| item.input()),
    );

    if featurizer.dim() == 0 {
        return Err(TrainingError::EmptyVocabulary);
    }

    info!(
        "Training on {} records ({} positive) with {} features",
        items.len(),
        positives,
        featurizer.dim()
    );

    let rows: Vec<SparseVector> = items
        .iter()
        .map(|item| featurizer.transform(item.input()))
        .collect();

    let solution = Sdca::new(&rows, &labels, featurizer.dim(), config).solve()?;

    log_top_terms(&featurizer, &solution.weights);

    let weights = solution.weights.iter().map(|w| *w as f32).collect();
    let model = Model::new(weights, solution.bias as f32, device);

    println!("=============== End of training ===============");
    println!();

    Ok(Pipeline::new(
        featurizer,
        model,
        config.threshold,
        device.clone(),
    ))
}

/// Fitted primal weights
struct Solution {
    weights: Vec<f64>,
    bias: f64,
}

/// Stochastic dual coordinate ascent for L2-regularized logistic regression.
///
/// Each record owns a dual variable `alpha` with `alpha * y` in `[0, 1]`, and the
/// weights are kept equal to `sum(alpha_i * x_i) / (lambda * n)`. The bias is an
/// extra feature fixed to 1.
struct Sdca<'a> {
    rows: &'a [SparseVector],
    targets: Vec<f64>,
    dim: usize,
    lambda: f64,
    config: &'a TrainingConfig,
}

impl<'a> Sdca<'a> {
    fn new(
        rows: &'a [SparseVector],
        labels: &[bool],
        dim: usize,
        config: &'a TrainingConfig,
    ) -> Self {
        let targets = labels
            .iter()
            .map(|label| if *label { 1.0 } else { -1.0 })
            .collect();

        let lambda = config.regularization.max(f64::EPSILON) / rows.len() as f64;

        Self {
            rows,
            targets,
            dim,
            lambda,
            config,
        }
    }

    fn solve(&self) -> Result<Solution, TrainingError> {
        let n = self.rows.len();
        let scale = 1.0 / (self.lambda * n as f64);

        let mut solution = Solution {
            weights: vec![0.0; self.dim],
            bias: 0.0,
        };
        let mut duals = vec![0.0; n];

        let curvatures: Vec<f64> = self
            .rows
            .iter()
            .map(|row| f64::max(1.0, 0.25 + (row.squared_norm() + 1.0) * scale))
            .collect();

        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        for epoch in 1..=self.config.max_epochs {
            order.shuffle(&mut rng);

            for &i in &order {
                let y = self.targets[i];
                let margin = y * (self.rows[i].dot(&solution.weights) + solution.bias);

                let delta = (y * sigmoid(-margin) - duals[i]) / curvatures[i];

                if delta == 0.0 {
                    continue;
                }

                duals[i] += delta;

                let step = delta * scale;

                for (index, value) in self.rows[i].iter() {
                    solution.weights[index] += step * f64::from(value);
                }

                solution.bias += step;
            }

            let (primal, dual) = self.objectives(&solution, &duals);

            if !primal.is_finite() {
                return Err(TrainingError::Diverged(epoch));
            }

            let gap = primal - dual;

            debug!("Epoch {epoch}: primal {primal:.6}, dual {dual:.6}, gap {gap:.6}");

            if gap <= self.config.convergence_tolerance * primal {
                info!("Converged after {epoch} epochs (duality gap {gap:.6})");

                return Ok(solution);
            }
        }

        warn!(
            "Stopped after {} epochs without reaching the duality gap tolerance",
            self.config.max_epochs
        );

        Ok(solution)
    }

    /// Primal and dual objective values for the current iterate
    fn objectives(&self, solution: &Solution, duals: &[f64]) -> (f64, f64) {
        let n = self.rows.len() as f64;

        let regularizer = 0.5
            * self.lambda
            * (solution.weights.iter().map(|w| w * w).sum::<f64>() + solution.bias * solution.bias);

        let loss: f64 = self
            .rows
            .iter()
            .zip(&self.targets)
            .map(|(row, y)| softplus(-y * (row.dot(&solution.weights) + solution.bias)))
            .sum();

        let entropy: f64 = duals
            .iter()
            .zip(&self.targets)
            .map(|(alpha, y)| binary_entropy(alpha * y))
            .sum();

        (loss / n + regularizer, entropy / n - regularizer)
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^x)` without overflow
fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

fn binary_entropy(p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    let term = |q: f64| if q > 0.0 { -q * q.ln() } else { 0.0 };

    term(p) + term(1.0 - p)
}

fn log_top_terms(featurizer: &Featurizer, weights: &[f64]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }

    let mut ranked: Vec<(usize, f64)> = weights.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let describe = |(index, weight): &(usize, f64)| {
        format!("{:?} ({weight:.3})", featurizer.term(*index).unwrap_or_default())
    };

    let positive: Vec<String> = ranked.iter().take(TOP_TERMS).map(describe).collect();
    let negative: Vec<String> = ranked.iter().rev().take(TOP_TERMS).map(describe).collect();

    debug!("Most positive terms: {}", positive.join(", "));
    debug!("Most negative terms: {}", negative.join(", "));
}

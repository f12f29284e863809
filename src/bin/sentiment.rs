//! Command line tool to train, evaluate and try out the sentiment pipeline

use std::path::PathBuf;

use anyhow::anyhow;
use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    config::Config as _,
    data::dataset::Dataset as _,
    tensor::backend::Backend,
};
use burn_sentiment::{
    datasets::labelled,
    pipelines::sentiment_analysis::{self, Pipeline, TrainingConfig},
    utils::files,
};
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Usage: sentiment [OPTIONS]

Options:
  -h, --help           Print help
  -d, --data-file      The labelled data file (defaults to 'Data/yelp_labelled.txt')
  -c, --config         A training config JSON file
  -s, --seed           Seed for the train/test split and the solver
  -t, --threshold      Probability at or above which a text is positive (defaults to 0.5)
  -p, --predict        Extra text to run through the batch predictor (repeatable)
";

/// The ad-hoc sample for the single-item predictor
const SAMPLE_STATEMENT: &str = "This was a very bad steak";

/// The samples for the batch predictor
const BATCH_STATEMENTS: [&str; 2] = ["This was a horrible meal", "I love this spaghetti."];

#[derive(Debug)]
struct Args {
    data_file: Option<PathBuf>,
    config: Option<String>,
    seed: Option<u64>,
    threshold: Option<f32>,
    predict: Vec<String>,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            data_file: pargs.opt_value_from_str(["-d", "--data-file"])?,
            config: pargs.opt_value_from_str(["-c", "--config"])?,
            seed: pargs.opt_value_from_str(["-s", "--seed"])?,
            threshold: pargs.opt_value_from_str(["-t", "--threshold"])?,
            predict: pargs.values_from_str(["-p", "--predict"])?,
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            return Err(anyhow!("Unexpected arguments: {:?}", remaining));
        }

        Ok(Some(args))
    }

    fn training_config(&self) -> anyhow::Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::load(path.as_str())
                .map_err(|e| anyhow!("Unable to load config file: {}", e))?,
            None => TrainingConfig::new(),
        };

        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }

        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let config = args.training_config()?;

    let data_path = match &args.data_file {
        Some(path) => path.clone(),
        None => files::default_data_path()?,
    };

    let device = NdArrayDevice::Cpu;

    let dataset = labelled::Dataset::load(&data_path)?;
    let split = dataset.split(config.test_fraction, config.seed);

    info!(
        "Using {} records ({} positive) for training and {} for testing",
        split.train.len(),
        split.train.positives(),
        split.test.len()
    );

    let pipeline = sentiment_analysis::train::<NdArray, _, _>(&split.train, &config, &device)?;

    evaluate(&pipeline, &split.test)?;
    use_model_with_single_item(&pipeline);

    let mut statements: Vec<String> = BATCH_STATEMENTS.iter().map(|s| s.to_string()).collect();
    statements.extend(args.predict);

    use_model_with_batch_items(&pipeline, &statements);

    Ok(())
}

fn evaluate<B: Backend>(pipeline: &Pipeline<B>, test: &labelled::Dataset) -> anyhow::Result<()> {
    println!("=============== Evaluating Model accuracy with Test data===============");

    let metrics = sentiment_analysis::evaluate(pipeline, test)?;

    println!();
    println!("Model quality metrics evaluation");
    println!("--------------------------------");
    println!("{}", metrics);
    println!("=============== End of model evaluation ===============");

    Ok(())
}

fn use_model_with_single_item<B: Backend>(pipeline: &Pipeline<B>) {
    let prediction = pipeline.predict(SAMPLE_STATEMENT);

    println!();
    println!("=============== Prediction Test of model with a single sample and test dataset ===============");
    println!();
    println!("{}", prediction);
    println!("=============== End of Predictions ===============");
    println!();
}

fn use_model_with_batch_items<B: Backend>(pipeline: &Pipeline<B>, statements: &[String]) {
    let predictions = pipeline.predict_batch(statements);

    println!();
    println!("=============== Prediction Test of loaded model with multiple samples ===============");

    for prediction in predictions {
        println!("{}", prediction);
    }

    println!("=============== End of predictions ===============");
}

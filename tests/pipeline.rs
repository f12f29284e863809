use std::path::PathBuf;

use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    data::dataset::Dataset as _,
};
use burn_sentiment::{
    datasets::labelled,
    pipelines::sentiment_analysis::{evaluate, train, Pipeline, TrainingConfig},
};
use pretty_assertions::assert_eq;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/reviews.txt")
}

fn fitted() -> (Pipeline<NdArray>, labelled::Split) {
    let config = TrainingConfig::new();
    let dataset = labelled::Dataset::load(fixture()).unwrap();
    let split = dataset.split(config.test_fraction, config.seed);

    let pipeline = train::<NdArray, _, _>(&split.train, &config, &NdArrayDevice::Cpu).unwrap();

    (pipeline, split)
}

#[test]
fn test_fixture_split_sizes() {
    let dataset = labelled::Dataset::load(fixture()).unwrap();

    let split = dataset.split(0.2, 42);

    assert_eq!(dataset.len(), 40);
    assert_eq!(split.test.len(), 8);
    assert_eq!(split.train.len(), 32);
}

#[test]
fn test_trains_better_than_random() {
    let (pipeline, split) = fitted();

    let metrics = evaluate(&pipeline, &split.test).unwrap();

    assert!(metrics.accuracy >= 0.5, "accuracy was {}", metrics.accuracy);
    assert!((0.0..=1.0).contains(&metrics.auc));
    assert!((0.0..=1.0).contains(&metrics.f1));
    assert_eq!(metrics.confusion_matrix.total(), split.test.len());
}

#[test]
fn test_evaluation_is_deterministic() {
    let (pipeline, split) = fitted();

    let first = evaluate(&pipeline, &split.test).unwrap();
    let second = evaluate(&pipeline, &split.test).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_negative_vocabulary_predicts_negative() {
    let (pipeline, _) = fitted();

    let prediction = pipeline.predict("This was a very bad steak");

    assert!(!prediction.prediction);
    assert!(prediction.probability < 0.5);
    assert_eq!(
        prediction.to_string(),
        format!(
            "Sentiment: This was a very bad steak | Prediction: Negative | Probability: {}",
            prediction.probability
        )
    );
}

#[test]
fn test_single_prediction_matches_batch() {
    let (pipeline, _) = fitted();

    for text in ["This was a horrible meal", "I love this spaghetti.", ""] {
        assert_eq!(pipeline.predict(text), pipeline.predict_batch(&[text])[0]);
    }
}

#[test]
fn test_probabilities_are_thresholded() {
    let (pipeline, split) = fitted();

    let texts: Vec<String> = split.test.iter().map(|item| item.text).collect();
    let predictions = pipeline.predict_batch(&texts);

    assert_eq!(predictions.len(), texts.len());

    for (prediction, text) in predictions.iter().zip(&texts) {
        assert_eq!(&prediction.text, text);
        assert!((0.0..=1.0).contains(&prediction.probability));
        assert_eq!(prediction.prediction, prediction.probability >= 0.5);
    }
}

#[test]
fn test_evaluated_batch_agrees_with_single_predictions() {
    let (pipeline, split) = fitted();

    let texts: Vec<String> = split.test.iter().map(|item| item.text).collect();
    let predictions = pipeline.predict_batch(&texts);

    for (prediction, text) in predictions.iter().zip(&texts) {
        let single = pipeline.predict(text);

        assert!(
            (prediction.probability - single.probability).abs() < 1e-6,
            "{text:?}: batch {} vs single {}",
            prediction.probability,
            single.probability
        );
    }
}

#[test]
fn test_malformed_file_returns_no_dataset() {
    let input = "Great food\t1\nmissing the label\n";

    let result = labelled::Dataset::from_reader(input.as_bytes());

    assert!(matches!(
        result,
        Err(burn_sentiment::datasets::DatasetError::Format { line: 2, .. })
    ));
}

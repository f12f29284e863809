use std::{fs::File, io, path::Path};

use burn::data::dataset::{self, Dataset as _, InMemDataset};
use derive_new::new;
use log::{debug, info};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{de, Deserialize, Deserializer};

use crate::pipelines::sentiment_analysis;

use super::DatasetError;

/// The file name of the Yelp reviews subset
pub static DATA_FILE: &str = "yelp_labelled.txt";

/// A single labelled sentence
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, new)]
pub struct Item {
    /// The review text
    pub text: String,

    /// Whether the review is positive
    #[serde(deserialize_with = "deserialize_label")]
    pub label: bool,
}

impl sentiment_analysis::Item for Item {
    fn input(&self) -> &str {
        &self.text
    }

    fn label(&self) -> bool {
        self.label
    }
}

/// Accepts `0`/`1` as well as `true`/`false`
fn deserialize_label<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;

    match value.trim().to_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(de::Error::custom(format!(
            "invalid label {other:?}, expected 0 or 1"
        ))),
    }
}

/// Struct for the labelled sentences dataset
pub struct Dataset {
    /// Underlying In-Memory dataset
    dataset: InMemDataset<Item>,
}

/// Implement the Dataset trait for the labelled sentences dataset
impl dataset::Dataset<Item> for Dataset {
    /// Returns a specific item from the dataset
    fn get(&self, index: usize) -> Option<Item> {
        self.dataset.get(index)
    }

    /// Returns the length of the dataset
    fn len(&self) -> usize {
        self.dataset.len()
    }
}

/// A train/test partition of a dataset
pub struct Split {
    /// Records used to fit the pipeline
    pub train: Dataset,

    /// Held-out records used for evaluation
    pub test: Dataset,
}

impl Dataset {
    /// Wraps already-parsed records
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            dataset: InMemDataset::new(items),
        }
    }

    /// Loads a tab-delimited `<text>\t<label>` file without a header row
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|error| match error.kind() {
            io::ErrorKind::NotFound => DatasetError::NotFound(path.to_path_buf()),
            _ => DatasetError::Io(error),
        })?;

        let dataset = Self::from_reader(file)?;

        info!(
            "Loaded {} records from {}",
            dataset.len(),
            path.display()
        );

        Ok(dataset)
    }

    /// Parses records from any reader. Fails on the first malformed line.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .from_reader(reader);

        let mut items = Vec::new();

        for result in reader.byte_records() {
            let record = result.map_err(|error| {
                let line = error.position().map(|p| p.line()).unwrap_or_default();
                let reason = error.to_string();

                match error.into_kind() {
                    csv::ErrorKind::Io(error) => DatasetError::Io(error),
                    _ => DatasetError::Format { line, reason },
                }
            })?;

            let line = record.position().map(|p| p.line()).unwrap_or_default();

            let record =
                csv::StringRecord::from_byte_record(record).map_err(|error| DatasetError::Format {
                    line,
                    reason: error.to_string(),
                })?;

            if record.len() == 1 && record[0].trim().is_empty() {
                continue;
            }

            if record.len() != 2 {
                return Err(DatasetError::Format {
                    line,
                    reason: format!("expected 2 fields, found {}", record.len()),
                });
            }

            let item: Item = record
                .deserialize(None)
                .map_err(|error| DatasetError::Format {
                    line,
                    reason: error.to_string(),
                })?;

            items.push(item);
        }

        Ok(Self::new(items))
    }

    /// Shuffles the records with the given seed and holds out `test_fraction` of them
    pub fn split(&self, test_fraction: f64, seed: u64) -> Split {
        let mut items: Vec<Item> = self.dataset.iter().collect();
        let mut rng = StdRng::seed_from_u64(seed);

        items.shuffle(&mut rng);

        let test_len = ((items.len() as f64) * test_fraction.clamp(0.0, 1.0)).round() as usize;
        let train = items.split_off(test_len.min(items.len()));

        debug!(
            "Split {} records into {} train / {} test",
            train.len() + items.len(),
            train.len(),
            items.len()
        );

        Split {
            train: Self::new(train),
            test: Self::new(items),
        }
    }

    /// The number of positive records
    pub fn positives(&self) -> usize {
        self.dataset.iter().filter(|item| item.label).count()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use burn::data::dataset::Dataset as _;
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample(count: usize) -> Dataset {
        Dataset::new(
            (0..count)
                .map(|i| Item::new(format!("review number {i}"), i % 2 == 0))
                .collect(),
        )
    }

    #[test]
    fn test_parses_tab_delimited_lines() {
        let input = "Wow... Loved this place.\t1\nCrust is not good.\t0\n\n\"Quoted\" text\t1\n";

        let dataset = Dataset::from_reader(input.as_bytes()).unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(
            dataset.get(0),
            Some(Item::new("Wow... Loved this place.".to_string(), true))
        );
        assert_eq!(
            dataset.get(1),
            Some(Item::new("Crust is not good.".to_string(), false))
        );
        assert_eq!(
            dataset.get(2),
            Some(Item::new("\"Quoted\" text".to_string(), true))
        );
        assert_eq!(dataset.positives(), 2);
    }

    #[test]
    fn test_accepts_boolean_labels() {
        let input = "good\ttrue\nbad\tFalse\n";

        let dataset = Dataset::from_reader(input.as_bytes()).unwrap();

        assert_eq!(dataset.get(0).map(|item| item.label), Some(true));
        assert_eq!(dataset.get(1).map(|item| item.label), Some(false));
    }

    #[test]
    fn test_missing_label_is_a_format_error() {
        let input = "fine\t1\nno label here\nalso fine\t0\n";

        let result = Dataset::from_reader(input.as_bytes());

        match result {
            Err(DatasetError::Format { line, .. }) => assert_eq!(line, 2),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a format error"),
        }
    }

    #[test]
    fn test_invalid_utf8_reports_its_own_line() {
        let input = b"good\t1\nba\xffd\t0\nfine\t1\n";

        let result = Dataset::from_reader(&input[..]);

        match result {
            Err(DatasetError::Format { line, .. }) => assert_eq!(line, 2),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a format error"),
        }
    }

    #[test]
    fn test_non_binary_label_is_a_format_error() {
        let input = "fine\t1\nmaybe\t2\n";

        let result = Dataset::from_reader(input.as_bytes());

        assert!(matches!(result, Err(DatasetError::Format { line: 2, .. })));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = Dataset::load("does/not/exist/yelp_labelled.txt");

        assert!(matches!(result, Err(DatasetError::NotFound(_))));
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let dataset = sample(101);

        let split = dataset.split(0.2, 7);

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 81);

        let train: HashSet<String> = split.train.iter().map(|item| item.text).collect();
        let test: HashSet<String> = split.test.iter().map(|item| item.text).collect();
        let all: HashSet<String> = dataset.iter().map(|item| item.text).collect();

        assert!(train.is_disjoint(&test));
        assert_eq!(train.union(&test).cloned().collect::<HashSet<_>>(), all);
    }

    #[test]
    fn test_split_is_reproducible_for_a_seed() {
        let dataset = sample(30);

        let first: Vec<Item> = dataset.split(0.2, 42).test.iter().collect();
        let second: Vec<Item> = dataset.split(0.2, 42).test.iter().collect();

        assert_eq!(first, second);
    }
}

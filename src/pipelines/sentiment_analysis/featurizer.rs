use std::collections::{BTreeMap, HashMap};

use burn::config::Config;

/// Start-of-text marker used to frame character n-grams
const START_MARKER: char = '\u{2}';

/// End-of-text marker used to frame character n-grams
const END_MARKER: char = '\u{3}';

/// Text featurization settings
#[derive(Config, Debug)]
pub struct FeaturizerConfig {
    /// Lowercase the text before extracting n-grams
    #[config(default = true)]
    pub lowercase: bool,

    /// Keep punctuation characters instead of replacing them with spaces
    #[config(default = false)]
    pub keep_punctuation: bool,

    /// Keep digits instead of replacing them with spaces
    #[config(default = true)]
    pub keep_numbers: bool,

    /// Word n-grams of every length from 1 up to this one are extracted
    #[config(default = 1)]
    pub word_ngram_length: usize,

    /// Length of the character n-grams, 0 disables them
    #[config(default = 3)]
    pub char_ngram_length: usize,
}

/// A sparse feature vector with strictly increasing indices
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseVector {
    indices: Vec<usize>,
    values: Vec<f32>,
}

impl SparseVector {
    fn from_counts(counts: BTreeMap<usize, f32>) -> Self {
        let (indices, values) = counts.into_iter().unzip();

        Self { indices, values }
    }

    /// Iterate over the non-zero `(index, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Number of non-zero entries
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// `true` when no known term was found in the text
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Squared euclidean norm
    pub fn squared_norm(&self) -> f64 {
        self.values.iter().map(|v| f64::from(*v).powi(2)).sum()
    }

    /// Dot product with a dense vector
    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.iter()
            .map(|(index, value)| dense[index] * f64::from(value))
            .sum()
    }

    fn normalized(mut self) -> Self {
        let norm = self.squared_norm().sqrt();

        if norm > 0.0 {
            for value in self.values.iter_mut() {
                *value = (f64::from(*value) / norm) as f32;
            }
        }

        self
    }
}

/// Term to index mapping, in first-seen order
#[derive(Clone, Debug, Default)]
struct Vocabulary {
    index: HashMap<String, usize>,
    terms: Vec<String>,
}

impl Vocabulary {
    fn insert(&mut self, term: String) {
        if !self.index.contains_key(&term) {
            self.index.insert(term.clone(), self.terms.len());
            self.terms.push(term);
        }
    }

    fn get(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    fn len(&self) -> usize {
        self.terms.len()
    }
}

/// Maps raw text to L2-normalised word and character n-gram counts.
///
/// The vocabulary is fixed at fit time; the same text always produces the same vector.
#[derive(Clone, Debug)]
pub struct Featurizer {
    config: FeaturizerConfig,
    words: Vocabulary,
    chars: Vocabulary,
}

impl Featurizer {
    /// Builds the vocabulary from the training texts
    pub fn fit<'a, T>(config: FeaturizerConfig, texts: T) -> Self
    where
        T: IntoIterator<Item = &'a str>,
    {
        let mut featurizer = Self {
            config,
            words: Vocabulary::default(),
            chars: Vocabulary::default(),
        };

        for text in texts {
            let normalized = featurizer.normalize(text);

            for term in featurizer.word_ngrams(&normalized) {
                featurizer.words.insert(term);
            }

            for term in featurizer.char_ngrams(&normalized) {
                featurizer.chars.insert(term);
            }
        }

        featurizer
    }

    /// Total number of features (word n-grams first, then character n-grams)
    pub fn dim(&self) -> usize {
        self.words.len() + self.chars.len()
    }

    /// The n-gram behind a feature index
    pub fn term(&self, index: usize) -> Option<&str> {
        if index < self.words.len() {
            self.words.terms.get(index).map(String::as_str)
        } else {
            self.chars
                .terms
                .get(index - self.words.len())
                .map(String::as_str)
        }
    }

    /// Featurize a single text
    pub fn transform(&self, text: &str) -> SparseVector {
        let normalized = self.normalize(text);
        let mut counts = BTreeMap::new();

        for term in self.word_ngrams(&normalized) {
            if let Some(index) = self.words.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let offset = self.words.len();

        for term in self.char_ngrams(&normalized) {
            if let Some(index) = self.chars.get(&term) {
                *counts.entry(offset + index).or_insert(0.0) += 1.0;
            }
        }

        SparseVector::from_counts(counts).normalized()
    }

    fn normalize(&self, text: &str) -> String {
        let mut normalized = String::with_capacity(text.len());

        for c in text.chars() {
            let keep = c.is_alphabetic()
                || c.is_whitespace()
                || (c.is_numeric() && self.config.keep_numbers)
                || (!c.is_alphanumeric() && self.config.keep_punctuation);

            if !keep {
                normalized.push(' ');
            } else if self.config.lowercase {
                normalized.extend(c.to_lowercase());
            } else {
                normalized.push(c);
            }
        }

        normalized.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn word_ngrams(&self, normalized: &str) -> Vec<String> {
        let tokens: Vec<&str> = normalized.split_whitespace().collect();

        (1..=self.config.word_ngram_length)
            .flat_map(|n| tokens.windows(n).map(|window| window.join(" ")))
            .collect()
    }

    fn char_ngrams(&self, normalized: &str) -> Vec<String> {
        let n = self.config.char_ngram_length;

        if n == 0 {
            return Vec::new();
        }

        let chars: Vec<char> = std::iter::once(START_MARKER)
            .chain(normalized.chars())
            .chain(std::iter::once(END_MARKER))
            .collect();

        chars
            .windows(n)
            .map(|window| window.iter().collect())
            .collect()
    }
}

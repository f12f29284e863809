use std::path::PathBuf;

/// Tab-delimited sentiment labelled sentences (e.g. the Yelp reviews file)
pub mod labelled;

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// The data file does not exist
    #[error("data file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A line could not be parsed into a record
    #[error("malformed record on line {line}: {reason}")]
    Format {
        /// The 1-based line number in the data file
        line: u64,

        /// What was wrong with the line
        reason: String,
    },

    /// Any other failure while reading the data file
    #[error("unable to read data file: {0}")]
    Io(#[from] std::io::Error),
}

//! Error type shared by the collocation, network, sentiment and topic pipelines.
//!
//! Every run either completes or fails with exactly one [`CorpusError`].
//! The binary maps each variant to its own exit code via
//! [`CorpusError::exit_code`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CorpusError>;

#[derive(Error, Debug)]
pub enum CorpusError {
    /// The data directory (or input file) is missing, or holds no `.txt` files.
    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// A document could not be read as UTF-8 text.
    #[error("Could not decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The keyword has zero occurrences in the corpus (R1 = 0).
    #[error("Keyword not found in corpus: {0:?}")]
    KeywordNotFound(String),

    /// All documents tokenized (or filtered) to nothing.
    #[error("Corpus is empty: no tokens in {0} document(s)")]
    EmptyCorpus(usize),

    /// Malformed input file (e.g. a missing column or an unparsable date).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CorpusError {
    /// Process exit code for this failure category.
    pub fn exit_code(&self) -> i32 {
        match self {
            CorpusError::InputNotFound(_) => 2,
            CorpusError::Decode { .. } => 3,
            CorpusError::EmptyCorpus(_) => 4,
            CorpusError::KeywordNotFound(_) => 5,
            CorpusError::InvalidInput(_) => 6,
            CorpusError::Io(_) | CorpusError::Csv(_) | CorpusError::Json(_) => 1,
        }
    }
}

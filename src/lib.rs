#![forbid(unsafe_code)]
//! # corpus_stats
//!
//! Corpus linguistics helpers behind the `corpus_stats` CLI:
//!
//! - **Collocates**: every context window of ±w tokens around a keyword is
//!   collected, collocates are counted into a 2×2 contingency table and scored
//!   by pointwise mutual information `ln(O11 / (R1·C1 / N))`.
//! - **Entity networks**: capitalized name mentions that share a text are
//!   linked, and nodes are ranked by degree, betweenness and eigenvector
//!   centrality.
//! - **Sentiment**: headlines are scored against a word lexicon, averaged per
//!   publish date and smoothed with weekly and monthly rolling means.
//! - **Topics**: episode transcripts are fitted with a seeded LDA model, and
//!   the run reports perplexity, coherence and the topic mix per episode.
//!
//! ## Example
//! ```
//! use corpus_stats::{CollocationOptions, Corpus, analyze_collocates};
//!
//! let corpus = Corpus::from_texts(["the cat sat on the mat the cat ran"]);
//! let opts = CollocationOptions { window_size: 1, ..Default::default() };
//! let result = analyze_collocates(&corpus, "cat", &opts).unwrap();
//! assert_eq!(result.records[0].collocate, "the");
//! assert_eq!(result.records[0].raw_frequency, 2);
//! ```

use std::path::{Path, PathBuf};

use log::info;

pub mod collocation;
pub mod corpus;
pub mod error;
pub mod network;
pub mod report;
pub mod rolling;
pub mod sentiment;
pub mod tokenize;
pub mod topics;

pub use collocation::{
    CollocateCounts, CollocationOptions, CollocationResult, ContingencyTable, O12Mode, ScoreRecord,
    SortOrder, analyze_collocates, build_contingency, concordances, expected_frequency, score,
    sort_records,
};
pub use corpus::{Corpus, LoadOptions, collect_text_files, load_corpus, print_failed_files};
pub use error::{CorpusError, Result};
pub use network::{
    Edge, EntityGraph, EntityNetwork, NetworkOptions, NodeCentrality, analyze_network,
    build_network, centrality, count_edges, extract_entities, read_texts, write_network,
};
pub use report::{ExportFormat, ReportOptions, output_path, write_report, write_report_to};
pub use rolling::rolling_mean;
pub use sentiment::{
    DailyPolarity, Lexicon, SentimentOptions, analyze_sentiment, daily_polarity, read_headlines,
    write_polarity,
};
pub use tokenize::{lowercase_all, tokenize};
pub use topics::{
    BagOfWords, Episode, LdaModel, TopicOptions, TopicReport, analyze_topics, content_words,
    format_topics, model_topics, read_episodes, write_topics,
};

/// Outcome of [`collocates_from_dir`].
#[derive(Debug, Clone)]
pub struct CollocateRun {
    /// Where the report was written.
    pub output: PathBuf,
    pub result: CollocationResult,
    /// Files skipped as unreadable, as `(path, reason)`.
    pub failed_files: Vec<(String, String)>,
}

/// Load the `.txt` corpus in `data_dir`, score collocates of `keyword` and
/// write the report into `out_dir`.
pub fn collocates_from_dir(
    data_dir: &Path,
    keyword: &str,
    out_dir: &Path,
    load: &LoadOptions,
    opts: &CollocationOptions,
    report: &ReportOptions,
) -> Result<CollocateRun> {
    let corpus = load_corpus(data_dir, load)?;
    let result = analyze_collocates(&corpus, keyword, opts)?;
    let output = output_path(out_dir, &result.keyword, opts.window_size, report.format);
    write_report(&result, report, &output)?;
    info!("Wrote {} collocate(s) to {}", result.records.len(), output.display());
    Ok(CollocateRun {
        output,
        result,
        failed_files: corpus.failed_files().to_vec(),
    })
}

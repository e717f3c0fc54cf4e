#![forbid(unsafe_code)]
//! # corpus_stats CLI
//!
//! Command-line interface for the `corpus_stats` crate.
//!
//! ## Collocates
//! Scores every word found within ±N tokens of a keyword by mutual information
//! and writes `<out-dir>/<keyword>_<N>.csv`:
//! ```bash
//! cargo run --release -- collocates whale --window-size 5 --data-dir data/
//! ```
//!
//! ## Entity network
//! Links capitalized names that appear in the same text and writes an edge
//! list plus a centrality table:
//! ```bash
//! cargo run --release -- network --data-path data/fake_or_real_news.csv --min-weight 2
//! ```
//!
//! ## Sentiment
//! Scores news headlines, averages them per publish date and writes the
//! daily series with weekly and monthly smoothing:
//! ```bash
//! cargo run --release -- sentiment --data-path data/abcnews-date-text.csv --sample-num 10000
//! ```
//!
//! ## Topics
//! Fits an LDA topic model over episode transcripts:
//! ```bash
//! cargo run --release -- topics --data-path data/all_series_lines.json --topic-num 12
//! ```
//!
//! Set `RUST_LOG=info` for progress output. See `--help` for all options.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use corpus_stats::{
    CollocationOptions, ExportFormat, LoadOptions, NetworkOptions, O12Mode, ReportOptions,
    SentimentOptions, SortOrder, TopicOptions, analyze_network, analyze_sentiment,
    analyze_topics, collocates_from_dir, print_failed_files,
};
use log::error;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Calculate collocates for a keyword, scored by mutual information
    Collocates {
        /// The keyword to look for (case-insensitive)
        keyword: String,

        /// Number of words on both sides of the keyword to look for collocates in
        #[arg(short, long, default_value_t = 5)]
        window_size: usize,

        /// Only read the first N text files (sorted by name)
        #[arg(short, long)]
        sample_num: Option<usize>,

        /// Directory containing the .txt files to analyze
        #[arg(short, long, default_value = "./data/")]
        data_dir: PathBuf,

        /// Directory the report is written to
        #[arg(short, long, default_value = "output")]
        out_dir: PathBuf,

        /// Output format for export (csv, tsv, json)
        #[arg(long, default_value = "csv")]
        export_format: ExportFormat,

        /// Row order: none (discovery order), mi, frequency
        #[arg(long, default_value = "none")]
        sort: SortOrder,

        /// Derive O12 from keyword windows lacking the collocate instead of R1 - O11
        #[arg(long, default_value_t = false)]
        strict_o12: bool,

        /// Append O12, O21, C1, R1 and N columns to the report
        #[arg(long, default_value_t = false)]
        contingency: bool,

        /// Skip files that are not valid UTF-8 instead of aborting
        #[arg(long, default_value_t = false)]
        skip_unreadable: bool,
    },

    /// Build a weighted co-occurrence network of named entities
    Network {
        /// CSV file with a `text` column (and a `label` column unless --all-labels)
        #[arg(short, long, default_value = "./data/fake_or_real_news.csv")]
        data_path: PathBuf,

        /// Keep only edges that occur more often than this
        #[arg(short = 'w', long, default_value_t = 0)]
        min_weight: usize,

        /// Only use rows with this label
        #[arg(long, default_value = "REAL")]
        label: String,

        /// Use every row regardless of label
        #[arg(long, default_value_t = false)]
        all_labels: bool,

        /// Pair repeated mentions of the same name (self-loop edges)
        #[arg(long, default_value_t = false)]
        self_loops: bool,

        /// Directory the edge list and centrality table are written to
        #[arg(short, long, default_value = "output")]
        out_dir: PathBuf,
    },

    /// Track mean headline polarity through time
    Sentiment {
        /// CSV file with `publish_date` (YYYYMMDD) and `headline_text` columns
        #[arg(short, long, default_value = "./data/abcnews-date-text.csv")]
        data_path: PathBuf,

        /// Only score the first N headlines
        #[arg(short, long)]
        sample_num: Option<usize>,

        /// JSON object of word scores (-5..5) to use instead of the built-in lexicon
        #[arg(long)]
        lexicon: Option<PathBuf>,

        /// Directory the polarity series is written to
        #[arg(short, long, default_value = "output")]
        out_dir: PathBuf,
    },

    /// Fit LDA topics over episode transcripts
    Topics {
        /// JSON file shaped series -> episode -> character -> [lines]
        #[arg(short, long, default_value = "./data/all_series_lines.json")]
        data_path: PathBuf,

        /// Number of topics to identify
        #[arg(short, long, default_value_t = 12)]
        topic_num: usize,

        /// Gibbs sampling sweeps
        #[arg(long, default_value_t = 200)]
        iterations: usize,

        /// Document-topic prior
        #[arg(long, default_value_t = 0.1)]
        alpha: f64,

        /// Topic-word prior
        #[arg(long, default_value_t = 0.01)]
        beta: f64,

        /// Random seed for the sampler
        #[arg(long, default_value_t = 420)]
        seed: u64,

        /// Episodes per rolling window of the smoothed topic prevalence
        #[arg(long, default_value_t = 20)]
        rolling_window: usize,

        /// Directory the metrics and topic tables are written to
        #[arg(short, long, default_value = "output")]
        out_dir: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Collocates {
            keyword,
            window_size,
            sample_num,
            data_dir,
            out_dir,
            export_format,
            sort,
            strict_o12,
            contingency,
            skip_unreadable,
        } => {
            let load = LoadOptions {
                sample_num,
                skip_unreadable,
            };
            let opts = CollocationOptions {
                window_size,
                o12_mode: if strict_o12 {
                    O12Mode::Strict
                } else {
                    O12Mode::Compat
                },
                sort,
            };
            let report = ReportOptions {
                format: export_format,
                contingency,
            };
            match collocates_from_dir(&data_dir, &keyword, &out_dir, &load, &opts, &report) {
                Ok(run) => {
                    println!("Data written to: {}", run.output.display());
                    if !run.failed_files.is_empty() {
                        print_failed_files(&run.failed_files);
                    }
                }
                Err(e) => {
                    error!("Error: {}", e);
                    process::exit(e.exit_code());
                }
            }
        }
        Command::Network {
            data_path,
            min_weight,
            label,
            all_labels,
            self_loops,
            out_dir,
        } => {
            let opts = NetworkOptions {
                label: (!all_labels).then_some(label),
                min_weight,
                self_loops,
            };
            match analyze_network(&data_path, &out_dir, &opts) {
                Ok((edges, nodes)) => {
                    println!("Edges written to: {}", edges.display());
                    println!("Centrality written to: {}", nodes.display());
                }
                Err(e) => {
                    error!("Error: {}", e);
                    process::exit(e.exit_code());
                }
            }
        }
        Command::Sentiment {
            data_path,
            sample_num,
            lexicon,
            out_dir,
        } => {
            let opts = SentimentOptions {
                sample_num,
                lexicon,
            };
            match analyze_sentiment(&data_path, &out_dir, &opts) {
                Ok(path) => println!("Data written to: {}", path.display()),
                Err(e) => {
                    error!("Error: {}", e);
                    process::exit(e.exit_code());
                }
            }
        }
        Command::Topics {
            data_path,
            topic_num,
            iterations,
            alpha,
            beta,
            seed,
            rolling_window,
            out_dir,
        } => {
            let opts = TopicOptions {
                num_topics: topic_num,
                iterations,
                alpha,
                beta,
                seed,
                rolling_window,
                ..Default::default()
            };
            match analyze_topics(&data_path, &out_dir, &opts) {
                Ok(paths) => {
                    for path in paths {
                        println!("Data written to: {}", path.display());
                    }
                }
                Err(e) => {
                    error!("Error: {}", e);
                    process::exit(e.exit_code());
                }
            }
        }
    }
}

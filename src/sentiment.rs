//! Headline sentiment through time.
//!
//! Each headline is scored against a word lexicon (scores -5..=5, scaled to
//! -1..=1), headline scores are averaged per publish date, and the daily
//! series is smoothed with 7- and 30-row rolling means.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use log::info;
use serde::Deserialize;

use crate::error::{CorpusError, Result};
use crate::rolling::rolling_mean;
use crate::tokenize::tokenize;

static BUILTIN: LazyLock<Lexicon> = LazyLock::new(|| {
    let raw = include_str!("sentiment_lexicon.json");
    let scores: HashMap<String, i32> =
        serde_json::from_str(raw).expect("valid sentiment lexicon");
    Lexicon::from_scores(scores)
});

/// Largest absolute lexicon score.
const SCORE_SCALE: f64 = 5.0;
/// A negator up to this many tokens back flips a word's sign.
const NEGATION_SPAN: usize = 3;

pub const WEEKLY_WINDOW: usize = 7;
pub const MONTHLY_WINDOW: usize = 30;

#[derive(Debug, Clone, Default)]
pub struct SentimentOptions {
    /// Only score the first N headlines.
    pub sample_num: Option<usize>,
    /// JSON object of word scores replacing the built-in lexicon.
    pub lexicon: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct HeadlineRow {
    publish_date: String,
    headline_text: String,
}

/// Word-level sentiment scores.
#[derive(Debug, Clone)]
pub struct Lexicon {
    scores: HashMap<String, i32>,
}

impl Lexicon {
    /// Keys are lowercased on the way in.
    pub fn from_scores(scores: HashMap<String, i32>) -> Self {
        let scores = scores
            .into_iter()
            .map(|(w, s)| (w.to_lowercase(), s))
            .collect();
        Lexicon { scores }
    }

    /// The lexicon compiled into the binary.
    pub fn builtin() -> &'static Lexicon {
        &BUILTIN
    }

    /// Read a JSON object mapping words to integer scores.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CorpusError::InputNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let scores: HashMap<String, i32> = serde_json::from_str(&raw)?;
        Ok(Self::from_scores(scores))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    fn score(&self, word: &str) -> i32 {
        self.scores.get(word).copied().unwrap_or(0)
    }

    ///Polarity of `text` in -1..=1: the mean scaled score of its lexicon words.
    ///A negator within the three preceding tokens flips a word's sign. Text with no scored words
    ///has polarity 0.
    /// # Example
    /// ```
    /// use corpus_stats::Lexicon;
    /// let lex = Lexicon::builtin();
    /// assert!(lex.polarity("Council wins award") > 0.0);
    /// assert!(lex.polarity("Council does not win award") < lex.polarity("Council wins award"));
    /// assert_eq!(lex.polarity("council meets tuesday"), 0.0);
    /// ```
    pub fn polarity(&self, text: &str) -> f64 {
        let tokens: Vec<String> = tokenize(text)
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect();
        let mut total = 0.0;
        let mut scored = 0usize;
        for (i, tok) in tokens.iter().enumerate() {
            let base = self.score(tok);
            if base == 0 {
                continue;
            }
            let negated = (1..=NEGATION_SPAN).any(|k| i >= k && is_negator(&tokens[i - k]));
            let s = if negated { -base } else { base };
            total += f64::from(s) / SCORE_SCALE;
            scored += 1;
        }
        if scored == 0 {
            0.0
        } else {
            (total / scored as f64).clamp(-1.0, 1.0)
        }
    }
}

// contractions arrive split at the apostrophe ("isn't" -> "isn", "t")
fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "nor"
            | "cannot"
            | "without"
            | "isn"
            | "aren"
            | "wasn"
            | "weren"
            | "don"
            | "doesn"
            | "didn"
            | "hasn"
            | "haven"
            | "hadn"
            | "couldn"
            | "shouldn"
            | "wouldn"
    )
}

/// Mean headline polarity of one publish date, with its smoothed values.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPolarity {
    pub date: NaiveDate,
    pub headlines: usize,
    pub polarity: f64,
    pub weekly: Option<f64>,
    pub monthly: Option<f64>,
}

/// Read `(publish_date, headline_text)` pairs; dates are `YYYYMMDD`.
pub fn read_headlines(
    path: &Path,
    sample_num: Option<usize>,
) -> Result<Vec<(NaiveDate, String)>> {
    if !path.is_file() {
        return Err(CorpusError::InputNotFound(path.to_path_buf()));
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    for col in ["publish_date", "headline_text"] {
        if !headers.iter().any(|h| h == col) {
            return Err(CorpusError::InvalidInput(format!(
                "{} has no `{col}` column",
                path.display()
            )));
        }
    }

    let limit = sample_num.unwrap_or(usize::MAX);
    let mut headlines = Vec::new();
    for (i, row) in rdr.deserialize::<HeadlineRow>().take(limit).enumerate() {
        let row = row?;
        let date = NaiveDate::parse_from_str(row.publish_date.trim(), "%Y%m%d").map_err(|e| {
            CorpusError::InvalidInput(format!(
                "row {}: bad publish_date {:?}: {e}",
                i + 1,
                row.publish_date
            ))
        })?;
        headlines.push((date, row.headline_text));
    }
    info!("Read {} headline(s) from {}", headlines.len(), path.display());
    Ok(headlines)
}

/// Average polarity per date (ascending) and smooth the daily series.
///
/// The rolling windows count rows, not calendar days, so dates with no
/// headlines do not pad the window.
pub fn daily_polarity(
    headlines: &[(NaiveDate, String)],
    lexicon: &Lexicon,
) -> Vec<DailyPolarity> {
    let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for (date, text) in headlines {
        let entry = by_date.entry(*date).or_insert((0.0, 0));
        entry.0 += lexicon.polarity(text);
        entry.1 += 1;
    }
    let means: Vec<f64> = by_date.values().map(|(sum, n)| sum / *n as f64).collect();
    let weekly = rolling_mean(&means, WEEKLY_WINDOW);
    let monthly = rolling_mean(&means, MONTHLY_WINDOW);

    by_date
        .into_iter()
        .zip(means)
        .zip(weekly.into_iter().zip(monthly))
        .map(|(((date, (_, headlines)), polarity), (weekly, monthly))| DailyPolarity {
            date,
            headlines,
            polarity,
            weekly,
            monthly,
        })
        .collect()
}

/// Write the daily series as `date,headlines,polarity,weekly,monthly`.
/// Smoothed cells without a full window are left empty.
pub fn write_polarity(days: &[DailyPolarity], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));
    wtr.write_record(["date", "headlines", "polarity", "weekly", "monthly"])?;
    for d in days {
        wtr.serialize((
            d.date.format("%Y-%m-%d").to_string(),
            d.headlines,
            d.polarity,
            d.weekly,
            d.monthly,
        ))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Score the headlines in `data_path` and write `polarity_scores.csv` into
/// `out_dir`.
pub fn analyze_sentiment(
    data_path: &Path,
    out_dir: &Path,
    opts: &SentimentOptions,
) -> Result<PathBuf> {
    let custom;
    let lexicon = match &opts.lexicon {
        Some(path) => {
            custom = Lexicon::from_path(path)?;
            &custom
        }
        None => Lexicon::builtin(),
    };
    let headlines = read_headlines(data_path, opts.sample_num)?;
    let days = daily_polarity(&headlines, lexicon);
    info!("{} day(s) from {} headline(s)", days.len(), headlines.len());

    let path = out_dir.join("polarity_scores.csv");
    write_polarity(&days, &path)?;
    Ok(path)
}

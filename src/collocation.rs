//! Keyword collocates scored by pointwise mutual information.
//!
//! The pipeline is: find every keyword occurrence, cut a ±w context window
//! around it ([`concordances`]), count collocates into a 2×2 contingency
//! table per collocate ([`build_contingency`]) and turn the counts into
//! `ln(O11 / E11)` with `E11 = R1·C1 / N` ([`score`]).

use std::collections::HashMap;

use clap::ValueEnum;
use log::{debug, info};

use crate::corpus::Corpus;
use crate::error::{CorpusError, Result};

/// How O12 (keyword occurrences without the collocate) is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum O12Mode {
    /// `R1 - O11`, mixing per-occurrence counts with per-window counts.
    #[default]
    Compat,
    /// Number of keyword windows that do not contain the collocate at all.
    Strict,
}

/// Row order of the score report.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum SortOrder {
    /// Order in which collocates were first seen in the windows.
    #[default]
    #[value(name = "none")]
    Discovery,
    /// Descending mutual information.
    #[value(name = "mi")]
    MutualInformation,
    /// Descending raw co-occurrence frequency.
    Frequency,
}

#[derive(Debug, Clone)]
pub struct CollocationOptions {
    pub window_size: usize,
    pub o12_mode: O12Mode,
    pub sort: SortOrder,
}

impl Default for CollocationOptions {
    fn default() -> Self {
        CollocationOptions {
            window_size: 5,
            o12_mode: O12Mode::default(),
            sort: SortOrder::default(),
        }
    }
}

/// Contingency counts for one collocate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollocateCounts {
    pub collocate: String,
    /// Co-occurrences with the keyword (every window position counts).
    pub o11: usize,
    /// Keyword occurrences without this collocate. Negative in compat mode
    /// when the collocate fills more window slots than there are keywords.
    pub o12: i64,
    /// `C1 - O11`. Negative when overlapping windows count one position twice.
    pub o21: i64,
    /// Total occurrences of the collocate in the corpus.
    pub c1: usize,
}

/// Per-collocate counts plus the keyword-level marginals, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContingencyTable {
    /// R1: keyword occurrences in the corpus.
    pub r1: usize,
    /// N: corpus size in tokens.
    pub n: usize,
    pub rows: Vec<CollocateCounts>,
}

/// One output row.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub collocate: String,
    pub raw_frequency: usize,
    pub mi: f64,
    pub o12: i64,
    pub o21: i64,
    pub c1: usize,
}

/// Outcome of one collocation run.
#[derive(Debug, Clone)]
pub struct CollocationResult {
    pub keyword: String,
    pub window_size: usize,
    pub r1: usize,
    pub n: usize,
    pub concordance_count: usize,
    pub records: Vec<ScoreRecord>,
}

///Context windows around every occurrence of `keyword`.
///Each window holds up to `window` tokens on each side, fewer at the corpus edges, with the
///anchor occurrence removed. Other occurrences of the keyword inside a window are kept.
/// # Example
/// ```
/// use corpus_stats::concordances;
/// let tokens: Vec<String> = "a b cat c d".split(' ').map(String::from).collect();
/// assert_eq!(concordances(&tokens, "cat", 1), vec![vec!["b", "c"]]);
/// ```
pub fn concordances<'a>(tokens: &'a [String], keyword: &str, window: usize) -> Vec<Vec<&'a str>> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| *t == keyword)
        .map(|(i, _)| {
            let start = i.saturating_sub(window);
            let end = i.saturating_add(window).saturating_add(1).min(tokens.len());
            // anchor sits at local index min(window, i); skip it by position
            tokens[start..i]
                .iter()
                .chain(&tokens[i + 1..end])
                .map(String::as_str)
                .collect()
        })
        .collect()
}

#[derive(Default)]
struct Accumulator<'a> {
    order: Vec<&'a str>,
    o11: HashMap<&'a str, usize>,
    windows_with: HashMap<&'a str, usize>,
}

impl<'a> Accumulator<'a> {
    fn add_window(mut self, window: &[&'a str]) -> Self {
        let mut seen: Vec<&str> = Vec::new();
        for &token in window {
            let count = self.o11.entry(token).or_insert_with(|| {
                self.order.push(token);
                0
            });
            *count += 1;
            if !seen.contains(&token) {
                seen.push(token);
                *self.windows_with.entry(token).or_insert(0) += 1;
            }
        }
        self
    }
}

/// Count O11/O12/O21/C1 for every collocate seen in `concordances`.
///
/// R1 is the keyword's corpus count and N the corpus length.
pub fn build_contingency(
    concordances: &[Vec<&str>],
    corpus: &Corpus,
    keyword: &str,
    mode: O12Mode,
) -> ContingencyTable {
    let acc = concordances
        .iter()
        .fold(Accumulator::default(), |acc, w| acc.add_window(w));

    let mut corpus_counts: HashMap<&str, usize> = HashMap::new();
    for token in corpus.tokens() {
        *corpus_counts.entry(token.as_str()).or_insert(0) += 1;
    }
    let r1 = corpus_counts.get(keyword).copied().unwrap_or(0);

    let rows = acc
        .order
        .iter()
        .map(|&collocate| {
            let o11 = acc.o11[collocate];
            let c1 = corpus_counts.get(collocate).copied().unwrap_or(0);
            let o12 = match mode {
                O12Mode::Compat => signed_diff(r1, o11),
                O12Mode::Strict => signed_diff(r1, acc.windows_with[collocate]),
            };
            CollocateCounts {
                collocate: collocate.to_string(),
                o11,
                o12,
                o21: signed_diff(c1, o11),
                c1,
            }
        })
        .collect();

    ContingencyTable {
        r1,
        n: corpus.len(),
        rows,
    }
}

fn signed_diff(a: usize, b: usize) -> i64 {
    a as i64 - b as i64
}

/// Expected co-occurrence frequency under independence: `R1·C1 / N`.
pub fn expected_frequency(r1: usize, c1: usize, n: usize) -> f64 {
    (r1 as f64 * c1 as f64) / n as f64
}

/// Turn a contingency table into score records, keeping row order.
///
/// Fails with [`CorpusError::KeywordNotFound`] when R1 is zero, since the
/// expected frequency would be zero.
pub fn score(table: &ContingencyTable, keyword: &str) -> Result<Vec<ScoreRecord>> {
    if table.r1 == 0 || table.n == 0 {
        return Err(CorpusError::KeywordNotFound(keyword.to_string()));
    }
    Ok(table
        .rows
        .iter()
        .map(|row| {
            let expected = expected_frequency(table.r1, row.c1, table.n);
            ScoreRecord {
                collocate: row.collocate.clone(),
                raw_frequency: row.o11,
                mi: (row.o11 as f64 / expected).ln(),
                o12: row.o12,
                o21: row.o21,
                c1: row.c1,
            }
        })
        .collect())
}

/// Sort records in place. Ties keep discovery order.
pub fn sort_records(records: &mut [ScoreRecord], order: SortOrder) {
    match order {
        SortOrder::Discovery => {}
        SortOrder::MutualInformation => records.sort_by(|a, b| b.mi.total_cmp(&a.mi)),
        SortOrder::Frequency => records.sort_by(|a, b| b.raw_frequency.cmp(&a.raw_frequency)),
    }
}

/// Run the full collocation analysis for `keyword` over `corpus`.
///
/// The keyword is lowercased before matching. An empty corpus yields
/// [`CorpusError::EmptyCorpus`]; a keyword that never occurs yields
/// [`CorpusError::KeywordNotFound`].
pub fn analyze_collocates(
    corpus: &Corpus,
    keyword: &str,
    opts: &CollocationOptions,
) -> Result<CollocationResult> {
    if corpus.is_empty() {
        return Err(CorpusError::EmptyCorpus(corpus.document_count()));
    }
    let keyword = keyword.to_lowercase();

    let concs = concordances(corpus.tokens(), &keyword, opts.window_size);
    if concs.is_empty() {
        return Err(CorpusError::KeywordNotFound(keyword));
    }
    debug!(
        "{} concordance line(s) for {:?} with window {}",
        concs.len(),
        keyword,
        opts.window_size
    );

    let table = build_contingency(&concs, corpus, &keyword, opts.o12_mode);
    let mut records = score(&table, &keyword)?;
    sort_records(&mut records, opts.sort);
    info!(
        "{} collocate(s) for {:?} (R1 = {}, N = {})",
        records.len(),
        keyword,
        table.r1,
        table.n
    );

    Ok(CollocationResult {
        keyword,
        window_size: opts.window_size,
        r1: table.r1,
        n: table.n,
        concordance_count: concs.len(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAT_MAT: &str = "the cat sat on the mat the cat ran";

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn row<'a>(t: &'a ContingencyTable, c: &str) -> &'a CollocateCounts {
        t.rows.iter().find(|r| r.collocate == c).unwrap()
    }

    #[test]
    fn cat_mat_concordances() {
        let tokens = toks(CAT_MAT);
        let concs = concordances(&tokens, "cat", 1);
        assert_eq!(concs, vec![vec!["the", "sat"], vec!["the", "ran"]]);
    }

    #[test]
    fn cat_mat_contingency_and_mi() {
        let corpus = Corpus::from_texts([CAT_MAT]);
        let concs = concordances(corpus.tokens(), "cat", 1);
        let t = build_contingency(&concs, &corpus, "cat", O12Mode::Compat);

        assert_eq!(t.r1, 2);
        assert_eq!(t.n, 9);
        let order: Vec<&str> = t.rows.iter().map(|r| r.collocate.as_str()).collect();
        assert_eq!(order, ["the", "sat", "ran"]);

        let the = row(&t, "the");
        assert_eq!((the.o11, the.o12, the.o21, the.c1), (2, 0, 1, 3));
        let sat = row(&t, "sat");
        assert_eq!((sat.o11, sat.o12, sat.o21, sat.c1), (1, 1, 0, 1));

        let records = score(&t, "cat").unwrap();
        assert_eq!(records.len(), 3);
        // the: ln(2 / (2*3/9)) = ln(3)
        assert!((records[0].mi - 3f64.ln()).abs() < 1e-12);
        // sat: ln(1 / (2*1/9)) = ln(4.5)
        assert!((records[1].mi - 4.5f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn window_at_corpus_start_removes_the_anchor_not_a_neighbour() {
        let tokens = toks("cat a b c d");
        assert_eq!(concordances(&tokens, "cat", 3), vec![vec!["a", "b", "c"]]);

        let tokens = toks("x cat a b c");
        assert_eq!(concordances(&tokens, "cat", 3), vec![vec!["x", "a", "b", "c"]]);
    }

    #[test]
    fn window_at_corpus_end_is_truncated() {
        let tokens = toks("a b c cat");
        assert_eq!(concordances(&tokens, "cat", 2), vec![vec!["b", "c"]]);
    }

    #[test]
    fn other_keyword_occurrences_stay_in_window() {
        let tokens = toks("cat cat dog");
        let concs = concordances(&tokens, "cat", 1);
        assert_eq!(concs, vec![vec!["cat"], vec!["cat", "dog"]]);
    }

    #[test]
    fn window_zero_gives_empty_windows() {
        let tokens = toks(CAT_MAT);
        let concs = concordances(&tokens, "cat", 0);
        assert_eq!(concs.len(), 2);
        assert!(concs.iter().all(Vec::is_empty));
    }

    #[test]
    fn huge_window_does_not_overflow() {
        let tokens = toks("a cat b");
        let concs = concordances(&tokens, "cat", usize::MAX);
        assert_eq!(concs, vec![vec!["a", "b"]]);
    }

    #[test]
    fn marginals_are_consistent() {
        let corpus = Corpus::from_texts([
            "the whale and the sea and the whale again, the old whale sang",
            "a whale is a whale is a whale",
        ]);
        for mode in [O12Mode::Compat, O12Mode::Strict] {
            let concs = concordances(corpus.tokens(), "whale", 2);
            let t = build_contingency(&concs, &corpus, "whale", mode);
            let window_total: usize = concs.iter().map(Vec::len).sum();
            let o11_total: usize = t.rows.iter().map(|r| r.o11).sum();
            assert_eq!(window_total, o11_total);
            for r in &t.rows {
                assert_eq!(r.o11 as i64 + r.o21, r.c1 as i64, "{}", r.collocate);
                if mode == O12Mode::Compat {
                    assert_eq!(r.o11 as i64 + r.o12, t.r1 as i64, "{}", r.collocate);
                }
            }
        }
    }

    #[test]
    fn strict_o12_counts_windows_without_collocate() {
        // "a" appears twice in the first window, never in the second
        let corpus = Corpus::from_texts(["a cat a x y z cat b"]);
        let concs = concordances(corpus.tokens(), "cat", 1);
        let compat = build_contingency(&concs, &corpus, "cat", O12Mode::Compat);
        let strict = build_contingency(&concs, &corpus, "cat", O12Mode::Strict);
        assert_eq!(row(&compat, "a").o11, 2);
        assert_eq!(row(&compat, "a").o12, 0);
        assert_eq!(row(&strict, "a").o12, 1);
        assert_eq!(row(&strict, "b").o12, 1);
    }

    #[test]
    fn overlapping_windows_can_push_o21_below_zero() {
        let corpus = Corpus::from_texts(["cat x cat"]);
        let concs = concordances(corpus.tokens(), "cat", 1);
        let t = build_contingency(&concs, &corpus, "cat", O12Mode::Compat);
        let x = row(&t, "x");
        assert_eq!((x.o11, x.c1, x.o21, x.o12), (2, 1, -1, 0));
    }

    #[test]
    fn keyword_absent_is_reported() {
        let corpus = Corpus::from_texts([CAT_MAT]);
        let err = analyze_collocates(&corpus, "dog", &CollocationOptions::default()).unwrap_err();
        assert!(matches!(err, CorpusError::KeywordNotFound(k) if k == "dog"));
    }

    #[test]
    fn empty_corpus_is_reported() {
        let corpus = Corpus::from_texts(["", "  ..."]);
        let err = analyze_collocates(&corpus, "cat", &CollocationOptions::default()).unwrap_err();
        assert!(matches!(err, CorpusError::EmptyCorpus(2)));
    }

    #[test]
    fn keyword_is_matched_case_insensitively() {
        let corpus = Corpus::from_texts(["The CAT sat. A Cat ran."]);
        let r = analyze_collocates(
            &corpus,
            "Cat",
            &CollocationOptions {
                window_size: 1,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(r.keyword, "cat");
        assert_eq!(r.r1, 2);
        assert_eq!(r.concordance_count, 2);
    }

    #[test]
    fn sorting_by_mi_and_frequency() {
        let corpus = Corpus::from_texts([CAT_MAT]);
        let mut opts = CollocationOptions {
            window_size: 1,
            sort: SortOrder::MutualInformation,
            ..Default::default()
        };
        let by_mi = analyze_collocates(&corpus, "cat", &opts).unwrap();
        let names: Vec<&str> = by_mi.records.iter().map(|r| r.collocate.as_str()).collect();
        // sat and ran tie on MI and keep discovery order
        assert_eq!(names, ["sat", "ran", "the"]);

        opts.sort = SortOrder::Frequency;
        let by_freq = analyze_collocates(&corpus, "cat", &opts).unwrap();
        let names: Vec<&str> = by_freq.records.iter().map(|r| r.collocate.as_str()).collect();
        assert_eq!(names, ["the", "sat", "ran"]);
    }
}

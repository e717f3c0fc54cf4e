//! LDA topic modeling over episode transcripts.
//!
//! The input JSON nests `series -> episode -> character -> [lines]`. Every
//! episode becomes one document, named `<series>_<second word of the episode
//! title>`. Documents are reduced to lowercase alphabetic content words, a
//! seeded collapsed Gibbs sampler fits the topics, and the run reports
//! perplexity, UMass coherence, the top words per topic and the per-episode
//! topic mix (raw and rolling-mean smoothed).

use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use crate::error::{CorpusError, Result};
use crate::rolling::rolling_mean;
use crate::tokenize::tokenize;

const STOPWORDS: &[&str] = &[
    "about", "after", "again", "all", "also", "and", "any", "are", "aren", "back", "because",
    "been", "before", "being", "but", "can", "come", "could", "did", "didn", "does", "doesn",
    "doing", "don", "down", "each", "even", "for", "from", "get", "going", "got", "had", "has",
    "have", "having", "her", "here", "hers", "him", "his", "how", "into", "isn", "its", "just",
    "know", "let", "like", "may", "might", "more", "most", "much", "must", "not", "now", "off",
    "one", "only", "other", "our", "out", "over", "own", "really", "right", "said", "same", "say",
    "see", "she", "should", "some", "such", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "those", "through", "too", "under", "until", "very", "want",
    "was", "wasn", "way", "well", "were", "what", "when", "where", "which", "while", "who", "why",
    "will", "with", "won", "would", "yes", "yet", "you", "your", "yours",
];

/// Words shorter than this are dropped.
const MIN_WORD_LEN: usize = 3;
/// Keeps the UMass log finite for word pairs that never share a document.
const UMASS_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct TopicOptions {
    pub num_topics: usize,
    /// Gibbs sweeps over the whole corpus.
    pub iterations: usize,
    /// Document-topic prior.
    pub alpha: f64,
    /// Topic-word prior.
    pub beta: f64,
    pub seed: u64,
    /// Words listed per topic in the summary.
    pub top_words: usize,
    /// Rolling window (in episodes) for the smoothed topic prevalence.
    pub rolling_window: usize,
}

impl Default for TopicOptions {
    fn default() -> Self {
        TopicOptions {
            num_topics: 12,
            iterations: 200,
            alpha: 0.1,
            beta: 0.01,
            seed: 420,
            top_words: 10,
            rolling_window: 20,
        }
    }
}

/// One episode's concatenated lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub key: String,
    pub text: String,
}

fn invalid(msg: impl Into<String>) -> CorpusError {
    CorpusError::InvalidInput(msg.into())
}

/// Flatten the series/episode/character JSON into one document per episode,
/// in file order. A repeated episode key keeps its first position and takes
/// the later text.
pub fn read_episodes(path: &Path) -> Result<Vec<Episode>> {
    if !path.is_file() {
        return Err(CorpusError::InputNotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path)?;
    let root: Value = serde_json::from_str(&raw)?;
    let series_map = root
        .as_object()
        .ok_or_else(|| invalid("top level must be an object of series"))?;

    let mut episodes: Vec<Episode> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (series_name, series) in series_map {
        let series = series
            .as_object()
            .ok_or_else(|| invalid(format!("series {series_name:?} must be an object")))?;
        for (episode_name, characters) in series {
            let characters = characters.as_object().ok_or_else(|| {
                invalid(format!("episode {episode_name:?} must be an object"))
            })?;
            let mut text = String::new();
            for lines in characters.values() {
                let lines = lines.as_array().ok_or_else(|| {
                    invalid(format!("lines in {episode_name:?} must be an array"))
                })?;
                let joined = lines
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" ");
                if !joined.is_empty() {
                    text.push(' ');
                    text.push_str(&joined);
                }
            }
            let suffix = episode_name
                .split_whitespace()
                .nth(1)
                .unwrap_or(episode_name.as_str());
            let key = format!("{series_name}_{suffix}");
            match index.get(&key) {
                Some(&i) => episodes[i].text = text,
                None => {
                    index.insert(key.clone(), episodes.len());
                    episodes.push(Episode { key, text });
                }
            }
        }
    }
    info!("Read {} episode(s) from {}", episodes.len(), path.display());
    Ok(episodes)
}

///Lowercase alphabetic content words of `text`: at least three letters, stopwords removed.
/// # Example
/// ```
/// use corpus_stats::content_words;
/// let words = content_words("The Captain's log, stardate 41153");
/// assert_eq!(words, vec!["captain", "log", "stardate"]);
/// ```
pub fn content_words(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() >= MIN_WORD_LEN && t.chars().all(char::is_alphabetic))
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Documents as word ids over a shared vocabulary (ids in first-seen order).
#[derive(Debug, Clone, Default)]
pub struct BagOfWords {
    pub vocab: Vec<String>,
    pub docs: Vec<Vec<usize>>,
}

impl BagOfWords {
    pub fn from_tokens(token_docs: &[Vec<String>]) -> Self {
        let mut ids: HashMap<&str, usize> = HashMap::new();
        let mut vocab = Vec::new();
        let docs: Vec<Vec<usize>> = token_docs
            .iter()
            .map(|doc| {
                doc.iter()
                    .map(|w| {
                        *ids.entry(w.as_str()).or_insert_with(|| {
                            vocab.push(w.clone());
                            vocab.len() - 1
                        })
                    })
                    .collect()
            })
            .collect();
        BagOfWords { vocab, docs }
    }

    pub fn token_count(&self) -> usize {
        self.docs.iter().map(Vec::len).sum()
    }
}

/// A fitted topic model.
#[derive(Debug, Clone)]
pub struct LdaModel {
    /// `topic_word[k][w]`: probability of word `w` under topic `k`.
    pub topic_word: Vec<Vec<f64>>,
    /// `doc_topic[d][k]`: share of topic `k` in document `d`.
    pub doc_topic: Vec<Vec<f64>>,
}

impl LdaModel {
    /// Collapsed Gibbs sampling with symmetric priors.
    pub fn fit(bow: &BagOfWords, opts: &TopicOptions) -> Result<Self> {
        let k = opts.num_topics;
        if k == 0 {
            return Err(invalid("number of topics must be at least 1"));
        }
        if !(opts.alpha > 0.0 && opts.beta > 0.0) {
            return Err(invalid("alpha and beta must be positive"));
        }
        let v = bow.vocab.len();
        let vbeta = v as f64 * opts.beta;
        let mut rng = StdRng::seed_from_u64(opts.seed);

        let mut word_topic = vec![vec![0usize; k]; v];
        let mut doc_topic = vec![vec![0usize; k]; bow.docs.len()];
        let mut topic_total = vec![0usize; k];
        let mut assign: Vec<Vec<usize>> = bow
            .docs
            .iter()
            .enumerate()
            .map(|(d, doc)| {
                doc.iter()
                    .map(|&w| {
                        let t = rng.random_range(0..k);
                        word_topic[w][t] += 1;
                        doc_topic[d][t] += 1;
                        topic_total[t] += 1;
                        t
                    })
                    .collect()
            })
            .collect();

        let mut weights = vec![0.0f64; k];
        for sweep in 0..opts.iterations {
            for (d, doc) in bow.docs.iter().enumerate() {
                for (i, &w) in doc.iter().enumerate() {
                    let old = assign[d][i];
                    word_topic[w][old] -= 1;
                    doc_topic[d][old] -= 1;
                    topic_total[old] -= 1;

                    let mut total = 0.0;
                    for (t, weight) in weights.iter_mut().enumerate() {
                        total += (doc_topic[d][t] as f64 + opts.alpha)
                            * (word_topic[w][t] as f64 + opts.beta)
                            / (topic_total[t] as f64 + vbeta);
                        *weight = total;
                    }
                    let u = rng.random::<f64>() * total;
                    let new = weights.iter().position(|&c| u < c).unwrap_or(k - 1);

                    word_topic[w][new] += 1;
                    doc_topic[d][new] += 1;
                    topic_total[new] += 1;
                    assign[d][i] = new;
                }
            }
            if (sweep + 1) % 50 == 0 {
                debug!("Gibbs sweep {}/{}", sweep + 1, opts.iterations);
            }
        }

        let topic_word = (0..k)
            .map(|t| {
                let denom = topic_total[t] as f64 + vbeta;
                (0..v)
                    .map(|w| (word_topic[w][t] as f64 + opts.beta) / denom)
                    .collect()
            })
            .collect();
        let kalpha = k as f64 * opts.alpha;
        let doc_topic = bow
            .docs
            .iter()
            .zip(&doc_topic)
            .map(|(doc, counts)| {
                counts
                    .iter()
                    .map(|&c| (c as f64 + opts.alpha) / (doc.len() as f64 + kalpha))
                    .collect()
            })
            .collect();
        Ok(LdaModel {
            topic_word,
            doc_topic,
        })
    }

    pub fn num_topics(&self) -> usize {
        self.topic_word.len()
    }

    /// Word ids of `topic` by descending probability (ties by id), at most `n`.
    pub fn top_word_ids(&self, topic: usize, n: usize) -> Vec<usize> {
        let probs = &self.topic_word[topic];
        let mut ids: Vec<usize> = (0..probs.len()).collect();
        ids.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]).then(a.cmp(&b)));
        ids.truncate(n);
        ids
    }

    /// `(word, probability)` pairs for the top `n` words of `topic`.
    pub fn top_words<'a>(
        &self,
        vocab: &'a [String],
        topic: usize,
        n: usize,
    ) -> Vec<(&'a str, f64)> {
        self.top_word_ids(topic, n)
            .into_iter()
            .map(|w| (vocab[w].as_str(), self.topic_word[topic][w]))
            .collect()
    }

    /// Per-word log likelihood of `bow` under the model (negative; higher is
    /// better).
    pub fn log_perplexity(&self, bow: &BagOfWords) -> f64 {
        let tokens = bow.token_count();
        if tokens == 0 {
            return 0.0;
        }
        let mut ll = 0.0;
        for (d, doc) in bow.docs.iter().enumerate() {
            for &w in doc {
                let p: f64 = (0..self.num_topics())
                    .map(|t| self.doc_topic[d][t] * self.topic_word[t][w])
                    .sum();
                ll += p.ln();
            }
        }
        ll / tokens as f64
    }

    /// Mean UMass coherence over topics, using document co-occurrence of each
    /// topic's top `n` words. Closer to 0 is better.
    pub fn umass_coherence(&self, bow: &BagOfWords, n: usize) -> f64 {
        if self.num_topics() == 0 {
            return 0.0;
        }
        let doc_sets: Vec<HashSet<usize>> = bow
            .docs
            .iter()
            .map(|d| d.iter().copied().collect())
            .collect();
        let doc_freq = |w: usize| doc_sets.iter().filter(|s| s.contains(&w)).count();
        let co_freq = |a: usize, b: usize| {
            doc_sets
                .iter()
                .filter(|s| s.contains(&a) && s.contains(&b))
                .count()
        };

        let mut sum = 0.0;
        for t in 0..self.num_topics() {
            let top = self.top_word_ids(t, n);
            let mut score = 0.0;
            for m in 1..top.len() {
                for l in 0..m {
                    let df = doc_freq(top[l]);
                    if df > 0 {
                        let co = co_freq(top[m], top[l]) as f64;
                        score += ((co + UMASS_EPSILON) / df as f64).ln();
                    }
                }
            }
            sum += score;
        }
        sum / self.num_topics() as f64
    }
}

/// Everything one topic run produces.
#[derive(Debug, Clone)]
pub struct TopicReport {
    pub episodes: Vec<String>,
    pub vocab: Vec<String>,
    pub model: LdaModel,
    pub log_perplexity: f64,
    /// `exp(-log_perplexity)`; lower is better.
    pub perplexity: f64,
    pub coherence: f64,
}

/// Fit topics over `episodes`.
pub fn model_topics(episodes: &[Episode], opts: &TopicOptions) -> Result<TopicReport> {
    let token_docs: Vec<Vec<String>> = episodes.iter().map(|e| content_words(&e.text)).collect();
    let bow = BagOfWords::from_tokens(&token_docs);
    if bow.token_count() == 0 {
        return Err(CorpusError::EmptyCorpus(episodes.len()));
    }
    info!(
        "Fitting {} topic(s) over {} episode(s), {} token(s), {} word type(s)",
        opts.num_topics,
        episodes.len(),
        bow.token_count(),
        bow.vocab.len()
    );
    let model = LdaModel::fit(&bow, opts)?;
    let log_perplexity = model.log_perplexity(&bow);
    let coherence = model.umass_coherence(&bow, opts.top_words);
    Ok(TopicReport {
        episodes: episodes.iter().map(|e| e.key.clone()).collect(),
        perplexity: (-log_perplexity).exp(),
        log_perplexity,
        coherence,
        vocab: bow.vocab,
        model,
    })
}

/// One line per topic: `(0, '0.054*"ship" + 0.032*"captain" + ...')`.
pub fn format_topics(report: &TopicReport, n: usize) -> String {
    let mut out = String::new();
    for t in 0..report.model.num_topics() {
        let words = report
            .model
            .top_words(&report.vocab, t, n)
            .iter()
            .map(|(w, p)| format!("{p:.3}*\"{w}\""))
            .collect::<Vec<_>>()
            .join(" + ");
        out.push_str(&format!("({t}, '{words}')\n"));
    }
    out
}

fn csv_writer(path: &Path) -> Result<csv::Writer<BufWriter<std::fs::File>>> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    Ok(csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file)))
}

fn topic_header(k: usize) -> Vec<String> {
    std::iter::once("episode".to_string())
        .chain((0..k).map(|t| format!("topic_{t}")))
        .collect()
}

fn share_row<I>(key: &str, shares: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<f64>>,
{
    std::iter::once(key.to_string())
        .chain(
            shares
                .into_iter()
                .map(|s| s.map(|v| v.to_string()).unwrap_or_default()),
        )
        .collect()
}

/// Write `metrics_and_topics.txt`, `document_topics.csv` and
/// `topic_prevalence.csv` into `out_dir`; returns the paths in that order.
pub fn write_topics(
    report: &TopicReport,
    opts: &TopicOptions,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    let k = report.model.num_topics();

    let summary_path = out_dir.join("metrics_and_topics.txt");
    let summary = format!(
        "Log perplexity: {}\nPerplexity: {}\nCoherence Score: {}\n\n{}",
        report.log_perplexity,
        report.perplexity,
        report.coherence,
        format_topics(report, opts.top_words)
    );
    fs::write(&summary_path, summary)?;

    let doc_path = out_dir.join("document_topics.csv");
    let mut wtr = csv_writer(&doc_path)?;
    wtr.write_record(topic_header(k))?;
    for (key, shares) in report.episodes.iter().zip(&report.model.doc_topic) {
        wtr.write_record(share_row(key, shares.iter().copied().map(Some)))?;
    }
    wtr.flush()?;

    // smooth each topic's series across episodes, then transpose back to rows
    let smoothed: Vec<Vec<Option<f64>>> = (0..k)
        .map(|t| {
            let series: Vec<f64> = report.model.doc_topic.iter().map(|d| d[t]).collect();
            rolling_mean(&series, opts.rolling_window)
        })
        .collect();
    let prevalence_path = out_dir.join("topic_prevalence.csv");
    let mut wtr = csv_writer(&prevalence_path)?;
    wtr.write_record(topic_header(k))?;
    for (d, key) in report.episodes.iter().enumerate() {
        wtr.write_record(share_row(key, smoothed.iter().map(|s| s[d])))?;
    }
    wtr.flush()?;

    Ok(vec![summary_path, doc_path, prevalence_path])
}

/// Read episodes from `data_path`, fit topics and write the outputs.
pub fn analyze_topics(
    data_path: &Path,
    out_dir: &Path,
    opts: &TopicOptions,
) -> Result<Vec<PathBuf>> {
    let episodes = read_episodes(data_path)?;
    let report = model_topics(&episodes, opts)?;
    info!(
        "Log perplexity {:.4}, UMass coherence {:.4}",
        report.log_perplexity, report.coherence
    );
    write_topics(&report, opts, out_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIP: &str = "warp engine shield phaser torpedo starship reactor warp engine shield";
    const FOOD: &str = "bread butter cheese soup pasta garlic tomato bread butter cheese";

    fn episode(key: &str, text: &str) -> Episode {
        Episode {
            key: key.into(),
            text: text.into(),
        }
    }

    fn two_themes() -> Vec<Episode> {
        (0..6)
            .map(|i| {
                let text = if i % 2 == 0 { SHIP } else { FOOD };
                episode(&format!("S_{i}"), &text.repeat(3))
            })
            .collect()
    }

    fn small(num_topics: usize) -> TopicOptions {
        TopicOptions {
            num_topics,
            iterations: 100,
            top_words: 5,
            rolling_window: 2,
            ..Default::default()
        }
    }

    fn dominant(shares: &[f64]) -> usize {
        (0..shares.len())
            .max_by(|&a, &b| shares[a].total_cmp(&shares[b]))
            .unwrap()
    }

    #[test]
    fn episodes_are_keyed_by_series_and_number() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("lines.json");
        fs::write(
            &path,
            r#"{"TNG": {"episode 1": {"PICARD": ["Engage.", "Make it so."], "DATA": []},
                        "episode 2": {"RIKER": ["Aye."]}},
                "DS9": {"episode 1": {"SISKO": ["Hold."]}}}"#,
        )
        .unwrap();
        let eps = read_episodes(&path).unwrap();
        assert_eq!(
            eps,
            vec![
                episode("TNG_1", " Engage. Make it so."),
                episode("TNG_2", " Aye."),
                episode("DS9_1", " Hold."),
            ]
        );
    }

    #[test]
    fn malformed_episode_json_is_invalid_input() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("lines.json");
        fs::write(&path, r#"{"TNG": ["not", "episodes"]}"#).unwrap();
        let err = read_episodes(&path).unwrap_err();
        assert!(matches!(err, CorpusError::InvalidInput(_)));

        let err = read_episodes(&td.path().join("none.json")).unwrap_err();
        assert!(matches!(err, CorpusError::InputNotFound(_)));
    }

    #[test]
    fn content_words_drop_short_numeric_and_stopwords() {
        let words = content_words("We are going to the Bridge at 0900, ok? Red alert!");
        assert_eq!(words, vec!["bridge", "red", "alert"]);
    }

    #[test]
    fn bag_of_words_ids_follow_first_sighting() {
        let docs = vec![
            vec!["ship".to_string(), "warp".to_string(), "ship".to_string()],
            vec!["warp".to_string(), "bread".to_string()],
        ];
        let bow = BagOfWords::from_tokens(&docs);
        assert_eq!(bow.vocab, ["ship", "warp", "bread"]);
        assert_eq!(bow.docs, vec![vec![0, 1, 0], vec![1, 2]]);
        assert_eq!(bow.token_count(), 5);
    }

    #[test]
    fn distributions_are_normalized() {
        let report = model_topics(&two_themes(), &small(3)).unwrap();
        for row in report.model.doc_topic.iter().chain(&report.model.topic_word) {
            let total: f64 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "sum {total}");
        }
        assert!(report.log_perplexity < 0.0);
        assert!(report.perplexity > 1.0);
        assert!(report.coherence < 1e-9);
    }

    #[test]
    fn disjoint_themes_get_separate_topics() {
        let report = model_topics(&two_themes(), &small(2)).unwrap();
        let topics: Vec<usize> = report.model.doc_topic.iter().map(|d| dominant(d)).collect();
        assert!(topics.iter().step_by(2).all(|&t| t == topics[0]));
        assert!(topics.iter().skip(1).step_by(2).all(|&t| t == topics[1]));
        assert_ne!(topics[0], topics[1]);

        let ship_words: Vec<&str> = report
            .model
            .top_words(&report.vocab, topics[0], 3)
            .into_iter()
            .map(|(w, _)| w)
            .collect();
        assert!(ship_words.iter().all(|w| SHIP.contains(w)), "{ship_words:?}");
    }

    #[test]
    fn same_seed_same_model() {
        let a = model_topics(&two_themes(), &small(2)).unwrap();
        let b = model_topics(&two_themes(), &small(2)).unwrap();
        assert_eq!(a.model.doc_topic, b.model.doc_topic);
        assert_eq!(a.model.topic_word, b.model.topic_word);
    }

    #[test]
    fn no_content_words_is_empty_corpus() {
        let eps = vec![episode("A_1", "and the of 42"), episode("A_2", "")];
        let err = model_topics(&eps, &small(2)).unwrap_err();
        assert!(matches!(err, CorpusError::EmptyCorpus(2)));

        let err = model_topics(&two_themes(), &small(0)).unwrap_err();
        assert!(matches!(err, CorpusError::InvalidInput(_)));
    }

    #[test]
    fn write_topics_outputs() {
        let td = tempfile::tempdir().unwrap();
        let opts = small(2);
        let report = model_topics(&two_themes(), &opts).unwrap();
        let paths = write_topics(&report, &opts, td.path()).unwrap();

        let summary = fs::read_to_string(&paths[0]).unwrap();
        assert!(summary.starts_with("Log perplexity: -"));
        assert!(summary.contains("\nCoherence Score: "));
        assert!(summary.contains("(0, '0."));
        assert!(summary.contains("(1, '0."));

        let docs = fs::read_to_string(&paths[1]).unwrap();
        let mut lines = docs.lines();
        assert_eq!(lines.next().unwrap(), "episode,topic_0,topic_1");
        assert!(lines.next().unwrap().starts_with("S_0,"));
        assert_eq!(docs.lines().count(), 7);

        let prevalence = fs::read_to_string(&paths[2]).unwrap();
        let rows: Vec<&str> = prevalence.lines().collect();
        assert_eq!(rows[1], "S_0,,");
        assert!(!rows[2].ends_with(",,"));
    }
}

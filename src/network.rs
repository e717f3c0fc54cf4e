//! Entity co-occurrence networks.
//!
//! Named entities are guessed from capitalization (runs of Title-case words
//! not broken by punctuation). Every pair of mentions within one text adds
//! one to the weight of the undirected edge between the two names. After
//! filtering light edges, the graph is held in a `petgraph` [`UnGraph`] and
//! each node gets degree, betweenness and eigenvector centrality.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fs::{self, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, info, warn};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CorpusError, Result};

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("static pattern is valid"));

/// Capitalized words that start sentences far more often than they name anyone.
const FUNCTION_WORDS: &[&str] = &[
    "The", "A", "An", "And", "But", "Or", "Nor", "If", "Then", "So", "In", "On", "At", "Of", "To",
    "For", "From", "By", "With", "As", "Into", "After", "Before", "When", "While", "Where", "Why",
    "How", "What", "Who", "Which", "This", "That", "These", "Those", "It", "Its", "He", "She",
    "We", "They", "I", "You", "His", "Her", "Their", "Our", "My", "Your", "There", "Here", "Not",
    "No", "Yes", "Mr", "Mrs", "Ms", "Dr",
];

const EIGEN_MAX_ITER: usize = 100;
const EIGEN_TOL: f64 = 1.0e-6;

#[derive(Debug, Clone, Default)]
pub struct NetworkOptions {
    /// Only use rows whose `label` equals this value. `None` uses every row.
    pub label: Option<String>,
    /// Keep edges whose weight is strictly greater than this.
    pub min_weight: usize,
    /// Pair a name with a repeated mention of itself (self-loop edges).
    pub self_loops: bool,
}

#[derive(Debug, Deserialize)]
struct InputRow {
    text: String,
    #[serde(default)]
    label: Option<String>,
}

/// Weighted undirected edge; `node_a <= node_b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    #[serde(rename = "nodeA")]
    pub node_a: String,
    #[serde(rename = "nodeB")]
    pub node_b: String,
    pub weight: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCentrality {
    pub node: String,
    pub degree: usize,
    pub weighted_degree: usize,
    pub degree_centrality: f64,
    pub betweenness: f64,
    pub eigenvector: f64,
}

#[derive(Debug, Clone, Default)]
pub struct EntityNetwork {
    /// Sorted by descending weight, then by names.
    pub edges: Vec<Edge>,
    /// Sorted by descending degree centrality, then by name.
    pub centrality: Vec<NodeCentrality>,
}

/// Read the `text` column of a CSV file, keeping rows that match `label`.
pub fn read_texts(path: &Path, label: Option<&str>) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(CorpusError::InputNotFound(path.to_path_buf()));
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    if !headers.iter().any(|h| h == "text") {
        return Err(CorpusError::InvalidInput(format!(
            "{} has no `text` column",
            path.display()
        )));
    }
    if label.is_some() && !headers.iter().any(|h| h == "label") {
        return Err(CorpusError::InvalidInput(format!(
            "{} has no `label` column to filter on",
            path.display()
        )));
    }

    let mut texts = Vec::new();
    let mut skipped = 0usize;
    for row in rdr.deserialize::<InputRow>() {
        let row = row?;
        match label {
            Some(want) if row.label.as_deref() != Some(want) => skipped += 1,
            _ => texts.push(row.text),
        }
    }
    info!(
        "Read {} text(s) from {} ({} filtered out by label)",
        texts.len(),
        path.display(),
        skipped
    );
    Ok(texts)
}

fn is_name_token(word: &str) -> bool {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_uppercase() || word.chars().count() < 2 {
        return false;
    }
    // acronyms like NASA are not people
    if word.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase) {
        return false;
    }
    !FUNCTION_WORDS.contains(&word)
}

///Guess named entities in `text` from capitalization.
///A mention is a maximal run of capitalized words separated only by whitespace. Acronyms and
///function words break a run. Mentions are returned in order, duplicates included.
/// # Example
/// ```
/// use corpus_stats::extract_entities;
/// let ents = extract_entities("The talks between Hillary Clinton and NASA ended. Clinton left.");
/// assert_eq!(ents, vec!["Hillary Clinton", "Clinton"]);
/// ```
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut mentions = Vec::new();
    let mut run: Vec<&str> = Vec::new();
    let mut last_end = 0;

    for m in WORD.find_iter(text) {
        let gap = &text[last_end..m.start()];
        if !gap.chars().all(char::is_whitespace) && !run.is_empty() {
            mentions.push(run.join(" "));
            run.clear();
        }
        if is_name_token(m.as_str()) {
            run.push(m.as_str());
        } else if !run.is_empty() {
            mentions.push(run.join(" "));
            run.clear();
        }
        last_end = m.end();
    }
    if !run.is_empty() {
        mentions.push(run.join(" "));
    }
    mentions
}

/// Count sorted entity pairs (every 2-combination of mentions) over all texts.
///
/// Two mentions of the same name in one text form a self-loop pair. Those
/// are dropped unless `self_loops` is set; keeping them reproduces a plain
/// combinations-of-mentions edge list.
pub fn count_edges(entity_lists: &[Vec<String>], self_loops: bool) -> Vec<Edge> {
    let mut weights: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for mentions in entity_lists {
        for (i, a) in mentions.iter().enumerate() {
            for b in &mentions[i + 1..] {
                if a == b && !self_loops {
                    continue;
                }
                let key = if a <= b {
                    (a.as_str(), b.as_str())
                } else {
                    (b.as_str(), a.as_str())
                };
                *weights.entry(key).or_insert(0) += 1;
            }
        }
    }
    let mut edges: Vec<Edge> = weights
        .into_iter()
        .map(|((a, b), weight)| Edge {
            node_a: a.to_string(),
            node_b: b.to_string(),
            weight,
        })
        .collect();
    // BTreeMap order already sorts by names; stable sort keeps it for ties
    edges.sort_by(|x, y| y.weight.cmp(&x.weight));
    edges
}

/// Undirected entity graph with a name lookup.
#[derive(Debug, Clone)]
pub struct EntityGraph {
    pub graph: UnGraph<String, usize>,
    pub name_to_node: HashMap<String, NodeIndex>,
}

impl EntityGraph {
    /// Build the graph; nodes are added in name order so indices are stable.
    pub fn from_edges(edges: &[Edge]) -> Self {
        let names: BTreeSet<&str> = edges
            .iter()
            .flat_map(|e| [e.node_a.as_str(), e.node_b.as_str()])
            .collect();
        let mut graph = UnGraph::new_undirected();
        let mut name_to_node = HashMap::new();
        for name in names {
            let idx = graph.add_node(name.to_string());
            name_to_node.insert(name.to_string(), idx);
        }
        for e in edges {
            let a = name_to_node[&e.node_a];
            let b = name_to_node[&e.node_b];
            graph.add_edge(a, b, e.weight);
        }
        EntityGraph {
            graph,
            name_to_node,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Edge endpoints per node; a self-loop counts twice.
    fn degrees(&self) -> (Vec<usize>, Vec<usize>) {
        let n = self.node_count();
        let mut degree = vec![0; n];
        let mut weighted = vec![0; n];
        for e in self.graph.edge_references() {
            for v in [e.source().index(), e.target().index()] {
                degree[v] += 1;
                weighted[v] += *e.weight();
            }
        }
        (degree, weighted)
    }

    fn degree_centrality(&self, degree: &[usize]) -> Vec<f64> {
        let n = self.node_count();
        if n <= 1 {
            return vec![1.0; n];
        }
        let s = 1.0 / (n - 1) as f64;
        degree.iter().map(|&d| d as f64 * s).collect()
    }

    /// Brandes' algorithm on unweighted shortest paths.
    pub fn betweenness(&self) -> Vec<f64> {
        let n = self.node_count();
        let mut cb = vec![0.0; n];
        for s in self.graph.node_indices() {
            let mut stack = Vec::with_capacity(n);
            let mut preds: Vec<Vec<NodeIndex>> = vec![Vec::new(); n];
            let mut sigma = vec![0.0f64; n];
            let mut dist: Vec<Option<usize>> = vec![None; n];
            sigma[s.index()] = 1.0;
            dist[s.index()] = Some(0);
            let mut queue = VecDeque::from([s]);
            while let Some(v) = queue.pop_front() {
                stack.push(v);
                let dv = dist[v.index()].unwrap_or(0);
                for w in self.graph.neighbors(v) {
                    if dist[w.index()].is_none() {
                        dist[w.index()] = Some(dv + 1);
                        queue.push_back(w);
                    }
                    if dist[w.index()] == Some(dv + 1) {
                        sigma[w.index()] += sigma[v.index()];
                        preds[w.index()].push(v);
                    }
                }
            }
            let mut delta = vec![0.0f64; n];
            while let Some(w) = stack.pop() {
                for &v in &preds[w.index()] {
                    delta[v.index()] +=
                        sigma[v.index()] / sigma[w.index()] * (1.0 + delta[w.index()]);
                }
                if w != s {
                    cb[w.index()] += delta[w.index()];
                }
            }
        }
        // each pair is seen from both ends
        if n > 2 {
            let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
            cb.iter_mut().for_each(|c| *c *= scale);
        }
        cb
    }

    /// Power iteration on `A + I`, L2-normalized. Returns the estimate and
    /// whether it converged within `max_iter` rounds.
    pub fn eigenvector(&self, max_iter: usize) -> (Vec<f64>, bool) {
        let n = self.node_count();
        if n == 0 {
            return (Vec::new(), true);
        }
        let mut x = vec![1.0 / n as f64; n];
        for iter in 0..max_iter {
            let last = x.clone();
            for e in self.graph.edge_references() {
                let (a, b) = (e.source().index(), e.target().index());
                x[b] += last[a];
                if a != b {
                    x[a] += last[b];
                }
            }
            let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
            let norm = if norm == 0.0 { 1.0 } else { norm };
            x.iter_mut().for_each(|v| *v /= norm);
            let err: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
            if err < n as f64 * EIGEN_TOL {
                debug!("Eigenvector centrality converged after {} iteration(s)", iter + 1);
                return (x, true);
            }
        }
        (x, false)
    }
}

/// Centrality measures for every node of the graph spanned by `edges`.
pub fn centrality(edges: &[Edge]) -> Vec<NodeCentrality> {
    let g = EntityGraph::from_edges(edges);
    let (degree, weighted) = g.degrees();
    let degree_c = g.degree_centrality(&degree);
    let between = g.betweenness();
    let (eigen, converged) = g.eigenvector(EIGEN_MAX_ITER);
    if !converged {
        warn!(
            "Eigenvector centrality did not converge in {} iterations; using last estimate",
            EIGEN_MAX_ITER
        );
    }

    let mut nodes: Vec<NodeCentrality> = g
        .graph
        .node_indices()
        .map(|v| {
            let i = v.index();
            NodeCentrality {
                node: g.graph[v].clone(),
                degree: degree[i],
                weighted_degree: weighted[i],
                degree_centrality: degree_c[i],
                betweenness: between[i],
                eigenvector: eigen[i],
            }
        })
        .collect();
    nodes.sort_by(|a, b| b.degree_centrality.total_cmp(&a.degree_centrality));
    nodes
}

/// Build the filtered network from raw texts.
pub fn build_network<S: AsRef<str>>(texts: &[S], opts: &NetworkOptions) -> EntityNetwork {
    let entity_lists: Vec<Vec<String>> = texts
        .iter()
        .map(|t| extract_entities(t.as_ref()))
        .collect();
    let mentions: usize = entity_lists.iter().map(Vec::len).sum();
    let edges: Vec<Edge> = count_edges(&entity_lists, opts.self_loops)
        .into_iter()
        .filter(|e| e.weight > opts.min_weight)
        .collect();
    info!(
        "{} mention(s), {} edge(s) with weight > {}",
        mentions,
        edges.len(),
        opts.min_weight
    );
    let centrality = centrality(&edges);
    EntityNetwork { edges, centrality }
}

/// Read `data_path`, build the network and write `edgelist.csv` and
/// `centrality.csv` into `out_dir`. Returns both paths.
pub fn analyze_network(
    data_path: &Path,
    out_dir: &Path,
    opts: &NetworkOptions,
) -> Result<(PathBuf, PathBuf)> {
    let texts = read_texts(data_path, opts.label.as_deref())?;
    let net = build_network(&texts, opts);
    write_network(&net, out_dir)
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

/// Write edge list and centrality table as CSV.
pub fn write_network(net: &EntityNetwork, out_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(out_dir)?;

    let edge_path = out_dir.join("edgelist.csv");
    let mut wtr = csv_writer(&edge_path)?;
    wtr.write_record(["nodeA", "nodeB", "weight"])?;
    for e in &net.edges {
        wtr.serialize(e)?;
    }
    wtr.flush()?;

    let node_path = out_dir.join("centrality.csv");
    let mut wtr = csv_writer(&node_path)?;
    wtr.write_record([
        "node",
        "degree",
        "weighted_degree",
        "degree_centrality",
        "betweenness",
        "eigenvector",
    ])?;
    for c in &net.centrality {
        wtr.serialize(c)?;
    }
    wtr.flush()?;

    Ok((edge_path, node_path))
}

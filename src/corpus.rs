//! Document discovery and corpus construction.
//!
//! A [`Corpus`] is the lowercased concatenation of every document's tokens in
//! file-name order. Document boundaries are not kept, so context windows may
//! run from the end of one file into the start of the next.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{CorpusError, Result};
use crate::tokenize::{lowercase_all, tokenize};

/// Options controlling which documents are read.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Read at most this many files (after sorting). `None` reads all.
    pub sample_num: Option<usize>,
    /// Skip undecodable files with a warning instead of aborting the run.
    pub skip_unreadable: bool,
}

/// Immutable token sequence built from one or more documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    tokens: Vec<String>,
    documents: usize,
    failed_files: Vec<(String, String)>,
}

impl Corpus {
    /// Build a corpus from in-memory document texts, in order.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens = Vec::new();
        let mut documents = 0;
        for text in texts {
            tokens.extend(tokenize(text.as_ref()));
            documents += 1;
        }
        Corpus {
            tokens: lowercase_all(tokens),
            documents,
            failed_files: Vec::new(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// N: total token count, keyword occurrences included.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of documents that contributed tokens (or were read but empty).
    pub fn document_count(&self) -> usize {
        self.documents
    }

    /// Files skipped under [`LoadOptions::skip_unreadable`], as `(path, reason)`.
    pub fn failed_files(&self) -> &[(String, String)] {
        &self.failed_files
    }

    /// Occurrences of `token` anywhere in the corpus.
    pub fn count(&self, token: &str) -> usize {
        self.tokens.iter().filter(|t| *t == token).count()
    }
}

/// Collect the `.txt` files directly inside `dir`, sorted by file name.
///
/// Fails with [`CorpusError::InputNotFound`] if `dir` is not a directory or
/// holds no matching files.
pub fn collect_text_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CorpusError::InputNotFound(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        // resolves symlinks; dangling links are not files
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        return Err(CorpusError::InputNotFound(dir.to_path_buf()));
    }
    Ok(files)
}

/// Read the `.txt` documents of `dir` and build the corpus.
pub fn load_corpus(dir: &Path, opts: &LoadOptions) -> Result<Corpus> {
    let mut files = collect_text_files(dir)?;
    if let Some(n) = opts.sample_num {
        files.truncate(n);
    }
    info!("Reading {} document(s) from {}", files.len(), dir.display());

    let mut texts = Vec::with_capacity(files.len());
    let mut failed_files = Vec::new();
    for path in &files {
        match fs::read_to_string(path) {
            Ok(text) => {
                debug!("Read {} ({} bytes)", path.display(), text.len());
                texts.push(text);
            }
            Err(source) if opts.skip_unreadable => {
                warn!("Skipping {}: {}", path.display(), source);
                failed_files.push((path.display().to_string(), source.to_string()));
            }
            Err(source) => {
                return Err(CorpusError::Decode {
                    path: path.clone(),
                    source,
                });
            }
        }
    }

    let mut corpus = Corpus::from_texts(&texts);
    corpus.failed_files = failed_files;
    info!(
        "Corpus holds {} tokens from {} document(s)",
        corpus.len(),
        corpus.document_count()
    );
    Ok(corpus)
}

/// Print skipped files to stderr.
pub fn print_failed_files(failed: &[(String, String)]) {
    eprintln!("\nWarning: The following files could not be read:");
    for (f, e) in failed {
        eprintln!("  {f}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn concatenates_and_lowercases_documents_in_order() {
        let c = Corpus::from_texts(["The Cat", "sat. THE end"]);
        assert_eq!(c.tokens(), ["the", "cat", "sat", "the", "end"]);
        assert_eq!(c.len(), 5);
        assert_eq!(c.document_count(), 2);
        assert_eq!(c.count("the"), 2);
        assert_eq!(c.count("dog"), 0);
    }

    #[test]
    fn missing_directory_is_input_not_found() {
        let td = tempdir().unwrap();
        let err = collect_text_files(&td.path().join("nope")).unwrap_err();
        assert!(matches!(err, CorpusError::InputNotFound(_)));
    }

    #[test]
    fn directory_without_txt_files_is_input_not_found() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("notes.md"), "cat").unwrap();
        let err = collect_text_files(td.path()).unwrap_err();
        assert!(matches!(err, CorpusError::InputNotFound(_)));
    }

    #[test]
    fn files_are_sorted_and_sampled() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("b.txt"), "second").unwrap();
        fs::write(td.path().join("a.txt"), "first").unwrap();
        fs::write(td.path().join("c.txt"), "third").unwrap();
        fs::create_dir(td.path().join("sub")).unwrap();
        fs::write(td.path().join("sub").join("d.txt"), "nested").unwrap();

        let all = load_corpus(td.path(), &LoadOptions::default()).unwrap();
        assert_eq!(all.tokens(), ["first", "second", "third"]);

        let opts = LoadOptions {
            sample_num: Some(2),
            ..Default::default()
        };
        let sampled = load_corpus(td.path(), &opts).unwrap();
        assert_eq!(sampled.tokens(), ["first", "second"]);
    }

    #[test]
    fn invalid_utf8_aborts_unless_skipping() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("a.txt"), "good text").unwrap();
        fs::write(td.path().join("b.txt"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let err = load_corpus(td.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, CorpusError::Decode { .. }));

        let opts = LoadOptions {
            skip_unreadable: true,
            ..Default::default()
        };
        let corpus = load_corpus(td.path(), &opts).unwrap();
        assert_eq!(corpus.tokens(), ["good", "text"]);
        assert_eq!(corpus.failed_files().len(), 1);
        assert!(corpus.failed_files()[0].0.ends_with("b.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_text_files_are_read() {
        let td = tempdir().unwrap();
        let elsewhere = tempdir().unwrap();
        let target = elsewhere.path().join("real.txt");
        fs::write(&target, "linked words").unwrap();
        fs::write(td.path().join("a.txt"), "plain").unwrap();
        std::os::unix::fs::symlink(&target, td.path().join("b.txt")).unwrap();
        std::os::unix::fs::symlink(td.path().join("gone"), td.path().join("c.txt")).unwrap();

        let files = collect_text_files(td.path()).unwrap();
        assert_eq!(files.len(), 2);
        let corpus = load_corpus(td.path(), &LoadOptions::default()).unwrap();
        assert_eq!(corpus.tokens(), ["plain", "linked", "words"]);
    }
}

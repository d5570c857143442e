// ============================================================
// Layer 4 — Tweet Archive Loader
// ============================================================
// Reads an author's tweets from `<dir>/<author>.txt`, one tweet
// per line, and implements the CorpusSource trait.
//
// Fetching tweets over the network is someone else's job; any
// scraper that drops a text file per author into the archive
// directory feeds this loader.
//
// Handles are normalised before lookup: "@BarackObama" reads
// "barackobama.txt".
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use std::{fs, path::PathBuf};

use crate::data::preprocessor::Preprocessor;
use crate::domain::corpus::EncodedCorpus;
use crate::domain::error::CoreError;
use crate::domain::traits::CorpusSource;
use crate::domain::vocab::{CharVocab, DELIMITER};

pub struct TweetArchive {
    /// Directory holding one `<author>.txt` file per author
    dir: PathBuf,
    preprocessor: Preprocessor,
}

impl TweetArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), preprocessor: Preprocessor::new() }
    }

    /// "@BarackObama " → "barackobama"
    pub fn normalise_handle(author: &str) -> String {
        author.trim().trim_start_matches('@').to_lowercase()
    }

    fn path_for(&self, handle: &str) -> PathBuf {
        self.dir.join(format!("{handle}.txt"))
    }
}

impl CorpusSource for TweetArchive {
    fn fetch(&self, author: &str, vocab: &CharVocab) -> Result<(String, EncodedCorpus), CoreError> {
        let handle = Self::normalise_handle(author);
        if handle.is_empty() || handle.contains(['/', '\\', '.']) {
            return Err(CoreError::data_unavailable(author, "invalid handle"));
        }

        let path = self.path_for(&handle);
        let raw = fs::read_to_string(&path).map_err(|e| {
            CoreError::data_unavailable(&handle, format!("cannot read '{}': {e}", path.display()))
        })?;

        let tweets: Vec<String> = raw
            .lines()
            .map(|line| self.preprocessor.clean(line))
            .filter(|tweet| !tweet.is_empty())
            .collect();

        if tweets.is_empty() {
            return Err(CoreError::data_unavailable(&handle, "archive contains no tweets"));
        }

        let text   = tweets.join(&DELIMITER.to_string());
        let tokens = vocab.encode(&text);

        let dropped = text.chars().count() - tokens.len();
        if dropped > 0 {
            tracing::warn!(
                "Dropped {} characters outside the {}-symbol vocabulary",
                dropped,
                vocab.len()
            );
        }
        if tokens.is_empty() {
            return Err(CoreError::data_unavailable(&handle, "no encodable characters"));
        }

        tracing::info!(
            "Loaded {} tweets for '{}' ({} tokens)",
            tweets.len(),
            handle,
            tokens.len()
        );
        Ok((text, EncodedCorpus::new(tokens)))
    }
}

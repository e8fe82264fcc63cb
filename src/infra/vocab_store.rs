// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Loads (and, for the `build-vocab` command, creates) the
// token → index mapping used by the text tower.
//
// Two on-disk formats are accepted, chosen by extension:
//
//   vocabs.json  — {"hello": 0, "world": 1, ...}
//   vocabs.txt   — one token per line; blank lines are skipped
//                  and index = position among the non-blank lines
//
// Invariant: indices are dense in [0, n). The embedding layer
// shifts every index by +1 so row 0 can be the padding / OOV
// sentinel; a gap or duplicate here would silently alias rows
// there, so it is rejected at load time.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::error::{ModelError, ModelResult};

/// Immutable token → index mapping with dense indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Wrap a mapping, checking that indices cover exactly [0, n).
    pub fn from_map(index: HashMap<String, usize>) -> ModelResult<Self> {
        let n = index.len();
        let mut seen = vec![false; n];
        for (token, &i) in &index {
            if i >= n {
                return Err(ModelError::config(format!(
                    "vocabulary index {i} for '{token}' is outside [0, {n})"
                )));
            }
            if seen[i] {
                return Err(ModelError::config(format!(
                    "vocabulary index {i} is assigned to more than one token"
                )));
            }
            seen[i] = true;
        }
        Ok(Self { index })
    }

    /// Build from tokens in order; position becomes the index.
    pub fn from_tokens<I, S>(tokens: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = HashMap::new();
        for (i, tok) in tokens.into_iter().enumerate() {
            let tok = tok.into();
            if index.insert(tok.clone(), i).is_some() {
                return Err(ModelError::config(format!("duplicate vocabulary token '{tok}'")));
            }
        }
        Ok(Self { index })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.index.iter().map(|(t, &i)| (t.as_str(), i))
    }
}

/// Reads and writes vocabulary files.
pub struct VocabStore {
    path: PathBuf,
}

impl VocabStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the vocabulary. Any I/O, decode or density failure
    /// is reported as a load error against this store's path.
    pub fn load(&self) -> ModelResult<Vocabulary> {
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| ModelError::load(&self.path, e.to_string()))?;

        let vocab = if is_plain_text(&self.path) {
            Vocabulary::from_tokens(raw.lines().map(str::trim).filter(|l| !l.is_empty()))
        } else {
            let map: HashMap<String, usize> = serde_json::from_str(&raw).map_err(|e| {
                ModelError::load(&self.path, format!("not a token -> index mapping: {e}"))
            })?;
            Vocabulary::from_map(map)
        }
        .map_err(|e| ModelError::load(&self.path, e.to_string()))?;

        tracing::info!("Loaded vocabulary of {} tokens from '{}'", vocab.len(), self.path.display());
        Ok(vocab)
    }

    /// Count token frequencies, keep the `max_size` most frequent
    /// (ties broken alphabetically so output is stable) and write
    /// them as JSON. Index 0 goes to the most frequent token.
    pub fn build_and_save<I>(&self, tokens: I, max_size: usize) -> anyhow::Result<Vocabulary>
    where
        I: IntoIterator<Item = String>,
    {
        let mut freq: HashMap<String, usize> = HashMap::new();
        for tok in tokens {
            *freq.entry(tok).or_insert(0) += 1;
        }

        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(max_size);

        let ordered: BTreeMap<&str, usize> = words
            .iter()
            .enumerate()
            .map(|(i, (w, _))| (w.as_str(), i))
            .collect();

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create vocabulary dir '{}'", dir.display()))?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&ordered)?)
            .with_context(|| format!("Cannot write vocabulary to '{}'", self.path.display()))?;

        tracing::info!("Vocabulary of {} tokens saved to '{}'", words.len(), self.path.display());
        Ok(Vocabulary::from_tokens(words.into_iter().map(|(w, _)| w))?)
    }
}

fn is_plain_text(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("txt")
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocabs.json");
        fs::write(&path, r#"{"hello": 0, "world": 1}"#).unwrap();

        let vocab = VocabStore::new(&path).load().unwrap();
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.index_of("world"), Some(1));
        assert_eq!(vocab.index_of("moon"), None);
    }

    #[test]
    fn test_load_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocabs.txt");
        fs::write(&path, "hello\nworld\n\n").unwrap();

        let vocab = VocabStore::new(&path).load().unwrap();
        assert_eq!(vocab.index_of("hello"), Some(0));
        assert_eq!(vocab.index_of("world"), Some(1));
    }

    #[test]
    fn test_plain_text_blank_lines_do_not_take_an_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocabs.txt");
        fs::write(&path, "hello\n\n   \nworld\n").unwrap();

        let vocab = VocabStore::new(&path).load().unwrap();
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.index_of("world"), Some(1));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = VocabStore::new("/definitely/not/here.json").load().unwrap_err();
        assert!(matches!(err, ModelError::Load { .. }));
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn test_garbage_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocabs.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = VocabStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ModelError::Load { .. }));
    }

    #[test]
    fn test_sparse_indices_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocabs.json");
        fs::write(&path, r#"{"hello": 0, "world": 5}"#).unwrap();

        let err = VocabStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ModelError::Load { .. }));
    }

    #[test]
    fn test_duplicate_line_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocabs.txt");
        fs::write(&path, "hello\nhello\n").unwrap();

        assert!(VocabStore::new(&path).load().is_err());
    }

    #[test]
    fn test_build_orders_by_frequency() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("vocabs.json");
        let tokens = ["b", "a", "b", "c", "a", "b"].into_iter().map(String::from);

        let built = VocabStore::new(&path).build_and_save(tokens, 2).unwrap();
        assert_eq!(built.index_of("b"), Some(0));
        assert_eq!(built.index_of("a"), Some(1));
        assert_eq!(built.index_of("c"), None);

        let reloaded = VocabStore::new(&path).load().unwrap();
        assert_eq!(reloaded, built);
    }

    #[test]
    fn test_build_fails_when_dir_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("out");
        fs::write(&blocker, "not a directory").unwrap();

        let tokens = ["a"].into_iter().map(String::from);
        let err = VocabStore::new(blocker.join("vocabs.json"))
            .build_and_save(tokens, 1)
            .unwrap_err();
        assert!(err.to_string().contains("Cannot create vocabulary dir"));
    }
}

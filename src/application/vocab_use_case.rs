// ============================================================
// Layer 2 — BuildVocabUseCase
// ============================================================
// Builds a vocabulary file from the transcripts of a manifest:
//
//   Step 1: Load the manifest              (Layer 4 - data)
//   Step 2: Clean + tokenise transcripts   (Layer 4 - data)
//   Step 3: Rank tokens, write JSON        (Layer 6 - infra)
//
// Tokenisation is the same Preprocessor the dataset uses when
// encoding, so every kept token is reachable at training time.

use anyhow::Result;
use std::path::PathBuf;

use crate::data::{loader::ManifestLoader, preprocessor::Preprocessor};
use crate::domain::traits::RecordSource;
use crate::infra::vocab_store::{VocabStore, Vocabulary};

pub struct BuildVocabUseCase {
    data:     PathBuf,
    output:   PathBuf,
    max_size: usize,
}

impl BuildVocabUseCase {
    pub fn new(data: PathBuf, output: PathBuf, max_size: usize) -> Self {
        Self { data, output, max_size }
    }

    pub fn execute(&self) -> Result<Vocabulary> {
        let records = ManifestLoader::new(&self.data).load_all()?;

        let prep = Preprocessor::new();
        let tokens = records
            .iter()
            .flat_map(|r| prep.tokenize(&r.transcript()));

        let vocab = VocabStore::new(&self.output).build_and_save(tokens, self.max_size)?;
        tracing::info!(
            "Vocabulary of {} tokens written to '{}'",
            vocab.len(),
            self.output.display()
        );
        Ok(vocab)
    }
}

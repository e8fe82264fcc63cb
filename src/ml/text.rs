// ============================================================
// Layer 5 — Text Tower
// ============================================================
// token ids [batch, max_len]
//     │  MaskedEmbedding   (vocab + 1 rows, row 0 = padding/OOV)
//     ▼
// embedded [batch, max_len, embed_dim] + mask
//     │  BiLstm            (128 forward + 128 backward by default)
//     ▼
// hidden states [batch, max_len, 256]   — every step, not just the last
//
// Construction reads the vocabulary file and, optionally, a
// pretrained vector file. Both are read exactly once, here.

use std::path::PathBuf;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::infra::{pretrained::PretrainedVectors, vocab_store::VocabStore};
use crate::ml::embedding::{EmbeddingInit, EmbeddingMatrix, MaskedEmbedding};
use crate::ml::lstm::{BiLstm, BiLstmConfig};

/// Declared shape of the text input.
///
/// `embed_dim` is only set when the caller wants to pin the
/// embedding width; it must then agree with everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextShape {
    pub max_len:   usize,
    pub embed_dim: Option<usize>,
}

impl TextShape {
    pub fn new(max_len: usize) -> Self {
        Self { max_len, embed_dim: None }
    }
}

#[derive(Config, Debug)]
pub struct TextTowerConfig {
    pub text_shape: TextShape,
    /// Vocabulary file (.json or .txt).
    pub vocabs: PathBuf,
    pub embed_dim: Option<usize>,
    /// GloVe-style vector file used to seed the embedding matrix.
    pub pretrained_embed: Option<PathBuf>,
    #[config(default = 128)]
    pub hidden: usize,
    #[config(default = 2021)]
    pub seed: u64,
}

impl TextTowerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<TextTower<B>> {
        let max_len = self.text_shape.max_len;
        if max_len == 0 {
            return Err(ModelError::config("text_shape.max_len must be positive"));
        }
        if self.hidden == 0 {
            return Err(ModelError::config("text hidden width must be positive"));
        }

        let vocab = VocabStore::new(&self.vocabs).load()?;
        if vocab.is_empty() {
            tracing::warn!(
                "Vocabulary '{}' is empty; every token will map to the OOV row",
                self.vocabs.display()
            );
        }

        let init = match &self.pretrained_embed {
            Some(path) => EmbeddingInit::Pretrained(PretrainedVectors::load(path)?),
            None       => EmbeddingInit::Uniform,
        };

        let requested = self.embed_dim.or(self.text_shape.embed_dim);
        let matrix = EmbeddingMatrix::build(&vocab, requested, &init, self.seed)?;
        if let (EmbeddingInit::Pretrained(_), 0) = (&init, matrix.pretrained_hits()) {
            tracing::warn!("No vocabulary token has a pretrained vector; all rows are random");
        }
        drop(init);

        if let Some(pinned) = self.text_shape.embed_dim {
            if pinned != matrix.dim() {
                return Err(ModelError::config(format!(
                    "embedding dimension mismatch: text_shape expects D={pinned}, embedding has D={}",
                    matrix.dim()
                )));
            }
        }

        let embed_dim = matrix.dim();
        let embedding = matrix.into_module(device);
        let encoder = BiLstmConfig::new(embed_dim)
            .with_forward_units(self.hidden)
            .with_backward_units(self.hidden)
            .init(device);

        tracing::info!(
            "Text tower ready: [{}] tokens -> [{}, {}] (vocab {}, D={})",
            max_len,
            max_len,
            encoder.d_output(),
            vocab.len(),
            embed_dim
        );

        Ok(TextTower { embedding, encoder, max_len })
    }
}

/// Per-step contextual encoding of a transcript.
#[derive(Debug, Clone)]
pub struct TextEncoding<B: Backend> {
    /// `[batch, max_len, 2 * hidden]`
    pub states: Tensor<B, 3>,
    /// `[batch, max_len]`, 1.0 where a real token was present.
    pub mask: Tensor<B, 2>,
}

#[derive(Module, Debug)]
pub struct TextTower<B: Backend> {
    pub embedding: MaskedEmbedding<B>,
    pub encoder:   BiLstm<B>,
    max_len:       usize,
}

impl<B: Backend> TextTower<B> {
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Width of each output step.
    pub fn d_output(&self) -> usize {
        self.encoder.d_output()
    }

    pub fn check_input(&self, tokens: &Tensor<B, 2, Int>) -> ModelResult<()> {
        let [_, len] = tokens.dims();
        if len != self.max_len {
            return Err(ModelError::config(format!(
                "transcript batch has length {len}, model expects max_len={}",
                self.max_len
            )));
        }
        Ok(())
    }

    /// tokens: `[batch, max_len]` → states `[batch, max_len, d_output]`
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> TextEncoding<B> {
        let embedded = self.embedding.forward(tokens);
        let states = self.encoder.forward(embedded.values, embedded.mask.clone());
        TextEncoding { states, mask: embedded.mask }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use std::fs;

    type TestBackend = NdArray;

    struct Fixture {
        _dir:    tempfile::TempDir,
        vocabs:  PathBuf,
        vectors: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let vocabs = dir.path().join("vocabs.json");
        let vectors = dir.path().join("vectors.txt");
        fs::write(&vocabs, r#"{"hello": 0, "world": 1}"#).unwrap();
        fs::write(&vectors, "world 0.1 0.2 0.3 0.4\nmoon 1 1 1 1\n").unwrap();
        Fixture { _dir: dir, vocabs, vectors }
    }

    fn weights(tower: &TextTower<TestBackend>) -> Vec<f32> {
        tower.embedding.embedding.weight.val().into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_pretrained_tower_shapes() {
        let fx = fixture();
        let tower = TextTowerConfig::new(TextShape::new(5), fx.vocabs.clone())
            .with_pretrained_embed(Some(fx.vectors.clone()))
            .with_hidden(3)
            .init::<TestBackend>(&Default::default())
            .unwrap();

        assert_eq!(tower.embedding.dim(), 4);
        assert_eq!(tower.embedding.embedding.weight.val().dims(), [3, 4]);

        let w = weights(&tower);
        assert_eq!(&w[8..12], &[0.1, 0.2, 0.3, 0.4]);

        let tokens = Tensor::<TestBackend, 2, Int>::from_data(
            TensorData::new(vec![1i64, 2, 0, 0, 0, 2, 2, 2, 1, 0], [2, 5]),
            &Default::default(),
        );
        let out = tower.forward(tokens);
        assert_eq!(out.states.dims(), [2, 5, 6]);
        assert_eq!(out.mask.dims(), [2, 5]);
    }

    #[test]
    fn test_reproducible_with_same_seed() {
        let fx = fixture();
        let cfg = TextTowerConfig::new(TextShape::new(4), fx.vocabs.clone())
            .with_pretrained_embed(Some(fx.vectors.clone()))
            .with_hidden(2)
            .with_seed(7);

        let a = cfg.init::<TestBackend>(&Default::default()).unwrap();
        let b = cfg.init::<TestBackend>(&Default::default()).unwrap();
        assert_eq!(weights(&a), weights(&b));
    }

    #[test]
    fn test_uniform_needs_embed_dim() {
        let fx = fixture();
        let err = TextTowerConfig::new(TextShape::new(4), fx.vocabs.clone())
            .init::<TestBackend>(&Default::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::Config(_)));

        let tower = TextTowerConfig::new(TextShape::new(4), fx.vocabs.clone())
            .with_embed_dim(Some(6))
            .with_hidden(2)
            .init::<TestBackend>(&Default::default())
            .unwrap();
        assert_eq!(tower.embedding.dim(), 6);
    }

    #[test]
    fn test_pinned_width_must_match_pretrained() {
        let fx = fixture();
        let shape = TextShape { max_len: 4, embed_dim: Some(100) };
        let err = TextTowerConfig::new(shape, fx.vocabs.clone())
            .with_pretrained_embed(Some(fx.vectors.clone()))
            .init::<TestBackend>(&Default::default())
            .unwrap_err();
        assert!(err.to_string().contains("expects D=100, embedding has D=4"));
    }

    #[test]
    fn test_missing_vocab_is_load_error() {
        let err = TextTowerConfig::new(TextShape::new(4), PathBuf::from("/nope/vocabs.json"))
            .with_embed_dim(Some(4))
            .init::<TestBackend>(&Default::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::Load { .. }));
    }

    #[test]
    fn test_check_input_length() {
        let fx = fixture();
        let tower = TextTowerConfig::new(TextShape::new(4), fx.vocabs.clone())
            .with_embed_dim(Some(2))
            .with_hidden(2)
            .init::<TestBackend>(&Default::default())
            .unwrap();

        let device = Default::default();
        assert!(tower.check_input(&Tensor::zeros([3, 4], &device)).is_ok());
        assert!(tower.check_input(&Tensor::zeros([3, 5], &device)).is_err());
    }
}

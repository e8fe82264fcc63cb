// ============================================================
// Layer 5 — Embedding Builder
// ============================================================
// Builds the text tower's lookup table from a vocabulary and
// an initialisation strategy:
//
//   EmbeddingInit::Uniform
//     every row ~ U(-0.05, 0.05), dimension from the caller
//
//   EmbeddingInit::Pretrained(table)
//     every row ~ U(0, 1), dimension inferred from the table,
//     then row index+1 overwritten with the table's vector for
//     each vocabulary token that has one
//
// Matrix layout (vocab of n tokens):
//
//   row 0        padding / OOV sentinel — never overwritten
//   row i + 1    vocabulary token with index i
//
// All randomness comes from a StdRng seeded by the caller, so
// two builds with the same inputs produce the same matrix and
// concurrent builds with different seeds never interact.

use burn::{
    module::Param,
    nn::Embedding,
    prelude::*,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::{ModelError, ModelResult};
use crate::infra::{pretrained::PretrainedVectors, vocab_store::Vocabulary};

/// Range used for the default (non-pretrained) initialiser.
const UNIFORM_LIMIT: f32 = 0.05;

/// How rows of the embedding matrix are initialised.
#[derive(Debug, Clone)]
pub enum EmbeddingInit {
    Uniform,
    Pretrained(PretrainedVectors),
}

/// A dense row-major `(rows, dim)` matrix ready to become an
/// embedding layer.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    rows:   usize,
    dim:    usize,
    values: Vec<f32>,
    /// Vocabulary tokens whose row came from the pretrained table.
    pretrained_hits: usize,
}

impl EmbeddingMatrix {
    /// Build the matrix for `vocab`.
    ///
    /// `embed_dim` is required for `Uniform`. For `Pretrained` the
    /// table's dimension wins and a differing caller value is
    /// logged and ignored.
    pub fn build(
        vocab:     &Vocabulary,
        embed_dim: Option<usize>,
        init:      &EmbeddingInit,
        seed:      u64,
    ) -> ModelResult<Self> {
        let rows = vocab.len() + 1;
        let mut rng = StdRng::seed_from_u64(seed);

        match init {
            EmbeddingInit::Uniform => {
                let dim = match embed_dim {
                    Some(d) if d > 0 => d,
                    Some(_) => return Err(ModelError::config("embed_dim must be positive")),
                    None => {
                        return Err(ModelError::config(
                            "embed_dim is required when no pretrained vectors are given",
                        ))
                    }
                };
                let values = (0..rows * dim)
                    .map(|_| rng.gen_range(-UNIFORM_LIMIT..UNIFORM_LIMIT))
                    .collect();
                Ok(Self { rows, dim, values, pretrained_hits: 0 })
            }
            EmbeddingInit::Pretrained(table) => {
                let dim = table.dim();
                if let Some(requested) = embed_dim.filter(|&d| d != dim) {
                    tracing::warn!(
                        "embed_dim={} overridden by pretrained vector dimension D={}",
                        requested,
                        dim
                    );
                }

                let mut values: Vec<f32> = (0..rows * dim).map(|_| rng.gen::<f32>()).collect();
                let mut pretrained_hits = 0;

                for (token, index) in vocab.iter() {
                    if let Some(vector) = table.get(token) {
                        let row = index + 1;
                        values[row * dim..(row + 1) * dim].copy_from_slice(vector);
                        pretrained_hits += 1;
                    }
                }

                tracing::info!(
                    "Embedding matrix {}x{}: {} rows pretrained, {} random",
                    rows,
                    dim,
                    pretrained_hits,
                    vocab.len() - pretrained_hits
                );
                Ok(Self { rows, dim, values, pretrained_hits })
            }
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn pretrained_hits(&self) -> usize {
        self.pretrained_hits
    }

    /// Hand the matrix over to a trainable embedding layer.
    pub fn into_module<B: Backend>(self, device: &B::Device) -> MaskedEmbedding<B> {
        let weight = Tensor::<B, 2>::from_data(
            TensorData::new(self.values, [self.rows, self.dim]),
            device,
        );
        MaskedEmbedding {
            embedding: Embedding { weight: Param::from_tensor(weight) },
            dim:       self.dim,
        }
    }
}

/// Embedded tokens plus the padding mask that travels with them.
#[derive(Debug, Clone)]
pub struct Embedded<B: Backend> {
    /// `[batch, seq_len, dim]`
    pub values: Tensor<B, 3>,
    /// `[batch, seq_len]`, 1.0 for real tokens and 0.0 for padding.
    pub mask: Tensor<B, 2>,
}

/// Token lookup that treats index 0 as padding.
#[derive(Module, Debug)]
pub struct MaskedEmbedding<B: Backend> {
    pub embedding: Embedding<B>,
    dim:           usize,
}

impl<B: Backend> MaskedEmbedding<B> {
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// tokens: `[batch, seq_len]` → values `[batch, seq_len, dim]` + mask
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Embedded<B> {
        let mask = tokens.clone().equal_elem(0).bool_not().float();
        let values = self.embedding.forward(tokens);
        Embedded { values, mask }
    }
}

#[cfg(test)]
impl EmbeddingMatrix {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.values[i * self.dim..(i + 1) * self.dim]
    }
}

// ============================================================
// Layer 5 — Model Composer
// ============================================================
// Builds the vision and text towers independently and exposes
// them side by side as one module:
//
//   inputs   image        [batch, H, W, 3]
//            transcripts  [batch, max_len]  (Int, 0 = padding)
//
//   outputs  vision       [batch, ⌈H/32⌉, ⌈W/32⌉, C]
//            text         [batch, max_len, 2 * hidden]
//
// There is no fusion or classification head in here. The
// composite stops at the two towers; a head (see head.rs) is
// attached by whoever trains or serves the model, and can be
// swapped without touching the towers.
//
// Construction reads files and allocates fresh parameters but
// touches no global state, so it can be called any number of
// times (training run, validation-only variant, summary).

use std::{fmt, path::PathBuf};

use burn::prelude::*;

use crate::error::{ModelError, ModelResult};
use crate::ml::text::{TextEncoding, TextShape, TextTower, TextTowerConfig};
use crate::ml::vision::{VisionTower, VisionTowerConfig};

#[derive(Config, Debug)]
pub struct EmoRecModelConfig {
    /// `[height, width, channels]`
    pub img_shape: [usize; 3],
    pub text_shape: TextShape,
    /// Vocabulary file.
    pub vocabs: PathBuf,
    /// Must equal `text_shape.max_len` when given.
    pub max_len: Option<usize>,
    pub embed_dim: Option<usize>,
    pub pretrained_embed: Option<PathBuf>,
    #[config(default = 2021)]
    pub seed: u64,
    #[config(default = 128)]
    pub text_hidden: usize,
    #[config(default = "[3, 4, 6, 3]")]
    pub backbone_blocks: [usize; 4],
    #[config(default = 64)]
    pub backbone_width: usize,
    pub backbone_weights: Option<PathBuf>,
}

impl EmoRecModelConfig {
    pub fn vision_config(&self) -> VisionTowerConfig {
        VisionTowerConfig::new(self.img_shape)
            .with_blocks(self.backbone_blocks)
            .with_base_width(self.backbone_width)
            .with_backbone_weights(self.backbone_weights.clone())
    }

    pub fn text_config(&self) -> TextTowerConfig {
        TextTowerConfig::new(self.text_shape, self.vocabs.clone())
            .with_embed_dim(self.embed_dim)
            .with_pretrained_embed(self.pretrained_embed.clone())
            .with_hidden(self.text_hidden)
            .with_seed(self.seed)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<EmoRecModel<B>> {
        if let Some(max_len) = self.max_len {
            if max_len != self.text_shape.max_len {
                return Err(ModelError::config(format!(
                    "max_len={max_len} disagrees with text_shape.max_len={}",
                    self.text_shape.max_len
                )));
            }
        }

        let vision = self.vision_config().init(device)?;
        let text = self.text_config().init(device)?;

        let model = EmoRecModel { vision, text };
        tracing::info!("Composite model ready:\n{}", model.contract());
        Ok(model)
    }
}

/// Both tower inputs for one batch.
#[derive(Debug, Clone)]
pub struct EmoRecInput<B: Backend> {
    /// `[batch, H, W, 3]`
    pub image: Tensor<B, 4>,
    /// `[batch, max_len]`
    pub transcripts: Tensor<B, 2, Int>,
}

/// Both tower outputs for one batch.
#[derive(Debug, Clone)]
pub struct EmoRecOutput<B: Backend> {
    /// `[batch, h, w, C]`
    pub vision: Tensor<B, 4>,
    /// `[batch, max_len, 2 * hidden]`
    pub text: Tensor<B, 3>,
    /// `[batch, max_len]` padding mask travelling with `text`.
    pub text_mask: Tensor<B, 2>,
}

#[derive(Module, Debug)]
pub struct EmoRecModel<B: Backend> {
    pub vision: VisionTower<B>,
    pub text:   TextTower<B>,
}

impl<B: Backend> EmoRecModel<B> {
    /// Run both towers. Batches must already have the configured
    /// shapes; anything else is rejected, never reshaped.
    pub fn forward(&self, input: EmoRecInput<B>) -> ModelResult<EmoRecOutput<B>> {
        self.vision.check_input(&input.image)?;
        self.text.check_input(&input.transcripts)?;

        let [batch_img, ..] = input.image.dims();
        let [batch_txt, _] = input.transcripts.dims();
        if batch_img != batch_txt {
            return Err(ModelError::config(format!(
                "image batch of {batch_img} paired with transcript batch of {batch_txt}"
            )));
        }

        let vision = self.vision.forward(input.image);
        let TextEncoding { states, mask } = self.text.forward(input.transcripts);

        Ok(EmoRecOutput { vision, text: states, text_mask: mask })
    }

    pub fn contract(&self) -> ModelContract {
        let [h, w, c] = self.vision.img_shape();
        let max_len = self.text.max_len();
        ModelContract {
            inputs: vec![
                TensorSpec::new("image", vec![h, w, c]),
                TensorSpec::new("transcripts", vec![max_len]),
            ],
            outputs: vec![
                TensorSpec::new("vision", vec![h.div_ceil(32), w.div_ceil(32), self.vision.out_channels()]),
                TensorSpec::new("text", vec![max_len, self.text.d_output()]),
            ],
        }
    }
}

/// Named per-sample shape (the batch axis is left out).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
    pub name:  &'static str,
    pub shape: Vec<usize>,
}

impl TensorSpec {
    fn new(name: &'static str, shape: Vec<usize>) -> Self {
        Self { name, shape }
    }
}

/// Input / output description handed to the training driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelContract {
    pub inputs:  Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}

impl fmt::Display for ModelContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (kind, specs) in [("input", &self.inputs), ("output", &self.outputs)] {
            for spec in specs {
                writeln!(f, "  {:<7}{:<12} [batch, {}]", kind, spec.name,
                    spec.shape.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", "))?;
            }
        }
        Ok(())
    }
}

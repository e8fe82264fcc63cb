// ============================================================
// Layer 5 — Fusion Head
// ============================================================
// The composite model ends at two raw tower outputs. To train
// it as an emotion classifier something has to reduce them to
// one score per class; that is this head:
//
//   vision [B, h, w, C]      ── mean over h·w          → [B, C]
//   text   [B, T, 2·hidden]  ── mean over real tokens  → [B, 2·hidden]
//                                                     concat
//                                  Linear → logits [B, num_class]
//
// The head is a separate module so it can be swapped (or a
// different one attached for serving) without rebuilding the
// towers. EmotionClassifier is just the pair the trainer
// optimises together.

use burn::{
    nn::{
        loss::BinaryCrossEntropyLossConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::error::ModelResult;
use crate::ml::model::{EmoRecInput, EmoRecModel, EmoRecOutput};

#[derive(Config, Debug)]
pub struct FusionHeadConfig {
    pub vision_channels: usize,
    pub text_features:   usize,
    #[config(default = 8)]
    pub num_class: usize,
}

impl FusionHeadConfig {
    /// Size the head to whatever towers `model` was built with.
    pub fn for_model<B: Backend>(model: &EmoRecModel<B>, num_class: usize) -> Self {
        Self::new(model.vision.out_channels(), model.text.d_output()).with_num_class(num_class)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> FusionHead<B> {
        FusionHead {
            classifier: LinearConfig::new(self.vision_channels + self.text_features, self.num_class)
                .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct FusionHead<B: Backend> {
    pub classifier: Linear<B>,
}

impl<B: Backend> FusionHead<B> {
    /// Tower outputs → class logits `[batch, num_class]`.
    pub fn forward(&self, towers: EmoRecOutput<B>) -> Tensor<B, 2> {
        let [batch, h, w, channels] = towers.vision.dims();
        let vision = towers
            .vision
            .reshape([batch, h * w, channels])
            .mean_dim(1)
            .reshape([batch, channels]);

        let [_, _, features] = towers.text.dims();
        // Padded steps are already zero; divide by the real length.
        let lengths = towers.text_mask.sum_dim(1).clamp_min(1.0).unsqueeze_dim::<3>(2);
        let text = (towers.text.sum_dim(1) / lengths).reshape([batch, features]);

        self.classifier.forward(Tensor::cat(vec![vision, text], 1))
    }
}

/// Towers + head, optimised as one module during training.
#[derive(Module, Debug)]
pub struct EmotionClassifier<B: Backend> {
    pub towers: EmoRecModel<B>,
    pub head:   FusionHead<B>,
}

impl<B: Backend> EmotionClassifier<B> {
    pub fn new(towers: EmoRecModel<B>, num_class: usize, device: &B::Device) -> Self {
        let head = FusionHeadConfig::for_model(&towers, num_class).init(device);
        Self { towers, head }
    }

    /// → logits `[batch, num_class]`
    pub fn forward(&self, input: EmoRecInput<B>) -> ModelResult<Tensor<B, 2>> {
        let towers = self.towers.forward(input)?;
        Ok(self.head.forward(towers))
    }

    /// Multi-label binary cross-entropy; `labels` is multi-hot `[batch, num_class]`.
    pub fn forward_loss(
        &self,
        input:  EmoRecInput<B>,
        labels: Tensor<B, 2, Int>,
    ) -> ModelResult<(Tensor<B, 1>, Tensor<B, 2>)> {
        let logits = self.forward(input)?;
        let loss = BinaryCrossEntropyLossConfig::new()
            .with_logits(true)
            .init(&logits.device())
            .forward(logits.clone(), labels);
        Ok((loss, logits))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_head_pools_to_logits() {
        let device = Default::default();
        let head = FusionHeadConfig::new(4, 6).with_num_class(8).init::<TestBackend>(&device);

        let towers = EmoRecOutput {
            vision:    Tensor::ones([2, 3, 3, 4], &device),
            text:      Tensor::ones([2, 5, 6], &device),
            text_mask: Tensor::ones([2, 5], &device),
        };
        assert_eq!(head.forward(towers).dims(), [2, 8]);
    }

    #[test]
    fn test_text_pooling_ignores_padding() {
        // With a zero-weight classifier plus one-hot rows we can read the
        // pooled text features straight out of the logits.
        let device = Default::default();
        let mut head = FusionHeadConfig::new(1, 2).with_num_class(3).init::<TestBackend>(&device);
        let weight = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], [3, 3]),
            &device,
        );
        head.classifier.weight = burn::module::Param::from_tensor(weight);
        head.classifier.bias = None;

        // two real steps (values 2 and 4), one padded zero step
        let text = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![2.0f32, 2.0, 4.0, 4.0, 0.0, 0.0], [1, 3, 2]),
            &device,
        );
        let towers = EmoRecOutput {
            vision:    Tensor::zeros([1, 1, 1, 1], &device),
            text,
            text_mask: Tensor::from_data(TensorData::new(vec![1.0f32, 1.0, 0.0], [1, 3]), &device),
        };

        let logits = head.forward(towers).into_data().to_vec::<f32>().unwrap();
        assert_eq!(logits, vec![3.0, 3.0, 0.0]);
    }
}

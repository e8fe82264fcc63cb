// ============================================================
// Layer 4 — Emotion Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N EmotionSamples
// into the tensors the classifier consumes.
//
//   images       [N, H, W, 3]       f32, pixels scaled to [0, 1]
//   transcripts  [N, max_len]       Int, 0 = padding / OOV
//   labels       [N, num_class]     Int, multi-hot
//
// Samples are already fixed-size (images resized, transcripts
// padded), so batching is flatten + reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::{EmotionSample, SampleShape};
use crate::ml::model::EmoRecInput;

#[derive(Debug, Clone)]
pub struct EmotionBatch<B: Backend> {
    pub images:      Tensor<B, 4>,
    pub transcripts: Tensor<B, 2, Int>,
    pub labels:      Tensor<B, 2, Int>,
}

impl<B: Backend> EmotionBatch<B> {
    /// Split into model input and targets.
    pub fn into_parts(self) -> (EmoRecInput<B>, Tensor<B, 2, Int>) {
        (EmoRecInput { image: self.images, transcripts: self.transcripts }, self.labels)
    }
}

#[derive(Clone, Debug)]
pub struct EmotionBatcher<B: Backend> {
    pub device: B::Device,
    pub shape:  SampleShape,
}

impl<B: Backend> EmotionBatcher<B> {
    pub fn new(device: B::Device, shape: SampleShape) -> Self {
        Self { device, shape }
    }
}

impl<B: Backend> Batcher<EmotionSample, EmotionBatch<B>> for EmotionBatcher<B> {
    fn batch(&self, items: Vec<EmotionSample>) -> EmotionBatch<B> {
        let n = items.len();
        let SampleShape { height, width, max_len } = self.shape;
        let num_class = items.first().map_or(0, |s| s.labels.len());

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.image.iter().map(|&p| p as f32 / 255.0))
            .collect();

        let tokens: Vec<i64> = items
            .iter()
            .flat_map(|s| s.transcript.iter().map(|&t| t as i64))
            .collect();

        let labels: Vec<i64> = items
            .iter()
            .flat_map(|s| s.labels.iter().map(|&l| l as i64))
            .collect();

        EmotionBatch {
            images: Tensor::from_data(TensorData::new(pixels, [n, height, width, 3]), &self.device),
            transcripts: Tensor::from_data(TensorData::new(tokens, [n, max_len]), &self.device),
            labels: Tensor::from_data(TensorData::new(labels, [n, num_class]), &self.device),
        }
    }
}

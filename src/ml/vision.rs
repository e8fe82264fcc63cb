// ============================================================
// Layer 5 — Vision Tower
// ============================================================
// A ResNet-style bottleneck backbone with the classification
// head removed, turning an image batch into a spatial feature
// map.
//
//   input   [batch, H, W, 3]           channels-last, as the
//                                      batcher produces it
//   stem    7×7 conv /2 → BN → ReLU → 3×3 max-pool /2
//   stage1  blocks[0] × bottleneck(w,   stride 1)
//   stage2  blocks[1] × bottleneck(2w,  stride 2)
//   stage3  blocks[2] × bottleneck(4w,  stride 2)
//   stage4  blocks[3] × bottleneck(8w,  stride 2)
//   output  [batch, ⌈H/32⌉, ⌈W/32⌉, 32w] channels-last
//
// With the defaults (blocks [3,4,6,3], w = 64) this is the
// ResNet-50 layout and the output has 2048 channels.
//
// Pretrained weights are optional and come from a Burn record
// file; when loaded the backbone is frozen with no_grad().
//
// Reference: He et al. (2016) Deep Residual Learning

use std::path::PathBuf;

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    prelude::*,
    record::CompactRecorder,
    tensor::activation::relu,
};

use crate::error::{ModelError, ModelResult};

/// Channel count the backbone's first convolution expects.
pub const IMAGE_CHANNELS: usize = 3;

/// Smallest height / width the five stride-2 stages accept.
pub const MIN_IMAGE_SIDE: usize = 32;

/// Bottleneck blocks widen their input by this factor.
const EXPANSION: usize = 4;

#[derive(Config, Debug)]
pub struct VisionTowerConfig {
    /// `[height, width, channels]`
    pub img_shape: [usize; 3],
    /// Bottleneck blocks per stage.
    #[config(default = "[3, 4, 6, 3]")]
    pub blocks: [usize; 4],
    /// Width of the first stage; later stages double it.
    #[config(default = 64)]
    pub base_width: usize,
    /// Burn record with pretrained backbone weights.
    pub backbone_weights: Option<PathBuf>,
    /// Freeze the backbone once pretrained weights are loaded.
    #[config(default = true)]
    pub freeze_backbone: bool,
}

impl VisionTowerConfig {
    /// Channels of the produced feature map.
    pub fn out_channels(&self) -> usize {
        self.base_width * 8 * EXPANSION
    }

    /// Spatial size of the produced feature map as `[h, w]`.
    pub fn out_spatial(&self) -> [usize; 2] {
        let [h, w, _] = self.img_shape;
        [h.div_ceil(32), w.div_ceil(32)]
    }

    fn validate(&self) -> ModelResult<()> {
        let [h, w, c] = self.img_shape;
        if c != IMAGE_CHANNELS {
            return Err(ModelError::config(format!(
                "img_shape {:?}: vision backbone needs {IMAGE_CHANNELS} channels, got {c}",
                self.img_shape
            )));
        }
        if h < MIN_IMAGE_SIDE || w < MIN_IMAGE_SIDE {
            return Err(ModelError::config(format!(
                "img_shape {:?}: height and width must be at least {MIN_IMAGE_SIDE}",
                self.img_shape
            )));
        }
        if self.base_width == 0 || self.blocks.iter().any(|&n| n == 0) {
            return Err(ModelError::config(format!(
                "backbone needs a positive width and at least one block per stage, got width {} blocks {:?}",
                self.base_width, self.blocks
            )));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<VisionTower<B>> {
        self.validate()?;

        let mut backbone = self.build_backbone(device);

        if let Some(path) = &self.backbone_weights {
            backbone = backbone
                .load_file(path.clone(), &CompactRecorder::new(), device)
                .map_err(|e| ModelError::load(path, format!("backbone weights: {e}")))?;
            tracing::info!("Loaded backbone weights from '{}'", path.display());

            if self.freeze_backbone {
                backbone = backbone.no_grad();
                tracing::info!("Vision backbone frozen");
            }
        }

        let [height, width, channels] = self.img_shape;
        tracing::info!(
            "Vision tower ready: input [{}, {}, {}] -> feature map {:?}x{}",
            height,
            width,
            channels,
            self.out_spatial(),
            self.out_channels()
        );

        Ok(VisionTower { backbone, height, width, channels, out_channels: self.out_channels() })
    }

    fn build_backbone<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        let w = self.base_width;

        let stem_conv = Conv2dConfig::new([IMAGE_CHANNELS, w], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .init(device);
        let stem_norm = BatchNormConfig::new(w).init(device);
        let stem_pool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let mut stages = Vec::with_capacity(4);
        let mut in_channels = w;
        for (k, &count) in self.blocks.iter().enumerate() {
            let mid = w << k;
            let stride = if k == 0 { 1 } else { 2 };
            let blocks = (0..count)
                .map(|b| {
                    let block = Bottleneck::new(
                        in_channels,
                        mid,
                        if b == 0 { stride } else { 1 },
                        device,
                    );
                    in_channels = mid * EXPANSION;
                    block
                })
                .collect();
            stages.push(Stage { blocks });
        }

        ResNet { stem_conv, stem_norm, stem_pool, stages }
    }
}

#[derive(Module, Debug)]
pub struct VisionTower<B: Backend> {
    pub backbone: ResNet<B>,
    height:       usize,
    width:        usize,
    channels:     usize,
    out_channels: usize,
}

impl<B: Backend> VisionTower<B> {
    /// Channels of the produced feature map.
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// `[height, width, channels]` the tower was built for.
    pub fn img_shape(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }

    /// Reject a batch whose per-sample shape differs from the
    /// configured one; nothing is resized.
    pub fn check_input(&self, images: &Tensor<B, 4>) -> ModelResult<()> {
        let [_, h, w, c] = images.dims();
        if [h, w, c] != self.img_shape() {
            return Err(ModelError::config(format!(
                "image batch has shape [{h}, {w}, {c}] per sample, model expects {:?}",
                self.img_shape()
            )));
        }
        Ok(())
    }

    /// images: `[batch, H, W, 3]` → features `[batch, h, w, C]`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = images.permute([0, 3, 1, 2]);
        self.backbone.forward(x).permute([0, 2, 3, 1])
    }
}

#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    stem_conv: Conv2d<B>,
    stem_norm: BatchNorm<B, 2>,
    stem_pool: MaxPool2d,
    stages:    Vec<Stage<B>>,
}

impl<B: Backend> ResNet<B> {
    /// `[batch, 3, H, W]` → `[batch, C, h, w]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.stem_norm.forward(self.stem_conv.forward(x)));
        let mut x = self.stem_pool.forward(x);
        for stage in &self.stages {
            for block in &stage.blocks {
                x = block.forward(x);
            }
        }
        x
    }
}

#[derive(Module, Debug)]
pub struct Stage<B: Backend> {
    blocks: Vec<Bottleneck<B>>,
}

/// 1×1 reduce → 3×3 (carries the stride) → 1×1 expand, plus a
/// projection shortcut whenever shape changes.
#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    conv1:      Conv2d<B>,
    norm1:      BatchNorm<B, 2>,
    conv2:      Conv2d<B>,
    norm2:      BatchNorm<B, 2>,
    conv3:      Conv2d<B>,
    norm3:      BatchNorm<B, 2>,
    downsample: Option<Downsample<B>>,
}

#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B, 2>,
}

impl<B: Backend> Bottleneck<B> {
    fn new(in_channels: usize, mid: usize, stride: usize, device: &B::Device) -> Self {
        let out_channels = mid * EXPANSION;

        let downsample = (stride != 1 || in_channels != out_channels).then(|| Downsample {
            conv: Conv2dConfig::new([in_channels, out_channels], [1, 1])
                .with_stride([stride, stride])
                .with_bias(false)
                .init(device),
            norm: BatchNormConfig::new(out_channels).init(device),
        });

        Self {
            conv1: Conv2dConfig::new([in_channels, mid], [1, 1]).with_bias(false).init(device),
            norm1: BatchNormConfig::new(mid).init(device),
            conv2: Conv2dConfig::new([mid, mid], [3, 3])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_bias(false)
                .init(device),
            norm2: BatchNormConfig::new(mid).init(device),
            conv3: Conv2dConfig::new([mid, out_channels], [1, 1]).with_bias(false).init(device),
            norm3: BatchNormConfig::new(out_channels).init(device),
            downsample,
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(d) => d.norm.forward(d.conv.forward(x.clone())),
            None    => x.clone(),
        };

        let out = relu(self.norm1.forward(self.conv1.forward(x)));
        let out = relu(self.norm2.forward(self.conv2.forward(out)));
        let out = self.norm3.forward(self.conv3.forward(out));

        relu(out + identity)
    }
}

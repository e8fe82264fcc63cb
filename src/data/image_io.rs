// ============================================================
// Layer 4 — Image Decoding
// ============================================================
// Decodes a panel image into the tower's input layout:
//
//   any format `image` can read
//     → RGB (alpha / grey dropped or expanded)
//     → resized to exactly height × width (Triangle filter)
//     → row-major [height, width, 3] bytes
//
// Pixels stay u8 here to keep a decoded dataset small in
// memory; the batcher scales them to [0, 1] floats.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use std::path::Path;

/// Decode `path` into `height * width * 3` RGB bytes.
pub fn load_rgb(path: &Path, height: usize, width: usize) -> Result<Vec<u8>> {
    let img = image::open(path)
        .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
    Ok(img
        .resize_exact(width as u32, height as u32, FilterType::Triangle)
        .to_rgb8()
        .into_raw())
}

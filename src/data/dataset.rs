use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::{image_io::load_rgb, preprocessor::Preprocessor};
use crate::domain::{emotion::Emotion, record::EmotionRecord};
use crate::infra::vocab_store::Vocabulary;

/// One decoded, encoded sample.
/// `image` is `[height, width, 3]` RGB bytes, `transcript` is
/// `max_len` shifted vocabulary indices, `labels` is multi-hot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionSample {
    pub image:      Vec<u8>,
    pub transcript: Vec<u32>,
    pub labels:     Vec<u8>,
}

#[cfg(test)]
impl EmotionSample {
    pub fn emotions(&self) -> Vec<Emotion> {
        Emotion::ALL
            .into_iter()
            .filter(|e| self.labels.get(e.index()) == Some(&1))
            .collect()
    }
}

/// Sample geometry shared by the dataset and the batcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleShape {
    pub height:  usize,
    pub width:   usize,
    pub max_len: usize,
}

pub struct EmotionDataset {
    samples: Vec<EmotionSample>,
}

impl EmotionDataset {
    pub fn new(samples: Vec<EmotionSample>) -> Self { Self { samples } }

    /// Decode and encode every record. Records with an unreadable
    /// image or an unknown label are skipped with a warning.
    pub fn from_records(records: &[EmotionRecord], vocab: &Vocabulary, shape: SampleShape) -> Self {
        let preprocessor = Preprocessor::new();
        let mut samples = Vec::with_capacity(records.len());

        for record in records {
            let labels = match Emotion::multi_hot(&record.labels) {
                Ok(l)  => l,
                Err(e) => {
                    tracing::warn!("Skipping '{}': {}", record.image.display(), e);
                    continue;
                }
            };
            let image = match load_rgb(&record.image, shape.height, shape.width) {
                Ok(px) => px,
                Err(e) => {
                    tracing::warn!("Skipping '{}': {:#}", record.image.display(), e);
                    continue;
                }
            };
            let transcript = preprocessor.encode(&record.transcript(), vocab, shape.max_len);
            samples.push(EmotionSample { image, transcript, labels });
        }

        tracing::info!("Built dataset of {} / {} records", samples.len(), records.len());
        Self { samples }
    }

    pub fn into_samples(self) -> Vec<EmotionSample> { self.samples }
}

impl Dataset<EmotionSample> for EmotionDataset {
    fn get(&self, index: usize) -> Option<EmotionSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_builds_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        RgbImage::from_pixel(40, 40, Rgb([1, 2, 3])).save(&good).unwrap();

        let vocab = Vocabulary::from_tokens(["hello", "world"]).unwrap();
        let records = vec![
            EmotionRecord::new(&good, vec!["Hello moon".into()], vec!["happy".into(), "sad".into()]),
            EmotionRecord::new(dir.path().join("missing.png"), vec![], vec!["happy".into()]),
            EmotionRecord::new(&good, vec![], vec!["bored".into()]),
        ];
        let shape = SampleShape { height: 32, width: 32, max_len: 4 };

        let ds = EmotionDataset::from_records(&records, &vocab, shape);
        assert_eq!(ds.len(), 1);

        let sample = ds.get(0).unwrap();
        assert_eq!(sample.image.len(), 32 * 32 * 3);
        assert_eq!(sample.transcript, vec![1, 0, 0, 0]);
        assert_eq!(sample.emotions(), vec![Emotion::Happy, Emotion::Sad]);
    }
}

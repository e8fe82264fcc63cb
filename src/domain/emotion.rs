// ============================================================
// Layer 3 — Emotion Classes
// ============================================================
// Every comic panel is tagged with zero or more of eight
// emotions. The class order below is the column order of the
// label vectors and of the classifier's logits, so it must
// never change between training and inference.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
    Other,
}

impl Emotion {
    pub const ALL: [Emotion; 8] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
        Emotion::Other,
    ];

    /// Number of classes.
    pub const COUNT: usize = Self::ALL.len();

    /// Column of this emotion in label / logit vectors.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Emotion::Angry    => "angry",
            Emotion::Disgust  => "disgust",
            Emotion::Fear     => "fear",
            Emotion::Happy    => "happy",
            Emotion::Sad      => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral  => "neutral",
            Emotion::Other    => "other",
        }
    }

    /// Multi-hot vector of length `COUNT` for the given labels.
    /// Unknown label names are returned as the error.
    pub fn multi_hot<S: AsRef<str>>(labels: &[S]) -> Result<Vec<u8>, String> {
        let mut hot = vec![0u8; Self::COUNT];
        for label in labels {
            let emotion: Emotion = label.as_ref().parse()?;
            hot[emotion.index()] = 1;
        }
        Ok(hot)
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|e| e.name() == wanted)
            .ok_or_else(|| format!("unknown emotion label '{s}'"))
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_stable() {
        assert_eq!(Emotion::COUNT, 8);
        assert_eq!(Emotion::Angry.index(), 0);
        assert_eq!(Emotion::Other.index(), 7);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(" Happy ".parse::<Emotion>(), Ok(Emotion::Happy));
        assert!("bored".parse::<Emotion>().is_err());
    }

    #[test]
    fn test_multi_hot() {
        let hot = Emotion::multi_hot(&["sad", "fear", "sad"]).unwrap();
        assert_eq!(hot, vec![0, 0, 1, 0, 1, 0, 0, 0]);
        assert_eq!(Emotion::multi_hot::<&str>(&[]).unwrap(), vec![0; 8]);
        assert!(Emotion::multi_hot(&["joy"]).is_err());
    }
}

// ============================================================
// Model Construction Errors
// ============================================================
// Every failure while assembling the composite model falls
// into one of three kinds:
//
//   Load   — a vocabulary / vector / weights file is missing,
//            unreadable, or not what it claims to be
//   Config — caller-supplied shapes disagree with each other
//            or with values inferred from the files
//   Parse  — a pretrained-vector line is malformed
//
// Construction is all-or-nothing: any of these aborts the
// whole call and no partially-built model is returned.
//
// The application layer wraps these in anyhow::Error, so the
// messages must stand on their own (path + what was expected).

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// A file needed for construction could not be read or decoded.
    #[error("cannot load '{}': {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// Shapes or dimensions do not line up.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A pretrained-vector line could not be parsed.
    #[error("parse error in '{}' at line {line}: {reason}", path.display())]
    Parse {
        path:   PathBuf,
        line:   usize,
        reason: String,
    },
}

impl ModelError {
    pub fn load(path: &Path, reason: impl Into<String>) -> Self {
        Self::Load { path: path.to_path_buf(), reason: reason.into() }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    pub fn parse(path: &Path, line: usize, reason: impl Into<String>) -> Self {
        Self::Parse { path: path.to_path_buf(), line, reason: reason.into() }
    }
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_file() {
        let err = ModelError::parse(Path::new("glove.txt"), 7, "dimension mismatch: expected D=100, got D=97");
        let msg = err.to_string();
        assert!(msg.contains("glove.txt"));
        assert!(msg.contains("line 7"));
        assert!(msg.contains("expected D=100, got D=97"));
    }

    #[test]
    fn test_load_message() {
        let err = ModelError::load(Path::new("vocabs.json"), "file not found");
        assert_eq!(err.to_string(), "cannot load 'vocabs.json': file not found");
    }
}

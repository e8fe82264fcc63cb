// ============================================================
// Layer 6 — Pretrained Vector Table
// ============================================================
// Parses GloVe-style text files:
//
//   the 0.418 0.24968 -0.41242 ...
//   , 0.013441 0.23682 -0.16899 ...
//
// Each line is split once at the first whitespace run: the
// left part is the token (any non-whitespace bytes, so
// multi-byte tokens are fine), the rest is the coefficients.
//
// The dimension D comes from the first entry. Every later
// entry must match it; the first line that does not aborts
// the parse instead of producing ragged rows.
//
// The table is transient — it only lives long enough to seed
// the embedding matrix and is dropped afterwards.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, PartialEq)]
pub struct PretrainedVectors {
    dim:     usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl PretrainedVectors {
    /// Open and parse a vector file.
    pub fn load(path: &Path) -> ModelResult<Self> {
        let file = File::open(path).map_err(|e| ModelError::load(path, e.to_string()))?;
        let table = Self::parse(BufReader::new(file), path)?;
        tracing::info!(
            "Parsed {} pretrained vectors (D={}) from '{}'",
            table.len(),
            table.dim,
            path.display()
        );
        Ok(table)
    }

    /// Parse from any reader; `source` is only used in error messages.
    pub fn parse<R: BufRead>(reader: R, source: &Path) -> ModelResult<Self> {
        let mut dim: Option<usize> = None;
        let mut vectors = HashMap::new();

        for (n, line) in reader.lines().enumerate() {
            let line_no = n + 1;
            let line = line.map_err(|e| ModelError::load(source, e.to_string()))?;
            let line = line.trim_start();
            if line.trim_end().is_empty() {
                continue;
            }

            let (token, coefs) = line
                .split_once(char::is_whitespace)
                .ok_or_else(|| ModelError::parse(source, line_no, "token has no coefficients"))?;

            let vector = coefs
                .split_whitespace()
                .map(|c| match c.parse::<f32>() {
                    Ok(v) if v.is_finite() => Ok(v),
                    Ok(_) => Err(ModelError::parse(source, line_no, "non-finite coefficient")),
                    Err(_) => {
                        Err(ModelError::parse(source, line_no, format!("'{c}' is not a number")))
                    }
                })
                .collect::<ModelResult<Vec<f32>>>()?;

            if vector.is_empty() {
                return Err(ModelError::parse(source, line_no, "token has no coefficients"));
            }

            match dim {
                None => dim = Some(vector.len()),
                Some(d) if d != vector.len() => {
                    return Err(ModelError::parse(
                        source,
                        line_no,
                        format!("dimension mismatch: expected D={d}, got D={}", vector.len()),
                    ));
                }
                Some(_) => {}
            }

            vectors.insert(token.to_string(), vector);
        }

        let dim = dim.ok_or_else(|| ModelError::load(source, "no vectors found"))?;
        Ok(Self { dim, vectors })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn get(&self, token: &str) -> Option<&[f32]> {
        self.vectors.get(token).map(Vec::as_slice)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> ModelResult<PretrainedVectors> {
        PretrainedVectors::parse(Cursor::new(text), Path::new("vectors.txt"))
    }

    #[test]
    fn test_parses_two_entries() {
        let table = parse("cat 0.1 0.2 0.3\ndog 0.4 0.5 0.6\n").unwrap();
        assert_eq!(table.dim(), 3);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("cat"), Some(&[0.1f32, 0.2, 0.3][..]));
        assert_eq!(table.get("dog"), Some(&[0.4f32, 0.5, 0.6][..]));
    }

    #[test]
    fn test_multibyte_tokens_and_tabs() {
        let table = parse("café\t1 2\n😀  3 4\n").unwrap();
        assert_eq!(table.get("café"), Some(&[1.0f32, 2.0][..]));
        assert_eq!(table.get("😀"), Some(&[3.0f32, 4.0][..]));
    }

    #[test]
    fn test_skips_blank_lines() {
        let table = parse("\ncat 1 2\n\n   \ndog 3 4").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_dimension_mismatch_is_parse_error() {
        let err = parse("cat 0.1 0.2 0.3\ndog 0.4 0.5\n").unwrap_err();
        match &err {
            ModelError::Parse { line, reason, .. } => {
                assert_eq!(*line, 2);
                assert_eq!(reason, "dimension mismatch: expected D=3, got D=2");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_number_is_parse_error() {
        let err = parse("cat 0.1 abc\n").unwrap_err();
        assert!(matches!(err, ModelError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_non_finite_coefficient_is_parse_error() {
        for bad in ["nan", "inf", "-inf", "1e39"] {
            let err = parse(&format!("dog 0.2 0.4\ncat 0.1 {bad}\n")).unwrap_err();
            assert!(matches!(err, ModelError::Parse { line: 2, .. }), "{bad}: {err}");
            assert!(err.to_string().contains("non-finite coefficient"));
        }
    }

    #[test]
    fn test_lonely_token_is_parse_error() {
        let err = parse("cat\n").unwrap_err();
        assert!(matches!(err, ModelError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = PretrainedVectors::load(Path::new("/no/such/glove.txt")).unwrap_err();
        assert!(matches!(err, ModelError::Load { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glove.txt");
        std::fs::write(&path, "world 0.5 -0.25\n").unwrap();

        let table = PretrainedVectors::load(&path).unwrap();
        assert_eq!(table.get("world"), Some(&[0.5f32, -0.25][..]));
    }
}

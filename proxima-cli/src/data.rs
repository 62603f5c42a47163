//! Dense-vector loading for the CLI.
//!
//! Reads whitespace- or comma-separated `f32` rows from a UTF-8 text file,
//! one vector per line. Row numbers become the external object ids, which is
//! exactly the binding the index's save format validates on reload.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use proxima_core::{DenseVector, ObjectId};
use thiserror::Error;

/// Errors raised while loading vector data.
#[derive(Debug, Error)]
pub enum DataError {
    /// The input file could not be read.
    #[error("cannot read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A row contained a non-numeric component.
    #[error("`{path}` line {line}: cannot parse `{token}` as a number")]
    Parse {
        path: PathBuf,
        line: usize,
        token: String,
    },
    /// Rows had differing dimensionality.
    #[error("`{path}` line {line}: row has {found} components, expected {expected}")]
    RaggedRow {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// Loads one vector per non-empty line; blank lines are skipped.
pub fn load_vectors(path: &Path) -> Result<Vec<DenseVector>, DataError> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut vectors = Vec::new();
    let mut dim = None;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let line_no = index + 1;
        let row = parse_row(path, line_no, &line)?;
        let Some(row) = row else { continue };
        let expected = *dim.get_or_insert(row.len());
        if row.len() != expected {
            return Err(DataError::RaggedRow {
                path: path.to_path_buf(),
                line: line_no,
                expected,
                found: row.len(),
            });
        }
        vectors.push(DenseVector::new(vectors.len() as ObjectId, row));
    }
    Ok(vectors)
}

fn parse_row(path: &Path, line_no: usize, line: &str) -> Result<Option<Vec<f32>>, DataError> {
    let tokens: Vec<&str> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.is_empty() {
        return Ok(None);
    }
    tokens
        .into_iter()
        .map(|token| {
            token.parse().map_err(|_| DataError::Parse {
                path: path.to_path_buf(),
                line: line_no,
                token: token.to_owned(),
            })
        })
        .collect::<Result<Vec<f32>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use proxima_core::DataObject;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn loads_comma_and_whitespace_rows() {
        let dir = tempdir().expect("temp dir must be created");
        let path = dir.path().join("points.csv");
        fs::write(&path, "1.0,2.0\n\n3.5 4.5\n").expect("fixture must be written");

        let vectors = load_vectors(&path).expect("load must succeed");
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].id(), 0);
        assert_eq!(vectors[0].values(), &[1.0, 2.0]);
        assert_eq!(vectors[1].id(), 1);
        assert_eq!(vectors[1].values(), &[3.5, 4.5]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let dir = tempdir().expect("temp dir must be created");
        let path = dir.path().join("points.csv");
        fs::write(&path, "1.0,2.0\n3.0\n").expect("fixture must be written");

        let err = load_vectors(&path).expect_err("ragged input must fail");
        assert!(matches!(err, DataError::RaggedRow { line: 2, .. }));
    }

    #[test]
    fn non_numeric_tokens_are_rejected() {
        let dir = tempdir().expect("temp dir must be created");
        let path = dir.path().join("points.csv");
        fs::write(&path, "1.0,two\n").expect("fixture must be written");

        let err = load_vectors(&path).expect_err("non-numeric input must fail");
        assert!(matches!(err, DataError::Parse { line: 1, .. }));
    }
}

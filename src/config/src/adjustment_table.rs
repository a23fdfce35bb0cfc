//! Loader for adjustment-matrix tables: whitespace-separated text files of
//! `from to value` triples, in either the symmetric shape (`i <= j`, one row
//! per unordered pair) or the asymmetric shape (one row per ordered pair).

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail};
use kernel::AdjustmentMatrix;
use located_error::prelude::*;

use crate::error::ConfigError;

pub fn load_adjustment_table(path: &Path, regions: u8) -> Result<AdjustmentMatrix> {
    let contents =
        fs::read_to_string(path).map_err(|_| anyhow!(ConfigError::ReadFile(path.to_path_buf())))?;

    let mut triples = Vec::new();
    for (row, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            bail!(ConfigError::MatrixTableShape { row, found: fields.len() });
        }
        let from: usize = fields[0].parse().with_loc(|| format!("While parsing column 0 of row {row}"))?;
        let to: usize = fields[1].parse().with_loc(|| format!("While parsing column 1 of row {row}"))?;
        let value: f64 = fields[2].parse().with_loc(|| format!("While parsing column 2 of row {row}"))?;
        triples.push((from, to, value));
    }

    if triples.is_empty() {
        bail!(ConfigError::EmptyMatrixTable(path.to_path_buf()));
    }

    AdjustmentMatrix::from_triples(&triples, regions)
        .map_err(ConfigError::Adjustment)
        .with_loc(|| format!("While building adjustment matrix from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_symmetric_shape() {
        let file = tempfile::Builder::new().suffix(".tsv").tempfile().unwrap();
        fs::write(file.path(), "0 1 0.5\n0 2 0.25\n").unwrap();
        let m = load_adjustment_table(file.path(), 3).unwrap();
        assert_eq!(m.get(0, 1), 0.5);
        assert_eq!(m.get(1, 0), 0.5);
    }

    #[test]
    fn rejects_malformed_row() {
        let file = tempfile::Builder::new().suffix(".tsv").tempfile().unwrap();
        fs::write(file.path(), "0 1\n").unwrap();
        assert!(load_adjustment_table(file.path(), 2).is_err());
    }

    #[test]
    fn rejects_empty_file() {
        let file = tempfile::Builder::new().suffix(".tsv").tempfile().unwrap();
        fs::write(file.path(), "").unwrap();
        assert!(load_adjustment_table(file.path(), 2).is_err());
    }
}

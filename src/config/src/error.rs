use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {0}")]
    ReadFile(PathBuf),

    #[error("failed to parse YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid slice or value format for --{arg}. [{err}]")]
    ParseArg { arg: String, err: String },

    #[error("adjustment matrix table at {0} has no rows")]
    EmptyMatrixTable(PathBuf),

    #[error("adjustment matrix table row {row} has {found} columns, expected 3 (from, to, value)")]
    MatrixTableShape { row: usize, found: usize },

    #[error("newick string is missing a closing ';'")]
    NewickUnterminated,

    #[error("unbalanced parentheses in newick string at byte offset {0}")]
    NewickUnbalanced(usize),

    #[error(transparent)]
    Kernel(#[from] kernel::Error),

    #[error(transparent)]
    Adjustment(#[from] kernel::adjustment::AdjustmentError),
}

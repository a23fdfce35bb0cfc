//! Configuration, CLI, and input-loading layer for bigrig-rs.
//!
//! This crate's job is turning user-facing input (CLI flags, a YAML file, a
//! Newick tree, an adjustment-matrix table) into the `kernel` crate's own
//! validated types, reporting precisely where things went wrong when they
//! do. It owns no simulation logic itself.

mod adjustment_table;
mod cli;
mod error;
mod newick;
mod record;

pub use adjustment_table::load_adjustment_table;
pub use cli::{Cli, Commands, Run};
pub use error::ConfigError;
pub use newick::parse_newick;
pub use record::{
    AdjustmentConfig, CladoConfig, Config, DistConfig, OutputConfig, PerRegionConfig, PeriodConfig,
    RateConfig, ResolvedConfig, SampleMode, TreeSimConfig,
};

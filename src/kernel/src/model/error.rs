use thiserror::Error;

/// A single structural problem found while validating a `Model`. Collected
/// in batches by `Model::check_ok` rather than surfaced one at a time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelProblem {
    #[error("rate parameter {field} is negative: {value}")]
    NegativeRate { field: &'static str, value: f64 },

    #[error("cladogenesis parameter {field} is negative: {value}")]
    NegativeClado { field: &'static str, value: f64 },

    #[error("the sympatry, allopatry, and jump weights are all zero; no non-singleton split is possible")]
    NoNonSingletonSplit,

    #[error("the copy and jump weights are both zero; no singleton split is possible")]
    NoSingletonSplit,

    #[error("{given} per-region params were provided but the model has {regions} regions")]
    PerRegionCountMismatch { given: usize, regions: u8 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("model is invalid: {0:?}")]
    Invalid(Vec<ModelProblem>),
}

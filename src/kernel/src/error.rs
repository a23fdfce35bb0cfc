use thiserror::Error;

use crate::dist::DistError;
use crate::model::ModelError;
use crate::period::PeriodError;

/// Crate-wide error union. Individual modules raise their own narrower
/// error type; this is what a caller walking the tree actually sees.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Dist(#[from] DistError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error("no event is possible for this range under the current model (all rates are zero)")]
    NoEventsPossible,

    #[error("sampled an invalid split for dist {dist} with positive weights; this is a bug")]
    InvalidSplit { dist: String },
}

pub type Result<T> = std::result::Result<T, Error>;

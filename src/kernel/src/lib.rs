//! DEC+J biogeographic range-evolution stochastic simulation kernel.
//!
//! Given a rooted binary tree, a starting range at the root, and a
//! time-varying model of dispersion, extinction, and cladogenesis, this
//! crate produces the range at every node, the ordered anagenetic
//! transitions on each branch, and the cladogenetic split at every
//! internal node. It can also simulate the tree itself under a
//! birth-death process coupled to the range dynamics.
//!
//! The crate does no I/O and raises no panics on malformed input -- every
//! fallible entry point returns a `Result<_, Error>`. Every sampler takes
//! an explicit `&mut impl rand::Rng`; there is no process-wide RNG here.

pub mod adjustment;
pub mod dist;
pub mod error;
pub mod model;
pub mod period;
pub mod split;
pub mod spread;
pub mod tree;

pub use adjustment::AdjustmentMatrix;
pub use dist::Dist;
pub use error::{Error, Result};
pub use model::{CladoParams, Model, PerRegionParams, RateParams, TreeParams};
pub use period::{simulate_transitions, Period, PeriodList};
pub use split::{determine_split_type, split, Split, SplitMode, SplitType};
pub use spread::{spread, SampleMode, Transition};
pub use tree::{simulate_tree, simulate_transitions_over_tree, InputNode, Node, Tree};

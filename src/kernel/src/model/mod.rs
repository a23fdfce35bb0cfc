//! Event-weight computation: turns a range and a set of model parameters
//! into the weights consumed by the anagenesis and cladogenesis samplers.

mod error;
pub use error::{ModelError, ModelProblem};

use crate::adjustment::AdjustmentMatrix;
use crate::dist::Dist;

/// `{dis, ext}`, both >= 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateParams {
    pub dis: f64,
    pub ext: f64,
}

/// `{allopatry, sympatry, copy, jump}`, all >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CladoParams {
    pub allopatry: f64,
    pub sympatry: f64,
    pub copy: f64,
    pub jump: f64,
}

impl CladoParams {
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.allopatry + self.sympatry + self.copy + self.jump
    }

    /// Normalizes by the sum; only meaningful when `sum() > 0`.
    #[must_use]
    pub fn normalize(&self) -> CladoParams {
        let s = self.sum();
        CladoParams {
            allopatry: self.allopatry / s,
            sympatry: self.sympatry / s,
            copy: self.copy / s,
            jump: self.jump / s,
        }
    }
}

/// Optional per-region override of rates and/or cladogenesis params.
#[derive(Debug, Clone, Default)]
pub struct PerRegionParams {
    pub rates: Option<RateParams>,
    pub cladogenesis: Option<CladoParams>,
}

/// A global speciation clock used only when simulating the tree jointly
/// with the range process; independent of the current range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub cladogenesis: f64,
}

/// Aggregates rate/cladogenesis parameters, optional per-region overrides,
/// an optional adjustment matrix, and the flags that select between
/// competing counting/sampling conventions.
#[derive(Debug, Clone)]
pub struct Model {
    pub rate_params: RateParams,
    pub clado_params: CladoParams,
    per_region_params: Vec<PerRegionParams>,
    adjustment_matrix: Option<AdjustmentMatrix>,
    /// How the two-region edge case of allopatry/copy is counted. `false`
    /// (the default) matches Matzke's +J convention: counted by outcome.
    pub duplicity: bool,
    /// Whether extinction of a singleton range is permitted at all.
    pub extinction_of_singletons: bool,
    pub tree_params: Option<TreeParams>,
}

impl Model {
    #[must_use]
    pub fn new(rate_params: RateParams, clado_params: CladoParams) -> Self {
        Self {
            rate_params,
            clado_params,
            per_region_params: Vec::new(),
            adjustment_matrix: None,
            duplicity: false,
            extinction_of_singletons: false,
            tree_params: None,
        }
    }

    #[must_use]
    pub fn with_per_region_params(mut self, per_region_params: Vec<PerRegionParams>) -> Self {
        self.per_region_params = per_region_params;
        self
    }

    #[must_use]
    pub fn with_adjustment_matrix(mut self, matrix: AdjustmentMatrix) -> Self {
        self.adjustment_matrix = Some(matrix);
        self
    }

    #[must_use]
    pub fn with_duplicity(mut self, duplicity: bool) -> Self {
        self.duplicity = duplicity;
        self
    }

    #[must_use]
    pub fn with_extinction_of_singletons(mut self, extinction_of_singletons: bool) -> Self {
        self.extinction_of_singletons = extinction_of_singletons;
        self
    }

    #[must_use]
    pub fn with_tree_params(mut self, tree_params: TreeParams) -> Self {
        self.tree_params = Some(tree_params);
        self
    }

    fn has_per_region_params(&self) -> bool {
        !self.per_region_params.is_empty()
    }

    fn dispersion_rate_for_region(&self, region: u8) -> f64 {
        self.per_region_params
            .get(usize::from(region))
            .and_then(|p| p.rates)
            .map_or(self.rate_params.dis, |r| r.dis)
    }

    fn extinction_rate_for_region(&self, region: u8) -> f64 {
        self.per_region_params
            .get(usize::from(region))
            .and_then(|p| p.rates)
            .map_or(self.rate_params.ext, |r| r.ext)
    }

    /// The effective dispersion rate from region `from` to region `to`,
    /// adjustment-matrix-weighted if present.
    fn dispersion_rate(&self, from: u8, to: u8) -> f64 {
        let base = self.dispersion_rate_for_region(to);
        match &self.adjustment_matrix {
            Some(a) => base * a.get(from, to),
            None => base,
        }
    }

    /// The contribution of present region `i` to the total extinction
    /// weight: the per-region extinction rate if set, else the global
    /// `ext`. Returns 0 if `i` is absent from `D`, or if `D` is a
    /// singleton and extinction-of-singletons is off.
    #[must_use]
    pub fn extinction_weight_for_index(&self, dist: Dist, i: u8) -> f64 {
        if !dist.get(i) {
            return 0.0;
        }
        if !self.has_per_region_params() && dist.singleton() && !self.extinction_of_singletons {
            return 0.0;
        }
        self.extinction_rate_for_region(i)
    }

    /// `w_d(D, j)`: the contribution of absent region `j` to the total
    /// dispersion weight. Zero if `j` is present in `D`.
    #[must_use]
    pub fn dispersion_weight_for_index(&self, dist: Dist, j: u8) -> f64 {
        if dist.get(j) {
            return 0.0;
        }
        if let Some(a) = &self.adjustment_matrix {
            let mut sum = 0.0;
            for i in 0..dist.regions() {
                if dist.get(i) {
                    sum += self.dispersion_rate_for_region(j) * a.get(i, j);
                }
            }
            sum
        } else {
            self.dispersion_rate_for_region(j)
        }
    }

    /// `W_d(D)`, total dispersion weight.
    #[must_use]
    pub fn dispersion_weight(&self, dist: Dist) -> f64 {
        if !self.has_per_region_params() && self.adjustment_matrix.is_none() {
            return self.rate_params.dis * f64::from(dist.empty_region_count());
        }
        let mut sum = 0.0;
        for j in 0..dist.regions() {
            if dist.get(j) {
                continue;
            }
            for i in 0..dist.regions() {
                if dist.get(i) {
                    sum += self.dispersion_rate(i, j);
                }
            }
        }
        sum
    }

    /// `W_e(D)`, total extinction weight.
    #[must_use]
    pub fn extinction_weight(&self, dist: Dist) -> f64 {
        if !self.has_per_region_params() {
            if dist.singleton() && !self.extinction_of_singletons {
                return 0.0;
            }
            return self.rate_params.ext * f64::from(dist.full_region_count());
        }
        let mut sum = 0.0;
        for i in 0..dist.regions() {
            if dist.get(i) {
                sum += self.extinction_rate_for_region(i);
            }
        }
        sum
    }

    #[must_use]
    pub fn total_rate_weight(&self, dist: Dist) -> f64 {
        self.dispersion_weight(dist) + self.extinction_weight(dist)
    }

    /// Whether extinction is permitted to fire on the current dist, per the
    /// singleton-suppression rule (used by the Fast region-flip walk).
    #[must_use]
    pub fn extinction_allowed(&self, dist: Dist) -> bool {
        !dist.singleton() || self.extinction_of_singletons
    }

    // ---- cladogenesis counts (combinatorial cardinalities) ----

    #[must_use]
    pub fn jump_count(&self, dist: Dist) -> u32 {
        dist.empty_region_count() * 2
    }

    #[must_use]
    pub fn allopatry_count(&self, dist: Dist) -> u32 {
        if dist.singleton() {
            return 0;
        }
        let base = dist.full_region_count() * 2;
        if !self.duplicity && dist.full_region_count() == 2 {
            base - 2
        } else {
            base
        }
    }

    #[must_use]
    pub fn sympatry_count(&self, dist: Dist) -> u32 {
        if dist.singleton() {
            return 0;
        }
        dist.full_region_count() * 2
    }

    #[must_use]
    pub fn copy_count(&self, dist: Dist) -> u32 {
        if !dist.singleton() {
            return 0;
        }
        if self.duplicity {
            1
        } else {
            2
        }
    }

    fn clado_param_for(&self, dist: Dist, pick: impl Fn(&CladoParams) -> f64) -> f64 {
        self.per_region_params
            .iter()
            .enumerate()
            .find(|(i, p)| dist.get(*i as u8) && p.cladogenesis.is_some())
            .and_then(|(_, p)| p.cladogenesis.map(|c| pick(&c)))
            .unwrap_or_else(|| pick(&self.clado_params))
    }

    #[must_use]
    pub fn allopatry_weight(&self, dist: Dist) -> f64 {
        f64::from(self.allopatry_count(dist)) * self.clado_param_for(dist, |c| c.allopatry)
    }

    #[must_use]
    pub fn sympatry_weight(&self, dist: Dist) -> f64 {
        f64::from(self.sympatry_count(dist)) * self.clado_param_for(dist, |c| c.sympatry)
    }

    #[must_use]
    pub fn copy_weight(&self, dist: Dist) -> f64 {
        f64::from(self.copy_count(dist)) * self.clado_param_for(dist, |c| c.copy)
    }

    #[must_use]
    pub fn jump_weight(&self, dist: Dist) -> f64 {
        f64::from(self.jump_count(dist)) * self.clado_param_for(dist, |c| c.jump)
    }

    #[must_use]
    pub fn total_singleton_weight(&self, dist: Dist) -> f64 {
        self.copy_weight(dist) + self.jump_weight(dist)
    }

    #[must_use]
    pub fn total_nonsingleton_weight(&self, dist: Dist) -> f64 {
        self.sympatry_weight(dist) + self.allopatry_weight(dist) + self.jump_weight(dist)
    }

    /// The total speciation weight used to roll a split type. Overridden by
    /// `tree_params.cladogenesis` when present (tree simulation uses a
    /// range-independent speciation clock).
    #[must_use]
    pub fn total_speciation_weight(&self, dist: Dist) -> f64 {
        if let Some(tp) = self.tree_params {
            return tp.cladogenesis;
        }
        if dist.singleton() {
            self.total_singleton_weight(dist)
        } else {
            self.total_nonsingleton_weight(dist)
        }
    }

    #[must_use]
    pub fn jumps_ok(&self) -> bool {
        self.clado_params.jump > 0.0
            || self
                .per_region_params
                .iter()
                .any(|p| p.cladogenesis.is_some_and(|c| c.jump > 0.0))
    }

    /// Acceptance probability for an adjustment-aware jump from `from` to
    /// `to`; `1.0` (always accept) if no adjustment matrix is set.
    #[must_use]
    pub fn adjustment_prob(&self, from: u8, to: u8) -> f64 {
        self.adjustment_matrix.as_ref().map_or(1.0, |a| a.get(from, to))
    }

    #[must_use]
    pub fn adjustment_matrix(&self) -> Option<&AdjustmentMatrix> {
        self.adjustment_matrix.as_ref()
    }

    /// Batch-validates the model against a region count, collecting every
    /// problem found rather than failing on the first.
    pub fn check_ok(&self, regions: u8) -> Result<(), ModelError> {
        let mut problems = Vec::new();

        if self.rate_params.dis < 0.0 {
            problems.push(ModelProblem::NegativeRate { field: "dis", value: self.rate_params.dis });
        }
        if self.rate_params.ext < 0.0 {
            problems.push(ModelProblem::NegativeRate { field: "ext", value: self.rate_params.ext });
        }
        for (field, value) in [
            ("allopatry", self.clado_params.allopatry),
            ("sympatry", self.clado_params.sympatry),
            ("copy", self.clado_params.copy),
            ("jump", self.clado_params.jump),
        ] {
            if value < 0.0 {
                problems.push(ModelProblem::NegativeClado { field, value });
            }
        }

        let full = Dist::full(regions);
        let singleton = Dist::new(1, regions);
        if self.total_nonsingleton_weight(full) == 0.0 {
            problems.push(ModelProblem::NoNonSingletonSplit);
        }
        if self.total_singleton_weight(singleton) == 0.0 {
            problems.push(ModelProblem::NoSingletonSplit);
        }

        if self.has_per_region_params() && self.per_region_params.len() != usize::from(regions) {
            problems.push(ModelProblem::PerRegionCountMismatch {
                given: self.per_region_params.len(),
                regions,
            });
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ModelError::Invalid(problems))
        }
    }
}

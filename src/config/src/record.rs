//! Serializable configuration records. These mirror, but are deliberately
//! distinct from, the kernel's own `Model`/`Period`/`Dist` types -- this
//! module's job is validating user input and converting it into the
//! kernel's types, not being those types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use kernel::{AdjustmentMatrix, CladoParams, Dist, Model, PerRegionParams, Period, PeriodList, RateParams, TreeParams};
use located_error::prelude::*;

use crate::adjustment_table::load_adjustment_table;

/// Sampling algorithm selector, mirrored from `kernel::SampleMode`/`SplitMode`
/// so the config record family can derive `Serialize`/`Deserialize` without
/// requiring the kernel crate to carry a serde dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleMode {
    Fast,
    Sim,
}

impl SampleMode {
    #[must_use]
    pub fn to_spread_mode(self) -> kernel::SampleMode {
        match self {
            Self::Fast => kernel::SampleMode::Fast,
            Self::Sim => kernel::SampleMode::Sim,
        }
    }

    #[must_use]
    pub fn to_split_mode(self) -> kernel::SplitMode {
        match self {
            Self::Fast => kernel::SplitMode::Fast,
            Self::Sim => kernel::SplitMode::Sim,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    pub dis: f64,
    pub ext: f64,
}

impl From<RateConfig> for RateParams {
    fn from(r: RateConfig) -> Self {
        RateParams { dis: r.dis, ext: r.ext }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CladoConfig {
    pub allopatry: f64,
    pub sympatry: f64,
    pub copy: f64,
    pub jump: f64,
}

impl From<CladoConfig> for CladoParams {
    fn from(c: CladoConfig) -> Self {
        CladoParams { allopatry: c.allopatry, sympatry: c.sympatry, copy: c.copy, jump: c.jump }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerRegionConfig {
    pub rates: Option<RateConfig>,
    pub cladogenesis: Option<CladoConfig>,
}

impl From<PerRegionConfig> for PerRegionParams {
    fn from(p: PerRegionConfig) -> Self {
        PerRegionParams { rates: p.rates.map(Into::into), cladogenesis: p.cladogenesis.map(Into::into) }
    }
}

/// `{adjustments?, exponent?, simulate?, matrix_filename?}` -- at most one
/// of `matrix_filename`/`simulate` should be given; if both are, the file
/// takes precedence and `simulate` is ignored (a provided matrix is assumed
/// intentional).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdjustmentConfig {
    pub matrix_filename: Option<PathBuf>,
    pub simulate: Option<(f64, f64)>,
    pub exponent: Option<f64>,
}

impl AdjustmentConfig {
    fn resolve(&self, regions: u8, rng: &mut impl rand::Rng) -> Result<Option<AdjustmentMatrix>> {
        let mut matrix = if let Some(path) = &self.matrix_filename {
            let m = load_adjustment_table(path, regions).with_loc(|| format!("While loading adjustment matrix table {}", path.display()))?;
            Some(m)
        } else if let Some((alpha, beta)) = self.simulate {
            Some(AdjustmentMatrix::simulate(regions, alpha, beta, rng))
        } else {
            None
        };

        if let (Some(m), Some(exponent)) = (&mut matrix, self.exponent) {
            m.apply_exponent(exponent);
        }
        Ok(matrix)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodConfig {
    pub start: f64,
    pub length: f64,
    pub rates: RateConfig,
    pub cladogenesis: CladoConfig,
    #[serde(default)]
    pub per_region: Option<Vec<PerRegionConfig>>,
    #[serde(default)]
    pub adjustment: Option<AdjustmentConfig>,
}

impl PeriodConfig {
    fn resolve(
        &self,
        index: usize,
        regions: u8,
        duplicity: bool,
        extinction_of_singletons: bool,
        rng: &mut impl rand::Rng,
    ) -> Result<Period> {
        let mut model = Model::new(self.rates.clone().into(), self.cladogenesis.clone().into())
            .with_duplicity(duplicity)
            .with_extinction_of_singletons(extinction_of_singletons);

        if let Some(per_region) = &self.per_region {
            model = model.with_per_region_params(per_region.iter().cloned().map(Into::into).collect());
        }
        if let Some(adjustment) = &self.adjustment {
            if let Some(matrix) = adjustment.resolve(regions, rng)? {
                model = model.with_adjustment_matrix(matrix);
            }
        }

        model.check_ok(regions).with_loc(|| format!("While validating period {index}"))?;
        Ok(Period { start: self.start, length: self.length, model, index })
    }
}

/// `{root_dist|root_region_count}` -- exactly one should be given: a literal
/// `"0101"`-style range string, or a region count (root starts occupying
/// every region).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistConfig {
    pub root_dist: Option<String>,
    pub root_region_count: Option<u8>,
}

impl DistConfig {
    fn resolve(&self) -> Result<Dist> {
        if let Some(s) = &self.root_dist {
            let regions = u8::try_from(s.len()).with_loc(|| format!("While parsing root_dist {s}"))?;
            return Dist::from_str_n(s, regions).with_loc(|| format!("While parsing root_dist {s}"));
        }
        let regions = self.root_region_count.unwrap_or(1);
        Ok(Dist::full(regions))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSimConfig {
    pub cladogenesis: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub newick_path: Option<PathBuf>,
    pub yaml_path: Option<PathBuf>,
}

/// The top-level configuration record, the `config` crate's own external
/// representation -- parsed from CLI flags or a YAML file, then resolved
/// into the kernel's `PeriodList`/`Dist`/`Model` types by [`Config::resolve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub seed: Option<u64>,
    pub periods: Vec<PeriodConfig>,
    pub root_dist: DistConfig,
    #[serde(default)]
    pub duplicity: bool,
    #[serde(default)]
    pub extinction_of_singletons: bool,
    pub simulate_tree: Option<TreeSimConfig>,
    pub mode: SampleMode,
    pub tree_file: Option<PathBuf>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// A fully resolved, kernel-ready configuration.
pub struct ResolvedConfig {
    pub root_dist: Dist,
    pub periods: PeriodList,
    pub mode: SampleMode,
    pub tree_sim: Option<TreeSimConfig>,
    pub tree_file: Option<PathBuf>,
    pub output: OutputConfig,
}

impl Config {
    /// Converts every `PeriodConfig` into a `kernel::Period` (resolving
    /// adjustment matrices along the way), validates contiguity via
    /// `PeriodList::new`, and resolves the root range.
    ///
    /// # Errors
    /// Returns an error if any period's model parameters are invalid, if an
    /// adjustment matrix table fails to load or parse, or if the resolved
    /// periods are not contiguous.
    pub fn resolve(&self, rng: &mut impl rand::Rng) -> Result<ResolvedConfig> {
        let root_dist = self.root_dist.resolve().loc("While resolving the root range")?;
        let regions = root_dist.regions();

        let mut periods: Vec<Period> = self
            .periods
            .iter()
            .enumerate()
            .map(|(i, p)| p.resolve(i, regions, self.duplicity, self.extinction_of_singletons, rng))
            .collect::<Result<_>>()
            .loc("While resolving configured periods")?;

        if let Some(tree_sim) = &self.simulate_tree {
            let tree_params = TreeParams { cladogenesis: tree_sim.cladogenesis };
            for period in &mut periods {
                period.model = period.model.clone().with_tree_params(tree_params);
            }
        }

        let periods = PeriodList::new(periods).with_loc(|| "While validating the configured periods".to_string())?;

        Ok(ResolvedConfig {
            root_dist,
            periods,
            mode: self.mode,
            tree_sim: self.simulate_tree.clone(),
            tree_file: self.tree_file.clone(),
            output: self.output.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_config() -> Config {
        Config {
            seed: Some(7),
            periods: vec![PeriodConfig {
                start: 0.0,
                length: 10.0,
                rates: RateConfig { dis: 1.0, ext: 1.0 },
                cladogenesis: CladoConfig { allopatry: 1.0, sympatry: 1.0, copy: 1.0, jump: 1.0 },
                per_region: None,
                adjustment: None,
            }],
            root_dist: DistConfig { root_dist: Some("0101".to_string()), root_region_count: None },
            duplicity: false,
            extinction_of_singletons: false,
            simulate_tree: None,
            mode: SampleMode::Fast,
            tree_file: None,
            output: OutputConfig::default(),
        }
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let config = sample_config();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.seed, config.seed);
        assert_eq!(parsed.periods.len(), config.periods.len());
        assert_eq!(parsed.root_dist.root_dist, config.root_dist.root_dist);
        assert_eq!(parsed.mode, config.mode);
    }

    #[test]
    fn resolve_builds_a_contiguous_period_list_and_root_range() {
        let config = sample_config();
        let mut rng = StdRng::seed_from_u64(0);
        let resolved = config.resolve(&mut rng).unwrap();
        assert_eq!(resolved.root_dist.regions(), 4);
        assert_eq!(resolved.periods.periods().len(), 1);
    }

    #[test]
    fn resolve_rejects_a_negative_rate() {
        let mut config = sample_config();
        config.periods[0].rates.dis = -1.0;
        let mut rng = StdRng::seed_from_u64(0);
        assert!(config.resolve(&mut rng).is_err());
    }

    #[test]
    fn resolve_threads_extinction_of_singletons_into_every_period_model() {
        let mut config = sample_config();
        config.extinction_of_singletons = true;
        let mut rng = StdRng::seed_from_u64(0);
        let resolved = config.resolve(&mut rng).unwrap();
        assert!(resolved.periods.periods()[0].model.extinction_of_singletons);
    }

    #[test]
    fn resolve_threads_tree_sim_cladogenesis_into_every_period_model() {
        let mut config = sample_config();
        config.simulate_tree = Some(TreeSimConfig { cladogenesis: 0.5, duration: 10.0 });
        let mut rng = StdRng::seed_from_u64(0);
        let resolved = config.resolve(&mut rng).unwrap();
        let tree_params = resolved.periods.periods()[0].model.tree_params.unwrap();
        assert_eq!(tree_params.cladogenesis, 0.5);
    }
}

//! Anagenesis sampler: one continuous-time Markov chain event (a single
//! region gained or lost) drawn either analytically or by rejection.

use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::Exp;

use crate::dist::Dist;
use crate::error::{Error, Result};
use crate::model::Model;

/// Selects between the fast analytic sampler (the production path) and the
/// rejection sampler (used only to cross-check Fast).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    Fast,
    Sim,
}

/// One anagenetic event: a waiting time and the resulting range. The
/// `period_index` is left at 0 here; the caller (`simulate_transitions`)
/// stamps the real value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub waiting_time: f64,
    pub initial_state: Dist,
    pub final_state: Dist,
    pub period_index: usize,
}

/// Samples one transition under `mode`. Region iteration order (ascending)
/// is fixed and is part of the reproducibility contract: don't reorder it.
pub fn spread(dist: Dist, model: &Model, rng: &mut impl Rng, mode: SampleMode) -> Result<Transition> {
    match mode {
        SampleMode::Fast => spread_analytic(dist, model, rng),
        SampleMode::Sim => spread_rejection(dist, model, rng),
    }
}

/// Draws the waiting time from the aggregate exponential rate, then rolls
/// the flipped region from a single uniform draw. Linear in the region
/// count thanks to the region-weight walk, not the popcount.
pub fn spread_analytic(dist: Dist, model: &Model, rng: &mut impl Rng) -> Result<Transition> {
    let total_weight = model.total_rate_weight(dist);
    if total_weight <= 0.0 {
        return Err(Error::NoEventsPossible);
    }
    let waiting_time = Exp::new(total_weight).expect("positive rate").sample(rng);
    let mut transition = spread_flip_region(dist, model, total_weight, rng);
    transition.waiting_time = waiting_time;
    Ok(transition)
}

fn spread_flip_region(dist: Dist, model: &Model, total_weight: f64, rng: &mut impl Rng) -> Transition {
    let mut roll = rng.gen_range(0.0..total_weight);
    for i in 0..dist.regions() {
        if dist.get(i) {
            roll -= model.extinction_weight_for_index(dist, i);
        } else {
            roll -= model.dispersion_weight_for_index(dist, i);
        }
        if roll <= 0.0 {
            return Transition {
                waiting_time: f64::INFINITY,
                initial_state: dist,
                final_state: dist.flip_region(i),
                period_index: 0,
            };
        }
    }
    // Floating-point roundoff: fall back to the last region considered.
    let last = dist.regions() - 1;
    Transition { waiting_time: f64::INFINITY, initial_state: dist, final_state: dist.flip_region(last), period_index: 0 }
}

/// For each region, draws an independent exponential with that region's
/// event rate; the minimum across regions defines both the waiting time
/// and the flipped region. Used only to validate `spread_analytic`.
pub fn spread_rejection(dist: Dist, model: &Model, rng: &mut impl Rng) -> Result<Transition> {
    let singleton = dist.singleton();
    let mut best: Option<Transition> = None;

    for i in 0..dist.regions() {
        if singleton && dist.get(i) && !model.extinction_of_singletons {
            continue;
        }
        let rate = if dist.get(i) {
            model.extinction_weight_for_index(dist, i)
        } else {
            model.dispersion_weight_for_index(dist, i)
        };
        if rate <= 0.0 {
            continue;
        }
        let waiting_time = Exp::new(rate).expect("positive rate").sample(rng);
        if best.map_or(true, |b| waiting_time < b.waiting_time) {
            best = Some(Transition { waiting_time, initial_state: dist, final_state: dist.flip_region(i), period_index: 0 });
        }
    }
    best.ok_or(Error::NoEventsPossible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CladoParams, RateParams};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn model(dis: f64, ext: f64) -> Model {
        Model::new(RateParams { dis, ext }, CladoParams { allopatry: 1.0, sympatry: 1.0, copy: 1.0, jump: 1.0 })
    }

    #[test]
    fn fast_spread_flips_exactly_one_bit() {
        let mut rng = StdRng::seed_from_u64(1);
        let m = model(1.0, 1.0);
        let d = Dist::new(0b0101, 4);
        for _ in 0..1000 {
            let t = spread(d, &m, &mut rng, SampleMode::Fast).unwrap();
            assert_eq!(t.initial_state, d);
            assert_ne!(t.final_state, d);
            assert_eq!(t.final_state.symmetric_difference(d).popcount(), 1);
        }
    }

    #[test]
    fn no_events_possible_when_all_rates_zero() {
        let mut rng = StdRng::seed_from_u64(2);
        let m = model(0.0, 0.0);
        let d = Dist::new(0b0101, 4);
        assert!(matches!(spread(d, &m, &mut rng, SampleMode::Fast), Err(Error::NoEventsPossible)));
    }

    #[test]
    fn s1_fast_mean_waiting_time_converges() {
        // N=4, D=0b0101, dis=ext=1, expected mean wait = 1/4 = 0.25
        let mut rng = StdRng::seed_from_u64(12345);
        let m = model(1.0, 1.0);
        let d = Dist::new(0b0101, 4);
        let iters = 188_609;
        let mut sum = 0.0;
        for _ in 0..iters {
            sum += spread(d, &m, &mut rng, SampleMode::Fast).unwrap().waiting_time;
        }
        let mean = sum / f64::from(iters as u32);
        assert!((mean - 0.25).abs() < 0.01, "mean {mean} not within 0.01 of 0.25");
    }

    #[test]
    fn fast_and_sim_agree_on_mean_waiting_time() {
        let mut rng = StdRng::seed_from_u64(99);
        let m = model(1.0, 1.0);
        let d = Dist::new(0b0101, 4);
        let iters = 20_000;
        let mut fast_sum = 0.0;
        let mut sim_sum = 0.0;
        for _ in 0..iters {
            fast_sum += spread(d, &m, &mut rng, SampleMode::Fast).unwrap().waiting_time;
            sim_sum += spread(d, &m, &mut rng, SampleMode::Sim).unwrap().waiting_time;
        }
        let fast_mean = fast_sum / f64::from(iters as u32);
        let sim_mean = sim_sum / f64::from(iters as u32);
        assert!((fast_mean - sim_mean).abs() / fast_mean < 0.05);
    }
}

//! Piecewise-constant time periods, each carrying a `Model`, composed
//! across a tree branch with the anagenetic waiting-time remainder carried
//! forward across period boundaries.

use thiserror::Error;

use crate::dist::Dist;
use crate::model::Model;
use crate::spread::{spread, SampleMode, Transition};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PeriodError {
    #[error("period list is empty")]
    Empty,

    #[error("gap or overlap between periods: period {prev_index} ends at {prev_end} but period {next_index} starts at {next_start}")]
    Gap { prev_index: usize, prev_end: f64, next_index: usize, next_start: f64 },

    #[error("period has negative length: start {start}, length {length}")]
    NegativeLength { start: f64, length: f64 },
}

/// `{start, length, model}`; `end = start + length`. `index` is the
/// period's position in its owning `PeriodList`.
#[derive(Debug, Clone)]
pub struct Period {
    pub start: f64,
    pub length: f64,
    pub model: Model,
    pub index: usize,
}

impl Period {
    #[must_use]
    pub fn end(&self) -> f64 {
        self.start + self.length
    }

    fn clamp(&mut self, s: f64, e: f64) {
        if self.start < s {
            let new_length = self.length - (s - self.start);
            self.start = s;
            self.length = new_length;
        }
        if self.end() > e {
            self.length = e - self.start;
        }
    }
}

/// A nonempty, start-ordered, contiguous sequence of periods covering the
/// tree's time span.
#[derive(Debug, Clone)]
pub struct PeriodList {
    periods: Vec<Period>,
}

impl PeriodList {
    /// Builds a list from periods already in start order, checking
    /// contiguity (`next.start == previous.end`) and non-negative length.
    pub fn new(mut periods: Vec<Period>) -> Result<Self, PeriodError> {
        if periods.is_empty() {
            return Err(PeriodError::Empty);
        }
        for p in &periods {
            if p.length < 0.0 {
                return Err(PeriodError::NegativeLength { start: p.start, length: p.length });
            }
        }
        for i in 0..periods.len() {
            periods[i].index = i;
        }
        for w in periods.windows(2) {
            let (prev, next) = (&w[0], &w[1]);
            if (prev.end() - next.start).abs() > 1e-9 {
                return Err(PeriodError::Gap {
                    prev_index: prev.index,
                    prev_end: prev.end(),
                    next_index: next.index,
                    next_start: next.start,
                });
            }
        }
        Ok(Self { periods })
    }

    #[must_use]
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Builds a sub-list clamped to `[start, end]`, dropping periods that
    /// fall entirely outside the window and clamping the boundary periods.
    #[must_use]
    pub fn sub_range(&self, start: f64, end: f64) -> PeriodList {
        let mut periods: Vec<Period> = self
            .periods
            .iter()
            .filter(|p| !(p.end() < start || p.start > end))
            .cloned()
            .collect();
        for p in &mut periods {
            p.clamp(start, end);
        }
        PeriodList { periods }
    }

    /// Linear search for the period containing `t`.
    #[must_use]
    pub fn get(&self, t: f64) -> Option<&Period> {
        self.periods.iter().find(|p| p.start <= t && t <= p.end())
    }
}

/// Produces the ordered anagenetic transitions along a branch whose total
/// length is the sum of the period lengths in `periods`. The waiting-time
/// remainder from a draw that overshoots a period boundary is carried
/// forward into the next period (memorylessness of the exponential makes
/// this exact, not an approximation).
pub fn simulate_transitions(
    mut init_dist: Dist,
    periods: &PeriodList,
    rng: &mut impl rand::Rng,
    mode: SampleMode,
) -> crate::error::Result<Vec<Transition>> {
    let mut results = Vec::new();
    let mut remainder = 0.0;

    for period in periods.periods() {
        let mut brlen = period.length;
        loop {
            let mut t = spread(init_dist, &period.model, rng, mode)?;
            t.period_index = period.index;
            t.waiting_time += remainder;
            remainder = 0.0;

            let remaining = brlen - t.waiting_time;
            if remaining < 0.0 {
                remainder = brlen;
                break;
            }

            brlen = remaining;
            init_dist = t.final_state;
            results.push(t);
        }
    }
    Ok(results)
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
    fn rejects_empty_list() {
        assert!(matches!(PeriodList::new(vec![]), Err(PeriodError::Empty)));
    }

    #[test]
    fn rejects_gap() {
        let periods = vec![
            Period { start: 0.0, length: 1.0, model: model(1.0, 1.0), index: 0 },
            Period { start: 2.0, length: 1.0, model: model(1.0, 1.0), index: 0 },
        ];
        assert!(matches!(PeriodList::new(periods), Err(PeriodError::Gap { .. })));
    }

    #[test]
    fn accepts_contiguous_periods() {
        let periods = vec![
            Period { start: 0.0, length: 1.0, model: model(1.0, 1.0), index: 0 },
            Period { start: 1.0, length: 1.0, model: model(10.0, 10.0), index: 0 },
        ];
        assert!(PeriodList::new(periods).is_ok());
    }

    #[test]
    fn sub_range_clamps_boundary_periods() {
        let periods = vec![
            Period { start: 0.0, length: 1.0, model: model(1.0, 1.0), index: 0 },
            Period { start: 1.0, length: 2.0, model: model(1.0, 1.0), index: 0 },
        ];
        let list = PeriodList::new(periods).unwrap();
        let sub = list.sub_range(0.5, 2.0);
        assert_eq!(sub.periods()[0].start, 0.5);
        assert_eq!(sub.periods().last().unwrap().end(), 2.0);
    }

    #[test]
    fn s6_scenario_expected_transition_count() {
        // Two periods [0,1] dis=1, [1,2] dis=10, D={0}: expected count ~ 1 + 10 = 11
        let periods = PeriodList::new(vec![
            Period { start: 0.0, length: 1.0, model: model(1.0, 0.0), index: 0 },
            Period { start: 1.0, length: 1.0, model: model(10.0, 0.0), index: 0 },
        ])
        .unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let n = 2;
        let init = Dist::new(0b01, n);
        let iters = 5000;
        let mut total = 0usize;
        for _ in 0..iters {
            let transitions = simulate_transitions(init, &periods, &mut rng, SampleMode::Fast).unwrap();
            total += transitions.len();
        }
        let mean = total as f64 / f64::from(iters as u32);
        assert!((mean - 11.0).abs() < 2.0, "mean transition count {mean} too far from 11");
    }
}

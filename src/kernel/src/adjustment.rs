//! Per-region-pair adjustment matrix, weighting dispersion and jumps.

use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::Gamma;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdjustmentError {
    #[error("adjustment matrix has {given} entries, expected {expected} for {regions} regions")]
    InvalidMatrixShape { given: usize, expected: usize, regions: u8 },

    #[error("adjustment matrix is not symmetric: A[{i},{j}] = {a_ij} but A[{j},{i}] = {a_ji}")]
    NotSymmetric { i: usize, j: usize, a_ij: f64, a_ji: f64 },
}

/// Square N x N matrix of nonnegative doubles, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentMatrix {
    map: Vec<f64>,
    regions: u8,
}

impl AdjustmentMatrix {
    /// Builds a matrix from a flat row-major buffer of exactly
    /// `regions * regions` entries.
    pub fn from_flat(map: Vec<f64>, regions: u8) -> Result<Self, AdjustmentError> {
        let expected = usize::from(regions) * usize::from(regions);
        if map.len() != expected {
            return Err(AdjustmentError::InvalidMatrixShape { given: map.len(), expected, regions });
        }
        Ok(Self { map, regions })
    }

    /// Builds a matrix from a table of `(from, to, value)` triples. Accepts
    /// either the symmetric shape (`N(N+1)/2` rows, i <= j, every (i,j)
    /// implying a matching (j,i) value) or the asymmetric shape (`N(N-1)`
    /// rows, one per ordered pair i != j). Diagonal entries are ignored.
    pub fn from_triples(
        triples: &[(usize, usize, f64)],
        regions: u8,
    ) -> Result<Self, AdjustmentError> {
        let n = usize::from(regions);
        let mut map = vec![0.0f64; n * n];
        let mut seen = vec![false; n * n];

        for &(from, to, value) in triples {
            if from == to {
                continue;
            }
            map[from * n + to] = value;
            seen[from * n + to] = true;
        }

        // Symmetric-shape check: if the caller never populated the mirror
        // entry for a pair they did populate, that's fine (asymmetric
        // input); but if they populated *both* with disagreeing values,
        // that's a genuine NotSymmetric error in the symmetric-input case.
        for i in 0..n {
            for j in (i + 1)..n {
                if seen[i * n + j] && seen[j * n + i] && (map[i * n + j] - map[j * n + i]).abs() > 1e-12 {
                    return Err(AdjustmentError::NotSymmetric {
                        i,
                        j,
                        a_ij: map[i * n + j],
                        a_ji: map[j * n + i],
                    });
                }
                // Symmetric-shape input only supplies one direction; mirror it.
                if seen[i * n + j] && !seen[j * n + i] {
                    map[j * n + i] = map[i * n + j];
                }
                if seen[j * n + i] && !seen[i * n + j] {
                    map[i * n + j] = map[j * n + i];
                }
            }
        }

        Self::from_flat(map, regions)
    }

    #[must_use]
    pub fn regions(&self) -> u8 {
        self.regions
    }

    #[must_use]
    pub fn get(&self, from: u8, to: u8) -> f64 {
        self.map[usize::from(from) * usize::from(self.regions) + usize::from(to)]
    }

    /// Replaces each nonzero entry `a` with `a.powf(exponent)`.
    pub fn apply_exponent(&mut self, exponent: f64) {
        for a in &mut self.map {
            if *a != 0.0 {
                *a = a.powf(exponent);
            }
        }
    }

    /// Fills a fresh symmetric matrix with IID Gamma(alpha, beta) off
    /// diagonal entries. The diagonal is always left (or set) to zero: the
    /// legacy implementation this is grounded on leaves the diagonal
    /// uninitialized, but it is never read by a sampler, so this
    /// implementation zeroes it explicitly for determinism.
    pub fn simulate(regions: u8, alpha: f64, beta: f64, rng: &mut impl Rng) -> Self {
        let n = usize::from(regions);
        let mut map = vec![0.0f64; n * n];
        let dist = Gamma::new(alpha, beta).expect("alpha and beta must be positive");
        for i in 0..n {
            for j in (i + 1)..n {
                let v = dist.sample(rng);
                map[i * n + j] = v;
                map[j * n + i] = v;
            }
        }
        Self { map, regions }
    }
}

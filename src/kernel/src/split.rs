//! Cladogenesis sampler: partitions a parent range between two daughter
//! lineages under one of four competing speciation modes.

use rand::distributions::{Bernoulli, Distribution, Uniform};
use rand::Rng;

use crate::dist::Dist;
use crate::error::{Error, Result};
use crate::model::Model;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitType {
    Singleton,
    Allopatric,
    Sympatric,
    Jump,
    Invalid,
}

/// Selects which of the three cladogenesis algorithms samples a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    Fast,
    Sim,
    Adjusted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    pub left: Dist,
    pub right: Dist,
    pub top: Dist,
    pub split_type: SplitType,
    pub period_index: usize,
}

fn trivial_singleton(dist: Dist) -> Split {
    Split { left: dist, right: dist, top: dist, split_type: SplitType::Singleton, period_index: 0 }
}

/// Classifies a daughter pair against its parent. `Invalid` is reachable
/// only from the rejection samplers; `Fast` must never produce it.
#[must_use]
pub fn determine_split_type(parent: Dist, left: Dist, right: Dist) -> SplitType {
    if left.is_empty() || right.is_empty() {
        return SplitType::Invalid;
    }
    if left == parent && right == parent && parent.singleton() {
        return SplitType::Singleton;
    }
    let disjoint = left.intersection(right).is_empty();
    let covers_parent = left.union(right) == parent;
    let either_singleton = left.singleton() || right.singleton();

    let one_is_parent_other_outside =
        (left == parent && right.singleton() && parent.intersection(right).is_empty())
            || (right == parent && left.singleton() && parent.intersection(left).is_empty());
    if one_is_parent_other_outside {
        return SplitType::Jump;
    }
    if disjoint && covers_parent && either_singleton {
        return SplitType::Allopatric;
    }
    let one_is_parent_other_subset = (left == parent && right.singleton() && parent.intersection(right) == right)
        || (right == parent && left.singleton() && parent.intersection(left) == left);
    if one_is_parent_other_subset {
        return SplitType::Sympatric;
    }
    SplitType::Invalid
}

/// Dispatches to one of the three algorithms.
pub fn split(dist: Dist, model: &Model, rng: &mut impl Rng, mode: SplitMode) -> Result<Split> {
    match mode {
        SplitMode::Fast => split_dist_fast(dist, model, rng),
        SplitMode::Sim => split_dist_rejection(dist, model, rng),
        SplitMode::Adjusted => split_dist_rejection_adjusted(dist, model, rng),
    }
}

fn roll_split_type(dist: Dist, model: &Model, rng: &mut impl Rng) -> SplitType {
    let total_weight = model.total_speciation_weight(dist);

    if dist.singleton() {
        let jump_weight = model.jump_weight(dist) / total_weight;
        if Bernoulli::new(jump_weight.clamp(0.0, 1.0)).expect("probability in [0,1]").sample(rng) {
            return SplitType::Jump;
        }
        return SplitType::Singleton;
    }

    let allo = model.allopatry_weight(dist);
    let sym = model.sympatry_weight(dist);
    let jump = model.jump_weight(dist);

    let mut roll = Uniform::new(0.0, total_weight).sample(rng);
    for (weight, ty) in [(allo, SplitType::Allopatric), (sym, SplitType::Sympatric), (jump, SplitType::Jump)] {
        if roll <= weight {
            return ty;
        }
        roll -= weight;
    }
    SplitType::Invalid
}

/// Rolls a split type, then a single region index, and composes the two
/// daughters directly -- no rejection loop, O(1) in expectation.
pub fn split_dist_fast(dist: Dist, model: &Model, rng: &mut impl Rng) -> Result<Split> {
    if !model.jumps_ok() && dist.singleton() {
        return Ok(trivial_singleton(dist));
    }

    let ty = roll_split_type(dist, model, rng);
    if ty == SplitType::Singleton {
        return Ok(trivial_singleton(dist));
    }
    if ty == SplitType::Invalid {
        return Err(Error::InvalidSplit { dist: dist.to_str() });
    }

    let max_index = if ty == SplitType::Jump { dist.empty_region_count() } else { dist.full_region_count() };
    let chosen = rng.gen_range(0..max_index) as usize;
    let flipped_index = if ty == SplitType::Jump { dist.set_index(chosen)? } else { dist.unset_index(chosen)? };

    let mut left = dist;
    if ty == SplitType::Allopatric {
        left = dist.flip_region(flipped_index);
    }
    let mut right = Dist::new(1u64 << flipped_index, dist.regions());

    if Bernoulli::new(0.5).unwrap().sample(rng) {
        std::mem::swap(&mut left, &mut right);
    }

    Ok(Split { left, right, top: dist, split_type: ty, period_index: 0 })
}

/// Draws two completely random daughters, classifies, and accepts with
/// probability proportional to the matching cladogenesis parameter; slow
/// at high region counts, used only to validate Fast.
pub fn split_dist_rejection(dist: Dist, model: &Model, rng: &mut impl Rng) -> Result<Split> {
    if !model.jumps_ok() && dist.singleton() {
        return Ok(trivial_singleton(dist));
    }

    let max_dist = (1u64 << dist.regions()) - 1;
    let dist_gen = Uniform::new_inclusive(1, max_dist);
    let sum = model.total_nonsingleton_weight(Dist::full(dist.regions()))
        .max(model.total_singleton_weight(Dist::new(1, dist.regions())));
    let accept_die = Uniform::new(0.0, sum.max(1.0));

    loop {
        let left = Dist::new(dist_gen.sample(rng), dist.regions());
        let right = Dist::new(dist_gen.sample(rng), dist.regions());
        let ty = determine_split_type(dist, left, right);
        if ty == SplitType::Invalid {
            continue;
        }
        let roll = accept_die.sample(rng);
        let threshold = match ty {
            SplitType::Sympatric => model.sympatry_weight(dist),
            SplitType::Allopatric => model.allopatry_weight(dist),
            SplitType::Singleton => model.copy_weight(dist),
            SplitType::Jump => model.jump_weight(dist),
            SplitType::Invalid => unreachable!(),
        };
        if roll <= threshold {
            return Ok(Split { left, right, top: dist, split_type: ty, period_index: 0 });
        }
    }
}

fn generate_uniform_split(parent: Dist, ty: SplitType, rng: &mut impl Rng) -> Split {
    let max_dist = (1u64 << parent.regions()) - 1;
    let dist_gen = Uniform::new_inclusive(1, max_dist);
    let index_gen = Uniform::new(0, parent.regions());
    loop {
        let left = Dist::new(dist_gen.sample(rng), parent.regions());
        let right = Dist::empty(parent.regions()).flip_region(index_gen.sample(rng));
        if left.union(right) != parent {
            continue;
        }
        let (mut left, mut right) = (left, right);
        if Bernoulli::new(0.5).unwrap().sample(rng) {
            std::mem::swap(&mut left, &mut right);
        }
        if determine_split_type(parent, left, right) == ty {
            return Split { left, right, top: parent, split_type: ty, period_index: 0 };
        }
    }
}

fn generate_adjusted_jump_split(parent: Dist, model: &Model, rng: &mut impl Rng) -> Split {
    let index_gen = Uniform::new(0, parent.regions());
    loop {
        let from = index_gen.sample(rng);
        if !parent.get(from) {
            continue;
        }
        let to = index_gen.sample(rng);
        if parent.get(to) {
            continue;
        }
        let acceptance = model.adjustment_prob(from, to);
        if acceptance == 1.0 || !Bernoulli::new(acceptance.clamp(0.0, 1.0)).unwrap().sample(rng) {
            continue;
        }
        let mut left = parent;
        let mut right = Dist::empty(parent.regions()).flip_region(to);
        if Bernoulli::new(0.5).unwrap().sample(rng) {
            std::mem::swap(&mut left, &mut right);
        }
        if determine_split_type(parent, left, right) == SplitType::Jump {
            return Split { left, right, top: parent, split_type: SplitType::Jump, period_index: 0 };
        }
    }
}

/// Identical to Fast except the jump branch draws `(from, to)` uniformly
/// and accepts with probability `A[from, to]`, retrying on rejection --
/// ensures the adjustment matrix correctly re-weights jumps.
pub fn split_dist_rejection_adjusted(dist: Dist, model: &Model, rng: &mut impl Rng) -> Result<Split> {
    if !model.jumps_ok() && dist.singleton() {
        return Ok(trivial_singleton(dist));
    }

    let sympatry = model.sympatry_weight(dist);
    let allopatry = sympatry + model.allopatry_weight(dist);
    let copy = allopatry + model.copy_weight(dist);
    let jump = copy + model.jump_weight(dist);

    if jump <= 0.0 {
        return Err(Error::NoEventsPossible);
    }

    let roll = Uniform::new(0.0, jump).sample(rng);
    if roll <= sympatry {
        Ok(generate_uniform_split(dist, SplitType::Sympatric, rng))
    } else if roll <= allopatry {
        Ok(generate_uniform_split(dist, SplitType::Allopatric, rng))
    } else if roll <= copy {
        Ok(trivial_singleton(dist))
    } else {
        Ok(generate_adjusted_jump_split(dist, model, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CladoParams, RateParams};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn model(allopatry: f64, sympatry: f64, copy: f64, jump: f64) -> Model {
        Model::new(RateParams { dis: 1.0, ext: 1.0 }, CladoParams { allopatry, sympatry, copy, jump })
    }

    #[test]
    fn s2_allopatry_only_always_classifies_allopatric() {
        let m = model(1.0, 0.0, 0.0, 0.0);
        let mut rng = StdRng::seed_from_u64(3);
        let d = Dist::new(0b1110, 4);
        for _ in 0..500 {
            let s = split(d, &m, &mut rng, SplitMode::Fast).unwrap();
            assert_eq!(s.split_type, SplitType::Allopatric);
            assert_eq!(determine_split_type(d, s.left, s.right), SplitType::Allopatric);
        }
    }

    #[test]
    fn s3_singleton_without_jumps_is_always_singleton() {
        let m = model(1.0, 1.0, 1.0, 0.0);
        let mut rng = StdRng::seed_from_u64(4);
        let d = Dist::new(0b1000, 4);
        for _ in 0..500 {
            let s = split(d, &m, &mut rng, SplitMode::Fast).unwrap();
            assert_eq!(s.split_type, SplitType::Singleton);
            assert_eq!(s.left, d);
            assert_eq!(s.right, d);
        }
    }

    #[test]
    fn sympatry_only_always_classifies_sympatric() {
        let m = model(0.0, 1.0, 0.0, 0.0);
        let mut rng = StdRng::seed_from_u64(5);
        let d = Dist::new(0b1110, 4);
        for _ in 0..500 {
            let s = split(d, &m, &mut rng, SplitMode::Fast).unwrap();
            assert_eq!(s.split_type, SplitType::Sympatric);
        }
    }

    #[test]
    fn jump_only_always_classifies_jump() {
        let m = model(0.0, 0.0, 0.0, 1.0);
        let mut rng = StdRng::seed_from_u64(6);
        let d = Dist::new(0b1110, 4);
        for _ in 0..500 {
            let s = split(d, &m, &mut rng, SplitMode::Fast).unwrap();
            assert_eq!(s.split_type, SplitType::Jump);
            assert_eq!(determine_split_type(d, s.left, s.right), SplitType::Jump);
        }
    }

    #[test]
    fn fast_never_produces_invalid_for_positive_weights() {
        let m = model(1.0, 1.0, 1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(8);
        for bits in 1u64..16 {
            let d = Dist::new(bits, 4);
            let s = split(d, &m, &mut rng, SplitMode::Fast).unwrap();
            assert_ne!(s.split_type, SplitType::Invalid);
        }
    }

    #[test]
    fn split_daughters_are_never_empty() {
        let m = model(1.0, 1.0, 1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(9);
        let d = Dist::new(0b0110, 4);
        for _ in 0..200 {
            let s = split(d, &m, &mut rng, SplitMode::Fast).unwrap();
            assert!(!s.left.is_empty());
            assert!(!s.right.is_empty());
        }
    }

    #[test]
    fn s5_adjustment_matrix_suppresses_one_jump_direction() {
        use crate::adjustment::AdjustmentMatrix;

        let triples: Vec<(usize, usize, f64)> = (0..4u8)
            .flat_map(|from| (0..4u8).filter(move |&to| to != from).map(move |to| (from, to)))
            .map(|(from, to)| (usize::from(from), usize::from(to), if (from, to) == (0, 1) { 0.0 } else { 1.0 }))
            .collect();
        let matrix = AdjustmentMatrix::from_triples(&triples, 4).unwrap();
        let m = model(0.0, 0.0, 0.0, 1.0).with_adjustment_matrix(matrix);

        let mut rng = StdRng::seed_from_u64(10);
        let mut saw_other_jump = false;
        let d = Dist::new(0b0001, 4);
        for _ in 0..500 {
            let s = split_dist_rejection_adjusted(d, &m, &mut rng).unwrap();
            assert_eq!(s.split_type, SplitType::Jump);
            let outside = if s.left == d { s.right } else { s.left };
            assert!(!outside.get(1), "jump into region 1 should be fully suppressed");
            if outside.get(2) || outside.get(3) {
                saw_other_jump = true;
            }
        }
        assert!(saw_other_jump, "jumps from region 0 to other targets should still occur");
    }
}

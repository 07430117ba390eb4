//! Time-stamped dampings of contact matrices
//!
//! A `Damping` scales the entries of a contact matrix from its time on. Dampings are grouped by
//! a level and a kind: of the dampings sharing level and kind only the latest active one counts,
//! different kinds of one level add up their reductions, and different levels multiply.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DampingLevel(pub usize);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DampingType(pub usize);

/// Multiplicative factors for every matrix entry, active from `time` on.
#[derive(Clone, Debug, PartialEq)]
pub struct Damping {
    time: f64,
    level: DampingLevel,
    kind: DampingType,
    factors: Array2<f64>,
}

impl Damping {
    pub fn new(factors: Array2<f64>, level: DampingLevel, kind: DampingType, time: f64) -> Self {
        assert!(
            factors.is_square(),
            "Damping factors must form a square matrix, got {:?}",
            factors.shape()
        );
        Self {
            time,
            level,
            kind,
            factors,
        }
    }

    /// Damping of all entries by the same factor with default level and kind.
    pub fn uniform(num_groups: usize, factor: f64, time: f64) -> Self {
        Self::new(
            Array2::from_elem((num_groups, num_groups), factor),
            DampingLevel::default(),
            DampingType::default(),
            time,
        )
    }

    pub fn get_time(&self) -> f64 {
        self.time
    }

    pub fn get_level(&self) -> DampingLevel {
        self.level
    }

    pub fn get_type(&self) -> DampingType {
        self.kind
    }

    pub fn get_factors(&self) -> &Array2<f64> {
        &self.factors
    }

    pub fn get_num_groups(&self) -> usize {
        self.factors.nrows()
    }
}

/// Dampings of one contact matrix, ordered by time.
///
/// Dampings with equal time keep their insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct Dampings {
    num_groups: usize,
    dampings: Vec<Damping>,
}

impl Dampings {
    pub fn new(num_groups: usize) -> Self {
        Self {
            num_groups,
            dampings: Vec::new(),
        }
    }

    pub fn add(&mut self, damping: Damping) {
        assert_eq!(
            damping.get_num_groups(),
            self.num_groups,
            "Damping for {} groups added to a matrix of {} groups",
            damping.get_num_groups(),
            self.num_groups
        );
        let position = self
            .dampings
            .partition_point(|other| other.time <= damping.time);
        self.dampings.insert(position, damping);
    }

    pub fn clear(&mut self) {
        self.dampings.clear();
    }

    pub fn len(&self) -> usize {
        self.dampings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dampings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Damping> {
        self.dampings.iter()
    }

    /// Combined factors of all dampings active at time `t`.
    pub fn get_factors_at(&self, t: f64) -> Array2<f64> {
        let mut active: BTreeMap<(DampingLevel, DampingType), &Damping> = BTreeMap::new();
        for damping in self.dampings.iter().take_while(|damping| damping.time <= t) {
            active.insert((damping.level, damping.kind), damping);
        }

        let mut levels: BTreeMap<DampingLevel, Vec<&Array2<f64>>> = BTreeMap::new();
        for ((level, _), damping) in active {
            levels.entry(level).or_default().push(&damping.factors);
        }

        let mut factors = Array2::ones((self.num_groups, self.num_groups));
        for level_factors in levels.values() {
            match level_factors.as_slice() {
                [single] => factors *= *single,
                kinds => {
                    let mut reduction = Array2::<f64>::zeros((self.num_groups, self.num_groups));
                    for kind_factors in kinds {
                        reduction += &kind_factors.mapv(|factor| 1. - factor);
                    }
                    factors *= &reduction.mapv(|reduction| 1. - reduction);
                }
            }
        }
        factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn ordered_by_time() {
        let mut dampings = Dampings::new(1);
        dampings.add(Damping::uniform(1, 0.5, 10.));
        dampings.add(Damping::uniform(1, 0.7, 2.));
        dampings.add(Damping::uniform(1, 0.9, 10.));
        let times: Vec<f64> = dampings.iter().map(Damping::get_time).collect();
        assert_eq!(times, vec![2., 10., 10.]);
        assert_eq!(dampings.iter().last().unwrap().get_factors()[[0, 0]], 0.9);
    }

    #[test]
    fn inactive_before_time() {
        let mut dampings = Dampings::new(2);
        dampings.add(Damping::uniform(2, 0.3, 5.));
        assert_eq!(dampings.get_factors_at(4.999), Array2::ones((2, 2)));
        assert_eq!(dampings.get_factors_at(5.), Array2::from_elem((2, 2), 0.3));
    }

    #[test]
    fn same_level_and_type_replaces() {
        let mut dampings = Dampings::new(1);
        dampings.add(Damping::uniform(1, 0.5, 1.));
        dampings.add(Damping::uniform(1, 0.8, 3.));
        dampings.add(Damping::uniform(1, 0.6, 3.));
        assert_eq!(dampings.get_factors_at(2.)[[0, 0]], 0.5);
        assert_eq!(dampings.get_factors_at(3.)[[0, 0]], 0.6);
    }

    #[test]
    fn types_add_and_levels_multiply() {
        let mut dampings = Dampings::new(1);
        let damping = |factor: f64, level: usize, kind: usize, time: f64| {
            Damping::new(
                array![[factor]],
                DampingLevel(level),
                DampingType(kind),
                time,
            )
        };
        dampings.add(damping(0.75, 0, 0, 0.));
        dampings.add(damping(0.5, 0, 1, 1.));
        dampings.add(damping(0.5, 1, 0, 2.));

        assert_eq!(dampings.get_factors_at(0.5)[[0, 0]], 0.75);
        assert!((dampings.get_factors_at(1.5)[[0, 0]] - 0.25).abs() < 1e-12);
        assert!((dampings.get_factors_at(2.5)[[0, 0]] - 0.125).abs() < 1e-12);
    }

    #[test]
    fn entry_wise_factors() {
        let mut dampings = Dampings::new(2);
        dampings.add(Damping::new(
            array![[0.5, 1.], [1., 0.25]],
            DampingLevel(0),
            DampingType(0),
            0.,
        ));
        assert_eq!(dampings.get_factors_at(1.), array![[0.5, 1.], [1., 0.25]]);
    }

    #[test]
    #[should_panic]
    fn mismatched_groups() {
        let mut dampings = Dampings::new(2);
        dampings.add(Damping::uniform(3, 0.5, 0.));
    }
}

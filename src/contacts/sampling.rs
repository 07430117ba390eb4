//! Sampling of uncertain contact dampings
//!
//! A `DampingSampling` describes randomly drawn interventions: how many dampings, on which days
//! and how strong. `UncertainContactMatrix` holds the contact matrices together with these
//! descriptions and rebuilds the matrices after every draw.

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::contact_matrix::ContactMatrixGroup;
use super::damping::{Damping, DampingLevel, DampingType};
use crate::core::UncertainValue;

/// Distributions of randomly drawn dampings.
///
/// Each draw yields `count` dampings, each at a drawn `day`. Diagonal factors are
/// `diagonal_base * diagonal_relative` with one relative draw per group; the factor between two
/// groups averages both diagonal factors, each scaled by its own `offdiagonal_relative` draw, and
/// is applied symmetrically.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DampingSampling {
    #[serde(default)]
    pub level: DampingLevel,
    #[serde(default)]
    pub kind: DampingType,
    /// Matrices of the contact matrix group the dampings apply to.
    pub matrix_indices: Vec<usize>,
    pub count: UncertainValue,
    pub day: UncertainValue,
    pub diagonal_base: UncertainValue,
    pub diagonal_relative: UncertainValue,
    pub offdiagonal_relative: UncertainValue,
    #[serde(skip)]
    drawn: Vec<Damping>,
}

impl DampingSampling {
    /// Sampling of no dampings with neutral factors; set the distributions on the public fields.
    pub fn new(level: DampingLevel, kind: DampingType, matrix_indices: Vec<usize>) -> Self {
        Self {
            level,
            kind,
            matrix_indices,
            count: UncertainValue::new(0.),
            day: UncertainValue::new(0.),
            diagonal_base: UncertainValue::new(1.),
            diagonal_relative: UncertainValue::new(1.),
            offdiagonal_relative: UncertainValue::new(1.),
            drawn: Vec::new(),
        }
    }

    /// Dampings of the latest draw.
    pub fn get_dampings(&self) -> &[Damping] {
        &self.drawn
    }

    /// Draw one symmetric matrix of damping factors.
    pub fn draw_factors<R: Rng + ?Sized>(&mut self, num_groups: usize, rng: &mut R) -> Array2<f64> {
        let base = self.diagonal_base.draw_sample(rng);
        let diagonal: Vec<f64> = (0..num_groups)
            .map(|_| base * self.diagonal_relative.draw_sample(rng))
            .collect();

        let mut factors = Array2::from_diag(&ndarray::Array1::from(diagonal.clone()));
        for i in 0..num_groups {
            for j in i + 1..num_groups {
                let factor = 0.5 * diagonal[i] * self.offdiagonal_relative.draw_sample(rng)
                    + 0.5 * diagonal[j] * self.offdiagonal_relative.draw_sample(rng);
                factors[[i, j]] = factor;
                factors[[j, i]] = factor;
            }
        }
        factors
    }

    /// Replace the drawn dampings with a new draw.
    pub fn draw_dampings<R: Rng + ?Sized>(&mut self, num_groups: usize, rng: &mut R) {
        let count = self.count.draw_sample(rng).round().max(0.) as usize;
        self.drawn.clear();
        for _ in 0..count {
            let day = self.day.draw_sample(rng);
            let factors = self.draw_factors(num_groups, rng);
            self.drawn
                .push(Damping::new(factors, self.level, self.kind, day));
        }
        log::debug!(
            "Drawn {} dampings for level {:?} and type {:?}",
            count,
            self.level,
            self.kind
        );
    }
}

/// Contact matrices with uncertain, randomly drawn dampings.
#[derive(Clone, Debug, PartialEq)]
pub struct UncertainContactMatrix {
    contact_matrices: ContactMatrixGroup,
    damping_samplings: Vec<DampingSampling>,
    school_holiday_damping: Option<DampingSampling>,
    school_holiday_factors: Option<Array2<f64>>,
    school_holidays: Vec<(f64, f64)>,
}

impl From<ContactMatrixGroup> for UncertainContactMatrix {
    fn from(contact_matrices: ContactMatrixGroup) -> Self {
        Self::new(contact_matrices)
    }
}

impl UncertainContactMatrix {
    pub fn new(contact_matrices: ContactMatrixGroup) -> Self {
        Self {
            contact_matrices,
            damping_samplings: Vec::new(),
            school_holiday_damping: None,
            school_holiday_factors: None,
            school_holidays: Vec::new(),
        }
    }

    pub fn get_contact_matrices(&self) -> &ContactMatrixGroup {
        &self.contact_matrices
    }

    pub fn get_contact_matrices_mut(&mut self) -> &mut ContactMatrixGroup {
        &mut self.contact_matrices
    }

    pub fn get_damping_samplings(&self) -> &[DampingSampling] {
        &self.damping_samplings
    }

    pub fn get_damping_samplings_mut(&mut self) -> &mut Vec<DampingSampling> {
        &mut self.damping_samplings
    }

    pub fn get_school_holiday_damping(&self) -> Option<&DampingSampling> {
        self.school_holiday_damping.as_ref()
    }

    /// Damping applied during every school holiday; its count and day are not used.
    pub fn set_school_holiday_damping(&mut self, damping: DampingSampling) {
        self.school_holiday_damping = Some(damping);
    }

    pub fn get_school_holidays(&self) -> &[(f64, f64)] {
        &self.school_holidays
    }

    pub fn get_school_holidays_mut(&mut self) -> &mut Vec<(f64, f64)> {
        &mut self.school_holidays
    }

    /// Draw new dampings from every sampling and new school holiday factors.
    pub fn draw_sample_dampings<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let num_groups = self.contact_matrices.get_num_groups();
        for sampling in self.damping_samplings.iter_mut() {
            sampling.draw_dampings(num_groups, rng);
        }
        self.school_holiday_factors = self
            .school_holiday_damping
            .as_mut()
            .map(|holiday| holiday.draw_factors(num_groups, rng));
    }

    /// Rebuild the dampings of the contact matrices from the latest draw.
    ///
    /// Without `accum` all existing dampings are removed first. Every school holiday damps from
    /// its start and is lifted again at its end.
    pub fn make_matrix(&mut self, accum: bool) -> &ContactMatrixGroup {
        if !accum {
            self.contact_matrices.clear_dampings();
        }

        for sampling in self.damping_samplings.iter() {
            for damping in sampling.get_dampings() {
                for &matrix_index in sampling.matrix_indices.iter() {
                    self.contact_matrices[matrix_index].add_damping(damping.clone());
                }
            }
        }

        if let (Some(holiday), Some(factors)) =
            (&self.school_holiday_damping, &self.school_holiday_factors)
        {
            let lifted = Array2::ones(factors.raw_dim());
            for &(start, end) in self.school_holidays.iter() {
                for &matrix_index in holiday.matrix_indices.iter() {
                    let matrix = &mut self.contact_matrices[matrix_index];
                    matrix.add_damping(Damping::new(
                        factors.clone(),
                        holiday.level,
                        holiday.kind,
                        start,
                    ));
                    matrix.add_damping(Damping::new(
                        lifted.clone(),
                        holiday.level,
                        holiday.kind,
                        end,
                    ));
                }
            }
        }

        &self.contact_matrices
    }

    /// Draw new dampings and rebuild the contact matrices.
    pub fn draw_sample<R: Rng + ?Sized>(&mut self, rng: &mut R, accum: bool) -> &ContactMatrixGroup {
        self.draw_sample_dampings(rng);
        self.make_matrix(accum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::ContactMatrix;
    use crate::core::ParameterDistribution;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn uniform(value: f64, lower: f64, upper: f64) -> UncertainValue {
        UncertainValue::with_distribution(value, ParameterDistribution::uniform(lower, upper))
    }

    fn sampling(matrix_indices: Vec<usize>) -> DampingSampling {
        let mut sampling = DampingSampling::new(DampingLevel(0), DampingType(0), matrix_indices);
        sampling.count = uniform(1., 1., 3.);
        sampling.day = uniform(0., 0., 19.);
        sampling.diagonal_base = uniform(1., 0.1, 1.);
        sampling.diagonal_relative = uniform(1., 0.6, 1.4);
        sampling.offdiagonal_relative = uniform(1., 0.7, 1.1);
        sampling
    }

    fn uncertain_matrix(num_groups: usize) -> UncertainContactMatrix {
        let mut group = ContactMatrixGroup::new(1, num_groups);
        group[0].get_baseline_mut().fill(1.);
        let mut matrix = UncertainContactMatrix::new(group);
        matrix.get_damping_samplings_mut().push(sampling(vec![0]));
        matrix
    }

    #[test]
    fn drawn_factors_within_bounds_and_symmetric() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut sampling = sampling(vec![0]);
        for _ in 0..100 {
            let factors = sampling.draw_factors(3, &mut rng);
            for i in 0..3 {
                assert!((0.06..=1.4).contains(&factors[[i, i]]));
                for j in 0..3 {
                    assert_eq!(factors[[i, j]], factors[[j, i]]);
                    assert!((0.042..=1.54).contains(&factors[[i, j]]));
                }
            }
        }
    }

    #[test]
    fn draw_dampings_counts_and_days() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut sampling = sampling(vec![0]);
        for _ in 0..50 {
            sampling.draw_dampings(2, &mut rng);
            let dampings = sampling.get_dampings();
            assert!((1..=3).contains(&dampings.len()));
            for damping in dampings {
                assert!((0. ..=19.).contains(&damping.get_time()));
                assert_eq!(damping.get_num_groups(), 2);
            }
        }
    }

    #[test]
    fn accumulate_keeps_existing_dampings() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut matrix = uncertain_matrix(2);
        matrix.get_contact_matrices_mut()[0].add_damping_factor(0.3, 30.);

        let contacts = matrix.draw_sample(&mut rng, true);
        assert_eq!(contacts.get_matrix_at(37.)[[1, 1]], 0.3);
        let factor = contacts.get_matrix_at(20.)[[1, 1]];
        assert!((0.06..=1.4).contains(&factor));
    }

    #[test]
    fn replace_removes_existing_dampings() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut matrix = uncertain_matrix(2);
        matrix.get_contact_matrices_mut()[0].add_damping_factor(0.3, 30.);

        let contacts = matrix.draw_sample(&mut rng, false).clone();
        assert_eq!(contacts.get_matrix_at(37.), contacts.get_matrix_at(20.));
        assert_eq!(
            contacts[0].get_dampings().len(),
            matrix.get_damping_samplings()[0].get_dampings().len()
        );
    }

    #[test]
    fn reproducible_with_seed() {
        let mut first = uncertain_matrix(3);
        let mut second = uncertain_matrix(3);
        let a = first.draw_sample(&mut StdRng::seed_from_u64(1), false).clone();
        let b = second.draw_sample(&mut StdRng::seed_from_u64(1), false).clone();
        assert_eq!(a, b);
    }

    #[test]
    fn school_holidays() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut group = ContactMatrixGroup::from_matrices(vec![
            ContactMatrix::constant(1, 1.),
            ContactMatrix::constant(1, 2.),
        ])
        .unwrap();
        group[1].add_damping_factor(1., 0.);
        let mut matrix = UncertainContactMatrix::new(group);

        let mut holiday = DampingSampling::new(DampingLevel(1), DampingType(0), vec![1]);
        holiday.diagonal_base = UncertainValue::new(0.5);
        matrix.set_school_holiday_damping(holiday);
        matrix.get_school_holidays_mut().push((10., 20.));

        let contacts = matrix.draw_sample(&mut rng, false);
        assert_eq!(contacts.get_matrix_at(5.)[[0, 0]], 3.);
        assert_eq!(contacts.get_matrix_at(15.)[[0, 0]], 2.);
        assert_eq!(contacts.get_matrix_at(25.)[[0, 0]], 3.);
    }
}

//! Contact matrices and groups of contact matrices.

use ndarray::Array2;
use std::ops::{Index, IndexMut};

use super::damping::{Damping, Dampings};
use crate::errors::{CompartmentalError, Result};

/// Square matrix of contact rates between population groups, damped over time.
#[derive(Clone, Debug, PartialEq)]
pub struct ContactMatrix {
    baseline: Array2<f64>,
    dampings: Dampings,
}

impl ContactMatrix {
    /// # Panics
    ///
    /// Panics if `baseline` is not square.
    pub fn new(baseline: Array2<f64>) -> Self {
        assert!(
            baseline.is_square(),
            "Contact matrix baseline must be square, got {:?}",
            baseline.shape()
        );
        let dampings = Dampings::new(baseline.nrows());
        Self { baseline, dampings }
    }

    /// Matrix with the same contact rate between all groups.
    pub fn constant(num_groups: usize, value: f64) -> Self {
        Self::new(Array2::from_elem((num_groups, num_groups), value))
    }

    pub fn get_num_groups(&self) -> usize {
        self.baseline.nrows()
    }

    pub fn get_baseline(&self) -> &Array2<f64> {
        &self.baseline
    }

    /// Mutable access to the baseline entries; the shape is fixed.
    pub fn get_baseline_mut(&mut self) -> ndarray::ArrayViewMut2<'_, f64> {
        self.baseline.view_mut()
    }

    pub fn get_dampings(&self) -> &Dampings {
        &self.dampings
    }

    pub fn add_damping(&mut self, damping: Damping) {
        self.dampings.add(damping);
    }

    /// Damp all entries by `factor` from `time` on.
    pub fn add_damping_factor(&mut self, factor: f64, time: f64) {
        self.add_damping(Damping::uniform(self.get_num_groups(), factor, time));
    }

    pub fn clear_dampings(&mut self) {
        self.dampings.clear();
    }

    /// Effective contact rates at time `t`.
    pub fn get_matrix_at(&self, t: f64) -> Array2<f64> {
        &self.baseline * &self.dampings.get_factors_at(t)
    }
}

/// Contact matrices of several contact locations sharing the same population groups.
///
/// The effective contacts are the sum over all matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct ContactMatrixGroup {
    num_groups: usize,
    matrices: Vec<ContactMatrix>,
}

impl ContactMatrixGroup {
    /// Group of `num_matrices` matrices with zero baselines.
    pub fn new(num_matrices: usize, num_groups: usize) -> Self {
        Self {
            num_groups,
            matrices: (0..num_matrices)
                .map(|_| ContactMatrix::constant(num_groups, 0.))
                .collect(),
        }
    }

    pub fn from_matrices(matrices: Vec<ContactMatrix>) -> Result<Self> {
        let num_groups = matrices
            .first()
            .map(ContactMatrix::get_num_groups)
            .ok_or_else(|| {
                CompartmentalError::ConfigurationError(
                    "A contact matrix group needs at least one matrix".to_string(),
                )
            })?;
        if let Some(mismatch) = matrices
            .iter()
            .find(|matrix| matrix.get_num_groups() != num_groups)
        {
            return Err(CompartmentalError::ConfigurationError(format!(
                "Contact matrices of {} and {} groups cannot be grouped",
                num_groups,
                mismatch.get_num_groups()
            )));
        }
        Ok(Self {
            num_groups,
            matrices,
        })
    }

    pub fn get_num_groups(&self) -> usize {
        self.num_groups
    }

    pub fn get_num_matrices(&self) -> usize {
        self.matrices.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContactMatrix> {
        self.matrices.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ContactMatrix> {
        self.matrices.iter_mut()
    }

    /// Add the damping to every matrix of the group.
    pub fn add_damping(&mut self, damping: Damping) {
        for matrix in self.matrices.iter_mut() {
            matrix.add_damping(damping.clone());
        }
    }

    pub fn clear_dampings(&mut self) {
        for matrix in self.matrices.iter_mut() {
            matrix.clear_dampings();
        }
    }

    /// Sum of the effective contact rates of all matrices at time `t`.
    pub fn get_matrix_at(&self, t: f64) -> Array2<f64> {
        self.matrices.iter().fold(
            Array2::zeros((self.num_groups, self.num_groups)),
            |total, matrix| total + matrix.get_matrix_at(t),
        )
    }
}

impl Index<usize> for ContactMatrixGroup {
    type Output = ContactMatrix;

    fn index(&self, index: usize) -> &Self::Output {
        &self.matrices[index]
    }
}

impl IndexMut<usize> for ContactMatrixGroup {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.matrices[index]
    }
}

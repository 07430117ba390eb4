//! Compartment populations
//!
//! `Populations` stores one uncertain value per combination of compartment and stratification
//! categories. Besides plain cell access it provides totals over category slices, proportional
//! rescaling of those totals, and the non-negativity constraint passes.

use derive_more::{Deref, DerefMut};
use ndarray::Array1;
use rand::Rng;

use super::category::{Category, MultiIndex};
use super::index_array::CustomIndexArray;
use super::uncertain::{ParameterDistribution, UncertainValue};

/// Totals with an absolute value below this are treated as empty when rescaling.
const ZERO_TOLERANCE: f64 = 1e-12;

#[derive(Clone, Debug, PartialEq, Deref, DerefMut)]
pub struct Populations<I: MultiIndex>(CustomIndexArray<UncertainValue, I>);

impl<I: MultiIndex> Default for Populations<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MultiIndex> Populations<I> {
    /// Create populations with all compartments empty.
    pub fn new() -> Self {
        Populations(CustomIndexArray::new(UncertainValue::new(0.)))
    }

    pub fn get_num_compartments(&self) -> usize {
        I::SIZE
    }

    /// Current values of all compartments in flat index order.
    pub fn get_compartments(&self) -> Array1<f64> {
        self.iter().map(|value| value.value()).collect()
    }

    /// Sum over all cells belonging to one value of category `C`.
    pub fn get_group_total<C: Category>(&self, group: C) -> f64 {
        CustomIndexArray::<UncertainValue, I>::slice_indices(group)
            .map(|flat_index| self[flat_index].value())
            .sum()
    }

    /// Set the sum over one value of category `C` to `value`.
    ///
    /// The cells are rescaled proportionally. If the group is currently empty, `value` is split
    /// evenly between its cells.
    pub fn set_group_total<C: Category>(&mut self, group: C, value: f64) {
        let indices: Vec<usize> =
            CustomIndexArray::<UncertainValue, I>::slice_indices(group).collect();
        self.rescale(&indices, value);
    }

    pub fn get_total(&self) -> f64 {
        self.iter().map(|value| value.value()).sum()
    }

    /// Set the sum over all cells to `value`, see `set_group_total`.
    pub fn set_total(&mut self, value: f64) {
        let indices: Vec<usize> = (0..I::SIZE).collect();
        self.rescale(&indices, value);
    }

    fn rescale(&mut self, indices: &[usize], value: f64) {
        if indices.is_empty() {
            log::warn!("Cannot distribute a total of {value} over an empty slice");
            return;
        }
        let current: f64 = indices
            .iter()
            .map(|&flat_index| self[flat_index].value())
            .sum();
        if current.abs() < ZERO_TOLERANCE {
            let share = value / indices.len() as f64;
            for &flat_index in indices {
                self[flat_index].set_value(share);
            }
        } else {
            let factor = value / current;
            for &flat_index in indices {
                let scaled = self[flat_index].value() * factor;
                self[flat_index].set_value(scaled);
            }
        }
    }

    /// Set the compartment at `index` to the difference between `total` and the other
    /// compartments in the slice of `group`.
    ///
    /// # Panics
    ///
    /// Panics if the other compartments of the group already exceed `total`.
    pub fn set_difference_from_group_total<C: Category>(&mut self, index: I, group: C, total: f64) {
        let flat_index = index.flat_index();
        let indices: Vec<usize> =
            CustomIndexArray::<UncertainValue, I>::slice_indices(group).collect();
        debug_assert!(
            indices.contains(&flat_index),
            "Compartment {index:?} is not part of the group {group:?}"
        );
        let others: f64 = indices
            .iter()
            .filter(|&&other| other != flat_index)
            .map(|&other| self[other].value())
            .sum();
        assert!(
            others <= total,
            "Compartments of group {group:?} sum to {others}, exceeding the total {total}"
        );
        self[flat_index].set_value(total - others);
    }

    /// Set the compartment at `index` to the difference between `total` and all other
    /// compartments.
    ///
    /// # Panics
    ///
    /// Panics if the other compartments already exceed `total`.
    pub fn set_difference_from_total(&mut self, index: I, total: f64) {
        let flat_index = index.flat_index();
        let others: f64 = self
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != flat_index)
            .map(|(_, value)| value.value())
            .sum();
        assert!(
            others <= total,
            "Compartments sum to {others}, exceeding the total {total}"
        );
        self[flat_index].set_value(total - others);
    }

    /// Set negative compartments to zero.
    ///
    /// Returns the number of corrected compartments.
    pub fn apply_constraints(&mut self) -> usize {
        let mut corrected = 0;
        for flat_index in 0..I::SIZE {
            let value = self[flat_index].value();
            if value < 0. {
                log::warn!(
                    "Constraint check: Compartment {:?} changed from {value:.4} to 0",
                    I::from_flat_index(flat_index)
                );
                self[flat_index].set_value(0.);
                corrected += 1;
            }
        }
        corrected
    }

    /// Count negative compartments without changing them.
    pub fn check_constraints(&self) -> usize {
        let mut violations = 0;
        for (index, value) in self.indexed_iter() {
            if value.value() < 0. {
                log::error!(
                    "Constraint check: Compartment {index:?} is {:.4} and smaller than 0",
                    value.value()
                );
                violations += 1;
            }
        }
        violations
    }

    /// Attach a relative normal distribution to every compartment.
    pub fn set_distributions_normal(&mut self, relative_dev: f64) {
        for value in self.iter_mut() {
            let distribution = ParameterDistribution::normal_relative(value.value(), relative_dev);
            value.set_distribution(&distribution);
        }
    }

    /// Resample every compartment, then restore the previous totals of category `C` by putting
    /// the remainder of each group into the compartment `remainder(group)`.
    ///
    /// All other compartments keep their drawn values unless they exceed the group total on
    /// their own; then they are rescaled to the total and the remainder compartment is emptied.
    pub fn draw_sample_with_remainder<C: Category, R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        remainder: impl Fn(C) -> I,
    ) {
        let totals: Vec<f64> = super::category::categories::<C>()
            .map(|group| self.get_group_total(group))
            .collect();
        for value in self.iter_mut() {
            value.draw_sample(rng);
        }
        for (group, total) in super::category::categories::<C>().zip(totals) {
            let indices: Vec<usize> =
                CustomIndexArray::<UncertainValue, I>::slice_indices(group).collect();
            self.fill_remainder(&indices, remainder(group).flat_index(), total);
        }
    }

    /// Resample every compartment and put the difference to the previous total into
    /// `remainder`, see `draw_sample_with_remainder`.
    pub fn draw_sample_with_total_remainder<R: Rng + ?Sized>(&mut self, rng: &mut R, remainder: I) {
        let total = self.get_total();
        for value in self.iter_mut() {
            value.draw_sample(rng);
        }
        let indices: Vec<usize> = (0..I::SIZE).collect();
        self.fill_remainder(&indices, remainder.flat_index(), total);
    }

    fn fill_remainder(&mut self, indices: &[usize], remainder: usize, total: f64) {
        debug_assert!(indices.contains(&remainder));
        let others: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&other| other != remainder)
            .collect();
        let sum: f64 = others.iter().map(|&other| self[other].value()).sum();
        if sum <= total {
            self[remainder].set_value(total - sum);
        } else {
            log::warn!(
                "Sampled compartments sum to {sum:.4}, exceeding the total {total:.4}; rescaling them"
            );
            self.rescale(&others, total);
            self[remainder].set_value(0.);
        }
    }
}

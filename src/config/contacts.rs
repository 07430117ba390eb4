//! Contact matrices as configured in scenario files.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::contacts::{
    ContactMatrix, ContactMatrixGroup, Damping, DampingLevel, DampingSampling, DampingType,
    UncertainContactMatrix,
};
use crate::errors::{CompartmentalError, Result};

/// A damping with the same factor for all matrix entries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DampingSettings {
    pub time: f64,
    pub factor: f64,
    #[serde(default)]
    pub level: DampingLevel,
    #[serde(default)]
    pub kind: DampingType,
    /// Matrices the damping applies to, all if omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix_indices: Option<Vec<usize>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContactSettings {
    /// Baseline contact rates, one square matrix per contact location.
    pub baselines: Vec<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dampings: Vec<DampingSettings>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub damping_samplings: Vec<DampingSampling>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_holiday_damping: Option<DampingSampling>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub school_holidays: Vec<(f64, f64)>,
}

impl ContactSettings {
    /// Single location with the same contact rate between all groups.
    pub fn constant(num_groups: usize, value: f64) -> Self {
        Self {
            baselines: vec![vec![vec![value; num_groups]; num_groups]],
            dampings: Vec::new(),
            damping_samplings: Vec::new(),
            school_holiday_damping: None,
            school_holidays: Vec::new(),
        }
    }

    fn check_matrix_indices(&self, indices: &[usize]) -> Result<()> {
        match indices.iter().find(|&&index| index >= self.baselines.len()) {
            Some(index) => Err(CompartmentalError::ConfigurationError(format!(
                "Contact matrix {index} does not exist, there are {} matrices",
                self.baselines.len()
            ))),
            None => Ok(()),
        }
    }

    /// Build the contact matrices of a model with `num_groups` population groups.
    pub fn build(&self, num_groups: usize) -> Result<UncertainContactMatrix> {
        let matrices = self
            .baselines
            .iter()
            .enumerate()
            .map(|(index, rows)| {
                if rows.len() != num_groups || rows.iter().any(|row| row.len() != num_groups) {
                    return Err(CompartmentalError::ConfigurationError(format!(
                        "Contact matrix {index} must have {num_groups}x{num_groups} entries"
                    )));
                }
                Array2::from_shape_vec((num_groups, num_groups), rows.concat())
                    .map(ContactMatrix::new)
                    .map_err(|error| CompartmentalError::ConfigurationError(error.to_string()))
            })
            .collect::<Result<Vec<ContactMatrix>>>()?;
        let mut group = ContactMatrixGroup::from_matrices(matrices)?;

        for damping in self.dampings.iter() {
            let factors = Array2::from_elem((num_groups, num_groups), damping.factor);
            let damping_matrix = Damping::new(factors, damping.level, damping.kind, damping.time);
            match &damping.matrix_indices {
                None => group.add_damping(damping_matrix),
                Some(indices) => {
                    self.check_matrix_indices(indices)?;
                    for &index in indices {
                        group[index].add_damping(damping_matrix.clone());
                    }
                }
            }
        }

        let mut contacts = UncertainContactMatrix::new(group);
        for sampling in self.damping_samplings.iter() {
            self.check_matrix_indices(&sampling.matrix_indices)?;
            contacts.get_damping_samplings_mut().push(sampling.clone());
        }
        if let Some(holiday) = &self.school_holiday_damping {
            self.check_matrix_indices(&holiday.matrix_indices)?;
            contacts.set_school_holiday_damping(holiday.clone());
        }
        contacts
            .get_school_holidays_mut()
            .extend(self.school_holidays.iter().copied());
        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_with_dampings() {
        let mut settings = ContactSettings::constant(2, 1.);
        settings.baselines.push(vec![vec![2., 0.5], vec![0.5, 3.]]);
        settings.dampings.push(DampingSettings {
            time: 10.,
            factor: 0.5,
            level: DampingLevel(0),
            kind: DampingType(0),
            matrix_indices: Some(vec![1]),
        });

        let contacts = settings.build(2).unwrap();
        let matrices = contacts.get_contact_matrices();
        assert_eq!(matrices.get_num_matrices(), 2);
        assert_eq!(matrices.get_matrix_at(0.)[[1, 1]], 4.);
        assert_eq!(matrices.get_matrix_at(10.)[[1, 1]], 2.5);
        assert_eq!(matrices.get_matrix_at(10.)[[0, 1]], 1.25);
    }

    #[test]
    fn reject_invalid_shapes() {
        let settings = ContactSettings::constant(2, 1.);
        assert!(settings.build(3).is_err());

        let mut settings = ContactSettings::constant(1, 1.);
        settings.dampings.push(DampingSettings {
            time: 0.,
            factor: 0.5,
            level: DampingLevel(0),
            kind: DampingType(0),
            matrix_indices: Some(vec![2]),
        });
        assert!(settings.build(1).is_err());
    }
}

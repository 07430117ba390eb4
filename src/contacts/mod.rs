//! Time-dependent contact matrices and their uncertain dampings.

mod contact_matrix;
mod damping;
mod sampling;

pub use contact_matrix::{ContactMatrix, ContactMatrixGroup};
pub use damping::{Damping, DampingLevel, DampingType, Dampings};
pub use sampling::{DampingSampling, UncertainContactMatrix};

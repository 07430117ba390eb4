//! Configuration data structures for simulation scenarios.

mod contacts;
mod models;
mod settings;

pub use contacts::{ContactSettings, DampingSettings};
pub use models::{
    MAX_AGE_GROUPS, ModelSettings, SecirGroupSettings, SecirSettings, SirSettings, SisSettings,
};
pub use settings::{EnsembleSettings, Settings};

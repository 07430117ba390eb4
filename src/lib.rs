//! Compartmental epidemic models integrated as systems of ordinary differential equations.
//!
//! Populations are split into compartments indexed by tuples of categories (infection state,
//! age group, ...). Contact matrices with time-dependent dampings drive the transmission, and
//! uncertain parameters can be resampled to run Monte-Carlo ensembles.

extern crate self as compartmental;

pub mod analysis;
pub mod args;
pub mod config;
pub mod contacts;
pub mod core;
pub mod errors;
pub mod integrator;
pub mod models;
pub mod readwrite;
pub mod runner;
pub mod simulation;

pub use crate::core::Category;
pub use crate::errors::{CompartmentalError, Result};

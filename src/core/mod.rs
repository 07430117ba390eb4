//! This module contains the core datatypes of the library.

mod category;
mod index_array;
mod populations;
mod time_series;
mod uncertain;

pub use category::{AgeGroup, Category, MultiIndex, categories, slice_indices};
pub use compartmental_macros::Category;
pub use index_array::CustomIndexArray;
pub use populations::Populations;
pub use time_series::TimeSeries;
pub use uncertain::{NormalParameters, ParameterDistribution, UncertainValue, UniformParameters};

//! IO for simulation results and sampled parameters.

mod parameters;
mod time_series;

pub use parameters::{write_parameter_table, write_parameter_table_to_file};
pub use time_series::TimeSeriesIO;

//! Time series of state vectors.

use ndarray::{ArrayView1, ArrayViewMut1};

/// Append-only sequence of `(time, vector)` points with a fixed vector length.
///
/// Values are stored contiguously, one row per time point. Times are expected to increase
/// monotonically.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries {
    num_elements: usize,
    times: Vec<f64>,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(num_elements: usize) -> Self {
        Self {
            num_elements,
            times: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Create a time series with a single point.
    pub fn with_initial(time: f64, value: ArrayView1<f64>) -> Self {
        let mut time_series = Self::new(value.len());
        time_series.add_time_point_with(time, value);
        time_series
    }

    pub fn get_num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn get_num_time_points(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Append a zero-initialized point and return its value for writing.
    pub fn add_time_point(&mut self, time: f64) -> ArrayViewMut1<'_, f64> {
        debug_assert!(
            self.times.last().is_none_or(|&last| last <= time),
            "Time point {time} added before the last time point"
        );
        self.times.push(time);
        self.values.resize(self.values.len() + self.num_elements, 0.);
        self.get_last_value_mut()
    }

    pub fn add_time_point_with(&mut self, time: f64, value: ArrayView1<f64>) {
        assert_eq!(
            value.len(),
            self.num_elements,
            "Value of length {} does not fit a time series of {} elements",
            value.len(),
            self.num_elements
        );
        self.add_time_point(time).assign(&value);
    }

    pub fn get_time(&self, index: usize) -> f64 {
        self.times[index]
    }

    pub fn get_time_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.times[index]
    }

    pub fn get_times(&self) -> &[f64] {
        &self.times
    }

    pub fn get_value(&self, index: usize) -> ArrayView1<'_, f64> {
        let start = index * self.num_elements;
        ArrayView1::from(&self.values[start..start + self.num_elements])
    }

    pub fn get_value_mut(&mut self, index: usize) -> ArrayViewMut1<'_, f64> {
        let start = index * self.num_elements;
        ArrayViewMut1::from(&mut self.values[start..start + self.num_elements])
    }

    /// # Panics
    ///
    /// Panics if the time series is empty.
    pub fn get_last_time(&self) -> f64 {
        *self.times.last().expect("Time series has no time points")
    }

    pub fn get_last_time_mut(&mut self) -> &mut f64 {
        self.times.last_mut().expect("Time series has no time points")
    }

    pub fn get_last_value(&self) -> ArrayView1<'_, f64> {
        self.get_value(self.get_num_time_points() - 1)
    }

    pub fn get_last_value_mut(&mut self) -> ArrayViewMut1<'_, f64> {
        self.get_value_mut(self.get_num_time_points() - 1)
    }

    /// Iterate over `(time, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, ArrayView1<'_, f64>)> {
        self.times
            .iter()
            .enumerate()
            .map(|(index, &time)| (time, self.get_value(index)))
    }

    /// Drop all points after the first `num_time_points`.
    pub fn truncate(&mut self, num_time_points: usize) {
        self.times.truncate(num_time_points);
        self.values.truncate(num_time_points * self.num_elements);
    }
}

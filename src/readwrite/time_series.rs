use std::io;
use std::path::Path;

use crate::core::TimeSeries;
use crate::errors::{CompartmentalError, Result};

/// CSV representation of a time series: a header `t` followed by one column per element, and
/// one row per time point.
pub trait TimeSeriesIO: Sized {
    fn write_csv<W: io::Write>(&self, writer: W, names: &[String]) -> Result<()>;

    fn write_to_file<P: AsRef<Path>>(&self, path: P, names: &[String]) -> Result<()>;

    /// Read a time series and the names of its elements.
    fn read_csv<R: io::Read>(reader: R) -> Result<(Vec<String>, Self)>;

    fn read_from_file<P: AsRef<Path>>(path: P) -> Result<(Vec<String>, Self)>;
}

impl TimeSeriesIO for TimeSeries {
    fn write_csv<W: io::Write>(&self, writer: W, names: &[String]) -> Result<()> {
        assert_eq!(
            names.len(),
            self.get_num_elements(),
            "Expected {} column names",
            self.get_num_elements()
        );
        let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
        csv_writer
            .write_record(std::iter::once("t").chain(names.iter().map(String::as_str)))
            .map_err(CompartmentalError::CsvError)?;
        for (time, value) in self.iter() {
            csv_writer
                .write_record(
                    std::iter::once(time)
                        .chain(value.iter().copied())
                        .map(|entry| entry.to_string()),
                )
                .map_err(CompartmentalError::CsvError)?;
        }
        csv_writer.flush().map_err(CompartmentalError::IoError)?;
        Ok(())
    }

    fn write_to_file<P: AsRef<Path>>(&self, path: P, names: &[String]) -> Result<()> {
        let file = std::fs::File::create(path).map_err(CompartmentalError::IoError)?;
        self.write_csv(io::BufWriter::new(file), names)
    }

    fn read_csv<R: io::Read>(reader: R) -> Result<(Vec<String>, Self)> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = csv_reader
            .headers()
            .map_err(CompartmentalError::CsvError)?
            .clone();
        if headers.get(0) != Some("t") {
            return Err(CompartmentalError::ReadError(
                "First column of a time series must be `t`".to_string(),
            ));
        }
        let names: Vec<String> = headers.iter().skip(1).map(String::from).collect();

        let mut time_series = TimeSeries::new(names.len());
        for record in csv_reader.records() {
            let record = record.map_err(CompartmentalError::CsvError)?;
            let entries = record
                .iter()
                .map(|entry| {
                    entry.trim().parse::<f64>().map_err(|_| {
                        CompartmentalError::ReadError(format!("Failed to parse value: {entry}"))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            if entries.len() != names.len() + 1 {
                return Err(CompartmentalError::ReadError(format!(
                    "Row {:?} has {} entries, expected {}",
                    record.position().map(|position| position.line()),
                    entries.len(),
                    names.len() + 1
                )));
            }
            let time = entries[0];
            let values = &entries[1..];
            time_series
                .add_time_point(time)
                .iter_mut()
                .zip(values)
                .for_each(|(entry, &value)| *entry = value);
        }
        Ok((names, time_series))
    }

    fn read_from_file<P: AsRef<Path>>(path: P) -> Result<(Vec<String>, Self)> {
        let file = std::fs::File::open(path).map_err(CompartmentalError::IoError)?;
        Self::read_csv(io::BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn write_read() {
        let mut time_series = TimeSeries::with_initial(0., array![990., 10.].view());
        time_series.add_time_point_with(0.5, array![985.25, 14.75].view());
        let names = vec!["S".to_string(), "I".to_string()];

        let mut buffer = Vec::new();
        time_series.write_csv(&mut buffer, &names).unwrap();
        assert_eq!(
            String::from_utf8(buffer.clone()).unwrap(),
            "t,S,I\n0,990,10\n0.5,985.25,14.75\n"
        );

        let (read_names, read) = TimeSeries::read_csv(&buffer[..]).unwrap();
        assert_eq!(read_names, names);
        assert_eq!(read, time_series);
    }

    #[test]
    fn reject_invalid_values() {
        assert!(TimeSeries::read_csv("t,S\n0,abc\n".as_bytes()).is_err());
        assert!(TimeSeries::read_csv("time,S\n0,1\n".as_bytes()).is_err());
    }

    #[test]
    fn reject_rows_of_wrong_length() {
        let short = TimeSeries::read_csv("t,S,I\n0,1,2\n1,3\n".as_bytes());
        assert!(matches!(short, Err(CompartmentalError::ReadError(_))));
        let long = TimeSeries::read_csv("t,S\n0,1\n1,3,4\n".as_bytes());
        assert!(matches!(long, Err(CompartmentalError::ReadError(_))));
    }
}

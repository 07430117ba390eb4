use std::io;
use std::path::Path;

use crate::errors::{CompartmentalError, Result};
use crate::models::ParameterSampling;

/// Write the uncertain parameters of several models side by side: a header `name` followed by
/// one column per model, and one row per parameter.
///
/// All models must be of the same shape, the parameter names are taken from the first one.
pub fn write_parameter_table<W: io::Write, M: ParameterSampling>(
    writer: W,
    columns: &[(&str, M)],
) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    csv_writer
        .write_record(std::iter::once("name").chain(columns.iter().map(|(column, _)| *column)))
        .map_err(CompartmentalError::CsvError)?;

    let values: Vec<Vec<(String, f64)>> = columns
        .iter()
        .map(|(_, model)| {
            model
                .uncertain_values()
                .into_iter()
                .map(|(name, value)| (name, value.value()))
                .collect()
        })
        .collect();
    let Some(names) = values.first() else {
        return csv_writer.flush().map_err(CompartmentalError::IoError);
    };
    for (index, (name, _)) in names.iter().enumerate() {
        let row = values.iter().map(|column| match column.get(index) {
            Some((other, value)) if other == name => Ok(value.to_string()),
            _ => Err(CompartmentalError::ConfigurationError(format!(
                "Models do not share the parameter {name}"
            ))),
        });
        let row: Vec<String> = std::iter::once(Ok(name.clone())).chain(row).collect::<Result<_>>()?;
        csv_writer
            .write_record(&row)
            .map_err(CompartmentalError::CsvError)?;
    }
    csv_writer.flush().map_err(CompartmentalError::IoError)?;
    Ok(())
}

pub fn write_parameter_table_to_file<P: AsRef<Path>, M: ParameterSampling>(
    path: P,
    columns: &[(&str, M)],
) -> Result<()> {
    let file = std::fs::File::create(path).map_err(CompartmentalError::IoError)?;
    write_parameter_table(io::BufWriter::new(file), columns)
}

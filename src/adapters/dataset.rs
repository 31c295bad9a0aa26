//! CSV dataset adapter: loads training data into a [`RawDataset`].

use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::domain::RawDataset;

/// Error type for dataset loading.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset has no header row")]
    MissingHeader,
}

/// Load a headed CSV file.
///
/// # Errors
/// Returns error if the file cannot be read or a record is malformed.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<RawDataset, DatasetError> {
    let path = path.as_ref();
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let dataset = collect(reader)?;
    tracing::info!(
        "Loaded {} rows x {} columns from {}",
        dataset.len(),
        dataset.headers.len(),
        path.display()
    );
    Ok(dataset)
}

/// Read a headed CSV from any reader.
///
/// # Errors
/// Returns error if a record is malformed or the header row is empty.
pub fn read_csv<R: Read>(input: R) -> Result<RawDataset, DatasetError> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(input);
    collect(reader)
}

fn collect<R: Read>(mut reader: csv::Reader<R>) -> Result<RawDataset, DatasetError> {
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(String::is_empty) {
        return Err(DatasetError::MissingHeader);
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawDataset::new(headers, rows))
}

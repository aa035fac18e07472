//! Reference grid CSV files
//!
//! Files carry a header with at least `lat,lon,month,ghi,dhi` (any order,
//! extra columns ignored) and one row per point and month.

use crate::api::ImportRow;
use crate::error::{CliError, Result};
use irradiance_common::Coordinate;
use std::fs::File;
use std::path::Path;

pub const REQUIRED_COLUMNS: [&str; 5] = ["lat", "lon", "month", "ghi", "dhi"];

/// Streams validated rows in fixed-size chunks
pub struct ReferenceReader {
    records: csv::StringRecordsIntoIter<File>,
    columns: [usize; 5],
    line: u64,
}

impl ReferenceReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CliError::FileNotFound(path.display().to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        let mut columns = [0usize; 5];
        for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| CliError::invalid_csv(1, format!("missing column '{name}'")))?;
        }

        Ok(Self {
            records: reader.into_records(),
            columns,
            line: 1,
        })
    }

    /// Next chunk of at most `size` rows, `None` once the file is exhausted
    pub fn next_chunk(&mut self, size: usize) -> Result<Option<Vec<ImportRow>>> {
        let mut chunk = Vec::with_capacity(size);

        while chunk.len() < size {
            let Some(record) = self.records.next() else {
                break;
            };
            self.line += 1;
            chunk.push(parse_row(&record?, &self.columns, self.line)?);
        }

        Ok((!chunk.is_empty()).then_some(chunk))
    }
}

fn field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<T> {
    let raw = record.get(index).unwrap_or("");
    raw.parse()
        .map_err(|_| CliError::invalid_csv(line, format!("column '{name}' has invalid value '{raw}'")))
}

fn parse_row(record: &csv::StringRecord, columns: &[usize; 5], line: u64) -> Result<ImportRow> {
    let row = ImportRow {
        lat: field(record, columns[0], "lat", line)?,
        lon: field(record, columns[1], "lon", line)?,
        month: field(record, columns[2], "month", line)?,
        ghi: field(record, columns[3], "ghi", line)?,
        dhi: field(record, columns[4], "dhi", line)?,
    };

    Coordinate::new(row.lat, row.lon).map_err(|e| CliError::invalid_csv(line, e.to_string()))?;

    if !(1..=12).contains(&row.month) {
        return Err(CliError::invalid_csv(line, format!("month {} outside 1..=12", row.month)));
    }
    if !(row.ghi.is_finite() && row.ghi >= 0.0 && row.dhi.is_finite() && row.dhi >= 0.0) {
        return Err(CliError::invalid_csv(line, "ghi and dhi must be non-negative numbers"));
    }

    Ok(row)
}

/// Count data rows without validating them
pub fn count_rows(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut count = 0;
    for record in reader.records() {
        record?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_chunks_respect_size() {
        let mut body = String::from("lat,lon,month,ghi,dhi\n");
        for month in 1..=12 {
            body.push_str(&format!("-15.0,-47.0,{month},5.5,2.0\n"));
        }
        let file = write_csv(&body);

        let mut reader = ReferenceReader::open(file.path()).unwrap();
        let sizes: Vec<usize> = std::iter::from_fn(|| reader.next_chunk(5).unwrap())
            .map(|c| c.len())
            .collect();
        assert_eq!(sizes, vec![5, 5, 2]);
        assert_eq!(count_rows(file.path()).unwrap(), 12);
    }

    #[test]
    fn test_column_order_and_extras_are_tolerated() {
        let file = write_csv("month,dhi,ghi,station,lon,lat\n3, 1.2, 4.8,BSB, -47.9, -15.8\n");
        let mut reader = ReferenceReader::open(file.path()).unwrap();
        let chunk = reader.next_chunk(10).unwrap().unwrap();
        assert_eq!(
            chunk[0],
            ImportRow {
                lat: -15.8,
                lon: -47.9,
                month: 3,
                ghi: 4.8,
                dhi: 1.2
            }
        );
    }

    #[test]
    fn test_missing_column() {
        let file = write_csv("lat,lon,month,ghi\n1,1,1,1\n");
        let err = ReferenceReader::open(file.path()).err().unwrap();
        assert!(matches!(err, CliError::InvalidCsv { line: 1, ref reason } if reason.contains("dhi")));
    }

    #[test]
    fn test_bad_rows_report_line() {
        let file = write_csv("lat,lon,month,ghi,dhi\n1,1,1,5,2\n1,1,13,5,2\n");
        let mut reader = ReferenceReader::open(file.path()).unwrap();
        let err = reader.next_chunk(10).unwrap_err();
        assert!(matches!(err, CliError::InvalidCsv { line: 3, .. }));

        let file = write_csv("lat,lon,month,ghi,dhi\n95,1,1,5,2\n");
        let mut reader = ReferenceReader::open(file.path()).unwrap();
        assert!(matches!(reader.next_chunk(10), Err(CliError::InvalidCsv { line: 2, .. })));

        let file = write_csv("lat,lon,month,ghi,dhi\n1,1,1,n/a,2\n");
        let mut reader = ReferenceReader::open(file.path()).unwrap();
        assert!(matches!(reader.next_chunk(10), Err(CliError::InvalidCsv { .. })));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ReferenceReader::open("/definitely/not/here.csv"),
            Err(CliError::FileNotFound(_))
        ));
    }
}

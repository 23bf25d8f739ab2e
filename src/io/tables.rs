// src/io/tables.rs

use crate::error::{PipelineError, PipelineResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Fails with `MissingInput` unless `path` exists.
pub fn require(path: &Path, artifact: &str) -> PipelineResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::MissingInput {
            artifact: artifact.to_string(),
            path: path.to_path_buf(),
        })
    }
}

/// Deserializes every row of a headed CSV stream.
pub fn read_rows<T, R>(reader: R) -> Result<Vec<T>, csv::Error>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader.deserialize().collect()
}

/// Loads a table that must already exist at `path`.
pub fn read_table<T: DeserializeOwned>(path: &Path, artifact: &str) -> PipelineResult<Vec<T>> {
    require(path, artifact)?;
    let file = std::fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let rows: Vec<T> = read_rows(file).map_err(|e| PipelineError::csv(path, e))?;
    debug!(artifact, rows = rows.len(), path = %path.display(), "read table");
    Ok(rows)
}

/// Counts data rows without interpreting them.
pub fn count_rows(path: &Path, artifact: &str) -> PipelineResult<usize> {
    require(path, artifact)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;
    let mut count = 0;
    for record in reader.records() {
        record.map_err(|e| PipelineError::csv(path, e))?;
        count += 1;
    }
    Ok(count)
}

/// Writes the rows to a CSV file, creating parent directories.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> PipelineResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }

    let mut wtr = csv::Writer::from_path(path).map_err(|e| PipelineError::csv(path, e))?;
    for row in rows {
        wtr.serialize(row).map_err(|e| PipelineError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| PipelineError::io(path, e))?;

    info!(rows = rows.len(), path = %path.display(), "wrote table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        name: String,
        value: Option<f64>,
    }

    #[test]
    fn write_then_read_preserves_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rows.csv");
        let rows = vec![
            Row { name: "a".into(), value: Some(1.5) },
            Row { name: "b".into(), value: None },
        ];
        write_table(&path, &rows).unwrap();
        let back: Vec<Row> = read_table(&path, "rows").unwrap();
        assert_eq!(back, rows);
        assert_eq!(count_rows(&path, "rows").unwrap(), 2);
    }

    #[test]
    fn missing_table_names_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_table::<Row>(&dir.path().join("absent.csv"), "sales master").unwrap_err();
        match err {
            PipelineError::MissingInput { artifact, .. } => assert_eq!(artifact, "sales master"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fields_are_trimmed() {
        let rows: Vec<Row> = read_rows("name,value\n  x , 2.0 \n".as_bytes()).unwrap();
        assert_eq!(rows[0].name, "x");
        assert_eq!(rows[0].value, Some(2.0));
    }
}

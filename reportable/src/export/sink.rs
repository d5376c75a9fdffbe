//! CSV output
//!
//! Rows are written to a temporary file that is only moved to its disk once
//! the export succeeds. Dropping the sink deletes the partial file.

use std::path::Path;

use serde_json::Value;
use tempfile::{NamedTempFile, TempPath};

use super::error::ExportError;
use crate::query::Row;
use crate::report::HeaderMap;

pub struct CsvSink {
    writer: csv::Writer<NamedTempFile>,
    headers: HeaderMap,
    /// Column order, fixed by the first row
    columns: Option<Vec<String>>,
    rows: u64,
}

impl CsvSink {
    /// Stage a new file in `temp_dir`, or the system temp directory
    pub async fn create(temp_dir: Option<&Path>, headers: HeaderMap) -> Result<Self, ExportError> {
        if let Some(dir) = temp_dir {
            tokio::fs::create_dir_all(dir).await?;
        }
        let dir = temp_dir.map(Path::to_path_buf);
        let file = tokio::task::spawn_blocking(move || match dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        })
        .await
        .map_err(std::io::Error::other)??;
        Ok(Self {
            writer: csv::Writer::from_writer(file),
            headers,
            columns: None,
            rows: 0,
        })
    }

    /// Write one row, preceded by the header row on the first call
    ///
    /// Later rows are written in the first row's column order. Missing
    /// columns become empty cells and extra ones are dropped.
    pub fn write_row(&mut self, row: &Row) -> Result<(), ExportError> {
        if self.columns.is_none() {
            let columns: Vec<String> = row.keys().cloned().collect();
            self.writer
                .write_record(columns.iter().map(|c| self.headers.label_for(c)))?;
            self.columns = Some(columns);
        }
        let columns = self.columns.as_deref().unwrap_or_default();
        self.writer
            .write_record(columns.iter().map(|c| cell(row.get(c))))?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and hand over the staged file
    pub fn finish(self) -> Result<(TempPath, u64), ExportError> {
        let mut writer = self.writer;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| {
            ExportError::Io(std::io::Error::new(e.error().kind(), e.error().to_string()))
        })?;
        file.as_file().sync_all()?;
        Ok((file.into_temp_path(), self.rows))
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => (if *b { "1" } else { "0" }).to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_header_from_first_row() {
        let mut sink = CsvSink::create(None, HeaderMap::new().with("name", "Full Name"))
            .await
            .unwrap();
        sink.write_row(&row(json!({"id": 1, "name": "Ann"}))).unwrap();
        sink.write_row(&row(json!({"name": "Bob", "id": 2, "extra": true})))
            .unwrap();
        sink.write_row(&row(json!({"id": 3}))).unwrap();

        let (path, rows) = sink.finish().unwrap();
        assert_eq!(rows, 3);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "id,Full Name\n1,Ann\n2,Bob\n3,\n"
        );
    }

    #[tokio::test]
    async fn test_cell_rendering() {
        let mut sink = CsvSink::create(None, HeaderMap::new()).await.unwrap();
        sink.write_row(&row(json!({
            "null": null,
            "flag": true,
            "off": false,
            "price": 9.5,
            "text": "a, \"quoted\" value",
            "tags": ["x", "y"]
        })))
        .unwrap();

        let (path, _) = sink.finish().unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("null,flag,off,price,text,tags"));
        assert_eq!(
            lines.next(),
            Some(r#",1,0,9.5,"a, ""quoted"" value","[""x"",""y""]""#)
        );
    }

    #[tokio::test]
    async fn test_empty_output_has_no_header() {
        let sink = CsvSink::create(None, HeaderMap::new()).await.unwrap();
        assert_eq!(sink.rows(), 0);
        let (path, rows) = sink.finish().unwrap();
        assert_eq!(rows, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[tokio::test]
    async fn test_dropped_sink_removes_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let staging = temp_dir.path().join("staging");
        let mut sink = CsvSink::create(Some(&staging), HeaderMap::new())
            .await
            .unwrap();
        sink.write_row(&row(json!({"id": 1}))).unwrap();
        drop(sink);
        assert_eq!(std::fs::read_dir(&staging).unwrap().count(), 0);
    }
}

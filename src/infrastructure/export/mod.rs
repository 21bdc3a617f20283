//! Export encoders for `?action=csv|excel|pdf`.
//!
//! File-backed formats are staged in the export directory and removed as
//! soon as their bytes are read back, so no artifact outlives the request.

pub mod csv;
pub mod pdf;
pub mod xlsx;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::column::Column;
use crate::domain::error::{AppError, Result};
use crate::domain::export::{ResponseShape, TableAction};
use crate::domain::row::{Row, RowExt};
use crate::infrastructure::response::strip_tags;

/// Header titles plus plain-text cells, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    pub fn from_rows<'a>(
        title: &str,
        columns: impl IntoIterator<Item = &'a Column>,
        rows: &[Row],
    ) -> Self {
        let columns: Vec<&Column> = columns.into_iter().collect();
        Self {
            title: title.to_string(),
            headers: columns.iter().map(|c| c.title.clone()).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|c| strip_tags(&row.text(&c.data)))
                        .collect()
                })
                .collect(),
        }
    }
}

/// An encoded export ready to be sent.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub action: TableAction,
    pub filename: String,
    pub body: Vec<u8>,
    pub last_modified: Option<SystemTime>,
}

pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn export(&self, action: TableAction, filename: &str, table: &ExportTable) -> Result<ExportFile> {
        let filename = format!("{}.{}", filename, action.extension());
        match action.response_shape() {
            ResponseShape::DownloadFile => self.export_file(action, filename, table),
            ResponseShape::Rendered => Ok(ExportFile {
                action,
                filename,
                body: pdf::render_pdf(table)?,
                last_modified: None,
            }),
            ResponseShape::Html => Err(AppError::ExportError(format!(
                "{} is rendered as a view, not an export file",
                action.as_str()
            ))),
        }
    }

    fn export_file(&self, action: TableAction, filename: String, table: &ExportTable) -> Result<ExportFile> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::IoError(format!(
                "Failed to create export dir {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let staged = StagedFile::new(
            self.dir
                .join(format!("{}.{}", Uuid::new_v4(), action.extension())),
        );

        match action {
            TableAction::Csv => csv::write_csv_file(staged.path(), table)?,
            TableAction::Excel => xlsx::write_xlsx_file(staged.path(), table)?,
            other => {
                return Err(AppError::ExportError(format!(
                    "{} has no file encoder",
                    other.as_str()
                )))
            }
        }

        let last_modified = fs::metadata(staged.path())
            .and_then(|meta| meta.modified())
            .ok();
        let body = fs::read(staged.path()).map_err(|e| {
            AppError::IoError(format!("Failed to read export {}: {}", filename, e))
        })?;
        debug!(filename = %filename, bytes = body.len(), "Export file staged");

        Ok(ExportFile {
            action,
            filename,
            body,
            last_modified,
        })
    }
}

/// Removes the staged export when dropped.
struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %err, path = %self.path.display(), "Failed to remove staged export");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_table() -> ExportTable {
        let rows: Vec<Row> = (1..=3)
            .map(|i| {
                json!({"id": i, "name": format!("<b>Record-{}</b>", i), "secret": "x"})
                    .as_object()
                    .cloned()
                    .unwrap()
            })
            .collect();
        let columns = vec![Column::make("id"), Column::make("name")];
        ExportTable::from_rows("users", &columns, &rows)
    }

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("datatables-export-{}-{}", name, Uuid::new_v4()))
    }

    #[test]
    fn test_from_rows_uses_titles_and_strips_markup() {
        let table = sample_table();
        assert_eq!(table.headers, vec!["Id", "Name"]);
        assert_eq!(table.rows[0], vec!["1", "Record-1"]);
        assert_eq!(table.rows.len(), 3);
    }

    #[test]
    fn test_csv_export_removes_staged_file() {
        let dir = scratch_dir("csv");
        let exporter = Exporter::new(&dir);
        let file = exporter
            .export(TableAction::Csv, "users_20260101000000", &sample_table())
            .unwrap();

        assert_eq!(file.filename, "users_20260101000000.csv");
        assert!(file.last_modified.is_some());
        assert!(String::from_utf8(file.body).unwrap().starts_with("Id,Name"));
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_pdf_export_is_in_memory() {
        let dir = scratch_dir("pdf");
        let exporter = Exporter::new(&dir);
        let file = exporter
            .export(TableAction::Pdf, "users", &sample_table())
            .unwrap();

        assert_eq!(file.filename, "users.pdf");
        assert!(file.last_modified.is_none());
        assert!(file.body.starts_with(b"%PDF"));
        assert!(!dir.exists());
    }

    #[test]
    fn test_print_is_not_an_export() {
        let exporter = Exporter::new(scratch_dir("print"));
        assert!(exporter
            .export(TableAction::Print, "users", &sample_table())
            .is_err());
    }
}

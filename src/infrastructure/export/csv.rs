use std::io::Write;
use std::path::Path;

use ::csv::{QuoteStyle, WriterBuilder};

use super::ExportTable;
use crate::domain::error::{AppError, Result};

pub fn write_csv<W: Write>(writer: W, table: &ExportTable) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(writer);

    writer
        .write_record(&table.headers)
        .map_err(|e| AppError::ExportError(format!("Failed to write CSV header: {}", e)))?;

    for (index, row) in table.rows.iter().enumerate() {
        writer.write_record(row).map_err(|e| {
            AppError::ExportError(format!("Failed to write CSV row {}: {}", index + 1, e))
        })?;
    }

    writer
        .flush()
        .map_err(|e| AppError::ExportError(format!("Failed to flush CSV: {}", e)))
}

pub fn write_csv_file(path: &Path, table: &ExportTable) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| {
        AppError::IoError(format!("Failed to create {}: {}", path.display(), e))
    })?;
    write_csv(file, table)
}

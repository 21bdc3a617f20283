use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use super::ExportTable;
use crate::domain::error::{AppError, Result};

const MAX_SHEET_NAME: usize = 31;

pub fn write_xlsx_file(path: &Path, table: &ExportTable) -> Result<()> {
    let mut workbook = Workbook::new();
    fill_workbook(&mut workbook, table).map_err(|e| {
        AppError::ExportError(format!("Failed to build spreadsheet: {}", e))
    })?;
    workbook
        .save(path)
        .map_err(|e| AppError::ExportError(format!("Failed to save spreadsheet: {}", e)))
}

fn fill_workbook(workbook: &mut Workbook, table: &ExportTable) -> std::result::Result<(), XlsxError> {
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(&table.title))?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for (index, row) in table.rows.iter().enumerate() {
        let row_num = (index + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            write_cell(worksheet, row_num, col as u16, cell)?;
        }
    }

    Ok(())
}

/// Numeric-looking cells are written as numbers so spreadsheet formulas
/// work on them.
fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &str) -> std::result::Result<(), XlsxError> {
    let looks_numeric = !cell.is_empty()
        && !(cell.len() > 1 && cell.starts_with('0') && !cell.starts_with("0."));
    match cell.parse::<f64>() {
        Ok(number) if looks_numeric && number.is_finite() => {
            worksheet.write_number(row, col, number)?;
        }
        _ => {
            worksheet.write_string(row, col, cell)?;
        }
    }
    Ok(())
}

/// Excel rejects empty names, names over 31 chars and `[]:*?/\`.
fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Reader, Xlsx};

    #[test]
    fn test_sheet_name() {
        assert_eq!(sheet_name("users"), "users");
        assert_eq!(sheet_name("a/b"), "ab");
        assert_eq!(sheet_name(""), "Sheet1");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }

    #[test]
    fn test_written_workbook_reads_back() {
        let path = std::env::temp_dir().join(format!("{}.xlsx", uuid::Uuid::new_v4()));
        let table = ExportTable {
            title: "users".into(),
            headers: vec!["Id".into(), "Name".into()],
            rows: vec![
                vec!["1".into(), "Record-1".into()],
                vec!["2".into(), "007".into()],
            ],
        };
        write_xlsx_file(&path, &table).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let range = workbook.worksheet_range("users").unwrap();
        assert_eq!(range.get_size(), (3, 2));
        assert_eq!(range.get_value((0, 1)).unwrap().to_string(), "Name");
        assert_eq!(range.get_value((1, 1)).unwrap().to_string(), "Record-1");
        assert_eq!(range.get_value((1, 0)).unwrap().to_string(), "1");
        assert_eq!(range.get_value((2, 1)).unwrap().to_string(), "007");

        std::fs::remove_file(&path).ok();
    }
}

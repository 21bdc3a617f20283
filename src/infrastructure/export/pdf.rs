use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use super::ExportTable;
use crate::domain::error::{AppError, Result};

// A4 landscape, in points.
const PAGE_WIDTH: i64 = 842;
const PAGE_HEIGHT: i64 = 595;
const MARGIN: i64 = 36;
const FONT_SIZE: i64 = 9;
const LINE_HEIGHT: i64 = 14;
const TITLE_SIZE: i64 = 14;
// Courier glyphs are 0.6em wide.
const CHAR_WIDTH: f64 = FONT_SIZE as f64 * 0.6;

/// Lays the table out as fixed-width text pages and returns the PDF bytes.
pub fn render_pdf(table: &ExportTable) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
            "F2" => bold_id,
        },
    });

    let widths = column_widths(table);
    let header = format_line(&table.headers, &widths);
    let lines: Vec<String> = table
        .rows
        .iter()
        .map(|row| format_line(row, &widths))
        .collect();

    let rows_per_page =
        ((PAGE_HEIGHT - 2 * MARGIN - TITLE_SIZE - 2 * LINE_HEIGHT) / LINE_HEIGHT).max(1) as usize;

    let mut page_ids: Vec<ObjectId> = Vec::new();
    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![&lines[..]]
    } else {
        lines.chunks(rows_per_page).collect()
    };
    let page_count = chunks.len();

    for (page_index, chunk) in chunks.into_iter().enumerate() {
        let content = page_content(&table.title, &header, chunk, page_index + 1, page_count);
        let encoded = content
            .encode()
            .map_err(|e| AppError::ExportError(format!("Failed to encode PDF page: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        "Count" => page_ids.len() as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AppError::ExportError(format!("Failed to write PDF: {}", e)))?;
    Ok(buffer)
}

fn page_content(title: &str, header: &str, lines: &[String], page: usize, pages: usize) -> Content {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F2".into(), TITLE_SIZE.into()]),
        Operation::new(
            "Td",
            vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN - TITLE_SIZE).into()],
        ),
        Operation::new(
            "Tj",
            vec![Object::string_literal(format!("{} ({}/{})", title, page, pages))],
        ),
        Operation::new("Tf", vec!["F2".into(), FONT_SIZE.into()]),
        Operation::new("TL", vec![LINE_HEIGHT.into()]),
        Operation::new("T*", vec![]),
        Operation::new("T*", vec![]),
        Operation::new("Tj", vec![Object::string_literal(header.to_string())]),
        Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
    ];

    for line in lines {
        operations.push(Operation::new("T*", vec![]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(line.clone())],
        ));
    }
    operations.push(Operation::new("ET", vec![]));

    Content { operations }
}

/// Column widths in characters, shrunk proportionally when the table is
/// wider than the page.
fn column_widths(table: &ExportTable) -> Vec<usize> {
    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let gaps = widths.len().saturating_sub(1) * 2;
    let available = (((PAGE_WIDTH - 2 * MARGIN) as f64 / CHAR_WIDTH) as usize).saturating_sub(gaps);
    let total: usize = widths.iter().sum();
    if total > available && total > 0 {
        widths = widths
            .iter()
            .map(|w| ((w * available) / total).max(3))
            .collect();
    }
    widths
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    widths
        .iter()
        .enumerate()
        .map(|(i, width)| {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            fit(cell, *width)
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn fit(cell: &str, width: usize) -> String {
    let count = cell.chars().count();
    if count <= width {
        format!("{:<width$}", cell, width = width)
    } else if width <= 3 {
        cell.chars().take(width).collect()
    } else {
        let truncated: String = cell.chars().take(width - 3).collect();
        format!("{}...", truncated)
    }
}

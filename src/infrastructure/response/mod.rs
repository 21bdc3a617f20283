use actix_web::http::header::{
    ContentDisposition, DispositionParam, DispositionType, HttpDate, ACCEPT_RANGES, LAST_MODIFIED,
};
use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::export::ResponseShape;
use crate::infrastructure::export::ExportFile;

static SCRIPT_STYLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap());

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

static WHITESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Plain text of a cell value that may carry markup (action buttons,
/// links), as written into export files.
pub fn strip_tags(value: &str) -> String {
    if !value.contains('<') {
        return value.to_string();
    }

    let mut cleaned = SCRIPT_STYLE_PATTERN.replace_all(value, "").to_string();
    cleaned = TAG_PATTERN.replace_all(&cleaned, " ").to_string();
    cleaned = decode_entities(&cleaned);
    WHITESPACE_PATTERN
        .replace_all(cleaned.trim(), " ")
        .to_string()
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Escapes text for HTML element content and attribute values.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn html_response(html: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}

/// Download response for an export. File-backed exports also carry the
/// headers of a static file (`Accept-Ranges`, `Last-Modified`).
pub fn export_response(file: ExportFile) -> HttpResponse {
    let disposition = ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(file.filename.clone())],
    };

    let mut builder = HttpResponse::Ok();
    builder
        .content_type(file.action.content_type())
        .insert_header(disposition);

    if file.action.response_shape() == ResponseShape::DownloadFile {
        builder.insert_header((ACCEPT_RANGES, "bytes"));
        if let Some(modified) = file.last_modified {
            builder.insert_header((LAST_MODIFIED, HttpDate::from(modified)));
        }
    }

    builder.body(file.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::export::TableAction;
    use std::time::SystemTime;

    #[test]
    fn test_strip_simple_tags() {
        assert_eq!(strip_tags("<b>Record-1</b>"), "Record-1");
    }

    #[test]
    fn test_strip_scripts_and_entities() {
        let input = "<a href=\"#\">Edit</a> <script>alert(1)</script>&amp; more";
        assert_eq!(strip_tags(input), "Edit & more");
    }

    #[test]
    fn test_strip_preserves_plain_text() {
        assert_eq!(strip_tags("Email-1@example.com"), "Email-1@example.com");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a title=\"x\">Tom & Jerry's</a>"),
            "&lt;a title=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_file_export_headers() {
        let response = export_response(ExportFile {
            action: TableAction::Csv,
            filename: "users_20260101000000.csv".into(),
            body: b"id\n1\n".to_vec(),
            last_modified: Some(SystemTime::now()),
        });
        let headers = response.headers();
        assert_eq!(headers.get(ACCEPT_RANGES).unwrap(), "bytes");
        assert!(headers.get(LAST_MODIFIED).is_some());
        let disposition = headers
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("users_20260101000000.csv"));
    }

    #[test]
    fn test_rendered_export_headers() {
        let response = export_response(ExportFile {
            action: TableAction::Pdf,
            filename: "users.pdf".into(),
            body: b"%PDF-1.5".to_vec(),
            last_modified: None,
        });
        assert!(response.headers().get(ACCEPT_RANGES).is_none());
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/pdf"
        );
    }
}

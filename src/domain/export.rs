use serde::{Deserialize, Serialize};

/// Non-grid outputs a table can produce, selected by `?action=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableAction {
    Csv,
    Excel,
    Pdf,
    Print,
}

/// How an export body travels back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Written to a temporary file, sent as a file download, then deleted.
    DownloadFile,
    /// Built in memory and sent as an ordinary response body.
    Rendered,
    /// A printable HTML page.
    Html,
}

impl TableAction {
    pub const ALL: [TableAction; 4] = [
        TableAction::Csv,
        TableAction::Excel,
        TableAction::Pdf,
        TableAction::Print,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "csv" => Some(TableAction::Csv),
            "excel" => Some(TableAction::Excel),
            "pdf" => Some(TableAction::Pdf),
            "print" => Some(TableAction::Print),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableAction::Csv => "csv",
            TableAction::Excel => "excel",
            TableAction::Pdf => "pdf",
            TableAction::Print => "print",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TableAction::Csv => "csv",
            TableAction::Excel => "xlsx",
            TableAction::Pdf => "pdf",
            TableAction::Print => "html",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            TableAction::Csv => "text/csv; charset=utf-8",
            TableAction::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            TableAction::Pdf => "application/pdf",
            TableAction::Print => "text/html; charset=utf-8",
        }
    }

    pub fn response_shape(&self) -> ResponseShape {
        match self {
            TableAction::Csv | TableAction::Excel => ResponseShape::DownloadFile,
            TableAction::Pdf => ResponseShape::Rendered,
            TableAction::Print => ResponseShape::Html,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shape_table() {
        assert_eq!(TableAction::Csv.response_shape(), ResponseShape::DownloadFile);
        assert_eq!(TableAction::Excel.response_shape(), ResponseShape::DownloadFile);
        assert_eq!(TableAction::Pdf.response_shape(), ResponseShape::Rendered);
        assert_eq!(TableAction::Print.response_shape(), ResponseShape::Html);
    }

    #[test]
    fn test_parse_actions() {
        for action in TableAction::ALL {
            assert_eq!(TableAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(TableAction::parse("xml"), None);
        assert_eq!(TableAction::Excel.extension(), "xlsx");
    }
}

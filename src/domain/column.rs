use serde::{Deserialize, Serialize};

/// Client-side column definition, also used to pick export/print columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub data: String,
    pub name: String,
    pub title: String,
    pub searchable: bool,
    pub orderable: bool,
    #[serde(skip)]
    pub exportable: bool,
    #[serde(skip)]
    pub printable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl Column {
    pub fn make(data: &str) -> Self {
        Self {
            data: data.to_string(),
            name: data.to_string(),
            title: title_case(data),
            searchable: true,
            orderable: true,
            exportable: true,
            printable: true,
            class_name: None,
            footer: None,
        }
    }

    /// A column that only exists after row transforms, so the database
    /// can neither search nor sort it.
    pub fn computed(data: &str) -> Self {
        Self {
            searchable: false,
            orderable: false,
            ..Self::make(data)
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn searchable(mut self, flag: bool) -> Self {
        self.searchable = flag;
        self
    }

    pub fn orderable(mut self, flag: bool) -> Self {
        self.orderable = flag;
        self
    }

    pub fn exportable(mut self, flag: bool) -> Self {
        self.exportable = flag;
        self
    }

    pub fn printable(mut self, flag: bool) -> Self {
        self.printable = flag;
        self
    }

    pub fn class_name(mut self, class: &str) -> Self {
        self.class_name = Some(class.to_string());
        self
    }

    pub fn footer(mut self, footer: &str) -> Self {
        self.footer = Some(footer.to_string());
        self
    }
}

/// "created_at" -> "Created At"
fn title_case(data: &str) -> String {
    data.split(|c| c == '_' || c == '.')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

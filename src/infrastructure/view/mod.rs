use serde_json::{Map, Value};
use tera::{Context, Tera};
use tracing::warn;

use crate::domain::error::{AppError, Result};

pub const USERS_VIEW: &str = "users";
pub const PRINT_VIEW: &str = "datatables::print";

const USERS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{{ description | default(value="No description") }}</title>
    <link rel="stylesheet" href="https://cdn.datatables.net/2.0.8/css/dataTables.dataTables.min.css">
</head>
<body>
<h1>DataTable</h1>
<p class="description">{{ description | default(value="No description") }}</p>
{{ table | safe }}
<script src="https://code.jquery.com/jquery-3.7.1.min.js"></script>
<script src="https://cdn.datatables.net/2.0.8/js/dataTables.min.js"></script>
{{ scripts | safe }}
</body>
</html>
"#;

const PRINT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{{ title }}</title>
    <style>
        body { font-family: sans-serif; font-size: 12px; }
        table { border-collapse: collapse; width: 100%; }
        th, td { border: 1px solid #999; padding: 4px 6px; text-align: left; }
    </style>
</head>
<body onload="window.print()">
<table class="table">
    <thead>
    <tr>
        {% for header in headers %}<th>{{ header }}</th>{% endfor %}
    </tr>
    </thead>
    <tbody>
    {% for row in rows %}
    <tr>
        {% for cell in row %}<td>{{ cell }}</td>{% endfor %}
    </tr>
    {% endfor %}
    </tbody>
</table>
</body>
</html>
"#;

/// Named HTML views backed by tera. The built-in views are always present;
/// a glob of extra templates may be layered on top.
pub struct ViewRenderer {
    tera: Tera,
}

impl ViewRenderer {
    pub fn new(template_glob: Option<&str>) -> Result<Self> {
        let mut tera = match template_glob {
            Some(glob) => Tera::new(glob).map_err(|e| {
                AppError::RenderError(format!("Failed to load templates from {}: {}", glob, e))
            })?,
            None => Tera::default(),
        };

        tera.add_raw_templates(vec![(USERS_VIEW, USERS_TEMPLATE), (PRINT_VIEW, PRINT_TEMPLATE)])
            .map_err(|e| AppError::RenderError(format!("Failed to register views: {}", e)))?;
        // Templates are registered without an .html suffix, so autoescape
        // has to be switched on for every name.
        tera.autoescape_on(vec![""]);

        Ok(Self { tera })
    }

    pub fn has_view(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    pub fn render(&self, view: &str, data: &Map<String, Value>) -> Result<String> {
        if !self.has_view(view) {
            return Err(AppError::NotFound(format!("View [{}] not found", view)));
        }

        let context = Context::from_value(Value::Object(data.clone()))
            .map_err(|e| AppError::RenderError(format!("Invalid view data: {}", e)))?;

        self.tera.render(view, &context).map_err(|e| {
            warn!(view, error = %e, "View rendering failed");
            AppError::RenderError(format!("Failed to render {}: {}", view, e))
        })
    }
}

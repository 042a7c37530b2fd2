//! Startup query parameters forwarded to the page.

use camino::Utf8Path;
use serde_json::Value;
use url::Url;

use crate::error::ShellError;

/// Name of the document loaded from the application directory.
pub const DOCUMENT: &str = "index.html";

/// Renders a config value as query text.
///
/// Strings are taken verbatim, scalars use their JSON text, arrays join their
/// rendered elements with `,` and objects are written as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Derives the ordered name/value pairs of the startup query.
///
/// The config is either an object, whose keys are used in insertion order,
/// or a list of `{ "name": .., "value": .. }` records. Records without a
/// string name are skipped.
pub fn startup_query(config: &Value) -> Vec<(String, String)> {
    match config {
        Value::Object(map) => map
            .iter()
            .map(|(name, value)| (name.clone(), render_value(value)))
            .collect(),
        Value::Array(records) => records
            .iter()
            .filter_map(|record| {
                let Some(name) = record.get("name").and_then(Value::as_str) else {
                    tracing::warn!("render config: skipping record without a name: {record}");
                    return None;
                };
                let value = record.get("value").map(render_value).unwrap_or_default();
                Some((name.to_string(), value))
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            tracing::warn!("render config: expected an object or a list, got {other}");
            Vec::new()
        }
    }
}

/// `file://` URL of the document inside `app_dir`, with the query appended.
///
/// An empty query adds no `?` suffix. `app_dir` has to be absolute.
pub fn document_url(app_dir: &Utf8Path, query: &[(String, String)]) -> Result<Url, ShellError> {
    let path = app_dir.join(DOCUMENT);
    let mut url = Url::from_file_path(&path).map_err(|_| ShellError::Url(path))?;

    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    Ok(url)
}

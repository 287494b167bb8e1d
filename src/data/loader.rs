use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value as JsonValue;

use super::model::{FieldValue, Record, Row};
use crate::error::{CensusError, Result};

/// Default bound on the one-time HTTP retrieval.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Where the payload comes from
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum DataSource {
    /// Records supplied directly by the caller.
    Inline(JsonValue),
    /// A JSON file on disk (e.g. the output of `generate_sample`).
    File(PathBuf),
    /// An http(s) location fetched once with a blocking GET.
    Remote(String),
}

impl DataSource {
    /// Pick the source to load from: inline records, then a file, then a url.
    /// An empty inline source (`[]`, `{}`, `null`, ...) counts as absent.
    /// Having none of them is a configuration error.
    pub fn resolve(url: Option<&str>, file: Option<&Path>, source: Option<JsonValue>) -> Result<Self> {
        match (source.filter(|v| !is_blank(v)), file, url) {
            (Some(value), _, _) => Ok(DataSource::Inline(value)),
            (None, Some(path), _) => Ok(DataSource::File(path.to_path_buf())),
            (None, None, Some(url)) if !url.is_empty() => Ok(DataSource::Remote(url.to_string())),
            _ => Err(CensusError::Configuration(
                "You must provide a url or a source.".to_string(),
            )),
        }
    }

    /// Produce the raw JSON payload.
    pub fn fetch(self, timeout: Duration) -> Result<JsonValue> {
        match self {
            DataSource::Inline(value) => Ok(value),
            DataSource::File(path) => read_json_file(&path),
            DataSource::Remote(url) => fetch_json(&url, timeout),
        }
    }
}

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(map) => map.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Fetch the payload, unwrap it by `data_key` if one is given, and turn it
/// into rows. The nesting key is applied here and nowhere else.
pub fn load_rows(source: DataSource, data_key: Option<&str>, timeout: Duration) -> Result<Vec<Row>> {
    let raw = source.fetch(timeout)?;
    let data = match data_key {
        Some(key) => unwrap_data_key(raw, key)?,
        None => raw,
    };
    Ok(rows_from_json(data))
}

/// Index a top-level object by `key`.
pub fn unwrap_data_key(raw: JsonValue, key: &str) -> Result<JsonValue> {
    match raw {
        JsonValue::Object(mut map) => map
            .remove(key)
            .ok_or_else(|| CensusError::MissingKey(key.to_string())),
        other => Err(CensusError::TypeMismatch(format!(
            "cannot look up '{key}' in a non-object payload ({})",
            json_kind(&other)
        ))),
    }
}

/// Convert a parsed payload into rows.
///
/// * array  → one row per element; objects become records, the rest scalars
/// * object → one scalar row per key (iterating an object yields its keys)
/// * scalar → a single scalar row
pub fn rows_from_json(value: JsonValue) -> Vec<Row> {
    match value {
        JsonValue::Array(items) => items.into_iter().map(row_from_json).collect(),
        JsonValue::Object(map) => map
            .into_iter()
            .map(|(k, _)| Row::Scalar(FieldValue::String(k)))
            .collect(),
        other => vec![Row::Scalar(json_to_field(other))],
    }
}

fn row_from_json(value: JsonValue) -> Row {
    match value {
        JsonValue::Object(obj) => Row::Record(
            obj.into_iter()
                .map(|(k, v)| (k, json_to_field(v)))
                .collect::<Record>(),
        ),
        other => Row::Scalar(json_to_field(other)),
    }
}

fn json_to_field(val: JsonValue) -> FieldValue {
    match val {
        JsonValue::String(s) => FieldValue::String(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                FieldValue::Float(f)
            } else {
                FieldValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => FieldValue::Bool(b),
        JsonValue::Null => FieldValue::Null,
        other => FieldValue::String(other.to_string()),
    }
}

fn json_kind(val: &JsonValue) -> &'static str {
    match val {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// File loader
// ---------------------------------------------------------------------------

fn read_json_file(path: &Path) -> Result<JsonValue> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CensusError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text).map_err(|e| CensusError::MalformedPayload(e.to_string()))
}

// ---------------------------------------------------------------------------
// HTTP loader
// ---------------------------------------------------------------------------

/// GET `url` and parse the body as JSON.
///
/// Failures are classified into invalid location, transport (connection,
/// redirects, timeout, non-2xx status) and malformed payload.
pub fn fetch_json(url: &str, timeout: Duration) -> Result<JsonValue> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| CensusError::InvalidUrl(format!("{url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CensusError::InvalidUrl(format!(
            "{url}: unsupported scheme '{}'",
            parsed.scheme()
        )));
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CensusError::Transport(e.to_string()))?;

    log::debug!("GET {parsed}");
    let response = client
        .get(parsed)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(classify)?;

    response.json::<JsonValue>().map_err(classify)
}

fn classify(err: reqwest::Error) -> CensusError {
    if err.is_builder() {
        CensusError::InvalidUrl(err.to_string())
    } else if err.is_decode() {
        CensusError::MalformedPayload(err.to_string())
    } else {
        CensusError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_requires_url_or_source() {
        assert!(matches!(
            DataSource::resolve(None, None, None),
            Err(CensusError::Configuration(_))
        ));
        assert!(matches!(
            DataSource::resolve(Some(""), None, None),
            Err(CensusError::Configuration(_))
        ));
        assert!(matches!(
            DataSource::resolve(Some("http://x"), None, Some(json!([{"Year": "2020"}]))),
            Ok(DataSource::Inline(_))
        ));
        assert!(matches!(
            DataSource::resolve(Some("http://x"), None, None),
            Ok(DataSource::Remote(_))
        ));
        assert!(matches!(
            DataSource::resolve(Some("http://x"), Some(Path::new("c.json")), None),
            Ok(DataSource::File(_))
        ));
    }

    #[test]
    fn empty_source_counts_as_absent() {
        for empty in [json!([]), json!({}), json!(null), json!("")] {
            assert!(matches!(
                DataSource::resolve(None, None, Some(empty.clone())),
                Err(CensusError::Configuration(_))
            ));
            assert!(matches!(
                DataSource::resolve(Some("http://x"), None, Some(empty)),
                Ok(DataSource::Remote(_))
            ));
        }
    }

    #[test]
    fn data_key_unwraps_object() {
        let raw = json!({"data": [{"Year": "2020", "Population": 10}], "source": []});
        let rows = load_rows(DataSource::Inline(raw), Some("data"), DEFAULT_TIMEOUT).unwrap();
        assert_eq!(rows.len(), 1);
        let rec = rows[0].as_record().unwrap();
        assert_eq!(rec.get("Population"), Some(&FieldValue::Integer(10)));
    }

    #[test]
    fn missing_data_key() {
        let raw = json!({"rows": []});
        assert!(matches!(
            load_rows(DataSource::Inline(raw), Some("data"), DEFAULT_TIMEOUT),
            Err(CensusError::MissingKey(k)) if k == "data"
        ));
    }

    #[test]
    fn data_key_on_array_is_type_mismatch() {
        assert!(matches!(
            unwrap_data_key(json!([1, 2]), "data"),
            Err(CensusError::TypeMismatch(_))
        ));
    }

    #[test]
    fn payload_shapes() {
        let rows = rows_from_json(json!(["test", {"Year": 2020}]));
        assert_eq!(rows[0], Row::Scalar(FieldValue::from("test")));
        assert!(rows[1].as_record().is_ok());

        let rows = rows_from_json(json!({"a": 1, "b": 2}));
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.as_record().is_err()));

        assert_eq!(rows_from_json(json!(7)), vec![Row::Scalar(FieldValue::Integer(7))]);
    }

    #[test]
    fn nested_values_kept_as_text() {
        let rows = rows_from_json(json!([{"Tags": [1, 2], "Ratio": 0.5}]));
        let rec = rows[0].as_record().unwrap();
        assert_eq!(rec.get("Tags"), Some(&FieldValue::String("[1,2]".into())));
        assert_eq!(rec.get("Ratio"), Some(&FieldValue::Float(0.5)));
    }

    #[test]
    fn invalid_urls_are_rejected_before_connecting() {
        assert!(matches!(
            fetch_json("not a url", DEFAULT_TIMEOUT),
            Err(CensusError::InvalidUrl(_))
        ));
        assert!(matches!(
            fetch_json("ftp://example.com/data.json", DEFAULT_TIMEOUT),
            Err(CensusError::InvalidUrl(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let source = DataSource::File(PathBuf::from("/definitely/not/here.json"));
        assert!(matches!(
            source.fetch(DEFAULT_TIMEOUT),
            Err(CensusError::Io(_))
        ));
    }
}

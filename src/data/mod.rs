/// Data layer: value model, loading, and record scans.
///
/// Architecture:
/// ```text
///  http(s) url / .json file / inline serde_json::Value
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  fetch → unwrap data key → Vec<Row>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  Row / Record / FieldValue
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  year filter, year set, mean, closeness
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;

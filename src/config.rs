use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::data::loader::DEFAULT_TIMEOUT;
use crate::error::{CensusError, Result};

pub const DEFAULT_YEAR_KEY: &str = "Year";
pub const DEFAULT_POPULATION_KEY: &str = "Population";
pub const DEFAULT_CLOSENESS: i64 = 100;

// ---------------------------------------------------------------------------
// Settings – everything the binary reads from the environment
// ---------------------------------------------------------------------------

/// Runtime configuration. Nothing here is global: the settings are handed to
/// [`crate::Counties::from_settings`] explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// `COUNTIES_URL` (or the legacy `COUNTIES-URL`).
    pub url: Option<String>,
    /// `COUNTIES_FILE`: read the payload from disk instead of over HTTP.
    pub file: Option<PathBuf>,
    /// `COUNTIES_DATA_KEY`: top-level key holding the record list.
    pub data_key: Option<String>,
    pub year_key: String,
    pub population_key: String,
    pub timeout: Duration,
    pub closeness: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: None,
            file: None,
            data_key: None,
            year_key: DEFAULT_YEAR_KEY.to_string(),
            population_key: DEFAULT_POPULATION_KEY.to_string(),
            timeout: DEFAULT_TIMEOUT,
            closeness: DEFAULT_CLOSENESS,
        }
    }
}

impl Settings {
    /// Load a `.env` file from the working directory (or a parent) into the
    /// process environment if one exists, then read [`Settings::from_env`].
    /// Variables already set in the environment win over the file.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("loaded {}", path.display()),
            Err(err) if err.not_found() => {}
            Err(err) => log::warn!(".env ignored: {err}"),
        }
        Self::from_env()
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings from a dotenv-formatted file only, leaving the process
    /// environment untouched.
    pub fn from_env_file(path: &Path) -> Result<Self> {
        let entries = dotenvy::from_path_iter(path)
            .map_err(|e| CensusError::Configuration(format!("{}: {e}", path.display())))?;
        let vars = entries
            .collect::<std::result::Result<HashMap<String, String>, _>>()
            .map_err(|e| CensusError::Configuration(format!("{}: {e}", path.display())))?;
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    /// Read settings through an arbitrary lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Settings::default();

        let timeout = match get("COUNTIES_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = parse_number::<f64>("COUNTIES_TIMEOUT_SECS", &raw)?;
                Duration::try_from_secs_f64(secs).map_err(|e| {
                    CensusError::Configuration(format!("COUNTIES_TIMEOUT_SECS='{raw}': {e}"))
                })?
            }
            None => defaults.timeout,
        };
        let closeness = match get("COUNTIES_CLOSENESS") {
            Some(raw) => parse_number::<i64>("COUNTIES_CLOSENESS", &raw)?,
            None => defaults.closeness,
        };

        Ok(Settings {
            url: get("COUNTIES_URL").or_else(|| get("COUNTIES-URL")),
            file: get("COUNTIES_FILE").map(PathBuf::from),
            data_key: get("COUNTIES_DATA_KEY"),
            year_key: get("COUNTIES_YEAR_KEY").unwrap_or(defaults.year_key),
            population_key: get("COUNTIES_POPULATION_KEY").unwrap_or(defaults.population_key),
            timeout,
            closeness,
        })
    }
}

fn parse_number<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let value: T = raw
        .trim()
        .parse()
        .map_err(|e| CensusError::Configuration(format!("{name}='{raw}': {e}")))?;
    if value < T::default() {
        return Err(CensusError::Configuration(format!(
            "{name}='{raw}': must not be negative"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.year_key, "Year");
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn legacy_url_variable_is_honoured() {
        let settings =
            Settings::from_lookup(lookup(&[("COUNTIES-URL", "http://legacy/api")])).unwrap();
        assert_eq!(settings.url.as_deref(), Some("http://legacy/api"));

        let settings = Settings::from_lookup(lookup(&[
            ("COUNTIES-URL", "http://legacy/api"),
            ("COUNTIES_URL", "http://new/api"),
        ]))
        .unwrap();
        assert_eq!(settings.url.as_deref(), Some("http://new/api"));
    }

    #[test]
    fn reads_keys_and_numbers() {
        let settings = Settings::from_lookup(lookup(&[
            ("COUNTIES_DATA_KEY", "data"),
            ("COUNTIES_YEAR_KEY", "ID Year"),
            ("COUNTIES_TIMEOUT_SECS", "2.5"),
            ("COUNTIES_CLOSENESS", "250"),
            ("COUNTIES_FILE", "sample_counties.json"),
        ]))
        .unwrap();
        assert_eq!(settings.data_key.as_deref(), Some("data"));
        assert_eq!(settings.year_key, "ID Year");
        assert_eq!(settings.population_key, "Population");
        assert_eq!(settings.timeout, Duration::from_millis(2500));
        assert_eq!(settings.closeness, 250);
        assert_eq!(settings.file, Some(PathBuf::from("sample_counties.json")));
    }

    #[test]
    fn bad_numbers_are_configuration_errors() {
        for pairs in [
            [("COUNTIES_CLOSENESS", "close")],
            [("COUNTIES_CLOSENESS", "-3")],
            [("COUNTIES_TIMEOUT_SECS", "soon")],
        ] {
            assert!(matches!(
                Settings::from_lookup(lookup(&pairs)),
                Err(CensusError::Configuration(_))
            ));
        }
    }

    #[test]
    fn reads_dotenv_file() {
        let path = std::env::temp_dir().join(format!("county-census-{}.env", std::process::id()));
        std::fs::write(
            &path,
            "# operator settings\nCOUNTIES_URL=http://example.test/api/data\nCOUNTIES_DATA_KEY=data\nCOUNTIES_CLOSENESS=50\n",
        )
        .unwrap();
        let settings = Settings::from_env_file(&path);
        std::fs::remove_file(&path).unwrap();

        let settings = settings.unwrap();
        assert_eq!(settings.url.as_deref(), Some("http://example.test/api/data"));
        assert_eq!(settings.data_key.as_deref(), Some("data"));
        assert_eq!(settings.closeness, 50);
    }

    #[test]
    fn missing_dotenv_file_is_configuration_error() {
        assert!(matches!(
            Settings::from_env_file(Path::new("/definitely/not/here.env")),
            Err(CensusError::Configuration(_))
        ));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let settings = Settings::from_lookup(lookup(&[("COUNTIES_URL", "  ")])).unwrap();
        assert_eq!(settings.url, None);
    }
}

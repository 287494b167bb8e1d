use std::collections::BTreeSet;
use std::iter::FusedIterator;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value as JsonValue;

use crate::config::{Settings, DEFAULT_POPULATION_KEY, DEFAULT_YEAR_KEY};
use crate::data::filter;
use crate::data::loader::{self, DataSource, DEFAULT_TIMEOUT};
use crate::data::model::{FieldValue, Record, Row};
use crate::error::{CensusError, Result};

// ---------------------------------------------------------------------------
// Counties – the loaded dataset and its queries
// ---------------------------------------------------------------------------

/// A per-county population dataset.
///
/// Loaded once at construction. The key names are public so a caller can
/// point queries at different fields between calls; the rows themselves are
/// never modified by a query.
///
/// Every query comes in two flavours: `try_*` returns the tagged
/// [`CensusError`], the plain variant logs the error and returns `None`.
#[derive(Debug, Clone)]
pub struct Counties {
    data: Option<Vec<Row>>,
    data_key: Option<String>,
    pub year_key: String,
    pub population_key: String,
}

impl Counties {
    pub fn builder() -> CountiesBuilder {
        CountiesBuilder::default()
    }

    /// Wrap rows that are already parsed, with the default key names.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            data: Some(rows),
            data_key: None,
            year_key: DEFAULT_YEAR_KEY.to_string(),
            population_key: DEFAULT_POPULATION_KEY.to_string(),
        }
    }

    /// Best-effort load driven by environment settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut builder = Counties::builder()
            .year_key(&settings.year_key)
            .population_key(&settings.population_key)
            .timeout(settings.timeout);
        if let Some(url) = &settings.url {
            builder = builder.url(url);
        }
        if let Some(path) = &settings.file {
            builder = builder.file(path);
        }
        if let Some(key) = &settings.data_key {
            builder = builder.data_key(key);
        }
        builder.build()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Number of loaded rows (0 when nothing was loaded).
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_key(&self) -> Option<&str> {
        self.data_key.as_deref()
    }

    /// Drop the loaded rows. Every query afterwards reports no result.
    pub fn discard_data(&mut self) {
        self.data = None;
    }

    fn rows(&self) -> Result<&[Row]> {
        self.data.as_deref().ok_or(CensusError::NoResult("load"))
    }

    // -- filter_by_year --

    pub fn try_filter_by_year(&self, year: impl Into<FieldValue>) -> Result<Vec<&Record>> {
        filter::filter_by_year(self.rows()?, &self.year_key, &year.into())
    }

    /// Records for `year`; an unknown year gives `Some(vec![])`.
    pub fn filter_by_year(&self, year: impl Into<FieldValue>) -> Option<Vec<&Record>> {
        report("filter_by_year", self.try_filter_by_year(year))
    }

    // -- years_in_dataset --

    pub fn try_years_in_dataset(&self) -> Result<BTreeSet<FieldValue>> {
        filter::distinct_years(self.rows()?, &self.year_key)
    }

    pub fn years_in_dataset(&self) -> Option<BTreeSet<FieldValue>> {
        report("years_in_dataset", self.try_years_in_dataset())
    }

    // -- average_population_per_year --

    pub fn try_average_population_per_year(&self, year: impl Into<FieldValue>) -> Result<f64> {
        let records = self.try_filter_by_year(year)?;
        filter::mean_population(&records, &self.population_key)
    }

    pub fn average_population_per_year(&self, year: impl Into<FieldValue>) -> Option<f64> {
        report(
            "average_population_per_year",
            self.try_average_population_per_year(year),
        )
    }

    // -- close_to_average_per_year --

    pub fn try_close_to_average_per_year(
        &self,
        year: impl Into<FieldValue>,
        closeness: impl Into<FieldValue>,
    ) -> Result<Vec<&Record>> {
        let closeness = filter::validate_closeness(&closeness.into())?;
        self.close_records_for(&year.into(), closeness)
    }

    pub fn close_to_average_per_year(
        &self,
        year: impl Into<FieldValue>,
        closeness: impl Into<FieldValue>,
    ) -> Option<Vec<&Record>> {
        report(
            "close_to_average_per_year",
            self.try_close_to_average_per_year(year, closeness),
        )
    }

    fn close_records_for(&self, year: &FieldValue, closeness: i64) -> Result<Vec<&Record>> {
        let average = self.try_average_population_per_year(year)?;
        let records = self.try_filter_by_year(year)?;
        if records.is_empty() {
            return Err(CensusError::NoResult("filter_by_year"));
        }
        filter::within_closeness(&records, &self.population_key, average, closeness)
    }

    // -- close_to_average --

    /// Lazily walk every year and yield the records close to that year's
    /// average. Nothing is computed until the iterator is pulled.
    pub fn close_to_average(&self, closeness: impl Into<FieldValue>) -> CloseToAverage<'_> {
        CloseToAverage {
            counties: self,
            closeness: closeness.into(),
            state: ScanState::Pending,
            batch: Vec::new().into_iter(),
        }
    }
}

/// Log a failed query and collapse it to `None`.
fn report<T>(operation: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            log::error!("{operation}: {err}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// CountiesBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CountiesBuilder {
    url: Option<String>,
    file: Option<PathBuf>,
    source: Option<JsonValue>,
    data_key: Option<String>,
    year_key: String,
    population_key: String,
    timeout: Duration,
}

impl Default for CountiesBuilder {
    fn default() -> Self {
        Self {
            url: None,
            file: None,
            source: None,
            data_key: None,
            year_key: DEFAULT_YEAR_KEY.to_string(),
            population_key: DEFAULT_POPULATION_KEY.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CountiesBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Records given directly; takes precedence over `file` and `url` unless
    /// empty.
    pub fn source(mut self, source: JsonValue) -> Self {
        self.source = Some(source);
        self
    }

    pub fn data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn year_key(mut self, key: impl Into<String>) -> Self {
        self.year_key = key.into();
        self
    }

    pub fn population_key(mut self, key: impl Into<String>) -> Self {
        self.population_key = key.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load the data, returning the failure instead of logging it.
    pub fn try_build(self) -> Result<Counties> {
        let source = DataSource::resolve(self.url.as_deref(), self.file.as_deref(), self.source)?;
        let rows = loader::load_rows(source, self.data_key.as_deref(), self.timeout)?;
        log::info!("loaded {} rows", rows.len());
        Ok(Counties {
            data: Some(rows),
            data_key: self.data_key,
            year_key: self.year_key,
            population_key: self.population_key,
        })
    }

    /// Load the data; on failure log the diagnostic and return a dataset
    /// without data whose queries all report no result.
    pub fn build(self) -> Counties {
        let empty = Counties {
            data: None,
            data_key: self.data_key.clone(),
            year_key: self.year_key.clone(),
            population_key: self.population_key.clone(),
        };
        match self.try_build() {
            Ok(counties) => counties,
            Err(err) => {
                log::error!("{err}");
                empty
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CloseToAverage – the lazy cross-year scan
// ---------------------------------------------------------------------------

enum ScanState {
    /// Not pulled yet: closeness and years are resolved on the first `next`.
    Pending,
    Running {
        closeness: i64,
        years: std::collections::btree_set::IntoIter<FieldValue>,
    },
    Finished,
}

/// Iterator returned by [`Counties::close_to_average`].
///
/// A year that fails with a missing key or no result is logged and skipped.
/// A type mismatch is logged and ends the scan.
pub struct CloseToAverage<'a> {
    counties: &'a Counties,
    closeness: FieldValue,
    state: ScanState,
    batch: std::vec::IntoIter<&'a Record>,
}

impl<'a> CloseToAverage<'a> {
    fn start(&mut self) {
        let closeness = match filter::validate_closeness(&self.closeness) {
            Ok(c) => c,
            Err(err) => {
                log::error!("close_to_average: {err}");
                self.state = ScanState::Finished;
                return;
            }
        };
        self.state = match self.counties.years_in_dataset() {
            Some(years) => ScanState::Running {
                closeness,
                years: years.into_iter(),
            },
            None => ScanState::Finished,
        };
    }
}

impl<'a> Iterator for CloseToAverage<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.batch.next() {
                return Some(record);
            }
            if let ScanState::Pending = self.state {
                self.start();
            }
            let ScanState::Running { closeness, years } = &mut self.state else {
                return None;
            };
            let closeness = *closeness;
            let Some(year) = years.next() else {
                self.state = ScanState::Finished;
                return None;
            };

            log::debug!("close_to_average: scanning year {year}");
            match self.counties.close_records_for(&year, closeness) {
                Ok(records) => self.batch = records.into_iter(),
                Err(err @ CensusError::TypeMismatch(_)) => {
                    log::error!("close_to_average: year {year}: {err}");
                    self.state = ScanState::Finished;
                    return None;
                }
                Err(err) => log::warn!("close_to_average: skipping year {year}: {err}"),
            }
        }
    }
}

impl FusedIterator for CloseToAverage<'_> {}

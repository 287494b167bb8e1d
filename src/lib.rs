//! Per-county population statistics.
//!
//! Load a dataset of county records once, then ask for the years present,
//! the average population of a year, and the records that sit close to that
//! average.

pub mod config;
pub mod counties;
pub mod data;
pub mod error;

pub use config::Settings;
pub use counties::{CloseToAverage, Counties, CountiesBuilder};
pub use data::model::{FieldValue, Record, Row};
pub use error::CensusError;

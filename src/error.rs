//! Pipeline outcomes the caller has to tell apart from plain I/O failures

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Every source came back empty; nothing was written
    #[error("no data produced: all sources returned zero usable records")]
    NoData,

    #[error("invalid date range: end {end} is before start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

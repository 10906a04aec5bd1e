//! Run summary over a filled series

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::{DailyPoint, Provenance};

/// Counts per provenance plus the opening rate of each year
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub total: usize,
    pub actual: usize,
    pub interpolated: usize,
    pub extrapolated: usize,
    pub gaps: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// First available rate of every calendar year in the series
    pub yearly_open: BTreeMap<i32, f64>,
}

impl SeriesSummary {
    pub fn from_points(points: &[DailyPoint]) -> Self {
        let mut summary = Self {
            total: points.len(),
            first_date: points.first().map(|p| p.date),
            last_date: points.last().map(|p| p.date),
            ..Self::default()
        };

        for point in points {
            match point.provenance {
                Provenance::Actual => summary.actual += 1,
                Provenance::Interpolated => summary.interpolated += 1,
                Provenance::Extrapolated => summary.extrapolated += 1,
                Provenance::Gap => summary.gaps += 1,
            }
            if let Some(rate) = point.rate {
                summary.yearly_open.entry(point.date.year()).or_insert(rate);
            }
        }

        summary
    }

    /// Points not directly observed
    pub fn estimated(&self) -> usize {
        self.interpolated + self.extrapolated
    }
}

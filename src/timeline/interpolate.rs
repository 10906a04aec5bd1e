//! Daily gap filling over a merged timeline
//!
//! Walks the requested range one calendar day at a time. Known days are
//! copied, days between two observations are linearly interpolated and
//! days after the last observation carry its rate forward.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

use super::Timeline;
use crate::types::{DailyPoint, Observation, Provenance};

/// Source label attached to interpolated points
pub const INTERPOLATED_SOURCE: &str = "interpolated";

/// What to do with days that precede the first observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    /// Leave those days out of the series
    #[default]
    Skip,
    /// Emit a `Provenance::Gap` point without a rate
    Mark,
}

impl FromStr for GapPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(GapPolicy::Skip),
            "mark" | "gap" => Ok(GapPolicy::Mark),
            other => bail!("Unknown gap policy: {} (expected skip or mark)", other),
        }
    }
}

/// Config values go through the same parser as the command line
impl<'de> Deserialize<'de> for GapPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for GapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapPolicy::Skip => write!(f, "skip"),
            GapPolicy::Mark => write!(f, "mark"),
        }
    }
}

/// Fill `[start, end]` skipping days before the first observation
pub fn fill(timeline: &Timeline, start: NaiveDate, end: NaiveDate) -> Vec<DailyPoint> {
    fill_with(timeline, start, end, GapPolicy::Skip)
}

/// Fill `[start, end]` with an explicit policy for leading days.
///
/// An empty timeline or a reversed range yields an empty series.
pub fn fill_with(
    timeline: &Timeline,
    start: NaiveDate,
    end: NaiveDate,
    policy: GapPolicy,
) -> Vec<DailyPoint> {
    if timeline.is_empty() || end < start {
        return Vec::new();
    }

    let days = (end - start).num_days() as usize + 1;
    let mut series = Vec::with_capacity(days);

    let mut day = start;
    loop {
        if let Some(point) = resolve_day(timeline, day, policy) {
            series.push(point);
        }
        match day.succ_opt() {
            Some(next) if next <= end => day = next,
            _ => break,
        }
    }

    series
}

fn resolve_day(timeline: &Timeline, day: NaiveDate, policy: GapPolicy) -> Option<DailyPoint> {
    if let Some(known) = timeline.get(day) {
        return Some(DailyPoint {
            date: day,
            rate: Some(known.rate),
            provenance: Provenance::Actual,
            source: known.source.clone(),
        });
    }

    match timeline.bracket(day) {
        (Some(prev), Some(next)) => Some(DailyPoint {
            date: day,
            rate: Some(blend(prev, next, day)),
            provenance: Provenance::Interpolated,
            source: INTERPOLATED_SOURCE.to_string(),
        }),
        (Some(prev), None) => Some(DailyPoint {
            date: day,
            rate: Some(prev.rate),
            provenance: Provenance::Extrapolated,
            source: prev.source.clone(),
        }),
        (None, Some(_)) => match policy {
            GapPolicy::Skip => None,
            GapPolicy::Mark => Some(DailyPoint {
                date: day,
                rate: None,
                provenance: Provenance::Gap,
                source: String::new(),
            }),
        },
        (None, None) => None,
    }
}

/// Linear blend between two observations at `day`, rounded to cents.
///
/// The result is clamped to the bracketing rates so rounding never
/// overshoots them.
fn blend(prev: &Observation, next: &Observation, day: NaiveDate) -> f64 {
    let span = (next.date - prev.date).num_days() as f64;
    let t = (day - prev.date).num_days() as f64 / span;
    let raw = prev.rate + (next.rate - prev.rate) * t;

    let (lo, hi) = if prev.rate <= next.rate {
        (prev.rate, next.rate)
    } else {
        (next.rate, prev.rate)
    };
    round_cents(raw).clamp(lo, hi)
}

/// Round to 2 decimal places, ties to even on the exact binary value
pub fn round_cents(value: f64) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|exact| exact.round_dp(2))
        .and_then(|rounded| rounded.to_f64())
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::merge;
    use crate::types::TrustTier;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn timeline(points: &[(NaiveDate, f64)]) -> Timeline {
        merge(points.iter().map(|&(date, rate)| Observation {
            date,
            rate,
            source: "parallel".to_string(),
            trust: TrustTier::Curated,
        }))
    }

    #[test]
    fn fills_between_two_points() {
        let tl = timeline(&[(d(2020, 1, 1), 362.0), (d(2020, 6, 1), 450.0)]);
        let series = fill(&tl, d(2020, 1, 1), d(2020, 3, 1));

        assert_eq!(series.len(), 61);
        assert_eq!(series[0].rate, Some(362.0));
        assert_eq!(series[0].provenance, Provenance::Actual);
        assert_eq!(series[0].source, "parallel");

        let feb15 = series.iter().find(|p| p.date == d(2020, 2, 15)).unwrap();
        assert_eq!(feb15.provenance, Provenance::Interpolated);
        assert_eq!(feb15.source, INTERPOLATED_SOURCE);
        let expected = 362.0 + (450.0 - 362.0) * (45.0 / 152.0);
        assert!((feb15.rate.unwrap() - expected).abs() <= 0.005 + 1e-9);
        assert_eq!(feb15.rate, Some(388.05));
    }

    #[test]
    fn series_is_contiguous() {
        let tl = timeline(&[(d(2020, 1, 1), 362.0), (d(2020, 6, 1), 450.0)]);
        let series = fill(&tl, d(2020, 1, 1), d(2020, 12, 31));

        assert_eq!(series.len(), 366);
        for pair in series.windows(2) {
            assert_eq!(pair[0].date.succ_opt().unwrap(), pair[1].date);
        }
    }

    #[test]
    fn single_known_day_range() {
        let tl = timeline(&[(d(2020, 1, 1), 362.0), (d(2020, 6, 1), 450.0)]);
        let series = fill(&tl, d(2020, 6, 1), d(2020, 6, 1));

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].rate, Some(450.0));
        assert_eq!(series[0].provenance, Provenance::Actual);
    }

    #[test]
    fn interpolation_never_overshoots() {
        let tl = timeline(&[
            (d(2023, 11, 1), 1180.0),
            (d(2023, 12, 1), 1150.0),
            (d(2024, 1, 1), 1350.0),
        ]);

        for point in fill(&tl, d(2023, 11, 1), d(2024, 1, 1)) {
            let rate = point.rate.unwrap();
            if point.date < d(2023, 12, 1) {
                assert!((1150.0..=1180.0).contains(&rate), "{:?}", point);
            } else {
                assert!((1150.0..=1350.0).contains(&rate), "{:?}", point);
            }
        }
    }

    #[test]
    fn rounding_stays_inside_bracket() {
        let tl = timeline(&[(d(2020, 1, 1), 100.004), (d(2020, 1, 3), 100.006)]);
        let series = fill(&tl, d(2020, 1, 2), d(2020, 1, 2));

        let rate = series[0].rate.unwrap();
        assert!((100.004..=100.006).contains(&rate));
    }

    #[test]
    fn carries_last_rate_forward() {
        let tl = timeline(&[(d(2024, 2, 1), 1550.0), (d(2024, 3, 1), 1600.0)]);
        let series = fill(&tl, d(2024, 3, 1), d(2024, 3, 31));

        assert_eq!(series.len(), 31);
        assert_eq!(series[0].provenance, Provenance::Actual);
        for point in &series[1..] {
            assert_eq!(point.provenance, Provenance::Extrapolated);
            assert_eq!(point.rate, Some(1600.0));
            assert_eq!(point.source, "parallel");
        }
    }

    #[test]
    fn extrapolated_rate_is_not_rounded() {
        let tl = timeline(&[(d(2024, 1, 1), 1234.5678)]);
        let series = fill(&tl, d(2024, 1, 1), d(2024, 1, 3));

        assert_eq!(series[2].rate, Some(1234.5678));
    }

    #[test]
    fn skip_policy_drops_leading_days() {
        let tl = timeline(&[(d(2020, 1, 10), 362.0), (d(2020, 1, 20), 372.0)]);
        let series = fill(&tl, d(2020, 1, 1), d(2020, 1, 20));

        assert_eq!(series.len(), 11);
        assert_eq!(series[0].date, d(2020, 1, 10));
    }

    #[test]
    fn mark_policy_covers_every_day() {
        let tl = timeline(&[(d(2020, 1, 10), 362.0), (d(2020, 1, 20), 372.0)]);
        let series = fill_with(&tl, d(2020, 1, 1), d(2020, 1, 25), GapPolicy::Mark);

        assert_eq!(series.len(), 25);
        assert!(series[..9].iter().all(|p| p.is_gap() && p.rate.is_none()));
        assert_eq!(series[9].provenance, Provenance::Actual);
        assert_eq!(series[14].rate, Some(367.0));
        assert!(series[20..]
            .iter()
            .all(|p| p.provenance == Provenance::Extrapolated));
    }

    #[test]
    fn single_point_timeline_extrapolates() {
        let tl = timeline(&[(d(2020, 1, 1), 362.0)]);
        let series = fill(&tl, d(2020, 1, 1), d(2020, 1, 5));

        assert_eq!(series.len(), 5);
        assert!(series[1..].iter().all(|p| p.rate == Some(362.0)));
    }

    #[test]
    fn empty_timeline_yields_nothing() {
        let tl = timeline(&[]);
        assert!(fill_with(&tl, d(2020, 1, 1), d(2020, 12, 31), GapPolicy::Mark).is_empty());
    }

    #[test]
    fn reversed_range_yields_nothing() {
        let tl = timeline(&[(d(2020, 1, 1), 362.0)]);
        assert!(fill(&tl, d(2020, 2, 1), d(2020, 1, 1)).is_empty());
    }

    #[test]
    fn range_ending_on_last_representable_day() {
        let last = NaiveDate::MAX;
        let before = last.pred_opt().unwrap();
        let tl = timeline(&[(before, 1600.0)]);

        let series = fill(&tl, before, last);

        assert_eq!(series.len(), 2);
        assert_eq!(series[1].date, last);
        assert_eq!(series[1].provenance, Provenance::Extrapolated);
    }

    #[test]
    fn fill_is_deterministic() {
        let tl = timeline(&[
            (d(2020, 1, 1), 362.0),
            (d(2020, 3, 1), 380.0),
            (d(2020, 6, 1), 450.0),
        ]);
        let a = fill(&tl, d(2019, 12, 1), d(2020, 7, 1));
        let b = fill(&tl, d(2019, 12, 1), d(2020, 7, 1));
        assert_eq!(a, b);
    }

    #[test]
    fn round_cents_matches_decimal_rounding() {
        assert_eq!(round_cents(388.052631), 388.05);
        assert_eq!(round_cents(1.005), 1.0);
        assert_eq!(round_cents(2.675), 2.67);
        assert_eq!(round_cents(0.125), 0.12);
        assert_eq!(round_cents(0.375), 0.38);
        assert_eq!(round_cents(1575.0), 1575.0);
    }

    #[test]
    fn gap_policy_parses() {
        assert_eq!("skip".parse::<GapPolicy>().unwrap(), GapPolicy::Skip);
        assert_eq!("MARK".parse::<GapPolicy>().unwrap(), GapPolicy::Mark);
        assert!("backfill".parse::<GapPolicy>().is_err());
    }

    #[test]
    fn gap_policy_deserializes_like_it_parses() {
        for raw in ["skip", "mark", "gap", "MARK"] {
            let parsed: GapPolicy = raw.parse().unwrap();
            let deserialized: GapPolicy =
                serde_json::from_value(serde_json::Value::String(raw.to_string())).unwrap();
            assert_eq!(parsed, deserialized);
        }
        assert!(serde_json::from_str::<GapPolicy>("\"backfill\"").is_err());
    }
}

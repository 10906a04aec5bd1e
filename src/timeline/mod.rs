//! Timeline module - Multi-source merge and daily gap filling
//!
//! Merges observations from every source into one date-ordered timeline
//! and expands it into a dense daily series.

mod interpolate;
mod summary;

pub use interpolate::{fill, fill_with, round_cents, GapPolicy, INTERPOLATED_SOURCE};
pub use summary::SeriesSummary;

use chrono::NaiveDate;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::types::Observation;

/// Date-ordered set of resolved observations.
///
/// Dates are strictly increasing and unique. Only built through [`merge`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    points: Vec<Observation>,
}

impl Timeline {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.points.iter()
    }

    pub fn first(&self) -> Option<&Observation> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.points.last()
    }

    /// Observation recorded exactly on `date`
    pub fn get(&self, date: NaiveDate) -> Option<&Observation> {
        self.points
            .binary_search_by_key(&date, |obs| obs.date)
            .ok()
            .map(|idx| &self.points[idx])
    }

    /// Nearest observations strictly before and strictly after `date`
    pub fn bracket(&self, date: NaiveDate) -> (Option<&Observation>, Option<&Observation>) {
        let before = self.points.partition_point(|obs| obs.date < date);
        let after = self.points.partition_point(|obs| obs.date <= date);
        let prev = before.checked_sub(1).map(|idx| &self.points[idx]);
        (prev, self.points.get(after))
    }
}

impl FromIterator<Observation> for Timeline {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        merge(iter)
    }
}

/// Resolve raw observations into a timeline.
///
/// Invalid rates are dropped. On a shared date the higher trust tier wins;
/// equal tiers resolve to the observation seen last.
pub fn merge<I>(observations: I) -> Timeline
where
    I: IntoIterator<Item = Observation>,
{
    let mut resolved: BTreeMap<NaiveDate, Observation> = BTreeMap::new();

    for obs in observations {
        if !obs.is_valid() {
            continue;
        }
        match resolved.entry(obs.date) {
            Entry::Vacant(slot) => {
                slot.insert(obs);
            }
            Entry::Occupied(mut slot) => {
                if obs.trust >= slot.get().trust {
                    slot.insert(obs);
                }
            }
        }
    }

    Timeline {
        points: resolved.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrustTier;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn obs(date: NaiveDate, rate: f64, source: &str, trust: TrustTier) -> Observation {
        Observation {
            date,
            rate,
            source: source.to_string(),
            trust,
        }
    }

    #[test]
    fn merge_sorts_distinct_dates() {
        let timeline = merge(vec![
            obs(d(2021, 1, 1), 475.0, "a", TrustTier::Market),
            obs(d(2020, 1, 1), 362.0, "b", TrustTier::Market),
            obs(d(2020, 6, 1), 450.0, "c", TrustTier::Official),
        ]);

        let dates: Vec<_> = timeline.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2020, 1, 1), d(2020, 6, 1), d(2021, 1, 1)]);
    }

    #[test]
    fn merge_keeps_higher_trust_regardless_of_order() {
        let official = obs(d(2020, 1, 1), 306.9, "World Bank", TrustTier::Official);
        let curated = obs(d(2020, 1, 1), 362.0, "parallel", TrustTier::Curated);

        let forward = merge(vec![official.clone(), curated.clone()]);
        let backward = merge(vec![curated, official]);

        assert_eq!(forward.len(), 1);
        assert_eq!(forward.get(d(2020, 1, 1)).unwrap().rate, 362.0);
        assert_eq!(forward, backward);
    }

    #[test]
    fn merge_equal_trust_is_last_wins() {
        let timeline = merge(vec![
            obs(d(2024, 1, 8), 1400.0, "first", TrustTier::Market),
            obs(d(2024, 1, 8), 1410.0, "second", TrustTier::Market),
        ]);

        let kept = timeline.get(d(2024, 1, 8)).unwrap();
        assert_eq!(kept.source, "second");
        assert_eq!(kept.rate, 1410.0);
    }

    #[test]
    fn merge_drops_invalid_rates() {
        let timeline = merge(vec![
            obs(d(2020, 1, 1), 0.0, "zero", TrustTier::Curated),
            obs(d(2020, 1, 2), -1.0, "negative", TrustTier::Curated),
            obs(d(2020, 1, 3), f64::NAN, "nan", TrustTier::Curated),
            obs(d(2020, 1, 4), 364.0, "ok", TrustTier::Market),
        ]);

        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.first().unwrap().source, "ok");
    }

    #[test]
    fn invalid_higher_tier_does_not_evict_valid_lower_tier() {
        let timeline = merge(vec![
            obs(d(2020, 1, 1), 306.9, "World Bank", TrustTier::Official),
            obs(d(2020, 1, 1), 0.0, "parallel", TrustTier::Curated),
        ]);

        assert_eq!(timeline.get(d(2020, 1, 1)).unwrap().source, "World Bank");
    }

    #[test]
    fn bracket_excludes_exact_match() {
        let timeline: Timeline = vec![
            obs(d(2020, 1, 1), 362.0, "a", TrustTier::Curated),
            obs(d(2020, 3, 1), 380.0, "b", TrustTier::Curated),
            obs(d(2020, 6, 1), 450.0, "c", TrustTier::Curated),
        ]
        .into_iter()
        .collect();

        let (prev, next) = timeline.bracket(d(2020, 3, 1));
        assert_eq!(prev.unwrap().date, d(2020, 1, 1));
        assert_eq!(next.unwrap().date, d(2020, 6, 1));

        let (prev, next) = timeline.bracket(d(2019, 12, 31));
        assert!(prev.is_none());
        assert_eq!(next.unwrap().date, d(2020, 1, 1));

        let (prev, next) = timeline.bracket(d(2020, 7, 1));
        assert_eq!(prev.unwrap().date, d(2020, 6, 1));
        assert!(next.is_none());
    }

    #[test]
    fn empty_timeline() {
        let timeline = merge(Vec::new());
        assert!(timeline.is_empty());
        assert_eq!(timeline.bracket(d(2020, 1, 1)), (None, None));
    }
}

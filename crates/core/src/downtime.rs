//! Downtime aggregator: per-tag intervals during which at least one open
//! action referenced the equipment.

use std::collections::{BTreeMap, BTreeSet};

use time::Date;

use crate::config::DowntimeConfig;
use crate::model::{ActionKey, ConsistentRecord, DowntimeInterval};

/// Keys holding a tag down, per day.
type DownDays<'a> = BTreeMap<Date, BTreeSet<&'a ActionKey>>;

/// Merges the down days of every tag into non-overlapping intervals,
/// ordered by tag, then start day.
pub fn aggregate_downtime(
    consistent: &[ConsistentRecord],
    config: &DowntimeConfig,
) -> Vec<DowntimeInterval> {
    let mut by_tag: BTreeMap<&str, DownDays<'_>> = BTreeMap::new();
    for row in consistent {
        let Some(tag) = row.meta.tag() else {
            continue;
        };
        if !config.counts(row.status) {
            continue;
        }
        if config.require_unavailable_flag && !row.meta.unavailable {
            continue;
        }
        by_tag
            .entry(tag)
            .or_default()
            .entry(row.day)
            .or_default()
            .insert(&row.action_key);
    }

    let tags: Vec<(&str, DownDays<'_>)> = by_tag.into_iter().collect();
    let tolerance = i64::from(config.gap_tolerance_days);

    #[cfg(feature = "parallel")]
    let per_tag: Vec<Vec<DowntimeInterval>> = {
        use rayon::prelude::*;
        tags.par_iter()
            .map(|(tag, days)| merge_days(tag, days, tolerance))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let per_tag: Vec<Vec<DowntimeInterval>> = tags
        .iter()
        .map(|(tag, days)| merge_days(tag, days, tolerance))
        .collect();

    let intervals: Vec<DowntimeInterval> = per_tag.into_iter().flatten().collect();
    tracing::debug!(
        tags = tags.len(),
        intervals = intervals.len(),
        "aggregated equipment downtime"
    );
    intervals
}

struct Open<'a> {
    start: Date,
    end: Date,
    keys: BTreeSet<&'a ActionKey>,
}

impl Open<'_> {
    fn close(self, tag: &str) -> DowntimeInterval {
        DowntimeInterval {
            tag: tag.to_string(),
            start_day: self.start,
            end_day: self.end,
            duration_days: (self.end - self.start).whole_days() + 1,
            action_count: u32::try_from(self.keys.len()).unwrap_or(u32::MAX),
        }
    }
}

fn merge_days(tag: &str, days: &DownDays<'_>, tolerance: i64) -> Vec<DowntimeInterval> {
    let mut intervals = Vec::new();
    let mut current: Option<Open<'_>> = None;

    for (&day, keys) in days {
        match current.as_mut() {
            Some(open) if (day - open.end).whole_days() <= tolerance + 1 => {
                open.end = day;
                open.keys.extend(keys.iter().copied());
            }
            _ => {
                if let Some(done) = current.take() {
                    intervals.push(done.close(tag));
                }
                current = Some(Open {
                    start: day,
                    end: day,
                    keys: keys.clone(),
                });
            }
        }
    }
    if let Some(done) = current {
        intervals.push(done.close(tag));
    }
    intervals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionMeta, Status};

    fn day(n: u8) -> Date {
        Date::from_calendar_date(2024, time::Month::May, n).unwrap()
    }

    fn row(key: &str, tag: Option<&str>, d: u8, status: Status) -> ConsistentRecord {
        ConsistentRecord {
            action_key: ActionKey::from(key),
            day: day(d),
            status,
            filled: false,
            reopened: false,
            meta: ActionMeta {
                tag: tag.map(str::to_string),
                ..ActionMeta::default()
            },
        }
    }

    fn spans(intervals: &[DowntimeInterval]) -> Vec<(String, u8, u8, i64)> {
        intervals
            .iter()
            .map(|i| (i.tag.clone(), i.start_day.day(), i.end_day.day(), i.duration_days))
            .collect()
    }

    #[test]
    fn gap_splits_intervals() {
        let rows: Vec<_> = [1, 2, 3, 5, 6]
            .into_iter()
            .map(|d| row("A", Some("T1"), d, Status::Running))
            .collect();
        let out = aggregate_downtime(&rows, &DowntimeConfig::default());
        assert_eq!(
            spans(&out),
            vec![("T1".to_string(), 1, 3, 3), ("T1".to_string(), 5, 6, 2)]
        );
    }

    #[test]
    fn tolerance_bridges_short_gaps() {
        let rows: Vec<_> = [1, 2, 3, 5, 6]
            .into_iter()
            .map(|d| row("A", Some("T1"), d, Status::Running))
            .collect();
        let config = DowntimeConfig {
            gap_tolerance_days: 1,
            ..DowntimeConfig::default()
        };
        let out = aggregate_downtime(&rows, &config);
        assert_eq!(spans(&out), vec![("T1".to_string(), 1, 6, 6)]);
    }

    #[test]
    fn simultaneous_actions_share_one_interval() {
        let rows = vec![
            row("A", Some("T1"), 1, Status::Running),
            row("A", Some("T1"), 2, Status::Running),
            row("B", Some("T1"), 2, Status::Postponed),
            row("B", Some("T1"), 3, Status::Postponed),
        ];
        let out = aggregate_downtime(&rows, &DowntimeConfig::default());
        assert_eq!(spans(&out), vec![("T1".to_string(), 1, 3, 3)]);
        assert_eq!(out[0].action_count, 2);
    }

    #[test]
    fn ended_and_untagged_rows_do_not_count() {
        let rows = vec![
            row("A", Some("T1"), 1, Status::Ended),
            row("B", None, 1, Status::Running),
            row("C", Some("  "), 1, Status::Running),
        ];
        assert!(aggregate_downtime(&rows, &DowntimeConfig::default()).is_empty());
    }

    #[test]
    fn unavailable_flag_can_be_required() {
        let mut flagged = row("A", Some("T1"), 1, Status::Running);
        flagged.meta.unavailable = true;
        let rows = vec![flagged, row("B", Some("T2"), 1, Status::Running)];
        let config = DowntimeConfig {
            require_unavailable_flag: true,
            ..DowntimeConfig::default()
        };
        let out = aggregate_downtime(&rows, &config);
        assert_eq!(spans(&out), vec![("T1".to_string(), 1, 1, 1)]);
    }

    #[test]
    fn tags_are_ordered_and_independent() {
        let rows = vec![
            row("A", Some("T2"), 1, Status::Running),
            row("B", Some("T1"), 4, Status::Running),
        ];
        let out = aggregate_downtime(&rows, &DowntimeConfig::default());
        assert_eq!(
            spans(&out),
            vec![("T1".to_string(), 4, 4, 1), ("T2".to_string(), 1, 1, 1)]
        );
    }
}

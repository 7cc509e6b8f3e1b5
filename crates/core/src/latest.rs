//! Latest-snapshot projector and the status partitions built on it.

use std::collections::BTreeMap;

use crate::model::{ActionKey, ConsistentRecord, LatestRecord, Status};

/// One row per action key: the consistent row with the greatest day, plus
/// the first day of the lifespan. Ordered by key.
pub fn project_latest(consistent: &[ConsistentRecord]) -> Vec<LatestRecord> {
    let mut spans: BTreeMap<&ActionKey, (&ConsistentRecord, &ConsistentRecord)> = BTreeMap::new();
    for row in consistent {
        spans
            .entry(&row.action_key)
            .and_modify(|(first, last)| {
                if row.day < first.day {
                    *first = row;
                }
                if row.day > last.day {
                    *last = row;
                }
            })
            .or_insert((row, row));
    }

    spans
        .into_values()
        .map(|(first, last)| LatestRecord {
            action_key: last.action_key.clone(),
            first_day: first.day,
            last_day: last.day,
            status: last.status,
            meta: last.meta.clone(),
        })
        .collect()
}

/// Latest rows whose status is `status`.
pub fn partition(latest: &[LatestRecord], status: Status) -> Vec<LatestRecord> {
    latest
        .iter()
        .filter(|r| r.status == status)
        .cloned()
        .collect()
}

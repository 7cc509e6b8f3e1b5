//! Status reconciler: `actions_daily` → `actions_consistent`.
//!
//! Each action key is reconciled on its own:
//!
//! 1. Same-day rows collapse to one: the most advanced status wins
//!    (`ENDED > POSTPONED > RUNNING`), and among rows of that status the
//!    last one in sheet order supplies the metadata.
//! 2. The lifespan runs from the first observed day to the last one, and on
//!    to the end of the load when the last known status is still open.
//! 3. Days of the lifespan without a raw row carry the previous day's
//!    status and metadata forward.
//!
//! Raw data always wins over inference. A raw row that moves an action out
//! of `ENDED` is kept and flagged `reopened`; when the action had also been
//! absent for at least one observed day in between, an [`InconsistentKey`]
//! is recorded and logged.

use std::collections::BTreeMap;

use time::Date;

use crate::config::{DayGrid, RollupConfig};
use crate::model::{ActionKey, ActionMeta, ConsistentRecord, DailyRecord, InconsistentKey, Status};
use crate::store::SnapshotStore;

/// Output of [`reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Ordered by action key, then day.
    pub records: Vec<ConsistentRecord>,
    pub diagnostics: Vec<InconsistentKey>,
}

/// Load-wide facts every key needs.
struct Grid<'a> {
    observed: &'a [Date],
    range_end: Option<Date>,
    mode: DayGrid,
}

impl Grid<'_> {
    fn days(&self, start: Date, end: Date) -> Vec<Date> {
        match self.mode {
            DayGrid::Calendar => {
                let mut days = Vec::new();
                let mut day = start;
                loop {
                    days.push(day);
                    if day >= end {
                        break;
                    }
                    match day.next_day() {
                        Some(next) => day = next,
                        None => break,
                    }
                }
                days
            }
            DayGrid::Observed => self
                .observed
                .iter()
                .copied()
                .filter(|d| *d >= start && *d <= end)
                .collect(),
        }
    }

    /// Whether the load has a sheet strictly between `after` and `before`.
    fn observed_between(&self, after: Date, before: Date) -> bool {
        let from = self.observed.partition_point(|d| *d <= after);
        self.observed
            .get(from)
            .map(|d| *d < before)
            .unwrap_or(false)
    }
}

/// Reconciles every action key in the store.
pub fn reconcile(store: &SnapshotStore, config: &RollupConfig) -> Reconciled {
    let grid = Grid {
        observed: store.observed_days(),
        range_end: store.last_day(),
        mode: config.day_grid,
    };
    let groups: Vec<(&ActionKey, Vec<&DailyRecord>)> = store.by_key().into_iter().collect();

    #[cfg(feature = "parallel")]
    let per_key: Vec<Reconciled> = {
        use rayon::prelude::*;
        groups
            .par_iter()
            .map(|(key, rows)| reconcile_key(key, rows, &grid))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let per_key: Vec<Reconciled> = groups
        .iter()
        .map(|(key, rows)| reconcile_key(key, rows, &grid))
        .collect();

    let mut out = Reconciled::default();
    for part in per_key {
        out.records.extend(part.records);
        out.diagnostics.extend(part.diagnostics);
    }
    tracing::debug!(
        keys = groups.len(),
        rows = out.records.len(),
        inconsistent = out.diagnostics.len(),
        "reconciled daily records"
    );
    out
}

/// Collapses same-day rows of one key. Input is in sheet order.
fn resolve_days<'a>(rows: &[&'a DailyRecord]) -> BTreeMap<Date, &'a DailyRecord> {
    let mut by_day: BTreeMap<Date, &DailyRecord> = BTreeMap::new();
    for &row in rows {
        by_day
            .entry(row.day)
            .and_modify(|current| {
                if row.status >= current.status {
                    *current = row;
                }
            })
            .or_insert(row);
    }
    by_day
}

fn reconcile_key(key: &ActionKey, rows: &[&DailyRecord], grid: &Grid<'_>) -> Reconciled {
    let resolved = resolve_days(rows);
    let (Some((&start, _)), Some((&last_seen, last_row))) =
        (resolved.first_key_value(), resolved.last_key_value())
    else {
        return Reconciled::default();
    };

    let end = match (last_row.status, grid.range_end) {
        (Status::Ended, _) => last_seen,
        (_, Some(range_end)) if range_end > last_seen => range_end,
        _ => last_seen,
    };

    let mut out = Reconciled::default();
    let mut carried: Option<(Status, &ActionMeta)> = None;
    let mut last_raw_day = start;

    for day in grid.days(start, end) {
        let record = match resolved.get(&day) {
            Some(raw) => {
                let prev = carried.map(|(status, _)| status);
                let reopened = prev == Some(Status::Ended) && raw.status.is_open();
                if reopened && grid.observed_between(last_raw_day, day) {
                    tracing::warn!(
                        action_key = %key,
                        ended_on = %last_raw_day,
                        reopened_on = %day,
                        "action reopened after disappearing; keeping one lifespan"
                    );
                    out.diagnostics.push(InconsistentKey {
                        action_key: key.clone(),
                        ended_on: last_raw_day,
                        reopened_on: day,
                    });
                }
                carried = Some((raw.status, &raw.meta));
                last_raw_day = day;
                ConsistentRecord {
                    action_key: key.clone(),
                    day,
                    status: raw.status,
                    filled: false,
                    reopened,
                    meta: raw.meta.clone(),
                }
            }
            None => {
                // The first grid day is always a raw day, so `carried` is set.
                let Some((status, meta)) = carried else {
                    continue;
                };
                ConsistentRecord {
                    action_key: key.clone(),
                    day,
                    status,
                    filled: true,
                    reopened: false,
                    meta: meta.clone(),
                }
            }
        };
        out.records.push(record);
    }
    out
}

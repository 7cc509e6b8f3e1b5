//! Snapshot store: the validated `actions_daily` table of one load.
//!
//! The builder is append-only. `build()` validates every raw row at once
//! and either returns an immutable store or a `MalformedInput` error naming
//! every rejected row; a partially valid store is never produced.

use std::collections::{BTreeMap, BTreeSet};

use time::Date;

use crate::error::{MalformedReason, MalformedRow, RollupError};
use crate::model::{ActionKey, DailyRecord, RawDailyRow, Status};

enum Pending {
    Raw(RawDailyRow),
    Valid(DailyRecord),
}

/// Accumulates the rows of one load in sheet order.
#[derive(Default)]
pub struct SnapshotStoreBuilder {
    rows: Vec<Pending>,
    observed: BTreeSet<Date>,
}

impl SnapshotStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a day whose sheet was loaded, even if it held no rows.
    pub fn observe_day(&mut self, day: Date) -> &mut Self {
        self.observed.insert(day);
        self
    }

    /// Appends an unvalidated row.
    pub fn push(&mut self, row: RawDailyRow) -> &mut Self {
        if let Some(day) = row.day {
            self.observed.insert(day);
        }
        self.rows.push(Pending::Raw(row));
        self
    }

    /// Appends a row that is already well-formed. Blank text fields are
    /// stored as absent.
    pub fn push_record(&mut self, record: DailyRecord) -> &mut Self {
        self.observed.insert(record.day);
        self.rows.push(Pending::Valid(DailyRecord {
            meta: record.meta.normalized(),
            ..record
        }));
        self
    }

    pub fn extend_records(&mut self, records: impl IntoIterator<Item = DailyRecord>) -> &mut Self {
        for record in records {
            self.push_record(record);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Validates every row and freezes the store.
    pub fn build(self) -> Result<SnapshotStore, RollupError> {
        let mut records = Vec::with_capacity(self.rows.len());
        let mut malformed = Vec::new();

        for (index, pending) in self.rows.into_iter().enumerate() {
            match pending {
                Pending::Valid(record) => records.push(record),
                Pending::Raw(raw) => match validate(raw) {
                    Ok(record) => records.push(record),
                    Err((raw, reason)) => malformed.push(MalformedRow {
                        index,
                        sheet: raw.meta.sheet,
                        action_key: raw.action_key,
                        reason,
                    }),
                },
            }
        }

        if !malformed.is_empty() {
            return Err(RollupError::MalformedInput { rows: malformed });
        }

        Ok(SnapshotStore {
            records,
            observed_days: self.observed.into_iter().collect(),
        })
    }
}

fn validate(raw: RawDailyRow) -> Result<DailyRecord, (RawDailyRow, MalformedReason)> {
    let key = match raw.action_key.as_deref().map(str::trim) {
        Some(k) if !k.is_empty() => ActionKey::new(k),
        _ => return Err((raw, MalformedReason::MissingActionKey)),
    };
    let Some(day) = raw.day else {
        return Err((raw, MalformedReason::MissingDay));
    };
    let status = match raw.status.as_deref().map(str::trim) {
        None | Some("") => return Err((raw, MalformedReason::MissingStatus)),
        Some(s) => match s.parse::<Status>() {
            Ok(status) => status,
            Err(_) => {
                let reason = MalformedReason::UnknownStatus(s.to_string());
                return Err((raw, reason));
            }
        },
    };
    Ok(DailyRecord {
        action_key: key,
        day,
        status,
        meta: raw.meta.normalized(),
    })
}

/// Immutable `actions_daily` table plus the set of days present in the load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotStore {
    records: Vec<DailyRecord>,
    observed_days: Vec<Date>,
}

impl SnapshotStore {
    /// Builds a store from records that are already validated. Blank text
    /// fields are stored as absent.
    pub fn from_records(records: Vec<DailyRecord>) -> Self {
        let records: Vec<DailyRecord> = records
            .into_iter()
            .map(|r| DailyRecord {
                meta: r.meta.normalized(),
                ..r
            })
            .collect();
        let observed_days = records
            .iter()
            .map(|r| r.day)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        SnapshotStore {
            records,
            observed_days,
        }
    }

    /// Rows in load (sheet) order.
    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    /// Sorted, deduplicated days present in the load.
    pub fn observed_days(&self) -> &[Date] {
        &self.observed_days
    }

    pub fn first_day(&self) -> Option<Date> {
        self.observed_days.first().copied()
    }

    pub fn last_day(&self) -> Option<Date> {
        self.observed_days.last().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows grouped per action key. Keys ascend; rows within a key keep
    /// sheet order.
    pub fn by_key(&self) -> BTreeMap<&ActionKey, Vec<&DailyRecord>> {
        let mut groups: BTreeMap<&ActionKey, Vec<&DailyRecord>> = BTreeMap::new();
        for record in &self.records {
            groups.entry(&record.action_key).or_default().push(record);
        }
        groups
    }
}

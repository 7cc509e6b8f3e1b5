//! Row types for every rollup view.
//!
//! `DailyRecord` is the only input; every other type here is derived from
//! it by the reconciler and the stages downstream of it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

// ──────────────────────────────────────────────
// Identity and status
// ──────────────────────────────────────────────

/// Stable identifier of one action across daily sheets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionKey(String);

impl ActionKey {
    pub fn new(key: impl Into<String>) -> Self {
        ActionKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionKey {
    fn from(value: &str) -> Self {
        ActionKey(value.to_string())
    }
}

/// Lifecycle phase of an action on a given day.
///
/// Variants are declared in lifecycle order, so the derived `Ord` is the
/// same-day resolution priority: `Ended > Postponed > Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Running,
    Postponed,
    Ended,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Running, Status::Postponed, Status::Ended];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Running => "RUNNING",
            Status::Postponed => "POSTPONED",
            Status::Ended => "ENDED",
        }
    }

    /// Whether the action is still open against its equipment.
    pub fn is_open(self) -> bool {
        !matches!(self, Status::Ended)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is outside the fixed category set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}' (expected RUNNING, POSTPONED or ENDED)")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RUNNING" => Ok(Status::Running),
            "POSTPONED" => Ok(Status::Postponed),
            "ENDED" => Ok(Status::Ended),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

// ──────────────────────────────────────────────
// Metadata
// ──────────────────────────────────────────────

/// Non-status columns carried by every action row.
///
/// Text fields are `None` when the sheet cell was empty; use
/// [`ActionMeta::text`] to build them so that empty strings never leak in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMeta {
    /// Trade / business unit.
    #[serde(default)]
    pub metier: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    /// Well number.
    #[serde(default)]
    pub well: Option<String>,
    /// Equipment tag.
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub sub_equipment: Option<String>,
    /// Work performed and comments.
    #[serde(default)]
    pub free_text: Option<String>,
    /// The sheet marked the equipment as unavailable.
    #[serde(default)]
    pub unavailable: bool,
    /// Name of the sheet the row was read from.
    #[serde(default)]
    pub sheet: Option<String>,
}

impl ActionMeta {
    /// Normalizes an optional cell value: trimmed, and `None` when blank.
    pub fn text(value: Option<&str>) -> Option<String> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Every text field passed through [`ActionMeta::text`].
    pub fn normalized(self) -> Self {
        let text = |v: Option<String>| ActionMeta::text(v.as_deref());
        ActionMeta {
            metier: text(self.metier),
            zone: text(self.zone),
            platform: text(self.platform),
            well: text(self.well),
            tag: text(self.tag),
            sub_equipment: text(self.sub_equipment),
            free_text: text(self.free_text),
            unavailable: self.unavailable,
            sheet: text(self.sheet),
        }
    }

    /// Equipment tag, if present and non-blank.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref().filter(|t| !t.trim().is_empty())
    }
}

// ──────────────────────────────────────────────
// View rows
// ──────────────────────────────────────────────

/// One observation of an action on one day's sheet (`actions_daily`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub action_key: ActionKey,
    pub day: Date,
    pub status: Status,
    #[serde(flatten)]
    pub meta: ActionMeta,
}

/// A daily row before validation. Every required field may still be
/// missing; [`crate::store::SnapshotStoreBuilder::build`] rejects such rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDailyRow {
    pub action_key: Option<String>,
    pub day: Option<Date>,
    pub status: Option<String>,
    pub meta: ActionMeta,
}

/// Gap-free, consistency-corrected status of an action on one calendar day
/// (`actions_consistent`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistentRecord {
    pub action_key: ActionKey,
    pub day: Date,
    pub status: Status,
    /// No raw row existed for this day; status and metadata were carried
    /// forward from the previous observed day.
    pub filled: bool,
    /// Raw data explicitly moved the action out of `ENDED` on this day.
    pub reopened: bool,
    #[serde(flatten)]
    pub meta: ActionMeta,
}

/// A day on which an action's consistent status changed (`transitions`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub action_key: ActionKey,
    pub day: Date,
    pub from_status: Status,
    pub to_status: Status,
}

/// Most recent consistent row of an action (`actions_latest`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestRecord {
    pub action_key: ActionKey,
    pub first_day: Date,
    pub last_day: Date,
    pub status: Status,
    #[serde(flatten)]
    pub meta: ActionMeta,
}

/// A maximal span of days during which a tag had open actions
/// (`equipment_downtime`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DowntimeInterval {
    pub tag: String,
    pub start_day: Date,
    pub end_day: Date,
    pub duration_days: i64,
    /// Distinct actions that kept the tag down during the interval.
    pub action_count: u32,
}

/// An action that was closed, vanished for at least one observed day and
/// then came back open. Kept as one lifespan; reported for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InconsistentKey {
    pub action_key: ActionKey,
    pub ended_on: Date,
    pub reopened_on: Date,
}

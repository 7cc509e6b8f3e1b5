//! Rollup configuration.
//!
//! Every field has a default, so an empty TOML table (or no file at all)
//! yields the standard behavior:
//!
//! ```toml
//! [rollup]
//! day_grid = "calendar"
//!
//! [downtime]
//! statuses = ["RUNNING", "POSTPONED"]
//! gap_tolerance_days = 0
//! require_unavailable_flag = false
//! ```

use serde::{Deserialize, Serialize};

use crate::model::Status;

/// Which days of a lifespan get a consistent row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayGrid {
    /// Every calendar day between the first and last day of the lifespan.
    #[default]
    Calendar,
    /// Only days that had a sheet in the load.
    Observed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RollupConfig {
    #[serde(default)]
    pub day_grid: DayGrid,
    #[serde(default)]
    pub downtime: DowntimeConfig,
}

/// Which consistent rows count as equipment downtime, and how their days
/// merge into intervals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DowntimeConfig {
    #[serde(default = "default_downtime_statuses")]
    pub statuses: Vec<Status>,
    /// Days without downtime that may separate two down days while still
    /// merging them into one interval.
    #[serde(default)]
    pub gap_tolerance_days: u32,
    /// Only rows whose sheet flagged the equipment as unavailable count.
    #[serde(default)]
    pub require_unavailable_flag: bool,
}

fn default_downtime_statuses() -> Vec<Status> {
    vec![Status::Running, Status::Postponed]
}

impl Default for DowntimeConfig {
    fn default() -> Self {
        DowntimeConfig {
            statuses: default_downtime_statuses(),
            gap_tolerance_days: 0,
            require_unavailable_flag: false,
        }
    }
}

impl DowntimeConfig {
    pub fn counts(&self, status: Status) -> bool {
        self.statuses.contains(&status)
    }
}

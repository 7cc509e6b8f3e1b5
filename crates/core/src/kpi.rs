//! Headline indicators over a view snapshot: status counts, completion
//! rate and where open actions concentrate.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ActionMeta;
use crate::views::RollupViews;

/// Latest-status counts of a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub running: usize,
    pub postponed: usize,
    pub ended: usize,
    /// Percentage of `actions_latest` whose latest status is `ENDED`;
    /// `0.0` when there are no actions.
    pub completion_rate: f64,
}

/// Metadata column open actions are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Metier,
    Zone,
    Platform,
    Tag,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Metier => "metier",
            Dimension::Zone => "zone",
            Dimension::Platform => "platform",
            Dimension::Tag => "tag",
        }
    }

    fn value(self, meta: &ActionMeta) -> Option<&str> {
        let value = match self {
            Dimension::Metier => meta.metier.as_deref(),
            Dimension::Zone => meta.zone.as_deref(),
            Dimension::Platform => meta.platform.as_deref(),
            Dimension::Tag => meta.tag(),
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of open actions sharing one dimension value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenCount {
    pub value: String,
    pub open_actions: usize,
}

impl RollupViews {
    pub fn kpis(&self) -> Kpis {
        let total = self.actions_latest.len();
        let ended = self.ended_actions.len();
        let completion_rate = if total == 0 {
            0.0
        } else {
            ended as f64 / total as f64 * 100.0
        };
        Kpis {
            running: self.running_actions.len(),
            postponed: self.postponed_actions.len(),
            ended,
            completion_rate,
        }
    }

    /// Open actions per `dimension` value, most loaded first; ties sort by
    /// value. Actions without a value are left out. At most `limit` entries
    /// when given.
    pub fn open_by(&self, dimension: Dimension, limit: Option<usize>) -> Vec<OpenCount> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for row in self.actions_latest.iter().filter(|r| r.status.is_open()) {
            if let Some(value) = dimension.value(&row.meta) {
                *counts.entry(value).or_default() += 1;
            }
        }

        let mut out: Vec<OpenCount> = counts
            .into_iter()
            .map(|(value, open_actions)| OpenCount {
                value: value.to_string(),
                open_actions,
            })
            .collect();
        // Stable: BTreeMap order breaks ties.
        out.sort_by(|a, b| b.open_actions.cmp(&a.open_actions));
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        out
    }
}

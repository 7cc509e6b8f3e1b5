//! The rebuild entry point and the published, immutable view snapshot.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::config::RollupConfig;
use crate::downtime::aggregate_downtime;
use crate::error::RollupError;
use crate::latest::{partition, project_latest};
use crate::model::{
    ConsistentRecord, DailyRecord, DowntimeInterval, InconsistentKey, LatestRecord, Status,
    TransitionEvent,
};
use crate::reconcile::reconcile;
use crate::store::{SnapshotStore, SnapshotStoreBuilder};
use crate::transitions::extract_transitions;

/// Names of the published views, as used for exported files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewName {
    ActionsDaily,
    ActionsConsistent,
    ActionsLatest,
    Transitions,
    RunningActions,
    PostponedActions,
    EndedActions,
    EquipmentDowntime,
}

impl ViewName {
    pub const ALL: [ViewName; 8] = [
        ViewName::ActionsDaily,
        ViewName::ActionsConsistent,
        ViewName::ActionsLatest,
        ViewName::Transitions,
        ViewName::RunningActions,
        ViewName::PostponedActions,
        ViewName::EndedActions,
        ViewName::EquipmentDowntime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewName::ActionsDaily => "actions_daily",
            ViewName::ActionsConsistent => "actions_consistent",
            ViewName::ActionsLatest => "actions_latest",
            ViewName::Transitions => "transitions",
            ViewName::RunningActions => "running_actions",
            ViewName::PostponedActions => "postponed_actions",
            ViewName::EndedActions => "ended_actions",
            ViewName::EquipmentDowntime => "equipment_downtime",
        }
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewName::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("unknown view '{}'", s))
    }
}

/// Every derived view of one load. Built wholesale and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollupViews {
    pub observed_days: Vec<Date>,
    pub actions_daily: Vec<DailyRecord>,
    pub actions_consistent: Vec<ConsistentRecord>,
    pub actions_latest: Vec<LatestRecord>,
    pub transitions: Vec<TransitionEvent>,
    pub running_actions: Vec<LatestRecord>,
    pub postponed_actions: Vec<LatestRecord>,
    pub ended_actions: Vec<LatestRecord>,
    pub equipment_downtime: Vec<DowntimeInterval>,
    /// Keys reopened after disappearing; non-fatal.
    pub diagnostics: Vec<InconsistentKey>,
}

impl RollupViews {
    pub fn len(&self, view: ViewName) -> usize {
        match view {
            ViewName::ActionsDaily => self.actions_daily.len(),
            ViewName::ActionsConsistent => self.actions_consistent.len(),
            ViewName::ActionsLatest => self.actions_latest.len(),
            ViewName::Transitions => self.transitions.len(),
            ViewName::RunningActions => self.running_actions.len(),
            ViewName::PostponedActions => self.postponed_actions.len(),
            ViewName::EndedActions => self.ended_actions.len(),
            ViewName::EquipmentDowntime => self.equipment_downtime.len(),
        }
    }

    /// Row count per view.
    pub fn counts(&self) -> BTreeMap<ViewName, usize> {
        ViewName::ALL.into_iter().map(|v| (v, self.len(v))).collect()
    }

    /// First and last day of `actions_daily`, if any row exists.
    pub fn date_bounds(&self) -> Option<(Date, Date)> {
        let min = self.actions_daily.iter().map(|r| r.day).min()?;
        let max = self.actions_daily.iter().map(|r| r.day).max()?;
        Some((min, max))
    }
}

/// Validates `records` and derives every view.
pub fn rebuild(
    records: impl IntoIterator<Item = DailyRecord>,
    config: &RollupConfig,
) -> Result<RollupViews, RollupError> {
    let mut builder = SnapshotStoreBuilder::new();
    builder.extend_records(records);
    Ok(rebuild_store(&builder.build()?, config))
}

/// Derives every view from a built store. Total: never fails.
pub fn rebuild_store(store: &SnapshotStore, config: &RollupConfig) -> RollupViews {
    let span = tracing::info_span!("rebuild", rows = store.len(), days = store.observed_days().len());
    let _guard = span.enter();

    if store.is_empty() {
        tracing::info!("no daily records in load; publishing empty views");
    }

    let reconciled = reconcile(store, config);
    let transitions = extract_transitions(&reconciled.records);
    let actions_latest = project_latest(&reconciled.records);
    let equipment_downtime = aggregate_downtime(&reconciled.records, &config.downtime);

    RollupViews {
        observed_days: store.observed_days().to_vec(),
        actions_daily: store.records().to_vec(),
        running_actions: partition(&actions_latest, Status::Running),
        postponed_actions: partition(&actions_latest, Status::Postponed),
        ended_actions: partition(&actions_latest, Status::Ended),
        actions_consistent: reconciled.records,
        actions_latest,
        transitions,
        equipment_downtime,
        diagnostics: reconciled.diagnostics,
    }
}

/// Holds the currently published views.
///
/// A reload either replaces the snapshot wholesale or, on error, leaves
/// the previous one in place. Readers keep whatever `Arc` they were handed.
#[derive(Debug, Default)]
pub struct Rollup {
    config: RollupConfig,
    current: Option<Arc<RollupViews>>,
}

impl Rollup {
    pub fn new(config: RollupConfig) -> Self {
        Rollup {
            config,
            current: None,
        }
    }

    pub fn config(&self) -> &RollupConfig {
        &self.config
    }

    pub fn current(&self) -> Option<Arc<RollupViews>> {
        self.current.clone()
    }

    pub fn reload(&mut self, builder: SnapshotStoreBuilder) -> Result<Arc<RollupViews>, RollupError> {
        let store = builder.build()?;
        let views = Arc::new(rebuild_store(&store, &self.config));
        self.current = Some(Arc::clone(&views));
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionKey, ActionMeta, RawDailyRow};
    use time::macros::date;

    fn rec(key: &str, day: Date, status: Status) -> DailyRecord {
        DailyRecord {
            action_key: ActionKey::from(key),
            day,
            status,
            meta: ActionMeta::default(),
        }
    }

    #[test]
    fn empty_input_gives_empty_views() {
        let views = rebuild(Vec::new(), &RollupConfig::default()).unwrap();
        assert_eq!(views, RollupViews::default());
        assert_eq!(views.date_bounds(), None);
        assert!(views.counts().values().all(|&n| n == 0));
    }

    #[test]
    fn view_names_round_trip() {
        for view in ViewName::ALL {
            assert_eq!(view.as_str().parse::<ViewName>().unwrap(), view);
        }
        assert!("nope".parse::<ViewName>().is_err());
    }

    #[test]
    fn failed_reload_keeps_previous_views() {
        let mut rollup = Rollup::new(RollupConfig::default());
        let mut good = SnapshotStoreBuilder::new();
        good.push_record(rec("A", date!(2024 - 01 - 01), Status::Running));
        let first = rollup.reload(good).unwrap();

        let mut bad = SnapshotStoreBuilder::new();
        bad.push(RawDailyRow {
            action_key: Some("B".to_string()),
            day: Some(date!(2024 - 01 - 02)),
            status: Some("unknown".to_string()),
            meta: ActionMeta::default(),
        });
        assert!(rollup.reload(bad).is_err());
        let current = rollup.current().unwrap();
        assert!(Arc::ptr_eq(&first, &current));
    }

    #[test]
    fn successful_reload_replaces_views() {
        let mut rollup = Rollup::new(RollupConfig::default());
        let mut one = SnapshotStoreBuilder::new();
        one.push_record(rec("A", date!(2024 - 01 - 01), Status::Running));
        let first = rollup.reload(one).unwrap();

        let mut two = SnapshotStoreBuilder::new();
        two.push_record(rec("B", date!(2024 - 01 - 01), Status::Ended));
        let second = rollup.reload(two).unwrap();

        assert_eq!(first.actions_latest[0].action_key.as_str(), "A");
        assert_eq!(second.actions_latest[0].action_key.as_str(), "B");
        assert!(Arc::ptr_eq(&second, &rollup.current().unwrap()));
    }

    #[test]
    fn date_bounds_span_daily_rows() {
        let views = rebuild(
            vec![
                rec("A", date!(2024 - 01 - 03), Status::Running),
                rec("B", date!(2024 - 01 - 01), Status::Running),
            ],
            &RollupConfig::default(),
        )
        .unwrap();
        assert_eq!(
            views.date_bounds(),
            Some((date!(2024 - 01 - 01), date!(2024 - 01 - 03)))
        );
    }
}

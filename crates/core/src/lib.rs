//! dayroll-core: reconciliation of noisy daily action snapshots.
//!
//! Turns `actions_daily` (one row per action per day it appeared on a
//! sheet) into a gap-free per-day history and the views derived from it.
//!
//! # Public API
//!
//! - [`rebuild()`] / [`rebuild_store()`] -- derive every view from a load
//! - [`Rollup`] -- holds the currently published [`RollupViews`]
//! - [`SnapshotStoreBuilder`] -- validates raw rows into a [`SnapshotStore`]
//! - [`ViewFilter`] -- narrows views by date, metier, zone, platform, tag, text
//! - [`RollupViews::kpis`] / [`RollupViews::open_by`] -- headline indicators
//!
//! The individual stages ([`reconcile()`], [`extract_transitions()`],
//! [`project_latest()`], [`aggregate_downtime()`]) are exported for callers
//! that only need part of the pipeline.

pub mod config;
pub mod downtime;
pub mod error;
pub mod filter;
pub mod kpi;
pub mod latest;
pub mod model;
pub mod reconcile;
pub mod store;
pub mod text;
pub mod transitions;
pub mod views;

// ── Convenience re-exports ───────────────────────────────────────────

pub use config::{DayGrid, DowntimeConfig, RollupConfig};
pub use downtime::aggregate_downtime;
pub use error::{MalformedReason, MalformedRow, RollupError};
pub use filter::{Filterable, ViewFilter};
pub use kpi::{Dimension, Kpis, OpenCount};
pub use latest::{partition, project_latest};
pub use model::{
    ActionKey, ActionMeta, ConsistentRecord, DailyRecord, DowntimeInterval, InconsistentKey,
    LatestRecord, RawDailyRow, Status, TransitionEvent,
};
pub use reconcile::{reconcile, Reconciled};
pub use store::{SnapshotStore, SnapshotStoreBuilder};
pub use transitions::extract_transitions;
pub use views::{rebuild, rebuild_store, Rollup, RollupViews, ViewName};

//! Narrowing published views by date range, entity dimensions and text.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::model::{
    ActionKey, ActionMeta, ConsistentRecord, DailyRecord, DowntimeInterval, LatestRecord, TransitionEvent,
};
use crate::text::fold;
use crate::views::RollupViews;

/// Filter criteria. Unset criteria accept everything.
///
/// Dimension sets (metier, zone, platform, tag) match whole values, case
/// and accents ignored; `text`
/// matches as a substring of the free text, tag, sub-equipment, well or
/// action key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilter {
    #[serde(default)]
    pub from: Option<Date>,
    #[serde(default)]
    pub to: Option<Date>,
    #[serde(default)]
    pub metier: BTreeSet<String>,
    #[serde(default)]
    pub zone: BTreeSet<String>,
    #[serde(default)]
    pub platform: BTreeSet<String>,
    /// Exact equipment tags.
    #[serde(default)]
    pub tag: BTreeSet<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A row a [`ViewFilter`] can test.
pub trait Filterable {
    /// Inclusive day span the row covers.
    fn span(&self) -> (Date, Date);

    /// Action metadata, for views that carry it.
    fn meta(&self) -> Option<&ActionMeta> {
        None
    }

    /// Values searched by the text criterion.
    fn haystack(&self) -> Vec<&str>;
}

impl ViewFilter {
    pub fn is_empty(&self) -> bool {
        *self == ViewFilter::default()
    }

    /// Clamps both bounds into `[lo, hi]`, fills unset bounds with them, and
    /// swaps an inverted range. `lo` and `hi` may be given in either order.
    pub fn clamped(&self, lo: Date, hi: Date) -> ViewFilter {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let clamp = |d: Date| d.clamp(lo, hi);
        let mut from = self.from.map_or(lo, clamp);
        let mut to = self.to.map_or(hi, clamp);
        if from > to {
            std::mem::swap(&mut from, &mut to);
        }
        ViewFilter {
            from: Some(from),
            to: Some(to),
            ..self.clone()
        }
    }

    /// Whether a criterion other than the date range is set.
    pub fn narrows_actions(&self) -> bool {
        !self.metier.is_empty()
            || !self.zone.is_empty()
            || !self.platform.is_empty()
            || !self.tag.is_empty()
            || self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Whether the row's span overlaps the date range.
    pub fn covers<R: Filterable>(&self, row: &R) -> bool {
        let (start, end) = row.span();
        !(self.from.is_some_and(|from| end < from) || self.to.is_some_and(|to| start > to))
    }

    pub fn matches<R: Filterable>(&self, row: &R) -> bool {
        if !self.covers(row) {
            return false;
        }

        if let Some(meta) = row.meta() {
            if !dimension_matches(&self.metier, meta.metier.as_deref())
                || !dimension_matches(&self.zone, meta.zone.as_deref())
                || !dimension_matches(&self.platform, meta.platform.as_deref())
                || !dimension_matches(&self.tag, meta.tag())
            {
                return false;
            }
        }

        match self.text.as_deref().map(fold) {
            Some(needle) if !needle.is_empty() => {
                row.haystack().into_iter().any(|h| fold(h).contains(&needle))
            }
            _ => true,
        }
    }

    pub fn apply<R: Filterable + Clone>(&self, rows: &[R]) -> Vec<R> {
        rows.iter().filter(|r| self.matches(*r)).cloned().collect()
    }
}

fn dimension_matches(accepted: &BTreeSet<String>, value: Option<&str>) -> bool {
    if accepted.is_empty() {
        return true;
    }
    let Some(value) = value else {
        return false;
    };
    let value = fold(value);
    accepted.iter().any(|a| fold(a) == value)
}

fn meta_haystack<'a>(key: &'a str, meta: &'a ActionMeta) -> Vec<&'a str> {
    let mut out = vec![key];
    out.extend(
        [&meta.free_text, &meta.tag, &meta.sub_equipment, &meta.well]
            .into_iter()
            .filter_map(|v| v.as_deref()),
    );
    out
}

impl Filterable for DailyRecord {
    fn span(&self) -> (Date, Date) {
        (self.day, self.day)
    }
    fn meta(&self) -> Option<&ActionMeta> {
        Some(&self.meta)
    }
    fn haystack(&self) -> Vec<&str> {
        meta_haystack(self.action_key.as_str(), &self.meta)
    }
}

impl Filterable for ConsistentRecord {
    fn span(&self) -> (Date, Date) {
        (self.day, self.day)
    }
    fn meta(&self) -> Option<&ActionMeta> {
        Some(&self.meta)
    }
    fn haystack(&self) -> Vec<&str> {
        meta_haystack(self.action_key.as_str(), &self.meta)
    }
}

impl Filterable for LatestRecord {
    fn span(&self) -> (Date, Date) {
        (self.last_day, self.last_day)
    }
    fn meta(&self) -> Option<&ActionMeta> {
        Some(&self.meta)
    }
    fn haystack(&self) -> Vec<&str> {
        meta_haystack(self.action_key.as_str(), &self.meta)
    }
}

impl Filterable for TransitionEvent {
    fn span(&self) -> (Date, Date) {
        (self.day, self.day)
    }
    fn haystack(&self) -> Vec<&str> {
        vec![self.action_key.as_str()]
    }
}

impl Filterable for DowntimeInterval {
    fn span(&self) -> (Date, Date) {
        (self.start_day, self.end_day)
    }
    fn haystack(&self) -> Vec<&str> {
        vec![self.tag.as_str()]
    }
}

impl RollupViews {
    /// A new snapshot with every view narrowed by `filter`.
    ///
    /// Transitions, downtime intervals and diagnostics carry no metadata of
    /// their own. When a dimension or text criterion is set they follow the
    /// filtered `actions_consistent`: transitions and diagnostics by action
    /// key, downtime intervals by tag.
    pub fn filtered(&self, filter: &ViewFilter) -> RollupViews {
        let actions_consistent = filter.apply(&self.actions_consistent);
        let keys: BTreeSet<&ActionKey> =
            actions_consistent.iter().map(|r| &r.action_key).collect();

        let (transitions, equipment_downtime) = if filter.narrows_actions() {
            let tags: BTreeSet<&str> = actions_consistent
                .iter()
                .filter_map(|r| r.meta.tag())
                .collect();
            let transitions = self
                .transitions
                .iter()
                .filter(|t| keys.contains(&t.action_key) && filter.covers(*t))
                .cloned()
                .collect();
            let downtime = self
                .equipment_downtime
                .iter()
                .filter(|i| tags.contains(i.tag.as_str()) && filter.covers(*i))
                .cloned()
                .collect();
            (transitions, downtime)
        } else {
            (
                filter.apply(&self.transitions),
                filter.apply(&self.equipment_downtime),
            )
        };

        let diagnostics = self
            .diagnostics
            .iter()
            .filter(|d| keys.contains(&d.action_key))
            .cloned()
            .collect();

        RollupViews {
            observed_days: self
                .observed_days
                .iter()
                .copied()
                .filter(|d| filter.from.map_or(true, |f| *d >= f))
                .filter(|d| filter.to.map_or(true, |t| *d <= t))
                .collect(),
            actions_daily: filter.apply(&self.actions_daily),
            actions_latest: filter.apply(&self.actions_latest),
            running_actions: filter.apply(&self.running_actions),
            postponed_actions: filter.apply(&self.postponed_actions),
            ended_actions: filter.apply(&self.ended_actions),
            actions_consistent,
            transitions,
            equipment_downtime,
            diagnostics,
        }
    }
}

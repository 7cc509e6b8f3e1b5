//! End-to-end rollup scenarios: raw daily rows in, every view out.

use dayroll_core::{
    rebuild, ActionKey, ActionMeta, DailyRecord, DowntimeConfig, RollupConfig, Status, ViewName,
};
use time::{Date, Month};

fn day(n: u8) -> Date {
    Date::from_calendar_date(2023, Month::January, n).unwrap()
}

fn observe(key: &str, d: u8, status: Status, tag: Option<&str>) -> DailyRecord {
    DailyRecord {
        action_key: ActionKey::from(key),
        day: day(d),
        status,
        meta: ActionMeta {
            tag: tag.map(str::to_string),
            sheet: Some(format!("S{}", d)),
            ..ActionMeta::default()
        },
    }
}

#[test]
fn gapped_action_is_filled_and_closed() {
    let views = rebuild(
        vec![
            observe("A1", 1, Status::Running, None),
            observe("A1", 3, Status::Postponed, None),
            observe("A1", 5, Status::Ended, None),
        ],
        &RollupConfig::default(),
    )
    .unwrap();

    let consistent: Vec<_> = views
        .actions_consistent
        .iter()
        .map(|r| (r.day.day(), r.status, r.filled))
        .collect();
    assert_eq!(
        consistent,
        vec![
            (1, Status::Running, false),
            (2, Status::Running, true),
            (3, Status::Postponed, false),
            (4, Status::Postponed, true),
            (5, Status::Ended, false),
        ]
    );

    let transitions: Vec<_> = views
        .transitions
        .iter()
        .map(|t| (t.day.day(), t.from_status, t.to_status))
        .collect();
    assert_eq!(
        transitions,
        vec![
            (3, Status::Running, Status::Postponed),
            (5, Status::Postponed, Status::Ended),
        ]
    );

    assert_eq!(views.actions_latest.len(), 1);
    let latest = &views.actions_latest[0];
    assert_eq!(latest.status, Status::Ended);
    assert_eq!(latest.last_day, day(5));
    assert_eq!(latest.first_day, day(1));
    assert_eq!(views.ended_actions.len(), 1);
    assert!(views.running_actions.is_empty());
    assert!(views.postponed_actions.is_empty());
}

#[test]
fn equipment_with_a_gap_has_two_downtime_intervals() {
    let records = [1, 2, 3, 5, 6]
        .into_iter()
        .map(|d| observe(&format!("T1-{}", d), d, Status::Running, Some("T1")))
        .chain([
            observe("T1-1", 2, Status::Ended, Some("T1")),
            observe("T1-2", 3, Status::Ended, Some("T1")),
            observe("T1-3", 4, Status::Ended, Some("T1")),
            observe("T1-5", 6, Status::Ended, Some("T1")),
        ])
        .collect::<Vec<_>>();
    // T1-6 stays open on the last day; the others close the day after.
    let views = rebuild(records, &RollupConfig::default()).unwrap();

    let intervals: Vec<_> = views
        .equipment_downtime
        .iter()
        .map(|i| (i.tag.as_str(), i.start_day.day(), i.end_day.day(), i.duration_days))
        .collect();
    assert_eq!(intervals, vec![("T1", 1, 3, 3), ("T1", 5, 6, 2)]);
}

#[test]
fn two_sheet_week_rolls_up() {
    // Sheet 1: action 1 running, action 2 postponed and unavailable.
    // Sheet 2: action 1 done, action 2 still postponed and unavailable.
    let mut a2_d1 = observe("action-2", 1, Status::Postponed, Some("TAG2"));
    a2_d1.meta.unavailable = true;
    let mut a2_d2 = observe("action-2", 2, Status::Postponed, Some("TAG2"));
    a2_d2.meta.unavailable = true;
    let records = vec![
        observe("action-1", 1, Status::Running, Some("TAG1")),
        a2_d1,
        observe("action-1", 2, Status::Ended, Some("TAG1")),
        a2_d2,
    ];
    let config = RollupConfig {
        downtime: DowntimeConfig {
            require_unavailable_flag: true,
            ..DowntimeConfig::default()
        },
        ..RollupConfig::default()
    };
    let views = rebuild(records, &config).unwrap();

    assert_eq!(views.actions_daily.len(), 4);
    assert_eq!(views.date_bounds(), Some((day(1), day(2))));
    assert_eq!(views.ended_actions[0].meta.tag.as_deref(), Some("TAG1"));
    assert_eq!(views.postponed_actions[0].meta.tag.as_deref(), Some("TAG2"));
    assert_eq!(views.transitions.len(), 1);
    assert_eq!(views.transitions[0].to_status, Status::Ended);
    assert_eq!(views.equipment_downtime.len(), 1);
    assert_eq!(views.equipment_downtime[0].tag, "TAG2");
    assert_eq!(views.equipment_downtime[0].duration_days, 2);

    let counts = views.counts();
    assert_eq!(counts[&ViewName::ActionsConsistent], 4);
    assert_eq!(counts[&ViewName::ActionsLatest], 2);
}

#[test]
fn reopened_action_is_flagged_and_reported() {
    let views = rebuild(
        vec![
            observe("A", 1, Status::Running, None),
            observe("A", 2, Status::Ended, None),
            observe("B", 3, Status::Running, None),
            observe("A", 4, Status::Running, None),
        ],
        &RollupConfig::default(),
    )
    .unwrap();

    let a: Vec<_> = views
        .actions_consistent
        .iter()
        .filter(|r| r.action_key.as_str() == "A")
        .map(|r| (r.day.day(), r.status, r.reopened))
        .collect();
    assert_eq!(
        a,
        vec![
            (1, Status::Running, false),
            (2, Status::Ended, false),
            (3, Status::Ended, false),
            (4, Status::Running, true),
        ]
    );
    assert_eq!(views.diagnostics.len(), 1);
    assert_eq!(views.diagnostics[0].ended_on, day(2));
    assert_eq!(views.diagnostics[0].reopened_on, day(4));
    assert_eq!(views.running_actions.len(), 2);
}

#[test]
fn views_serialize_to_json_with_iso_days() {
    let views = rebuild(
        vec![observe("A", 1, Status::Running, Some("P-1"))],
        &RollupConfig::default(),
    )
    .unwrap();
    let json = serde_json::to_value(&views.actions_consistent[0]).unwrap();
    assert_eq!(json["day"], "2023-01-01");
    assert_eq!(json["status"], "RUNNING");
    assert_eq!(json["tag"], "P-1");
    assert_eq!(json["action_key"], "A");
}

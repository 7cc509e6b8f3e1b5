//! Sheets on disk through the rollup and back out as a bundle.

use std::fs;
use std::path::Path;

use bytes::Bytes;
use dayroll_core::{
    ConsistentRecord, DailyRecord, DowntimeConfig, DowntimeInterval, LatestRecord, RollupConfig,
    RollupError, RollupViews, SnapshotStoreBuilder, Status, TransitionEvent, ViewFilter, ViewName,
};
use dayroll_interchange::bundle::{bundled_observed_days, compute_etag, MANIFEST_FILE};
use dayroll_interchange::{
    csv, load_sheet_dir, parquet, write_bundle, BundleOptions, CsvOptions, Format, IngestOptions,
    Manifest,
};

const HEADER: &str = "Champ / Zone,Plateforme,N° Puits,Tag,Sous-equipement,Metier,\
Travail effectue / Commentaires,Termine,En cours,Reporte,Indisponible";

fn write_sheet(dir: &Path, name: &str, rows: &[&str]) {
    let mut text = String::from(HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    fs::write(dir.join(name), text).unwrap();
}

/// Three days: a pump repair that is postponed then closed, and a valve
/// job that keeps its equipment unavailable throughout.
fn week(dir: &Path) {
    write_sheet(
        dir,
        "2023-01-02.csv",
        &[
            "Nord,PF1,W-12,P-101,seal,Meca,replace seal,,x,,",
            "Nord,PF1,,V-7,,Instru,calibrate valve,,,x,x",
        ],
    );
    write_sheet(
        dir,
        "2023-01-03.csv",
        &[
            "Nord,PF1,W-12,P-101,seal,Meca,replace seal,,,x,",
            "Nord,PF1,,V-7,,Instru,calibrate valve,,,x,x",
            "PREVISION,,,,,,,,,,",
            "Sud,PF2,,K-1,,Meca,next week,,x,,",
        ],
    );
    write_sheet(
        dir,
        "2023-01-04_mercredi.csv",
        &["Nord,PF1,W-12,P-101,seal,Meca,replace seal,x,,,"],
    );
    fs::write(dir.join("notes.txt"), "ignored").unwrap();
}

fn load(dir: &Path) -> RollupViews {
    let mut builder = SnapshotStoreBuilder::new();
    let loaded = load_sheet_dir(dir, &mut builder, &IngestOptions::default()).unwrap();
    assert_eq!(loaded.sheets, 3);
    let config = RollupConfig {
        downtime: DowntimeConfig {
            require_unavailable_flag: true,
            ..DowntimeConfig::default()
        },
        ..RollupConfig::default()
    };
    dayroll_core::rebuild_store(&builder.build().unwrap(), &config)
}

#[test]
fn sheet_directory_rolls_up() {
    let dir = tempfile::tempdir().unwrap();
    week(dir.path());
    let views = load(dir.path());

    assert_eq!(views.actions_daily.len(), 5);
    assert_eq!(views.actions_latest.len(), 2);
    assert_eq!(views.ended_actions.len(), 1);
    assert_eq!(views.ended_actions[0].meta.tag.as_deref(), Some("P-101"));
    assert_eq!(views.postponed_actions.len(), 1);

    // The valve job is absent on the last sheet but still open: filled.
    let valve: Vec<_> = views
        .actions_consistent
        .iter()
        .filter(|r| r.meta.tag.as_deref() == Some("V-7"))
        .map(|r| (r.day.day(), r.status, r.filled))
        .collect();
    assert_eq!(
        valve,
        vec![
            (2, Status::Postponed, false),
            (3, Status::Postponed, false),
            (4, Status::Postponed, true),
        ]
    );

    let pump: Vec<_> = views
        .transitions
        .iter()
        .map(|t| (t.day.day(), t.from_status, t.to_status))
        .collect();
    assert_eq!(
        pump,
        vec![
            (3, Status::Running, Status::Postponed),
            (4, Status::Postponed, Status::Ended),
        ]
    );

    assert_eq!(views.equipment_downtime.len(), 1);
    assert_eq!(views.equipment_downtime[0].tag, "V-7");
    assert_eq!(views.equipment_downtime[0].duration_days, 3);
}

#[test]
fn unflagged_row_fails_the_load() {
    let dir = tempfile::tempdir().unwrap();
    write_sheet(dir.path(), "2023-01-02.csv", &["Nord,PF1,,P-1,,Meca,no flag,,,,"]);
    let mut builder = SnapshotStoreBuilder::new();
    load_sheet_dir(dir.path(), &mut builder, &IngestOptions::default()).unwrap();
    let err = builder.build().unwrap_err();
    let RollupError::MalformedInput { rows } = err;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sheet.as_deref(), Some("2023-01-02"));
}

#[test]
fn bundle_writes_every_view_in_both_formats() {
    let sheets = tempfile::tempdir().unwrap();
    week(sheets.path());
    let views = load(sheets.path());

    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("report");
    let options = BundleOptions {
        formats: vec![Format::Csv, Format::Parquet],
        csv: CsvOptions { delimiter: b';' },
        meta: [("source".to_string(), "week 1".to_string())].into(),
        filter: None,
    };
    let manifest = write_bundle(&target, &views, &options).unwrap();

    assert_eq!(manifest.files.len(), ViewName::ALL.len() * 2);
    assert_eq!(manifest.counts[&ViewName::ActionsLatest], 2);
    assert_eq!(manifest.meta["source"], "week 1");
    for file in &manifest.files {
        let bytes = fs::read(target.join(&file.path)).unwrap();
        assert_eq!(file.sha256, compute_etag(&bytes), "{}", file.path);
        assert_eq!(file.rows, views.len(file.view));
    }

    let on_disk: Manifest =
        serde_json::from_str(&fs::read_to_string(target.join(MANIFEST_FILE)).unwrap()).unwrap();
    assert_eq!(on_disk, manifest);
    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(target.join(MANIFEST_FILE)).unwrap()).unwrap();
    assert_eq!(raw["counts"]["equipment_downtime"], 1);
    assert_eq!(raw["files"][0]["format"], "csv");
    assert_eq!(raw["files"][0]["path"], "actions_daily.csv");
}

#[test]
fn exported_views_read_back_identically() {
    let sheets = tempfile::tempdir().unwrap();
    week(sheets.path());
    let views = load(sheets.path());
    let out = tempfile::tempdir().unwrap();
    let options = BundleOptions {
        formats: vec![Format::Csv, Format::Parquet],
        ..BundleOptions::default()
    };
    write_bundle(out.path(), &views, &options).unwrap();

    let read_csv = |name: &str| fs::read(out.path().join(format!("{name}.csv"))).unwrap();
    let read_parquet =
        |name: &str| Bytes::from(fs::read(out.path().join(format!("{name}.parquet"))).unwrap());
    let opts = CsvOptions::default();

    assert_eq!(
        csv::read_rows::<DailyRecord>(&read_csv("actions_daily"), &opts).unwrap(),
        views.actions_daily
    );
    assert_eq!(
        csv::read_rows::<ConsistentRecord>(&read_csv("actions_consistent"), &opts).unwrap(),
        views.actions_consistent
    );
    assert_eq!(
        csv::read_rows::<TransitionEvent>(&read_csv("transitions"), &opts).unwrap(),
        views.transitions
    );
    assert_eq!(
        parquet::read_rows::<LatestRecord>(&read_parquet("running_actions")).unwrap(),
        views.running_actions
    );
    assert_eq!(
        parquet::read_rows::<DowntimeInterval>(&read_parquet("equipment_downtime")).unwrap(),
        views.equipment_downtime
    );
    assert_eq!(
        parquet::read_rows::<ConsistentRecord>(&read_parquet("actions_consistent")).unwrap(),
        views.actions_consistent
    );
}

#[test]
fn sheet_hash_tracks_names_and_content() {
    let dir = tempfile::tempdir().unwrap();
    week(dir.path());
    let hash = |dir: &Path| {
        let mut builder = SnapshotStoreBuilder::new();
        load_sheet_dir(dir, &mut builder, &IngestOptions::default())
            .unwrap()
            .sha256
    };
    let first = hash(dir.path());
    assert_eq!(first.len(), 64);
    assert_eq!(hash(dir.path()), first);

    write_sheet(dir.path(), "2023-01-05.csv", &[]);
    assert_ne!(hash(dir.path()), first);
}

#[test]
fn manifest_keeps_empty_sheet_days_for_the_daily_export() {
    let sheets = tempfile::tempdir().unwrap();
    week(sheets.path());
    write_sheet(sheets.path(), "2023-01-05.csv", &[]);
    let views = load_with_empty_last_day(sheets.path());
    assert_eq!(views.observed_days.len(), 4);

    let out = tempfile::tempdir().unwrap();
    let manifest = write_bundle(out.path(), &views, &BundleOptions::default()).unwrap();
    assert_eq!(manifest.observed_days, views.observed_days);

    let daily = out.path().join("actions_daily.csv");
    let bytes = fs::read(&daily).unwrap();
    let days = bundled_observed_days(&daily, &bytes).unwrap().unwrap();
    assert_eq!(days, views.observed_days);

    let mut edited = bytes.clone();
    edited.extend_from_slice(b"\n");
    assert_eq!(bundled_observed_days(&daily, &edited).unwrap(), None);

    let elsewhere = tempfile::tempdir().unwrap();
    let copy = elsewhere.path().join("actions_daily.csv");
    assert_eq!(bundled_observed_days(&copy, &bytes).unwrap(), None);
}

fn load_with_empty_last_day(dir: &Path) -> RollupViews {
    let mut builder = SnapshotStoreBuilder::new();
    let loaded = load_sheet_dir(dir, &mut builder, &IngestOptions::default()).unwrap();
    assert_eq!(loaded.sheets, 4);
    dayroll_core::rebuild_store(&builder.build().unwrap(), &RollupConfig::default())
}

#[test]
fn manifest_records_the_export_filter() {
    let sheets = tempfile::tempdir().unwrap();
    week(sheets.path());
    let filter = ViewFilter {
        zone: ["Nord".to_string()].into_iter().collect(),
        ..ViewFilter::default()
    };
    let views = load(sheets.path()).filtered(&filter);

    let out = tempfile::tempdir().unwrap();
    let options = BundleOptions {
        filter: Some(filter.clone()),
        ..BundleOptions::default()
    };
    write_bundle(out.path(), &views, &options).unwrap();

    let on_disk = dayroll_interchange::read_manifest(out.path()).unwrap().unwrap();
    assert_eq!(on_disk.filter, Some(filter));
    assert_eq!(on_disk.counts[&ViewName::ActionsLatest], views.actions_latest.len());
    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join(MANIFEST_FILE)).unwrap()).unwrap();
    assert_eq!(raw["filter"]["zone"][0], "Nord");
}

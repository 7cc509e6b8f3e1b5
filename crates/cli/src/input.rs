//! Arguments shared by every subcommand: where the daily rows come from and
//! how the resulting views are narrowed.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use clap::Args;
use dayroll_core::{DailyRecord, RollupError, RollupViews, SnapshotStoreBuilder, ViewFilter};
use dayroll_interchange::bundle::{bundled_observed_days, compute_etag};
use dayroll_interchange::{csv, load_sheet_dir, parquet};
use time::macros::format_description;
use time::Date;

use crate::config::DayrollConfig;

#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub(crate) struct InputArgs {
    /// Directory of daily sheets named YYYY-MM-DD*.csv
    #[arg(long, value_name = "DIR")]
    pub sheets: Option<PathBuf>,

    /// Previously exported actions_daily file (.csv or .parquet)
    #[arg(long, value_name = "FILE")]
    pub daily: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub(crate) struct FilterArgs {
    /// First day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day)]
    pub from: Option<Date>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day)]
    pub to: Option<Date>,

    /// Keep only these trades (repeatable)
    #[arg(long)]
    pub metier: Vec<String>,

    /// Keep only these zones (repeatable)
    #[arg(long)]
    pub zone: Vec<String>,

    /// Keep only these platforms (repeatable)
    #[arg(long)]
    pub platform: Vec<String>,

    /// Keep only these exact equipment tags (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,

    /// Substring searched in comments, tags, wells and action keys
    #[arg(long)]
    pub text: Option<String>,
}

fn parse_day(value: &str) -> Result<Date, String> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("invalid day '{}': {}", value, e))
}

impl FilterArgs {
    /// The filter, with its dates clamped to the loaded range when one
    /// was given.
    pub(crate) fn to_filter(&self, views: &RollupViews) -> ViewFilter {
        let filter = ViewFilter {
            from: self.from,
            to: self.to,
            metier: self.metier.iter().cloned().collect(),
            zone: self.zone.iter().cloned().collect(),
            platform: self.platform.iter().cloned().collect(),
            tag: self.tag.iter().cloned().collect(),
            text: self.text.clone(),
        };
        match (self.from.or(self.to), views.date_bounds()) {
            (Some(_), Some((lo, hi))) => filter.clamped(lo, hi),
            _ => filter,
        }
    }
}

/// Rows of an exported `actions_daily` file, plus the observed days its
/// bundle manifest recorded when one sits next to it.
fn read_daily(
    path: &Path,
    content: &[u8],
    config: &DayrollConfig,
) -> Result<(Vec<DailyRecord>, Vec<Date>), String> {
    let is_parquet = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
    let rows = if is_parquet {
        parquet::read_rows::<DailyRecord>(&Bytes::copy_from_slice(content))
    } else {
        csv::read_rows::<DailyRecord>(content, &config.csv_options()?)
    };
    let rows = rows.map_err(|e| format!("could not decode '{}': {}", path.display(), e))?;
    let days = bundled_observed_days(path, content)
        .map_err(|e| format!("could not read the manifest next to '{}': {}", path.display(), e))?
        .unwrap_or_default();
    Ok((rows, days))
}

/// The error summary followed by one line per rejected row.
fn describe_malformed(err: RollupError) -> String {
    let mut msg = err.to_string();
    let RollupError::MalformedInput { rows } = &err;
    for row in rows {
        msg.push_str("\n  ");
        msg.push_str(&row.to_string());
    }
    msg
}

/// Rebuilt views and a hash identifying the input they came from.
pub(crate) struct Loaded {
    pub views: RollupViews,
    /// Hex SHA-256 of the daily file, or of every sheet in the directory.
    pub source_sha256: String,
}

/// Loads the input and rebuilds every view.
pub(crate) fn load(input: &InputArgs, config: &DayrollConfig) -> Result<Loaded, String> {
    let mut builder = SnapshotStoreBuilder::new();
    let source_sha256 = if let Some(dir) = &input.sheets {
        load_sheet_dir(dir, &mut builder, &config.ingest_options()?)
            .map_err(|e| e.to_string())?
            .sha256
    } else if let Some(path) = &input.daily {
        let content = std::fs::read(path)
            .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
        let (rows, days) = read_daily(path, &content, config)?;
        for day in days {
            builder.observe_day(day);
        }
        builder.extend_records(rows);
        compute_etag(&content)
    } else {
        String::new()
    };

    let store = builder.build().map_err(describe_malformed)?;
    Ok(Loaded {
        views: dayroll_core::rebuild_store(&store, &config.rollup_config()),
        source_sha256,
    })
}

/// Loads the input and rebuilds every view.
pub(crate) fn load_views(input: &InputArgs, config: &DayrollConfig) -> Result<RollupViews, String> {
    load(input, config).map(|loaded| loaded.views)
}

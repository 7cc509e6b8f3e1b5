//! `dayroll.toml`: rollup, downtime, ingest and export settings.
//!
//! Every section and key is optional.
//!
//! # Example
//!
//! ```toml
//! [rollup]
//! day_grid = "observed"
//!
//! [downtime]
//! statuses = ["RUNNING", "POSTPONED"]
//! gap_tolerance_days = 1
//! require_unavailable_flag = true
//!
//! [ingest]
//! delimiter = ";"
//! unflagged = "running"
//!
//! [export]
//! formats = ["csv", "parquet"]
//! delimiter = ";"
//! out = "reports/week-01"
//!
//! [export.meta]
//! site = "north field"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dayroll_core::{DayGrid, DowntimeConfig, RollupConfig};
use dayroll_interchange::{CsvOptions, Format, IngestOptions, UnflaggedPolicy};
use serde::Deserialize;

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DayrollConfig {
    #[serde(default)]
    pub rollup: RollupSection,
    #[serde(default)]
    pub downtime: DowntimeConfig,
    #[serde(default)]
    pub ingest: IngestSection,
    #[serde(default)]
    pub export: ExportSection,
}

/// `[rollup]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RollupSection {
    #[serde(default)]
    pub day_grid: DayGrid,
}

/// `[ingest]` section: how daily sheets are read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct IngestSection {
    /// Single-character field separator of the sheets.
    pub delimiter: Option<String>,
    #[serde(default)]
    pub unflagged: UnflaggedPolicy,
}

/// `[export]` section: what `rebuild` writes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExportSection {
    #[serde(default)]
    pub formats: Vec<Format>,
    /// Field separator of exported CSV files (and of `--daily` CSV input).
    pub delimiter: Option<String>,
    pub out: Option<PathBuf>,
    /// Copied verbatim into `manifest.json`.
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// Read and parse a config file. Returns a human-readable error string on
/// failure.
pub(crate) fn read_config(path: &Path) -> Result<DayrollConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;

    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

/// The config at `path`, or defaults when no path was given.
pub(crate) fn load_config(path: Option<&Path>) -> Result<DayrollConfig, String> {
    match path {
        Some(path) => read_config(path),
        None => Ok(DayrollConfig::default()),
    }
}

fn parse_delimiter(value: Option<&str>, section: &str) -> Result<u8, String> {
    let Some(value) = value else {
        return Ok(b',');
    };
    let value = if value == "\\t" { "\t" } else { value };
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(format!(
            "[{}] delimiter must be a single ASCII character, got '{}'",
            section, value
        )),
    }
}

impl DayrollConfig {
    pub(crate) fn rollup_config(&self) -> RollupConfig {
        RollupConfig {
            day_grid: self.rollup.day_grid,
            downtime: self.downtime.clone(),
        }
    }

    pub(crate) fn ingest_options(&self) -> Result<IngestOptions, String> {
        Ok(IngestOptions {
            delimiter: parse_delimiter(self.ingest.delimiter.as_deref(), "ingest")?,
            unflagged: self.ingest.unflagged,
        })
    }

    pub(crate) fn csv_options(&self) -> Result<CsvOptions, String> {
        Ok(CsvOptions {
            delimiter: parse_delimiter(self.export.delimiter.as_deref(), "export")?,
        })
    }
}

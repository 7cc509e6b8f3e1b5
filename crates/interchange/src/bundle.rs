//! Report bundles: every view written to a directory next to a
//! `manifest.json` describing what was written.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use bytes::Bytes;
use dayroll_core::{RollupViews, ViewFilter, ViewName};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};

use crate::csv::{self, CsvOptions};
use crate::error::{InterchangeError, Result};
use crate::parquet;
use crate::table::TableRow;

pub const MANIFEST_FILE: &str = "manifest.json";

/// File format of an exported view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Csv,
    Parquet,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Parquet => "parquet",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "parquet" => Ok(Format::Parquet),
            other => Err(format!(
                "unknown format '{}' (expected csv or parquet)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOptions {
    /// Formats to write; each view is written once per format.
    pub formats: Vec<Format>,
    pub csv: CsvOptions,
    /// Free-form provenance copied into the manifest.
    pub meta: BTreeMap<String, String>,
    /// Filter the views were narrowed by before writing.
    pub filter: Option<ViewFilter>,
}

impl Default for BundleOptions {
    fn default() -> Self {
        BundleOptions {
            formats: vec![Format::Csv],
            csv: CsvOptions::default(),
            meta: BTreeMap::new(),
            filter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub view: ViewName,
    pub format: Format,
    /// Path relative to the bundle directory.
    pub path: String,
    pub rows: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: String,
    pub meta: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<ViewFilter>,
    /// Sheet days of the load, including days whose sheet held no rows.
    #[serde(default)]
    pub observed_days: Vec<Date>,
    pub counts: BTreeMap<ViewName, usize>,
    pub diagnostics: usize,
    pub files: Vec<ManifestFile>,
}

impl Manifest {
    /// The entry for `file_name` if its recorded hash matches `bytes`.
    pub fn verified_file(&self, file_name: &str, bytes: &[u8]) -> Option<&ManifestFile> {
        let sha256 = compute_etag(bytes);
        self.files
            .iter()
            .find(|f| f.path == file_name && f.sha256 == sha256)
    }
}

/// Hex SHA-256 of an encoded file.
pub fn compute_etag(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn encode<T: TableRow>(rows: &[T], format: Format, csv_options: &CsvOptions) -> Result<Bytes> {
    match format {
        Format::Csv => csv::write_rows(rows, csv_options),
        Format::Parquet => parquet::write_rows(rows),
    }
}

/// Encodes one view in `format`.
pub fn encode_view(
    views: &RollupViews,
    view: ViewName,
    format: Format,
    csv_options: &CsvOptions,
) -> Result<Bytes> {
    match view {
        ViewName::ActionsDaily => encode(&views.actions_daily, format, csv_options),
        ViewName::ActionsConsistent => encode(&views.actions_consistent, format, csv_options),
        ViewName::ActionsLatest => encode(&views.actions_latest, format, csv_options),
        ViewName::Transitions => encode(&views.transitions, format, csv_options),
        ViewName::RunningActions => encode(&views.running_actions, format, csv_options),
        ViewName::PostponedActions => encode(&views.postponed_actions, format, csv_options),
        ViewName::EndedActions => encode(&views.ended_actions, format, csv_options),
        ViewName::EquipmentDowntime => encode(&views.equipment_downtime, format, csv_options),
    }
}

/// Writes every view in each requested format plus `manifest.json` into
/// `dir`, creating it if needed. Existing files with the same names are
/// overwritten.
///
/// # Errors
///
/// Returns an error if a view cannot be encoded or a file cannot be
/// written. Files written before the failure are left in place.
pub fn write_bundle(dir: &Path, views: &RollupViews, options: &BundleOptions) -> Result<Manifest> {
    fs::create_dir_all(dir).map_err(|e| InterchangeError::io(dir, e))?;

    let mut files = Vec::new();
    for format in &options.formats {
        for view in ViewName::ALL {
            let bytes = encode_view(views, view, *format, &options.csv)?;
            let name = format!("{}.{}", view, format.extension());
            let path = dir.join(&name);
            fs::write(&path, &bytes).map_err(|e| InterchangeError::io(&path, e))?;
            tracing::debug!(view = %view, format = %format, bytes = bytes.len(), "wrote view");
            files.push(ManifestFile {
                view,
                format: *format,
                path: name,
                rows: views.len(view),
                sha256: compute_etag(&bytes),
            });
        }
    }

    let manifest = Manifest {
        generated_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
        meta: options.meta.clone(),
        filter: options.filter.clone(),
        observed_days: views.observed_days.clone(),
        counts: views.counts(),
        diagnostics: views.diagnostics.len(),
        files,
    };
    let path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(&path, json).map_err(|e| InterchangeError::io(&path, e))?;
    tracing::info!(dir = %dir.display(), files = manifest.files.len(), "bundle written");
    Ok(manifest)
}

/// Reads `manifest.json` from a bundle directory. `None` when the
/// directory has no manifest.
///
/// # Errors
///
/// Returns an error if the manifest exists but cannot be read or parsed.
pub fn read_manifest(dir: &Path) -> Result<Option<Manifest>> {
    let path = dir.join(MANIFEST_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read(&path).map_err(|e| InterchangeError::io(&path, e))?;
    Ok(Some(serde_json::from_slice(&content)?))
}

/// Observed days recorded for an exported `actions_daily` file, read from
/// the manifest next to it. `None` when there is no manifest or it does
/// not describe these exact bytes.
///
/// # Errors
///
/// Returns an error if the manifest exists but cannot be read or parsed.
pub fn bundled_observed_days(daily: &Path, bytes: &[u8]) -> Result<Option<Vec<Date>>> {
    let Some(dir) = daily.parent() else {
        return Ok(None);
    };
    let Some(file_name) = daily.file_name().and_then(|n| n.to_str()) else {
        return Ok(None);
    };
    let Some(manifest) = read_manifest(dir)? else {
        return Ok(None);
    };
    match manifest.verified_file(file_name, bytes) {
        Some(file) if file.view == ViewName::ActionsDaily => Ok(Some(manifest.observed_days)),
        _ => {
            tracing::debug!(file = file_name, "manifest does not describe this daily file");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("CSV".parse::<Format>().unwrap(), Format::Csv);
        assert_eq!("parquet".parse::<Format>().unwrap(), Format::Parquet);
        assert!("xlsx".parse::<Format>().is_err());
    }

    #[test]
    fn etag_is_lowercase_hex_sha256() {
        let etag = compute_etag(b"");
        assert_eq!(
            etag,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn empty_views_encode_to_header_only_csv() {
        let bytes = encode_view(
            &RollupViews::default(),
            ViewName::EquipmentDowntime,
            Format::Csv,
            &CsvOptions::default(),
        )
        .unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap().trim_end(),
            "tag,start_day,end_day,duration_days,action_count"
        );
    }
}

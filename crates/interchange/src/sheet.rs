//! Daily sheet ingestion.
//!
//! A sheet is one day's CSV export of the field report: one row per action,
//! identifying columns (zone, platform, well, equipment, trade, comments) and
//! one flag column per status. Rows become [`RawDailyRow`]s; validation is
//! left to [`SnapshotStoreBuilder::build`].

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{Array, StringArray};
use arrow::csv::reader::Format as CsvFormat;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use dayroll_core::text::{fold, normalize_text};
use dayroll_core::{ActionKey, ActionMeta, RawDailyRow, SnapshotStoreBuilder, Status};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::macros::format_description;
use time::Date;

use crate::error::IngestError;

/// What to do with a row that has none of the status flags set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnflaggedPolicy {
    /// Keep the row without a status so that the load fails as malformed.
    #[default]
    Reject,
    /// Treat the row as running.
    Running,
    /// Drop the row.
    Skip,
}

impl FromStr for UnflaggedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(UnflaggedPolicy::Reject),
            "running" => Ok(UnflaggedPolicy::Running),
            "skip" => Ok(UnflaggedPolicy::Skip),
            other => Err(format!(
                "unknown unflagged policy '{}' (expected reject, running or skip)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub delimiter: u8,
    pub unflagged: UnflaggedPolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            delimiter: b',',
            unflagged: UnflaggedPolicy::default(),
        }
    }
}

/// The rows read from one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub day: Date,
    pub name: String,
    pub rows: Vec<RawDailyRow>,
}

impl Sheet {
    /// Registers the sheet's day and queues its rows.
    pub fn push_into(self, builder: &mut SnapshotStoreBuilder) {
        builder.observe_day(self.day);
        for row in self.rows {
            builder.push(row);
        }
    }
}

// ──────────────────────────────────────────────
// Cell helpers
// ──────────────────────────────────────────────

const ZONE: &str = "champ_zone";
const PREVISION: &str = "PREVISION";

/// Maps a sheet header to its canonical column name.
pub fn normalize_header(header: &str) -> String {
    let low = normalize_text(header).trim().to_lowercase();
    let canonical = if low.starts_with("champ / zone") || low == "champ zone" {
        ZONE
    } else if low.contains("plateforme") || low.contains("platerforme") {
        "plateforme_sous_zone"
    } else if low.starts_with("n° puits") || low.starts_with("n°puits") || low.contains("n puits")
    {
        "num_puits"
    } else if low.contains("tag equipement") || low == "tag" {
        "tag_equipement"
    } else if low.contains("sous-equipement")
        || low.contains("sous equipement")
        || low.contains("sous- equipement")
    {
        "sous_equipement"
    } else if low == "indisponible" {
        "indisponible"
    } else if low == "metier" {
        "metier"
    } else if low.contains("travail effectue") && low.contains("commentaires") {
        "travaux_commentaires"
    } else if low.starts_with("termine") {
        "termine"
    } else if low.starts_with("en cours") {
        "en_cours"
    } else if low.starts_with("report") {
        "reporte"
    } else {
        return low;
    };
    canonical.to_string()
}

/// Reads a yes/no cell. Anything outside the accepted spellings is false.
pub fn parse_flag(cell: Option<&str>) -> bool {
    matches!(
        cell.map(|c| c.trim().to_lowercase()).as_deref(),
        Some("1" | "true" | "vrai" | "oui" | "yes" | "y" | "t" | "x")
    )
}

/// Stable identity of an action: the hash of its identifying fields,
/// compared accent-, case- and whitespace-insensitively.
pub fn action_key_for(meta: &ActionMeta) -> ActionKey {
    let payload = [
        &meta.zone,
        &meta.platform,
        &meta.well,
        &meta.tag,
        &meta.sub_equipment,
        &meta.metier,
        &meta.free_text,
    ]
    .iter()
    .map(|field| fold(field.as_deref().unwrap_or("")))
    .collect::<Vec<_>>()
    .join("||");
    ActionKey::new(format!("{:x}", Sha256::digest(payload.as_bytes())))
}

/// Status from the sheet flags; closure wins over postponement, which wins
/// over running.
fn status_from_flags(termine: bool, reporte: bool, en_cours: bool) -> Option<Status> {
    if termine {
        Some(Status::Ended)
    } else if reporte {
        Some(Status::Postponed)
    } else if en_cours {
        Some(Status::Running)
    } else {
        None
    }
}

/// Positional lookup of canonical columns within one record batch.
struct Cells<'a> {
    index: &'a HashMap<String, usize>,
    batch: &'a RecordBatch,
}

impl Cells<'_> {
    fn raw(&self, column: &str, row: usize) -> Option<&str> {
        let array = self
            .batch
            .column(*self.index.get(column)?)
            .as_any()
            .downcast_ref::<StringArray>()?;
        (!array.is_null(row)).then(|| array.value(row))
    }

    fn text(&self, column: &str, row: usize) -> Option<String> {
        ActionMeta::text(self.raw(column, row).map(normalize_text).as_deref())
    }

    fn flag(&self, column: &str, row: usize) -> bool {
        parse_flag(self.raw(column, row))
    }
}

// ──────────────────────────────────────────────
// Reading
// ──────────────────────────────────────────────

/// Parses one sheet's CSV bytes into raw daily rows for `day`.
///
/// # Errors
///
/// Returns [`IngestError::Csv`] if the bytes are not readable as CSV.
pub fn read_sheet(
    bytes: &[u8],
    day: Date,
    name: &str,
    options: &IngestOptions,
) -> Result<Sheet, IngestError> {
    let csv_error = |source| IngestError::Csv {
        sheet: name.to_string(),
        source,
    };
    let mut sheet = Sheet {
        day,
        name: name.to_string(),
        rows: Vec::new(),
    };

    let (inferred, _) = CsvFormat::default()
        .with_header(true)
        .with_delimiter(options.delimiter)
        .infer_schema(Cursor::new(bytes), Some(0))
        .map_err(csv_error)?;
    let columns: Vec<String> = inferred
        .fields()
        .iter()
        .map(|f| normalize_header(f.name()))
        .collect();

    let mut index = HashMap::new();
    for (i, column) in columns.iter().enumerate() {
        index.entry(column.clone()).or_insert(i);
    }
    if !index.contains_key(ZONE) {
        tracing::warn!(sheet = name, %day, "sheet has no zone column; skipped");
        return Ok(sheet);
    }

    let schema = Schema::new(
        columns
            .iter()
            .map(|c| Field::new(c.as_str(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .with_delimiter(options.delimiter)
        .with_truncated_rows(true)
        .build(Cursor::new(bytes))
        .map_err(csv_error)?;

    let mut dropped = 0usize;
    'batches: for batch in reader {
        let batch = batch.map_err(csv_error)?;
        let cells = Cells {
            index: &index,
            batch: &batch,
        };
        for row in 0..batch.num_rows() {
            let Some(zone) = cells.raw(ZONE, row).filter(|z| !z.trim().is_empty()) else {
                dropped += 1;
                continue;
            };
            if normalize_text(zone).to_uppercase() == PREVISION {
                break 'batches;
            }

            let mut meta = ActionMeta {
                metier: cells.text("metier", row),
                zone: cells.text(ZONE, row),
                platform: cells.text("plateforme_sous_zone", row),
                well: cells.text("num_puits", row),
                tag: cells.text("tag_equipement", row),
                sub_equipment: cells.text("sous_equipement", row),
                free_text: cells.text("travaux_commentaires", row),
                unavailable: cells.flag("indisponible", row),
                sheet: None,
            };
            let identified = [
                &meta.zone,
                &meta.platform,
                &meta.well,
                &meta.tag,
                &meta.sub_equipment,
                &meta.metier,
                &meta.free_text,
            ]
            .iter()
            .any(|f| f.is_some());
            if !identified {
                dropped += 1;
                continue;
            }

            let status = match status_from_flags(
                cells.flag("termine", row),
                cells.flag("reporte", row),
                cells.flag("en_cours", row),
            ) {
                Some(status) => Some(status),
                None => match options.unflagged {
                    UnflaggedPolicy::Reject => None,
                    UnflaggedPolicy::Running => Some(Status::Running),
                    UnflaggedPolicy::Skip => {
                        dropped += 1;
                        continue;
                    }
                },
            };

            let key = action_key_for(&meta);
            meta.sheet = Some(name.to_string());
            sheet.rows.push(RawDailyRow {
                action_key: Some(key.as_str().to_string()),
                day: Some(day),
                status: status.map(|s| s.as_str().to_string()),
                meta,
            });
        }
    }

    tracing::debug!(sheet = name, %day, rows = sheet.rows.len(), dropped, "sheet read");
    Ok(sheet)
}

/// The report day encoded at the start of a sheet's file name
/// (`2023-01-05.csv`, `2023-01-05_monday.csv`).
///
/// # Errors
///
/// Returns [`IngestError::UndatedSheet`] if the name does not start with a
/// valid `YYYY-MM-DD` date.
pub fn day_from_file_name(file_name: &str) -> Result<Date, IngestError> {
    let undated = || IngestError::UndatedSheet(file_name.to_string());
    let prefix = file_name.get(..10).ok_or_else(undated)?;
    Date::parse(prefix, format_description!("[year]-[month]-[day]")).map_err(|_| undated())
}

fn io_error(path: &Path, source: std::io::Error) -> IngestError {
    IngestError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// What [`load_sheet_dir`] read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSheets {
    pub sheets: usize,
    /// Hex SHA-256 over every sheet's file name and content, in load order.
    pub sha256: String,
}

/// Reads every `*.csv` sheet in `dir`, in file name order, into `builder`.
///
/// # Errors
///
/// Fails on the first unreadable file, undated file name or undecodable
/// sheet.
pub fn load_sheet_dir(
    dir: &Path,
    builder: &mut SnapshotStoreBuilder,
    options: &IngestOptions,
) -> Result<LoadedSheets, IngestError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
        let path = entry.map_err(|e| io_error(dir, e))?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            paths.push(path);
        }
    }
    paths.sort();

    let mut hasher = Sha256::new();
    for path in &paths {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let day = day_from_file_name(file_name)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
        hasher.update(file_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(&bytes);
        read_sheet(&bytes, day, stem, options)?.push_into(builder);
    }
    tracing::info!(dir = %dir.display(), sheets = paths.len(), "sheets loaded");
    Ok(LoadedSheets {
        sheets: paths.len(),
        sha256: format!("{:x}", hasher.finalize()),
    })
}

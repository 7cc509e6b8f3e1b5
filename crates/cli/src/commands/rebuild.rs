use std::path::PathBuf;

use dayroll_interchange::{write_bundle, BundleOptions, Format};

use super::print_json;
use crate::config::DayrollConfig;
use crate::input::{load, FilterArgs, InputArgs};
use crate::OutputFormat;

const DEFAULT_OUT: &str = "dayroll-report";

/// Rebuilds every view, narrows them by `filter` and writes the bundle.
/// The manifest records the source, its hash, the loaded day range and the
/// filter applied.
pub(crate) fn cmd_rebuild(
    input: &InputArgs,
    filter: &FilterArgs,
    out: Option<PathBuf>,
    formats: Vec<Format>,
    config: &DayrollConfig,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), String> {
    let loaded = load(input, config)?;
    let full = loaded.views;
    let filter = filter.to_filter(&full);

    let dir = out
        .or_else(|| config.export.out.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT));
    let mut formats = if !formats.is_empty() {
        formats
    } else if !config.export.formats.is_empty() {
        config.export.formats.clone()
    } else {
        vec![Format::Csv]
    };
    formats.sort();
    formats.dedup();

    let mut meta = config.export.meta.clone();
    let source = match (&input.sheets, &input.daily) {
        (Some(dir), _) => dir.display().to_string(),
        (None, Some(file)) => file.display().to_string(),
        (None, None) => String::new(),
    };
    meta.insert("source".to_string(), source);
    meta.insert("source_sha256".to_string(), loaded.source_sha256);
    if let Some((first, last)) = full.date_bounds() {
        meta.insert("first_day".to_string(), first.to_string());
        meta.insert("last_day".to_string(), last.to_string());
    }

    let (views, filter) = if filter.is_empty() {
        (full, None)
    } else {
        (full.filtered(&filter), Some(filter))
    };
    let options = BundleOptions {
        formats,
        csv: config.csv_options()?,
        meta,
        filter,
    };
    let manifest = write_bundle(&dir, &views, &options)
        .map_err(|e| format!("could not write bundle to '{}': {}", dir.display(), e))?;

    if quiet {
        return Ok(());
    }
    match output {
        OutputFormat::Json => print_json(&manifest)?,
        OutputFormat::Text => {
            println!(
                "wrote {} file(s) to {}",
                manifest.files.len() + 1,
                dir.display()
            );
            for (view, rows) in &manifest.counts {
                println!("  {:<20} {:>8}", view.as_str(), rows);
            }
            if manifest.diagnostics > 0 {
                println!("  {} reopened action(s)", manifest.diagnostics);
            }
        }
    }
    Ok(())
}

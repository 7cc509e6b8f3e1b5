use std::collections::BTreeMap;

use dayroll_core::{ActionKey, Dimension, InconsistentKey, Kpis, OpenCount, RollupViews, ViewName};
use serde::Serialize;
use time::Date;

use super::print_json;
use crate::config::DayrollConfig;
use crate::input::{load_views, FilterArgs, InputArgs};
use crate::OutputFormat;

/// Loads, rebuilds and narrows the views for a read-only command.
fn filtered_views(
    input: &InputArgs,
    filter: &FilterArgs,
    config: &DayrollConfig,
) -> Result<RollupViews, String> {
    let views = load_views(input, config)?;
    let filter = filter.to_filter(&views);
    if filter.is_empty() {
        Ok(views)
    } else {
        Ok(views.filtered(&filter))
    }
}

/// Leading characters of an action key, enough to tell actions apart in
/// a terminal.
fn short_key(key: &ActionKey) -> &str {
    key.as_str().get(..12).unwrap_or(key.as_str())
}

#[derive(Serialize)]
struct Summary<'a> {
    first_day: Option<Date>,
    last_day: Option<Date>,
    observed_days: usize,
    counts: BTreeMap<ViewName, usize>,
    kpis: Kpis,
    top_open_zones: Vec<OpenCount>,
    top_open_tags: Vec<OpenCount>,
    diagnostics: &'a [InconsistentKey],
}

fn print_open(dimension: Dimension, counts: &[OpenCount]) {
    println!();
    println!("Open actions by {}:", dimension);
    if counts.is_empty() {
        println!("  none");
    }
    for c in counts {
        println!("  {:<20} {:>8}", c.value, c.open_actions);
    }
}

pub(crate) fn cmd_summary(
    input: &InputArgs,
    filter: &FilterArgs,
    top: usize,
    config: &DayrollConfig,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), String> {
    let views = filtered_views(input, filter, config)?;
    if quiet {
        return Ok(());
    }

    let bounds = views.date_bounds();
    let summary = Summary {
        first_day: bounds.map(|(first, _)| first),
        last_day: bounds.map(|(_, last)| last),
        observed_days: views.observed_days.len(),
        counts: views.counts(),
        kpis: views.kpis(),
        top_open_zones: views.open_by(Dimension::Zone, Some(top)),
        top_open_tags: views.open_by(Dimension::Tag, Some(top)),
        diagnostics: &views.diagnostics,
    };

    match output {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            match bounds {
                Some((first, last)) => println!(
                    "{} to {} ({} sheet day(s))",
                    first, last, summary.observed_days
                ),
                None => println!("no daily rows"),
            }
            println!();
            for (view, rows) in &summary.counts {
                println!("  {:<20} {:>8}", view.as_str(), rows);
            }
            let kpis = &summary.kpis;
            println!();
            println!(
                "running {}  postponed {}  ended {}  completion {:.1}%",
                kpis.running, kpis.postponed, kpis.ended, kpis.completion_rate
            );
            print_open(Dimension::Zone, &summary.top_open_zones);
            print_open(Dimension::Tag, &summary.top_open_tags);
            if !views.diagnostics.is_empty() {
                println!();
                println!("Reopened after closure:");
                for d in &views.diagnostics {
                    println!(
                        "  {}  ended {}  reopened {}",
                        short_key(&d.action_key),
                        d.ended_on,
                        d.reopened_on
                    );
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn cmd_downtime(
    input: &InputArgs,
    filter: &FilterArgs,
    config: &DayrollConfig,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), String> {
    let views = filtered_views(input, filter, config)?;
    if quiet {
        return Ok(());
    }

    match output {
        OutputFormat::Json => print_json(&views.equipment_downtime)?,
        OutputFormat::Text => {
            if views.equipment_downtime.is_empty() {
                println!("no downtime");
                return Ok(());
            }
            println!(
                "{:<16} {:<10} {:<10} {:>5} {:>7}",
                "TAG", "START", "END", "DAYS", "ACTIONS"
            );
            for i in &views.equipment_downtime {
                println!(
                    "{:<16} {:<10} {:<10} {:>5} {:>7}",
                    i.tag,
                    i.start_day.to_string(),
                    i.end_day.to_string(),
                    i.duration_days,
                    i.action_count
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn cmd_transitions(
    input: &InputArgs,
    filter: &FilterArgs,
    config: &DayrollConfig,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), String> {
    let views = filtered_views(input, filter, config)?;
    if quiet {
        return Ok(());
    }

    match output {
        OutputFormat::Json => print_json(&views.transitions)?,
        OutputFormat::Text => {
            if views.transitions.is_empty() {
                println!("no transitions");
                return Ok(());
            }
            println!("{:<10} {:<12} {:<9} {:<9}", "DAY", "ACTION", "FROM", "TO");
            for t in &views.transitions {
                println!(
                    "{:<10} {:<12} {:<9} {:<9}",
                    t.day.to_string(),
                    short_key(&t.action_key),
                    t.from_status.as_str(),
                    t.to_status.as_str()
                );
            }
        }
    }
    Ok(())
}

mod rebuild;
mod report;

pub(crate) use rebuild::cmd_rebuild;
pub(crate) use report::{cmd_downtime, cmd_summary, cmd_transitions};

use serde::Serialize;

/// Pretty-print `value` as JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| format!("serialization: {}", e))?;
    println!("{}", json);
    Ok(())
}

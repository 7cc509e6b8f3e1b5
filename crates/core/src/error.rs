use std::fmt;

use serde::Serialize;

/// Why a raw daily row was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MalformedReason {
    MissingActionKey,
    MissingDay,
    MissingStatus,
    UnknownStatus(String),
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::MissingActionKey => f.write_str("missing action_key"),
            MalformedReason::MissingDay => f.write_str("missing day"),
            MalformedReason::MissingStatus => f.write_str("missing status"),
            MalformedReason::UnknownStatus(s) => write!(f, "unknown status '{}'", s),
        }
    }
}

/// A rejected row, identified by its position in load order and, when
/// known, the sheet it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedRow {
    pub index: usize,
    pub sheet: Option<String>,
    pub action_key: Option<String>,
    pub reason: MalformedReason,
}

impl fmt::Display for MalformedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.index)?;
        if let Some(sheet) = &self.sheet {
            write!(f, " (sheet '{}')", sheet)?;
        }
        if let Some(key) = &self.action_key {
            write!(f, " [{}]", key)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Errors that abort a rollup rebuild.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RollupError {
    /// One or more daily rows lack a required field or carry a status
    /// outside the fixed category set. No view is built.
    #[error("{} malformed daily row(s); first: {}", rows.len(), first_row(rows))]
    MalformedInput { rows: Vec<MalformedRow> },
}

fn first_row(rows: &[MalformedRow]) -> String {
    rows.first().map(ToString::to_string).unwrap_or_default()
}

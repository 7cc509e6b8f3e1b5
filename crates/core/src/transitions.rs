//! Transition extractor: status-change events from `actions_consistent`.

use crate::model::{ConsistentRecord, TransitionEvent};

/// Emits one event per consecutive pair of rows of the same key whose
/// status differs. Expects rows ordered by key, then day, as the
/// reconciler produces them. The first row of a key never yields an event.
pub fn extract_transitions(consistent: &[ConsistentRecord]) -> Vec<TransitionEvent> {
    let events: Vec<TransitionEvent> = consistent
        .windows(2)
        .filter_map(|pair| {
            let (prev, next) = (&pair[0], &pair[1]);
            (prev.action_key == next.action_key && prev.status != next.status).then(|| {
                TransitionEvent {
                    action_key: next.action_key.clone(),
                    day: next.day,
                    from_status: prev.status,
                    to_status: next.status,
                }
            })
        })
        .collect();
    tracing::debug!(events = events.len(), "extracted transitions");
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionKey, ActionMeta, Status};
    use time::macros::date;
    use time::Date;

    fn row(key: &str, day: Date, status: Status) -> ConsistentRecord {
        ConsistentRecord {
            action_key: ActionKey::from(key),
            day,
            status,
            filled: false,
            reopened: false,
            meta: ActionMeta::default(),
        }
    }

    #[test]
    fn constant_status_yields_nothing() {
        let rows = vec![
            row("A", date!(2024 - 01 - 01), Status::Running),
            row("A", date!(2024 - 01 - 02), Status::Running),
        ];
        assert!(extract_transitions(&rows).is_empty());
    }

    #[test]
    fn changes_are_reported_on_the_new_day() {
        let rows = vec![
            row("A", date!(2024 - 01 - 01), Status::Running),
            row("A", date!(2024 - 01 - 02), Status::Postponed),
            row("A", date!(2024 - 01 - 03), Status::Running),
        ];
        let events = extract_transitions(&rows);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].day, date!(2024 - 01 - 02));
        assert_eq!(events[0].from_status, Status::Running);
        assert_eq!(events[0].to_status, Status::Postponed);
        assert_eq!(events[1].to_status, Status::Running);
    }

    #[test]
    fn key_boundaries_are_not_transitions() {
        let rows = vec![
            row("A", date!(2024 - 01 - 01), Status::Ended),
            row("B", date!(2024 - 01 - 01), Status::Running),
        ];
        assert!(extract_transitions(&rows).is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let rows = vec![
            row("A", date!(2024 - 01 - 01), Status::Running),
            row("A", date!(2024 - 01 - 02), Status::Ended),
        ];
        assert_eq!(extract_transitions(&rows), extract_transitions(&rows));
    }
}

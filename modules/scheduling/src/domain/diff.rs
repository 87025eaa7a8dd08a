//! Field-level change detection for event updates.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::{AuditLogEntry, Event, EventField, FieldChange, FieldValue};
use crate::domain::timezone;

/// Event patch whose time inputs have been resolved to instants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub profiles: Option<Vec<Uuid>>,
    pub timezone: Option<String>,
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
}

impl ResolvedPatch {
    fn proposed(&self, field: EventField) -> Option<FieldValue> {
        match field {
            EventField::Title => self.title.clone().map(FieldValue::Text),
            EventField::Description => self.description.clone().map(FieldValue::Text),
            EventField::Profiles => self.profiles.clone().map(FieldValue::ProfileIds),
            EventField::Timezone => self.timezone.clone().map(FieldValue::Text),
            EventField::StartDateTime => self.start_date_time.map(FieldValue::Instant),
            EventField::EndDateTime => self.end_date_time.map(FieldValue::Instant),
        }
    }

    /// Copy of `event` with every supplied field replaced.
    pub fn apply_to(&self, event: &Event) -> Event {
        let mut next = event.clone();
        if let Some(title) = &self.title {
            next.title = title.clone();
        }
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(profiles) = &self.profiles {
            next.profiles = profiles.clone();
        }
        if let Some(tz) = &self.timezone {
            next.timezone = tz.clone();
        }
        if let Some(start) = self.start_date_time {
            next.start_date_time = start;
        }
        if let Some(end) = self.end_date_time {
            next.end_date_time = end;
        }
        next
    }
}

pub fn current_value(event: &Event, field: EventField) -> FieldValue {
    match field {
        EventField::Title => FieldValue::Text(event.title.clone()),
        EventField::Description => FieldValue::Text(event.description.clone()),
        EventField::Profiles => FieldValue::ProfileIds(event.profiles.clone()),
        EventField::Timezone => FieldValue::Text(event.timezone.clone()),
        EventField::StartDateTime => FieldValue::Instant(event.start_date_time),
        EventField::EndDateTime => FieldValue::Instant(event.end_date_time),
    }
}

/// Fields of `patch` whose value differs from `existing`, in `EventField::ORDERED` order.
///
/// Profile lists compare positionally, so a reorder counts as a change.
pub fn compute_changes(existing: &Event, patch: &ResolvedPatch) -> Vec<FieldChange> {
    EventField::ORDERED
        .into_iter()
        .filter_map(|field| {
            let updated = patch.proposed(field)?;
            let previous = current_value(existing, field);
            (previous != updated).then_some(FieldChange {
                field,
                previous,
                updated,
            })
        })
        .collect()
}

impl AuditLogEntry {
    pub fn record(updated_by: Uuid, changes: Vec<FieldChange>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            updated_by,
            changes,
            timestamp: now,
        }
    }
}

/// Human-readable rendering of a logged value for a viewer in `viewer_tz`.
pub fn render_value(value: &FieldValue, viewer_tz: &str, names: &HashMap<Uuid, String>) -> String {
    match value {
        FieldValue::Text(text) => text.clone(),
        FieldValue::ProfileIds(ids) => ids
            .iter()
            .map(|id| names.get(id).cloned().unwrap_or_else(|| id.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
        FieldValue::Instant(instant) => timezone::format_for_display(Some(*instant), viewer_tz),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event() -> Event {
        let start = Utc.with_ymd_and_hms(2030, 1, 10, 14, 0, 0).unwrap();
        Event {
            id: Uuid::new_v4(),
            title: "Sync".into(),
            description: String::new(),
            profiles: vec![Uuid::from_u128(1), Uuid::from_u128(2)],
            timezone: "America/New_York".into(),
            start_date_time: start,
            end_date_time: start + chrono::Duration::hours(1),
            created_by: Uuid::from_u128(1),
            update_logs: vec![],
            version: 0,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn empty_patch_has_no_changes() {
        assert!(compute_changes(&event(), &ResolvedPatch::default()).is_empty());
    }

    #[test]
    fn identical_values_are_not_changes() {
        let e = event();
        let patch = ResolvedPatch {
            title: Some("Sync".into()),
            profiles: Some(e.profiles.clone()),
            start_date_time: Some(e.start_date_time),
            ..Default::default()
        };
        assert!(compute_changes(&e, &patch).is_empty());
    }

    #[test]
    fn title_change_is_reported() {
        let e = event();
        let patch = ResolvedPatch {
            title: Some("Sync Call".into()),
            ..Default::default()
        };
        let changes = compute_changes(&e, &patch);
        assert_eq!(
            changes,
            vec![FieldChange {
                field: EventField::Title,
                previous: FieldValue::Text("Sync".into()),
                updated: FieldValue::Text("Sync Call".into()),
            }]
        );
    }

    #[test]
    fn changes_follow_canonical_field_order() {
        let e = event();
        let patch = ResolvedPatch {
            end_date_time: Some(e.end_date_time + chrono::Duration::minutes(30)),
            timezone: Some("Europe/Paris".into()),
            description: Some("agenda".into()),
            title: Some("Sync 2".into()),
            ..Default::default()
        };
        let fields: Vec<_> = compute_changes(&e, &patch)
            .into_iter()
            .map(|c| c.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                EventField::Title,
                EventField::Description,
                EventField::Timezone,
                EventField::EndDateTime
            ]
        );
    }

    #[test]
    fn reordered_profiles_count_as_change() {
        let e = event();
        let patch = ResolvedPatch {
            profiles: Some(vec![Uuid::from_u128(2), Uuid::from_u128(1)]),
            ..Default::default()
        };
        let changes = compute_changes(&e, &patch);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, EventField::Profiles);
    }

    #[test]
    fn diff_does_not_touch_existing_and_apply_does() {
        let e = event();
        let patch = ResolvedPatch {
            title: Some("Other".into()),
            ..Default::default()
        };
        let _ = compute_changes(&e, &patch);
        assert_eq!(e.title, "Sync");

        let next = patch.apply_to(&e);
        assert_eq!(next.title, "Other");
        assert_eq!(next.profiles, e.profiles);
    }

    #[test]
    fn render_values_for_viewer() {
        let names: HashMap<_, _> = [(Uuid::from_u128(1), "Ann".to_string())].into();
        assert_eq!(
            render_value(
                &FieldValue::ProfileIds(vec![Uuid::from_u128(1), Uuid::from_u128(9)]),
                "UTC",
                &names
            ),
            format!("Ann, {}", Uuid::from_u128(9))
        );
        let at = Utc.with_ymd_and_hms(2030, 1, 10, 14, 0, 0).unwrap();
        assert_eq!(
            render_value(&FieldValue::Instant(at), "America/New_York", &names),
            "Jan 10, 2030 at 9:00 AM"
        );
        assert_eq!(
            render_value(&FieldValue::Text("x".into()), "UTC", &names),
            "x"
        );
    }
}

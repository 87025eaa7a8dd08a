//! Conversions between stored rows and contract models.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contract::model::{AuditLogEntry, Event, EventField, FieldChange, FieldValue, Profile};
use crate::infra::storage::entities::{event, event_update_log, profile};

impl From<profile::Model> for Profile {
    fn from(m: profile::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            timezone: m.timezone,
            is_active: m.is_active,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// On-disk shape of a logged value; tagged so instants never read back as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
enum StoredValue {
    Text(String),
    ProfileIds(Vec<Uuid>),
    Instant(DateTime<Utc>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChange {
    field: String,
    previous: StoredValue,
    updated: StoredValue,
}

impl From<&FieldValue> for StoredValue {
    fn from(v: &FieldValue) -> Self {
        match v {
            FieldValue::Text(s) => Self::Text(s.clone()),
            FieldValue::ProfileIds(ids) => Self::ProfileIds(ids.clone()),
            FieldValue::Instant(t) => Self::Instant(*t),
        }
    }
}

impl From<StoredValue> for FieldValue {
    fn from(v: StoredValue) -> Self {
        match v {
            StoredValue::Text(s) => Self::Text(s),
            StoredValue::ProfileIds(ids) => Self::ProfileIds(ids),
            StoredValue::Instant(t) => Self::Instant(t),
        }
    }
}

pub fn changes_to_json(changes: &[FieldChange]) -> anyhow::Result<serde_json::Value> {
    let stored: Vec<StoredChange> = changes
        .iter()
        .map(|c| StoredChange {
            field: c.field.as_str().to_string(),
            previous: (&c.previous).into(),
            updated: (&c.updated).into(),
        })
        .collect();
    serde_json::to_value(stored).context("serialize changes")
}

pub fn changes_from_json(value: serde_json::Value) -> anyhow::Result<Vec<FieldChange>> {
    let stored: Vec<StoredChange> =
        serde_json::from_value(value).context("deserialize changes")?;
    stored
        .into_iter()
        .map(|c| {
            let field = EventField::parse(&c.field)
                .with_context(|| format!("unknown event field '{}'", c.field))?;
            Ok(FieldChange {
                field,
                previous: c.previous.into(),
                updated: c.updated.into(),
            })
        })
        .collect()
}

pub fn profiles_to_json(ids: &[Uuid]) -> anyhow::Result<serde_json::Value> {
    serde_json::to_value(ids).context("serialize profile ids")
}

pub fn log_from_model(m: event_update_log::Model) -> anyhow::Result<AuditLogEntry> {
    Ok(AuditLogEntry {
        id: m.id,
        updated_by: m.updated_by,
        changes: changes_from_json(m.changes)?,
        timestamp: m.timestamp,
    })
}

/// Build an event from its row and log rows (any order).
pub fn event_from_models(
    m: event::Model,
    mut logs: Vec<event_update_log::Model>,
) -> anyhow::Result<Event> {
    logs.sort_by_key(|l| l.seq);
    let update_logs = logs
        .into_iter()
        .map(log_from_model)
        .collect::<anyhow::Result<Vec<_>>>()?;
    let profiles: Vec<Uuid> = serde_json::from_value(m.profiles)
        .with_context(|| format!("event {} has malformed profiles", m.id))?;

    Ok(Event {
        id: m.id,
        title: m.title,
        description: m.description,
        profiles,
        timezone: m.timezone,
        start_date_time: m.start_date_time,
        end_date_time: m.end_date_time,
        created_by: m.created_by,
        update_logs,
        version: m.version,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stored_changes_keep_value_kinds() {
        let at = Utc.with_ymd_and_hms(2030, 5, 1, 12, 0, 0).unwrap();
        let changes = vec![
            FieldChange {
                field: EventField::Title,
                previous: FieldValue::Text("2030-05-01T12:00:00Z".into()),
                updated: FieldValue::Text("b".into()),
            },
            FieldChange {
                field: EventField::StartDateTime,
                previous: FieldValue::Instant(at),
                updated: FieldValue::Instant(at + chrono::Duration::hours(1)),
            },
        ];

        let json = changes_to_json(&changes).unwrap();
        assert_eq!(json[0]["field"], "title");
        assert_eq!(json[1]["previous"]["type"], "instant");
        assert_eq!(changes_from_json(json).unwrap(), changes);
    }

    #[test]
    fn unknown_field_is_an_error() {
        let json = serde_json::json!([{
            "field": "color",
            "previous": {"type": "text", "value": "a"},
            "updated": {"type": "text", "value": "b"}
        }]);
        assert!(changes_from_json(json).is_err());
    }
}

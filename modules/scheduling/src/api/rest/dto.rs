use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::contract::model::{
    Agenda, AgendaItem, AuditLogEntry, ChangeView, DateTimeInput, EventLogs, EventPatch,
    EventView, FieldChange, FieldValue, LogView, NewEvent, NewProfile, Profile, ProfileRef,
    ProfileSummary, TimezoneInfo, ZoneTime,
};
use crate::domain::error::DomainError;
use crate::domain::service::REQUIRED_EVENT_FIELDS;
use crate::domain::timezone;

// --- profiles ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub id: Uuid,
    pub name: String,
    pub timezone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileDto {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            name: p.name,
            timezone: p.timezone,
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileReq {
    pub name: Option<String>,
    pub timezone: Option<String>,
}

impl From<CreateProfileReq> for NewProfile {
    fn from(req: CreateProfileReq) -> Self {
        Self {
            name: req.name.unwrap_or_default(),
            timezone: req.timezone,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimezoneReq {
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimezoneDto {
    pub timezone: String,
    pub offset: String,
    pub current_time: String,
}

impl From<TimezoneInfo> for TimezoneDto {
    fn from(t: TimezoneInfo) -> Self {
        Self {
            timezone: t.timezone,
            offset: t.offset,
            current_time: t.current_time,
        }
    }
}

/// `?at=2025-01-15T09:00&timezone=America/New_York&zones=UTC,Asia/Tokyo`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimesQuery {
    pub at: Option<String>,
    /// Zone for a wall-clock `at`; UTC when absent.
    pub timezone: Option<String>,
    /// Comma-separated targets; the curated list when absent.
    pub zones: Option<String>,
}

impl TimesQuery {
    pub fn into_parts(self) -> Result<(DateTimeInput, String, Vec<String>), DomainError> {
        let at = self
            .at
            .ok_or_else(|| DomainError::validation("at is required"))?;
        let at = parse_time(&at, "at")?;
        let zones = self
            .zones
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|z| !z.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok((at, self.timezone.unwrap_or_else(|| "UTC".to_string()), zones))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneTimeDto {
    pub timezone: String,
    pub time: String,
}

impl From<ZoneTime> for ZoneTimeDto {
    fn from(z: ZoneTime) -> Self {
        Self {
            timezone: z.timezone,
            time: z.time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummaryDto {
    pub id: Uuid,
    pub name: String,
    pub timezone: String,
}

impl From<ProfileSummary> for ProfileSummaryDto {
    fn from(p: ProfileSummary) -> Self {
        Self {
            id: p.id,
            name: p.name,
            timezone: p.timezone,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileRefDto {
    pub id: Uuid,
    pub name: String,
}

impl From<ProfileRef> for ProfileRefDto {
    fn from(p: ProfileRef) -> Self {
        Self {
            id: p.id,
            name: p.name,
        }
    }
}

// --- events ---

/// Raw JSON form of a logged value.
pub fn field_value_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(s) => Value::String(s.clone()),
        FieldValue::ProfileIds(ids) => {
            Value::Array(ids.iter().map(|id| Value::String(id.to_string())).collect())
        }
        FieldValue::Instant(t) => Value::String(t.to_rfc3339()),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldChangeDto {
    pub field: &'static str,
    pub previous: Value,
    pub updated: Value,
}

impl From<&FieldChange> for FieldChangeDto {
    fn from(c: &FieldChange) -> Self {
        Self {
            field: c.field.as_str(),
            previous: field_value_json(&c.previous),
            updated: field_value_json(&c.updated),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLogDto {
    pub id: Uuid,
    pub updated_by: Uuid,
    pub changes: Vec<FieldChangeDto>,
    pub timestamp: DateTime<Utc>,
}

impl From<&AuditLogEntry> for UpdateLogDto {
    fn from(log: &AuditLogEntry) -> Self {
        Self {
            id: log.id,
            updated_by: log.updated_by,
            changes: log.changes.iter().map(FieldChangeDto::from).collect(),
            timestamp: log.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Resolved assignees; ids that no longer resolve are omitted.
    pub profiles: Vec<ProfileSummaryDto>,
    pub timezone: String,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    /// `null` when the creator no longer resolves.
    pub created_by: Option<ProfileRefDto>,
    pub update_logs: Vec<UpdateLogDto>,
    pub is_ongoing: bool,
    pub duration_hours: f64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventDto {
    pub fn at(view: EventView, now: DateTime<Utc>) -> Self {
        let e = view.event;
        Self {
            is_ongoing: e.is_ongoing_at(now),
            duration_hours: e.duration_hours(),
            update_logs: e.update_logs.iter().map(UpdateLogDto::from).collect(),
            profiles: view.profiles.into_iter().map(Into::into).collect(),
            created_by: view.created_by.map(Into::into),
            id: e.id,
            title: e.title,
            description: e.description,
            timezone: e.timezone,
            start_date_time: e.start_date_time,
            end_date_time: e.end_date_time,
            version: e.version,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

impl From<EventView> for EventDto {
    fn from(view: EventView) -> Self {
        Self::at(view, Utc::now())
    }
}

fn parse_time(raw: &str, field: &str) -> Result<DateTimeInput, DomainError> {
    timezone::parse_input(raw).ok_or_else(|| DomainError::validation(format!("Invalid {field}")))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventReq {
    pub title: Option<String>,
    pub description: Option<String>,
    pub profiles: Option<Vec<Uuid>>,
    pub timezone: Option<String>,
    /// RFC 3339 instant, or a wall-clock time read in `timezone`.
    pub start_date_time: Option<String>,
    pub end_date_time: Option<String>,
    pub created_by: Option<Uuid>,
}

impl TryFrom<CreateEventReq> for NewEvent {
    type Error = DomainError;

    fn try_from(req: CreateEventReq) -> Result<Self, Self::Error> {
        let (
            Some(title),
            Some(profiles),
            Some(timezone),
            Some(start),
            Some(end),
            Some(created_by),
        ) = (
            req.title,
            req.profiles,
            req.timezone,
            req.start_date_time,
            req.end_date_time,
            req.created_by,
        )
        else {
            return Err(DomainError::validation(REQUIRED_EVENT_FIELDS));
        };

        Ok(Self {
            title,
            description: req.description,
            profiles,
            timezone,
            start_date_time: parse_time(&start, "startDateTime")?,
            end_date_time: parse_time(&end, "endDateTime")?,
            created_by,
        })
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventReq {
    pub updated_by: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub profiles: Option<Vec<Uuid>>,
    pub timezone: Option<String>,
    pub start_date_time: Option<String>,
    pub end_date_time: Option<String>,
}

impl UpdateEventReq {
    pub fn into_parts(self) -> Result<(Option<Uuid>, EventPatch), DomainError> {
        let patch = EventPatch {
            title: self.title,
            description: self.description,
            profiles: self.profiles,
            timezone: self.timezone,
            start_date_time: self
                .start_date_time
                .map(|raw| parse_time(&raw, "startDateTime"))
                .transpose()?,
            end_date_time: self
                .end_date_time
                .map(|raw| parse_time(&raw, "endDateTime"))
                .transpose()?,
        };
        Ok((self.updated_by, patch))
    }
}

// --- logs ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    /// Viewer timezone used for display strings; UTC when absent.
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDto {
    pub field: &'static str,
    pub field_name: &'static str,
    pub previous: Value,
    pub updated: Value,
    pub previous_display: String,
    pub updated_display: String,
}

impl From<ChangeView> for ChangeDto {
    fn from(c: ChangeView) -> Self {
        Self {
            field: c.field.as_str(),
            field_name: c.field.display_name(),
            previous: field_value_json(&c.previous),
            updated: field_value_json(&c.updated),
            previous_display: c.previous_display,
            updated_display: c.updated_display,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogDto {
    pub id: Uuid,
    pub updated_by: Uuid,
    pub updated_by_profile: Option<ProfileRefDto>,
    pub timestamp: DateTime<Utc>,
    pub timestamp_display: String,
    pub changes: Vec<ChangeDto>,
}

impl From<LogView> for LogDto {
    fn from(l: LogView) -> Self {
        Self {
            id: l.id,
            updated_by: l.updated_by,
            updated_by_profile: l.updated_by_profile.map(Into::into),
            timestamp: l.timestamp,
            timestamp_display: l.timestamp_display,
            changes: l.changes.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogsDto {
    pub event_title: String,
    pub logs: Vec<LogDto>,
}

impl From<EventLogs> for EventLogsDto {
    fn from(l: EventLogs) -> Self {
        Self {
            event_title: l.event_title,
            logs: l.logs.into_iter().map(Into::into).collect(),
        }
    }
}

// --- agenda ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItemDto {
    #[serde(flatten)]
    pub event: EventDto,
    pub local_start: String,
    pub local_end: String,
    pub event_local_start: String,
    pub event_local_end: String,
}

impl From<AgendaItem> for AgendaItemDto {
    fn from(item: AgendaItem) -> Self {
        let mut event = EventDto::from(item.event);
        event.is_ongoing = item.is_ongoing;
        event.duration_hours = item.duration_hours;
        Self {
            event,
            local_start: item.local_start,
            local_end: item.local_end,
            event_local_start: item.event_local_start,
            event_local_end: item.event_local_end,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaDto {
    pub profile: ProfileDto,
    pub offset: String,
    pub events: Vec<AgendaItemDto>,
}

impl From<Agenda> for AgendaDto {
    fn from(a: Agenda) -> Self {
        Self {
            profile: a.profile.into(),
            offset: a.offset,
            events: a.items.into_iter().map(Into::into).collect(),
        }
    }
}

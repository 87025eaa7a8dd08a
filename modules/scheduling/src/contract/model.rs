use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

/// Pure profile model for inter-module communication (no serde)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub timezone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new profile; `timezone` falls back to the configured default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewProfile {
    pub name: String,
    pub timezone: Option<String>,
}

/// Profile as populated into event views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub name: String,
    pub timezone: String,
}

/// Name-only reference (event creator, log author).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRef {
    pub id: Uuid,
    pub name: String,
}

impl From<&Profile> for ProfileSummary {
    fn from(p: &Profile) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            timezone: p.timezone.clone(),
        }
    }
}

impl From<&Profile> for ProfileRef {
    fn from(p: &Profile) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    /// Empty when the event has no description.
    pub description: String,
    pub profiles: Vec<Uuid>,
    pub timezone: String,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub created_by: Uuid,
    /// Oldest first.
    pub update_logs: Vec<AuditLogEntry>,
    /// Revision counter used for optimistic locking; starts at 0.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_ongoing_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date_time <= now && now <= self.end_date_time
    }

    /// Length in hours, rounded to two decimals.
    pub fn duration_hours(&self) -> f64 {
        let ms = (self.end_date_time - self.start_date_time).num_milliseconds() as f64;
        (ms / 3_600_000.0 * 100.0).round() / 100.0
    }
}

/// A client-supplied point in time: either an absolute instant or a
/// zone-naive wall-clock time to be read in the event's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeInput {
    Instant(DateTime<Utc>),
    Local(NaiveDateTime),
}

impl From<DateTime<Utc>> for DateTimeInput {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Instant(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub profiles: Vec<Uuid>,
    pub timezone: String,
    pub start_date_time: DateTimeInput,
    pub end_date_time: DateTimeInput,
    pub created_by: Uuid,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub profiles: Option<Vec<Uuid>>,
    pub timezone: Option<String>,
    pub start_date_time: Option<DateTimeInput>,
    pub end_date_time: Option<DateTimeInput>,
}

/// Event fields tracked by the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventField {
    Title,
    Description,
    Profiles,
    Timezone,
    StartDateTime,
    EndDateTime,
}

impl EventField {
    /// Comparison and reporting order.
    pub const ORDERED: [EventField; 6] = [
        EventField::Title,
        EventField::Description,
        EventField::Profiles,
        EventField::Timezone,
        EventField::StartDateTime,
        EventField::EndDateTime,
    ];

    /// Wire name, as used in JSON bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            EventField::Title => "title",
            EventField::Description => "description",
            EventField::Profiles => "profiles",
            EventField::Timezone => "timezone",
            EventField::StartDateTime => "startDateTime",
            EventField::EndDateTime => "endDateTime",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            EventField::Title => "Event Title",
            EventField::Description => "Description",
            EventField::Profiles => "Assigned Profiles",
            EventField::Timezone => "Timezone",
            EventField::StartDateTime => "Start Time",
            EventField::EndDateTime => "End Time",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ORDERED.into_iter().find(|f| f.as_str() == s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    ProfileIds(Vec<Uuid>),
    Instant(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: EventField,
    pub previous: FieldValue,
    pub updated: FieldValue,
}

/// One update's field-level diff. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub updated_by: Uuid,
    pub changes: Vec<FieldChange>,
    pub timestamp: DateTime<Utc>,
}

/// Event with its profile references resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct EventView {
    pub event: Event,
    pub profiles: Vec<ProfileSummary>,
    pub created_by: Option<ProfileRef>,
}

/// A change rendered for a viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeView {
    pub field: EventField,
    pub previous: FieldValue,
    pub updated: FieldValue,
    pub previous_display: String,
    pub updated_display: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogView {
    pub id: Uuid,
    pub updated_by: Uuid,
    /// `None` when the author profile no longer resolves.
    pub updated_by_profile: Option<ProfileRef>,
    pub timestamp: DateTime<Utc>,
    pub timestamp_display: String,
    pub changes: Vec<ChangeView>,
}

/// Update history of one event, most recent entry first.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLogs {
    pub event_title: String,
    pub logs: Vec<LogView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimezoneInfo {
    pub timezone: String,
    pub offset: String,
    /// Wall clock right now, in datetime-local input form.
    pub current_time: String,
}

/// One moment as read in a given timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTime {
    pub timezone: String,
    pub time: String,
}

/// An event as seen from one profile's timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct AgendaItem {
    pub event: EventView,
    /// Start/end in the viewer's timezone.
    pub local_start: String,
    pub local_end: String,
    /// Start/end in the event's own timezone.
    pub event_local_start: String,
    pub event_local_end: String,
    pub is_ongoing: bool,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Agenda {
    pub profile: Profile,
    pub offset: String,
    pub items: Vec<AgendaItem>,
}

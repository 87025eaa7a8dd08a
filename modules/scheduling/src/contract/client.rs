use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    error::SchedulingError,
    model::{
        Agenda, DateTimeInput, EventLogs, EventPatch, EventView, NewEvent, NewProfile, Profile,
        TimezoneInfo, ZoneTime,
    },
};

/// Public API of the scheduling module for in-process consumers
#[async_trait]
pub trait SchedulingApi: Send + Sync {
    /// Active profiles only
    async fn list_profiles(&self) -> Result<Vec<Profile>, SchedulingError>;

    async fn get_profile(&self, id: Uuid) -> Result<Profile, SchedulingError>;

    async fn create_profile(&self, new_profile: NewProfile) -> Result<Profile, SchedulingError>;

    async fn update_profile_timezone(
        &self,
        id: Uuid,
        timezone: String,
    ) -> Result<Profile, SchedulingError>;

    /// Curated timezones with their current offsets
    async fn timezones(&self) -> Result<Vec<TimezoneInfo>, SchedulingError>;

    /// One moment rendered in each target zone; empty targets mean the curated list
    async fn times_across(
        &self,
        at: DateTimeInput,
        input_timezone: &str,
        targets: &[String],
    ) -> Result<Vec<ZoneTime>, SchedulingError>;

    /// Events of a profile rendered in that profile's timezone
    async fn agenda(&self, profile_id: Uuid) -> Result<Agenda, SchedulingError>;

    async fn list_events(&self) -> Result<Vec<EventView>, SchedulingError>;

    async fn list_events_for_profile(
        &self,
        profile_id: Uuid,
    ) -> Result<Vec<EventView>, SchedulingError>;

    async fn list_upcoming_events(&self) -> Result<Vec<EventView>, SchedulingError>;

    async fn create_event(&self, new_event: NewEvent) -> Result<EventView, SchedulingError>;

    /// `updated_by` is required whenever the patch changes something
    async fn update_event(
        &self,
        id: Uuid,
        updated_by: Option<Uuid>,
        patch: EventPatch,
    ) -> Result<EventView, SchedulingError>;

    /// Update history, most recent first, rendered in `viewer_timezone`
    async fn event_logs(
        &self,
        id: Uuid,
        viewer_timezone: &str,
    ) -> Result<EventLogs, SchedulingError>;
}

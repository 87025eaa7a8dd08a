use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::contract::{
    client::SchedulingApi,
    error::SchedulingError,
    model::{
        Agenda, DateTimeInput, EventLogs, EventPatch, EventView, NewEvent, NewProfile, Profile,
        TimezoneInfo, ZoneTime,
    },
};
use crate::domain::service::Service;

/// In-process `SchedulingApi` backed directly by the domain service
pub struct SchedulingLocalClient {
    service: Arc<Service>,
}

impl SchedulingLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl SchedulingApi for SchedulingLocalClient {
    async fn list_profiles(&self) -> Result<Vec<Profile>, SchedulingError> {
        self.service.list_profiles().await.map_err(Into::into)
    }

    async fn get_profile(&self, id: Uuid) -> Result<Profile, SchedulingError> {
        self.service.get_profile(id).await.map_err(Into::into)
    }

    async fn create_profile(&self, new_profile: NewProfile) -> Result<Profile, SchedulingError> {
        self.service
            .create_profile(new_profile)
            .await
            .map_err(Into::into)
    }

    async fn update_profile_timezone(
        &self,
        id: Uuid,
        timezone: String,
    ) -> Result<Profile, SchedulingError> {
        self.service
            .update_profile_timezone(id, &timezone)
            .await
            .map_err(Into::into)
    }

    async fn timezones(&self) -> Result<Vec<TimezoneInfo>, SchedulingError> {
        Ok(self.service.timezones())
    }

    async fn times_across(
        &self,
        at: DateTimeInput,
        input_timezone: &str,
        targets: &[String],
    ) -> Result<Vec<ZoneTime>, SchedulingError> {
        self.service
            .times_across(at, input_timezone, targets)
            .map_err(Into::into)
    }

    async fn agenda(&self, profile_id: Uuid) -> Result<Agenda, SchedulingError> {
        self.service.agenda(profile_id).await.map_err(Into::into)
    }

    async fn list_events(&self) -> Result<Vec<EventView>, SchedulingError> {
        self.service.list_events().await.map_err(Into::into)
    }

    async fn list_events_for_profile(
        &self,
        profile_id: Uuid,
    ) -> Result<Vec<EventView>, SchedulingError> {
        self.service
            .list_events_for_profile(profile_id)
            .await
            .map_err(Into::into)
    }

    async fn list_upcoming_events(&self) -> Result<Vec<EventView>, SchedulingError> {
        self.service.list_upcoming_events().await.map_err(Into::into)
    }

    async fn create_event(&self, new_event: NewEvent) -> Result<EventView, SchedulingError> {
        self.service.create_event(new_event).await.map_err(Into::into)
    }

    async fn update_event(
        &self,
        id: Uuid,
        updated_by: Option<Uuid>,
        patch: EventPatch,
    ) -> Result<EventView, SchedulingError> {
        self.service
            .update_event(id, updated_by, patch)
            .await
            .map_err(Into::into)
    }

    async fn event_logs(
        &self,
        id: Uuid,
        viewer_timezone: &str,
    ) -> Result<EventLogs, SchedulingError> {
        self.service
            .event_logs(id, viewer_timezone)
            .await
            .map_err(Into::into)
    }
}

use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::model::{AuditLogEntry, Event, Profile};

/// Persistence port for profiles.
#[async_trait]
pub trait ProfilesRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Profile>>;
    /// Profiles with `is_active = true`, oldest first.
    async fn list_active(&self) -> anyhow::Result<Vec<Profile>>;
    /// Every stored profile among `ids` (active or not); unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Profile>>;
    async fn active_name_exists(&self, name: &str) -> anyhow::Result<bool>;
    async fn insert(&self, profile: Profile) -> anyhow::Result<()>;
    async fn update(&self, profile: Profile) -> anyhow::Result<()>;
}

/// Persistence port for events and their update logs.
#[async_trait]
pub trait EventsRepository: Send + Sync {
    /// Load an event together with its update log (oldest entry first).
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Event>>;
    /// All events ordered by `start_date_time` ascending.
    async fn list_all(&self) -> anyhow::Result<Vec<Event>>;
    async fn insert(&self, event: Event) -> anyhow::Result<()>;
    /// Write `event` only if the stored version still equals `expected_version`,
    /// appending `log` in the same transaction.
    ///
    /// Returns `false` when another writer got there first; nothing is written then.
    async fn update_versioned(
        &self,
        event: &Event,
        expected_version: i64,
        log: Option<&AuditLogEntry>,
    ) -> anyhow::Result<bool>;
}

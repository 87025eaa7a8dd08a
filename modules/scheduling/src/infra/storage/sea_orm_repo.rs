//! SeaORM-backed implementations of the domain repository ports.
//!
//! Both repositories are generic over the connection so tests and the server
//! can hand in a `DatabaseConnection` directly.

use anyhow::Context;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::contract::model::{AuditLogEntry, Event, Profile};
use crate::domain::repo::{EventsRepository, ProfilesRepository};
use crate::infra::storage::entities::{event, event_update_log, profile};
use crate::infra::storage::mapper;

pub struct SeaOrmProfilesRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmProfilesRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

fn profile_am(p: Profile) -> profile::ActiveModel {
    profile::ActiveModel {
        id: Set(p.id),
        name: Set(p.name),
        timezone: Set(p.timezone),
        is_active: Set(p.is_active),
        created_at: Set(p.created_at),
        updated_at: Set(p.updated_at),
    }
}

#[async_trait::async_trait]
impl<C> ProfilesRepository for SeaOrmProfilesRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Profile>> {
        let found = profile::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("profile find_by_id failed")?;
        Ok(found.map(Into::into))
    }

    async fn list_active(&self) -> anyhow::Result<Vec<Profile>> {
        let rows = profile::Entity::find()
            .filter(profile::Column::IsActive.eq(true))
            .order_by_asc(profile::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list_active failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = profile::Entity::find()
            .filter(profile::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("find_by_ids failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn active_name_exists(&self, name: &str) -> anyhow::Result<bool> {
        let count = profile::Entity::find()
            .filter(profile::Column::Name.eq(name))
            .filter(profile::Column::IsActive.eq(true))
            .count(&self.conn)
            .await
            .context("active_name_exists failed")?;
        Ok(count > 0)
    }

    async fn insert(&self, p: Profile) -> anyhow::Result<()> {
        let _ = profile_am(p)
            .insert(&self.conn)
            .await
            .context("profile insert failed")?;
        Ok(())
    }

    async fn update(&self, p: Profile) -> anyhow::Result<()> {
        let _ = profile_am(p)
            .update(&self.conn)
            .await
            .context("profile update failed")?;
        Ok(())
    }
}

pub struct SeaOrmEventsRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmEventsRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl<C> EventsRepository for SeaOrmEventsRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Event>> {
        let found = event::Entity::find_by_id(id)
            .find_with_related(event_update_log::Entity)
            .all(&self.conn)
            .await
            .context("event find_by_id failed")?;

        found
            .into_iter()
            .next()
            .map(|(row, logs)| mapper::event_from_models(row, logs))
            .transpose()
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Event>> {
        let rows = event::Entity::find()
            .order_by_asc(event::Column::StartDateTime)
            .find_with_related(event_update_log::Entity)
            .all(&self.conn)
            .await
            .context("list_all failed")?;

        let mut events = rows
            .into_iter()
            .map(|(row, logs)| mapper::event_from_models(row, logs))
            .collect::<anyhow::Result<Vec<_>>>()?;
        events.sort_by_key(|e| (e.start_date_time, e.created_at));
        Ok(events)
    }

    async fn insert(&self, e: Event) -> anyhow::Result<()> {
        let m = event::ActiveModel {
            id: Set(e.id),
            title: Set(e.title),
            description: Set(e.description),
            profiles: Set(mapper::profiles_to_json(&e.profiles)?),
            timezone: Set(e.timezone),
            start_date_time: Set(e.start_date_time),
            end_date_time: Set(e.end_date_time),
            created_by: Set(e.created_by),
            version: Set(e.version),
            created_at: Set(e.created_at),
            updated_at: Set(e.updated_at),
        };
        let _ = m.insert(&self.conn).await.context("event insert failed")?;
        Ok(())
    }

    async fn update_versioned(
        &self,
        e: &Event,
        expected_version: i64,
        log: Option<&AuditLogEntry>,
    ) -> anyhow::Result<bool> {
        let txn = self.conn.begin().await.context("begin transaction failed")?;

        let changes = event::ActiveModel {
            title: Set(e.title.clone()),
            description: Set(e.description.clone()),
            profiles: Set(mapper::profiles_to_json(&e.profiles)?),
            timezone: Set(e.timezone.clone()),
            start_date_time: Set(e.start_date_time),
            end_date_time: Set(e.end_date_time),
            version: Set(e.version),
            updated_at: Set(e.updated_at),
            ..Default::default()
        };
        let res = event::Entity::update_many()
            .set(changes)
            .filter(event::Column::Id.eq(e.id))
            .filter(event::Column::Version.eq(expected_version))
            .exec(&txn)
            .await
            .context("versioned event update failed")?;

        if res.rows_affected == 0 {
            txn.rollback().await.context("rollback failed")?;
            return Ok(false);
        }

        if let Some(log) = log {
            let seq = event_update_log::Entity::find()
                .filter(event_update_log::Column::EventId.eq(e.id))
                .count(&txn)
                .await
                .context("count update logs failed")?;

            event_update_log::ActiveModel {
                id: Set(log.id),
                event_id: Set(e.id),
                seq: Set(seq as i64 + 1),
                updated_by: Set(log.updated_by),
                changes: Set(mapper::changes_to_json(&log.changes)?),
                timestamp: Set(log.timestamp),
            }
            .insert(&txn)
            .await
            .context("update log insert failed")?;
        }

        txn.commit().await.context("commit failed")?;
        Ok(true)
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use scheduling::{
    contract::model::{DateTimeInput, NewEvent, NewProfile, Profile},
    domain::{
        repo::{EventsRepository, ProfilesRepository},
        service::{Service, ServiceConfig},
    },
    infra::storage::{migrations::Migrator, SeaOrmEventsRepository, SeaOrmProfilesRepository},
};

/// Fresh in-memory database with the schema applied.
///
/// A single pooled connection keeps every query on the same in-memory database.
pub async fn create_test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub fn repos(
    db: &DatabaseConnection,
) -> (
    Arc<SeaOrmProfilesRepository<DatabaseConnection>>,
    Arc<SeaOrmEventsRepository<DatabaseConnection>>,
) {
    (
        Arc::new(SeaOrmProfilesRepository::new(db.clone())),
        Arc::new(SeaOrmEventsRepository::new(db.clone())),
    )
}

pub fn service_with(
    profiles: Arc<dyn ProfilesRepository>,
    events: Arc<dyn EventsRepository>,
) -> Arc<Service> {
    Arc::new(Service::new(profiles, events, ServiceConfig::default()))
}

pub async fn create_test_service() -> (Arc<Service>, DatabaseConnection) {
    let db = create_test_db().await;
    let (profiles, events) = repos(&db);
    (service_with(profiles, events), db)
}

pub async fn profile(svc: &Service, name: &str, tz: &str) -> Profile {
    svc.create_profile(NewProfile {
        name: name.to_string(),
        timezone: Some(tz.to_string()),
    })
    .await
    .expect("create profile")
}

/// Whole-minute instant `hours` from now.
pub fn hours_from_now(hours: i64) -> DateTime<Utc> {
    let t = Utc::now() + Duration::hours(hours);
    t - Duration::seconds(t.timestamp() % 60)
        - Duration::nanoseconds(i64::from(t.timestamp_subsec_nanos()))
}

pub fn new_event(title: &str, owner: &Profile, start_in_hours: i64, hours: i64) -> NewEvent {
    let start = hours_from_now(start_in_hours);
    NewEvent {
        title: title.to_string(),
        description: None,
        profiles: vec![owner.id],
        timezone: owner.timezone.clone(),
        start_date_time: DateTimeInput::Instant(start),
        end_date_time: DateTimeInput::Instant(start + Duration::hours(hours)),
        created_by: owner.id,
    }
}

pub fn random_id() -> Uuid {
    Uuid::new_v4()
}

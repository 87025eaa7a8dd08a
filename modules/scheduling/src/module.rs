use std::sync::Arc;

use anyhow::Context;
use arc_swap::ArcSwapOption;
use axum::Router;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::SchedulingConfig;
use crate::contract::client::SchedulingApi;
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::SchedulingLocalClient;
use crate::infra::storage::{
    migrations::Migrator, SeaOrmEventsRepository, SeaOrmProfilesRepository,
};

/// Scheduling module: profiles, events and their audit trail.
///
/// Lifecycle: `migrate` once per database, then `init`, then
/// `register_rest` / `client` as many times as needed.
pub struct Scheduling {
    service: ArcSwapOption<Service>,
}

impl Default for Scheduling {
    fn default() -> Self {
        Self {
            service: ArcSwapOption::from(None),
        }
    }
}

impl Scheduling {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the schema up to date.
    pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running scheduling migrations");
        Migrator::up(db, None)
            .await
            .context("scheduling migrations failed")?;
        Ok(())
    }

    /// Wire repositories and the domain service over `db`.
    pub fn init(&self, cfg: SchedulingConfig, db: DatabaseConnection) -> anyhow::Result<()> {
        debug!(?cfg, "Initializing scheduling module");

        let profiles = Arc::new(SeaOrmProfilesRepository::new(db.clone()));
        let events = Arc::new(SeaOrmEventsRepository::new(db));
        let service = Service::new(profiles, events, ServiceConfig::from(&cfg));

        self.service.store(Some(Arc::new(service)));

        info!("Scheduling module initialized");
        Ok(())
    }

    fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .context("scheduling module is not initialized")
    }

    /// Add the module's REST endpoints to `router`.
    pub fn register_rest(&self, router: Router) -> anyhow::Result<Router> {
        let router = routes::register_routes(router, self.service()?)?;
        info!("Scheduling REST routes registered");
        Ok(router)
    }

    /// In-process client for other modules and the CLI.
    pub fn client(&self) -> anyhow::Result<Arc<dyn SchedulingApi>> {
        Ok(Arc::new(SchedulingLocalClient::new(self.service()?)))
    }
}

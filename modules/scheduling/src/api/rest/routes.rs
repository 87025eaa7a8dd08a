use std::sync::Arc;

use axum::{
    routing::{get, put},
    Extension, Router,
};

use crate::api::rest::handlers;
use crate::domain::service::Service;

/// Mount the profile and event endpoints onto `router`.
pub fn register_routes(router: Router, service: Arc<Service>) -> anyhow::Result<Router> {
    let router = router
        // Profiles
        .route(
            "/profiles",
            get(handlers::list_profiles).post(handlers::create_profile),
        )
        // Literal segment, registered next to the `{id}` captures
        .route("/profiles/utils/timezones", get(handlers::list_timezones))
        .route("/profiles/utils/times", get(handlers::times_across))
        .route("/profiles/{id}", get(handlers::get_profile))
        .route(
            "/profiles/{id}/timezone",
            put(handlers::update_profile_timezone),
        )
        .route("/profiles/{id}/agenda", get(handlers::profile_agenda))
        // Events
        .route(
            "/events",
            get(handlers::list_events).post(handlers::create_event),
        )
        .route("/events/upcoming/events", get(handlers::list_upcoming_events))
        .route(
            "/events/profile/{id}",
            get(handlers::list_events_for_profile),
        )
        .route("/events/{id}", put(handlers::update_event))
        .route("/events/{id}/logs", get(handlers::event_logs))
        .layer(Extension(service));

    Ok(router)
}

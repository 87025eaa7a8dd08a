use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    Extension,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::api::rest::dto::{
    AgendaDto, CreateEventReq, CreateProfileReq, EventDto, EventLogsDto, LogsQuery, ProfileDto,
    TimesQuery, TimezoneDto, UpdateEventReq, UpdateTimezoneReq, ZoneTimeDto,
};
use crate::api::rest::error::map_domain_error;
use crate::api::rest::response::{ApiError, ApiJson, ApiResponse};
use crate::contract::model::NewEvent;
use crate::domain::error::DomainError;
use crate::domain::service::Service;

type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid id: '{raw}'")))
}

fn fail(what: &str, e: DomainError) -> ApiError {
    error!("Failed to {what}: {e}");
    map_domain_error(&e)
}

// --- profiles ---

pub async fn list_profiles(Extension(svc): Extension<Arc<Service>>) -> ApiResult<Vec<ProfileDto>> {
    info!("Listing active profiles");
    let profiles = svc
        .list_profiles()
        .await
        .map_err(|e| fail("list profiles", e))?;
    Ok(ApiResponse::list(
        profiles.into_iter().map(ProfileDto::from).collect(),
    ))
}

pub async fn get_profile(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<ProfileDto> {
    let id = parse_id(&id)?;
    info!("Getting profile {}", id);
    let profile = svc
        .get_profile(id)
        .await
        .map_err(|e| fail("get profile", e))?;
    Ok(ApiResponse::ok(profile.into()))
}

pub async fn create_profile(
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(req): ApiJson<CreateProfileReq>,
) -> ApiResult<ProfileDto> {
    info!("Creating profile: {:?}", req);
    let profile = svc
        .create_profile(req.into())
        .await
        .map_err(|e| fail("create profile", e))?;
    Ok(ApiResponse::created(profile.into()).with_message("Profile created successfully"))
}

pub async fn update_profile_timezone(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateTimezoneReq>,
) -> ApiResult<ProfileDto> {
    let id = parse_id(&id)?;
    info!("Updating timezone of profile {} to {:?}", id, req.timezone);
    let timezone = req.timezone.unwrap_or_default();
    let profile = svc
        .update_profile_timezone(id, &timezone)
        .await
        .map_err(|e| fail("update profile timezone", e))?;
    Ok(ApiResponse::ok(profile.into()).with_message("Timezone updated successfully"))
}

pub async fn list_timezones(Extension(svc): Extension<Arc<Service>>) -> ApiResult<Vec<TimezoneDto>> {
    Ok(ApiResponse::list(
        svc.timezones().into_iter().map(TimezoneDto::from).collect(),
    ))
}

pub async fn times_across(
    Extension(svc): Extension<Arc<Service>>,
    Query(query): Query<TimesQuery>,
) -> ApiResult<Vec<ZoneTimeDto>> {
    let (at, input_tz, zones) = query
        .into_parts()
        .map_err(|e| fail("render times across zones", e))?;
    let times = svc
        .times_across(at, &input_tz, &zones)
        .map_err(|e| fail("render times across zones", e))?;
    Ok(ApiResponse::list(
        times.into_iter().map(ZoneTimeDto::from).collect(),
    ))
}

pub async fn profile_agenda(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<AgendaDto> {
    let id = parse_id(&id)?;
    info!("Building agenda for profile {}", id);
    let agenda = svc.agenda(id).await.map_err(|e| fail("build agenda", e))?;
    let count = agenda.items.len();
    Ok(ApiResponse::ok(agenda.into()).with_count(count))
}

// --- events ---

fn event_list(views: Vec<crate::contract::model::EventView>) -> ApiResponse<Vec<EventDto>> {
    ApiResponse::list(views.into_iter().map(EventDto::from).collect())
}

pub async fn list_events(Extension(svc): Extension<Arc<Service>>) -> ApiResult<Vec<EventDto>> {
    info!("Listing events");
    let views = svc.list_events().await.map_err(|e| fail("list events", e))?;
    Ok(event_list(views))
}

pub async fn list_events_for_profile(
    Extension(svc): Extension<Arc<Service>>,
    Path(profile_id): Path<String>,
) -> ApiResult<Vec<EventDto>> {
    let profile_id = parse_id(&profile_id)?;
    info!("Listing events for profile {}", profile_id);
    let views = svc
        .list_events_for_profile(profile_id)
        .await
        .map_err(|e| fail("list events for profile", e))?;
    Ok(event_list(views))
}

pub async fn list_upcoming_events(
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Vec<EventDto>> {
    info!("Listing upcoming events");
    let views = svc
        .list_upcoming_events()
        .await
        .map_err(|e| fail("list upcoming events", e))?;
    Ok(event_list(views))
}

pub async fn create_event(
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(req): ApiJson<CreateEventReq>,
) -> ApiResult<EventDto> {
    info!("Creating event: {:?}", req.title);
    let new_event = NewEvent::try_from(req).map_err(|e| fail("create event", e))?;
    let view = svc
        .create_event(new_event)
        .await
        .map_err(|e| fail("create event", e))?;
    Ok(ApiResponse::created(view.into()).with_message("Event created successfully"))
}

pub async fn update_event(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateEventReq>,
) -> ApiResult<EventDto> {
    let id = parse_id(&id)?;
    info!("Updating event {}", id);
    let (updated_by, patch) = req.into_parts().map_err(|e| fail("update event", e))?;
    let view = svc
        .update_event(id, updated_by, patch)
        .await
        .map_err(|e| fail("update event", e))?;
    Ok(ApiResponse::ok(view.into()).with_message("Event updated successfully"))
}

pub async fn event_logs(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<EventLogsDto> {
    let id = parse_id(&id)?;
    let viewer_tz = query.timezone.unwrap_or_else(|| "UTC".to_string());
    info!("Getting update logs of event {} for {}", id, viewer_tz);
    let logs = svc
        .event_logs(id, &viewer_tz)
        .await
        .map_err(|e| fail("get event logs", e))?;
    let count = logs.logs.len();
    Ok(ApiResponse::ok(logs.into()).with_count(count))
}

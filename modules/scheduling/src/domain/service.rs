use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::SchedulingConfig;
use crate::contract::model::{
    Agenda, AgendaItem, AuditLogEntry, ChangeView, DateTimeInput, Event, EventLogs, EventPatch,
    EventView, FieldValue, LogView, NewEvent, NewProfile, Profile, ProfileRef, ProfileSummary,
    TimezoneInfo, ZoneTime,
};
use crate::domain::diff::{self, ResolvedPatch};
use crate::domain::error::DomainError;
use crate::domain::repo::{EventsRepository, ProfilesRepository};
use crate::domain::timezone;

pub(crate) const REQUIRED_EVENT_FIELDS: &str =
    "All fields are required: title, profiles, timezone, startDateTime, endDateTime, createdBy";

/// Domain service for profiles and events.
/// Depends only on the repository ports, not on infra types.
#[derive(Clone)]
pub struct Service {
    profiles: Arc<dyn ProfilesRepository>,
    events: Arc<dyn EventsRepository>,
    config: ServiceConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub max_profile_name_length: usize,
    pub max_title_length: usize,
    pub max_description_length: usize,
    pub default_timezone: String,
    /// Attempts at the optimistic update before giving up with a conflict.
    pub update_retry_limit: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from(&SchedulingConfig::default())
    }
}

impl From<&SchedulingConfig> for ServiceConfig {
    fn from(cfg: &SchedulingConfig) -> Self {
        Self {
            max_profile_name_length: cfg.max_profile_name_length,
            max_title_length: cfg.max_title_length,
            max_description_length: cfg.max_description_length,
            default_timezone: cfg.default_timezone.clone(),
            update_retry_limit: cfg.update_retry_limit.max(1),
        }
    }
}

impl Service {
    pub fn new(
        profiles: Arc<dyn ProfilesRepository>,
        events: Arc<dyn EventsRepository>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            profiles,
            events,
            config,
        }
    }

    // --- profiles ---

    #[instrument(name = "scheduling.service.list_profiles", skip(self))]
    pub async fn list_profiles(&self) -> Result<Vec<Profile>, DomainError> {
        let profiles = self
            .profiles
            .list_active()
            .await
            .map_err(DomainError::storage)?;
        debug!("Found {} active profiles", profiles.len());
        Ok(profiles)
    }

    #[instrument(name = "scheduling.service.get_profile", skip(self), fields(profile_id = %id))]
    pub async fn get_profile(&self, id: Uuid) -> Result<Profile, DomainError> {
        let profile = self.load_profile(id).await?;
        if !profile.is_active {
            return Err(DomainError::profile_inactive(id));
        }
        Ok(profile)
    }

    #[instrument(
        name = "scheduling.service.create_profile",
        skip(self, new_profile),
        fields(name = %new_profile.name)
    )]
    pub async fn create_profile(&self, new_profile: NewProfile) -> Result<Profile, DomainError> {
        info!("Creating new profile");

        let name = new_profile.name.trim().to_string();
        self.validate_profile_name(&name)?;

        let tz = new_profile
            .timezone
            .unwrap_or_else(|| self.config.default_timezone.clone());
        validate_timezone(&tz)?;

        if self
            .profiles
            .active_name_exists(&name)
            .await
            .map_err(DomainError::storage)?
        {
            return Err(DomainError::duplicate_profile_name(name));
        }

        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            name,
            timezone: tz,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.profiles
            .insert(profile.clone())
            .await
            .map_err(DomainError::storage)?;

        info!("Successfully created profile with id={}", profile.id);
        Ok(profile)
    }

    #[instrument(
        name = "scheduling.service.update_profile_timezone",
        skip(self),
        fields(profile_id = %id)
    )]
    pub async fn update_profile_timezone(
        &self,
        id: Uuid,
        timezone: &str,
    ) -> Result<Profile, DomainError> {
        info!("Updating profile timezone");

        if timezone.trim().is_empty() {
            return Err(DomainError::validation("Timezone is required"));
        }
        validate_timezone(timezone)?;

        let mut profile = self.load_profile(id).await?;
        if !profile.is_active {
            return Err(DomainError::profile_inactive(id));
        }

        profile.timezone = timezone.to_string();
        profile.updated_at = Utc::now();

        self.profiles
            .update(profile.clone())
            .await
            .map_err(DomainError::storage)?;

        info!("Timezone updated successfully");
        Ok(profile)
    }

    pub fn timezones(&self) -> Vec<TimezoneInfo> {
        timezone::common_timezones()
            .iter()
            .map(|tz| TimezoneInfo {
                timezone: tz.to_string(),
                offset: timezone::current_offset(tz),
                current_time: timezone::current_date_time_for(tz),
            })
            .collect()
    }

    /// Render `at` (read in `input_tz` when zone-naive) in each of `targets`.
    /// An empty `targets` means the curated list.
    pub fn times_across(
        &self,
        at: DateTimeInput,
        input_tz: &str,
        targets: &[String],
    ) -> Result<Vec<ZoneTime>, DomainError> {
        validate_timezone(input_tz)?;
        for tz in targets {
            validate_timezone(tz)?;
        }
        let instant = resolve_time(at, input_tz, "at")?;

        let zones: Vec<&str> = if targets.is_empty() {
            timezone::common_timezones().to_vec()
        } else {
            targets.iter().map(String::as_str).collect()
        };
        Ok(timezone::times_for_timezones(instant, &zones)
            .into_iter()
            .map(|(timezone, time)| ZoneTime { timezone, time })
            .collect())
    }

    /// Events of `profile_id`, each rendered in the profile's own timezone.
    #[instrument(name = "scheduling.service.agenda", skip(self), fields(profile_id = %profile_id))]
    pub async fn agenda(&self, profile_id: Uuid) -> Result<Agenda, DomainError> {
        let profile = self.get_profile(profile_id).await?;
        let events = self.events_containing(profile_id).await?;
        let views = self.populate(events).await?;

        let now = Utc::now();
        let viewer_tz = profile.timezone.as_str();
        let items = views
            .into_iter()
            .map(|view| {
                let e = &view.event;
                AgendaItem {
                    local_start: timezone::format_for_display(Some(e.start_date_time), viewer_tz),
                    local_end: timezone::format_for_display(Some(e.end_date_time), viewer_tz),
                    event_local_start: timezone::format_for_display(
                        Some(e.start_date_time),
                        &e.timezone,
                    ),
                    event_local_end: timezone::format_for_display(
                        Some(e.end_date_time),
                        &e.timezone,
                    ),
                    is_ongoing: e.is_ongoing_at(now),
                    duration_hours: e.duration_hours(),
                    event: view,
                }
            })
            .collect();

        Ok(Agenda {
            offset: timezone::offset_at(viewer_tz, now),
            profile,
            items,
        })
    }

    // --- events ---

    #[instrument(name = "scheduling.service.list_events", skip(self))]
    pub async fn list_events(&self) -> Result<Vec<EventView>, DomainError> {
        let events = self.events.list_all().await.map_err(DomainError::storage)?;
        debug!("Found {} events", events.len());
        self.populate(events).await
    }

    #[instrument(
        name = "scheduling.service.list_events_for_profile",
        skip(self),
        fields(profile_id = %profile_id)
    )]
    pub async fn list_events_for_profile(
        &self,
        profile_id: Uuid,
    ) -> Result<Vec<EventView>, DomainError> {
        // Unknown and inactive profiles both read as "not found" here.
        match self
            .profiles
            .find_by_id(profile_id)
            .await
            .map_err(DomainError::storage)?
        {
            Some(p) if p.is_active => {}
            _ => return Err(DomainError::profile_not_found(profile_id)),
        }

        let events = self.events_containing(profile_id).await?;
        debug!("Found {} events for profile", events.len());
        self.populate(events).await
    }

    #[instrument(name = "scheduling.service.list_upcoming_events", skip(self))]
    pub async fn list_upcoming_events(&self) -> Result<Vec<EventView>, DomainError> {
        let now = Utc::now();
        let events: Vec<Event> = self
            .events
            .list_all()
            .await
            .map_err(DomainError::storage)?
            .into_iter()
            .filter(|e| e.start_date_time >= now)
            .collect();
        debug!("Found {} upcoming events", events.len());
        self.populate(events).await
    }

    #[instrument(
        name = "scheduling.service.create_event",
        skip(self, new_event),
        fields(title = %new_event.title, created_by = %new_event.created_by)
    )]
    pub async fn create_event(&self, new_event: NewEvent) -> Result<EventView, DomainError> {
        info!(profiles = new_event.profiles.len(), "Creating new event");

        let title = new_event.title.trim().to_string();
        if title.is_empty() || new_event.profiles.is_empty() || new_event.timezone.is_empty() {
            return Err(DomainError::validation(REQUIRED_EVENT_FIELDS));
        }
        let description = new_event
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        self.validate_title(&title)?;
        self.validate_description(&description)?;
        validate_timezone(&new_event.timezone)?;

        match self
            .profiles
            .find_by_id(new_event.created_by)
            .await
            .map_err(DomainError::storage)?
        {
            Some(p) if p.is_active => {}
            _ => return Err(DomainError::invalid_creator(new_event.created_by)),
        }
        self.ensure_active_profiles(&new_event.profiles).await?;

        let start = resolve_time(new_event.start_date_time, &new_event.timezone, "startDateTime")?;
        let end = resolve_time(new_event.end_date_time, &new_event.timezone, "endDateTime")?;
        let now = Utc::now();
        if end <= start {
            return Err(DomainError::invalid_time_range());
        }
        if end < now {
            return Err(DomainError::end_in_past());
        }

        let event = Event {
            id: Uuid::new_v4(),
            title,
            description,
            profiles: new_event.profiles,
            timezone: new_event.timezone,
            start_date_time: start,
            end_date_time: end,
            created_by: new_event.created_by,
            update_logs: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.events
            .insert(event.clone())
            .await
            .map_err(DomainError::storage)?;

        info!("Event created successfully: {}", event.id);
        self.populate_one(event).await
    }

    /// Apply `patch`, logging the field-level diff under `updated_by`.
    ///
    /// Load, diff and write run under an optimistic lock on the event version
    /// and are retried from scratch when another writer wins.
    #[instrument(
        name = "scheduling.service.update_event",
        skip(self, patch),
        fields(event_id = %id)
    )]
    pub async fn update_event(
        &self,
        id: Uuid,
        updated_by: Option<Uuid>,
        patch: EventPatch,
    ) -> Result<EventView, DomainError> {
        info!("Updating event");

        let mut patch_checked = false;
        let mut updater_checked = false;
        for attempt in 1..=self.config.update_retry_limit {
            let existing = self.load_event(id).await?;
            if !patch_checked {
                self.validate_patch(&patch)?;
                if let Some(profiles) = &patch.profiles {
                    self.ensure_active_profiles(profiles).await?;
                }
                patch_checked = true;
            }

            let input_tz = patch.timezone.as_deref().unwrap_or(&existing.timezone);
            let resolved = ResolvedPatch {
                title: patch.title.clone(),
                description: patch.description.clone(),
                profiles: patch.profiles.clone(),
                timezone: patch.timezone.clone(),
                start_date_time: patch
                    .start_date_time
                    .map(|t| resolve_time(t, input_tz, "startDateTime"))
                    .transpose()?,
                end_date_time: patch
                    .end_date_time
                    .map(|t| resolve_time(t, input_tz, "endDateTime"))
                    .transpose()?,
            };

            let changes = diff::compute_changes(&existing, &resolved);
            let mut next = resolved.apply_to(&existing);
            if next.end_date_time <= next.start_date_time {
                return Err(DomainError::invalid_time_range());
            }

            if changes.is_empty() {
                debug!("No field changed; nothing to persist");
                return self.populate_one(existing).await;
            }

            let updater = updated_by.ok_or_else(|| {
                DomainError::validation("updatedBy is required when changing an event")
            })?;
            if !updater_checked {
                self.ensure_updater(updater).await?;
                updater_checked = true;
            }

            let now = Utc::now();
            let log = AuditLogEntry::record(updater, changes, now);
            next.update_logs.push(log.clone());
            next.version = existing.version + 1;
            next.updated_at = now;

            if self
                .events
                .update_versioned(&next, existing.version, Some(&log))
                .await
                .map_err(DomainError::storage)?
            {
                info!(
                    changes = log.changes.len(),
                    version = next.version,
                    "Event updated successfully"
                );
                return self.populate_one(next).await;
            }

            warn!(attempt, "Event changed while updating; retrying");
        }

        Err(DomainError::concurrent_modification(id))
    }

    /// Update history, most recent first, with values rendered for `viewer_tz`.
    #[instrument(name = "scheduling.service.event_logs", skip(self), fields(event_id = %id))]
    pub async fn event_logs(&self, id: Uuid, viewer_tz: &str) -> Result<EventLogs, DomainError> {
        let event = self.load_event(id).await?;
        validate_timezone(viewer_tz)?;

        let mut referenced = BTreeSet::new();
        for log in &event.update_logs {
            referenced.insert(log.updated_by);
            for change in &log.changes {
                for value in [&change.previous, &change.updated] {
                    if let FieldValue::ProfileIds(ids) = value {
                        referenced.extend(ids.iter().copied());
                    }
                }
            }
        }
        let by_id = self.profiles_by_id(referenced).await?;
        let names: HashMap<Uuid, String> = by_id
            .iter()
            .map(|(id, p)| (*id, p.name.clone()))
            .collect();

        let logs = event
            .update_logs
            .iter()
            .rev()
            .map(|log| LogView {
                id: log.id,
                updated_by: log.updated_by,
                updated_by_profile: by_id.get(&log.updated_by).map(ProfileRef::from),
                timestamp: log.timestamp,
                timestamp_display: timezone::format_for_display(Some(log.timestamp), viewer_tz),
                changes: log
                    .changes
                    .iter()
                    .map(|c| ChangeView {
                        field: c.field,
                        previous_display: diff::render_value(&c.previous, viewer_tz, &names),
                        updated_display: diff::render_value(&c.updated, viewer_tz, &names),
                        previous: c.previous.clone(),
                        updated: c.updated.clone(),
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();

        debug!("Found {} update logs", logs.len());
        Ok(EventLogs {
            event_title: event.title,
            logs,
        })
    }

    // --- loading helpers ---

    async fn load_profile(&self, id: Uuid) -> Result<Profile, DomainError> {
        self.profiles
            .find_by_id(id)
            .await
            .map_err(DomainError::storage)?
            .ok_or_else(|| DomainError::profile_not_found(id))
    }

    async fn load_event(&self, id: Uuid) -> Result<Event, DomainError> {
        self.events
            .find_by_id(id)
            .await
            .map_err(DomainError::storage)?
            .ok_or_else(|| DomainError::event_not_found(id))
    }

    async fn events_containing(&self, profile_id: Uuid) -> Result<Vec<Event>, DomainError> {
        Ok(self
            .events
            .list_all()
            .await
            .map_err(DomainError::storage)?
            .into_iter()
            .filter(|e| e.profiles.contains(&profile_id))
            .collect())
    }

    async fn profiles_by_id(
        &self,
        ids: BTreeSet<Uuid>,
    ) -> Result<HashMap<Uuid, Profile>, DomainError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<Uuid> = ids.into_iter().collect();
        Ok(self
            .profiles
            .find_by_ids(&ids)
            .await
            .map_err(DomainError::storage)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect())
    }

    /// Resolve profile and creator references. Dangling ids are dropped.
    async fn populate(&self, events: Vec<Event>) -> Result<Vec<EventView>, DomainError> {
        let referenced: BTreeSet<Uuid> = events
            .iter()
            .flat_map(|e| e.profiles.iter().copied().chain(Some(e.created_by)))
            .collect();
        let by_id = self.profiles_by_id(referenced).await?;

        Ok(events
            .into_iter()
            .map(|event| EventView {
                profiles: event
                    .profiles
                    .iter()
                    .filter_map(|id| by_id.get(id).map(ProfileSummary::from))
                    .collect(),
                created_by: by_id.get(&event.created_by).map(ProfileRef::from),
                event,
            })
            .collect())
    }

    async fn populate_one(&self, event: Event) -> Result<EventView, DomainError> {
        self.populate(vec![event])
            .await?
            .pop()
            .ok_or_else(|| DomainError::database("populate returned no event"))
    }

    // --- validation helpers ---

    /// Every id must name a distinct active profile.
    async fn ensure_active_profiles(&self, ids: &[Uuid]) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Err(DomainError::validation(
                "At least one profile must be assigned",
            ));
        }
        let active = self
            .profiles
            .find_by_ids(ids)
            .await
            .map_err(DomainError::storage)?
            .into_iter()
            .filter(|p| p.is_active)
            .count();
        if active != ids.len() {
            return Err(DomainError::invalid_profile_references());
        }
        Ok(())
    }

    async fn ensure_updater(&self, id: Uuid) -> Result<(), DomainError> {
        match self
            .profiles
            .find_by_id(id)
            .await
            .map_err(DomainError::storage)?
        {
            Some(p) if p.is_active => Ok(()),
            _ => Err(DomainError::invalid_updater(id)),
        }
    }

    fn validate_patch(&self, patch: &EventPatch) -> Result<(), DomainError> {
        if let Some(tz) = &patch.timezone {
            validate_timezone(tz)?;
        }
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(DomainError::validation("Event title is required"));
            }
            self.validate_title(title)?;
        }
        if let Some(description) = &patch.description {
            self.validate_description(description)?;
        }
        Ok(())
    }

    fn validate_profile_name(&self, name: &str) -> Result<(), DomainError> {
        if name.is_empty() {
            return Err(DomainError::validation("Profile name is required"));
        }
        check_length("Name", name, self.config.max_profile_name_length)
    }

    fn validate_title(&self, title: &str) -> Result<(), DomainError> {
        check_length("Title", title, self.config.max_title_length)
    }

    fn validate_description(&self, description: &str) -> Result<(), DomainError> {
        check_length("Description", description, self.config.max_description_length)
    }
}

fn validate_timezone(tz: &str) -> Result<(), DomainError> {
    if timezone::is_valid_timezone(tz) {
        Ok(())
    } else {
        Err(DomainError::invalid_timezone(tz))
    }
}

fn check_length(what: &str, value: &str, max: usize) -> Result<(), DomainError> {
    if value.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{what} cannot be more than {max} characters"
        )));
    }
    Ok(())
}

fn resolve_time(
    input: DateTimeInput,
    tz: &str,
    field: &str,
) -> Result<DateTime<Utc>, DomainError> {
    timezone::resolve_input(input, tz)
        .ok_or_else(|| DomainError::validation(format!("Invalid {field}")))
}

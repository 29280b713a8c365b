//! Translation between Google Calendar events and backend events

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::api::public::events::EventRequest;
use crate::backend::{BackendEvent, CallType, EventStatus, Recurrence, Visibility};
use crate::core::AppConfig;
use crate::google::gcal::{CalendarEvent, EventAttendee, EventDateTime, ReminderOverride, Reminders};

pub const DEFAULT_TITLE: &str = "No Title";
pub const DEFAULT_NOTIFY_MINUTES: i64 = 10;
pub const DEFAULT_TIME_ZONE: &str = "UTC";
const NO_REPEAT: &str = "doesntRepeat";

/// Internal zone names the backend uses, mapped to IANA names
const TIME_ZONE_ALIASES: &[(&str, &str)] = &[("indianStandardTime", "Asia/Kolkata")];

/// Map an internal zone alias to its IANA name. Unknown names pass
/// through unchanged.
pub fn map_time_zone(name: &str) -> String {
    TIME_ZONE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, iana)| iana.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Parse an RFC 3339 instant or an all-day `YYYY-MM-DD` date (midnight
/// UTC).
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}

/// Whole minutes from `start` to `end`, floor-rounded. Returns 0 when
/// either side is absent or unparseable. End before start yields a
/// negative value.
pub fn calculate_duration(start: Option<&str>, end: Option<&str>) -> i64 {
    let (Some(start), Some(end)) = (start.and_then(parse_instant), end.and_then(parse_instant))
    else {
        return 0;
    };
    minutes_between(start, end)
}

fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_milliseconds().div_euclid(60_000)
}

/// Which field an event boundary was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    DateTime,
    Date,
    Now,
}

/// Resolve an event boundary with precedence `dateTime`, then `date`,
/// then `now`. Each fallback tier is logged.
pub fn resolve_instant(
    label: &str,
    value: Option<&EventDateTime>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, TimeSource) {
    if let Some(instant) = value
        .and_then(|v| v.date_time.as_deref())
        .and_then(parse_instant)
    {
        return (instant, TimeSource::DateTime);
    }
    if let Some(instant) = value.and_then(|v| v.date.as_deref()).and_then(parse_instant) {
        tracing::warn!("Event {} has no usable dateTime, using all-day date", label);
        return (instant, TimeSource::Date);
    }
    tracing::warn!("Event {} has no usable date, falling back to now", label);
    (now, TimeSource::Now)
}

/// Calendar date of `instant` in `time_zone`, UTC when the zone is unknown.
fn local_date(instant: DateTime<Utc>, time_zone: &str) -> String {
    match time_zone.parse::<Tz>() {
        Ok(tz) => instant.with_timezone(&tz).format("%Y-%m-%d").to_string(),
        Err(_) => instant.format("%Y-%m-%d").to_string(),
    }
}

fn date_field(
    value: Option<&EventDateTime>,
    instant: DateTime<Utc>,
    source: TimeSource,
    time_zone: &str,
) -> String {
    match (source, value.and_then(|v| v.date.as_deref())) {
        // All-day dates are already calendar dates
        (TimeSource::Date, Some(date)) => date.to_string(),
        _ => local_date(instant, time_zone),
    }
}

/// Backend repeat type derived from the RRULE frequency.
pub fn repeat_type(recurrence: &[String]) -> &'static str {
    let Some(rule) = recurrence.iter().find_map(|line| line.strip_prefix("RRULE:")) else {
        return NO_REPEAT;
    };
    match rule.split(';').find_map(|part| part.strip_prefix("FREQ=")) {
        Some("DAILY") => "daily",
        Some("WEEKLY") => "weekly",
        Some("MONTHLY") => "monthly",
        Some("YEARLY") => "yearly",
        _ => "custom",
    }
}

/// Per-user values filled into every mapped event
#[derive(Debug, Clone)]
pub struct SyncDefaults {
    pub user_id: String,
    pub organizer: String,
    pub tenant_id: String,
    pub tenant_name: String,
    pub event_type: String,
    pub organizer_role_id: String,
    pub time_zone: String,
}

impl SyncDefaults {
    pub fn new(user_id: &str, config: &AppConfig) -> Self {
        Self {
            user_id: user_id.to_string(),
            organizer: String::from("Google Calendar"),
            tenant_id: config.tenant_id.clone(),
            tenant_name: config.tenant_name.clone(),
            event_type: String::from("events"),
            organizer_role_id: String::new(),
            time_zone: String::from(DEFAULT_TIME_ZONE),
        }
    }
}

/// Map a Google Calendar event into the backend schema.
pub fn to_backend_event(
    event: &CalendarEvent,
    defaults: &SyncDefaults,
    now: DateTime<Utc>,
) -> BackendEvent {
    let label = event.id.as_deref().unwrap_or("<new>");
    let start = event.start.as_ref();
    let end = event.end.as_ref();

    let time_zone = map_time_zone(
        start
            .and_then(|s| s.time_zone.as_deref())
            .or(end.and_then(|e| e.time_zone.as_deref()))
            .unwrap_or(&defaults.time_zone),
    );

    let (start_instant, start_source) = resolve_instant(&format!("{} start", label), start, now);
    let (end_instant, end_source) = resolve_instant(&format!("{} end", label), end, now);

    let notify_time_in_minutes = match &event.reminders {
        Some(reminders) if !reminders.overrides.is_empty() => {
            reminders.overrides.iter().map(|o| o.minutes).collect()
        }
        _ => vec![DEFAULT_NOTIFY_MINUTES],
    };

    BackendEvent {
        user_id: defaults.user_id.clone(),
        organizer: defaults.organizer.clone(),
        title: event
            .summary
            .clone()
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        event_type: defaults.event_type.clone(),
        tenant_name: defaults.tenant_name.clone(),
        tenant_id: defaults.tenant_id.clone(),
        event_date: date_field(start, start_instant, start_source, &time_zone),
        from_time: start_instant.to_rfc3339(),
        to_date: date_field(end, end_instant, end_source, &time_zone),
        to_time: end_instant.to_rfc3339(),
        duration: match (start_source, end_source) {
            (TimeSource::Now, _) | (_, TimeSource::Now) => 0,
            _ => minutes_between(start_instant, end_instant),
        },
        time_zone,
        repeat_type: repeat_type(&event.recurrence).to_string(),
        recurrence: Recurrence {
            rules: event.recurrence.clone(),
            recurring_event_id: event.recurring_event_id.clone(),
        },
        notify: vec![],
        tenant_participants: vec![],
        // Emails are not validated
        external_participants: event
            .attendees
            .iter()
            .filter_map(|a| a.email.clone())
            .collect(),
        is_exclude_me_from_event: false,
        visibility: Visibility::from_google(event.visibility.as_deref()),
        status: EventStatus::from_google(event.status.as_deref()),
        call_type: CallType::default(),
        others: String::new(),
        description: event.description.clone().unwrap_or_default(),
        permissions: vec![],
        organizer_role_id: defaults.organizer_role_id.clone(),
        notify_time_in_minutes,
    }
}

/// Build the Google event for a create or update request.
pub fn to_calendar_event(req: &EventRequest) -> CalendarEvent {
    let time_zone = map_time_zone(req.time_zone.as_deref().unwrap_or(DEFAULT_TIME_ZONE));
    let boundary = |date_time: &str| EventDateTime {
        date: None,
        date_time: Some(date_time.to_string()),
        time_zone: Some(time_zone.clone()),
    };
    let reminders = (!req.notify_time_in_minutes.is_empty()).then(|| Reminders {
        use_default: false,
        overrides: req
            .notify_time_in_minutes
            .iter()
            .map(|minutes| ReminderOverride {
                method: String::from("popup"),
                minutes: *minutes,
            })
            .collect(),
    });

    CalendarEvent {
        summary: Some(req.title.clone()),
        description: Some(req.description.clone().unwrap_or_default()),
        start: Some(boundary(&req.from_time)),
        end: Some(boundary(&req.to_time)),
        attendees: req
            .external_participants
            .iter()
            .map(|email| EventAttendee {
                email: Some(email.clone()),
                ..Default::default()
            })
            .collect(),
        reminders,
        ..Default::default()
    }
}

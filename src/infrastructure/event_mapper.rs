use crate::domain::models::{CalendarEvent, EventTime, ScheduleItem};
use crate::domain::time::{Clock, parse_hhmm};
use crate::infrastructure::error::InfraError;
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct CalendarEventDateTime {
    #[serde(rename = "dateTime", default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct GoogleCalendarEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub start: CalendarEventDateTime,
    #[serde(default)]
    pub end: CalendarEventDateTime,
}

pub fn decode_calendar_event(event: &GoogleCalendarEvent) -> CalendarEvent {
    CalendarEvent {
        summary: event.summary.clone(),
        start: EventTime {
            date_time: event.start.date_time.clone(),
            date: event.start.date.clone(),
        },
        end: EventTime {
            date_time: event.end.date_time.clone(),
            date: event.end.date.clone(),
        },
    }
}

/// Insert payload for one schedule item on `day`.
///
/// When the end clock time is earlier than the start, the end moves to the next day.
pub fn encode_schedule_item(
    item: &ScheduleItem,
    day: NaiveDate,
    clock: &Clock,
) -> Result<GoogleCalendarEvent, InfraError> {
    let (start_raw, end_raw) = item.time_range();
    let start = parse_hhmm(start_raw).ok_or_else(|| invalid_time(item, "start"))?;
    let end = end_raw
        .and_then(parse_hhmm)
        .ok_or_else(|| invalid_time(item, "end"))?;

    let end_day = if end < start {
        day.succ_opt()
            .ok_or_else(|| InfraError::CalendarApi(format!("no day after {day}")))?
    } else {
        day
    };

    Ok(GoogleCalendarEvent {
        id: None,
        summary: Some(format!("{} {}", item.emoji, item.task)),
        status: None,
        start: localized(day.and_time(start), clock)?,
        end: localized(end_day.and_time(end), clock)?,
    })
}

fn localized(local: NaiveDateTime, clock: &Clock) -> Result<CalendarEventDateTime, InfraError> {
    let instant = clock.localize(local).ok_or_else(|| {
        InfraError::CalendarApi(format!("local time {local} does not exist in the configured zone"))
    })?;
    Ok(CalendarEventDateTime {
        date_time: Some(instant.to_rfc3339()),
        date: None,
        time_zone: None,
    })
}

fn invalid_time(item: &ScheduleItem, field: &str) -> InfraError {
    InfraError::CalendarApi(format!(
        "invalid {field} time in schedule item '{}': {}",
        item.task, item.time
    ))
}

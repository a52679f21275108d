use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DAY_START: &str = "09:00";
pub const DEFAULT_DAY_END: &str = "22:00";
pub const TIME_RANGE_SEPARATOR: &str = " - ";

/// One allocated time block returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleItem {
    /// `"HH:mm - HH:mm"`.
    pub time: String,
    pub task: String,
    pub emoji: String,
}

impl ScheduleItem {
    pub fn new(time: impl Into<String>, task: impl Into<String>, emoji: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            task: task.into(),
            emoji: emoji.into(),
        }
    }

    /// Start and end halves of `time`. The end is `None` when the separator is missing.
    pub fn time_range(&self) -> (&str, Option<&str>) {
        split_time_range(&self.time)
    }
}

pub fn split_time_range(value: &str) -> (&str, Option<&str>) {
    let mut parts = value.split(TIME_RANGE_SEPARATOR);
    let start = parts.next().unwrap_or_default();
    (start, parts.next())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EventTime {
    #[serde(rename = "dateTime", default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl EventTime {
    pub fn at(date_time: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            date: None,
        }
    }

    pub fn all_day(date: impl Into<String>) -> Self {
        Self {
            date_time: None,
            date: Some(date.into()),
        }
    }
}

/// An externally owned busy block on today's calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayWindow {
    pub start_time: String,
    pub end_time: String,
}

impl DayWindow {
    pub fn new(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }

    /// Checks the `HH:MM` shape of both bounds. An inverted window is accepted.
    pub fn validate(&self) -> Result<(), String> {
        validate_hhmm(&self.start_time, "day_window.start_time")?;
        validate_hhmm(&self.end_time, "day_window.end_time")?;
        Ok(())
    }
}

impl Default for DayWindow {
    fn default() -> Self {
        Self::new(DEFAULT_DAY_START, DEFAULT_DAY_END)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskList {
    tasks: Vec<String>,
}

impl TaskList {
    pub fn new<I, S>(tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tasks: tasks
                .into_iter()
                .map(Into::into)
                .filter(|task| !task.trim().is_empty())
                .collect(),
        }
    }

    /// One task per line.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }

    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn to_prompt_text(&self) -> String {
        self.tasks.join("\n")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPermission {
    #[default]
    Default,
    Granted,
    Denied,
}

impl NotificationPermission {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" | "" => Ok(Self::Default),
            "granted" => Ok(Self::Granted),
            "denied" => Ok(Self::Denied),
            other => Err(format!("invalid notification permission: {other}")),
        }
    }

    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Past,
    Current,
    Upcoming,
}

/// Flags computed for one item on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub is_past: bool,
    pub is_current: bool,
}

impl Classification {
    pub fn status(self) -> ItemStatus {
        if self.is_past {
            ItemStatus::Past
        } else if self.is_current {
            ItemStatus::Current
        } else {
            ItemStatus::Upcoming
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
    pub scope: Option<String>,
}

fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    let mut split = value.split(':');
    let Some(hour_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    let Some(minute_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    if split.next().is_some() {
        return Err(format!("{field_name} must be HH:MM"));
    }

    let hour = hour_str
        .parse::<u8>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    let minute = minute_str
        .parse::<u8>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    if hour > 23 || minute > 59 {
        return Err(format!("{field_name} must be HH:MM"));
    }
    Ok(())
}

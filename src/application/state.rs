use crate::domain::models::{
    CalendarEvent, Classification, DayWindow, NotificationPermission, ScheduleItem, TaskList,
};
use crate::domain::time::classify;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarState {
    /// Credentials are configured and the session could be initialised.
    pub available: bool,
    pub use_calendar: bool,
    pub authed: bool,
    pub auth_loading: bool,
    pub events: Vec<CalendarEvent>,
}

impl Default for CalendarState {
    fn default() -> Self {
        Self {
            available: true,
            use_calendar: true,
            authed: false,
            auth_loading: false,
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerSource {
    Calendar,
    Generation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub source: BannerSource,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlannerState {
    pub tasks: TaskList,
    pub day_window: DayWindow,
    /// Generation order, replaced wholesale.
    pub schedule: Vec<ScheduleItem>,
    pub is_loading: bool,
    /// Most recent failure. Cleared only by actions from the same source.
    pub error: Option<Banner>,
    pub calendar: CalendarState,
    pub notification_permission: NotificationPermission,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    TasksEdited(TaskList),
    DayWindowChanged(DayWindow),
    CalendarToggled(bool),
    CalendarUnavailable(String),
    AuthStarted,
    AuthSucceeded,
    AuthFailed(String),
    CalendarEventsLoaded(Vec<CalendarEvent>),
    CalendarFetchFailed(String),
    CalendarWriteSucceeded,
    CalendarWriteFailed(String),
    GenerationStarted,
    GenerationSucceeded(Vec<ScheduleItem>),
    GenerationFailed(String),
    PermissionChanged(NotificationPermission),
}

impl PlannerState {
    /// Applies `action`. Returns `false` when the action was rejected and nothing changed.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::TasksEdited(tasks) => self.tasks = tasks,
            Action::DayWindowChanged(day_window) => self.day_window = day_window,
            Action::CalendarToggled(enabled) => self.calendar.use_calendar = enabled,
            Action::CalendarUnavailable(message) => {
                self.calendar.available = false;
                self.calendar.authed = false;
                self.calendar.auth_loading = false;
                self.calendar.events.clear();
                self.show(BannerSource::Calendar, message);
            }
            Action::AuthStarted => {
                if !self.calendar.available || self.calendar.authed || self.calendar.auth_loading {
                    return false;
                }
                self.calendar.auth_loading = true;
                self.dismiss(BannerSource::Calendar);
            }
            Action::AuthSucceeded => {
                self.calendar.authed = true;
                self.calendar.auth_loading = false;
            }
            Action::AuthFailed(message) => {
                self.calendar.authed = false;
                self.calendar.auth_loading = false;
                self.show(BannerSource::Calendar, message);
            }
            Action::CalendarEventsLoaded(events) => self.calendar.events = events,
            Action::CalendarFetchFailed(message) => {
                self.calendar.events.clear();
                self.show(BannerSource::Calendar, message);
            }
            Action::CalendarWriteSucceeded => self.dismiss(BannerSource::Calendar),
            Action::CalendarWriteFailed(message) => self.show(BannerSource::Calendar, message),
            Action::GenerationStarted => {
                if self.is_loading {
                    return false;
                }
                self.is_loading = true;
                self.dismiss(BannerSource::Generation);
            }
            Action::GenerationSucceeded(schedule) => {
                self.schedule = schedule;
                self.is_loading = false;
            }
            Action::GenerationFailed(message) => {
                self.is_loading = false;
                self.show(BannerSource::Generation, message);
            }
            Action::PermissionChanged(permission) => self.notification_permission = permission,
        }
        true
    }

    pub fn banner_text(&self) -> Option<&str> {
        self.error.as_ref().map(|banner| banner.message.as_str())
    }

    fn show(&mut self, source: BannerSource, message: String) {
        self.error = Some(Banner { source, message });
    }

    fn dismiss(&mut self, source: BannerSource) {
        if self.error.as_ref().is_some_and(|banner| banner.source == source) {
            self.error = None;
        }
    }

    pub fn calendar_in_use(&self) -> bool {
        self.calendar.available && self.calendar.use_calendar && self.calendar.authed
    }

    /// Events the next generation should respect. Empty when the calendar is off or unavailable.
    pub fn events_for_generation(&self) -> Vec<CalendarEvent> {
        if self.calendar_in_use() {
            self.calendar.events.clone()
        } else {
            Vec::new()
        }
    }

    pub fn snapshot(&self, now: NaiveDateTime) -> ScheduleSnapshot {
        ScheduleSnapshot {
            entries: self
                .schedule
                .iter()
                .map(|item| ScheduleEntry {
                    item: item.clone(),
                    classification: classify(&item.time, now),
                })
                .collect(),
            banner: self.banner_text().map(ToOwned::to_owned),
            is_loading: self.is_loading,
            calendar_connected: self.calendar_in_use(),
            notification_permission: self.notification_permission,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub item: ScheduleItem,
    pub classification: Classification,
}

/// What a render tick shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    pub entries: Vec<ScheduleEntry>,
    pub banner: Option<String>,
    pub is_loading: bool,
    pub calendar_connected: bool,
    pub notification_permission: NotificationPermission,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EventTime, ItemStatus};
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 16)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid datetime")
    }

    fn sample_event() -> CalendarEvent {
        CalendarEvent {
            summary: Some("定例会議".to_string()),
            start: EventTime::at("2026-02-16T13:00:00+09:00"),
            end: EventTime::at("2026-02-16T14:00:00+09:00"),
        }
    }

    #[test]
    fn generation_is_single_flight() {
        let mut state = PlannerState::default();
        assert!(state.apply(Action::GenerationStarted));
        assert!(!state.apply(Action::GenerationStarted));
        assert!(state.is_loading);

        state.apply(Action::GenerationSucceeded(vec![ScheduleItem::new(
            "09:00 - 09:30",
            "散歩",
            "🚶",
        )]));
        assert!(!state.is_loading);
        assert!(state.apply(Action::GenerationStarted));
    }

    #[test]
    fn failed_generation_keeps_previous_schedule() {
        let mut state = PlannerState::default();
        let schedule = vec![ScheduleItem::new("09:00 - 09:30", "散歩", "🚶")];
        state.apply(Action::GenerationStarted);
        state.apply(Action::GenerationSucceeded(schedule.clone()));

        state.apply(Action::GenerationStarted);
        state.apply(Action::GenerationFailed("失敗".to_string()));

        assert_eq!(state.schedule, schedule);
        assert_eq!(state.banner_text(), Some("失敗"));
        assert!(!state.is_loading);
    }

    #[test]
    fn starting_generation_clears_only_generation_banner() {
        let mut state = PlannerState::default();
        state.apply(Action::GenerationStarted);
        state.apply(Action::GenerationFailed("失敗".to_string()));
        state.apply(Action::GenerationStarted);
        assert_eq!(state.error, None);

        state.apply(Action::GenerationSucceeded(Vec::new()));
        state.apply(Action::CalendarFetchFailed("取得失敗".to_string()));
        state.apply(Action::GenerationStarted);
        assert_eq!(state.banner_text(), Some("取得失敗"));
        state.apply(Action::GenerationSucceeded(Vec::new()));
        assert_eq!(state.banner_text(), Some("取得失敗"));
    }

    #[test]
    fn calendar_events_only_feed_generation_when_connected_and_enabled() {
        let mut state = PlannerState::default();
        state.apply(Action::CalendarEventsLoaded(vec![sample_event()]));
        assert!(state.events_for_generation().is_empty());

        state.apply(Action::AuthStarted);
        state.apply(Action::AuthSucceeded);
        assert_eq!(state.events_for_generation(), vec![sample_event()]);

        state.apply(Action::CalendarToggled(false));
        assert!(state.events_for_generation().is_empty());
    }

    #[test]
    fn auth_is_rejected_when_unavailable_or_connected() {
        let mut state = PlannerState::default();
        assert!(state.apply(Action::AuthStarted));
        assert!(!state.apply(Action::AuthStarted));
        state.apply(Action::AuthSucceeded);
        assert!(!state.apply(Action::AuthStarted));

        let mut unavailable = PlannerState::default();
        unavailable.apply(Action::CalendarUnavailable("no credentials".to_string()));
        assert!(!unavailable.apply(Action::AuthStarted));
        assert_eq!(unavailable.banner_text(), Some("no credentials"));
    }

    #[test]
    fn snapshot_buckets_items_against_now() {
        let mut state = PlannerState::default();
        state.apply(Action::GenerationSucceeded(vec![
            ScheduleItem::new("09:00 - 09:30", "散歩", "🚶"),
            ScheduleItem::new("09:30 - 12:00", "資料作成", "📝"),
            ScheduleItem::new("13:00 - 14:00", "昼食", "🍱"),
            ScheduleItem::new("whenever", "読書", "📚"),
        ]));

        let statuses = state
            .snapshot(at(10, 0))
            .entries
            .iter()
            .map(|entry| entry.classification.status())
            .collect::<Vec<_>>();
        assert_eq!(
            statuses,
            vec![
                ItemStatus::Past,
                ItemStatus::Current,
                ItemStatus::Upcoming,
                ItemStatus::Upcoming
            ]
        );
    }
}

use crate::application::calendar::CalendarService;
use crate::application::errors::AppError;
use crate::application::notifications::NotificationScheduler;
use crate::application::oauth::{OAuthConfig, OAuthManager};
use crate::application::schedule_generator::ScheduleGenerator;
use crate::application::state::{Action, PlannerState, ScheduleSnapshot};
use crate::application::ticker::{TICK_PERIOD, spawn_ticker};
use crate::domain::models::{
    CalendarEvent, DayWindow, NotificationPermission, ScheduleItem, TaskList,
};
use crate::domain::time::Clock;
use crate::infrastructure::credential_store::SessionTokenStore;
use crate::infrastructure::gemini_client::GenerativeModelClient;
use crate::infrastructure::google_calendar_client::GoogleCalendarClient;
use crate::infrastructure::notifier::Notifier;
use crate::infrastructure::oauth_client::OAuthHttpClient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

struct CalendarIntegration {
    calendar: CalendarService<dyn GoogleCalendarClient>,
    oauth: OAuthManager<dyn OAuthHttpClient>,
}

/// Owns the planner state and drives every user-facing operation.
///
/// Failures are logged, written to the banner, and returned; none of them poison the planner.
pub struct Planner {
    state: Mutex<PlannerState>,
    generator: ScheduleGenerator<dyn GenerativeModelClient>,
    calendar: Option<CalendarIntegration>,
    notifier: Arc<dyn Notifier>,
    notifications: NotificationScheduler<dyn Notifier>,
    clock: Clock,
    ticker: Mutex<Option<JoinHandle<()>>>,
    torn_down: AtomicBool,
}

impl Planner {
    /// A planner without calendar integration.
    pub fn new(
        model_client: Arc<dyn GenerativeModelClient>,
        notifier: Arc<dyn Notifier>,
        clock: Clock,
    ) -> Self {
        let mut state = PlannerState::default();
        state.calendar.available = false;
        state.notification_permission = notifier.permission();

        Self {
            state: Mutex::new(state),
            generator: ScheduleGenerator::new(model_client, clock.clone()),
            calendar: None,
            notifications: NotificationScheduler::new(Arc::clone(&notifier), clock.clone()),
            notifier,
            clock,
            ticker: Mutex::new(None),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Enables calendar integration. Without an OAuth config the calendar stays disabled
    /// and the configuration banner is shown.
    pub fn with_calendar(
        mut self,
        calendar_client: Arc<dyn GoogleCalendarClient>,
        oauth_client: Arc<dyn OAuthHttpClient>,
        oauth_config: Option<OAuthConfig>,
    ) -> Self {
        let Some(oauth_config) = oauth_config else {
            warn!("google credentials are not configured; calendar integration disabled");
            if let Ok(state) = self.state.get_mut() {
                state.apply(Action::CalendarUnavailable(AppError::Configuration.to_string()));
            }
            return self;
        };

        self.calendar = Some(CalendarIntegration {
            calendar: CalendarService::new(calendar_client, self.clock.clone()),
            oauth: OAuthManager::new(oauth_config, Arc::new(SessionTokenStore::default()), oauth_client),
        });
        if let Ok(state) = self.state.get_mut() {
            state.calendar.available = true;
        }
        self
    }

    pub fn set_tasks(&self, tasks: TaskList) -> Result<(), AppError> {
        self.lock_state()?.apply(Action::TasksEdited(tasks));
        Ok(())
    }

    pub fn set_day_window(&self, day_window: DayWindow) -> Result<(), AppError> {
        day_window.validate().map_err(AppError::InvalidInput)?;
        self.lock_state()?.apply(Action::DayWindowChanged(day_window));
        Ok(())
    }

    pub fn set_use_calendar(&self, enabled: bool) -> Result<(), AppError> {
        self.lock_state()?.apply(Action::CalendarToggled(enabled));
        Ok(())
    }

    pub fn request_notification_permission(
        &self,
        requested: NotificationPermission,
    ) -> Result<NotificationPermission, AppError> {
        let permission = self.notifier.request_permission(requested);
        self.lock_state()?.apply(Action::PermissionChanged(permission));
        info!(?permission, "notification permission resolved");
        Ok(permission)
    }

    pub fn authorization_url(&self, state: &str) -> Result<String, AppError> {
        let integration = self.calendar.as_ref().ok_or(AppError::Configuration)?;
        integration
            .oauth
            .build_authorization_url(state)
            .map_err(|error| AppError::auth_init(&error))
    }

    /// Completes the consent flow with `authorization_code` and loads today's events.
    /// Does nothing when a session already exists.
    pub async fn connect_calendar(&self, authorization_code: &str) -> Result<(), AppError> {
        let integration = self.calendar.as_ref().ok_or(AppError::Configuration)?;
        if !self.lock_state()?.apply(Action::AuthStarted) {
            info!("calendar already connected");
            return Ok(());
        }

        if let Err(error) = integration.oauth.authenticate_with_code(authorization_code).await {
            return Err(self.command_error(
                "connect_calendar",
                AppError::auth_init(&error),
                Action::AuthFailed,
            ));
        }
        self.lock_state()?.apply(Action::AuthSucceeded);
        info!("calendar connected");

        self.refresh_calendar_events().await?;
        Ok(())
    }

    pub async fn refresh_calendar_events(&self) -> Result<Vec<CalendarEvent>, AppError> {
        let integration = self.calendar.as_ref().ok_or(AppError::Configuration)?;
        let access_token = integration
            .oauth
            .access_token()
            .map_err(|error| AppError::calendar_fetch(&error))?;

        match integration.calendar.fetch_today_events(&access_token).await {
            Ok(events) => {
                self.lock_state()?
                    .apply(Action::CalendarEventsLoaded(events.clone()));
                Ok(events)
            }
            Err(error) => Err(self.command_error(
                "refresh_calendar_events",
                AppError::calendar_fetch(&error),
                Action::CalendarFetchFailed,
            )),
        }
    }

    /// Generates a schedule from the current tasks, day window, and calendar events.
    ///
    /// Rejected while another generation is in flight. On success the schedule is
    /// replaced and notification timers are rebuilt; on failure the previous schedule stays.
    pub async fn generate(&self) -> Result<Vec<ScheduleItem>, AppError> {
        if self.is_torn_down() {
            return Err(AppError::ShutDown);
        }

        let (tasks, day_window, events) = {
            let mut state = self.lock_state()?;
            if !state.apply(Action::GenerationStarted) {
                return Err(AppError::InProgress);
            }
            (
                state.tasks.clone(),
                state.day_window.clone(),
                state.events_for_generation(),
            )
        };

        info!(
            tasks = tasks.tasks().len(),
            events = events.len(),
            start = %day_window.start_time,
            end = %day_window.end_time,
            "generating schedule"
        );
        let result = self
            .generator
            .generate_schedule(&tasks, &day_window.start_time, &day_window.end_time, &events)
            .await;

        if self.is_torn_down() {
            warn!("planner shut down during generation; result discarded");
            return Err(AppError::ShutDown);
        }

        match result {
            Ok(schedule) => {
                let permission = {
                    let mut state = self.lock_state()?;
                    state.apply(Action::GenerationSucceeded(schedule.clone()));
                    state.notification_permission
                };
                let armed = self.notifications.rebuild(&schedule, permission)?;
                info!(items = schedule.len(), armed, "schedule stored");
                Ok(schedule)
            }
            Err(error) => Err(self.command_error(
                "generate",
                AppError::Generation(error),
                Action::GenerationFailed,
            )),
        }
    }

    /// Writes the current schedule to the primary calendar, one event per item.
    pub async fn export_to_calendar(&self) -> Result<Vec<String>, AppError> {
        let integration = self.calendar.as_ref().ok_or(AppError::Configuration)?;
        let schedule = {
            let state = self.lock_state()?;
            if !state.calendar.authed {
                return Err(AppError::CalendarWrite("google authentication required".to_string()));
            }
            state.schedule.clone()
        };
        if schedule.is_empty() {
            return Ok(Vec::new());
        }

        let access_token = integration
            .oauth
            .access_token()
            .map_err(|error| AppError::calendar_write(&error))?;
        match integration.calendar.write_schedule(&access_token, &schedule).await {
            Ok(event_ids) => {
                self.lock_state()?.apply(Action::CalendarWriteSucceeded);
                info!(count = event_ids.len(), "schedule exported to calendar");
                Ok(event_ids)
            }
            Err(error) => Err(self.command_error(
                "export_to_calendar",
                AppError::calendar_write(&error),
                Action::CalendarWriteFailed,
            )),
        }
    }

    pub fn snapshot(&self) -> Result<ScheduleSnapshot, AppError> {
        Ok(self.lock_state()?.snapshot(self.clock.now()))
    }

    pub fn armed_notifications(&self) -> usize {
        self.notifications.armed_count()
    }

    /// Renders a snapshot immediately and then every tick until shutdown.
    pub fn start_ticker<F>(self: &Arc<Self>, on_render: F) -> Result<(), AppError>
    where
        F: Fn(&ScheduleSnapshot) + Send + 'static,
    {
        let planner = Arc::downgrade(self);
        let handle = spawn_ticker(TICK_PERIOD, move || {
            let Some(planner) = planner.upgrade() else {
                return false;
            };
            if planner.is_torn_down() {
                return false;
            }
            match planner.snapshot() {
                Ok(snapshot) => {
                    on_render(&snapshot);
                    true
                }
                Err(error) => {
                    error!(error = %error, "failed to render schedule");
                    false
                }
            }
        });

        let mut ticker = self
            .ticker
            .lock()
            .map_err(|error| AppError::State(format!("ticker lock poisoned: {error}")))?;
        if let Some(previous) = ticker.replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    /// Cancels timers and the ticker. A generation still in flight is discarded when it
    /// completes, and the closed scheduler arms nothing for it.
    pub fn shutdown(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
        if let Err(error) = self.notifications.close() {
            error!(error = %error, "failed to cancel notification timers");
        }
        if let Ok(mut ticker) = self.ticker.lock() {
            if let Some(handle) = ticker.take() {
                handle.abort();
            }
        }
        info!("planner shut down");
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn command_error(&self, command: &str, error: AppError, to_action: fn(String) -> Action) -> AppError {
        error!(command, error = %error, "planner command failed");
        if let Ok(mut state) = self.state.lock() {
            state.apply(to_action(error.to_string()));
        }
        error
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, PlannerState>, AppError> {
        self.state
            .lock()
            .map_err(|error| AppError::State(format!("state lock poisoned: {error}")))
    }
}

impl Drop for Planner {
    fn drop(&mut self) {
        if let Ok(ticker) = self.ticker.get_mut() {
            if let Some(handle) = ticker.take() {
                handle.abort();
            }
        }
        let _ = self.notifications.close();
    }
}

use crate::domain::models::{CalendarEvent, ScheduleItem};
use crate::domain::time::Clock;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::{decode_calendar_event, encode_schedule_item};
use crate::infrastructure::google_calendar_client::{
    GoogleCalendarClient, ListEventsRequest, PRIMARY_CALENDAR_ID,
};
use chrono::{NaiveTime, Utc};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::info;

const EVENT_CREATION_CONCURRENCY: usize = 4;

pub struct CalendarService<C>
where
    C: GoogleCalendarClient + ?Sized + 'static,
{
    calendar_client: Arc<C>,
    clock: Clock,
    calendar_id: String,
}

impl<C> CalendarService<C>
where
    C: GoogleCalendarClient + ?Sized + 'static,
{
    pub fn new(calendar_client: Arc<C>, clock: Clock) -> Self {
        Self {
            calendar_client,
            clock,
            calendar_id: PRIMARY_CALENDAR_ID.to_string(),
        }
    }

    /// Events on the primary calendar between local 00:00:00.000 and 23:59:59.999 today.
    pub async fn fetch_today_events(&self, access_token: &str) -> Result<Vec<CalendarEvent>, InfraError> {
        let request = self.today_window()?;
        let events = self
            .calendar_client
            .list_events(access_token, &self.calendar_id, request)
            .await?;
        info!(count = events.len(), "fetched today's calendar events");
        Ok(events.iter().map(decode_calendar_event).collect())
    }

    /// Inserts one event per item. Every insert must succeed; returns the created ids in item order.
    pub async fn write_schedule(
        &self,
        access_token: &str,
        schedule: &[ScheduleItem],
    ) -> Result<Vec<String>, InfraError> {
        let day = self.clock.today();
        let events = schedule
            .iter()
            .map(|item| encode_schedule_item(item, day, &self.clock))
            .collect::<Result<Vec<_>, _>>()?;

        let mut create_tasks: JoinSet<Result<(usize, String), InfraError>> = JoinSet::new();
        let mut created_event_ids = vec![None; events.len()];

        for (index, event) in events.into_iter().enumerate() {
            let calendar_client = Arc::clone(&self.calendar_client);
            let access_token = access_token.to_string();
            let calendar_id = self.calendar_id.clone();

            create_tasks.spawn(async move {
                let event_id = calendar_client
                    .create_event(&access_token, &calendar_id, &event)
                    .await?;
                Ok((index, event_id))
            });

            if create_tasks.len() >= EVENT_CREATION_CONCURRENCY {
                collect_created_event_id(&mut create_tasks, &mut created_event_ids).await?;
            }
        }

        while !create_tasks.is_empty() {
            collect_created_event_id(&mut create_tasks, &mut created_event_ids).await?;
        }

        let created = created_event_ids.into_iter().flatten().collect::<Vec<_>>();
        info!(count = created.len(), "wrote schedule to calendar");
        Ok(created)
    }

    fn today_window(&self) -> Result<ListEventsRequest, InfraError> {
        let today = self.clock.today();
        let day_start = today.and_time(NaiveTime::MIN);
        let day_end = today.and_time(
            NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
                .ok_or_else(|| InfraError::CalendarApi("invalid end of day".to_string()))?,
        );
        let time_min = self.clock.localize(day_start).ok_or_else(|| {
            InfraError::CalendarApi(format!("start of day {today} does not exist in the configured zone"))
        })?;
        let time_max = self.clock.localize(day_end).ok_or_else(|| {
            InfraError::CalendarApi(format!("end of day {today} does not exist in the configured zone"))
        })?;
        Ok(ListEventsRequest {
            time_min: time_min.with_timezone(&Utc),
            time_max: time_max.with_timezone(&Utc),
        })
    }
}

async fn collect_created_event_id(
    create_tasks: &mut JoinSet<Result<(usize, String), InfraError>>,
    created_event_ids: &mut [Option<String>],
) -> Result<(), InfraError> {
    let Some(join_result) = create_tasks.join_next().await else {
        return Ok(());
    };
    let created = join_result.map_err(|error| {
        InfraError::CalendarApi(format!("failed to join calendar event creation task: {error}"))
    })??;
    if let Some(slot) = created_event_ids.get_mut(created.0) {
        *slot = Some(created.1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::time::Zone;
    use crate::infrastructure::event_mapper::{CalendarEventDateTime, GoogleCalendarEvent};
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeGoogleCalendarClient {
        listed: Vec<GoogleCalendarEvent>,
        list_requests: Mutex<Vec<(String, ListEventsRequest)>>,
        created: Mutex<Vec<GoogleCalendarEvent>>,
        fail_create_for: Option<String>,
    }

    #[async_trait]
    impl GoogleCalendarClient for FakeGoogleCalendarClient {
        async fn list_events(
            &self,
            _access_token: &str,
            calendar_id: &str,
            request: ListEventsRequest,
        ) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
            self.list_requests
                .lock()
                .expect("list mutex poisoned")
                .push((calendar_id.to_string(), request));
            Ok(self.listed.clone())
        }

        async fn create_event(
            &self,
            _access_token: &str,
            _calendar_id: &str,
            event: &GoogleCalendarEvent,
        ) -> Result<String, InfraError> {
            if event.summary.as_deref() == self.fail_create_for.as_deref() {
                return Err(InfraError::CalendarApi("Rate Limit Exceeded".to_string()));
            }
            let mut created = self.created.lock().expect("create mutex poisoned");
            created.push(event.clone());
            Ok(format!("evt-{}", event.summary.clone().unwrap_or_default()))
        }
    }

    fn fixed_clock() -> Clock {
        // 2026-02-16 10:00 in Tokyo.
        let instant = DateTime::parse_from_rfc3339("2026-02-16T01:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc);
        Clock::new(Zone::Named(chrono_tz::Asia::Tokyo)).with_now_provider(Arc::new(move || instant))
    }

    #[tokio::test]
    async fn fetch_requests_local_day_on_primary_calendar() {
        let client = Arc::new(FakeGoogleCalendarClient {
            listed: vec![GoogleCalendarEvent {
                id: Some("evt-1".to_string()),
                summary: Some("定例会議".to_string()),
                status: Some("confirmed".to_string()),
                start: CalendarEventDateTime {
                    date_time: Some("2026-02-16T10:00:00+09:00".to_string()),
                    ..CalendarEventDateTime::default()
                },
                end: CalendarEventDateTime {
                    date_time: Some("2026-02-16T11:00:00+09:00".to_string()),
                    ..CalendarEventDateTime::default()
                },
            }],
            ..FakeGoogleCalendarClient::default()
        });
        let service = CalendarService::new(Arc::clone(&client), fixed_clock());

        let events = service.fetch_today_events("token").await.expect("fetch");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary.as_deref(), Some("定例会議"));

        let requests = client.list_requests.lock().expect("list mutex poisoned");
        let (calendar_id, request) = &requests[0];
        assert_eq!(calendar_id, "primary");
        assert_eq!(request.time_min.to_rfc3339(), "2026-02-15T15:00:00+00:00");
        assert_eq!(
            request.time_max.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "2026-02-16T14:59:59.999Z"
        );
    }

    #[tokio::test]
    async fn write_creates_one_event_per_item_in_order() {
        let client = Arc::new(FakeGoogleCalendarClient::default());
        let service = CalendarService::new(Arc::clone(&client), fixed_clock());
        let schedule = (0..6)
            .map(|index| {
                ScheduleItem::new(
                    format!("{:02}:00 - {:02}:30", 10 + index, 10 + index),
                    format!("task-{index}"),
                    "✅",
                )
            })
            .collect::<Vec<_>>();

        let ids = service.write_schedule("token", &schedule).await.expect("write");

        assert_eq!(
            ids,
            (0..6).map(|index| format!("evt-✅ task-{index}")).collect::<Vec<_>>()
        );
        assert_eq!(client.created.lock().expect("create mutex poisoned").len(), 6);
    }

    #[tokio::test]
    async fn write_rolls_midnight_item_to_next_day() {
        let client = Arc::new(FakeGoogleCalendarClient::default());
        let service = CalendarService::new(Arc::clone(&client), fixed_clock());
        let schedule = vec![ScheduleItem::new("23:30 - 00:30", "片付け", "🧹")];

        service.write_schedule("token", &schedule).await.expect("write");

        let created = client.created.lock().expect("create mutex poisoned");
        assert_eq!(
            created[0].start.date_time.as_deref(),
            Some("2026-02-16T23:30:00+09:00")
        );
        assert_eq!(
            created[0].end.date_time.as_deref(),
            Some("2026-02-17T00:30:00+09:00")
        );
    }

    #[tokio::test]
    async fn write_fails_when_any_insert_fails() {
        let client = Arc::new(FakeGoogleCalendarClient {
            fail_create_for: Some("📝 資料作成".to_string()),
            ..FakeGoogleCalendarClient::default()
        });
        let service = CalendarService::new(Arc::clone(&client), fixed_clock());
        let schedule = vec![
            ScheduleItem::new("09:00 - 09:30", "散歩", "🚶"),
            ScheduleItem::new("09:30 - 12:00", "資料作成", "📝"),
        ];

        let error = service
            .write_schedule("token", &schedule)
            .await
            .expect_err("insert failure");
        assert_eq!(error.to_string(), "Rate Limit Exceeded");
    }

    #[tokio::test]
    async fn write_rejects_malformed_item_before_inserting() {
        let client = Arc::new(FakeGoogleCalendarClient::default());
        let service = CalendarService::new(Arc::clone(&client), fixed_clock());
        let schedule = vec![
            ScheduleItem::new("09:00 - 09:30", "散歩", "🚶"),
            ScheduleItem::new("sometime", "読書", "📚"),
        ];

        assert!(service.write_schedule("token", &schedule).await.is_err());
        assert!(client.created.lock().expect("create mutex poisoned").is_empty());
    }
}

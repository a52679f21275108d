use crate::domain::models::{CalendarEvent, ScheduleItem, TaskList};
use crate::domain::prompt::{build_prompt, format_calendar_events};
use crate::domain::time::Clock;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::gemini_client::GenerativeModelClient;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

pub const GENERATION_FAILED_MESSAGE: &str =
    "スケジュールの生成に失敗しました。後でもう一度お試しください。";

/// Any failure of the model round trip. The display text is fixed; the cause is logged.
#[derive(Debug, Error)]
#[error("{}", GENERATION_FAILED_MESSAGE)]
pub struct GenerationError {
    #[source]
    source: InfraError,
}

impl GenerationError {
    fn new(source: InfraError) -> Self {
        error!(error = %source, "error generating schedule");
        Self { source }
    }

    pub fn cause(&self) -> &InfraError {
        &self.source
    }
}

impl From<InfraError> for GenerationError {
    fn from(source: InfraError) -> Self {
        Self::new(source)
    }
}

/// Response schema: an array of `{time, task, emoji}` objects, all required.
pub fn schedule_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "time": {
                    "type": "STRING",
                    "description": "The time slot for the task in 'HH:mm - HH:mm' format."
                },
                "task": {
                    "type": "STRING",
                    "description": "A short, clear description of the task."
                },
                "emoji": {
                    "type": "STRING",
                    "description": "A single, relevant emoji for the task."
                }
            },
            "required": ["time", "task", "emoji"]
        }
    })
}

pub struct ScheduleGenerator<M>
where
    M: GenerativeModelClient + ?Sized,
{
    model_client: Arc<M>,
    clock: Clock,
}

impl<M> ScheduleGenerator<M>
where
    M: GenerativeModelClient + ?Sized,
{
    pub fn new(model_client: Arc<M>, clock: Clock) -> Self {
        Self { model_client, clock }
    }

    pub fn prompt_for(
        &self,
        tasks: &TaskList,
        start_time: &str,
        end_time: &str,
        calendar_events: &[CalendarEvent],
    ) -> String {
        let formatted_events = format_calendar_events(calendar_events, &self.clock);
        build_prompt(&tasks.to_prompt_text(), start_time, end_time, &formatted_events)
    }

    /// Single best-effort model call.
    ///
    /// A response that parses to a non-array JSON value yields `Ok(vec![])`.
    pub async fn generate_schedule(
        &self,
        tasks: &TaskList,
        start_time: &str,
        end_time: &str,
        calendar_events: &[CalendarEvent],
    ) -> Result<Vec<ScheduleItem>, GenerationError> {
        let prompt = self.prompt_for(tasks, start_time, end_time, calendar_events);
        let raw = self
            .model_client
            .generate_json(&prompt, &schedule_response_schema())
            .await
            .map_err(GenerationError::new)?;

        let items = parse_schedule_response(&raw).map_err(GenerationError::new)?;
        info!(items = items.len(), "schedule generated");
        Ok(items)
    }
}

pub fn parse_schedule_response(raw: &str) -> Result<Vec<ScheduleItem>, InfraError> {
    let parsed: serde_json::Value = serde_json::from_str(raw.trim())?;
    if !parsed.is_array() {
        error!(response = %parsed, "parsed response is not an array");
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(parsed)?)
}

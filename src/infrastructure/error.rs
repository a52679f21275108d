use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("OAuth error: {0}")]
    OAuth(String),
    #[error("{0}")]
    CalendarApi(String),
    #[error("Model API error: {0}")]
    ModelApi(String),
    #[error("Notification error: {0}")]
    Notification(String),
}

#[derive(Debug, serde::Deserialize)]
struct GoogleApiErrorEnvelope {
    error: Option<GoogleApiErrorBody>,
}

#[derive(Debug, serde::Deserialize)]
struct GoogleApiErrorBody {
    message: Option<String>,
}

/// Best available message from a failed Google API response: `error.message`,
/// then the raw body, then the HTTP status.
pub fn google_api_error_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if let Some(message) = serde_json::from_str::<GoogleApiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
    {
        return message;
    }
    if body.is_empty() {
        format!("http {status}")
    } else {
        body.to_string()
    }
}

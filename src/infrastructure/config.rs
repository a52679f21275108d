use crate::domain::models::{DEFAULT_DAY_END, DEFAULT_DAY_START, DayWindow, NotificationPermission};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::gemini_client::DEFAULT_MODEL;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// IANA zone name. `None` means the system zone.
    pub timezone: Option<String>,
    pub model: String,
    pub day_window: DayWindow,
    pub use_calendar: bool,
    pub notifications: NotificationPermission,
}

fn default_app_config() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "timezone": null,
        "model": DEFAULT_MODEL,
        "dayWindow": {
            "start": DEFAULT_DAY_START,
            "end": DEFAULT_DAY_END
        },
        "useCalendar": true,
        "notifications": "default"
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_config())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

fn non_empty_str<'a>(value: &'a serde_json::Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let app = read_config(&path)?;

    let day_window = DayWindow::new(
        non_empty_str(&app, "/dayWindow/start").unwrap_or(DEFAULT_DAY_START),
        non_empty_str(&app, "/dayWindow/end").unwrap_or(DEFAULT_DAY_END),
    );
    day_window
        .validate()
        .map_err(|message| InfraError::InvalidConfig(format!("{message} in {}", path.display())))?;

    let notifications = non_empty_str(&app, "/notifications")
        .map(NotificationPermission::parse)
        .transpose()
        .map_err(|message| InfraError::InvalidConfig(format!("{message} in {}", path.display())))?
        .unwrap_or_default();

    Ok(AppConfig {
        timezone: non_empty_str(&app, "/timezone").map(ToOwned::to_owned),
        model: non_empty_str(&app, "/model")
            .unwrap_or(DEFAULT_MODEL)
            .to_string(),
        day_window,
        use_calendar: app
            .get("useCalendar")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true),
        notifications,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_written_once_and_loaded() {
        let dir = tempdir().expect("temp dir");
        ensure_default_configs(dir.path()).expect("write defaults");

        let config = load_app_config(dir.path()).expect("load config");
        assert_eq!(
            config,
            AppConfig {
                timezone: None,
                model: DEFAULT_MODEL.to_string(),
                day_window: DayWindow::new("09:00", "22:00"),
                use_calendar: true,
                notifications: NotificationPermission::Default,
            }
        );

        fs::write(
            dir.path().join(APP_JSON),
            r#"{"schema":1,"timezone":"Asia/Tokyo","model":"gemini-2.5-pro","dayWindow":{"start":"08:00","end":"18:30"},"useCalendar":false,"notifications":"granted"}"#,
        )
        .expect("overwrite config");
        ensure_default_configs(dir.path()).expect("keep existing");

        let config = load_app_config(dir.path()).expect("load config");
        assert_eq!(config.timezone.as_deref(), Some("Asia/Tokyo"));
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.day_window, DayWindow::new("08:00", "18:30"));
        assert!(!config.use_calendar);
        assert_eq!(config.notifications, NotificationPermission::Granted);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let dir = tempdir().expect("temp dir");
        fs::write(dir.path().join(APP_JSON), r#"{"schema":1,"dayWindow":{"end":"20:00"}}"#)
            .expect("write config");

        let config = load_app_config(dir.path()).expect("load config");
        assert_eq!(config.day_window, DayWindow::new("09:00", "20:00"));
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn rejects_unsupported_schema() {
        let dir = tempdir().expect("temp dir");
        fs::write(dir.path().join(APP_JSON), r#"{"schema":2}"#).expect("write config");

        match load_app_config(dir.path()) {
            Err(InfraError::InvalidConfig(message)) => assert!(message.contains("unsupported schema 2")),
            other => panic!("expected invalid config error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_day_window_and_permission() {
        let dir = tempdir().expect("temp dir");
        fs::write(dir.path().join(APP_JSON), r#"{"schema":1,"dayWindow":{"start":"9am"}}"#)
            .expect("write config");
        assert!(matches!(
            load_app_config(dir.path()),
            Err(InfraError::InvalidConfig(_))
        ));

        fs::write(dir.path().join(APP_JSON), r#"{"schema":1,"notifications":"maybe"}"#)
            .expect("write config");
        assert!(matches!(
            load_app_config(dir.path()),
            Err(InfraError::InvalidConfig(_))
        ));
    }
}

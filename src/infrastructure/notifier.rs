//! Desktop notification capability.
//!
//! macOS goes through `osascript`, Linux through `notify-send`. Elsewhere the
//! capability is absent and permission stays at `Default`.
use crate::domain::models::{Notification, NotificationPermission};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::process::Command;
use tracing::info;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;

    /// Resolves a `Default` permission to `requested`. `Granted` and `Denied` are final.
    fn request_permission(&self, requested: NotificationPermission) -> NotificationPermission;

    async fn notify(&self, notification: &Notification) -> Result<(), InfraError>;
}

#[derive(Debug)]
pub struct DesktopNotifier {
    permission: Mutex<NotificationPermission>,
}

impl DesktopNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self {
            permission: Mutex::new(permission),
        }
    }

    pub fn is_supported() -> bool {
        cfg!(any(target_os = "macos", target_os = "linux"))
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    fn permission(&self) -> NotificationPermission {
        if !Self::is_supported() {
            return NotificationPermission::Default;
        }
        self.permission
            .lock()
            .map(|guard| *guard)
            .unwrap_or_default()
    }

    fn request_permission(&self, requested: NotificationPermission) -> NotificationPermission {
        if !Self::is_supported() {
            return NotificationPermission::Default;
        }
        let Ok(mut guard) = self.permission.lock() else {
            return NotificationPermission::Default;
        };
        if *guard == NotificationPermission::Default {
            *guard = requested;
        }
        *guard
    }

    async fn notify(&self, notification: &Notification) -> Result<(), InfraError> {
        let Some(mut command) = platform_command(notification) else {
            return Ok(());
        };
        info!(title = %notification.title, body = %notification.body, "raising notification");
        let output = command
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| InfraError::Notification(error.to_string()))?;

        if !output.status.success() {
            return Err(InfraError::Notification(format!(
                "notification command failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Quotes `value` as an AppleScript string literal body.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn applescript_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(target_os = "macos")]
fn platform_command(notification: &Notification) -> Option<Command> {
    let script = format!(
        r#"display notification "{}" with title "{}""#,
        applescript_escape(&notification.body),
        applescript_escape(&notification.title)
    );
    let mut command = Command::new("osascript");
    command.arg("-e").arg(script);
    Some(command)
}

#[cfg(target_os = "linux")]
fn platform_command(notification: &Notification) -> Option<Command> {
    let mut command = Command::new("notify-send");
    command
        .arg("--app-name=dayplan")
        .arg(&notification.title)
        .arg(&notification.body);
    Some(command)
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn platform_command(_notification: &Notification) -> Option<Command> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_only_resolves_default_permission() {
        let notifier = DesktopNotifier::new(NotificationPermission::Default);
        let resolved = notifier.request_permission(NotificationPermission::Granted);
        if DesktopNotifier::is_supported() {
            assert_eq!(resolved, NotificationPermission::Granted);
            assert_eq!(
                notifier.request_permission(NotificationPermission::Denied),
                NotificationPermission::Granted
            );
        } else {
            assert_eq!(resolved, NotificationPermission::Default);
        }
    }

    #[test]
    fn applescript_escape_handles_backslash_before_quote() {
        assert_eq!(applescript_escape(r#"path\"#), r#"path\\"#);
        assert_eq!(applescript_escape(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(applescript_escape(r#"a\"b"#), r#"a\\\"b"#);
    }

    #[test]
    fn denied_permission_is_final() {
        let notifier = DesktopNotifier::new(NotificationPermission::Denied);
        let resolved = notifier.request_permission(NotificationPermission::Granted);
        assert_ne!(resolved, NotificationPermission::Granted);
    }
}

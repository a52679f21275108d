use crate::application::state::ScheduleSnapshot;
use crate::domain::models::{ItemStatus, NotificationPermission};
use std::fmt::Write;

pub const SCHEDULE_HEADING: &str = "今日のプラン";
pub const EMPTY_SCHEDULE_TITLE: &str = "スケジュールがありません";
pub const EMPTY_SCHEDULE_HINT: &str =
    "今日のタスクを入力して、AIにスケジュールを作成してもらいましょう。";
const LOADING_TEXT: &str = "スケジュールを作成中...";
const CALENDAR_CONNECTED: &str = "カレンダー連携: 連携済み";
const CALENDAR_DISCONNECTED: &str = "カレンダー連携: 未連携";

fn status_marker(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Past => "✓",
        ItemStatus::Current => "▶",
        ItemStatus::Upcoming => " ",
    }
}

pub fn permission_label(permission: NotificationPermission) -> &'static str {
    match permission {
        NotificationPermission::Granted => "通知はオンです",
        NotificationPermission::Denied => "通知はブロックされています",
        NotificationPermission::Default => "通知を有効にする",
    }
}

/// Plain-text rendering of one tick.
pub fn render_snapshot(snapshot: &ScheduleSnapshot) -> String {
    let mut out = String::new();
    let calendar = if snapshot.calendar_connected {
        CALENDAR_CONNECTED
    } else {
        CALENDAR_DISCONNECTED
    };
    let _ = writeln!(
        out,
        "{calendar} | {}",
        permission_label(snapshot.notification_permission)
    );
    if let Some(banner) = &snapshot.banner {
        let _ = writeln!(out, "⚠ {banner}");
    }
    if snapshot.is_loading {
        let _ = writeln!(out, "{LOADING_TEXT}");
    }

    if snapshot.entries.is_empty() {
        let _ = writeln!(out, "{EMPTY_SCHEDULE_TITLE}");
        let _ = writeln!(out, "{EMPTY_SCHEDULE_HINT}");
        return out;
    }

    let _ = writeln!(out, "{SCHEDULE_HEADING}");
    let _ = writeln!(out, "{}", "=".repeat(24));
    for entry in &snapshot.entries {
        let status = entry.classification.status();
        let task = match status {
            ItemStatus::Past => format!("({})", entry.item.task),
            _ => entry.item.task.clone(),
        };
        let _ = writeln!(
            out,
            "{} {} {}  {}",
            status_marker(status),
            entry.item.time,
            entry.item.emoji,
            task
        );
    }
    out
}

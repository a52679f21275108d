use crate::domain::models::{CalendarEvent, EventTime};
use crate::domain::time::Clock;
use chrono::{DateTime, Utc};

pub const NO_COMMITMENTS: &str = "なし";
pub const ALL_DAY_MARKER: &str = "終日";

/// Renders busy blocks as one `- summary (HH:mm - HH:mm)` line each.
pub fn format_calendar_events(events: &[CalendarEvent], clock: &Clock) -> String {
    if events.is_empty() {
        return NO_COMMITMENTS.to_string();
    }

    events
        .iter()
        .map(|event| {
            let summary = event.summary.as_deref().unwrap_or_default();
            let start = event_clock_time(&event.start, clock);
            let line = match start {
                Some(start) => match event_clock_time(&event.end, clock) {
                    Some(end) => format!("{start} - {end}"),
                    None => start,
                },
                None => ALL_DAY_MARKER.to_string(),
            };
            format!("- {summary} ({line})")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn event_clock_time(value: &EventTime, clock: &Clock) -> Option<String> {
    let raw = value.date_time.as_deref()?;
    Some(match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => clock
            .to_local(parsed.with_timezone(&Utc))
            .format("%H:%M")
            .to_string(),
        Err(_) => raw.to_string(),
    })
}

/// Instruction text handed to the model. Deterministic in its four inputs.
pub fn build_prompt(
    task_text: &str,
    start_time: &str,
    end_time: &str,
    formatted_events: &str,
) -> String {
    format!(
        "
    あなたは優秀なライフコーチ兼スケジューラです。以下の情報に基づき、現実的で生産的な1日のスケジュールを作成してください。

    # 前提条件
    - 1日の活動時間は {start_time} から {end_time} までとします。
    - 各タスクに適切な時間を割り当て、休憩時間（昼食、夕食、小休憩など）も必ず含めてください。
    - 確定済みの予定は変更せず、その空き時間にタスクを効率的に配置してください。
    - タスクリストが空の場合や無関係なテキストの場合は、サンプルスケジュールを生成してください。
    - 出力はJSON形式のオブジェクト配列でなければなりません。各オブジェクトは'time'（例: '09:00 - 10:30'）、'task'（タスクの短い説明）、'emoji'（タスクに関連する絵文字）の3つのキーを持つ必要があります。

    # 確定済みの予定
    ---
    {formatted_events}
    ---

    # 今日やりたいタスクリスト
    ---
    {task_text}
    ---
  "
    )
}

use crate::application::schedule_generator::GenerationError;
use crate::infrastructure::error::InfraError;
use thiserror::Error;

/// Failures surfaced to the user as banner text.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Google APIの認証情報が設定されていません。カレンダー連携は無効です。")]
    Configuration,
    #[error("Google Identity Serviceの初期化に失敗しました: {0}")]
    AuthInit(String),
    #[error("カレンダーの予定取得に失敗しました: {0}")]
    CalendarFetch(String),
    #[error("カレンダーへの予定登録に失敗しました: {0}")]
    CalendarWrite(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("スケジュールを生成中です。完了までお待ちください。")]
    InProgress,
    #[error("planner has been shut down")]
    ShutDown,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("state error: {0}")]
    State(String),
    #[error(transparent)]
    Infrastructure(#[from] InfraError),
}

impl AppError {
    pub fn auth_init(error: &InfraError) -> Self {
        Self::AuthInit(error.to_string())
    }

    pub fn calendar_fetch(error: &InfraError) -> Self {
        Self::CalendarFetch(error.to_string())
    }

    pub fn calendar_write(error: &InfraError) -> Self {
        Self::CalendarWrite(error.to_string())
    }
}

use crate::application::oauth::{DEFAULT_REDIRECT_URI, DEFAULT_SCOPE, OAuthConfig};
use crate::domain::time::{Clock, Zone};
use crate::infrastructure::config::{AppConfig, ensure_default_configs, load_app_config};
use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct BootstrapResult {
    pub logs_dir: PathBuf,
    pub config: AppConfig,
    pub clock: Clock,
}

/// Creates `config/` and `logs/` under `workspace_root`, writes missing defaults, and loads them.
pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    let logs_dir = workspace_root.join("logs");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_configs(&config_dir)?;
    let config = load_app_config(&config_dir)?;
    let zone = match config.timezone.as_deref() {
        Some(name) => Zone::parse(name).map_err(InfraError::InvalidConfig)?,
        None => Zone::System,
    };

    Ok(BootstrapResult {
        logs_dir,
        config,
        clock: Clock::new(zone),
    })
}

pub fn load_gemini_api_key_from_env() -> Result<String, InfraError> {
    load_gemini_api_key_from_lookup(|key| std::env::var(key).ok())
}

pub fn load_gemini_api_key_from_lookup<F>(lookup: F) -> Result<String, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    required_lookup_value(
        &lookup,
        &["DAYPLAN_GEMINI_API_KEY", "GEMINI_API_KEY", "API_KEY"],
        "gemini api key",
    )
}

pub fn load_oauth_config_from_env() -> Option<OAuthConfig> {
    load_oauth_config_from_lookup(|key| std::env::var(key).ok())
}

/// `None` when either the client id or the secret is missing.
pub fn load_oauth_config_from_lookup<F>(lookup: F) -> Option<OAuthConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let client_id = optional_lookup_value(&lookup, &["DAYPLAN_GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_ID"])?;
    let client_secret = optional_lookup_value(
        &lookup,
        &["DAYPLAN_GOOGLE_CLIENT_SECRET", "GOOGLE_CLIENT_SECRET"],
    )?;
    let redirect_uri = optional_lookup_value(
        &lookup,
        &["DAYPLAN_GOOGLE_REDIRECT_URI", "GOOGLE_REDIRECT_URI"],
    )
    .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

    Some(OAuthConfig::new(
        client_id,
        client_secret,
        redirect_uri,
        vec![DEFAULT_SCOPE.to_string()],
    ))
}

fn required_lookup_value<F>(
    lookup: &F,
    keys: &[&str],
    field_name: &str,
) -> Result<String, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    optional_lookup_value(lookup, keys).ok_or_else(|| {
        InfraError::InvalidConfig(format!(
            "missing {} (set one of: {})",
            field_name,
            keys.join(", ")
        ))
    })
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}

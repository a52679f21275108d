pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod view;

use application::bootstrap::{
    BootstrapResult, bootstrap_workspace, load_gemini_api_key_from_env, load_oauth_config_from_env,
};
use application::errors::AppError;
use application::oauth::OAuthManager;
use application::planner::Planner;
use clap::{Args, Parser, Subcommand};
use domain::models::{DayWindow, NotificationPermission, TaskList};
use domain::prompt::{build_prompt, format_calendar_events};
use infrastructure::credential_store::SessionTokenStore;
use infrastructure::error::InfraError;
use infrastructure::gemini_client::ReqwestGeminiClient;
use infrastructure::google_calendar_client::ReqwestGoogleCalendarClient;
use infrastructure::logging::{LOG_FILE_NAME, init_tracing};
use infrastructure::notifier::DesktopNotifier;
use infrastructure::oauth_client::ReqwestOAuthClient;
use std::fs;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "dayplan", version, about = "Plan today's schedule with Gemini and Google Calendar")]
struct Cli {
    /// Directory holding `config/` and `logs/`.
    #[arg(long, global = true, default_value = ".")]
    workspace: PathBuf,
    #[arg(long, global = true, default_value = "info", env = "DAYPLAN_LOG_LEVEL")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the Google consent URL.
    AuthUrl {
        #[arg(long, default_value = "dayplan")]
        state: String,
    },
    /// Generate today's schedule.
    Plan(PlanArgs),
    /// Print the prompt that would be sent to the model.
    Prompt(TaskArgs),
}

#[derive(Debug, Args)]
struct TaskArgs {
    /// One task; repeatable.
    #[arg(long = "task", value_name = "TASK")]
    tasks: Vec<String>,
    /// File with one task per line. Stdin is read when no task source is given.
    #[arg(long)]
    tasks_file: Option<PathBuf>,
    /// Day start, HH:MM.
    #[arg(long)]
    start: Option<String>,
    /// Day end, HH:MM.
    #[arg(long)]
    end: Option<String>,
}

#[derive(Debug, Args)]
struct PlanArgs {
    #[command(flatten)]
    task_args: TaskArgs,
    #[arg(long)]
    no_calendar: bool,
    /// Authorization code from the consent screen.
    #[arg(long, env = "DAYPLAN_GOOGLE_AUTH_CODE")]
    auth_code: Option<String>,
    /// Insert the generated schedule into the primary calendar.
    #[arg(long)]
    write_calendar: bool,
    /// Keep re-rendering every minute and raise notifications until Ctrl+C.
    #[arg(long)]
    watch: bool,
    /// granted, denied, or default.
    #[arg(long, value_parser = NotificationPermission::parse)]
    notifications: Option<NotificationPermission>,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let bootstrap = match bootstrap_workspace(&cli.workspace) {
        Ok(bootstrap) => bootstrap,
        Err(error) => {
            eprintln!("failed to initialize workspace: {error}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(error) = init_tracing(&cli.log_level, Some(&bootstrap.logs_dir.join(LOG_FILE_NAME))) {
        eprintln!("{error}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            error!(error = %error, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async move {
        match cli.command {
            Command::AuthUrl { state } => print_auth_url(&state),
            Command::Plan(args) => plan(&bootstrap, args).await,
            Command::Prompt(args) => print_prompt(&bootstrap, &args),
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(error = %error, "command failed");
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn print_auth_url(state: &str) -> Result<(), AppError> {
    let config = load_oauth_config_from_env().ok_or(AppError::Configuration)?;
    let manager = OAuthManager::new(
        config,
        Arc::new(SessionTokenStore::default()),
        Arc::new(ReqwestOAuthClient::new()),
    );
    let url = manager
        .build_authorization_url(state)
        .map_err(|error| AppError::auth_init(&error))?;
    println!("{url}");
    Ok(())
}

fn print_prompt(bootstrap: &BootstrapResult, args: &TaskArgs) -> Result<(), AppError> {
    let tasks = read_tasks(args)?;
    let day_window = day_window(bootstrap, args);
    day_window.validate().map_err(AppError::InvalidInput)?;
    let prompt = build_prompt(
        &tasks.to_prompt_text(),
        &day_window.start_time,
        &day_window.end_time,
        &format_calendar_events(&[], &bootstrap.clock),
    );
    println!("{prompt}");
    Ok(())
}

async fn plan(bootstrap: &BootstrapResult, args: PlanArgs) -> Result<(), AppError> {
    let config = &bootstrap.config;
    let api_key = load_gemini_api_key_from_env()?;
    let model_client = Arc::new(ReqwestGeminiClient::new(api_key, config.model.clone()));
    let notifier = Arc::new(DesktopNotifier::new(NotificationPermission::Default));

    let use_calendar = config.use_calendar && !args.no_calendar;
    let mut planner = Planner::new(model_client, notifier, bootstrap.clock.clone());
    if use_calendar {
        planner = planner.with_calendar(
            Arc::new(ReqwestGoogleCalendarClient::new()),
            Arc::new(ReqwestOAuthClient::new()),
            load_oauth_config_from_env(),
        );
    }
    let planner = Arc::new(planner);

    let requested = args.notifications.unwrap_or(config.notifications);
    let permission = planner.request_notification_permission(requested)?;
    if !DesktopNotifier::is_supported() {
        info!(?permission, "desktop notifications are not supported on this platform");
    }

    planner.set_tasks(read_tasks(&args.task_args)?)?;
    planner.set_day_window(day_window(bootstrap, &args.task_args))?;
    planner.set_use_calendar(use_calendar)?;

    if use_calendar {
        if let Some(code) = args.auth_code.as_deref() {
            // Failures land in the banner; planning continues without events.
            let _ = planner.connect_calendar(code).await;
        }
    }

    let generated = planner.generate().await;
    // The ticker renders on its first tick.
    if !args.watch {
        print!("{}", view::render_snapshot(&planner.snapshot()?));
    }

    if generated.is_ok() && args.write_calendar {
        match planner.export_to_calendar().await {
            Ok(event_ids) => println!("カレンダーに{}件の予定を登録しました。", event_ids.len()),
            Err(error) => eprintln!("{error}"),
        }
    }

    if args.watch {
        planner.start_ticker(|snapshot| {
            print!("{}", view::render_snapshot(snapshot));
        })?;
        tokio::signal::ctrl_c().await.map_err(InfraError::Io)?;
        planner.shutdown();
    }

    generated.map(|_| ())
}

fn day_window(bootstrap: &BootstrapResult, args: &TaskArgs) -> DayWindow {
    let defaults = &bootstrap.config.day_window;
    DayWindow::new(
        args.start.clone().unwrap_or_else(|| defaults.start_time.clone()),
        args.end.clone().unwrap_or_else(|| defaults.end_time.clone()),
    )
}

fn read_tasks(args: &TaskArgs) -> Result<TaskList, AppError> {
    let mut lines = args.tasks.clone();
    if let Some(path) = &args.tasks_file {
        let text = fs::read_to_string(path).map_err(InfraError::Io)?;
        lines.extend(text.lines().map(ToOwned::to_owned));
    }
    if args.tasks.is_empty() && args.tasks_file.is_none() && !std::io::stdin().is_terminal() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(InfraError::Io)?;
        lines.extend(text.lines().map(ToOwned::to_owned));
    }
    Ok(TaskList::new(lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn plan_flags_parse() {
        let cli = Cli::try_parse_from([
            "dayplan",
            "plan",
            "--task",
            "散歩",
            "--task",
            "資料作成",
            "--start",
            "09:00",
            "--end",
            "18:00",
            "--no-calendar",
            "--notifications",
            "granted",
        ])
        .expect("parse plan");

        let Command::Plan(args) = cli.command else {
            panic!("expected plan command");
        };
        assert_eq!(args.task_args.tasks, vec!["散歩", "資料作成"]);
        assert_eq!(args.task_args.start.as_deref(), Some("09:00"));
        assert!(args.no_calendar);
        assert_eq!(args.notifications, Some(NotificationPermission::Granted));
    }

    #[test]
    fn unknown_notification_permission_is_rejected() {
        assert!(Cli::try_parse_from(["dayplan", "plan", "--notifications", "maybe"]).is_err());
    }
}

// ==========================================
// 实验室排课管理 - 命令行入口
// ==========================================
// 子命令: preview / import / calendar / click / log / add-room / add-lecturer
// 输出: JSON（stdout）,日志写入 stderr
// ==========================================

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use lab_timetable::app::{get_default_db_path, AppState};
use lab_timetable::domain::{CallerContext, CallerRole, LecturerCatalogItem, RoomCatalogItem};
use lab_timetable::logging::{self, LogFormat};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "lab-timetable")]
#[command(about = "Lab timetable import and calendar status tool", long_about = None)]
struct Cli {
    /// Path to the SQLite database (defaults to the user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Caller role
    #[arg(long, global = true, value_enum, default_value_t = RoleArg::Admin)]
    role: RoleArg,

    /// Caller user id (looked up by email when omitted)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Caller email
    #[arg(long, global = true, default_value = "admin@localhost")]
    email: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Admin,
    Lecturer,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a timetable sheet without saving it
    Preview {
        /// Path to a .xlsx/.xls/.csv file
        file: PathBuf,
    },

    /// Validate a timetable sheet and save its valid rows
    Import {
        /// Path to a .xlsx/.xls/.csv file
        file: PathBuf,
    },

    /// Show the Monday-Saturday week containing a date
    Calendar {
        /// Any date in the week (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Evaluate statuses at this instant (YYYY-MM-DDTHH:MM:SS), defaults to now
        #[arg(long)]
        now: Option<NaiveDateTime>,
    },

    /// Resolve what clicking a calendar cell does
    Click {
        entry_id: String,
        #[arg(long)]
        now: Option<NaiveDateTime>,
    },

    /// Record a teaching log for a finished session
    Log {
        entry_id: String,
        content: String,
        #[arg(long)]
        now: Option<NaiveDateTime>,
    },

    /// Add or rename a room in the catalog
    AddRoom {
        room_id: String,
        name: String,
        #[arg(long)]
        id: Option<String>,
    },

    /// Add or rename a lecturer in the catalog
    AddLecturer {
        email: String,
        name: String,
        #[arg(long)]
        id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_with_format(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    let db_path = cli
        .db
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);
    tracing::info!(version = lab_timetable::VERSION, db = %db_path, "{}", lab_timetable::APP_NAME);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    state.apply_configured_locale().await;

    let caller = resolve_caller(&state, &cli)?;
    let now = |at: Option<NaiveDateTime>| at.unwrap_or_else(|| Local::now().naive_local());

    match cli.command {
        Commands::Preview { file } => {
            let session = state.import_api.start_import(&file, caller).await?;
            print_json(&session.preview())
        }
        Commands::Import { file } => {
            let session = state.import_api.start_import(&file, caller).await?;
            let summary = session.summary();
            if summary.invalid_rows > 0 {
                tracing::warn!(invalid = summary.invalid_rows, "存在错误行,将被跳过");
            }
            let response = state.import_api.confirm_import(&session).await?;
            print_json(&response)
        }
        Commands::Calendar { date, now: at } => {
            let anchor = date.unwrap_or_else(|| Local::now().date_naive());
            let response = state
                .calendar_api
                .get_week_calendar(anchor, now(at), &caller)?;
            print_json(&response)
        }
        Commands::Click { entry_id, now: at } => {
            let response = state.calendar_api.click_cell(&entry_id, now(at), &caller)?;
            print_json(&response)
        }
        Commands::Log {
            entry_id,
            content,
            now: at,
        } => {
            let log_id = state
                .calendar_api
                .log_teaching(&entry_id, &content, now(at), &caller)?;
            print_json(&serde_json::json!({ "log_id": log_id }))
        }
        Commands::AddRoom { room_id, name, id } => {
            require_admin(&caller)?;
            let room = RoomCatalogItem {
                id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                room_id,
                name,
            };
            state.catalog_repo.upsert_room(&room)?;
            print_json(&room)
        }
        Commands::AddLecturer { email, name, id } => {
            require_admin(&caller)?;
            let lecturer = LecturerCatalogItem {
                id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                email,
                name,
            };
            state.catalog_repo.upsert_lecturer(&lecturer)?;
            print_json(&lecturer)
        }
    }
}

/// 构造调用方上下文（教师未给出 --user 时按邮箱查目录）
fn resolve_caller(state: &AppState, cli: &Cli) -> Result<CallerContext> {
    let role = match cli.role {
        RoleArg::Admin => CallerRole::Admin,
        RoleArg::Lecturer => CallerRole::Lecturer,
    };

    let (user_id, display_name) = match (&cli.user, role) {
        (Some(user), _) => (user.clone(), cli.email.clone()),
        (None, CallerRole::Admin) => (cli.email.clone(), cli.email.clone()),
        (None, CallerRole::Lecturer) => {
            let lecturer = state
                .catalog_repo
                .find_lecturer_by_email(&cli.email)?
                .with_context(|| format!("教师 {} 不在目录中,请使用 --user 指定", cli.email))?;
            (lecturer.id, lecturer.name)
        }
    };

    Ok(CallerContext {
        role,
        user_id,
        email: cli.email.clone(),
        display_name,
    })
}

fn require_admin(caller: &CallerContext) -> Result<()> {
    if !caller.is_admin() {
        bail!("仅管理员可维护目录");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

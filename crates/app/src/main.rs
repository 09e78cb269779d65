use std::fmt;

use services::{AppServices, Clock, DEFAULT_STORAGE_KEY, ProgressStoreConfig};
use tracing_subscriber::EnvFilter;
use tutorial_core::model::{StepNumber, TutorialId, TutorialOutline};

mod render;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidTutorialId { raw: String },
    InvalidStep { raw: String },
    InvalidSteps { raw: String },
    InvalidDbUrl { raw: String },
    InvalidQuota { raw: String },
    UnusableDbFile { path: String, reason: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidTutorialId { raw } => write!(f, "invalid tutorial id: {raw:?}"),
            ArgsError::InvalidStep { raw } => write!(f, "invalid step (expected 1 or more): {raw}"),
            ArgsError::InvalidSteps { raw } => write!(f, "invalid --steps value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidQuota { raw } => write!(f, "invalid --quota value: {raw}"),
            ArgsError::UnusableDbFile { path, reason } => {
                write!(f, "cannot open database file {path}: {reason}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  tutorial-progress show   <tutorial-id> --steps <n> [options]");
    eprintln!("  tutorial-progress toggle <tutorial-id> <step> --steps <n> [options]");
    eprintln!("  tutorial-progress reset  <tutorial-id> --steps <n> [options]");
    eprintln!("  tutorial-progress list   [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>     SQLite URL (default: sqlite://tutorial-progress.sqlite3)");
    eprintln!("  --memory              keep progress in memory only");
    eprintln!("  --key <storage_key>   storage key (default: {DEFAULT_STORAGE_KEY})");
    eprintln!("  --quota <bytes>       storage size limit");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TUTORIAL_DB_URL, TUTORIAL_STORAGE_KEY, TUTORIAL_QUOTA_BYTES, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Show { outline: TutorialOutline },
    Toggle { outline: TutorialOutline, step: StepNumber },
    Reset { outline: TutorialOutline },
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Backend {
    Sqlite(String),
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    command: Command,
    backend: Backend,
    storage_key: String,
    quota_bytes: Option<usize>,
}

impl Args {
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut backend = Backend::Sqlite(
            std::env::var("TUTORIAL_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://tutorial-progress.sqlite3".into(), normalize_sqlite_url),
        );
        let mut storage_key =
            std::env::var("TUTORIAL_STORAGE_KEY").unwrap_or_else(|_| DEFAULT_STORAGE_KEY.into());
        let mut quota_bytes = match std::env::var("TUTORIAL_QUOTA_BYTES") {
            Ok(raw) => Some(parse_quota(raw)?),
            Err(_) => None,
        };
        let mut total_steps: Option<u32> = None;
        let mut positional = Vec::new();

        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    backend = Backend::Sqlite(normalize_sqlite_url(value));
                }
                "--memory" => backend = Backend::Memory,
                "--key" => storage_key = require_value(&mut args, "--key")?,
                "--quota" => quota_bytes = Some(parse_quota(require_value(&mut args, "--quota")?)?),
                "--steps" => {
                    let value = require_value(&mut args, "--steps")?;
                    let parsed: u32 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSteps { raw: value.clone() })?;
                    total_steps = Some(parsed);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let name = positional
            .next()
            .ok_or(ArgsError::MissingArgument { name: "command" })?;
        let command = match name.as_str() {
            "list" => Command::List,
            "show" => Command::Show {
                outline: parse_outline(&mut positional, total_steps)?,
            },
            "reset" => Command::Reset {
                outline: parse_outline(&mut positional, total_steps)?,
            },
            "toggle" => {
                let outline = parse_outline(&mut positional, total_steps)?;
                let raw = positional
                    .next()
                    .ok_or(ArgsError::MissingArgument { name: "step" })?;
                let step = raw
                    .parse::<StepNumber>()
                    .map_err(|_| ArgsError::InvalidStep { raw: raw.clone() })?;
                Command::Toggle { outline, step }
            }
            _ => return Err(ArgsError::UnknownCommand(name)),
        };
        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Self {
            command,
            backend,
            storage_key,
            quota_bytes,
        })
    }
}

fn parse_outline(
    positional: &mut impl Iterator<Item = String>,
    total_steps: Option<u32>,
) -> Result<TutorialOutline, ArgsError> {
    let raw = positional
        .next()
        .ok_or(ArgsError::MissingArgument { name: "tutorial-id" })?;
    let tutorial_id =
        TutorialId::new(raw.as_str()).map_err(|_| ArgsError::InvalidTutorialId { raw })?;
    let total = total_steps.ok_or(ArgsError::MissingValue { flag: "--steps" })?;
    TutorialOutline::new(tutorial_id, total).map_err(|_| ArgsError::InvalidSteps {
        raw: total.to_string(),
    })
}

fn parse_quota(raw: String) -> Result<usize, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidQuota { raw: raw.clone() })
}

/// Turn `sqlite:relative.db` or a bare path into an absolute `sqlite://` URL.
fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }
    let raw = raw.trim();
    let path = std::path::Path::new(raw.strip_prefix("sqlite:").unwrap_or(raw));
    let absolute = std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf());
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file behind a `sqlite://` URL exists so the pool
/// can open it. In-memory URLs need nothing.
fn prepare_sqlite_file(db_url: &str) -> Result<(), ArgsError> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }
    let invalid = || ArgsError::InvalidDbUrl {
        raw: db_url.to_string(),
    };

    let rest = db_url.strip_prefix("sqlite://").ok_or_else(invalid)?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() {
        return Err(invalid());
    }

    let path = std::path::Path::new(path);
    let unusable = |err: std::io::Error| ArgsError::UnusableDbFile {
        path: path.display().to_string(),
        reason: err.to_string(),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(unusable)?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(unusable)?;
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() || argv.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return Ok(());
    }

    let args = Args::parse(argv).map_err(|e| {
        print_usage();
        e
    })?;

    let clock = Clock::system();
    let config = ProgressStoreConfig {
        storage_key: args.storage_key,
    };
    let services = match &args.backend {
        Backend::Memory => AppServices::in_memory(clock, config),
        Backend::Sqlite(db_url) => {
            // Keep file setup in the binary glue so services stay storage-agnostic.
            prepare_sqlite_file(db_url)?;
            AppServices::new_sqlite(db_url, args.quota_bytes, clock, config).await?
        }
    };
    tracing::debug!(backend = ?args.backend, "progress services ready");

    match args.command {
        Command::Show { outline } => {
            let tracker = services.tracker(outline).await;
            print!("{}", render::render_tracker(&tracker));
        }
        Command::Toggle { outline, step } => {
            let mut tracker = services.tracker(outline).await;
            tracker.toggle(step).await;
            print!("{}", render::render_tracker(&tracker));
        }
        Command::Reset { outline } => {
            let mut tracker = services.tracker(outline).await;
            tracker.reset().await;
            print!("{}", render::render_tracker(&tracker));
        }
        Command::List => {
            let table = services.progress_store().all_progress().await;
            print!("{}", render::render_table(&table));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

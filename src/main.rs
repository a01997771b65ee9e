pub mod models {
    pub mod meteosource;
    pub mod open_meteo;
    pub mod weather;
}

pub mod client;
pub mod config;
pub mod db {
    pub mod models;
}
pub mod providers;
pub mod schema;
pub mod utils;
pub mod services {
    pub mod capture;
    pub mod charts;
    pub mod latest;
    pub mod report;
    pub mod storage;
}

use crate::client::WeatherClient;
use crate::config::Config;
use crate::providers::ProviderId;
use crate::providers::meteosource::Meteosource;
use crate::providers::open_meteo::OpenMeteo;
use crate::services::storage::{DocumentStore, PgDocumentStore};
use crate::services::{capture, charts, report};
use log::{error, info};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Dump, capture both providers, dump again, render charts.
    Run,
    Capture,
    Charts,
    Latest,
    Dump,
}

impl Command {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "run" => Some(Command::Run),
            "capture" => Some(Command::Capture),
            "charts" => Some(Command::Charts),
            "latest" => Some(Command::Latest),
            "dump" => Some(Command::Dump),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
struct CliArgs {
    env_file: Option<PathBuf>,
    command: Command,
}

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
}

fn collections() -> Vec<&'static str> {
    ProviderId::all().iter().map(|p| p.collection()).collect()
}

fn run(command: Command) -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (charts_dir={}, meteosource_tier={}, meteosource_key={}, http_timeout={}s)",
        cfg.charts_dir.display(),
        cfg.meteosource_tier,
        if cfg.meteosource_api_key.is_some() { "set" } else { "unset" },
        cfg.http_timeout.as_secs()
    );

    // 2) Connect DB; the store is dropped (and the connection closed) when run() returns
    let mut store = PgDocumentStore::connect(&cfg.database_url).map_err(|e| e.to_string())?;
    info!("Connected to database");

    // 3) Apply pending database migrations
    store.apply_migrations().map_err(|e| e.to_string())?;

    let collections = collections();
    match command {
        Command::Run => {
            info!("Stored documents before capture:");
            report::dump_collections(&mut store, &collections);
            capture_all(&mut store, &cfg);
            info!("Stored documents after capture:");
            report::dump_collections(&mut store, &collections);
            render_charts(&mut store, &collections, &cfg.charts_dir);
        }
        Command::Capture => capture_all(&mut store, &cfg),
        Command::Charts => render_charts(&mut store, &collections, &cfg.charts_dir),
        Command::Latest => {
            for collection in &collections {
                report::log_latest(&mut store, collection);
            }
        }
        Command::Dump => report::dump_collections(&mut store, &collections),
    }

    Ok(())
}

fn capture_all(store: &mut dyn DocumentStore, cfg: &Config) {
    let client = WeatherClient::new(cfg.http_timeout);

    capture::capture_source(store, &client, &OpenMeteo::new());

    match Meteosource::new(cfg.meteosource_api_key.as_deref(), &cfg.meteosource_tier) {
        Ok(source) => {
            info!("Meteosource initialised (tier={})", source.tier().as_str());
            capture::capture_source(store, &client, &source);
        }
        Err(e) => error!("{}: {}", ProviderId::Meteosource, e),
    }
}

fn render_charts(store: &mut dyn DocumentStore, collections: &[&str], output_dir: &Path) {
    for collection in collections {
        let written = charts::generate_for_collection(store, collection, output_dir);
        info!("[{}] {} chart(s) written", collection, written);
    }
}

fn parse_cli<I>(args: I) -> Result<CliArgs, String>
where
    I: IntoIterator<Item = std::ffi::OsString>,
{
    let mut args = args.into_iter();
    let mut env_file: Option<PathBuf> = None;
    let mut command: Option<Command> = None;

    let mut set_env_file = |value: &str| -> Result<(), String> {
        if env_file.is_some() {
            return Err("`--env-file` provided more than once".to_string());
        }
        if value.is_empty() {
            return Err("`--env-file` requires a path argument".to_string());
        }
        env_file = Some(PathBuf::from(value));
        Ok(())
    };

    while let Some(arg) = args.next() {
        let arg = arg.into_string().map_err(|_| "argument contains invalid UTF-8".to_string())?;
        if arg == "--env-file" {
            let value = args
                .next()
                .and_then(|v| v.into_string().ok())
                .ok_or_else(|| "`--env-file` requires a path argument".to_string())?;
            set_env_file(&value)?;
        } else if let Some(value) = arg.strip_prefix("--env-file=") {
            set_env_file(value)?;
        } else if let Some(cmd) = Command::parse(&arg) {
            if command.is_some() {
                return Err(format!("more than one command given (second was `{}`)", arg));
            }
            command = Some(cmd);
        } else {
            return Err(format!("unrecognised argument: {}", arg));
        }
    }

    Ok(CliArgs {
        env_file,
        command: command.unwrap_or(Command::Run),
    })
}

fn load_env(env_file: Option<PathBuf>) -> Result<Option<LoadedEnvFile>, String> {
    let (path, explicit) = match env_file {
        Some(path) => {
            if !path.is_file() {
                return Err(format!("env file not found: {}", path.display()));
            }
            (path, true)
        }
        None => {
            let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
            let default_path = cwd.join(".env");
            if !default_path.is_file() {
                return Ok(None);
            }
            (default_path, false)
        }
    };

    let contents =
        std::fs::read_to_string(&path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    for (index, line) in contents.lines().enumerate() {
        let Some((key, value)) =
            parse_env_line(line).map_err(|e| format!("{}:{}: {}", path.display(), index + 1, e))?
        else {
            continue;
        };
        // Values already present in the process environment take precedence.
        if std::env::var_os(&key).is_none() {
            // Updating process-level environment variables is unsafe on some targets.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }

    Ok(Some(LoadedEnvFile { path, explicit }))
}

/// One `KEY=value` line of a `.env` file. Blank lines and `#` comments yield `None`.
fn parse_env_line(line: &str) -> Result<Option<(String, String)>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let assignment = trimmed.strip_prefix("export ").map(str::trim_start).unwrap_or(trimmed);
    let (key, raw_value) = assignment
        .split_once('=')
        .ok_or_else(|| "missing '=' in assignment".to_string())?;
    let key = key.trim();
    if key.is_empty() {
        return Err("environment variable name cannot be empty".to_string());
    }
    if key.chars().any(char::is_whitespace) {
        return Err(format!("environment variable name contains whitespace: {}", key));
    }

    Ok(Some((key.to_string(), parse_env_value(raw_value.trim())?)))
}

fn parse_env_value(raw: &str) -> Result<String, String> {
    let quote = match raw.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => {
            let unquoted = raw.split('#').next().unwrap_or_default();
            return Ok(unquoted.trim_end().to_string());
        }
    };

    let mut value = String::new();
    let mut chars = raw[1..].chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if quote == '"' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| "unterminated escape sequence in double-quoted value".to_string())?;
                value.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    other => other,
                });
            }
            c if c == quote => {
                let rest = chars.as_str().trim();
                return if rest.is_empty() || rest.starts_with('#') {
                    Ok(value)
                } else {
                    Err("unexpected characters after closing quote".to_string())
                };
            }
            other => value.push(other),
        }
    }

    Err("unterminated quoted value".to_string())
}

fn main() {
    let loaded_env = match parse_cli(std::env::args_os().skip(1)) {
        Ok(cli) => match load_env(cli.env_file) {
            Ok(info) => (info, cli.command),
            Err(err) => {
                eprintln!("fatal: {}", err);
                std::process::exit(1);
            }
        },
        Err(err) => {
            eprintln!("fatal: {}", err);
            eprintln!("usage: weather-capture [--env-file PATH] [run|capture|charts|latest|dump]");
            std::process::exit(1);
        }
    };
    let (env_info, command) = loaded_env;

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = env_info.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "weather-capture {} (git {}) starting: {:?}",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH"),
        command
    );
    if let Err(e) = run(command) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}

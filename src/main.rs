use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use homedir::my_home;
use tracing_subscriber::EnvFilter;

mod app;
mod bookmarks;
mod classifier;
mod cli;
mod config;
mod features;
mod models;
mod similarity;
mod storage;

use app::{App, AppError, AppResult};
use cli::{Args, Command};
use config::Config;

fn base_path(arg: Option<PathBuf>) -> AppResult<PathBuf> {
    if let Some(path) = arg {
        return Ok(path);
    }
    if let Ok(path) = std::env::var("THEODORE_BASE_PATH") {
        return Ok(PathBuf::from(path));
    }

    let home = my_home()
        .map_err(|err| AppError::Config(format!("couldnt find home dir: {err}")))?
        .ok_or_else(|| AppError::Config("couldnt find home dir".to_string()))?;
    Ok(home.join(".local/share/theodore"))
}

fn run(args: Args) -> AppResult<()> {
    let base_path = base_path(args.base_path)?;
    let config = Config::load_with(&base_path)?;
    log::debug!("using base path {}", config.base_path().display());

    let app = App::new(config);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Similar { name, count } => cli::handle_similar(&app, &name, count, &mut out),
        Command::Predict { text } => cli::handle_predict(&app, &text.join(" "), &mut out),
        Command::Fit {} => cli::handle_fit(&app, &mut out),
        Command::Models { action } => cli::handle_models(&app, action, &mut out),
        Command::Session {} => {
            let stdin = std::io::stdin();
            cli::run_session(&app, stdin.lock(), &mut out)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", cli::report(&err));
            ExitCode::FAILURE
        }
    }
}

use std::io::{BufRead, Write};

use super::handlers::{print_bookmarks, report};
use crate::app::{App, AppError, AppResult};

const HELP: &str = "\
commands:
  similar NAME    closest speaker to NAME
  predict TEXT    persuasiveness of TEXT
  add URL         bookmark URL
  recent [N]      latest bookmarks
  help            this text
  quit            end the session";

/// Runs one line-oriented session against `app`. Errors from a command are
/// reported and the session goes on; only I/O failures end it early.
pub fn run_session(app: &App, input: impl BufRead, out: &mut impl Write) -> AppResult<()> {
    writeln!(out, "{HELP}")?;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        let result = match command {
            "quit" | "exit" => break,
            "help" => writeln!(out, "{HELP}").map_err(AppError::from),
            "similar" => similar(app, rest, out),
            "predict" => predict(app, rest, out),
            "add" => add(app, rest, out),
            "recent" => recent(app, rest, out),
            other => Err(AppError::Validation(format!(
                "unknown command {other:?}, try help"
            ))),
        };

        if let Err(err) = result {
            if let AppError::IO(_) = err {
                return Err(err);
            }
            writeln!(out, "error: {}", report(&err))?;
        }
    }

    Ok(())
}

fn similar(app: &App, name: &str, out: &mut impl Write) -> AppResult<()> {
    let rec = app.find_similar(name)?;
    writeln!(out, "{}", rec.display_name)?;
    writeln!(out, "{}", rec.description)?;
    writeln!(out, "{}", rec.embed_url())?;
    Ok(())
}

fn predict(app: &App, text: &str, out: &mut impl Write) -> AppResult<()> {
    let prediction = app.predict(text)?;
    writeln!(out, "{}", prediction.summary())?;
    Ok(())
}

fn add(app: &App, url: &str, out: &mut impl Write) -> AppResult<()> {
    app.add_bookmark(url)?;
    writeln!(out, "Stored bookmark '{url}'")?;
    print_bookmarks(
        &app.recent_bookmarks(app.config().bookmarks.recent_count),
        out,
    )
}

fn recent(app: &App, arg: &str, out: &mut impl Write) -> AppResult<()> {
    let n = if arg.is_empty() {
        app.config().bookmarks.recent_count
    } else {
        arg.parse::<usize>()
            .map_err(|_| AppError::Validation(format!("{arg:?} is not a count")))?
    };
    print_bookmarks(&app.recent_bookmarks(n), out)
}

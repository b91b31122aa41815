use serde_json::json;
use std::io::Write;

use crate::{
    app::{App, AppError, AppResult},
    bookmarks::Bookmark,
    similarity::Recommendation,
};

use super::ModelsArgs;

/// User-facing text for an error. Failures of the process itself are logged
/// in full and reported generically.
pub fn report(err: &AppError) -> String {
    if err.is_user_facing() {
        err.to_string()
    } else {
        log::error!("{err:?}");
        "internal error, see the log for details".to_string()
    }
}

fn recommendation_json(rec: &Recommendation) -> serde_json::Value {
    json!({
        "speaker_name": rec.display_name,
        "description": rec.description,
        "url": rec.url,
        "embed_url": rec.embed_url(),
        "distance": rec.distance,
    })
}

pub fn handle_similar(app: &App, name: &str, count: usize, out: &mut impl Write) -> AppResult<()> {
    let recs = app.rank_similar(name, count)?;
    let value = match recs.as_slice() {
        [only] if count == 1 => recommendation_json(only),
        _ => recs.iter().map(recommendation_json).collect(),
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&value).map_err(anyhow::Error::from)?)?;
    Ok(())
}

pub fn handle_predict(app: &App, text: &str, out: &mut impl Write) -> AppResult<()> {
    let prediction = app.predict(text)?;
    writeln!(out, "{}", prediction.summary())?;
    writeln!(
        out,
        "{}",
        serde_json::to_string_pretty(&prediction).map_err(anyhow::Error::from)?
    )?;
    Ok(())
}

pub fn handle_fit(app: &App, out: &mut impl Write) -> AppResult<()> {
    let version = app.fit_and_publish()?;
    writeln!(out, "published classifier version {version}")?;
    Ok(())
}

pub fn handle_models(app: &App, action: ModelsArgs, out: &mut impl Write) -> AppResult<()> {
    match action {
        ModelsArgs::List {} => {
            let versions = app.model_versions()?;
            if versions.is_empty() {
                writeln!(out, "no classifier has been published yet")?;
            }
            for info in versions {
                writeln!(
                    out,
                    "{} {} {} documents, {} terms{}",
                    info.version,
                    info.created_at.format("%Y-%m-%d %H:%M:%S"),
                    info.documents,
                    info.vocabulary_size,
                    if info.active { " (current)" } else { "" }
                )?;
            }
        }
        ModelsArgs::Activate { version } => {
            app.activate_model(&version)?;
            writeln!(out, "classifier version {version} is now current")?;
        }
    }
    Ok(())
}

pub fn print_bookmarks(bmarks: &[Bookmark], out: &mut impl Write) -> AppResult<()> {
    if bmarks.is_empty() {
        writeln!(out, "no bookmarks yet")?;
    }
    for bmark in bmarks {
        writeln!(
            out,
            "{} {} ({})",
            bmark.created_at.format("%Y-%m-%d %H:%M:%S"),
            bmark.url,
            bmark.user
        )?;
    }
    Ok(())
}

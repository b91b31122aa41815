use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod handlers;
mod session;

pub use handlers::*;
pub use session::run_session;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory with config.yaml, the feature table and the model store.
    /// Defaults to $THEODORE_BASE_PATH or ~/.local/share/theodore
    #[clap(long, global = true)]
    pub base_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ModelsArgs {
    /// List published classifier versions
    List {},
    /// Make an earlier version current again
    Activate {
        /// Version id as shown by `models list`
        version: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find the speaker whose style is closest to NAME
    Similar {
        /// Exact, case-sensitive speaker name
        name: String,

        /// How many speakers to list
        #[clap(short = 'k', long, default_value = "1")]
        count: usize,
    },
    /// Rate how persuasive a piece of text is
    Predict {
        #[clap(trailing_var_arg = true, required = true)]
        text: Vec<String>,
    },
    /// Fit the classifier on the feature table and publish it
    Fit {},
    /// Manage published classifier versions
    Models {
        #[clap(subcommand)]
        action: ModelsArgs,
    },
    /// Interactive session reading commands from stdin.
    /// Bookmarks live as long as the session.
    Session {},
}

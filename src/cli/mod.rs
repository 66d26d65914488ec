mod args;
mod index;
mod query;
mod serve;

pub use args::{Args, Command};
pub use index::run_index;
pub use query::run_query;
pub use serve::run_serve;

use std::path::Path;

use anyhow::Result;
use clap::Parser;

use crate::config::Settings;

pub async fn run() -> Result<()> {
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load(Path::new(path))?,
        None => Settings::default(),
    };

    match args.command {
        Command::Serve => run_serve(&settings).await,
        Command::Index => run_index(&settings).await,
        Command::Query {
            question,
            top_k,
            system_prompt,
        } => run_query(&settings, &question, top_k, system_prompt.as_deref()).await,
    }
}

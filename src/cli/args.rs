use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "repolens",
    about = "Index source repositories and answer questions about the code",
    version
)]
pub struct Args {
    /// Path to a TOML settings file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the periodic indexing scheduler until interrupted.
    Serve,

    /// Run one indexing pass over every configured repository.
    Index,

    /// Ask a question about the indexed code.
    Query {
        /// The question to answer.
        question: String,

        /// How many chunks to retrieve.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Override the generation system prompt.
        #[arg(long)]
        system_prompt: Option<String>,
    },
}

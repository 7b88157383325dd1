use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tools::{decode, encode_file, load_config};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Decode and encode exploration permalinks")]
struct Args {
    /// Exploration config JSON (defaults, dataset densities, AOI presets)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the state a query string hydrates to, as JSON
    Decode {
        /// Query string, with or without the leading `?`
        query: String,

        /// Report malformed parameters instead of falling back to defaults
        #[arg(long)]
        strict: bool,
    },

    /// Print the canonical query string for a state JSON file
    Encode {
        state: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let result = load_config(args.config.as_deref()).and_then(|config| match args.command {
        Command::Decode { query, strict } => decode(&query, &config, strict),
        Command::Encode { state } => encode_file(&state, &config),
    });

    match result {
        Ok(out) => println!("{out}"),
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

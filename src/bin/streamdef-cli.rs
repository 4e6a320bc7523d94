//! Streamdef CLI - Command-line front end for the stream definition parser
//!
//! Parses stream definitions and module option strings and prints the
//! resulting deployment requests.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use streamdef::config::{Config, load_config};
use streamdef::stream::StreamParser;

#[derive(Parser)]
#[command(name = "streamdef")]
#[command(about = "Parse stream definitions into module deployment requests", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a stream definition
    Parse {
        /// Stream name
        #[arg(short, long)]
        name: String,

        /// Definition text, e.g. "time | log"
        definition: String,

        /// Print requests as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse the options of a single module
    Params {
        /// Module text, e.g. "http --port=9000"
        module: String,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    let parser = StreamParser::with_config(config.parser);

    match cli.command {
        Commands::Parse {
            name,
            definition,
            json,
        } => {
            let requests = parser.parse(&name, &definition)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&requests)?);
            } else {
                for request in &requests {
                    println!("{}", request);
                }
            }
        }

        Commands::Params { module } => {
            let parameters = parser.get_parameters(&module)?;
            println!("{}", serde_json::to_string_pretty(&parameters)?);
        }
    }

    Ok(())
}

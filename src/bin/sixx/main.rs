//! sixx CLI tool
//!
//! Parses contact files and prints a report.
//!
//! ## Commands
//!
//! - `dump`: every selected entry with all its details
//! - `phone`: telephone numbers of the selected entries
//! - `email`: `Name <address>` lines
//! - `check`: parse only, reporting the first error
//! - `stats`: node and link counts as JSON
//!
//! Input files and directories follow the command; when none are given, the `files` of
//! the configuration are used. A selection expression may follow `--`, for example
//! `sixx phone contacts/ -- =friend -not in:NZ`.

use clap::{Args, Parser, Subcommand};
use sixx_core::{
    codec::BlockCompiler,
    config::{ConfigProvider, SixxConfig, TomlConfigProvider},
    query::parse_predicate,
    report::{self, ReportOptions},
    Model, SixxError,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sixx")]
#[command(author, version, about = "Reports from a plain text contacts database", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "sixx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Input {
    /// Contact files, or directories of `.sixx` and `.txt` files
    files: Vec<PathBuf>,

    /// Selection expression
    #[arg(last = true)]
    expr: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List every selected entry with all its details
    Dump(Input),
    /// List telephone numbers
    Phone(Input),
    /// List email addresses
    Email(Input),
    /// Parse the input and report errors only
    Check(Input),
    /// Print counts of what the input holds, as JSON
    Stats(Input),
}

fn load(input: &Input, config: &SixxConfig) -> Result<Model, SixxError> {
    let files = if input.files.is_empty() {
        &config.files
    } else {
        &input.files
    };
    if files.is_empty() {
        return Err(SixxError::Custom("no input files".to_string()));
    }
    let mut compiler = BlockCompiler::new(Model::new().with_language(config.language.clone()));
    compiler.parse_files(files)?;
    compiler.finish_parsing()?;
    Ok(compiler.into_model())
}

fn run(cli: Cli, config: SixxConfig) -> Result<String, SixxError> {
    let (Commands::Dump(input)
    | Commands::Phone(input)
    | Commands::Email(input)
    | Commands::Check(input)
    | Commands::Stats(input)) = &cli.command;
    let model = load(input, &config)?;
    let opts = ReportOptions::from_config(&config, &model)?;
    let select = if input.expr.is_empty() {
        report::default_selection()
    } else {
        parse_predicate(&model, &input.expr)?
    };
    match cli.command {
        Commands::Dump(_) => report::dump(&model, &select, &opts),
        Commands::Phone(_) => report::phone(&model, &select, &opts),
        Commands::Email(_) => report::email(&model, &select, &opts),
        Commands::Check(_) => {
            tracing::info!("[Check] {} nodes parsed", model.graph.len());
            Ok(String::new())
        }
        Commands::Stats(_) => report::stats(&model),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = TomlConfigProvider::new(cli.config.clone()).get_config()?;

    let default_filter = config.log_filter.clone().unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli, config) {
        Ok(out) => {
            print!("{out}");
            Ok(())
        }
        Err(e) => {
            eprintln!("sixx: {e}");
            std::process::exit(1);
        }
    }
}

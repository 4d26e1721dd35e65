//! Extraction CLI
//!
//! Compiles a schema once and extracts from any number of JSON documents.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use json_extractor::{ExtractionPlan, Extractor, ExtractorConfig, Schema};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "json-extract")]
#[command(about = "Extract and reshape JSON documents with a schema")]
struct Cli {
    /// Configuration file, layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract from documents (stdin when no input is given)
    Run {
        /// Schema file (.json or .toml)
        #[arg(short, long)]
        schema: PathBuf,
        /// Pass values through when a modifier does not apply
        #[arg(long)]
        lenient: bool,
        /// Pretty-print results
        #[arg(long)]
        pretty: bool,
        /// Input documents
        inputs: Vec<PathBuf>,
    },

    /// Compile a schema and show how each field is extracted
    Check {
        /// Schema file (.json or .toml)
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Show the effective configuration
    Config {
        /// Write it to this file instead
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let config = ExtractorConfig::load_from(config_path.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Run {
            schema,
            lenient,
            pretty,
            inputs,
        } => {
            let mut extraction = config.extraction;
            if lenient {
                extraction.strict_modifiers = false;
            }

            let schema = load_schema(&schema)?;
            let extractor = Extractor::with_schema(&schema, extraction)?;

            if inputs.is_empty() {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("failed to read stdin")?;
                print_result(&extractor.extract_from_str(&text)?, pretty)?;
            }

            for input in &inputs {
                let text = fs::read_to_string(input)
                    .with_context(|| format!("failed to read {:?}", input))?;
                let result = extractor
                    .extract_from_str(&text)
                    .with_context(|| format!("extraction failed for {:?}", input))?;
                print_result(&result, pretty)?;
            }
            Ok(())
        }

        Commands::Check { schema } => {
            let schema = load_schema(&schema)?;
            let extractor = Extractor::with_schema(&schema, config.extraction)?;
            let plan = extractor.plan().context("schema produced no plan")?;

            println!("✅ Schema compiled: {} field(s)", plan.len());
            print_plan(plan, 1);
            Ok(())
        }

        Commands::Config { save } => {
            match save {
                Some(path) => {
                    config
                        .save(&path.to_string_lossy())
                        .with_context(|| format!("failed to write {:?}", path))?;
                    println!("✅ Configuration written to {:?}", path);
                }
                None => print!("{}", config.to_toml()?),
            }
            Ok(())
        }
    }
}

fn load_schema(path: &Path) -> Result<Schema> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read schema {:?}", path))?;
    let schema = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Schema::from_toml_str(&text),
        _ => Schema::from_json_str(&text),
    };
    schema.with_context(|| format!("invalid schema {:?}", path))
}

fn print_result(result: &serde_json::Value, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{}", rendered);
    Ok(())
}

fn print_plan(plan: &ExtractionPlan, indent: usize) {
    let pad = "  ".repeat(indent);
    for instruction in plan.instructions() {
        let field = instruction.field();
        let (kind, path) = match instruction.compiled_path() {
            Some(compiled) => (compiled.kind().to_string(), compiled.expression().to_string()),
            None => ("default-only".to_string(), "-".to_string()),
        };
        let shape = if field.array_type { "array" } else { "scalar" };

        println!("{}{:<20} {:<13} {:<7} {}", pad, instruction.key(), kind, shape, path);

        if let Some(nested) = instruction.nested() {
            print_plan(nested, indent + 1);
        }
    }
}

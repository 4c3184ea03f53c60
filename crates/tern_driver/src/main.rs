//! tern - canonicalize modules from the command line
//!
//! Modules and interface tables are read as JSON, the way the parser and
//! earlier compilations leave them on disk.

use anyhow::{Context, Result};
use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use tern_ast::SourceModule;
use tern_canon::{canonicalize_module, validate_module, Diagnostic, Interface, Interfaces};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "tern")]
#[command(author, version, about = "Canonicalize tern modules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Canonicalize a module and print the result
    Check {
        #[command(flatten)]
        input: Input,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        emit: Emit,
    },

    /// Pair annotations and assemble wires, then print the validated module
    Validate {
        #[command(flatten)]
        input: Input,

        #[arg(long, value_enum, default_value = "json")]
        emit: Emit,
    },

    /// Print the interface the module exports to its importers
    Interface {
        #[command(flatten)]
        input: Input,
    },
}

#[derive(clap::Args, Debug)]
struct Input {
    /// Parsed module, as JSON
    #[arg(value_name = "MODULE")]
    module: PathBuf,

    /// Interfaces of every importable module, as JSON
    #[arg(short, long, value_name = "FILE")]
    interfaces: Option<PathBuf>,

    /// Original source text, used to point diagnostics at code
    #[arg(long, value_name = "FILE")]
    source: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Pretty-printed JSON
    Json,
    /// Rust debug representation
    Debug,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let ok = match cli.command {
        Commands::Check { ref input, emit } => check(input, emit)?,
        Commands::Validate { ref input, emit } => validate(input, emit)?,
        Commands::Interface { ref input } => interface(input)?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn check(input: &Input, emit: Emit) -> Result<bool> {
    let (module, interfaces) = load(input)?;
    let result = validate_module(&module).and_then(|valid| canonicalize_module(&interfaces, &valid));
    match result {
        Ok(canonical) => {
            info!(
                "{}: {} export(s), {} of {} import(s) used",
                canonical.name,
                canonical.exports.len(),
                canonical.imports.len(),
                module.imports.len()
            );
            print(&canonical, emit)?;
            Ok(true)
        }
        Err(diagnostics) => {
            report(input, &diagnostics)?;
            Ok(false)
        }
    }
}

fn validate(input: &Input, emit: Emit) -> Result<bool> {
    let (module, _) = load(input)?;
    match validate_module(&module) {
        Ok(valid) => {
            print(&valid, emit)?;
            Ok(true)
        }
        Err(diagnostics) => {
            report(input, &diagnostics)?;
            Ok(false)
        }
    }
}

fn interface(input: &Input) -> Result<bool> {
    let (module, interfaces) = load(input)?;
    let result = validate_module(&module).and_then(|valid| canonicalize_module(&interfaces, &valid));
    match result {
        Ok(canonical) => {
            print(&Interface::from_module(&canonical), Emit::Json)?;
            Ok(true)
        }
        Err(diagnostics) => {
            report(input, &diagnostics)?;
            Ok(false)
        }
    }
}

fn load(input: &Input) -> Result<(SourceModule, Interfaces)> {
    let module: SourceModule = read_json(&input.module)?;
    let interfaces = match &input.interfaces {
        Some(path) => read_json(path)?,
        None => Interfaces::new(),
    };
    info!("loaded `{}` with {} interface(s) available", module.name, interfaces.len());
    Ok((module, interfaces))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to decode {}", path.display()))
}

fn print<T: Serialize + Debug>(value: &T, emit: Emit) -> Result<()> {
    match emit {
        Emit::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Emit::Debug => println!("{:#?}", value),
    }
    Ok(())
}

/// Render diagnostics against the source text when it is available
fn report(input: &Input, diagnostics: &[Diagnostic]) -> Result<()> {
    let Some(source_path) = &input.source else {
        for diagnostic in diagnostics {
            eprintln!("error: {}", diagnostic);
        }
        eprintln!("{} error(s)", diagnostics.len());
        return Ok(());
    };

    let text = fs::read_to_string(source_path)
        .with_context(|| format!("failed to read {}", source_path.display()))?;
    let file = source_path.display().to_string();

    for diagnostic in diagnostics {
        let range = clamp(diagnostic.span.range(), text.len());
        let mut report = Report::build(ReportKind::Error, file.clone(), range.start)
            .with_message(diagnostic.error.to_string())
            .with_label(Label::new((file.clone(), range)).with_color(Color::Red));
        if !diagnostic.context.is_empty() {
            let context: Vec<String> = diagnostic.context.iter().rev().map(ToString::to_string).collect();
            report = report.with_note(context.join("\n"));
        }
        report.finish().eprint((file.clone(), Source::from(text.clone())))?;
    }
    eprintln!("{} error(s)", diagnostics.len());
    Ok(())
}

fn clamp(range: std::ops::Range<usize>, len: usize) -> std::ops::Range<usize> {
    let start = range.start.min(len);
    start..range.end.clamp(start, len)
}

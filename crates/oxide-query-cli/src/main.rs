//! oxide-query CLI
//!
//! Compiles a JSON query plan and prints the SQL and its parameters.

mod plan;

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_query_core::{Compiler, CompilerConfig, DialectKind};

use crate::plan::{Plan, PlannedQuery};

/// Compile a query plan to dialect SQL.
#[derive(Parser)]
#[command(name = "oxide-query")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQL dialect (generic, sqlite, sqlserver).
    #[arg(short, long, env = "OXIDE_QUERY_DIALECT", default_value_t = DialectKind::Generic)]
    dialect: DialectKind,

    /// Print SQL and parameters as one JSON document.
    #[arg(long)]
    json: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Query plan file; reads stdin when omitted.
    plan: Option<PathBuf>,
}

fn read_plan(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("failed to read plan from stdin")?;
            Ok(input)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let source = read_plan(cli.plan.as_ref())?;
    let plan: Plan = serde_json::from_str(&source).context("invalid query plan")?;
    let compiler = Compiler::new(CompilerConfig::new(cli.dialect));
    debug!(dialect = %cli.dialect, from = %plan.from, steps = plan.steps.len(), "compiling plan");

    let compiled = match plan.build()? {
        PlannedQuery::Rows(query) => compiler.compile(&query)?,
        PlannedQuery::Scalar(query) => compiler.compile_scalar(&query)?,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&compiled)?);
    } else {
        println!("{}", compiled.sql);
        println!();
        println!("{}", serde_json::to_string_pretty(&compiled.params)?);
    }
    Ok(())
}

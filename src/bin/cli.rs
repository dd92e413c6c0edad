// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! eqkernel CLI

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eqkernel::ast::DependencyGraph;
use eqkernel::{import_equation_file, EngineConfig, Equation, Factory, Value};
use serde_json::json;

#[derive(Parser)]
#[command(name = "eqkernel")]
#[command(about = "Build and evaluate equations with incremental caching", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression
    Eval {
        /// Expression text
        #[arg(required_unless_present = "file")]
        expr: Option<String>,

        /// Read the expression from a file
        #[arg(short, long, conflicts_with = "expr")]
        file: Option<String>,

        /// Argument assignment, NAME=VALUE (VALUE is `1.5` or `1,2,3`)
        #[arg(short = 's', long = "set", value_name = "NAME=VALUE")]
        assignments: Vec<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the free arguments of an expression in order
    Args {
        /// Expression text
        expr: String,
    },

    /// Parse and validate an expression without evaluating it
    Check {
        /// Expression text
        expr: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load()?;
    let factory = Factory::with_config(config);

    match &cli.command {
        Commands::Eval {
            expr,
            file,
            assignments,
            json,
        } => {
            let text = match (expr, file) {
                (_, Some(path)) => import_equation_file(path)?,
                (Some(expr), None) => expr.clone(),
                (None, None) => bail!("an expression or --file is required"),
            };
            eval_command(&factory, &text, assignments, *json, cli.verbose)?;
        }
        Commands::Args { expr } => {
            let equation = build(&factory, expr)?;
            for name in equation.arg_names() {
                println!("{}", name);
            }
        }
        Commands::Check { expr } => {
            let equation = build(&factory, expr)?;
            println!(
                "{} {} ({} free argument(s))",
                "OK".green().bold(),
                expr,
                equation.args().len()
            );
        }
    }

    Ok(())
}

fn build(factory: &Factory, text: &str) -> Result<Equation> {
    factory
        .make(text)
        .with_context(|| format!("Failed to build equation: {}", text))
}

fn eval_command(factory: &Factory, text: &str, assignments: &[String], json: bool, verbose: bool) -> Result<()> {
    let equation = build(factory, text)?;

    for assignment in assignments {
        let (name, value) = parse_assignment(assignment)?;
        let arg = equation
            .arg(name)
            .ok_or_else(|| anyhow!("'{}' is not a free argument of {}", name, text))?;
        arg.set_value(value)?;
    }

    let pending = DependencyGraph::from_root(equation.root()).dirty_nodes().len();
    let start = std::time::Instant::now();
    let result = equation.call()?;
    let elapsed = start.elapsed();

    if json {
        let args: serde_json::Map<String, serde_json::Value> = equation
            .args()
            .iter()
            .map(|arg| (arg.name().to_string(), json!(arg.value().unwrap_or_default())))
            .collect();
        let report = json!({
            "expression": text,
            "args": args,
            "result": result,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", result.to_string().bold());
    }

    if verbose {
        let stats = equation.cache_stats();
        eprintln!("{} {:.2?} ({} node(s) recomputed)", "Evaluated in".cyan(), elapsed, pending);
        eprintln!(
            "{} {}/{} nodes cached ({:.1}%), {} recomputation(s)",
            "Cache:".cyan(),
            stats.cached_nodes,
            stats.total_nodes,
            stats.hit_rate(),
            stats.evaluations
        );
    }

    Ok(())
}

fn parse_assignment(assignment: &str) -> Result<(&str, Value)> {
    let (name, raw) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{}'", assignment))?;

    let values = raw
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid value for '{}': {}", name, raw))?;

    let value = if raw.contains(',') {
        Value::from(values)
    } else {
        Value::Scalar(values[0])
    };
    Ok((name.trim(), value))
}

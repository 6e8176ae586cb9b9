// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Command-line interface for evaluating typed expressions against JSON targets

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use exprfn::{ExpressionEvaluator, Value, ValueType};
use std::fs;
use std::io::{self, Read};
use std::process;

#[derive(Parser)]
#[command(name = "exprfn")]
#[command(about = "Evaluate typed expressions against JSON targets")]
#[command(version)]
#[command(author = "OctoFHIR Team <funyloony@gmail.com>")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression against a JSON target
    Eval {
        /// Expression to evaluate
        expression: String,
        /// Declared result type (e.g. Integer, String, List<Integer>)
        #[arg(short = 't', long = "type", default_value = "Any")]
        result_type: String,
        /// Parameter as JSON, exposed as #param[i] in order (repeatable)
        #[arg(long = "param")]
        params: Vec<String>,
        /// Iteration index exposed as #index
        #[arg(short, long)]
        index: Option<usize>,
        /// JSON file containing the target (reads from stdin if not provided)
        #[arg(short, long)]
        file: Option<String>,
        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
        /// Suppress informational messages
        #[arg(short, long)]
        quiet: bool,
    },
    /// Compile an expression and report syntax errors
    Check {
        /// Expression to check
        expression: String,
        /// Suppress informational messages
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() {
    human_panic::setup_panic!();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Eval {
            expression,
            result_type,
            params,
            index,
            file,
            pretty,
            quiet,
        } => handle_eval(
            &expression,
            &result_type,
            &params,
            index,
            file.as_deref(),
            pretty,
            quiet,
        ),
        Commands::Check { expression, quiet } => handle_check(&expression, quiet),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn read_target(file: Option<&str>) -> Result<Value> {
    let data = match file {
        Some(filename) => fs::read_to_string(filename)
            .with_context(|| format!("reading file '{filename}'"))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("reading from stdin")?;
            buffer
        }
    };
    if data.trim().is_empty() {
        return Ok(Value::Null);
    }
    let json: serde_json::Value = serde_json::from_str(&data).context("parsing JSON target")?;
    Ok(Value::from(json))
}

fn handle_eval(
    expression: &str,
    result_type: &str,
    params: &[String],
    index: Option<usize>,
    file: Option<&str>,
    pretty: bool,
    quiet: bool,
) -> Result<()> {
    let result_type: ValueType = result_type.parse()?;
    let params = params
        .iter()
        .map(|raw| {
            serde_json::from_str::<serde_json::Value>(raw)
                .map(Value::from)
                .with_context(|| format!("parsing parameter {raw}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let target = read_target(file)?;

    if !quiet {
        eprintln!("Evaluating: {expression} as {result_type}");
    }

    let evaluator = ExpressionEvaluator::new();
    let typed = evaluator.expression(result_type, expression, params);
    let value = typed.evaluate(&target, index)?;

    let json = value.to_json();
    let output = if pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    println!("{output}");
    Ok(())
}

fn handle_check(expression: &str, quiet: bool) -> Result<()> {
    ExpressionEvaluator::new().compile(expression)?;
    if !quiet {
        println!("OK: {expression}");
    }
    Ok(())
}

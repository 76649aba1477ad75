// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # onnx-prep
//!
//! Command-line interface for importing, planning and running models.
//!
//! ## Usage
//! ```bash
//! # Validate a model and print every tensor descriptor
//! onnx-prep inspect --model ./models/addition.json
//!
//! # Show the buffer plan and the pool capacity it needs
//! onnx-prep plan --model ./models/addition.json --pool slab
//!
//! # Run the reference backend on inputs from a JSON file
//! onnx-prep run --model ./models/addition.json --inputs ./inputs.json
//! ```

mod commands;

use clap::{Parser, Subcommand};
use runtime::PoolKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "onnx-prep",
    about = "Import, validate and run ONNX-style models over pooled tensor memory",
    version,
    author
)]
struct Cli {
    /// Path to a TOML runtime configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a model and print its tensors and nodes.
    Inspect {
        /// Path to the JSON model file.
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Build the execution plan and report the pool capacity it needs.
    Plan {
        /// Path to the JSON model file.
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Pool strategy: arena or slab.
        #[arg(short, long)]
        pool: Option<PoolKind>,
    },

    /// Run the model on the reference CPU backend.
    Run {
        /// Path to the JSON model file.
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// JSON file mapping each input name to a flat array of values.
        #[arg(short, long)]
        inputs: PathBuf,

        /// Pool strategy: arena or slab.
        #[arg(short, long)]
        pool: Option<PoolKind>,

        /// Memory budget (e.g., "64K", "1M").
        #[arg(short = 'b', long)]
        memory_budget: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Inspect { model } => {
            let config = commands::resolve_config(config, model)?;
            commands::inspect::execute(config)
        }
        Commands::Plan { model, pool } => {
            let mut config = commands::resolve_config(config, model)?;
            if let Some(pool) = pool {
                config.pool = pool;
            }
            commands::plan::execute(config)
        }
        Commands::Run {
            model,
            inputs,
            pool,
            memory_budget,
        } => {
            let mut config = commands::resolve_config(config, model)?;
            if let Some(pool) = pool {
                config.pool = pool;
            }
            if memory_budget.is_some() {
                config.memory_budget = memory_budget;
            }
            commands::run::execute(config, inputs)
        }
    }
}

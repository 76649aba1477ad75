// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared setup.

pub mod inspect;
pub mod plan;
pub mod run;

use anyhow::Context;
use runtime::RuntimeConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `-v` when set.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the configuration file if one was given, then applies `--model`.
pub fn resolve_config(config: Option<&Path>, model: Option<PathBuf>) -> anyhow::Result<RuntimeConfig> {
    let mut resolved = match config {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => {
            let model = model
                .clone()
                .context("either --model or --config must be given")?;
            RuntimeConfig::for_model(model)
        }
    };
    if let Some(model) = model {
        resolved.model_path = model;
    }
    tracing::debug!(?resolved, "configuration resolved");
    Ok(resolved)
}

/// Truncates a string with ellipsis.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

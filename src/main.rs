/*
 * This file is part of Thermistat.
 *
 * Copyright (C) 2025 Thermistat contributors
 *
 * Thermistat is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Thermistat is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Thermistat. If not, see <https://www.gnu.org/licenses/>.
 */

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use tracing::info;

use thermistat::config::{config_path, load_config, load_or_default};
use thermistat::logger;
use thermistat::service::{run_service, ServiceOptions};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!("thermistat {} - NTC thermostat running against a simulated room", VERSION);
    println!();
    println!("Usage: thermistat [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <path>     Config file (default: {})", config_path().display());
    println!("  -n, --polls <n>         Stop after n polls (default: run forever)");
    println!("      --logging           Append events to {}", logger::DEFAULT_LOG_PATH);
    println!("      --log-level <lvl>   Diagnostic filter (default: $THERMISTAT_LOG or info)");
    println!("      --print-params      Print sensor and thermostat parameters first");
    println!("  -h, --help              Show this help");
    println!("  -v, --version           Show version");
}

fn value_after(args: &[String], i: usize, flag: &str) -> anyhow::Result<String> {
    args.get(i + 1)
        .cloned()
        .ok_or_else(|| anyhow!("{} requires an argument", flag))
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config_file: Option<PathBuf> = None;
    let mut log_level: Option<String> = None;
    let mut options = ServiceOptions::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "-v" | "--version" => {
                println!("thermistat {}", VERSION);
                return Ok(());
            }
            "-c" | "--config" => {
                config_file = Some(PathBuf::from(value_after(&args, i, "--config")?));
                i += 1;
            }
            "-n" | "--polls" => {
                let n = value_after(&args, i, "--polls")?;
                options.polls = Some(n.parse().with_context(|| format!("invalid poll count '{}'", n))?);
                i += 1;
            }
            "--log-level" => {
                log_level = Some(value_after(&args, i, "--log-level")?);
                i += 1;
            }
            "--logging" => options.logging = true,
            "--print-params" => options.print_params = true,
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let log_level = log_level
        .or_else(|| std::env::var("THERMISTAT_LOG").ok())
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(&log_level)
        .init();

    if options.logging {
        if let Some(path) = logger::init_logging(None) {
            info!("event log: {}", path.display());
        }
        logger::log_event("startup", serde_json::json!({ "args": args, "version": VERSION }));
    }

    let config = match &config_file {
        Some(path) => load_config(path).with_context(|| format!("loading {}", path.display()))?,
        None => load_or_default().context("loading default config")?,
    };

    match run_service(&config, &options) {
        Ok(summary) => {
            info!(
                polls = summary.polls,
                discarded = summary.discarded,
                "done, last reading {:.1} °C",
                summary.last_celsius
            );
            Ok(())
        }
        Err(err) => {
            if options.logging {
                logger::log_event("fatal_error", serde_json::json!({ "error": format!("{:#}", err) }));
            }
            Err(err)
        }
    }
}

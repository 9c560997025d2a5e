#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `psw`: command-line front end for the pressure switch.

mod backend;
mod calib;
mod cli;
mod error_fmt;
mod logging;
mod run;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn load_config(path: &Path) -> eyre::Result<psw_config::Config> {
    if !path.exists() {
        eyre::bail!("config file not found: {}", path.display());
    }
    psw_config::load_file(path)
}

fn shutdown_flag() -> eyre::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .wrap_err("install Ctrl-C handler")?;
    Ok(flag)
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;
    let cfg = load_config(&cli.config)?;
    logging::init(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            ticks,
            profile,
            peak,
            eeprom,
        } => {
            let shutdown = shutdown_flag()?;
            let opts = run::RunOptions {
                ticks,
                profile,
                peak,
                eeprom: eeprom.as_deref(),
                json: cli.json,
            };
            run::run(&cfg, &opts, &shutdown)
        }
        Commands::Level { eeprom } => calib::show_level(&cfg, eeprom.as_deref(), cli.json),
        Commands::SetLevel { pct, eeprom } => {
            calib::set_level(&cfg, pct, eeprom.as_deref(), cli.json)
        }
        Commands::SelfCheck => calib::self_check(&cfg, cli.json),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    match real_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            ExitCode::from(exit_code_for_error(&e))
        }
    }
}

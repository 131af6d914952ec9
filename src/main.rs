// Copyright © 2026 Aris Lorenzo. All rights reserved.
// SPDX-License-Identifier: MIT

#![doc = include_str!("../README.md")]

mod amx;
mod args;
mod bridge;
mod cli;

use bridge::{Bridge, CoreBinary, CoreError};
use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::process::exit;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_env("AMX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .without_time()
        .init();
}

fn fail(e: anyhow::Error) -> ! {
    eprintln!("amx: {e:#}");
    match e.downcast_ref::<CoreError>() {
        Some(e) => exit(e.exit_code()),
        None => exit(1),
    }
}

/// With no arguments amx is just another name for amx-core.
fn delegate() -> ! {
    let core = CoreBinary::resolve(env::var_os("AMX_CORE").map(PathBuf::from).as_deref());
    fail(Bridge::new(core).exec(env::args_os().skip(1)).into())
}

fn main() {
    init_logging();
    if env::args_os().len() <= 1 {
        delegate();
    }
    let args = args::build().unwrap_or_else(|e| fail(e));
    if let Err(e) = amx::amx(&cli::Cli::parse_from(args)) {
        fail(e);
    }
}

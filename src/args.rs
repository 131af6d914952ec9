// Copyright © 2026 Aris Lorenzo. All rights reserved.
// SPDX-License-Identifier: MIT

use crate::cli::Globals;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::PathBuf;
use tracing::debug;

#[derive(Default, Debug)]
struct Config {
    inner: Option<ConfigInner>,
}

impl Config {
    fn from_path<P: Into<PathBuf>>(p: P) -> Result<Config> {
        let p = p.into();
        let file =
            File::open(&p).with_context(|| format!("cannot read config {}", p.display()))?;
        debug!(path = %p.display(), "using config file");
        Ok(Config {
            inner: Some(ConfigInner {
                lines: BufReader::new(file).lines(),
                section: "".into(),
            }),
        })
    }

    fn from_env() -> Result<Config> {
        Self::from_vars(
            env::var_os("AMX_CONFIG_PATH"),
            env::var_os("AMX_TESTING").is_some(),
        )
    }

    fn from_vars(config_path: Option<OsString>, testing: bool) -> Result<Config> {
        Ok(match config_path {
            None => {
                if testing {
                    return Ok(Default::default());
                }
                match dirs::config_dir() {
                    None => Default::default(),
                    Some(mut p) => {
                        p.push("amx.rc");
                        Self::from_path(p).unwrap_or_default()
                    }
                }
            }
            Some(p) if p.is_empty() => Default::default(),
            Some(p) => Self::from_path(p)?,
        })
    }

    fn slurp_into(mut self, subcommand_prefix: &OsStr, out: &mut Vec<OsString>) -> Result<()> {
        let inner = match &mut self.inner {
            Some(ref mut i) => i,
            _ => return Ok(()),
        };
        while let Some(line) = inner.lines.next() {
            let line = line?;
            if line.starts_with('-') {
                if inner.in_section(subcommand_prefix) {
                    out.push(line.into());
                }
            } else if line.trim_start().starts_with('#') || line.trim().is_empty() {
                continue;
            } else {
                inner.section = line.trim().into();
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ConfigInner {
    lines: Lines<BufReader<File>>,
    section: String,
}

impl ConfigInner {
    fn in_section(&self, subcommand_prefix: &OsStr) -> bool {
        self.section.is_empty()
            || self
                .section
                .starts_with(&*subcommand_prefix.to_string_lossy())
    }
}

/// A reduced `cli::Cli` used to "preprocess" the command-line in order to separate the global
/// options from the subcommand and its arguments.
#[derive(Parser)]
#[command(disable_help_flag = true, args_override_self = true)]
struct PreCli {
    #[command(flatten)]
    globals: Globals,
    #[arg(short = 'h')]
    help_short: bool,
    #[arg(long = "help")]
    help_long: bool,
    #[command(subcommand)]
    command: PreCliSub,
}

#[derive(Subcommand)]
enum PreCliSub {
    #[command(external_subcommand)]
    External(Vec<OsString>),
}

/// Reproduce the command-line options which parse to `globals`.
fn globals_to_vec(globals: &Globals) -> Vec<OsString> {
    let mut v = vec![];
    if globals.verbose {
        v.push("--verbose".into());
    }
    if globals.dry_run {
        v.push("--dry-run".into());
    }
    if let Some(ref core) = globals.core {
        v.push("--core".into());
        v.push(core.clone());
    }
    v
}

/// Get the "cooked" args vector, incorporating the config file (if any).
pub fn build() -> Result<Vec<OsString>> {
    let raw: Vec<OsString> = env::args_os().collect();
    match PreCli::try_parse_from(&raw) {
        Ok(pre_cli) => build_with_pre_cli(pre_cli, raw.into_iter().next(), Config::from_env()?),
        Err(_) => Ok(raw),
    }
}

/// Config options are placed ahead of everything the user typed so that the command line wins.
/// They go before the subcommand, as only global options are accepted there by every subcommand,
/// including ones forwarded verbatim to the core.
fn build_with_pre_cli(
    pre_cli: PreCli,
    bin: Option<OsString>,
    config: Config,
) -> Result<Vec<OsString>> {
    let mut args = vec![];
    let PreCliSub::External(sub_and_args) = pre_cli.command;
    let mut sub_and_args = sub_and_args.into_iter();
    let sub = sub_and_args
        .next()
        .ok_or_else(|| anyhow!("missing subcommand"))?;
    args.extend(bin);
    config.slurp_into(&sub, &mut args)?;
    args.extend(globals_to_vec(&pre_cli.globals));
    if pre_cli.help_short {
        args.push("-h".into());
    }
    if pre_cli.help_long {
        args.push("--help".into());
    }
    args.push(sub);
    args.extend(sub_and_args);
    Ok(args)
}

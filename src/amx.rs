// Copyright © 2026 Aris Lorenzo. All rights reserved.
// SPDX-License-Identifier: MIT

use crate::bridge::{Bridge, CoreBinary, Invocation};
use crate::cli::{Cli, Command, Globals, Info, Upmix, Verify};
use anyhow::{anyhow, Result};
use shell_quote::Bash;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process;
use tracing::debug;

fn plan_upmix(upmix: &Upmix) -> Invocation {
    Invocation::new("upmix")
        .args(upmix.input.iter())
        .args(upmix.output.iter())
        .args(upmix.args.iter())
}

fn plan_verify(verify: &Verify) -> Invocation {
    Invocation::new("verify").args(verify.files.iter())
}

fn plan_info(info: &Info) -> Invocation {
    Invocation::new("info").arg(&info.file)
}

fn plan_external(sub_and_args: &[OsString]) -> Result<Invocation> {
    match sub_and_args {
        [sub, args @ ..] if !sub.is_empty() => Ok(Invocation::new(sub).args(args)),
        _ => Err(anyhow!("missing subcommand")),
    }
}

fn plan(command: &Command, globals: &Globals) -> Result<Invocation> {
    let invocation = match command {
        Command::Upmix(ref u) => plan_upmix(u),
        Command::Verify(ref v) => plan_verify(v),
        Command::Info(ref i) => plan_info(i),
        Command::External(ref e) => plan_external(e)?,
    };
    Ok(invocation.verbose(globals.verbose))
}

fn quote(arg: &OsStr) -> String {
    String::from_utf8_lossy(&Bash::quote_vec(arg)).into_owned()
}

fn render(cmd: &process::Command) -> String {
    let mut quoted = vec![quote(cmd.get_program())];
    quoted.extend(cmd.get_args().map(quote));
    quoted.join(" ")
}

pub fn amx(cli: &Cli) -> Result<()> {
    let bridge = Bridge::new(CoreBinary::resolve(cli.globals.core.as_deref().map(Path::new)));
    let invocation = plan(&cli.command, &cli.globals)?;
    debug!(?invocation, core = ?bridge.core(), "planned");
    if cli.globals.dry_run {
        println!("{}", render(&bridge.command(&invocation)?));
        return Ok(());
    }
    let Invocation {
        subcommand,
        args,
        verbose,
    } = invocation;
    bridge.run_core(subcommand, args, verbose)?;
    Ok(())
}

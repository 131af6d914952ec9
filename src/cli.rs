// Copyright © 2026 Aris Lorenzo. All rights reserved.
// SPDX-License-Identifier: MIT

use clap::{Args, Parser, Subcommand, ValueHint};
use std::ffi::OsString;
use std::path::PathBuf;

const CORE_HEADING: Option<&str> = Some("CORE OPTIONS");

/// Frontend for the amx-core audio matrix engine (see --help for more details)
///
/// All of the real work is done by a separate executable, amx-core, which is located by searching
/// the PATH environment variable (or taken from --core/AMX_CORE). This tool gives the core a
/// uniform command line:
///
///     amx-core [-v] <SUBCOMMAND> [ARGS...]
///
/// Invoked with no arguments at all, amx replaces itself with amx-core, so the two are
/// interchangeable in that case.
///
/// The subcommands "upmix", "verify" and "info" are known to amx and have their arguments checked
/// before the core is started. Any other subcommand is forwarded verbatim, so subcommands added to
/// the core are usable without updating amx. Known subcommands can be abbreviated to any
/// unambiguous prefix:
///
///     $ amx upmix song.wav song_2_1.wav
///     $ amx up song.wav song_2_1.wav      # same thing
///     $ amx -v verify a.wav b.wav
///     $ amx -# info song.wav              # print the amx-core command line only
///
/// Default options can be kept in a config file, "amx.rc" in the user config directory (or the
/// file named by AMX_CONFIG_PATH; set it to an empty string to disable the config file). Each line
/// starting with "-" is an option. Any other non-blank line that does not start with "#" begins a
/// section, and options in that section only apply to subcommands whose name starts with the
/// given (possibly abbreviated) subcommand. Options before the first section always apply. For
/// example:
///
///     # always be verbose
///     --verbose
///     upmix
///     --core=/opt/amx/bin/amx-core
///
/// Options given on the command line override options from the config file.
///
/// The exit status is that of amx-core when it runs and fails, 127 when it cannot be found, and
/// 126 when it is found but cannot be started.
#[derive(Parser)]
#[command(name = "amx", version, verbatim_doc_comment, infer_subcommands = true)]
#[command(args_override_self = true)]
pub struct Cli {
    #[command(flatten)]
    pub globals: Globals,
    /// The subcommand
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Clone, Default)]
pub struct Globals {
    /// Ask amx-core for verbose output (passes -v to it)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Perform a dry run, only printing the generated command line
    #[arg(short = '#', long, global = true)]
    pub dry_run: bool,
    /// Path to the amx-core executable; empty searches PATH [default: search PATH]
    #[arg(long, env = "AMX_CORE", value_hint = ValueHint::ExecutablePath, global = true,
          help_heading = CORE_HEADING)]
    pub core: Option<OsString>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Upmix a stereo WAV file to 2.1
    ///
    /// The output keeps the left and right channels and adds a low-frequency channel derived from
    /// their sum. Only 16-bit PCM stereo input is accepted by the core. INPUT and OUTPUT default to
    /// whatever amx-core defaults to when omitted.
    Upmix(Upmix),
    /// Check that WAV file headers are well-formed
    Verify(Verify),
    /// Print the format of a WAV file
    Info(Info),
    // Any other subcommand is passed to amx-core unchanged.
    #[command(external_subcommand)]
    External(Vec<OsString>),
}

#[derive(Args)]
pub struct Upmix {
    /// Stereo WAV file to read
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,
    /// WAV file to write
    #[arg(value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
    /// Trailing arguments to forward to amx-core
    #[arg(last = true)]
    pub args: Vec<OsString>,
}

#[derive(Args)]
pub struct Verify {
    /// WAV files to check
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct Info {
    /// WAV file to describe
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

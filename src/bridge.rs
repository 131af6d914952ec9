// Copyright © 2026 Aris Lorenzo. All rights reserved.
// SPDX-License-Identifier: MIT

//! Locating and invoking the `amx-core` executable.

use std::env;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use thiserror::Error;
use tracing::debug;

/// Name of the core executable searched for on `PATH`.
pub const CORE_BIN: &str = "amx-core";

/// Failures surfaced by the bridge. Each one is fatal to the current invocation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("empty subcommand")]
    EmptySubcommand,
    #[error("core binary `{0}` not found on PATH")]
    NotFound(String),
    #[error("core binary not found at {}", .0.display())]
    Missing(PathBuf),
    #[error("failed to run {}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The core ran and exited unsuccessfully. `None` when no exit code was
    /// reported, e.g. the child was killed by a signal.
    #[error("{} failed with {}", CORE_BIN, describe_code(.0))]
    Failed(Option<i32>),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(i) => format!("code {i}"),
        None => "unknown code".into(),
    }
}

impl CoreError {
    /// Exit status the front end should terminate with after this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::Failed(Some(i)) => *i,
            CoreError::Failed(None) | CoreError::EmptySubcommand => 1,
            CoreError::Spawn { .. } => 126,
            CoreError::NotFound(_) | CoreError::Missing(_) => 127,
        }
    }
}

/// Where the core executable lives, decided once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreBinary {
    Found(PathBuf),
    /// Searched `PATH` for this name without success.
    NotOnPath(String),
    /// An explicit override pointed at something that is not a file.
    NotAt(PathBuf),
}

impl CoreBinary {
    /// Use `explicit` if given and non-empty, otherwise search `PATH`.
    pub fn resolve(explicit: Option<&Path>) -> CoreBinary {
        let core = match explicit {
            Some(p) if !p.as_os_str().is_empty() => Self::at(p),
            _ => Self::search(CORE_BIN, env::var_os("PATH").as_deref()),
        };
        debug!(?core, "resolved core binary");
        core
    }

    pub fn at(path: &Path) -> CoreBinary {
        if path.is_file() {
            CoreBinary::Found(path.to_owned())
        } else {
            CoreBinary::NotAt(path.to_owned())
        }
    }

    /// Look for an executable `name` in each directory of `path_var`, in order.
    /// Empty entries are skipped rather than treated as the working directory.
    pub fn search(name: &str, path_var: Option<&OsStr>) -> CoreBinary {
        let file_name = format!("{name}{}", env::consts::EXE_SUFFIX);
        let found = path_var
            .into_iter()
            .flat_map(|p| env::split_paths(p))
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| dir.join(&file_name))
            .find(|candidate| is_executable(candidate));
        match found {
            Some(p) => CoreBinary::Found(std::path::absolute(&p).unwrap_or(p)),
            None => CoreBinary::NotOnPath(name.to_owned()),
        }
    }

    pub fn path(&self) -> Result<&Path, CoreError> {
        match self {
            CoreBinary::Found(p) => Ok(p),
            CoreBinary::NotOnPath(name) => Err(CoreError::NotFound(name.clone())),
            CoreBinary::NotAt(p) => Err(CoreError::Missing(p.clone())),
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// One call into the core: `<core> [-v] <subcommand> [args...]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub subcommand: OsString,
    pub args: Vec<OsString>,
    pub verbose: bool,
}

impl Invocation {
    pub fn new<S: Into<OsString>>(subcommand: S) -> Invocation {
        Invocation {
            subcommand: subcommand.into(),
            args: Vec::new(),
            verbose: false,
        }
    }

    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Invocation {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Invocation {
        self.verbose = verbose;
        self
    }
}

#[derive(Debug)]
pub struct Bridge {
    core: CoreBinary,
}

impl Bridge {
    pub fn new(core: CoreBinary) -> Bridge {
        Bridge { core }
    }

    pub fn core(&self) -> &CoreBinary {
        &self.core
    }

    /// Build the command line for `invocation` without running it. Fails if the
    /// subcommand is empty or the core was never resolved.
    pub fn command(&self, invocation: &Invocation) -> Result<process::Command, CoreError> {
        if invocation.subcommand.is_empty() {
            return Err(CoreError::EmptySubcommand);
        }
        let mut cmd = process::Command::new(self.core.path()?);
        if invocation.verbose {
            cmd.arg("-v");
        }
        cmd.arg(&invocation.subcommand);
        cmd.args(&invocation.args);
        Ok(cmd)
    }

    /// Run the core to completion with inherited stdio.
    pub fn run(&self, invocation: &Invocation) -> Result<(), CoreError> {
        let mut cmd = self.command(invocation)?;
        debug!(command = ?cmd, "running core");
        let status = cmd.status().map_err(|source| CoreError::Spawn {
            path: cmd.get_program().into(),
            source,
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(CoreError::Failed(status.code()))
        }
    }

    pub fn run_core<T, I, S>(
        &self,
        subcommand: T,
        args: I,
        verbose: bool,
    ) -> Result<(), CoreError>
    where
        T: Into<OsString>,
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.run(&Invocation::new(subcommand).args(args).verbose(verbose))
    }

    /// The command `exec` would replace the current process with.
    pub fn exec_command<I, S>(&self, args: I) -> Result<process::Command, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = process::Command::new(self.core.path()?);
        cmd.args(args);
        Ok(cmd)
    }

    /// Replace the current process image with the core, forwarding `args`
    /// verbatim. Only returns if that was impossible.
    #[cfg(unix)]
    pub fn exec<I, S>(&self, args: I) -> CoreError
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        use std::os::unix::process::CommandExt;
        let mut cmd = match self.exec_command(args) {
            Ok(cmd) => cmd,
            Err(e) => return e,
        };
        debug!(command = ?cmd, "exec core");
        let source = cmd.exec();
        CoreError::Spawn {
            path: cmd.get_program().into(),
            source,
        }
    }

    /// Without `exec(2)` the closest equivalent is to run the core and exit
    /// with its status.
    #[cfg(not(unix))]
    pub fn exec<I, S>(&self, args: I) -> CoreError
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = match self.exec_command(args) {
            Ok(cmd) => cmd,
            Err(e) => return e,
        };
        debug!(command = ?cmd, "delegating to core");
        match cmd.status() {
            Ok(status) => process::exit(status.code().unwrap_or(1)),
            Err(source) => CoreError::Spawn {
                path: cmd.get_program().into(),
                source,
            },
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn args_of(cmd: &process::Command) -> Vec<&OsStr> {
        cmd.get_args().collect()
    }

    fn sh() -> Bridge {
        Bridge::new(CoreBinary::Found("/bin/sh".into()))
    }

    fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn verbose_flag_precedes_subcommand() {
        let bridge = Bridge::new(CoreBinary::Found("/opt/amx/amx-core".into()));
        let inv = Invocation::new("upmix").args(["in.wav", "out.wav"]).verbose(true);
        let cmd = bridge.command(&inv).unwrap();
        assert_eq!(cmd.get_program(), "/opt/amx/amx-core");
        assert_eq!(args_of(&cmd), ["-v", "upmix", "in.wav", "out.wav"]);
    }

    #[test]
    fn quiet_command_has_no_flag() {
        let bridge = Bridge::new(CoreBinary::Found("/opt/amx/amx-core".into()));
        let cmd = bridge.command(&Invocation::new("verify")).unwrap();
        assert_eq!(args_of(&cmd), ["verify"]);
    }

    #[test]
    fn unresolved_core_fails_before_spawning() {
        let bridge = Bridge::new(CoreBinary::NotOnPath(CORE_BIN.into()));
        let err = bridge.run_core("upmix", ["in.wav"], false).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(ref n) if n == CORE_BIN));
        assert_eq!(err.to_string(), "core binary `amx-core` not found on PATH");
        assert_eq!(err.exit_code(), 127);
        assert!(matches!(
            bridge.exec_command(["x"]),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn empty_subcommand_is_rejected() {
        let err = sh().run_core("", ["exit 0"], false).unwrap_err();
        assert!(matches!(err, CoreError::EmptySubcommand));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn unexecutable_core_is_a_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CORE_BIN);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        let bridge = Bridge::new(CoreBinary::at(&path));

        let err = bridge.run_core("info", ["a.wav"], false).unwrap_err();
        assert_eq!(err.exit_code(), 126);
        assert_eq!(err.to_string(), format!("failed to run {}", path.display()));
        match err {
            CoreError::Spawn { path: ref p, ref source } => {
                assert_eq!(p, &path);
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            ref other => panic!("unexpected error: {other:?}"),
        }
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<io::Error>().is_some());

        // exec(2) fails with EACCES as well, leaving this process in place.
        match bridge.exec(["info"]) {
            CoreError::Spawn { path: p, source } => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_override_is_reported_by_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope");
        assert_eq!(CoreBinary::at(&path), CoreBinary::NotAt(path.clone()));
        let err = Bridge::new(CoreBinary::at(&path))
            .run_core("info", Vec::<OsString>::new(), false)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("core binary not found at {}", path.display())
        );
    }

    #[test]
    fn empty_override_falls_back_to_search() {
        assert!(!matches!(
            CoreBinary::resolve(Some(Path::new(""))),
            CoreBinary::NotAt(_)
        ));
    }

    #[test]
    fn zero_exit_is_success_regardless_of_verbose() {
        // `sh -v -c ...` only echoes the script, so both variants exit 0.
        assert!(sh().run_core("-c", ["exit 0"], false).is_ok());
        assert!(sh().run_core("-c", ["exit 0"], true).is_ok());
    }

    #[test]
    fn nonzero_exit_code_is_carried_in_error() {
        for code in [1, 2, 3, 42, 127, 255] {
            let err = sh()
                .run_core("-c", [format!("exit {code}")], false)
                .unwrap_err();
            assert!(matches!(err, CoreError::Failed(Some(c)) if c == code));
            assert_eq!(err.to_string(), format!("amx-core failed with code {code}"));
            assert_eq!(err.exit_code(), code);
        }
    }

    #[test]
    fn signal_death_has_unknown_code() {
        let err = sh().run_core("-c", ["kill -9 $$"], false).unwrap_err();
        assert!(matches!(err, CoreError::Failed(None)));
        assert_eq!(err.to_string(), "amx-core failed with unknown code");
    }

    #[test]
    fn stub_observes_forwarded_argv() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("argv");
        let stub = write_stub(
            dir.path(),
            CORE_BIN,
            &format!("printf '%s\\n' \"$@\" > '{}'", log.display()),
        );
        Bridge::new(CoreBinary::Found(stub))
            .run_core("build", ["--target", "x"], true)
            .unwrap();
        assert_eq!(fs::read_to_string(log).unwrap(), "-v\nbuild\n--target\nx\n");
    }

    #[test]
    fn search_finds_first_executable_on_path() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        // Not executable, so it must be skipped.
        fs::write(first.path().join(CORE_BIN), "").unwrap();
        let stub = write_stub(second.path(), CORE_BIN, "exit 0");
        let path_var = env::join_paths([
            Path::new("/nonexistent"),
            Path::new(""),
            first.path(),
            second.path(),
        ])
        .unwrap();
        assert_eq!(
            CoreBinary::search(CORE_BIN, Some(path_var.as_os_str())),
            CoreBinary::Found(stub)
        );
    }

    #[test]
    fn search_without_hit_records_name() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            CoreBinary::search(CORE_BIN, Some(dir.path().as_os_str())),
            CoreBinary::NotOnPath(CORE_BIN.into())
        );
        assert_eq!(
            CoreBinary::search(CORE_BIN, None),
            CoreBinary::NotOnPath(CORE_BIN.into())
        );
    }

    #[test]
    fn exec_command_forwards_args_unchanged() {
        let bridge = Bridge::new(CoreBinary::Found("/opt/amx/amx-core".into()));
        let cmd = bridge.exec_command(Vec::<OsString>::new()).unwrap();
        assert_eq!(cmd.get_program(), "/opt/amx/amx-core");
        assert!(args_of(&cmd).is_empty());
        let cmd = bridge.exec_command(["-v", "upmix"]).unwrap();
        assert_eq!(args_of(&cmd), ["-v", "upmix"]);
    }
}

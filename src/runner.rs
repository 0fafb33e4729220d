//! Subprocess handoff to the external `ninja` executable.
//!
//! Ninja itself is never reimplemented or parsed beyond its own status
//! output; this module only resolves the executable, builds its argument
//! list, and streams its stdout/stderr back to the user.

use crate::error::{Error, Result};
use camino::Utf8Path;
use ninja_env::NINJA_ENV;
use std::env;
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use tracing::info;

const DEFAULT_NINJA_PROGRAM: &str = "ninja";

fn resolve_ninja_program_with(mut read_env: impl FnMut(&str) -> Option<OsString>) -> PathBuf {
    read_env(NINJA_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_NINJA_PROGRAM))
}

/// Resolve the `ninja` executable: the `NINJA` environment variable when
/// set, otherwise the bare name `ninja` resolved via `PATH` by the OS.
#[must_use]
pub fn resolve_ninja_program() -> PathBuf {
    resolve_ninja_program_with(|key| env::var_os(key))
}

struct CommandArg(String);

impl CommandArg {
    fn as_str(&self) -> &str {
        &self.0
    }
}

const SENSITIVE_KEYS: [&str; 5] = ["password", "token", "secret", "auth", "authorization"];

fn is_sensitive_arg(arg: &CommandArg) -> bool {
    arg.as_str()
        .split_once('=')
        .is_some_and(|(key, _)| SENSITIVE_KEYS.iter().any(|k| key.trim().eq_ignore_ascii_case(k)))
}

fn redact_argument(arg: &CommandArg) -> String {
    if is_sensitive_arg(arg) {
        if let Some((key, _)) = arg.as_str().split_once('=') {
            return format!("{}=***REDACTED***", key.trim());
        }
        return "***REDACTED***".to_owned();
    }
    arg.as_str().to_owned()
}

fn log_command_execution(cmd: &Command) {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| redact_argument(&CommandArg(a.to_string_lossy().into_owned())))
        .collect();
    info!("running command: {} {}", program, args.join(" "));
}

/// Invoke `ninja` against `build_file`, forwarding `jobs` and `directory`
/// when set and building only `targets` (all default targets when empty).
///
/// # Errors
///
/// Returns [`Error::Io`] if the process cannot be spawned or its standard
/// streams cannot be read, or [`Error::SubprocessFailed`] when `ninja`
/// exits with a non-zero status.
pub fn run_ninja(
    program: &Path,
    build_file: &Utf8Path,
    directory: Option<&Path>,
    jobs: Option<usize>,
    targets: &[String],
) -> Result<()> {
    let mut cmd = Command::new(program);
    if let Some(dir) = directory {
        cmd.current_dir(dir);
    }
    if let Some(jobs) = jobs {
        cmd.arg("-j").arg(jobs.to_string());
    }
    cmd.arg("-f").arg(build_file.as_std_path());
    cmd.args(targets);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    log_command_execution(&cmd);

    let child = cmd.spawn().map_err(|source| Error::Io {
        path: program.to_path_buf(),
        source,
    })?;
    let status = spawn_and_stream_output(child).map_err(|source| Error::Io {
        path: program.to_path_buf(),
        source,
    })?;
    check_exit_status(&status)
}

fn spawn_and_stream_output(mut child: Child) -> io::Result<ExitStatus> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child process missing stdout pipe"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child process missing stderr pipe"))?;

    let out_handle = thread::spawn(move || {
        let reader = BufReader::new(stdout);
        let mut handle = io::stdout();
        for line in reader.lines().map_while(std::result::Result::ok) {
            if writeln!(handle, "{line}").is_err() {
                break;
            }
        }
    });
    let err_handle = thread::spawn(move || {
        let reader = BufReader::new(stderr);
        let mut handle = io::stderr();
        for line in reader.lines().map_while(std::result::Result::ok) {
            if writeln!(handle, "{line}").is_err() {
                break;
            }
        }
    });

    let status = child.wait()?;
    if let Err(err) = out_handle.join() {
        tracing::warn!("stdout forwarding thread panicked: {err:?}");
    }
    if let Err(err) = err_handle.join() {
        tracing::warn!("stderr forwarding thread panicked: {err:?}");
    }
    Ok(status)
}

fn check_exit_status(status: &ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    Err(Error::SubprocessFailed {
        name: "ninja".to_owned(),
        code: status.code().unwrap_or(-1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_ninja_program_prefers_env_override() {
        let resolved = resolve_ninja_program_with(|_| Some(OsString::from("/opt/ninja")));
        assert_eq!(resolved, PathBuf::from("/opt/ninja"));
    }

    #[test]
    fn resolve_ninja_program_defaults_without_override() {
        let resolved = resolve_ninja_program_with(|_| None);
        assert_eq!(resolved, PathBuf::from(DEFAULT_NINJA_PROGRAM));
    }

    #[test]
    fn redacts_sensitive_key_value_args() {
        let arg = CommandArg("token=abc123".to_owned());
        assert_eq!(redact_argument(&arg), "token=***REDACTED***");
        let arg = CommandArg("path=/tmp".to_owned());
        assert_eq!(redact_argument(&arg), "path=/tmp");
    }

    #[cfg(unix)]
    #[test]
    fn run_ninja_surfaces_nonzero_exit_as_subprocess_failed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script_path = dir.path().join("fake-ninja");
        std::fs::write(&script_path, "#!/bin/sh\nexit 3\n").expect("write script");
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&script_path).expect("metadata").permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&script_path, perms).expect("chmod");
        }
        let build_file = camino::Utf8PathBuf::try_from(dir.path().join("build.ninja")).expect("utf8");
        std::fs::write(build_file.as_std_path(), "").expect("write build file");

        let err = run_ninja(&script_path, &build_file, None, None, &[]).unwrap_err();
        match err {
            Error::SubprocessFailed { code, .. } => assert_eq!(code, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

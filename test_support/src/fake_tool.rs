//! Fake toolchain executables for driver and planner integration tests.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = File::create(&path).unwrap_or_else(|err| {
        panic!("create fake tool script {}: {err}", path.display());
    });
    writeln!(file, "#!/bin/sh\n{body}").unwrap_or_else(|err| {
        panic!("write fake tool script {}: {err}", path.display());
    });
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&path)
            .unwrap_or_else(|err| panic!("stat fake tool script: {err}"))
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap_or_else(|err| {
            panic!("chmod fake tool script: {err}");
        });
    }
    path
}

/// Create a fake `ninja` executable that exits with `exit_code`, echoing
/// its arguments to stdout first so tests can assert on invocation shape.
#[must_use]
pub fn fake_ninja(exit_code: i32) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap_or_else(|err| panic!("create temp dir: {err}"));
    let path = write_script(&dir, "ninja", &format!("echo \"$@\"\nexit {exit_code}"));
    (dir, path)
}

/// Create a fake `cxx`/`ar`/`ld`-style executable under `dir` that always
/// succeeds, touching its last `-o`/`-MF` argument-adjacent output path when
/// asked to simulate producing an object file.
#[must_use]
pub fn fake_success_tool(dir: &TempDir, name: &str) -> PathBuf {
    write_script(dir, name, "exit 0")
}

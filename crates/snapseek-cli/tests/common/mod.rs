//! Shared test utilities for snapseek-cli integration tests.

use std::path::Path;

use assert_cmd::Command;

/// Get a Command for the snapseek binary.
///
/// # Panics
///
/// Panics if the snapseek binary cannot be found. This should not happen
/// in a properly configured test environment.
#[allow(deprecated)]
pub fn snapseek_cmd() -> Command {
    Command::cargo_bin("snapseek").expect("snapseek binary should exist")
}

/// A snapseek command isolated in `root`: no user config, no user models,
/// data under `root/data`, colors off.
pub fn isolated_cmd(root: &Path) -> Command {
    let mut cmd = snapseek_cmd();
    cmd.env_remove("SNAPSEEK_CONFIG")
        .env_remove("SNAPSEEK_DATA_DIR")
        .env_remove("SNAPSEEK_DEVICE")
        .env("HOME", root)
        .env("SNAPSEEK_MODELS_DIR", root.join("models"))
        .arg("--config")
        .arg(root.join("config.yaml"))
        .arg("--data-dir")
        .arg(root.join("data"))
        .arg("--color")
        .arg("never");
    cmd
}

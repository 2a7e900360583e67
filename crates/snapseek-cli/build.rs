use std::process::Command;

/// Short commit hash for `snapseek --version`. A checkout wins over the
/// `GIT_HASH` variable set by release builds from a source tarball.
fn commit_hash() -> Option<String> {
    let from_git = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|hash| hash.trim().to_string());

    from_git
        .or_else(|| std::env::var("GIT_HASH").ok())
        .filter(|hash| !hash.is_empty() && hash != "unknown")
}

fn main() {
    let hash = commit_hash().unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=GIT_HASH={hash}");

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");
    println!("cargo:rerun-if-env-changed=GIT_HASH");
}

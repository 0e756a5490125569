use chrono::Local;
use std::process::Command;

/// Run git from the crate directory, returning trimmed stdout on success.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn main() {
    let commit = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());

    // `git diff --quiet` exits non-zero when tracked files changed
    let dirty = git(&["diff", "--quiet", "HEAD"]).is_none() && commit != "unknown";

    let build_hash = if dirty {
        format!("{commit}-dirty-{}", Local::now().format("%Y%m%d-%H%M%S"))
    } else {
        commit
    };
    println!("cargo:rustc-env=BUILD_HASH={build_hash}");

    // Workspace root holds .git, two levels up
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");
}

//! Bakes the `--version` string and tracks the embedded page assets.
//!
//! Release builds from a tagged commit report the package version. Anything
//! else reports `dev@<short hash>`, or `dev@unknown` outside a git checkout.

use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    // Pages embed these with include_str!.
    println!("cargo:rerun-if-changed=static/style.css");
    println!("cargo:rerun-if-changed=static/custom_html.js");

    let version = if git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some() {
        env!("CARGO_PKG_VERSION").to_string()
    } else {
        match git(&["rev-parse", "--short", "HEAD"]) {
            Some(hash) if !hash.is_empty() => format!("dev@{hash}"),
            _ => "dev@unknown".to_string(),
        }
    };

    println!("cargo:rustc-env=ARTIST_PAGES_VERSION={version}");
}

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Library crates worth reading; the firmware binary and xtask add little.
const PACKAGES: &[&str] = &["platform", "capture", "firmware"];

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building documentation...".cyan().bold());

    let start = Instant::now();
    let mut cmd = Command::new("cargo");
    cmd.args(["doc", "--no-deps", "--document-private-items"]);
    for package in PACKAGES {
        cmd.args(["-p", package]);
    }
    // Emulator docs need the std side of firmware.
    cmd.args(["--features", "firmware/emulator"]);
    if open {
        cmd.arg("--open");
    }

    let output = cmd.output().context("Failed to build documentation")?;
    if !output.status.success() {
        eprintln!("{}", "✗ Documentation build failed".red().bold());
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("Documentation build failed");
    }

    println!(
        "{}",
        format!("✓ Documentation built in {:.2}s", start.elapsed().as_secs_f64()).green()
    );
    if !open {
        println!("   {}", "Open target/doc/capture/index.html in your browser".dimmed());
    }
    println!();
    Ok(())
}

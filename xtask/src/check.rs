use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

const TARGET: &str = "thumbv6m-none-eabi";

/// One `cargo` invocation and whether its failure stops the run.
struct Step {
    label: &'static str,
    args: &'static [&'static str],
    required: bool,
}

const STEPS: &[Step] = &[
    Step {
        label: "hardware firmware (RP2040)",
        args: &["check", "-p", "firmware", "--target", TARGET, "--features", "hardware"],
        required: true,
    },
    Step {
        label: "emulator (host)",
        args: &["check", "-p", "firmware", "--features", "emulator", "--examples"],
        required: true,
    },
    Step {
        label: "platform + capture (no_std)",
        args: &["check", "-p", "platform", "-p", "capture", "--target", TARGET],
        required: true,
    },
    Step {
        label: "clippy",
        args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        required: false,
    },
    Step {
        label: "formatting",
        args: &["fmt", "--all", "--check"],
        required: false,
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking builds...".cyan().bold());
    println!();

    let total_start = Instant::now();
    for step in STEPS {
        run_step(step)?;
    }

    println!(
        "{}",
        format!("✓ All checks completed in {:.2}s", total_start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();
    Ok(())
}

fn run_step(step: &Step) -> Result<()> {
    println!("{}", format!("  Checking {}...", step.label).cyan());
    let start = Instant::now();
    let output = Command::new("cargo")
        .args(step.args)
        .output()
        .with_context(|| format!("Failed to run cargo for {}", step.label))?;

    if output.status.success() {
        println!(
            "{}",
            format!("  ✓ {} passed in {:.2}s", step.label, start.elapsed().as_secs_f64()).green()
        );
    } else if step.required {
        eprintln!("{}", format!("  ✗ {} failed", step.label).red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("{} check failed", step.label);
    } else {
        eprintln!("{}", format!("  ⚠ {} reported problems", step.label).yellow().bold());
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
    }
    println!();
    Ok(())
}

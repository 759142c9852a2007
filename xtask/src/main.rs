use anyhow::{Context, Result};
use clap::Parser;
use procsnap_common::alternate_file_name;
use std::path::PathBuf;
use std::process::Command;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Parser)]
enum Cmd {
    /// Build the 32-bit inspector and install it next to the native one
    BuildX86 {
        #[arg(long, default_value = "i686-unknown-linux-gnu")]
        target: String,
        #[arg(long)]
        release: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::BuildX86 { target, release } => build_x86(&target, release)?,
    }

    Ok(())
}

fn build_x86(target: &str, release: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("build").arg("--package").arg("procsnap").arg("--target").arg(target);
    if release {
        cmd.arg("--release");
    }

    let status = cmd.status().context("Failed to build 32-bit procsnap")?;

    if !status.success() {
        anyhow::bail!("Failed to build 32-bit procsnap");
    }

    let profile = if release { "release" } else { "debug" };
    let target_dir = target_dir();
    let built = target_dir.join(target).join(profile).join("procsnap");
    // The native binary relaunches this file when it meets a 32-bit target
    let installed = target_dir.join(profile).join(alternate_file_name("procsnap"));

    std::fs::create_dir_all(target_dir.join(profile))
        .with_context(|| format!("Failed to create {}", target_dir.join(profile).display()))?;
    std::fs::copy(&built, &installed).with_context(|| {
        format!("Failed to copy {} to {}", built.display(), installed.display())
    })?;

    println!("✓ 32-bit inspector built successfully");
    println!("  Target: {target}");
    println!("  Profile: {profile}");
    println!("  Installed: {}", installed.display());

    Ok(())
}

fn target_dir() -> PathBuf {
    std::env::var_os("CARGO_TARGET_DIR").map_or_else(|| PathBuf::from("target"), PathBuf::from)
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for physview")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Everything CI runs, in order
    Check,
    /// Formatting check
    Fmt,
    /// Lints with warnings denied
    Clippy,
    /// Unit and integration tests
    Test,
    /// License and source audit via cargo-deny
    Deny,
    /// API docs, workspace crates only
    Doc,
    /// Debug build of every member
    Build,
    /// Run a short headless simulation with the shipped configuration
    Smoke,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests()?;
            run_deny()?;
            run_doc()?;
            run_smoke()?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => run_tests()?,
        Commands::Deny => run_deny()?,
        Commands::Doc => run_doc()?,
        Commands::Build => run_build()?,
        Commands::Smoke => run_smoke()?,
    }

    Ok(())
}

fn cargo(banner: &str, args: &[&str]) -> Result<()> {
    println!("==> Running {banner}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{banner} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo("cargo fmt --check", &["fmt", "--all", "--", "--check"])
}

fn run_clippy() -> Result<()> {
    cargo(
        "cargo clippy",
        &[
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ],
    )
}

fn run_tests() -> Result<()> {
    cargo("cargo test", &["test", "--workspace"])
}

fn run_deny() -> Result<()> {
    cargo(
        "cargo deny check (licenses bans sources)",
        &["deny", "check", "licenses", "bans", "sources"],
    )
}

fn run_doc() -> Result<()> {
    cargo("cargo doc", &["doc", "--workspace", "--no-deps"])
}

fn run_build() -> Result<()> {
    cargo("cargo build", &["build", "--workspace"])
}

fn run_smoke() -> Result<()> {
    cargo(
        "headless smoke simulation",
        &[
            "run",
            "-p",
            "physview-cli",
            "--",
            "simulate",
            "--config",
            "configs/default.yaml",
            "--ticks",
            "60",
            "--layers",
            "4",
        ],
    )
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use harness::matrix::{Cell, Matrix, Outcome, Progress};
use harness::{builder, default_adapters};
use owo_colors::OwoColorize;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "wasictl", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile integration/* test programs into build/ and persist their
    /// expectation records
    Build,
    /// Run every built artifact through every runtime adapter and report
    /// per-cell conformance; exits nonzero unless the matrix is fully green
    Run,
}

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}

/// Line-oriented progress rendering, one line per matrix cell.
struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn case_started(&mut self, artifact: &Path) {
        println!("test {} ...", artifact.display());
    }

    fn case_failed(&mut self, _artifact: &Path, message: &str) {
        println!("  {} ({message})", "FAILED".red());
    }

    fn cell_recorded(&mut self, cell: &Cell) {
        match cell.outcome {
            Outcome::Pass => println!("  {} ... {}", cell.adapter, "ok".green()),
            Outcome::Fail => println!("  {} ... {}", cell.adapter, "FAILED".red()),
            Outcome::Error => println!(
                "  {} ... {} ({})",
                cell.adapter,
                "ERROR".red(),
                cell.detail.as_deref().unwrap_or("unknown harness failure")
            ),
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Build => {
            builder::build_all(Path::new("integration"), Path::new("build"))?;
        }
        Commands::Run => {
            let matrix = Matrix::new(default_adapters());
            let report = matrix.run(&mut ConsoleProgress);
            if !report.all_passed() {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

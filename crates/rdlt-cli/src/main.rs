//! CLI front-end for the RDLT L-safeness and classical soundness analyzer.

use anyhow::{Context, Result};
use clap::Parser;
use rdlt_core::config::RdltConfig;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "rdlt", about = "L-Safeness and Classical Soundness analyzer for RDLT graphs")]
struct Cli {
    /// Path to the RDLT input file
    file: PathBuf,

    /// Emit the analysis report as JSON instead of a human-readable summary
    #[arg(long)]
    json: bool,

    /// Override the activity-extraction depth cap
    #[arg(long)]
    max_depth: Option<usize>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let project_root = cli.file.parent().unwrap_or_else(|| std::path::Path::new("."));
    let mut config = RdltConfig::load(project_root).context("failed to load configuration")?;
    if let Some(max_depth) = cli.max_depth {
        config.analysis.max_depth = max_depth;
    }

    let text = std::fs::read_to_string(&cli.file).with_context(|| format!("failed to read {}", cli.file.display()))?;
    let report = rdlt_core::analyze(&text, &config).context("analysis failed")?;

    if cli.json {
        let rendered = serde_json::to_string_pretty(&report).context("failed to render JSON report")?;
        println!("{rendered}");
    } else if cli.quiet {
        render_quiet(&report);
    } else {
        render_human(&report, cli.verbose);
    }

    Ok(())
}

/// `--quiet`: only the final verdict line, for scripted exit-code checks.
fn render_quiet(report: &rdlt_core::AnalysisReport) {
    if report.l_safe && report.classically_sound {
        println!("Ok");
    } else {
        println!("FAILED");
    }
}

fn render_human(report: &rdlt_core::AnalysisReport, verbose: bool) {
    println!("L-safe: {}", report.l_safe);
    println!("Classically sound: {}", report.classically_sound);
    println!("Arcs analyzed: {}", report.matrix.len());

    if report.violations.is_empty() {
        println!("Violations: none");
    } else {
        println!("Violations: {}", report.violations.len());
        for v in &report.violations {
            println!("  [{:?}] {} ({}) — {}", v.kind, v.arc_rid, v.arc.source, v.detail);
        }
    }

    if !report.contraction_reports.is_empty() {
        println!("Contraction reports:");
        for (rid, summary) in &report.contraction_reports {
            println!(
                "  {rid}: {} successful, {} failed",
                summary.successful_count, summary.failed_count
            );
            for failure in &summary.failures {
                println!("    - {failure}");
            }
        }
    }

    println!("Activity profiles recorded: {}", report.activity_profiles.len());

    if verbose && !report.classically_sound && !report.deadlock_breakdown.is_empty() {
        println!("Deadlock breakdown:");
        for point in &report.deadlock_breakdown {
            println!("  at {}:", point.vertex);
            for arc in &point.unreached_arcs {
                println!("    - {} -> {}: {}", arc.arc_rid, arc.target, arc.reason);
            }
        }
    }

    println!("{}", report.summary);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_basic_invocation() {
        let cli = Cli::parse_from(["rdlt", "input.rdlt"]);
        assert_eq!(cli.file, PathBuf::from("input.rdlt"));
        assert!(!cli.json);
    }

    #[test]
    fn test_cli_parses_json_flag() {
        let cli = Cli::parse_from(["rdlt", "--json", "input.rdlt"]);
        assert!(cli.json);
    }

    #[test]
    fn test_cli_parses_max_depth_override() {
        let cli = Cli::parse_from(["rdlt", "--max-depth", "20", "input.rdlt"]);
        assert_eq!(cli.max_depth, Some(20));
    }
}

//! LG CLI entry point.
//!
//! Provides command-line tools for working with LG template files:
//! - `lg check` - Validate .lg files and their imports
//! - `lg eval` - Evaluate a template against JSON data
//! - `lg expand` - List every output of a template
//! - `lg analyze` - Report the variables and templates a template uses
//! - `lg coverage` - Compare localized variants of each resource

mod commands;
mod output;

use std::io;
use std::process::exit;

use clap::{Parser, Subcommand, ValueEnum};
use commands::{
    AnalyzeArgs, CheckArgs, CoverageArgs, EvalArgs, ExpandArgs, run_analyze, run_check,
    run_coverage, run_eval, run_expand,
};
use miette::MietteHandlerOpts;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// LG template file tools.
#[derive(Debug, Parser)]
#[command(name = "lg")]
#[command(about = "LG template file tools", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Color output control
    #[arg(long, value_enum, default_value_t = ColorWhen::Auto, global = true)]
    pub color: ColorWhen,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// When to use colored output.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorWhen {
    Auto,
    Always,
    Never,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check .lg files for errors and warnings
    Check(CheckArgs),
    /// Evaluate a template
    Eval(EvalArgs),
    /// List every possible output of a template
    Expand(ExpandArgs),
    /// Report the variables and templates a template depends on
    Analyze(AnalyzeArgs),
    /// Report localization coverage of a directory of .lg files
    Coverage(CoverageArgs),
}

/// Set up color output based on user preference.
fn setup_colors(color_when: ColorWhen) {
    match color_when {
        ColorWhen::Auto => {
            // owo-colors automatically checks TTY, NO_COLOR, FORCE_COLOR
        }
        ColorWhen::Always => {
            owo_colors::set_override(true);
        }
        ColorWhen::Never => {
            owo_colors::set_override(false);
        }
    }
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn setup_logging(verbose: bool) {
    let default = if verbose { "warn,lg=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .try_init();
    if let Err(error) = installed {
        debug!(%error, "keeping the existing tracing subscriber");
    }
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    setup_colors(cli.color);
    setup_logging(cli.verbose);

    miette::set_hook(Box::new(|_| {
        Box::new(
            MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))?;

    let result = match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Eval(args) => run_eval(args),
        Commands::Expand(args) => run_expand(args),
        Commands::Analyze(args) => run_analyze(args),
        Commands::Coverage(args) => run_coverage(args),
    };

    match result {
        Ok(code) => exit(code),
        Err(e) => {
            eprintln!("{e:?}");
            exit(exitcode::SOFTWARE);
        }
    }
}

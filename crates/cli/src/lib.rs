pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "zam",
    about = "ZAM market sizing operator CLI",
    long_about = "Prepare the ZAM database, inspect configuration, and run offline market estimates.",
    after_help = "Examples:\n  zam migrate\n  zam seed\n  zam config\n  zam estimate --input wizard.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the built-in reference data (industries, comparables, option lists)")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Run the deterministic estimator on a JSON wizard payload")]
    Estimate {
        #[arg(long, value_name = "FILE", help = "Path to wizard answers as JSON")]
        input: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Estimate { input } => commands::estimate::run(&input),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

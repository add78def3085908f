use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;
use vct_errors::ErrorHandler;

mod commands;
mod context;
mod output;

use commands::ask::run_ask;
use commands::chat::run_chat;
use commands::config::run_config;
use commands::suggestions::run_suggestions;

#[derive(Parser)]
#[command(name = "vct-composer")]
#[command(about = "Compose VALORANT esports rosters from natural-language requests", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging to stderr.
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    /// Team generation endpoint; overrides settings and VCT_COMPOSER_ENDPOINT.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Use the built-in sample roster instead of the remote service.
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive composer (default).
    Chat,
    /// Send one prompt and print the resulting roster.
    Ask(AskArgs),
    /// List the predefined prompts.
    Suggestions,
    Config {
        #[command(subcommand)]
        command: ConfigCmd,
    },
}

#[derive(Args)]
struct AskArgs {
    /// Request text, e.g. "Build a team with players from at least three different regions".
    #[arg(required = true, num_args = 1..)]
    prompt: Vec<String>,
}

#[derive(Subcommand, Clone, Copy)]
pub(crate) enum ConfigCmd {
    /// Print the merged configuration.
    Show,
    /// Write default project settings.
    Init,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", ErrorHandler::new().verbose(verbose).handle(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir()?;
    match cli.command {
        None | Some(Commands::Chat) => run_chat(&cwd, &cli).map(|_| ExitCode::SUCCESS),
        Some(Commands::Ask(ref args)) => run_ask(&cwd, &cli, &args.prompt.join(" ")),
        Some(Commands::Suggestions) => run_suggestions(cli.json).map(|_| ExitCode::SUCCESS),
        Some(Commands::Config { command }) => {
            run_config(&cwd, &cli, command).map(|_| ExitCode::SUCCESS)
        }
    }
}

pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use aliasync_core::config::{LogFormat, LoggingConfig};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "aliasync",
    about = "Reconcile Gmail send-as aliases with Workspace group membership",
    long_about = "Create and remove send-as aliases so a mailbox can send as exactly the \
                  groups its owner belongs to.",
    after_help = "Examples:
  aliasync sync jwest@utahmmc.com --dry-run
  aliasync catalog --json
  aliasync users --max 20
  aliasync doctor
  aliasync ask \"add ava to marketing@utahmmc.com as manager\" --plan-only"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Path to aliasync.toml (defaults to ./aliasync.toml or ./config/aliasync.toml)"
    )]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Reconcile send-as aliases for one mailbox against group membership")]
    Sync {
        principal: String,
        #[arg(long, help = "Alias catalog TOML file (defaults to the built-in brand catalog)")]
        catalog: Option<PathBuf>,
        #[arg(long, help = "Compute decisions without creating or deleting aliases")]
        dry_run: bool,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print the effective alias catalog")]
    Catalog {
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "List Workspace users of the configured customer")]
    Users {
        #[arg(long = "max", default_value_t = 10, help = "Number of users to list (1-500)")]
        max: u32,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Validate config, Google token sources, and the alias catalog")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Turn a natural-language admin request into a Workspace action")]
    Ask {
        text: String,
        #[arg(long, help = "Show the validated command without calling Google")]
        plan_only: bool,
        #[arg(long, help = "Permit OWNER role grants")]
        allow_owner: bool,
        #[arg(long = "domain", help = "Restrict group changes to this domain (repeatable)")]
        domains: Vec<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config;

    let result = match cli.command {
        Command::Sync { principal, catalog, dry_run, json } => {
            commands::sync::run(commands::sync::SyncArgs {
                config_path,
                principal,
                catalog,
                dry_run,
                json,
            })
        }
        Command::Catalog { catalog, json } => commands::catalog::run(config_path, catalog, json),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(config_path) }
        }
        Command::Users { max, json } => commands::users::run(commands::users::UsersArgs {
            config_path,
            max_results: max,
            json,
        }),
        Command::Doctor { json } => commands::doctor::run(config_path, json),
        Command::Ask { text, plan_only, allow_owner, domains, json } => {
            commands::ask::run(commands::ask::AskArgs {
                config_path,
                text,
                plan_only,
                allow_owner,
                domains,
                json,
            })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Installs the stderr subscriber once; later calls are no-ops so stdout
/// carries only command output.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    let _ = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

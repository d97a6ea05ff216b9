use std::path::PathBuf;

use aliasync_core::ProviderError;
use aliasync_google::{GoogleProviders, GoogleWorkspaceAdmin, WorkspaceUser};
use serde::Serialize;
use tracing::info;

use super::{load_config, to_json, CommandResult, EXIT_CONFIG, EXIT_FAILURES, EXIT_OK};

const COMMAND: &str = "users";
/// Directory API page size ceiling for `users.list`.
pub const MAX_USERS: u32 = 500;

#[derive(Debug, Clone)]
pub struct UsersArgs {
    pub config_path: Option<PathBuf>,
    pub max_results: u32,
    pub json: bool,
}

impl Default for UsersArgs {
    fn default() -> Self {
        Self { config_path: None, max_results: 10, json: false }
    }
}

#[derive(Debug, Serialize)]
struct UserListing<'a> {
    count: usize,
    users: &'a [WorkspaceUser],
}

pub fn run(args: UsersArgs) -> CommandResult {
    if !(1..=MAX_USERS).contains(&args.max_results) {
        return CommandResult::failure(
            COMMAND,
            "config_validation",
            format!("--max must be between 1 and {MAX_USERS}"),
            EXIT_CONFIG,
        );
    }

    let config = match load_config(args.config_path.clone(), None) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };
    crate::init_logging(&config.logging);

    let providers = match GoogleProviders::from_config(&config.google) {
        Ok(providers) => providers,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_FAILURES,
            );
        }
    };

    runtime.block_on(list_with(&providers.admin(), &args))
}

/// Lists directory users through `admin` and renders them.
pub async fn list_with(admin: &GoogleWorkspaceAdmin, args: &UsersArgs) -> CommandResult {
    match admin.list_users(args.max_results).await {
        Ok(users) => {
            info!(event_name = "cli.users.listed", count = users.len(), "listed directory users");
            render(&users, args.json)
        }
        Err(error) => provider_failure(&error),
    }
}

fn render(users: &[WorkspaceUser], json: bool) -> CommandResult {
    let output = if json {
        match to_json(COMMAND, &UserListing { count: users.len(), users }) {
            Ok(output) => output,
            Err(failure) => return failure,
        }
    } else if users.is_empty() {
        "no users found".to_string()
    } else {
        users.iter().map(render_line).collect::<Vec<_>>().join("\n")
    };
    CommandResult { exit_code: EXIT_OK, output }
}

fn render_line(user: &WorkspaceUser) -> String {
    let mut line = format!("- {}", user.primary_email);
    if let Some(name) = user.full_name() {
        line.push_str(&format!(" ({name})"));
    }
    if user.suspended {
        line.push_str(" [suspended]");
    }
    line
}

fn provider_failure(error: &ProviderError) -> CommandResult {
    let class = match error {
        ProviderError::Unauthorized(_) => "unauthorized",
        _ => "provider",
    };
    CommandResult::failure(COMMAND, class, error.to_string(), EXIT_FAILURES)
}

use std::path::PathBuf;

use aliasync_agent::{
    AgentOutcome, AgentRuntime, GuardrailPolicy, MemberRole, OpenAiChatClient, WorkspaceActions,
};
use aliasync_core::{EmailAddress, Principal};
use aliasync_google::{GoogleProviders, GoogleWorkspaceAdmin};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::{load_config, to_json, CommandResult, EXIT_FAILURES, EXIT_OK};

const COMMAND: &str = "ask";

#[derive(Debug, Clone, Default)]
pub struct AskArgs {
    pub config_path: Option<PathBuf>,
    pub text: String,
    pub plan_only: bool,
    pub allow_owner: bool,
    pub domains: Vec<String>,
    pub json: bool,
}

struct GoogleActions(GoogleWorkspaceAdmin);

#[async_trait]
impl WorkspaceActions for GoogleActions {
    async fn create_group(
        &self,
        email: &EmailAddress,
        name: &str,
        description: &str,
    ) -> Result<Value> {
        Ok(serde_json::to_value(self.0.create_group(email, name, description).await?)?)
    }

    async fn add_member(
        &self,
        group: &EmailAddress,
        member: &EmailAddress,
        role: MemberRole,
    ) -> Result<Value> {
        Ok(serde_json::to_value(self.0.add_member(group, member, role.as_str()).await?)?)
    }

    async fn create_filter(
        &self,
        user: &Principal,
        from: &EmailAddress,
        label: &str,
    ) -> Result<Value> {
        Ok(serde_json::to_value(self.0.create_filter_from_address(user, from, label).await?)?)
    }
}

pub fn run(args: AskArgs) -> CommandResult {
    let config = match load_config(args.config_path.clone(), None) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };
    crate::init_logging(&config.logging);

    let llm = match OpenAiChatClient::from_config(&config.llm) {
        Ok(llm) => llm,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("{error:#}"),
                super::EXIT_CONFIG,
            );
        }
    };

    let actions = if args.plan_only {
        None
    } else {
        match GoogleProviders::from_config(&config.google) {
            Ok(providers) => Some(GoogleActions(providers.admin())),
            Err(error) => return CommandResult::config_failure(COMMAND, &error),
        }
    };

    let policy = GuardrailPolicy::default()
        .with_owner_grants(args.allow_owner)
        .with_managed_domains(&args.domains);
    let runtime = AgentRuntime::new(llm, policy);

    let tokio_runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
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

    let outcome = tokio_runtime.block_on(
        runtime.handle_request(&args.text, actions.as_ref().map(|a| a as &dyn WorkspaceActions)),
    );

    match outcome {
        Ok(outcome) => render(&outcome, args.json),
        Err(error) => CommandResult::failure(COMMAND, "agent", format!("{error:#}"), EXIT_FAILURES),
    }
}

fn render(outcome: &AgentOutcome, json: bool) -> CommandResult {
    let exit_code = match outcome {
        AgentOutcome::Denied { .. } => EXIT_FAILURES,
        AgentOutcome::Planned { .. } | AgentOutcome::Executed { .. } => EXIT_OK,
    };

    if json {
        return match to_json(COMMAND, outcome) {
            Ok(output) => CommandResult { exit_code, output },
            Err(failure) => failure,
        };
    }

    let output = match outcome {
        AgentOutcome::Planned { plan, command } => {
            format!("planned `{}` (not executed):\n{plan:#}", command.action_key())
        }
        AgentOutcome::Denied { command, reason_code, user_message, fallback_path } => format!(
            "refused `{}` ({reason_code}): {user_message}\nnext step: {fallback_path}",
            command.action_key()
        ),
        AgentOutcome::Executed { command, result } => {
            format!("done `{}`:\n{result:#}", command.action_key())
        }
    };
    CommandResult { exit_code, output }
}

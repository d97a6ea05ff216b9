use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::commands::{CommandError, WorkspaceCommand};
use crate::llm::LlmClient;

pub const SYSTEM_PROMPT: &str = r#"You convert natural-language admin requests into JSON commands
for Google Workspace automation.

You MUST respond with ONLY valid JSON, no extra text.

Supported actions:

1) create_group
   params: {
     "email": string,          // group email, e.g. "marketing@example.com"
     "name": string,           // display name, e.g. "Marketing Team"
     "description": string     // optional; can be empty ""
   }

2) add_member_to_group
   params: {
     "group_email": string,    // group address
     "member_email": string,   // user address
     "role": "MEMBER" | "MANAGER" | "OWNER"
   }

3) create_filter_from_address
   params: {
     "user_email": string,     // mailbox to modify
     "from_address": string,   // match this From address
     "label_name": string      // label to apply (created if missing)
   }

Return format:
{
  "action": "<one of the above>",
  "params": { ... }
}
"#;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("request text is empty")]
    EmptyRequest,
    #[error("language model call failed: {0}")]
    Llm(anyhow::Error),
    #[error("language model reply is not JSON: {0}")]
    InvalidJson(String),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// The model's raw plan next to the command it validated into.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedCommand {
    pub raw: Value,
    pub command: WorkspaceCommand,
}

pub struct CommandPlanner<L> {
    llm: L,
}

impl<L> CommandPlanner<L>
where
    L: LlmClient,
{
    pub fn new(llm: L) -> Self {
        Self { llm }
    }

    pub async fn plan(&self, text: &str) -> Result<PlannedCommand, PlanError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PlanError::EmptyRequest);
        }

        let reply = self.llm.complete(SYSTEM_PROMPT, text).await.map_err(PlanError::Llm)?;
        let raw: Value = serde_json::from_str(strip_code_fence(&reply))
            .map_err(|error| PlanError::InvalidJson(error.to_string()))?;
        let command = WorkspaceCommand::from_plan(&raw)?;

        info!(
            event_name = "agent.command_planned",
            action = command.action_key(),
            "planned workspace command"
        );
        Ok(PlannedCommand { raw, command })
    }
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|inner| inner.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::{CommandPlanner, PlanError, SYSTEM_PROMPT};
    use crate::commands::{CommandError, WorkspaceCommand};
    use crate::llm::LlmClient;

    struct ScriptedLlm {
        reply: Result<String, String>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedLlm {
        fn replying(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), prompts: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, system: &str, user: &str) -> Result<String> {
            self.prompts.lock().expect("prompts").push((system.to_string(), user.to_string()));
            self.reply.clone().map_err(|message| anyhow!(message))
        }
    }

    #[tokio::test]
    async fn plan_sends_system_prompt_and_validates_reply() {
        let llm = ScriptedLlm::replying(
            r#"{
                "action": "create_group",
                "params": {"email": "marketing@utahmmc.com", "name": "Marketing Team"}
            }"#,
        );
        let planner = CommandPlanner::new(llm);

        let planned = planner.plan("  make a marketing group  ").await.expect("plan");
        assert!(matches!(planned.command, WorkspaceCommand::CreateGroup { .. }));
        assert_eq!(planned.raw["params"]["name"], "Marketing Team");

        let prompts = planner.llm.prompts.lock().expect("prompts");
        assert_eq!(prompts[0].0, SYSTEM_PROMPT);
        assert_eq!(prompts[0].1, "make a marketing group");
    }

    #[tokio::test]
    async fn fenced_reply_is_accepted() {
        let planner = CommandPlanner::new(ScriptedLlm::replying(
            "```json\n{\"action\": \"add_member_to_group\", \
             \"params\": {\"group_email\": \"ops@x.com\", \"member_email\": \"a@x.com\"}}\n```",
        ));
        let planned = planner.plan("add a to ops").await.expect("plan");
        assert_eq!(planned.command.action_key(), "add_member_to_group");
    }

    #[tokio::test]
    async fn unusable_replies_become_typed_errors() {
        let empty = CommandPlanner::new(ScriptedLlm::replying("{}")).plan("   ").await;
        assert!(matches!(empty, Err(PlanError::EmptyRequest)));

        let prose =
            CommandPlanner::new(ScriptedLlm::replying("Sure! Creating that now.")).plan("x").await;
        assert!(matches!(prose, Err(PlanError::InvalidJson(_))));

        let unknown = CommandPlanner::new(ScriptedLlm::replying(
            r#"{"action": "delete_user", "params": {}}"#,
        ))
        .plan("remove bob")
        .await;
        assert!(matches!(unknown, Err(PlanError::Command(CommandError::UnknownAction(_)))));

        let failing = CommandPlanner::new(ScriptedLlm {
            reply: Err("rate limited".to_string()),
            prompts: Default::default(),
        })
        .plan("x")
        .await;
        match failing {
            Err(PlanError::Llm(error)) => assert!(error.to_string().contains("rate limited")),
            other => panic!("expected llm error, got {other:?}"),
        }
    }
}

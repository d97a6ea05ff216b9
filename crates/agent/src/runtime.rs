use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::commands::WorkspaceCommand;
use crate::guardrails::{GuardrailDecision, GuardrailPolicy};
use crate::llm::LlmClient;
use crate::planner::CommandPlanner;
use crate::tools::{dispatch, WorkspaceActions};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentOutcome {
    Planned { plan: Value, command: WorkspaceCommand },
    Denied {
        command: WorkspaceCommand,
        reason_code: &'static str,
        user_message: String,
        fallback_path: &'static str,
    },
    Executed { command: WorkspaceCommand, result: Value },
}

pub struct AgentRuntime<L> {
    planner: CommandPlanner<L>,
    guardrails: GuardrailPolicy,
}

impl<L> AgentRuntime<L>
where
    L: LlmClient,
{
    pub fn new(llm: L, guardrails: GuardrailPolicy) -> Self {
        Self { planner: CommandPlanner::new(llm), guardrails }
    }

    /// Plans `text`, checks guardrails, and dispatches unless `actions` is
    /// `None` (plan-only).
    pub async fn handle_request(
        &self,
        text: &str,
        actions: Option<&dyn WorkspaceActions>,
    ) -> Result<AgentOutcome> {
        let planned = self.planner.plan(text).await?;

        if let GuardrailDecision::Deny { reason_code, user_message, fallback_path } =
            self.guardrails.evaluate(&planned.command)
        {
            warn!(
                event_name = "agent.command_denied",
                action = planned.command.action_key(),
                reason_code,
                "guardrail denied workspace command"
            );
            return Ok(AgentOutcome::Denied {
                command: planned.command,
                reason_code,
                user_message,
                fallback_path,
            });
        }

        match actions {
            None => Ok(AgentOutcome::Planned { plan: planned.raw, command: planned.command }),
            Some(actions) => {
                let result = dispatch(&planned.command, actions).await?;
                Ok(AgentOutcome::Executed { command: planned.command, result })
            }
        }
    }
}

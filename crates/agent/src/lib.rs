//! Natural-language front end for Workspace admin actions.
//!
//! The agent follows a constrained loop:
//! 1. **Planning** (`planner`) - ask the LLM to turn a request into `{action, params}` JSON
//! 2. **Validation** (`commands`) - parse that JSON into a typed `WorkspaceCommand`
//! 3. **Guardrails** (`guardrails`) - deny risky commands such as OWNER grants
//! 4. **Dispatch** (`tools`) - call exactly one provider action
//!
//! The LLM is strictly a translator. It never touches send-as alias state;
//! reconciliation lives in `aliasync-core`.

pub mod commands;
pub mod guardrails;
pub mod llm;
pub mod planner;
pub mod runtime;
pub mod tools;

pub use commands::{CommandError, MemberRole, WorkspaceCommand};
pub use guardrails::{GuardrailDecision, GuardrailPolicy};
pub use llm::{LlmClient, OpenAiChatClient};
pub use planner::{CommandPlanner, PlanError, PlannedCommand};
pub use runtime::{AgentOutcome, AgentRuntime};
pub use tools::{dispatch, WorkspaceActions};

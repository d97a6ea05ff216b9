use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use aliasync_core::{EmailAddress, Principal};

use crate::commands::{MemberRole, WorkspaceCommand};

/// The closed set of provider actions a planned command may reach.
#[async_trait]
pub trait WorkspaceActions: Send + Sync {
    async fn create_group(&self, email: &EmailAddress, name: &str, description: &str)
        -> Result<Value>;

    async fn add_member(
        &self,
        group: &EmailAddress,
        member: &EmailAddress,
        role: MemberRole,
    ) -> Result<Value>;

    async fn create_filter(&self, user: &Principal, from: &EmailAddress, label: &str)
        -> Result<Value>;
}

/// Runs exactly one provider action for `command` and returns its JSON result.
pub async fn dispatch(command: &WorkspaceCommand, actions: &dyn WorkspaceActions) -> Result<Value> {
    let result = match command {
        WorkspaceCommand::CreateGroup { email, name, description } => {
            actions.create_group(email, name, description).await?
        }
        WorkspaceCommand::AddMember { group, member, role } => {
            actions.add_member(group, member, *role).await?
        }
        WorkspaceCommand::CreateFilter { user, from, label } => {
            actions.create_filter(user, from, label).await?
        }
    };
    info!(
        event_name = "agent.command_dispatched",
        action = command.action_key(),
        "workspace action completed"
    );
    Ok(result)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use aliasync_core::{EmailAddress, Principal};

    use super::WorkspaceActions;
    use crate::commands::MemberRole;

    #[derive(Default)]
    pub struct RecordingActions {
        pub calls: Mutex<Vec<String>>,
        pub fail: bool,
    }

    impl RecordingActions {
        fn record(&self, call: String) -> Result<()> {
            self.calls.lock().expect("calls").push(call);
            if self.fail {
                bail!("provider unavailable");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl WorkspaceActions for RecordingActions {
        async fn create_group(
            &self,
            email: &EmailAddress,
            name: &str,
            _description: &str,
        ) -> Result<Value> {
            self.record(format!("create_group {email} {name}"))?;
            Ok(json!({ "email": email.as_str(), "name": name }))
        }

        async fn add_member(
            &self,
            group: &EmailAddress,
            member: &EmailAddress,
            role: MemberRole,
        ) -> Result<Value> {
            self.record(format!("add_member {group} {member} {role}"))?;
            Ok(json!({ "email": member.as_str(), "role": role.as_str() }))
        }

        async fn create_filter(
            &self,
            user: &Principal,
            from: &EmailAddress,
            label: &str,
        ) -> Result<Value> {
            self.record(format!("create_filter {user} {from} {label}"))?;
            Ok(json!({ "criteria": { "from": from.as_str() } }))
        }
    }
}

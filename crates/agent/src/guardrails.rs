use std::collections::BTreeSet;

use serde::Serialize;

use crate::commands::{MemberRole, WorkspaceCommand};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub allow_owner_grants: bool,
    /// Domains groups may live in. Empty means any domain.
    pub managed_domains: BTreeSet<String>,
}

impl GuardrailPolicy {
    pub fn with_owner_grants(mut self, allowed: bool) -> Self {
        self.allow_owner_grants = allowed;
        self
    }

    pub fn with_managed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.managed_domains =
            domains.into_iter().map(|domain| domain.as_ref().trim().to_ascii_lowercase()).collect();
        self
    }

    pub fn evaluate(&self, command: &WorkspaceCommand) -> GuardrailDecision {
        match command {
            WorkspaceCommand::AddMember { role: MemberRole::Owner, .. }
                if !self.allow_owner_grants =>
            {
                GuardrailDecision::Deny {
                    reason_code: "owner_grant_disallowed",
                    user_message: "Granting OWNER on a group needs explicit approval. \
                                   Re-run with owner grants allowed or ask for MANAGER."
                        .to_string(),
                    fallback_path: "request_manager_role",
                }
            }
            WorkspaceCommand::CreateGroup { email, .. }
            | WorkspaceCommand::AddMember { group: email, .. }
                if !self.is_managed(email.domain()) =>
            {
                GuardrailDecision::Deny {
                    reason_code: "unmanaged_domain",
                    user_message: format!(
                        "`{}` is outside the managed domains; groups can only be changed in {}.",
                        email,
                        self.managed_domains.iter().cloned().collect::<Vec<_>>().join(", ")
                    ),
                    fallback_path: "use_managed_domain",
                }
            }
            _ => GuardrailDecision::Allow,
        }
    }

    fn is_managed(&self, domain: &str) -> bool {
        self.managed_domains.is_empty() || self.managed_domains.contains(domain)
    }
}

use std::fmt;
use std::str::FromStr;

use aliasync_core::{EmailAddress, Principal};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("plan is not a JSON object with `action` and `params`: {0}")]
    Malformed(String),
    #[error("unsupported action `{0}`")]
    UnknownAction(String),
    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Member,
    Manager,
    Owner,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "MEMBER",
            Self::Manager => "MANAGER",
            Self::Owner => "OWNER",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = CommandError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MEMBER" => Ok(Self::Member),
            "MANAGER" => Ok(Self::Manager),
            "OWNER" => Ok(Self::Owner),
            other => Err(CommandError::InvalidField {
                field: "role",
                reason: format!("`{other}` is not one of MEMBER, MANAGER, OWNER"),
            }),
        }
    }
}

/// A validated workspace admin action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WorkspaceCommand {
    CreateGroup { email: EmailAddress, name: String, description: String },
    AddMember { group: EmailAddress, member: EmailAddress, role: MemberRole },
    CreateFilter { user: Principal, from: EmailAddress, label: String },
}

impl WorkspaceCommand {
    pub fn action_key(&self) -> &'static str {
        match self {
            Self::CreateGroup { .. } => "create_group",
            Self::AddMember { .. } => "add_member_to_group",
            Self::CreateFilter { .. } => "create_filter_from_address",
        }
    }

    /// Validates a `{"action": ..., "params": {...}}` plan.
    pub fn from_plan(plan: &Value) -> Result<Self, CommandError> {
        let envelope = PlanEnvelope::deserialize(plan)
            .map_err(|error| CommandError::Malformed(error.to_string()))?;

        match envelope.action.trim() {
            "create_group" => {
                let params: CreateGroupParams = params(envelope.params)?;
                Ok(Self::CreateGroup {
                    email: email("email", &params.email)?,
                    name: non_empty("name", params.name)?,
                    description: params.description.trim().to_string(),
                })
            }
            "add_member_to_group" => {
                let params: AddMemberParams = params(envelope.params)?;
                let role = match params.role.as_deref() {
                    Some(role) => role.parse()?,
                    None => MemberRole::Member,
                };
                Ok(Self::AddMember {
                    group: email("group_email", &params.group_email)?,
                    member: email("member_email", &params.member_email)?,
                    role,
                })
            }
            "create_filter_from_address" => {
                let params: CreateFilterParams = params(envelope.params)?;
                let user = Principal::new(&params.user_email).map_err(|error| {
                    CommandError::InvalidField { field: "user_email", reason: error.to_string() }
                })?;
                email("user_email", user.as_str())?;
                Ok(Self::CreateFilter {
                    user,
                    from: email("from_address", &params.from_address)?,
                    label: non_empty("label_name", params.label_name)?,
                })
            }
            other => Err(CommandError::UnknownAction(other.to_string())),
        }
    }
}

#[derive(Deserialize)]
struct PlanEnvelope {
    action: String,
    #[serde(default)]
    params: Value,
}

#[derive(Deserialize)]
struct CreateGroupParams {
    email: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct AddMemberParams {
    group_email: String,
    member_email: String,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Deserialize)]
struct CreateFilterParams {
    user_email: String,
    from_address: String,
    label_name: String,
}

fn params<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, CommandError> {
    serde_json::from_value(value).map_err(|error| CommandError::Malformed(error.to_string()))
}

fn email(field: &'static str, raw: &str) -> Result<EmailAddress, CommandError> {
    EmailAddress::parse(raw)
        .map_err(|error| CommandError::InvalidField { field, reason: error.to_string() })
}

fn non_empty(field: &'static str, value: String) -> Result<String, CommandError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CommandError::InvalidField { field, reason: "must not be empty".to_string() });
    }
    Ok(trimmed.to_string())
}

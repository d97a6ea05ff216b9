//! Workspace admin actions used by the natural-language front end: groups,
//! group members, Gmail labels and filters, and user listing.

use std::sync::Arc;

use aliasync_core::{EmailAddress, Principal, ProviderError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{endpoint, GoogleHttp};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    #[serde(default)]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserName {
    #[serde(default)]
    pub full_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceUser {
    #[serde(default)]
    pub id: String,
    pub primary_email: String,
    #[serde(default)]
    pub name: Option<UserName>,
    #[serde(default)]
    pub suspended: bool,
}

impl WorkspaceUser {
    pub fn full_name(&self) -> Option<&str> {
        self.name.as_ref().map(|name| name.full_name.as_str()).filter(|name| !name.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub from: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterAction {
    #[serde(default)]
    pub add_label_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmailFilter {
    #[serde(default)]
    pub id: String,
    pub criteria: FilterCriteria,
    pub action: FilterAction,
}

#[derive(Deserialize)]
struct UsersPage {
    #[serde(default)]
    users: Vec<WorkspaceUser>,
}

#[derive(Deserialize)]
struct LabelsPage {
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewLabel<'a> {
    name: &'a str,
    label_list_visibility: &'static str,
    message_list_visibility: &'static str,
}

#[derive(Serialize)]
struct NewFilter<'a> {
    criteria: FilterCriteriaRef<'a>,
    action: FilterActionRef<'a>,
}

#[derive(Serialize)]
struct FilterCriteriaRef<'a> {
    from: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FilterActionRef<'a> {
    add_label_ids: [&'a str; 1],
}

pub struct GoogleWorkspaceAdmin {
    http: Arc<GoogleHttp>,
    gmail_http: Arc<GoogleHttp>,
    directory_base_url: String,
    gmail_base_url: String,
    customer: String,
}

impl GoogleWorkspaceAdmin {
    pub fn new(
        http: Arc<GoogleHttp>,
        gmail_http: Arc<GoogleHttp>,
        directory_base_url: impl Into<String>,
        gmail_base_url: impl Into<String>,
        customer: impl Into<String>,
    ) -> Self {
        Self {
            http,
            gmail_http,
            directory_base_url: directory_base_url.into(),
            gmail_base_url: gmail_base_url.into(),
            customer: customer.into(),
        }
    }

    fn directory_url(&self, segments: &[&str]) -> Result<reqwest::Url, ProviderError> {
        let mut path = vec!["admin", "directory", "v1"];
        path.extend_from_slice(segments);
        endpoint(&self.directory_base_url, &path)
    }

    fn gmail_url(
        &self,
        user: &Principal,
        segments: &[&str],
    ) -> Result<reqwest::Url, ProviderError> {
        let mut path = vec!["gmail", "v1", "users", user.as_str()];
        path.extend_from_slice(segments);
        endpoint(&self.gmail_base_url, &path)
    }

    /// First `max_results` users of the configured customer, ordered by email.
    pub async fn list_users(&self, max_results: u32) -> Result<Vec<WorkspaceUser>, ProviderError> {
        let mut url = self.directory_url(&["users"])?;
        url.query_pairs_mut()
            .append_pair("customer", &self.customer)
            .append_pair("maxResults", &max_results.to_string())
            .append_pair("orderBy", "email");
        let page: UsersPage = self.http.get_json(url).await?;
        Ok(page.users)
    }

    pub async fn create_group(
        &self,
        email: &EmailAddress,
        name: &str,
        description: &str,
    ) -> Result<Group, ProviderError> {
        let body = serde_json::json!({
            "email": email.as_str(),
            "name": name,
            "description": description,
        });
        let group: Group = self.http.post_json(self.directory_url(&["groups"])?, &body).await?;
        info!(event_name = "workspace.group_created", group = %email, "created group");
        Ok(group)
    }

    pub async fn add_member(
        &self,
        group: &EmailAddress,
        member: &EmailAddress,
        role: &str,
    ) -> Result<GroupMember, ProviderError> {
        let body = serde_json::json!({ "email": member.as_str(), "role": role });
        let url = self.directory_url(&["groups", group.as_str(), "members"])?;
        let added: GroupMember = self.http.post_json(url, &body).await?;
        info!(
            event_name = "workspace.member_added",
            group = %group,
            member = %member,
            role,
            "added group member"
        );
        Ok(added)
    }

    pub async fn list_labels(&self, user: &Principal) -> Result<Vec<Label>, ProviderError> {
        let page: LabelsPage = self.gmail_http.get_json(self.gmail_url(user, &["labels"])?).await?;
        Ok(page.labels)
    }

    pub async fn create_label(&self, user: &Principal, name: &str) -> Result<Label, ProviderError> {
        let body = NewLabel {
            name,
            label_list_visibility: "labelShow",
            message_list_visibility: "show",
        };
        self.gmail_http.post_json(self.gmail_url(user, &["labels"])?, &body).await
    }

    /// Finds a label by name, ignoring case, creating it when absent.
    pub async fn ensure_label(&self, user: &Principal, name: &str) -> Result<Label, ProviderError> {
        let existing = self.list_labels(user).await?;
        if let Some(label) =
            existing.into_iter().find(|label| label.name.eq_ignore_ascii_case(name))
        {
            return Ok(label);
        }
        self.create_label(user, name).await
    }

    /// Labels every message from `from` with `label_name`.
    pub async fn create_filter_from_address(
        &self,
        user: &Principal,
        from: &EmailAddress,
        label_name: &str,
    ) -> Result<GmailFilter, ProviderError> {
        let label = self.ensure_label(user, label_name).await?;
        let body = NewFilter {
            criteria: FilterCriteriaRef { from: from.as_str() },
            action: FilterActionRef { add_label_ids: [label.id.as_str()] },
        };
        let url = self.gmail_url(user, &["settings", "filters"])?;
        let filter: GmailFilter = self.gmail_http.post_json(url, &body).await?;
        info!(
            event_name = "workspace.filter_created",
            principal = %user,
            from = %from,
            label = %label.name,
            "created gmail filter"
        );
        Ok(filter)
    }
}

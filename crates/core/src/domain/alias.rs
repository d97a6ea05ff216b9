use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::address::EmailAddress;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasCandidate {
    pub address: EmailAddress,
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Accepted,
    Pending,
    Unknown(String),
}

impl VerificationStatus {
    pub fn from_provider(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(raw) if raw.eq_ignore_ascii_case("accepted") => Self::Accepted,
            Some(raw) if raw.eq_ignore_ascii_case("pending") => Self::Pending,
            Some(raw) => Self::Unknown(raw.to_string()),
            None => Self::Unknown(String::new()),
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("accepted"),
            Self::Pending => f.write_str("pending"),
            Self::Unknown(raw) if raw.is_empty() => f.write_str("unknown"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// A send-as identity as the mailbox provider reported it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasBinding {
    pub address: EmailAddress,
    pub display_name: String,
    pub verification_status: VerificationStatus,
    pub is_primary: bool,
    pub treat_as_alias: bool,
}

impl AliasBinding {
    pub fn new(
        address: EmailAddress,
        display_name: impl Into<String>,
        verification_status: VerificationStatus,
    ) -> Self {
        Self {
            address,
            display_name: display_name.into(),
            verification_status,
            is_primary: false,
            treat_as_alias: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::VerificationStatus;

    #[test]
    fn provider_status_strings_map_case_insensitively() {
        assert_eq!(
            VerificationStatus::from_provider(Some("accepted")),
            VerificationStatus::Accepted
        );
        assert_eq!(VerificationStatus::from_provider(Some("Pending")), VerificationStatus::Pending);
        assert_eq!(
            VerificationStatus::from_provider(Some("verificationStatusUnspecified")),
            VerificationStatus::Unknown("verificationStatusUnspecified".to_string())
        );
        assert_eq!(VerificationStatus::from_provider(None).to_string(), "unknown");
    }
}

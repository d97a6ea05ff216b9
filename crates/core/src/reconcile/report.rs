use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::address::EmailAddress;
use crate::domain::alias::VerificationStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Create,
    Delete,
    Keep,
    Skip,
}

impl Decision {
    /// Membership is the desired state; alias existence is the actual one.
    pub fn decide(is_member: bool, has_alias: bool) -> Self {
        match (is_member, has_alias) {
            (true, false) => Self::Create,
            (true, true) => Self::Keep,
            (false, true) => Self::Delete,
            (false, false) => Self::Skip,
        }
    }

    pub fn is_mutation(self) -> bool {
        matches!(self, Self::Create | Self::Delete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Keep => "keep",
            Self::Skip => "skip",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Failed { reason: String },
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedDecision {
    pub address: EmailAddress,
    pub display_name: String,
    pub is_member: bool,
    pub has_alias: bool,
    pub decision: Decision,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePlan {
    pub principal: String,
    pub baseline: Vec<EmailAddress>,
    pub decisions: Vec<PlannedDecision>,
}

impl ReconcilePlan {
    pub fn counts(&self) -> DecisionCounts {
        DecisionCounts::tally(self.decisions.iter().map(|planned| planned.decision))
    }

    pub fn mutations(&self) -> impl Iterator<Item = &PlannedDecision> {
        self.decisions.iter().filter(|planned| planned.decision.is_mutation())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub address: EmailAddress,
    pub display_name: String,
    pub is_member: bool,
    pub had_alias: bool,
    pub decision: Decision,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<VerificationStatus>,
}

/// Post-run alias list. Advisory: it never feeds back into decisions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FinalSnapshot {
    Observed { aliases: Vec<EmailAddress> },
    Unavailable { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub run_id: String,
    pub principal: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub baseline: Vec<EmailAddress>,
    pub candidates: Vec<CandidateReport>,
    pub final_snapshot: FinalSnapshot,
}

impl ReconcileReport {
    pub fn is_success(&self) -> bool {
        self.candidates.iter().all(|candidate| candidate.outcome.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &CandidateReport> {
        self.candidates.iter().filter(|candidate| !candidate.outcome.is_ok())
    }

    pub fn mutations(&self) -> impl Iterator<Item = &CandidateReport> {
        self.candidates.iter().filter(|candidate| candidate.decision.is_mutation())
    }

    pub fn counts(&self) -> DecisionCounts {
        DecisionCounts::tally(self.candidates.iter().map(|candidate| candidate.decision))
    }

    pub fn decision_for(&self, address: &EmailAddress) -> Option<Decision> {
        self.candidates
            .iter()
            .find(|candidate| &candidate.address == address)
            .map(|candidate| candidate.decision)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCounts {
    pub create: usize,
    pub delete: usize,
    pub keep: usize,
    pub skip: usize,
}

impl DecisionCounts {
    fn tally(decisions: impl Iterator<Item = Decision>) -> Self {
        decisions.fold(Self::default(), |mut counts, decision| {
            match decision {
                Decision::Create => counts.create += 1,
                Decision::Delete => counts.delete += 1,
                Decision::Keep => counts.keep += 1,
                Decision::Skip => counts.skip += 1,
            }
            counts
        })
    }

    pub fn mutations(&self) -> usize {
        self.create + self.delete
    }
}

//! Alias reconciliation: make a mailbox's send-as aliases match the groups
//! its owner belongs to.
//!
//! A run moves through `INIT -> SNAPSHOT -> EVALUATE -> REPORT`:
//!
//! 1. **INIT** validates the principal and the catalog.
//! 2. **SNAPSHOT** lists the mailbox's aliases exactly once.
//! 3. **EVALUATE** asks the membership oracle about every candidate in
//!    catalog order and applies [`Decision::decide`].
//! 4. **REPORT** records one outcome per candidate and re-reads the alias list
//!    for observability only.
//!
//! Provider mutations that fail are recorded and the run moves on; only INIT
//! and SNAPSHOT failures abort.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::catalog::AliasCatalog;
use crate::domain::address::{EmailAddress, Principal};
use crate::domain::alias::AliasCandidate;
use crate::errors::{
    AliasOperation, AliasOperationError, ProviderError, ReconcileError, SnapshotError,
};
use crate::providers::{AliasStore, MembershipOracle};

pub mod report;

pub use report::{
    CandidateReport, Decision, DecisionCounts, FinalSnapshot, Outcome, PlannedDecision,
    ReconcilePlan, ReconcileReport,
};

const ACTOR: &str = "alias-reconciler";

pub struct AliasReconciler<O, S> {
    catalog: AliasCatalog,
    oracle: O,
    store: S,
    audit_sink: Option<Arc<dyn AuditSink>>,
}

struct Baseline {
    principal: Principal,
    addresses: HashSet<EmailAddress>,
    ordered: Vec<EmailAddress>,
}

impl<O, S> AliasReconciler<O, S>
where
    O: MembershipOracle,
    S: AliasStore,
{
    pub fn new(catalog: AliasCatalog, oracle: O, store: S) -> Self {
        Self { catalog, oracle, store, audit_sink: None }
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn catalog(&self) -> &AliasCatalog {
        &self.catalog
    }

    /// Computes every decision without touching the alias store beyond the
    /// baseline snapshot.
    pub async fn plan(&self, principal: &str) -> Result<ReconcilePlan, ReconcileError> {
        let baseline = self.snapshot(principal).await?;
        let mut decisions = Vec::with_capacity(self.catalog.len());

        for candidate in self.catalog.candidates() {
            decisions.push(self.evaluate(candidate, &baseline).await);
        }

        Ok(ReconcilePlan {
            principal: baseline.principal.to_string(),
            baseline: baseline.ordered,
            decisions,
        })
    }

    pub async fn run(&self, principal: &str) -> Result<ReconcileReport, ReconcileError> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = chrono::Utc::now();
        let baseline = self.snapshot(principal).await?;
        let context = AuditContext::new(baseline.principal.as_str(), run_id.clone(), ACTOR);
        self.emit(
            AuditEvent::new(
                &context,
                "reconcile.snapshot",
                AuditCategory::Snapshot,
                AuditOutcome::Success,
            )
            .with_metadata("existing", baseline.ordered.len().to_string())
            .with_metadata("candidates", self.catalog.len().to_string()),
        );

        let mut candidates = Vec::with_capacity(self.catalog.len());
        for candidate in self.catalog.candidates() {
            let planned = self.evaluate(candidate, &baseline).await;
            let report = self.apply(&baseline.principal, planned).await;
            self.audit_decision(&context, &report);
            candidates.push(report);
        }

        let final_snapshot = match self.store.list(&baseline.principal).await {
            Ok(bindings) => {
                let mut aliases =
                    bindings.into_iter().map(|binding| binding.address).collect::<Vec<_>>();
                aliases.sort();
                FinalSnapshot::Observed { aliases }
            }
            Err(error) => {
                warn!(
                    event_name = "reconcile.final_snapshot_failed",
                    principal = %baseline.principal,
                    error = %error,
                    "could not re-read send-as aliases after reconciliation"
                );
                FinalSnapshot::Unavailable { reason: error.to_string() }
            }
        };

        let report = ReconcileReport {
            run_id,
            principal: baseline.principal.to_string(),
            started_at,
            finished_at: chrono::Utc::now(),
            baseline: baseline.ordered,
            candidates,
            final_snapshot,
        };

        let counts = report.counts();
        info!(
            event_name = "reconcile.completed",
            principal = %report.principal,
            run_id = %report.run_id,
            created = counts.create,
            deleted = counts.delete,
            kept = counts.keep,
            skipped = counts.skip,
            failed = report.failures().count(),
            "send-as reconciliation finished"
        );
        self.emit(
            AuditEvent::new(
                &context,
                "reconcile.completed",
                AuditCategory::System,
                if report.is_success() { AuditOutcome::Success } else { AuditOutcome::Failed },
            )
            .with_metadata("candidates", report.candidates.len().to_string()),
        );

        Ok(report)
    }

    async fn snapshot(&self, principal: &str) -> Result<Baseline, ReconcileError> {
        let principal = Principal::new(principal)?;
        self.catalog.validate()?;

        let bindings = self.store.list(&principal).await.map_err(|source| SnapshotError {
            principal: principal.to_string(),
            source,
        })?;

        let mut ordered = bindings.into_iter().map(|binding| binding.address).collect::<Vec<_>>();
        ordered.sort();
        ordered.dedup();
        let addresses = ordered.iter().cloned().collect::<HashSet<_>>();

        info!(
            event_name = "reconcile.snapshot",
            principal = %principal,
            existing = ordered.len(),
            candidates = self.catalog.len(),
            "captured send-as baseline"
        );

        Ok(Baseline { principal, addresses, ordered })
    }

    async fn evaluate(&self, candidate: &AliasCandidate, baseline: &Baseline) -> PlannedDecision {
        let is_member = self.oracle.is_member(&candidate.address, &baseline.principal).await;
        let has_alias = baseline.addresses.contains(&candidate.address);

        PlannedDecision {
            address: candidate.address.clone(),
            display_name: self.catalog.resolve(&candidate.address),
            is_member,
            has_alias,
            decision: Decision::decide(is_member, has_alias),
        }
    }

    async fn apply(&self, principal: &Principal, planned: PlannedDecision) -> CandidateReport {
        let failed = |operation: AliasOperation, source: ProviderError| {
            failure_outcome(operation, &planned.address, principal, source)
        };

        let (outcome, verification_status) = match planned.decision {
            Decision::Create => {
                let created =
                    self.store.create(principal, &planned.address, &planned.display_name).await;
                match created {
                    Ok(status) => (Outcome::Ok, Some(status)),
                    Err(source) => (failed(AliasOperation::Create, source), None),
                }
            }
            Decision::Delete => match self.store.delete(principal, &planned.address).await {
                Ok(()) => (Outcome::Ok, None),
                Err(source) => (failed(AliasOperation::Delete, source), None),
            },
            Decision::Keep | Decision::Skip => (Outcome::Ok, None),
        };

        if outcome.is_ok() {
            let status =
                verification_status.as_ref().map(ToString::to_string).unwrap_or_default();
            info!(
                event_name = "reconcile.decision",
                principal = %principal,
                address = %planned.address,
                decision = planned.decision.as_str(),
                is_member = planned.is_member,
                verification_status = %status,
                "alias decision applied"
            );
        }

        CandidateReport {
            address: planned.address,
            display_name: planned.display_name,
            is_member: planned.is_member,
            had_alias: planned.has_alias,
            decision: planned.decision,
            outcome,
            verification_status,
        }
    }

    fn audit_decision(&self, context: &AuditContext, report: &CandidateReport) {
        let outcome = match (&report.outcome, report.decision.is_mutation()) {
            (Outcome::Failed { .. }, _) => AuditOutcome::Failed,
            (Outcome::Ok, true) => AuditOutcome::Success,
            (Outcome::Ok, false) => AuditOutcome::Skipped,
        };
        let mut event = AuditEvent::new(
            context,
            format!("alias.{}", report.decision.as_str()),
            AuditCategory::Alias,
            outcome,
        )
        .with_metadata("address", report.address.as_str())
        .with_metadata("is_member", report.is_member.to_string());
        if let Some(status) = &report.verification_status {
            event = event.with_metadata("verification_status", status.to_string());
        }
        if let Outcome::Failed { reason } = &report.outcome {
            event = event.with_metadata("reason", reason.clone());
        }
        self.emit(event);
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(sink) = &self.audit_sink {
            sink.emit(event);
        }
    }
}

fn failure_outcome(
    operation: AliasOperation,
    address: &EmailAddress,
    principal: &Principal,
    source: ProviderError,
) -> Outcome {
    let error = AliasOperationError { operation, address: address.clone(), source };
    warn!(
        event_name = "reconcile.alias_operation_failed",
        principal = %principal,
        address = %address,
        operation = operation.as_str(),
        error = %error,
        "alias operation failed; continuing with remaining candidates"
    );
    Outcome::Failed { reason: error.to_string() }
}

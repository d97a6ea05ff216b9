pub mod audit;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod providers;
pub mod reconcile;

pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
    TracingAuditSink,
};
pub use catalog::{AliasCatalog, BrandSpec, CatalogSpec};
pub use domain::address::{EmailAddress, Principal};
pub use domain::alias::{AliasBinding, AliasCandidate, VerificationStatus};
pub use errors::{
    AliasOperation, AliasOperationError, ConfigError, MembershipQueryError, ProviderError,
    ReconcileError, SnapshotError,
};
pub use providers::{
    AliasStore, ConservativeMembershipOracle, DirectoryClient, InMemoryAliasStore,
    InMemoryDirectory, MembershipOracle,
};
pub use reconcile::{
    AliasReconciler, CandidateReport, Decision, DecisionCounts, FinalSnapshot, Outcome,
    PlannedDecision, ReconcilePlan, ReconcileReport,
};

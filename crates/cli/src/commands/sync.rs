use std::path::PathBuf;
use std::sync::Arc;

use aliasync_core::{
    AliasCatalog, AliasReconciler, AliasStore, FinalSnapshot, MembershipOracle, Outcome,
    ReconcileError, ReconcilePlan, ReconcileReport, TracingAuditSink,
};
use aliasync_google::GoogleProviders;
use tracing::info;

use super::{
    load_config, resolve_catalog, to_json, CommandResult, EXIT_CONFIG, EXIT_FAILURES, EXIT_OK,
    EXIT_SNAPSHOT,
};

const COMMAND: &str = "sync";

#[derive(Debug, Clone, Default)]
pub struct SyncArgs {
    pub config_path: Option<PathBuf>,
    pub principal: String,
    pub catalog: Option<PathBuf>,
    pub dry_run: bool,
    pub json: bool,
}

pub fn run(args: SyncArgs) -> CommandResult {
    let config = match load_config(args.config_path.clone(), args.catalog.clone()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };
    crate::init_logging(&config.logging);

    let catalog = match resolve_catalog(config.catalog.path.as_deref()) {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };
    let providers = match GoogleProviders::from_config(&config.google) {
        Ok(providers) => providers,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_FAILURES,
            );
        }
    };

    info!(
        event_name = "cli.sync.started",
        principal = %args.principal.trim(),
        candidates = catalog.len(),
        dry_run = args.dry_run,
        "starting send-as sync"
    );
    runtime.block_on(reconcile_with(
        catalog,
        providers.membership_oracle(),
        providers.send_as_store(),
        &args,
    ))
}

/// Runs or plans one reconciliation and renders the outcome with its exit code.
pub async fn reconcile_with<O, S>(
    catalog: AliasCatalog,
    oracle: O,
    store: S,
    args: &SyncArgs,
) -> CommandResult
where
    O: MembershipOracle,
    S: AliasStore,
{
    let reconciler =
        AliasReconciler::new(catalog, oracle, store).with_audit_sink(Arc::new(TracingAuditSink));

    if args.dry_run {
        return match reconciler.plan(&args.principal).await {
            Ok(plan) => {
                let output =
                    if args.json { to_json(COMMAND, &plan) } else { Ok(render_plan(&plan)) };
                match output {
                    Ok(output) => CommandResult { exit_code: EXIT_OK, output },
                    Err(failure) => failure,
                }
            }
            Err(error) => fatal(&error),
        };
    }

    match reconciler.run(&args.principal).await {
        Ok(report) => {
            let exit_code = if report.is_success() { EXIT_OK } else { EXIT_FAILURES };
            let output =
                if args.json { to_json(COMMAND, &report) } else { Ok(render_report(&report)) };
            match output {
                Ok(output) => CommandResult { exit_code, output },
                Err(failure) => failure,
            }
        }
        Err(error) => fatal(&error),
    }
}

fn fatal(error: &ReconcileError) -> CommandResult {
    let exit_code = match error {
        ReconcileError::Config(_) => EXIT_CONFIG,
        ReconcileError::Snapshot(_) => EXIT_SNAPSHOT,
    };
    CommandResult::failure(COMMAND, error.error_class(), error.to_string(), exit_code)
}

fn render_report(report: &ReconcileReport) -> String {
    let counts = report.counts();
    let mut lines = vec![format!(
        "sync {} (run {}): {} created, {} deleted, {} kept, {} skipped, {} failed",
        report.principal,
        report.run_id,
        counts.create,
        counts.delete,
        counts.keep,
        counts.skip,
        report.failures().count()
    )];

    for candidate in &report.candidates {
        let mut line = format!(
            "- {} {} ({})",
            candidate.decision.as_str(),
            candidate.address,
            candidate.display_name
        );
        match &candidate.outcome {
            Outcome::Ok => line.push_str(" ok"),
            Outcome::Failed { reason } => line.push_str(&format!(" FAILED: {reason}")),
        }
        if let Some(status) = &candidate.verification_status {
            line.push_str(&format!(" [{status}]"));
        }
        lines.push(line);
    }

    match &report.final_snapshot {
        FinalSnapshot::Observed { aliases } => {
            lines.push(format!("send-as aliases after sync: {}", aliases.len()));
        }
        FinalSnapshot::Unavailable { reason } => {
            lines.push(format!("send-as aliases after sync: unavailable ({reason})"));
        }
    }

    lines.join("\n")
}

fn render_plan(plan: &ReconcilePlan) -> String {
    let counts = plan.counts();
    let mut lines = vec![format!(
        "dry run for {}: would create {}, delete {}, keep {}, skip {}",
        plan.principal, counts.create, counts.delete, counts.keep, counts.skip
    )];
    for planned in &plan.decisions {
        lines.push(format!(
            "- {} {} ({}) member={} alias={}",
            planned.decision.as_str(),
            planned.address,
            planned.display_name,
            planned.is_member,
            planned.has_alias
        ));
    }
    lines.join("\n")
}

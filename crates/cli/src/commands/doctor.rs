use std::path::PathBuf;

use aliasync_core::config::{AppConfig, LlmProvider, TokenSourceConfig};
use serde::Serialize;

use super::{load_config, resolve_catalog, CommandResult, EXIT_FAILURES, EXIT_OK};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(config_path: Option<PathBuf>, json_output: bool) -> CommandResult {
    let report = build_report(config_path);
    let exit_code =
        if report.overall_status == CheckStatus::Pass { EXIT_OK } else { EXIT_FAILURES };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\
                 \"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(config_path: Option<PathBuf>) -> DoctorReport {
    let mut checks = Vec::new();

    match load_config(config_path, None) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_token_sources(&config));
            checks.push(check_catalog(&config));
            checks.push(check_llm(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["google_token_sources", "alias_catalog", "llm_credentials"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn describe(source: &TokenSourceConfig) -> &'static str {
    match source {
        TokenSourceConfig::Static(_) => "static token",
        TokenSourceConfig::Command(_) => "token command",
    }
}

fn check_token_sources(config: &AppConfig) -> DoctorCheck {
    match (config.google.directory_token(), config.google.gmail_token()) {
        (Some(directory), Some(gmail)) => DoctorCheck {
            name: "google_token_sources",
            status: CheckStatus::Pass,
            details: format!("directory: {}, gmail: {}", describe(&directory), describe(&gmail)),
        },
        _ => DoctorCheck {
            name: "google_token_sources",
            status: CheckStatus::Fail,
            details: "set google.access_token or google.token_command \
                      (ALIASYNC_GOOGLE_ACCESS_TOKEN / ALIASYNC_GOOGLE_TOKEN_COMMAND)"
                .to_string(),
        },
    }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    match resolve_catalog(config.catalog.path.as_deref()) {
        Ok(catalog) => DoctorCheck {
            name: "alias_catalog",
            status: CheckStatus::Pass,
            details: format!(
                "{} aliases across {} domains",
                catalog.len(),
                catalog.domains().len()
            ),
        },
        Err(error) => {
            DoctorCheck {
                name: "alias_catalog",
                status: CheckStatus::Fail,
                details: error.to_string(),
            }
        }
    }
}

fn check_llm(config: &AppConfig) -> DoctorCheck {
    if config.llm.provider == LlmProvider::Ollama {
        return DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Skipped,
            details: "ollama does not require an api key".to_string(),
        };
    }
    match config.llm.require_api_key() {
        Ok(_) => DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Pass,
            details: format!("api key configured for model `{}`", config.llm.model),
        },
        // `ask` is optional; sync works without an LLM.
        Err(_) => DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Skipped,
            details: "no llm api key; `aliasync ask` is unavailable".to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

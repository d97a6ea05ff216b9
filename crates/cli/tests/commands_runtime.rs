use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::sync::{Arc, Mutex, OnceLock};

use aliasync_cli::commands::ask::{self, AskArgs};
use aliasync_cli::commands::sync::{self, reconcile_with, SyncArgs};
use aliasync_cli::commands::users::{self, list_with, UsersArgs};
use aliasync_cli::commands::{catalog, config, doctor};
use aliasync_core::config::AppConfig;
use aliasync_core::{
    AliasCatalog, ConservativeMembershipOracle, EmailAddress, InMemoryAliasStore,
    InMemoryDirectory, Principal, ProviderError,
};
use aliasync_google::GoogleProviders;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{json, Value};
use tempfile::TempDir;

const PRINCIPAL: &str = "jwest@utahmmc.com";

#[test]
fn sync_returns_config_failure_without_token_source() {
    with_env(&[], || {
        let result = sync::run(sync_args(PRINCIPAL));
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "sync");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn sync_rejects_blank_principal_before_network() {
    with_env(
        &[
            ("ALIASYNC_GOOGLE_ACCESS_TOKEN", "ya29.test"),
            ("ALIASYNC_GOOGLE_GMAIL_BASE_URL", "http://127.0.0.1:9"),
            ("ALIASYNC_GOOGLE_DIRECTORY_BASE_URL", "http://127.0.0.1:9"),
        ],
        || {
            let result = sync::run(sync_args("   "));
            assert_eq!(result.exit_code, 2);
            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "config_validation");
        },
    );
}

#[test]
fn sync_reports_snapshot_failure_when_gmail_is_unreachable() {
    with_env(
        &[
            ("ALIASYNC_GOOGLE_ACCESS_TOKEN", "ya29.test"),
            ("ALIASYNC_GOOGLE_GMAIL_BASE_URL", "http://127.0.0.1:9"),
            ("ALIASYNC_GOOGLE_DIRECTORY_BASE_URL", "http://127.0.0.1:9"),
            ("ALIASYNC_GOOGLE_TIMEOUT_SECS", "2"),
        ],
        || {
            let result = sync::run(sync_args(PRINCIPAL));
            assert_eq!(result.exit_code, 3, "expected snapshot failure code");
            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "snapshot");
        },
    );
}

#[test]
fn sync_rejects_duplicate_catalog_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("catalog.toml");
    fs::write(&path, "aliases = [\"a@x.com\", \"A@X.com\"]\n").expect("write catalog");

    with_env(&[("ALIASYNC_GOOGLE_ACCESS_TOKEN", "ya29.test")], || {
        let result = sync::run(SyncArgs { catalog: Some(path.clone()), ..sync_args(PRINCIPAL) });
        assert_eq!(result.exit_code, 2);
        assert!(parse_payload(&result.output)["message"]
            .as_str()
            .unwrap_or_default()
            .contains("a@x.com"));
    });
}

fn fixture() -> (AliasCatalog, Arc<InMemoryDirectory>, Arc<InMemoryAliasStore>) {
    let address = |raw: &str| EmailAddress::parse(raw).expect("address");
    let principal = Principal::new(PRINCIPAL).expect("principal");
    let catalog = AliasCatalog::new(
        BTreeMap::from([("x.com".to_string(), "X Brand".to_string())]),
        [address("a@x.com"), address("b@x.com"), address("c@x.com")],
    );
    let directory =
        Arc::new(InMemoryDirectory::default().with_member(&address("a@x.com"), &principal));
    let store = Arc::new(
        InMemoryAliasStore::default()
            .with_alias(&address("b@x.com"), "X Brand")
            .with_create_failure(
                &address("c@x.com"),
                ProviderError::Unauthorized("never called".to_string()),
            ),
    );
    (catalog, directory, store)
}

#[tokio::test]
async fn sync_json_report_and_exit_code_reflect_outcomes() {
    let (catalog, directory, store) = fixture();
    let args = SyncArgs { json: true, ..sync_args(PRINCIPAL) };

    let result = reconcile_with(
        catalog,
        ConservativeMembershipOracle::new(Arc::clone(&directory)),
        Arc::clone(&store),
        &args,
    )
    .await;

    assert_eq!(result.exit_code, 0);
    let report = parse_payload(&result.output);
    assert_eq!(report["principal"], PRINCIPAL);
    assert_eq!(report["candidates"][0]["decision"], "create");
    assert_eq!(report["candidates"][0]["outcome"]["status"], "ok");
    assert_eq!(report["candidates"][1]["decision"], "delete");
    assert_eq!(report["candidates"][2]["decision"], "skip");
    assert_eq!(report["final_snapshot"]["state"], "observed");
}

#[tokio::test]
async fn sync_exit_code_is_one_when_a_candidate_fails() {
    let (catalog, directory, store) = fixture();
    let principal = Principal::new(PRINCIPAL).expect("principal");
    directory.add_member(&EmailAddress::parse("c@x.com").expect("address"), &principal);

    let result = reconcile_with(
        catalog,
        ConservativeMembershipOracle::new(Arc::clone(&directory)),
        Arc::clone(&store),
        &sync_args(PRINCIPAL),
    )
    .await;

    assert_eq!(result.exit_code, 1);
    assert!(result.output.contains("1 failed"));
    assert!(result.output.contains("FAILED: create of alias `c@x.com` failed"));
}

#[tokio::test]
async fn dry_run_leaves_aliases_untouched() {
    let (catalog, directory, store) = fixture();
    let args = SyncArgs { dry_run: true, ..sync_args(PRINCIPAL) };

    let result = reconcile_with(
        catalog,
        ConservativeMembershipOracle::new(Arc::clone(&directory)),
        Arc::clone(&store),
        &args,
    )
    .await;

    assert_eq!(result.exit_code, 0);
    assert!(result.output.starts_with("dry run for jwest@utahmmc.com: would create 1, delete 1"));
    assert!(store.mutations().is_empty());
}

#[test]
fn catalog_json_lists_builtin_brands() {
    with_env(&[], || {
        let result = catalog::run(None, None, true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["candidates"].as_array().map(Vec::len), Some(68));
        assert_eq!(payload["domains"]["icondumpsters.com"], "Icon Dumpsters");
    });
}

#[test]
fn config_output_attributes_sources_and_redacts_secrets() {
    with_env(
        &[("ALIASYNC_GOOGLE_ACCESS_TOKEN", "ya29.super-secret"), ("OPENAI_API_KEY", "sk-live-key")],
        || {
            let output = config::run(None);
            assert!(output.contains(
                "- google.access_token = ya29.*** (source: env (ALIASYNC_GOOGLE_ACCESS_TOKEN))"
            ));
            assert!(output.contains("- llm.api_key = sk-*** (source: env (OPENAI_API_KEY))"));
            assert!(output.contains("- google.customer = my_customer (source: default)"));
            assert!(!output.contains("super-secret"));
            assert!(!output.contains("live-key"));
        },
    );
}

#[test]
fn config_file_values_are_attributed_to_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("aliasync.toml");
    fs::write(&path, "[google]\ncustomer = \"C0123\"\n").expect("write config");

    with_env(&[], || {
        let output = config::run(Some(path.clone()));
        assert!(output.contains(&format!(
            "- google.customer = C0123 (source: file ({}))",
            path.display()
        )));
    });
}

#[test]
fn doctor_fails_without_token_source() {
    with_env(&[], || {
        let result = doctor::run(None, true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        let checks = payload["checks"].as_array().cloned().unwrap_or_default();
        let token_check = checks
            .iter()
            .find(|check| check["name"] == "google_token_sources")
            .expect("token check present");
        assert_eq!(token_check["status"], "fail");
        let catalog_check = checks
            .iter()
            .find(|check| check["name"] == "alias_catalog")
            .expect("catalog check present");
        assert_eq!(catalog_check["status"], "pass");
    });
}

#[test]
fn doctor_passes_with_token_command() {
    with_env(&[("ALIASYNC_GOOGLE_TOKEN_COMMAND", "gcloud auth print-access-token")], || {
        let result = doctor::run(None, false);
        assert_eq!(result.exit_code, 0, "unexpected doctor output: {}", result.output);
        assert!(result.output.contains("directory: token command, gmail: token command"));
    });
}

#[test]
fn ask_requires_llm_api_key() {
    with_env(&[], || {
        let result = ask::run(AskArgs {
            text: "add ava to marketing".to_string(),
            plan_only: true,
            ..AskArgs::default()
        });
        assert_eq!(result.exit_code, 2);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "ask");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn users_requires_google_token_source() {
    with_env(&[], || {
        let result = users::run(UsersArgs::default());
        assert_eq!(result.exit_code, 2);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "users");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn users_rejects_out_of_range_max() {
    with_env(&[("ALIASYNC_GOOGLE_ACCESS_TOKEN", "ya29.test")], || {
        for max_results in [0, 501] {
            let result = users::run(UsersArgs { max_results, ..UsersArgs::default() });
            assert_eq!(result.exit_code, 2);
            assert!(parse_payload(&result.output)["message"]
                .as_str()
                .unwrap_or_default()
                .contains("--max"));
        }
    });
}

type UserQueries = Arc<Mutex<Vec<BTreeMap<String, String>>>>;

async fn fake_directory_users(
    State(queries): State<UserQueries>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    queries.lock().expect("queries").push(query);
    Json(json!({
        "users": [
            { "id": "1", "primaryEmail": "ava@utahmmc.com", "name": { "fullName": "Ava Stone" } },
            { "id": "2", "primaryEmail": "old@utahmmc.com", "suspended": true }
        ]
    }))
}

async fn serve_directory(queries: UserQueries) -> GoogleProviders {
    let app = Router::new()
        .route("/admin/directory/v1/users", get(fake_directory_users))
        .with_state(queries);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind fake directory");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake directory");
    });

    let mut config = AppConfig::default().google;
    config.directory_base_url = format!("http://{addr}");
    config.access_token = Some(SecretString::from("ya29.test".to_string()));
    GoogleProviders::from_config(&config).expect("providers")
}

#[tokio::test]
async fn users_json_lists_directory_users() {
    let queries = UserQueries::default();
    let providers = serve_directory(Arc::clone(&queries)).await;
    let args = UsersArgs { max_results: 20, json: true, ..UsersArgs::default() };

    let result = list_with(&providers.admin(), &args).await;

    assert_eq!(result.exit_code, 0);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["count"], 2);
    assert_eq!(payload["users"][0]["primaryEmail"], "ava@utahmmc.com");
    assert_eq!(payload["users"][1]["suspended"], true);

    let queries = queries.lock().expect("queries");
    assert_eq!(queries[0].get("customer").map(String::as_str), Some("my_customer"));
    assert_eq!(queries[0].get("maxResults").map(String::as_str), Some("20"));
}

#[tokio::test]
async fn users_human_output_marks_suspended_accounts() {
    let providers = serve_directory(UserQueries::default()).await;

    let result = list_with(&providers.admin(), &UsersArgs::default()).await;

    assert_eq!(result.exit_code, 0);
    assert_eq!(
        result.output,
        "- ava@utahmmc.com (Ava Stone)\n- old@utahmmc.com [suspended]"
    );
}

fn sync_args(principal: &str) -> SyncArgs {
    SyncArgs { principal: principal.to_string(), ..SyncArgs::default() }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "ALIASYNC_GOOGLE_DIRECTORY_BASE_URL",
        "ALIASYNC_GOOGLE_GMAIL_BASE_URL",
        "ALIASYNC_GOOGLE_CUSTOMER",
        "ALIASYNC_GOOGLE_TIMEOUT_SECS",
        "ALIASYNC_GOOGLE_ACCESS_TOKEN",
        "ALIASYNC_GOOGLE_TOKEN_COMMAND",
        "ALIASYNC_GOOGLE_GMAIL_ACCESS_TOKEN",
        "ALIASYNC_GOOGLE_GMAIL_TOKEN_COMMAND",
        "ALIASYNC_CATALOG_PATH",
        "ALIASYNC_LLM_PROVIDER",
        "ALIASYNC_LLM_API_KEY",
        "ALIASYNC_LLM_BASE_URL",
        "ALIASYNC_LLM_MODEL",
        "ALIASYNC_LLM_TIMEOUT_SECS",
        "OPENAI_API_KEY",
        "ALIASYNC_LOGGING_LEVEL",
        "ALIASYNC_LOGGING_FORMAT",
        "ALIASYNC_LOG_LEVEL",
        "ALIASYNC_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

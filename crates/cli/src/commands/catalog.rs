use std::path::PathBuf;

use aliasync_core::AliasCatalog;

use super::{load_config, resolve_catalog, to_json, CommandResult, EXIT_OK};

const COMMAND: &str = "catalog";

pub fn run(config_path: Option<PathBuf>, catalog: Option<PathBuf>, json: bool) -> CommandResult {
    let config = match load_config(config_path, catalog) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };
    crate::init_logging(&config.logging);

    let catalog = match resolve_catalog(config.catalog.path.as_deref()) {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };

    if json {
        return match to_json(COMMAND, &catalog) {
            Ok(output) => CommandResult { exit_code: EXIT_OK, output },
            Err(failure) => failure,
        };
    }

    let source = config
        .catalog
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());
    CommandResult { exit_code: EXIT_OK, output: render(&catalog, &source) }
}

fn render(catalog: &AliasCatalog, source: &str) -> String {
    let mut lines = vec![format!(
        "alias catalog ({source}): {} aliases across {} domains",
        catalog.len(),
        catalog.domains().len()
    )];
    for (domain, display_name) in catalog.domains() {
        lines.push(format!("{domain} => {display_name}"));
        let in_domain = catalog
            .candidates()
            .iter()
            .filter(|candidate| candidate.address.domain() == domain.as_str());
        for candidate in in_domain {
            lines.push(format!("  - {}", candidate.address));
        }
    }
    for candidate in catalog
        .candidates()
        .iter()
        .filter(|candidate| !catalog.domains().contains_key(candidate.address.domain()))
    {
        lines.push(format!("- {} (no brand, sent as the address itself)", candidate.address));
    }
    lines.join("\n")
}

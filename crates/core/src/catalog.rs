//! Candidate send-as aliases and the brand display names they are sent under.
//!
//! A catalog is plain data: a `domain -> display name` table plus an ordered
//! list of alias addresses. It can be built in code, loaded from a TOML file,
//! or taken from [`CatalogSpec::builtin`].

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::address::EmailAddress;
use crate::domain::alias::AliasCandidate;
use crate::errors::ConfigError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AliasCatalog {
    domains: BTreeMap<String, String>,
    candidates: Vec<AliasCandidate>,
}

impl AliasCatalog {
    /// Builds a catalog without checking emptiness or uniqueness; call
    /// [`AliasCatalog::validate`] before using it for a run.
    pub fn new<I>(domains: BTreeMap<String, String>, addresses: I) -> Self
    where
        I: IntoIterator<Item = EmailAddress>,
    {
        let domains = domains
            .into_iter()
            .map(|(domain, display_name)| (domain.trim().to_ascii_lowercase(), display_name))
            .collect::<BTreeMap<_, _>>();

        let candidates = addresses
            .into_iter()
            .map(|address| {
                let display_name = resolve_in(&domains, &address);
                AliasCandidate { address, display_name }
            })
            .collect();

        Self { domains, candidates }
    }

    pub fn from_spec(spec: CatalogSpec) -> Result<Self, ConfigError> {
        let mut domains = spec.domains;
        let mut addresses = Vec::new();

        for brand in spec.brands {
            let domain = brand.domain.trim().to_ascii_lowercase();
            if domain.is_empty() {
                return Err(ConfigError::Validation(
                    "catalog brand entries must name a domain".to_string(),
                ));
            }
            if let Some(display_name) = brand.display_name {
                domains.insert(domain.clone(), display_name);
            }
            for mailbox in brand.mailboxes {
                addresses.push(EmailAddress::parse(&format!("{}@{domain}", mailbox.trim()))?);
            }
        }

        for alias in spec.aliases {
            addresses.push(EmailAddress::parse(&alias)?);
        }

        Ok(Self::new(domains, addresses))
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_spec(CatalogSpec::builtin())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
        let spec = toml::from_str::<CatalogSpec>(&raw)
            .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })?;
        Self::from_spec(spec)
    }

    /// Display name for `address`, falling back to the address itself when
    /// its domain is not registered.
    pub fn resolve(&self, address: &EmailAddress) -> String {
        resolve_in(&self.domains, address)
    }

    pub fn candidates(&self) -> &[AliasCandidate] {
        &self.candidates
    }

    pub fn domains(&self) -> &BTreeMap<String, String> {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.candidates.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        let mut seen = HashSet::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            if !seen.insert(&candidate.address) {
                return Err(ConfigError::DuplicateAlias(candidate.address.clone()));
            }
        }

        Ok(())
    }
}

fn resolve_in(domains: &BTreeMap<String, String>, address: &EmailAddress) -> String {
    domains.get(address.domain()).cloned().unwrap_or_else(|| address.as_str().to_string())
}

/// On-disk shape of a catalog file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSpec {
    #[serde(default)]
    pub domains: BTreeMap<String, String>,
    #[serde(default, rename = "brand")]
    pub brands: Vec<BrandSpec>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandSpec {
    pub domain: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mailboxes: Vec<String>,
}

const SHARED_MAILBOXES: &[&str] = &[
    "accounts",
    "ap",
    "ar",
    "billing",
    "contact",
    "dev",
    "estimates",
    "hr",
    "info",
    "it",
    "jobs",
    "legal",
    "marketing",
];

const TRAILING_MAILBOXES: &[&str] =
    &["noreply", "payroll", "projects", "security", "service", "support", "vendors"];

impl CatalogSpec {
    /// The three brands the shared admin mailbox is provisioned for.
    pub fn builtin() -> Self {
        let brand = |domain: &str, display_name: &str, extra: &[&str], sales: bool| {
            let mut mailboxes = vec!["inbox".to_string()];
            mailboxes.extend(extra.iter().map(|mailbox| mailbox.to_string()));
            mailboxes.extend(SHARED_MAILBOXES.iter().map(|mailbox| mailbox.to_string()));
            if !sales {
                mailboxes.push("media".to_string());
            }
            for mailbox in TRAILING_MAILBOXES {
                if sales && *mailbox == "security" {
                    mailboxes.push("sales".to_string());
                }
                mailboxes.push(mailbox.to_string());
            }
            BrandSpec {
                domain: domain.to_string(),
                display_name: Some(display_name.to_string()),
                mailboxes,
            }
        };

        Self {
            domains: BTreeMap::new(),
            brands: vec![
                brand("tntdump.com", "TNT Dumpsters", &[], false),
                brand("icondumpsters.com", "Icon Dumpsters", &["icon-dev"], true),
                brand("utahwatergardens.com", "Utah Water Gardens", &["uwg-dev"], true),
            ],
            aliases: Vec::new(),
        }
    }
}

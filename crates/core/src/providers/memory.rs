use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::address::{EmailAddress, Principal};
use crate::domain::alias::{AliasBinding, VerificationStatus};
use crate::errors::ProviderError;

use super::{AliasStore, DirectoryClient};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Directory backed by a `group -> members` map, with per-group failure
/// injection.
#[derive(Default)]
pub struct InMemoryDirectory {
    members: Mutex<HashMap<EmailAddress, HashSet<String>>>,
    failures: HashMap<EmailAddress, ProviderError>,
    queries: Mutex<Vec<EmailAddress>>,
}

impl InMemoryDirectory {
    pub fn with_member(self, group: &EmailAddress, principal: &Principal) -> Self {
        self.add_member(group, principal);
        self
    }

    pub fn with_failure(mut self, group: &EmailAddress, error: ProviderError) -> Self {
        self.failures.insert(group.clone(), error);
        self
    }

    pub fn add_member(&self, group: &EmailAddress, principal: &Principal) {
        lock(&self.members)
            .entry(group.clone())
            .or_default()
            .insert(principal.as_str().to_string());
    }

    pub fn remove_member(&self, group: &EmailAddress, principal: &Principal) {
        if let Some(members) = lock(&self.members).get_mut(group) {
            members.remove(principal.as_str());
        }
    }

    /// Groups queried so far, in call order.
    pub fn queries(&self) -> Vec<EmailAddress> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn has_member(
        &self,
        group: &EmailAddress,
        principal: &Principal,
    ) -> Result<bool, ProviderError> {
        lock(&self.queries).push(group.clone());

        if let Some(error) = self.failures.get(group) {
            return Err(error.clone());
        }

        let members = lock(&self.members);
        Ok(members
            .get(group)
            .map(|members| members.contains(principal.as_str()))
            .unwrap_or(false))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Create { address: EmailAddress, display_name: String },
    Delete { address: EmailAddress },
}

impl StoreCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::List)
    }
}

/// Send-as alias store for a single mailbox, recording every call.
pub struct InMemoryAliasStore {
    aliases: Mutex<BTreeMap<EmailAddress, AliasBinding>>,
    calls: Mutex<Vec<StoreCall>>,
    create_status: VerificationStatus,
    create_failures: HashMap<EmailAddress, ProviderError>,
    delete_failures: HashMap<EmailAddress, ProviderError>,
    list_failures: Mutex<Vec<Option<ProviderError>>>,
}

impl Default for InMemoryAliasStore {
    fn default() -> Self {
        Self {
            aliases: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            create_status: VerificationStatus::Accepted,
            create_failures: HashMap::new(),
            delete_failures: HashMap::new(),
            list_failures: Mutex::new(Vec::new()),
        }
    }
}

impl InMemoryAliasStore {
    pub fn with_alias(self, address: &EmailAddress, display_name: &str) -> Self {
        lock(&self.aliases).insert(
            address.clone(),
            AliasBinding::new(address.clone(), display_name, VerificationStatus::Accepted),
        );
        self
    }

    pub fn with_create_status(mut self, status: VerificationStatus) -> Self {
        self.create_status = status;
        self
    }

    pub fn with_create_failure(mut self, address: &EmailAddress, error: ProviderError) -> Self {
        self.create_failures.insert(address.clone(), error);
        self
    }

    pub fn with_delete_failure(mut self, address: &EmailAddress, error: ProviderError) -> Self {
        self.delete_failures.insert(address.clone(), error);
        self
    }

    /// Queues outcomes for successive `list` calls: `Some(error)` fails that
    /// call, `None` lets it through. Calls beyond the queue succeed.
    pub fn with_list_outcomes(self, outcomes: Vec<Option<ProviderError>>) -> Self {
        *lock(&self.list_failures) = outcomes;
        self
    }

    pub fn addresses(&self) -> Vec<EmailAddress> {
        lock(&self.aliases).keys().cloned().collect()
    }

    pub fn contains(&self, address: &EmailAddress) -> bool {
        lock(&self.aliases).contains_key(address)
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    pub fn mutations(&self) -> Vec<StoreCall> {
        lock(&self.calls).iter().filter(|call| call.is_mutation()).cloned().collect()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }
}

#[async_trait]
impl AliasStore for InMemoryAliasStore {
    async fn list(&self, _mailbox: &Principal) -> Result<Vec<AliasBinding>, ProviderError> {
        lock(&self.calls).push(StoreCall::List);

        let next_outcome = {
            let mut outcomes = lock(&self.list_failures);
            if outcomes.is_empty() {
                None
            } else {
                outcomes.remove(0)
            }
        };
        if let Some(error) = next_outcome {
            return Err(error);
        }

        Ok(lock(&self.aliases).values().cloned().collect())
    }

    async fn create(
        &self,
        _mailbox: &Principal,
        address: &EmailAddress,
        display_name: &str,
    ) -> Result<VerificationStatus, ProviderError> {
        lock(&self.calls).push(StoreCall::Create {
            address: address.clone(),
            display_name: display_name.to_string(),
        });

        if let Some(error) = self.create_failures.get(address) {
            return Err(error.clone());
        }

        let mut aliases = lock(&self.aliases);
        if aliases.contains_key(address) {
            return Err(ProviderError::Conflict(format!("sendAs {address}")));
        }
        aliases.insert(
            address.clone(),
            AliasBinding::new(address.clone(), display_name, self.create_status.clone()),
        );
        Ok(self.create_status.clone())
    }

    async fn delete(
        &self,
        _mailbox: &Principal,
        address: &EmailAddress,
    ) -> Result<(), ProviderError> {
        lock(&self.calls).push(StoreCall::Delete { address: address.clone() });

        if let Some(error) = self.delete_failures.get(address) {
            return Err(error.clone());
        }

        match lock(&self.aliases).remove(address) {
            Some(_) => Ok(()),
            None => Err(ProviderError::NotFound(format!("sendAs {address}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryAliasStore, StoreCall};
    use crate::domain::address::{EmailAddress, Principal};
    use crate::errors::ProviderError;
    use crate::providers::AliasStore;

    #[tokio::test]
    async fn store_tracks_aliases_and_calls() {
        let principal = Principal::new("jwest@utahmmc.com").expect("principal");
        let ap = EmailAddress::parse("ap@x.com").expect("address");
        let store = InMemoryAliasStore::default();

        store.create(&principal, &ap, "X").await.expect("create");
        assert!(store.contains(&ap));
        assert!(matches!(
            store.create(&principal, &ap, "X").await,
            Err(ProviderError::Conflict(_))
        ));

        store.delete(&principal, &ap).await.expect("delete");
        assert!(matches!(store.delete(&principal, &ap).await, Err(ProviderError::NotFound(_))));
        assert_eq!(store.mutations().len(), 4);
        assert!(matches!(store.calls()[0], StoreCall::Create { .. }));
    }

    #[tokio::test]
    async fn list_outcomes_are_consumed_in_order() {
        let principal = Principal::new("jwest@utahmmc.com").expect("principal");
        let store = InMemoryAliasStore::default().with_list_outcomes(vec![
            None,
            Some(ProviderError::Transport("reset".to_string())),
        ]);

        assert!(store.list(&principal).await.is_ok());
        assert!(store.list(&principal).await.is_err());
        assert!(store.list(&principal).await.is_ok());
    }
}

//! Capabilities the reconciler consumes: a directory that answers group
//! membership questions and a mailbox that owns send-as aliases.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::address::{EmailAddress, Principal};
use crate::domain::alias::{AliasBinding, VerificationStatus};
use crate::errors::{MembershipQueryError, ProviderError};

pub mod memory;

pub use memory::{InMemoryAliasStore, InMemoryDirectory, StoreCall};

/// Raw directory lookup. Errors surface as-is.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn has_member(
        &self,
        group: &EmailAddress,
        principal: &Principal,
    ) -> Result<bool, ProviderError>;
}

#[async_trait]
pub trait MembershipOracle: Send + Sync {
    async fn is_member(&self, group: &EmailAddress, principal: &Principal) -> bool;
}

#[async_trait]
pub trait AliasStore: Send + Sync {
    async fn list(&self, mailbox: &Principal) -> Result<Vec<AliasBinding>, ProviderError>;

    async fn create(
        &self,
        mailbox: &Principal,
        address: &EmailAddress,
        display_name: &str,
    ) -> Result<VerificationStatus, ProviderError>;

    async fn delete(&self, mailbox: &Principal, address: &EmailAddress)
        -> Result<(), ProviderError>;
}

/// Membership oracle that reads any lookup failure as "not a member".
///
/// A failed lookup can therefore only ever lead to an alias being removed or
/// left absent, never created.
pub struct ConservativeMembershipOracle<D> {
    directory: D,
}

impl<D> ConservativeMembershipOracle<D>
where
    D: DirectoryClient,
{
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }
}

#[async_trait]
impl<D> MembershipOracle for ConservativeMembershipOracle<D>
where
    D: DirectoryClient,
{
    async fn is_member(&self, group: &EmailAddress, principal: &Principal) -> bool {
        match self.directory.has_member(group, principal).await {
            Ok(is_member) => {
                debug!(
                    event_name = "membership.checked",
                    group = %group,
                    principal = %principal,
                    is_member,
                    "membership lookup completed"
                );
                is_member
            }
            Err(source) => {
                let error = MembershipQueryError { group: group.clone(), source };
                warn!(
                    event_name = "membership.lookup_failed",
                    group = %group,
                    principal = %principal,
                    error = %error,
                    "treating principal as not a member"
                );
                false
            }
        }
    }
}

#[async_trait]
impl<T> DirectoryClient for Arc<T>
where
    T: DirectoryClient + ?Sized,
{
    async fn has_member(
        &self,
        group: &EmailAddress,
        principal: &Principal,
    ) -> Result<bool, ProviderError> {
        (**self).has_member(group, principal).await
    }
}

#[async_trait]
impl<T> MembershipOracle for Arc<T>
where
    T: MembershipOracle + ?Sized,
{
    async fn is_member(&self, group: &EmailAddress, principal: &Principal) -> bool {
        (**self).is_member(group, principal).await
    }
}

#[async_trait]
impl<T> AliasStore for Arc<T>
where
    T: AliasStore + ?Sized,
{
    async fn list(&self, mailbox: &Principal) -> Result<Vec<AliasBinding>, ProviderError> {
        (**self).list(mailbox).await
    }

    async fn create(
        &self,
        mailbox: &Principal,
        address: &EmailAddress,
        display_name: &str,
    ) -> Result<VerificationStatus, ProviderError> {
        (**self).create(mailbox, address, display_name).await
    }

    async fn delete(
        &self,
        mailbox: &Principal,
        address: &EmailAddress,
    ) -> Result<(), ProviderError> {
        (**self).delete(mailbox, address).await
    }
}

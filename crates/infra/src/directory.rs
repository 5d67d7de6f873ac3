//! Member directory seam.
//!
//! Member profiles are owned elsewhere; this core only needs to resolve a
//! member id to a display name when denormalizing roster entries. A failed
//! resolution is a dependency error that aborts roster generation and
//! substitution — entries must not be created with unresolved identities.

use std::collections::HashMap;
use std::sync::RwLock;

use flock_core::{MemberId, TenantId};

/// Member name resolution error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("unknown member: {0}")]
    UnknownMember(MemberId),
    #[error("member directory unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the member directory (external collaborator).
pub trait MemberDirectory: Send + Sync {
    fn resolve_member_name(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> Result<String, DirectoryError>;
}

impl<D> MemberDirectory for std::sync::Arc<D>
where
    D: MemberDirectory + ?Sized,
{
    fn resolve_member_name(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> Result<String, DirectoryError> {
        (**self).resolve_member_name(tenant_id, member_id)
    }
}

/// In-memory member directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryMemberDirectory {
    names: RwLock<HashMap<(TenantId, MemberId), String>>,
}

impl InMemoryMemberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tenant_id: TenantId, member_id: MemberId, name: impl Into<String>) {
        if let Ok(mut names) = self.names.write() {
            names.insert((tenant_id, member_id), name.into());
        }
    }
}

impl MemberDirectory for InMemoryMemberDirectory {
    fn resolve_member_name(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> Result<String, DirectoryError> {
        let names = self
            .names
            .read()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        names
            .get(&(tenant_id, member_id))
            .cloned()
            .ok_or(DirectoryError::UnknownMember(member_id))
    }
}

//! Rotation cursor persistence.
//!
//! One cursor per (tenant, ministry). The cursor is a versioned record and
//! `advance` is compare-and-swap: callers pass the version they read, and a
//! stale version is rejected instead of silently double-consuming a rotation
//! turn. `initialize` overwrites unconditionally — it runs on every pool
//! edit and resets fairness, which is the documented behavior.

use std::collections::HashMap;
use std::sync::RwLock;

use flock_core::{MemberId, TenantId};
use flock_ministries::MinistryId;
use flock_rosters::{AssignmentRecord, RotationCursor};

/// Rotation cursor store abstraction.
pub trait RotationCursorStore: Send + Sync {
    /// Create or overwrite the cursor for a ministry: index 0, empty
    /// history. Idempotent; safe to call on every pool edit.
    fn initialize(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        pool: Vec<MemberId>,
    ) -> Result<RotationCursor, RotationStoreError>;

    /// Read the current cursor, or `NotFound` if the ministry was never
    /// initialized.
    fn read(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
    ) -> Result<RotationCursor, RotationStoreError>;

    /// Atomically advance the cursor and append history records.
    ///
    /// Fails with `Concurrency` when `expected_version` is stale and with
    /// `InvalidState` when the pool is empty; the caller must refuse to
    /// generate a roster in either case.
    fn advance(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        expected_version: u64,
        consumed: usize,
        appended: Vec<AssignmentRecord>,
    ) -> Result<RotationCursor, RotationStoreError>;

    /// Remove the cursor (cascade target for ministry removal).
    fn remove(&self, tenant_id: TenantId, ministry_id: MinistryId)
    -> Result<(), RotationStoreError>;
}

/// Rotation cursor store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RotationStoreError {
    #[error("rotation cursor not found")]
    NotFound,
    #[error("rotation cursor version conflict: {0}")]
    Concurrency(String),
    #[error("invalid rotation state: {0}")]
    InvalidState(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// In-memory rotation cursor store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryRotationCursorStore {
    cursors: RwLock<HashMap<(TenantId, MinistryId), RotationCursor>>,
}

impl InMemoryRotationCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RotationCursorStore for InMemoryRotationCursorStore {
    fn initialize(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        pool: Vec<MemberId>,
    ) -> Result<RotationCursor, RotationStoreError> {
        let cursor = RotationCursor::new(ministry_id, pool);
        let mut cursors = self
            .cursors
            .write()
            .map_err(|_| RotationStoreError::Storage("lock poisoned".to_string()))?;
        cursors.insert((tenant_id, ministry_id), cursor.clone());
        Ok(cursor)
    }

    fn read(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
    ) -> Result<RotationCursor, RotationStoreError> {
        let cursors = self
            .cursors
            .read()
            .map_err(|_| RotationStoreError::Storage("lock poisoned".to_string()))?;
        cursors
            .get(&(tenant_id, ministry_id))
            .cloned()
            .ok_or(RotationStoreError::NotFound)
    }

    fn advance(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        expected_version: u64,
        consumed: usize,
        appended: Vec<AssignmentRecord>,
    ) -> Result<RotationCursor, RotationStoreError> {
        let mut cursors = self
            .cursors
            .write()
            .map_err(|_| RotationStoreError::Storage("lock poisoned".to_string()))?;

        let cursor = cursors
            .get_mut(&(tenant_id, ministry_id))
            .ok_or(RotationStoreError::NotFound)?;

        if cursor.version != expected_version {
            return Err(RotationStoreError::Concurrency(format!(
                "expected version {expected_version}, found {}",
                cursor.version
            )));
        }

        cursor
            .apply_advance(consumed, appended)
            .map_err(|e| RotationStoreError::InvalidState(e.to_string()))?;

        Ok(cursor.clone())
    }

    fn remove(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
    ) -> Result<(), RotationStoreError> {
        let mut cursors = self
            .cursors
            .write()
            .map_err(|_| RotationStoreError::Storage("lock poisoned".to_string()))?;
        cursors.remove(&(tenant_id, ministry_id));
        Ok(())
    }
}

impl<C> RotationCursorStore for std::sync::Arc<C>
where
    C: RotationCursorStore + ?Sized,
{
    fn initialize(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        pool: Vec<MemberId>,
    ) -> Result<RotationCursor, RotationStoreError> {
        (**self).initialize(tenant_id, ministry_id, pool)
    }

    fn read(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
    ) -> Result<RotationCursor, RotationStoreError> {
        (**self).read(tenant_id, ministry_id)
    }

    fn advance(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        expected_version: u64,
        consumed: usize,
        appended: Vec<AssignmentRecord>,
    ) -> Result<RotationCursor, RotationStoreError> {
        (**self).advance(tenant_id, ministry_id, expected_version, consumed, appended)
    }

    fn remove(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
    ) -> Result<(), RotationStoreError> {
        (**self).remove(tenant_id, ministry_id)
    }
}

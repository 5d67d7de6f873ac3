use std::collections::HashSet;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use flock_core::{Aggregate, AggregateId, AggregateRoot, DomainError, MemberId, TenantId};
use flock_events::Event;

/// Ministry identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinistryId(pub AggregateId);

impl MinistryId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for MinistryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// How often a ministry's duty recurs.
///
/// This is a stored descriptor: the assignment engine receives the target
/// occurrence date as input, so no date arithmetic happens here. Biweekly
/// carries no anchor; the caller driving generation owns the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Recurrence {
    Weekly { weekday: Weekday },
    Biweekly,
    Monthly { day: u8 },
}

impl Recurrence {
    /// Validate the descriptor (monthly day must be a calendar day).
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Recurrence::Monthly { day } if !(1..=31).contains(day) => Err(
                DomainError::validation("monthly recurrence day must be between 1 and 31"),
            ),
            _ => Ok(()),
        }
    }
}

/// Ministry lifecycle status.
///
/// An inactive ministry keeps its definition but cannot generate rosters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinistryStatus {
    Active,
    Inactive,
}

/// Aggregate root: Ministry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ministry {
    id: MinistryId,
    tenant_id: Option<TenantId>,
    name: String,
    duty_roles: Vec<String>,
    member_pool: Vec<MemberId>,
    recurrence: Recurrence,
    status: MinistryStatus,
    version: u64,
    created: bool,
    removed: bool,
}

impl Ministry {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: MinistryId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            duty_roles: Vec::new(),
            member_pool: Vec::new(),
            recurrence: Recurrence::Biweekly,
            status: MinistryStatus::Active,
            version: 0,
            created: false,
            removed: false,
        }
    }

    pub fn id_typed(&self) -> MinistryId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered duty roles; roles are filled in this order.
    pub fn duty_roles(&self) -> &[String] {
        &self.duty_roles
    }

    /// Ordered eligible-member pool; order defines rotation fairness.
    pub fn member_pool(&self) -> &[MemberId] {
        &self.member_pool
    }

    pub fn recurrence(&self) -> Recurrence {
        self.recurrence
    }

    pub fn status(&self) -> MinistryStatus {
        self.status
    }

    pub fn is_defined(&self) -> bool {
        self.created && !self.removed
    }

    /// Invariant check for roster generation: active ministry with at least
    /// one duty role and one eligible member. The error names the specific
    /// missing piece so it can be surfaced verbatim to an administrator.
    pub fn ensure_can_generate(&self) -> Result<(), DomainError> {
        if self.status != MinistryStatus::Active {
            return Err(DomainError::validation(
                "ministry is inactive and cannot generate rosters",
            ));
        }
        if self.duty_roles.is_empty() {
            return Err(DomainError::validation("ministry has no duty roles"));
        }
        if self.member_pool.is_empty() {
            return Err(DomainError::validation("ministry has no eligible members"));
        }
        Ok(())
    }
}

impl AggregateRoot for Ministry {
    type Id = MinistryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: DefineMinistry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefineMinistry {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub name: String,
    pub duty_roles: Vec<String>,
    pub member_pool: Vec<MemberId>,
    pub recurrence: Recurrence,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDutyRoles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDutyRoles {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub duty_roles: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateMemberPool.
///
/// Accepting this command resets rotation fairness: the service layer
/// re-initializes the ministry's rotation cursor at index 0 on every pool
/// edit (documented simplification).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMemberPool {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub member_pool: Vec<MemberId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    /// Optional new name (if None, keep existing).
    pub name: Option<String>,
    /// Optional new recurrence (if None, keep existing).
    pub recurrence: Option<Recurrence>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateMinistry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateMinistry {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    /// Optional human-readable reason for deactivation.
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReactivateMinistry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateMinistry {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveMinistry.
///
/// Removal is terminal; the service layer cascades removal of the
/// ministry's rotation cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveMinistry {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinistryCommand {
    DefineMinistry(DefineMinistry),
    UpdateDutyRoles(UpdateDutyRoles),
    UpdateMemberPool(UpdateMemberPool),
    UpdateDetails(UpdateDetails),
    DeactivateMinistry(DeactivateMinistry),
    ReactivateMinistry(ReactivateMinistry),
    RemoveMinistry(RemoveMinistry),
}

/// Event: MinistryDefined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinistryDefined {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub name: String,
    pub duty_roles: Vec<String>,
    pub member_pool: Vec<MemberId>,
    pub recurrence: Recurrence,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DutyRolesUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyRolesUpdated {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub duty_roles: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MemberPoolUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPoolUpdated {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub member_pool: Vec<MemberId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsUpdated {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub name: String,
    pub recurrence: Recurrence,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MinistryDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinistryDeactivated {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MinistryReactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinistryReactivated {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MinistryRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinistryRemoved {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinistryEvent {
    MinistryDefined(MinistryDefined),
    DutyRolesUpdated(DutyRolesUpdated),
    MemberPoolUpdated(MemberPoolUpdated),
    DetailsUpdated(DetailsUpdated),
    MinistryDeactivated(MinistryDeactivated),
    MinistryReactivated(MinistryReactivated),
    MinistryRemoved(MinistryRemoved),
}

impl Event for MinistryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MinistryEvent::MinistryDefined(_) => "ministries.ministry.defined",
            MinistryEvent::DutyRolesUpdated(_) => "ministries.ministry.duty_roles_updated",
            MinistryEvent::MemberPoolUpdated(_) => "ministries.ministry.member_pool_updated",
            MinistryEvent::DetailsUpdated(_) => "ministries.ministry.details_updated",
            MinistryEvent::MinistryDeactivated(_) => "ministries.ministry.deactivated",
            MinistryEvent::MinistryReactivated(_) => "ministries.ministry.reactivated",
            MinistryEvent::MinistryRemoved(_) => "ministries.ministry.removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MinistryEvent::MinistryDefined(e) => e.occurred_at,
            MinistryEvent::DutyRolesUpdated(e) => e.occurred_at,
            MinistryEvent::MemberPoolUpdated(e) => e.occurred_at,
            MinistryEvent::DetailsUpdated(e) => e.occurred_at,
            MinistryEvent::MinistryDeactivated(e) => e.occurred_at,
            MinistryEvent::MinistryReactivated(e) => e.occurred_at,
            MinistryEvent::MinistryRemoved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Ministry {
    type Command = MinistryCommand;
    type Event = MinistryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MinistryEvent::MinistryDefined(e) => {
                self.id = e.ministry_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.duty_roles = e.duty_roles.clone();
                self.member_pool = e.member_pool.clone();
                self.recurrence = e.recurrence;
                self.status = MinistryStatus::Active;
                self.created = true;
                self.removed = false;
            }
            MinistryEvent::DutyRolesUpdated(e) => {
                self.duty_roles = e.duty_roles.clone();
            }
            MinistryEvent::MemberPoolUpdated(e) => {
                self.member_pool = e.member_pool.clone();
            }
            MinistryEvent::DetailsUpdated(e) => {
                self.name = e.name.clone();
                self.recurrence = e.recurrence;
            }
            MinistryEvent::MinistryDeactivated(_) => {
                self.status = MinistryStatus::Inactive;
            }
            MinistryEvent::MinistryReactivated(_) => {
                self.status = MinistryStatus::Active;
            }
            MinistryEvent::MinistryRemoved(_) => {
                self.removed = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            MinistryCommand::DefineMinistry(cmd) => self.handle_define(cmd),
            MinistryCommand::UpdateDutyRoles(cmd) => self.handle_update_roles(cmd),
            MinistryCommand::UpdateMemberPool(cmd) => self.handle_update_pool(cmd),
            MinistryCommand::UpdateDetails(cmd) => self.handle_update_details(cmd),
            MinistryCommand::DeactivateMinistry(cmd) => self.handle_deactivate(cmd),
            MinistryCommand::ReactivateMinistry(cmd) => self.handle_reactivate(cmd),
            MinistryCommand::RemoveMinistry(cmd) => self.handle_remove(cmd),
        }
    }
}

/// Duplicate member ids make round-robin selection ambiguous, so they are
/// rejected at edit time rather than tolerated by the assignment engine.
fn ensure_pool_unique(pool: &[MemberId]) -> Result<(), DomainError> {
    let mut seen = HashSet::with_capacity(pool.len());
    for member in pool {
        if !seen.insert(*member) {
            return Err(DomainError::validation(format!(
                "member pool contains duplicate member id {member}"
            )));
        }
    }
    Ok(())
}

fn ensure_roles_named(duty_roles: &[String]) -> Result<(), DomainError> {
    if duty_roles.iter().any(|r| r.trim().is_empty()) {
        return Err(DomainError::validation("duty role names cannot be empty"));
    }
    Ok(())
}

impl Ministry {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_ministry_id(&self, ministry_id: MinistryId) -> Result<(), DomainError> {
        if self.id != ministry_id {
            return Err(DomainError::invariant("ministry_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.created || self.removed {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_define(&self, cmd: &DefineMinistry) -> Result<Vec<MinistryEvent>, DomainError> {
        if self.created && !self.removed {
            return Err(DomainError::conflict("ministry already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        ensure_roles_named(&cmd.duty_roles)?;
        ensure_pool_unique(&cmd.member_pool)?;
        cmd.recurrence.validate()?;

        Ok(vec![MinistryEvent::MinistryDefined(MinistryDefined {
            tenant_id: cmd.tenant_id,
            ministry_id: cmd.ministry_id,
            name: cmd.name.clone(),
            duty_roles: cmd.duty_roles.clone(),
            member_pool: cmd.member_pool.clone(),
            recurrence: cmd.recurrence,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_roles(
        &self,
        cmd: &UpdateDutyRoles,
    ) -> Result<Vec<MinistryEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_ministry_id(cmd.ministry_id)?;
        ensure_roles_named(&cmd.duty_roles)?;

        Ok(vec![MinistryEvent::DutyRolesUpdated(DutyRolesUpdated {
            tenant_id: cmd.tenant_id,
            ministry_id: cmd.ministry_id,
            duty_roles: cmd.duty_roles.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_pool(
        &self,
        cmd: &UpdateMemberPool,
    ) -> Result<Vec<MinistryEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_ministry_id(cmd.ministry_id)?;
        ensure_pool_unique(&cmd.member_pool)?;

        Ok(vec![MinistryEvent::MemberPoolUpdated(MemberPoolUpdated {
            tenant_id: cmd.tenant_id,
            ministry_id: cmd.ministry_id,
            member_pool: cmd.member_pool.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(
        &self,
        cmd: &UpdateDetails,
    ) -> Result<Vec<MinistryEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_ministry_id(cmd.ministry_id)?;

        let new_name = cmd.name.clone().unwrap_or_else(|| self.name.clone());
        if new_name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let new_recurrence = cmd.recurrence.unwrap_or(self.recurrence);
        new_recurrence.validate()?;

        Ok(vec![MinistryEvent::DetailsUpdated(DetailsUpdated {
            tenant_id: cmd.tenant_id,
            ministry_id: cmd.ministry_id,
            name: new_name,
            recurrence: new_recurrence,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(
        &self,
        cmd: &DeactivateMinistry,
    ) -> Result<Vec<MinistryEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_ministry_id(cmd.ministry_id)?;

        if self.status == MinistryStatus::Inactive {
            return Err(DomainError::conflict("ministry is already inactive"));
        }

        Ok(vec![MinistryEvent::MinistryDeactivated(
            MinistryDeactivated {
                tenant_id: cmd.tenant_id,
                ministry_id: cmd.ministry_id,
                reason: cmd.reason.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_reactivate(
        &self,
        cmd: &ReactivateMinistry,
    ) -> Result<Vec<MinistryEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_ministry_id(cmd.ministry_id)?;

        if self.status == MinistryStatus::Active {
            return Err(DomainError::conflict("ministry is already active"));
        }

        Ok(vec![MinistryEvent::MinistryReactivated(
            MinistryReactivated {
                tenant_id: cmd.tenant_id,
                ministry_id: cmd.ministry_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_remove(&self, cmd: &RemoveMinistry) -> Result<Vec<MinistryEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_ministry_id(cmd.ministry_id)?;

        Ok(vec![MinistryEvent::MinistryRemoved(MinistryRemoved {
            tenant_id: cmd.tenant_id,
            ministry_id: cmd.ministry_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

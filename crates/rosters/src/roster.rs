use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flock_core::{Aggregate, AggregateId, AggregateRoot, DomainError, MemberId, TenantId};
use flock_events::Event;
use flock_ministries::MinistryId;

/// Roster identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterId(pub AggregateId);

impl RosterId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RosterId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Roster-level status.
///
/// Independent of entry-level status: it is set only by explicit
/// administrator action and never derived from entry completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterStatus {
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
}

impl core::fmt::Display for RosterStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            RosterStatus::Scheduled => "scheduled",
            RosterStatus::Confirmed => "confirmed",
            RosterStatus::Cancelled => "cancelled",
            RosterStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Per-entry confirmation state.
///
/// `pending` is initial; `substituted` and `absent` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Confirmed,
    Substituted,
    Absent,
}

impl EntryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Substituted | EntryStatus::Absent)
    }
}

/// One assignment within a roster.
///
/// `member_name` is denormalized at assignment time for display stability;
/// later renames in the member directory do not rewrite past rosters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub member_id: MemberId,
    pub member_name: String,
    pub duty_role: String,
    /// Optional free-form sub-assignment tag (e.g. "1st service").
    pub sub_assignment: Option<String>,
    pub status: EntryStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Set only when `status` is `substituted`.
    pub replaced_by: Option<MemberId>,
    pub notes: Option<String>,
}

impl RosterEntry {
    pub fn pending(
        member_id: MemberId,
        member_name: impl Into<String>,
        duty_role: impl Into<String>,
        sub_assignment: Option<String>,
    ) -> Self {
        Self {
            member_id,
            member_name: member_name.into(),
            duty_role: duty_role.into(),
            sub_assignment,
            status: EntryStatus::Pending,
            confirmed_at: None,
            replaced_by: None,
            notes: None,
        }
    }
}

/// Entry data supplied at roster creation (engine-drafted or manual).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterDraftEntry {
    pub member_id: MemberId,
    pub member_name: String,
    pub duty_role: String,
    pub sub_assignment: Option<String>,
}

/// Aggregate root: Roster (one dated occurrence of a ministry's duty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    id: RosterId,
    tenant_id: Option<TenantId>,
    ministry_id: Option<MinistryId>,
    occurs_at: DateTime<Utc>,
    status: RosterStatus,
    notes: Option<String>,
    entries: Vec<RosterEntry>,
    version: u64,
    created: bool,
    removed: bool,
}

impl Roster {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: RosterId) -> Self {
        Self {
            id,
            tenant_id: None,
            ministry_id: None,
            occurs_at: DateTime::<Utc>::MIN_UTC,
            status: RosterStatus::Scheduled,
            notes: None,
            entries: Vec::new(),
            version: 0,
            created: false,
            removed: false,
        }
    }

    pub fn id_typed(&self) -> RosterId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn ministry_id(&self) -> Option<MinistryId> {
        self.ministry_id
    }

    pub fn occurs_at(&self) -> DateTime<Utc> {
        self.occurs_at
    }

    pub fn status(&self) -> RosterStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn is_created(&self) -> bool {
        self.created && !self.removed
    }

    /// Distinct member ids currently carried by the roster's entries.
    ///
    /// A member may appear in several entries (more roles than pool members
    /// wraps the rotation), so recipients of roster-wide notifications are
    /// deduplicated here.
    pub fn member_ids(&self) -> Vec<MemberId> {
        let mut ids: Vec<MemberId> = Vec::new();
        for entry in &self.entries {
            if !ids.contains(&entry.member_id) {
                ids.push(entry.member_id);
            }
        }
        ids
    }

    fn first_pending_entry(&self, member_id: MemberId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.member_id == member_id && e.status == EntryStatus::Pending)
    }

    fn has_entry_for(&self, member_id: MemberId) -> bool {
        self.entries.iter().any(|e| e.member_id == member_id)
    }
}

impl AggregateRoot for Roster {
    type Id = RosterId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateRoster.
///
/// Used both by the assignment engine (drafted entries) and by an
/// administrator creating a roster manually, bypassing rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoster {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub ministry_id: MinistryId,
    pub occurs_at: DateTime<Utc>,
    pub entries: Vec<RosterDraftEntry>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmPresence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPresence {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub member_id: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RequestSubstitution.
///
/// Replaces one pending entry's member with another member not already on
/// the roster. The replacement's display name is resolved by the caller
/// before the command is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSubstitution {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub original_member_id: MemberId,
    pub replacement_member_id: MemberId,
    pub replacement_member_name: String,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkAbsent (administrative override).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkAbsent {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub member_id: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeRosterStatus (explicit administrator action).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRosterStatus {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub status: RosterStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateRosterNotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRosterNotes {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveRoster (unconditional deletion, no referential cleanup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRoster {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterCommand {
    CreateRoster(CreateRoster),
    ConfirmPresence(ConfirmPresence),
    RequestSubstitution(RequestSubstitution),
    MarkAbsent(MarkAbsent),
    ChangeRosterStatus(ChangeRosterStatus),
    UpdateRosterNotes(UpdateRosterNotes),
    RemoveRoster(RemoveRoster),
}

/// Event: RosterCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterCreated {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub ministry_id: MinistryId,
    pub occurs_at: DateTime<Utc>,
    pub entries: Vec<RosterDraftEntry>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PresenceConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceConfirmed {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub member_id: MemberId,
    pub confirmed_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SubstitutionApplied.
///
/// Carries both display names so `apply` can annotate entries without
/// reaching back into the member directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionApplied {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub original_member_id: MemberId,
    pub original_member_name: String,
    pub replacement_member_id: MemberId,
    pub replacement_member_name: String,
    pub duty_role: String,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MarkedAbsent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkedAbsent {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub member_id: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RosterStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterStatusChanged {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub status: RosterStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RosterNotesUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterNotesUpdated {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RosterRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRemoved {
    pub tenant_id: TenantId,
    pub roster_id: RosterId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterEvent {
    RosterCreated(RosterCreated),
    PresenceConfirmed(PresenceConfirmed),
    SubstitutionApplied(SubstitutionApplied),
    MarkedAbsent(MarkedAbsent),
    RosterStatusChanged(RosterStatusChanged),
    RosterNotesUpdated(RosterNotesUpdated),
    RosterRemoved(RosterRemoved),
}

impl Event for RosterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RosterEvent::RosterCreated(_) => "rosters.roster.created",
            RosterEvent::PresenceConfirmed(_) => "rosters.roster.presence_confirmed",
            RosterEvent::SubstitutionApplied(_) => "rosters.roster.substitution_applied",
            RosterEvent::MarkedAbsent(_) => "rosters.roster.marked_absent",
            RosterEvent::RosterStatusChanged(_) => "rosters.roster.status_changed",
            RosterEvent::RosterNotesUpdated(_) => "rosters.roster.notes_updated",
            RosterEvent::RosterRemoved(_) => "rosters.roster.removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RosterEvent::RosterCreated(e) => e.occurred_at,
            RosterEvent::PresenceConfirmed(e) => e.occurred_at,
            RosterEvent::SubstitutionApplied(e) => e.occurred_at,
            RosterEvent::MarkedAbsent(e) => e.occurred_at,
            RosterEvent::RosterStatusChanged(e) => e.occurred_at,
            RosterEvent::RosterNotesUpdated(e) => e.occurred_at,
            RosterEvent::RosterRemoved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Roster {
    type Command = RosterCommand;
    type Event = RosterEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RosterEvent::RosterCreated(e) => {
                self.id = e.roster_id;
                self.tenant_id = Some(e.tenant_id);
                self.ministry_id = Some(e.ministry_id);
                self.occurs_at = e.occurs_at;
                self.status = RosterStatus::Scheduled;
                self.notes = e.notes.clone();
                self.entries = e
                    .entries
                    .iter()
                    .map(|d| {
                        RosterEntry::pending(
                            d.member_id,
                            d.member_name.clone(),
                            d.duty_role.clone(),
                            d.sub_assignment.clone(),
                        )
                    })
                    .collect();
                self.created = true;
                self.removed = false;
            }
            RosterEvent::PresenceConfirmed(e) => {
                if let Some(idx) = self.first_pending_entry(e.member_id) {
                    let entry = &mut self.entries[idx];
                    entry.status = EntryStatus::Confirmed;
                    entry.confirmed_at = Some(e.confirmed_at);
                }
            }
            RosterEvent::SubstitutionApplied(e) => {
                if let Some(idx) = self.first_pending_entry(e.original_member_id) {
                    let entry = &mut self.entries[idx];
                    entry.status = EntryStatus::Substituted;
                    entry.replaced_by = Some(e.replacement_member_id);
                    if let Some(reason) = &e.reason {
                        entry.notes = Some(match entry.notes.take() {
                            Some(existing) => format!("{existing}; {reason}"),
                            None => reason.clone(),
                        });
                    }
                }
                let mut replacement = RosterEntry::pending(
                    e.replacement_member_id,
                    e.replacement_member_name.clone(),
                    e.duty_role.clone(),
                    None,
                );
                replacement.notes = Some(format!("substitution for {}", e.original_member_name));
                self.entries.push(replacement);
            }
            RosterEvent::MarkedAbsent(e) => {
                let idx = self.entries.iter().position(|entry| {
                    entry.member_id == e.member_id
                        && matches!(entry.status, EntryStatus::Pending | EntryStatus::Confirmed)
                });
                if let Some(idx) = idx {
                    self.entries[idx].status = EntryStatus::Absent;
                }
            }
            RosterEvent::RosterStatusChanged(e) => {
                self.status = e.status;
            }
            RosterEvent::RosterNotesUpdated(e) => {
                self.notes = e.notes.clone();
            }
            RosterEvent::RosterRemoved(_) => {
                self.removed = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RosterCommand::CreateRoster(cmd) => self.handle_create(cmd),
            RosterCommand::ConfirmPresence(cmd) => self.handle_confirm(cmd),
            RosterCommand::RequestSubstitution(cmd) => self.handle_substitution(cmd),
            RosterCommand::MarkAbsent(cmd) => self.handle_mark_absent(cmd),
            RosterCommand::ChangeRosterStatus(cmd) => self.handle_change_status(cmd),
            RosterCommand::UpdateRosterNotes(cmd) => self.handle_update_notes(cmd),
            RosterCommand::RemoveRoster(cmd) => self.handle_remove(cmd),
        }
    }
}

impl Roster {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_roster_id(&self, roster_id: RosterId) -> Result<(), DomainError> {
        if self.id != roster_id {
            return Err(DomainError::invariant("roster_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.created || self.removed {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateRoster) -> Result<Vec<RosterEvent>, DomainError> {
        if self.created && !self.removed {
            return Err(DomainError::conflict("roster already exists"));
        }

        if cmd
            .entries
            .iter()
            .any(|e| e.member_name.trim().is_empty() || e.duty_role.trim().is_empty())
        {
            return Err(DomainError::validation(
                "roster entries require a member name and a duty role",
            ));
        }

        Ok(vec![RosterEvent::RosterCreated(RosterCreated {
            tenant_id: cmd.tenant_id,
            roster_id: cmd.roster_id,
            ministry_id: cmd.ministry_id,
            occurs_at: cmd.occurs_at,
            entries: cmd.entries.clone(),
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmPresence) -> Result<Vec<RosterEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_roster_id(cmd.roster_id)?;

        if self.first_pending_entry(cmd.member_id).is_none() {
            if self
                .entries
                .iter()
                .any(|e| e.member_id == cmd.member_id && e.status == EntryStatus::Confirmed)
            {
                return Err(DomainError::conflict("presence is already confirmed"));
            }
            if self.has_entry_for(cmd.member_id) {
                return Err(DomainError::conflict("entry is no longer pending"));
            }
            return Err(DomainError::not_found());
        }

        Ok(vec![RosterEvent::PresenceConfirmed(PresenceConfirmed {
            tenant_id: cmd.tenant_id,
            roster_id: cmd.roster_id,
            member_id: cmd.member_id,
            confirmed_at: cmd.occurred_at,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_substitution(
        &self,
        cmd: &RequestSubstitution,
    ) -> Result<Vec<RosterEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_roster_id(cmd.roster_id)?;

        if self.has_entry_for(cmd.replacement_member_id) {
            return Err(DomainError::conflict(
                "replacement member is already assigned on this roster",
            ));
        }

        let Some(idx) = self.first_pending_entry(cmd.original_member_id) else {
            if self.has_entry_for(cmd.original_member_id) {
                return Err(DomainError::conflict("original entry is not pending"));
            }
            return Err(DomainError::not_found());
        };
        let original = &self.entries[idx];

        Ok(vec![RosterEvent::SubstitutionApplied(SubstitutionApplied {
            tenant_id: cmd.tenant_id,
            roster_id: cmd.roster_id,
            original_member_id: cmd.original_member_id,
            original_member_name: original.member_name.clone(),
            replacement_member_id: cmd.replacement_member_id,
            replacement_member_name: cmd.replacement_member_name.clone(),
            duty_role: original.duty_role.clone(),
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_absent(&self, cmd: &MarkAbsent) -> Result<Vec<RosterEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_roster_id(cmd.roster_id)?;

        let markable = self.entries.iter().any(|e| {
            e.member_id == cmd.member_id
                && matches!(e.status, EntryStatus::Pending | EntryStatus::Confirmed)
        });
        if !markable {
            if self.has_entry_for(cmd.member_id) {
                return Err(DomainError::conflict(
                    "entry can no longer be marked absent",
                ));
            }
            return Err(DomainError::not_found());
        }

        Ok(vec![RosterEvent::MarkedAbsent(MarkedAbsent {
            tenant_id: cmd.tenant_id,
            roster_id: cmd.roster_id,
            member_id: cmd.member_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(
        &self,
        cmd: &ChangeRosterStatus,
    ) -> Result<Vec<RosterEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_roster_id(cmd.roster_id)?;

        if self.status == cmd.status {
            return Err(DomainError::conflict(format!(
                "roster is already {}",
                cmd.status
            )));
        }

        Ok(vec![RosterEvent::RosterStatusChanged(RosterStatusChanged {
            tenant_id: cmd.tenant_id,
            roster_id: cmd.roster_id,
            status: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_notes(
        &self,
        cmd: &UpdateRosterNotes,
    ) -> Result<Vec<RosterEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_roster_id(cmd.roster_id)?;

        Ok(vec![RosterEvent::RosterNotesUpdated(RosterNotesUpdated {
            tenant_id: cmd.tenant_id,
            roster_id: cmd.roster_id,
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, cmd: &RemoveRoster) -> Result<Vec<RosterEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_roster_id(cmd.roster_id)?;

        Ok(vec![RosterEvent::RosterRemoved(RosterRemoved {
            tenant_id: cmd.tenant_id,
            roster_id: cmd.roster_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_core::AggregateId;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_roster_id() -> RosterId {
        RosterId::new(AggregateId::new())
    }

    fn test_ministry_id() -> MinistryId {
        MinistryId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn draft(member_id: MemberId, name: &str, role: &str) -> RosterDraftEntry {
        RosterDraftEntry {
            member_id,
            member_name: name.to_string(),
            duty_role: role.to_string(),
            sub_assignment: None,
        }
    }

    fn created_roster(
        entries: Vec<RosterDraftEntry>,
    ) -> (Roster, TenantId, RosterId) {
        let tenant_id = test_tenant_id();
        let roster_id = test_roster_id();
        let mut roster = Roster::empty(roster_id);
        let cmd = CreateRoster {
            tenant_id,
            roster_id,
            ministry_id: test_ministry_id(),
            occurs_at: test_time() + chrono::Duration::days(3),
            entries,
            notes: None,
            occurred_at: test_time(),
        };
        let events = roster.handle(&RosterCommand::CreateRoster(cmd)).unwrap();
        roster.apply(&events[0]);
        (roster, tenant_id, roster_id)
    }

    #[test]
    fn create_roster_starts_all_entries_pending() {
        let member = MemberId::new();
        let (roster, _, _) = created_roster(vec![draft(member, "Ana", "Vocal")]);

        assert_eq!(roster.status(), RosterStatus::Scheduled);
        assert_eq!(roster.entries().len(), 1);
        let entry = &roster.entries()[0];
        assert_eq!(entry.member_id, member);
        assert_eq!(entry.member_name, "Ana");
        assert_eq!(entry.status, EntryStatus::Pending);
        assert!(entry.confirmed_at.is_none());
        assert!(entry.replaced_by.is_none());
    }

    #[test]
    fn confirm_presence_sets_confirmed_at() {
        let member = MemberId::new();
        let (mut roster, tenant_id, roster_id) =
            created_roster(vec![draft(member, "Ana", "Vocal")]);

        let events = roster
            .handle(&RosterCommand::ConfirmPresence(ConfirmPresence {
                tenant_id,
                roster_id,
                member_id: member,
                occurred_at: test_time(),
            }))
            .unwrap();
        roster.apply(&events[0]);

        let entry = &roster.entries()[0];
        assert_eq!(entry.status, EntryStatus::Confirmed);
        assert!(entry.confirmed_at.is_some());
    }

    #[test]
    fn confirm_presence_twice_is_conflict_without_duplicate() {
        let member = MemberId::new();
        let (mut roster, tenant_id, roster_id) =
            created_roster(vec![draft(member, "Ana", "Vocal")]);

        let cmd = ConfirmPresence {
            tenant_id,
            roster_id,
            member_id: member,
            occurred_at: test_time(),
        };
        let events = roster
            .handle(&RosterCommand::ConfirmPresence(cmd.clone()))
            .unwrap();
        roster.apply(&events[0]);

        let err = roster
            .handle(&RosterCommand::ConfirmPresence(cmd))
            .unwrap_err();
        match err {
            DomainError::Conflict(msg) if msg.contains("already confirmed") => {}
            _ => panic!("Expected Conflict error for double confirmation"),
        }
        assert_eq!(roster.entries().len(), 1);
    }

    #[test]
    fn confirm_presence_for_unknown_member_is_not_found() {
        let (roster, tenant_id, roster_id) =
            created_roster(vec![draft(MemberId::new(), "Ana", "Vocal")]);

        let err = roster
            .handle(&RosterCommand::ConfirmPresence(ConfirmPresence {
                tenant_id,
                roster_id,
                member_id: MemberId::new(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::NotFound => {}
            _ => panic!("Expected NotFound for member without an entry"),
        }
    }

    #[test]
    fn confirm_targets_first_pending_entry_when_member_repeats() {
        // More roles than pool members wraps the rotation, so a member can
        // legitimately hold two entries.
        let member = MemberId::new();
        let (mut roster, tenant_id, roster_id) = created_roster(vec![
            draft(member, "Ana", "Vocal"),
            draft(member, "Ana", "Keys"),
        ]);

        let events = roster
            .handle(&RosterCommand::ConfirmPresence(ConfirmPresence {
                tenant_id,
                roster_id,
                member_id: member,
                occurred_at: test_time(),
            }))
            .unwrap();
        roster.apply(&events[0]);

        assert_eq!(roster.entries()[0].status, EntryStatus::Confirmed);
        assert_eq!(roster.entries()[1].status, EntryStatus::Pending);
    }

    #[test]
    fn substitution_swaps_member_and_appends_pending_entry() {
        let original = MemberId::new();
        let replacement = MemberId::new();
        let (mut roster, tenant_id, roster_id) =
            created_roster(vec![draft(original, "Ana", "Vocal")]);

        let events = roster
            .handle(&RosterCommand::RequestSubstitution(RequestSubstitution {
                tenant_id,
                roster_id,
                original_member_id: original,
                replacement_member_id: replacement,
                replacement_member_name: "Davi".to_string(),
                reason: Some("travel".to_string()),
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(events.len(), 1);
        roster.apply(&events[0]);

        assert_eq!(roster.entries().len(), 2);

        let original_entry = &roster.entries()[0];
        assert_eq!(original_entry.status, EntryStatus::Substituted);
        assert_eq!(original_entry.replaced_by, Some(replacement));
        assert_eq!(original_entry.notes.as_deref(), Some("travel"));

        let new_entry = &roster.entries()[1];
        assert_eq!(new_entry.member_id, replacement);
        assert_eq!(new_entry.member_name, "Davi");
        assert_eq!(new_entry.duty_role, "Vocal");
        assert_eq!(new_entry.status, EntryStatus::Pending);
        assert_eq!(new_entry.notes.as_deref(), Some("substitution for Ana"));
    }

    #[test]
    fn substitution_rejects_replacement_already_on_roster() {
        let original = MemberId::new();
        let replacement = MemberId::new();
        let (roster, tenant_id, roster_id) = created_roster(vec![
            draft(original, "Ana", "Vocal"),
            draft(replacement, "Davi", "Keys"),
        ]);
        let before = roster.clone();

        let err = roster
            .handle(&RosterCommand::RequestSubstitution(RequestSubstitution {
                tenant_id,
                roster_id,
                original_member_id: original,
                replacement_member_id: replacement,
                replacement_member_name: "Davi".to_string(),
                reason: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();

        match err {
            DomainError::Conflict(msg) if msg.contains("already assigned") => {}
            _ => panic!("Expected Conflict for replacement already on roster"),
        }
        // Precondition failure leaves the roster untouched.
        assert_eq!(roster, before);
    }

    #[test]
    fn substitution_rejects_non_pending_original() {
        let original = MemberId::new();
        let (mut roster, tenant_id, roster_id) =
            created_roster(vec![draft(original, "Ana", "Vocal")]);

        let events = roster
            .handle(&RosterCommand::ConfirmPresence(ConfirmPresence {
                tenant_id,
                roster_id,
                member_id: original,
                occurred_at: test_time(),
            }))
            .unwrap();
        roster.apply(&events[0]);

        let err = roster
            .handle(&RosterCommand::RequestSubstitution(RequestSubstitution {
                tenant_id,
                roster_id,
                original_member_id: original,
                replacement_member_id: MemberId::new(),
                replacement_member_name: "Davi".to_string(),
                reason: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::Conflict(msg) if msg.contains("not pending") => {}
            _ => panic!("Expected Conflict for non-pending original entry"),
        }
    }

    #[test]
    fn substituted_entry_is_terminal() {
        let original = MemberId::new();
        let replacement = MemberId::new();
        let (mut roster, tenant_id, roster_id) =
            created_roster(vec![draft(original, "Ana", "Vocal")]);

        let events = roster
            .handle(&RosterCommand::RequestSubstitution(RequestSubstitution {
                tenant_id,
                roster_id,
                original_member_id: original,
                replacement_member_id: replacement,
                replacement_member_name: "Davi".to_string(),
                reason: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        roster.apply(&events[0]);

        // The original member's entry left `pending` for good.
        let err = roster
            .handle(&RosterCommand::ConfirmPresence(ConfirmPresence {
                tenant_id,
                roster_id,
                member_id: original,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // The replacement's entry is live.
        let events = roster
            .handle(&RosterCommand::ConfirmPresence(ConfirmPresence {
                tenant_id,
                roster_id,
                member_id: replacement,
                occurred_at: test_time(),
            }))
            .unwrap();
        roster.apply(&events[0]);
        assert_eq!(roster.entries()[1].status, EntryStatus::Confirmed);
    }

    #[test]
    fn mark_absent_overrides_pending_and_confirmed() {
        let first = MemberId::new();
        let second = MemberId::new();
        let (mut roster, tenant_id, roster_id) = created_roster(vec![
            draft(first, "Ana", "Vocal"),
            draft(second, "Davi", "Keys"),
        ]);

        // Absent from pending.
        let events = roster
            .handle(&RosterCommand::MarkAbsent(MarkAbsent {
                tenant_id,
                roster_id,
                member_id: first,
                occurred_at: test_time(),
            }))
            .unwrap();
        roster.apply(&events[0]);
        assert_eq!(roster.entries()[0].status, EntryStatus::Absent);

        // Absent from confirmed.
        let events = roster
            .handle(&RosterCommand::ConfirmPresence(ConfirmPresence {
                tenant_id,
                roster_id,
                member_id: second,
                occurred_at: test_time(),
            }))
            .unwrap();
        roster.apply(&events[0]);
        let events = roster
            .handle(&RosterCommand::MarkAbsent(MarkAbsent {
                tenant_id,
                roster_id,
                member_id: second,
                occurred_at: test_time(),
            }))
            .unwrap();
        roster.apply(&events[0]);
        assert_eq!(roster.entries()[1].status, EntryStatus::Absent);

        // Absent is terminal.
        let err = roster
            .handle(&RosterCommand::MarkAbsent(MarkAbsent {
                tenant_id,
                roster_id,
                member_id: first,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn roster_status_is_independent_of_entries() {
        let member = MemberId::new();
        let (mut roster, tenant_id, roster_id) =
            created_roster(vec![draft(member, "Ana", "Vocal")]);

        let events = roster
            .handle(&RosterCommand::ChangeRosterStatus(ChangeRosterStatus {
                tenant_id,
                roster_id,
                status: RosterStatus::Completed,
                occurred_at: test_time(),
            }))
            .unwrap();
        roster.apply(&events[0]);

        assert_eq!(roster.status(), RosterStatus::Completed);
        // Entry state untouched by the roster-level edit.
        assert_eq!(roster.entries()[0].status, EntryStatus::Pending);

        let err = roster
            .handle(&RosterCommand::ChangeRosterStatus(ChangeRosterStatus {
                tenant_id,
                roster_id,
                status: RosterStatus::Completed,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn removed_roster_rejects_further_commands() {
        let member = MemberId::new();
        let (mut roster, tenant_id, roster_id) =
            created_roster(vec![draft(member, "Ana", "Vocal")]);

        let events = roster
            .handle(&RosterCommand::RemoveRoster(RemoveRoster {
                tenant_id,
                roster_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        roster.apply(&events[0]);
        assert!(!roster.is_created());

        let err = roster
            .handle(&RosterCommand::ConfirmPresence(ConfirmPresence {
                tenant_id,
                roster_id,
                member_id: member,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::NotFound => {}
            _ => panic!("Expected NotFound for removed roster"),
        }
    }

    #[test]
    fn member_ids_deduplicates_repeated_members() {
        let member = MemberId::new();
        let other = MemberId::new();
        let (roster, _, _) = created_roster(vec![
            draft(member, "Ana", "Vocal"),
            draft(member, "Ana", "Keys"),
            draft(other, "Davi", "Sound"),
        ]);

        let ids = roster.member_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&member));
        assert!(ids.contains(&other));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let member = MemberId::new();
        let (roster, tenant_id, roster_id) =
            created_roster(vec![draft(member, "Ana", "Vocal")]);
        let before = roster.clone();

        let cmd = ConfirmPresence {
            tenant_id,
            roster_id,
            member_id: member,
            occurred_at: test_time(),
        };
        let events1 = roster
            .handle(&RosterCommand::ConfirmPresence(cmd.clone()))
            .unwrap();
        let events2 = roster
            .handle(&RosterCommand::ConfirmPresence(cmd))
            .unwrap();

        assert_eq!(roster, before);
        assert_eq!(events1, events2);
    }

    #[test]
    fn version_increments_on_apply() {
        let member = MemberId::new();
        let (mut roster, tenant_id, roster_id) =
            created_roster(vec![draft(member, "Ana", "Vocal")]);
        assert_eq!(roster.version(), 1);

        let events = roster
            .handle(&RosterCommand::ConfirmPresence(ConfirmPresence {
                tenant_id,
                roster_id,
                member_id: member,
                occurred_at: test_time(),
            }))
            .unwrap();
        roster.apply(&events[0]);
        assert_eq!(roster.version(), 2);
    }
}

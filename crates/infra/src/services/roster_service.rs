//! Roster operations: generation, confirmation, substitution, reminders.
//!
//! Every operation is a short-lived unit of work: load a stream, decide,
//! append with an optimistic version check. Notification side effects run
//! *after* the primary append and are best-effort — a failed façade write is
//! logged and swallowed, never rolled back into the state transition. The
//! one deliberate exception is member-name resolution, which aborts before
//! any write: entries are never created with unresolved identities.

use chrono::{DateTime, Utc};
use serde_json::{Value as JsonValue, json};
use tracing::warn;

use flock_core::{AggregateId, DomainError, MemberId, TenantId};
use flock_events::{EventBus, EventEnvelope};
use flock_ministries::{Ministry, MinistryId};
use flock_notifications::{NotificationDispatch, NotificationType, ReminderScheduler};
use flock_rosters::{
    ChangeRosterStatus, ConfirmPresence, CreateRoster, MarkAbsent, RemoveRoster,
    RequestSubstitution, Roster, RosterCommand, RosterDraftEntry, RosterId, RosterStatus,
    UpdateRosterNotes,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::directory::MemberDirectory;
use crate::event_store::EventStore;
use crate::rotation_store::{RotationCursorStore, RotationStoreError};

pub(crate) const ROSTER_AGGREGATE: &str = "rosters.roster";

/// Informational substitution notices go to at most this many other pool
/// members. A load-limiting choice, not a correctness requirement.
const SUBSTITUTION_NOTICE_CAP: usize = 3;

/// Application-level error for roster/ministry operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Command pipeline failure (validation, conflict, not-found, concurrency…).
    Dispatch(DispatchError),
    /// Rotation cursor store failure (missing cursor, CAS conflict, invalid state).
    Rotation(RotationStoreError),
    /// A required external collaborator was unavailable.
    Dependency(String),
}

impl From<DispatchError> for ServiceError {
    fn from(value: DispatchError) -> Self {
        ServiceError::Dispatch(value)
    }
}

impl From<RotationStoreError> for ServiceError {
    fn from(value: RotationStoreError) -> Self {
        ServiceError::Rotation(value)
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        ServiceError::Dispatch(DispatchError::from(value))
    }
}

/// One manually-specified assignment (administrator bypassing rotation).
#[derive(Debug, Clone)]
pub struct ManualAssignment {
    pub member_id: MemberId,
    pub duty_role: String,
    pub sub_assignment: Option<String>,
}

/// Orchestrates the roster lifecycle end to end.
#[derive(Debug)]
pub struct RosterService<S, B, C, D, N> {
    dispatcher: CommandDispatcher<S, B>,
    cursors: C,
    directory: D,
    notifications: N,
}

impl<S, B, C, D, N> RosterService<S, B, C, D, N>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    C: RotationCursorStore,
    D: MemberDirectory,
    N: NotificationDispatch,
{
    pub fn new(
        dispatcher: CommandDispatcher<S, B>,
        cursors: C,
        directory: D,
        notifications: N,
    ) -> Self {
        Self {
            dispatcher,
            cursors,
            directory,
            notifications,
        }
    }

    /// Generate the next roster for a ministry via round-robin rotation.
    ///
    /// Order matters: display names are resolved before any write, the
    /// rotation turn is claimed with a compare-and-swap advance, and only
    /// then is the roster appended. The loser of a concurrent generation
    /// race fails at the CAS, before any roster write, so duplicate
    /// assignments are never persisted.
    pub fn generate_roster(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        occurs_at: DateTime<Utc>,
    ) -> Result<Roster, ServiceError> {
        let ministry = self.load_ministry(tenant_id, ministry_id)?;
        ministry.ensure_can_generate()?;

        let cursor = self.cursors.read(tenant_id, ministry_id)?;
        let plan = cursor.plan(ministry.duty_roles(), occurs_at)?;

        let mut entries = Vec::with_capacity(plan.assignments.len());
        for assignment in &plan.assignments {
            let member_name = self
                .directory
                .resolve_member_name(tenant_id, assignment.member_id)
                .map_err(|e| ServiceError::Dependency(e.to_string()))?;
            entries.push(RosterDraftEntry {
                member_id: assignment.member_id,
                member_name,
                duty_role: assignment.duty_role.clone(),
                sub_assignment: None,
            });
        }

        self.cursors.advance(
            tenant_id,
            ministry_id,
            cursor.version,
            plan.consumed,
            plan.records,
        )?;

        let roster_id = RosterId::new(AggregateId::new());
        self.dispatcher.dispatch(
            tenant_id,
            roster_id.0,
            ROSTER_AGGREGATE,
            RosterCommand::CreateRoster(CreateRoster {
                tenant_id,
                roster_id,
                ministry_id,
                occurs_at,
                entries,
                notes: None,
                occurred_at: Utc::now(),
            }),
            |_, id| Roster::empty(RosterId::new(id)),
        )?;

        let roster = self.get_roster(tenant_id, roster_id)?;
        self.announce_new_roster(&ministry, &roster);
        Ok(roster)
    }

    /// Create a roster from administrator-picked assignments, bypassing
    /// rotation entirely. The cursor is not consulted and not advanced.
    pub fn create_manual_roster(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        occurs_at: DateTime<Utc>,
        assignments: Vec<ManualAssignment>,
        notes: Option<String>,
    ) -> Result<Roster, ServiceError> {
        let ministry = self.load_ministry(tenant_id, ministry_id)?;

        let mut entries = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let member_name = self
                .directory
                .resolve_member_name(tenant_id, assignment.member_id)
                .map_err(|e| ServiceError::Dependency(e.to_string()))?;
            entries.push(RosterDraftEntry {
                member_id: assignment.member_id,
                member_name,
                duty_role: assignment.duty_role,
                sub_assignment: assignment.sub_assignment,
            });
        }

        let roster_id = RosterId::new(AggregateId::new());
        self.dispatcher.dispatch(
            tenant_id,
            roster_id.0,
            ROSTER_AGGREGATE,
            RosterCommand::CreateRoster(CreateRoster {
                tenant_id,
                roster_id,
                ministry_id,
                occurs_at,
                entries,
                notes,
                occurred_at: Utc::now(),
            }),
            |_, id| Roster::empty(RosterId::new(id)),
        )?;

        let roster = self.get_roster(tenant_id, roster_id)?;
        self.announce_new_roster(&ministry, &roster);
        Ok(roster)
    }

    /// Confirm one member's presence on a roster (pending → confirmed).
    pub fn confirm_presence(
        &self,
        tenant_id: TenantId,
        roster_id: RosterId,
        member_id: MemberId,
    ) -> Result<(), ServiceError> {
        self.dispatcher.dispatch(
            tenant_id,
            roster_id.0,
            ROSTER_AGGREGATE,
            RosterCommand::ConfirmPresence(ConfirmPresence {
                tenant_id,
                roster_id,
                member_id,
                occurred_at: Utc::now(),
            }),
            |_, id| Roster::empty(RosterId::new(id)),
        )?;

        // Tell the rest of the roster; their planning depends on it.
        if let Ok(roster) = self.get_roster(tenant_id, roster_id) {
            let member_name = roster
                .entries()
                .iter()
                .find(|e| e.member_id == member_id)
                .map(|e| e.member_name.clone())
                .unwrap_or_default();
            let payload = json!({
                "ministry_id": roster.ministry_id(),
                "roster_id": roster_id,
                "occurs_at": roster.occurs_at(),
                "member_name": member_name,
            });
            let others: Vec<MemberId> = roster
                .member_ids()
                .into_iter()
                .filter(|m| *m != member_id)
                .collect();
            self.notify_each(
                tenant_id,
                &others,
                NotificationType::PresenceConfirmed,
                &payload,
            );
        }

        Ok(())
    }

    /// Replace a pending assignee with another member not already on the
    /// roster.
    ///
    /// Preconditions are checked by the aggregate before any write; on
    /// failure the roster is untouched and a specific conflict is surfaced.
    /// Notifications are fire-and-forget: to the replacement, and an
    /// informational notice to up to three other pool members.
    pub fn request_substitution(
        &self,
        tenant_id: TenantId,
        roster_id: RosterId,
        original_member_id: MemberId,
        replacement_member_id: MemberId,
        reason: Option<String>,
    ) -> Result<(), ServiceError> {
        let replacement_member_name = self
            .directory
            .resolve_member_name(tenant_id, replacement_member_id)
            .map_err(|e| ServiceError::Dependency(e.to_string()))?;

        self.dispatcher.dispatch(
            tenant_id,
            roster_id.0,
            ROSTER_AGGREGATE,
            RosterCommand::RequestSubstitution(RequestSubstitution {
                tenant_id,
                roster_id,
                original_member_id,
                replacement_member_id,
                replacement_member_name,
                reason: reason.clone(),
                occurred_at: Utc::now(),
            }),
            |_, id| Roster::empty(RosterId::new(id)),
        )?;

        if let Ok(roster) = self.get_roster(tenant_id, roster_id) {
            let original_entry = roster
                .entries()
                .iter()
                .find(|e| e.member_id == original_member_id);
            let original_member_name = original_entry
                .map(|e| e.member_name.clone())
                .unwrap_or_default();
            let duty_role = original_entry.map(|e| e.duty_role.clone()).unwrap_or_default();

            let payload = json!({
                "ministry_id": roster.ministry_id(),
                "roster_id": roster_id,
                "occurs_at": roster.occurs_at(),
                "duty_role": duty_role,
                "original_member": original_member_name,
                "reason": reason,
            });

            self.notify_each(
                tenant_id,
                &[replacement_member_id],
                NotificationType::SubstitutionReceived,
                &payload,
            );

            // Informational notice to a few other pool members.
            if let Some(ministry_id) = roster.ministry_id() {
                match self.load_ministry(tenant_id, ministry_id) {
                    Ok(ministry) => {
                        let audience: Vec<MemberId> = ministry
                            .member_pool()
                            .iter()
                            .copied()
                            .filter(|m| {
                                *m != original_member_id && *m != replacement_member_id
                            })
                            .take(SUBSTITUTION_NOTICE_CAP)
                            .collect();
                        self.notify_each(
                            tenant_id,
                            &audience,
                            NotificationType::SubstitutionRequested,
                            &payload,
                        );
                    }
                    Err(err) => warn!(
                        %roster_id,
                        error = ?err,
                        "skipping substitution notices: ministry unavailable"
                    ),
                }
            }
        }

        Ok(())
    }

    /// Administrative override: mark a pending/confirmed entry absent.
    pub fn mark_absent(
        &self,
        tenant_id: TenantId,
        roster_id: RosterId,
        member_id: MemberId,
    ) -> Result<(), ServiceError> {
        self.dispatcher.dispatch(
            tenant_id,
            roster_id.0,
            ROSTER_AGGREGATE,
            RosterCommand::MarkAbsent(MarkAbsent {
                tenant_id,
                roster_id,
                member_id,
                occurred_at: Utc::now(),
            }),
            |_, id| Roster::empty(RosterId::new(id)),
        )?;
        Ok(())
    }

    /// Explicit administrator edit of the roster-level status. Never derived
    /// from entry completion.
    pub fn change_roster_status(
        &self,
        tenant_id: TenantId,
        roster_id: RosterId,
        status: RosterStatus,
    ) -> Result<(), ServiceError> {
        self.dispatcher.dispatch(
            tenant_id,
            roster_id.0,
            ROSTER_AGGREGATE,
            RosterCommand::ChangeRosterStatus(ChangeRosterStatus {
                tenant_id,
                roster_id,
                status,
                occurred_at: Utc::now(),
            }),
            |_, id| Roster::empty(RosterId::new(id)),
        )?;

        if let Ok(roster) = self.get_roster(tenant_id, roster_id) {
            let payload = json!({
                "ministry_id": roster.ministry_id(),
                "roster_id": roster_id,
                "occurs_at": roster.occurs_at(),
                "status": status,
            });
            let notification_type = if status == RosterStatus::Cancelled {
                NotificationType::RosterCancelled
            } else {
                NotificationType::RosterUpdated
            };
            self.notify_each(tenant_id, &roster.member_ids(), notification_type, &payload);
        }

        Ok(())
    }

    pub fn update_roster_notes(
        &self,
        tenant_id: TenantId,
        roster_id: RosterId,
        notes: Option<String>,
    ) -> Result<(), ServiceError> {
        self.dispatcher.dispatch(
            tenant_id,
            roster_id.0,
            ROSTER_AGGREGATE,
            RosterCommand::UpdateRosterNotes(UpdateRosterNotes {
                tenant_id,
                roster_id,
                notes,
                occurred_at: Utc::now(),
            }),
            |_, id| Roster::empty(RosterId::new(id)),
        )?;

        if let Ok(roster) = self.get_roster(tenant_id, roster_id) {
            let payload = json!({
                "ministry_id": roster.ministry_id(),
                "roster_id": roster_id,
                "occurs_at": roster.occurs_at(),
            });
            self.notify_each(
                tenant_id,
                &roster.member_ids(),
                NotificationType::RosterUpdated,
                &payload,
            );
        }

        Ok(())
    }

    /// Unconditional deletion; no referential cleanup elsewhere.
    pub fn remove_roster(
        &self,
        tenant_id: TenantId,
        roster_id: RosterId,
    ) -> Result<(), ServiceError> {
        self.dispatcher.dispatch(
            tenant_id,
            roster_id.0,
            ROSTER_AGGREGATE,
            RosterCommand::RemoveRoster(RemoveRoster {
                tenant_id,
                roster_id,
                occurred_at: Utc::now(),
            }),
            |_, id| Roster::empty(RosterId::new(id)),
        )?;
        Ok(())
    }

    pub fn get_roster(
        &self,
        tenant_id: TenantId,
        roster_id: RosterId,
    ) -> Result<Roster, ServiceError> {
        let (roster, _) = self
            .dispatcher
            .load(tenant_id, roster_id.0, |_, id| {
                Roster::empty(RosterId::new(id))
            })?;
        if !roster.is_created() {
            return Err(ServiceError::Dispatch(DispatchError::NotFound));
        }
        Ok(roster)
    }

    fn load_ministry(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
    ) -> Result<Ministry, ServiceError> {
        let (ministry, _) = self
            .dispatcher
            .load(tenant_id, ministry_id.0, |_, id| {
                Ministry::empty(MinistryId::new(id))
            })?;
        if !ministry.is_defined() {
            return Err(ServiceError::Dispatch(DispatchError::NotFound));
        }
        Ok(ministry)
    }

    /// Announce a freshly created roster and record its reminders.
    /// Best-effort throughout.
    fn announce_new_roster(&self, ministry: &Ministry, roster: &Roster) {
        let Some(tenant_id) = roster.tenant_id() else {
            return;
        };
        let roster_id = roster.id_typed();

        for member_id in roster.member_ids() {
            let duty_roles: Vec<&str> = roster
                .entries()
                .iter()
                .filter(|e| e.member_id == member_id)
                .map(|e| e.duty_role.as_str())
                .collect();
            let payload = json!({
                "ministry": ministry.name(),
                "ministry_id": ministry.id_typed(),
                "roster_id": roster_id,
                "occurs_at": roster.occurs_at(),
                "duty_roles": duty_roles,
            });
            if let Err(err) = self.notifications.create_notification(
                tenant_id,
                member_id,
                NotificationType::NewRoster,
                payload,
            ) {
                warn!(%roster_id, %member_id, error = %err, "failed to send new-roster notification");
            }
        }

        let reminder_payload = json!({
            "ministry": ministry.name(),
            "ministry_id": ministry.id_typed(),
            "roster_id": roster_id,
            "occurs_at": roster.occurs_at(),
        });
        ReminderScheduler::new(&self.notifications).schedule_roster_reminders(
            tenant_id,
            &roster.member_ids(),
            roster.occurs_at(),
            &reminder_payload,
            Utc::now(),
        );
    }

    fn notify_each(
        &self,
        tenant_id: TenantId,
        recipients: &[MemberId],
        notification_type: NotificationType,
        payload: &JsonValue,
    ) {
        for recipient in recipients {
            if let Err(err) = self.notifications.create_notification(
                tenant_id,
                *recipient,
                notification_type,
                payload.clone(),
            ) {
                warn!(
                    recipient = %recipient,
                    %notification_type,
                    error = %err,
                    "failed to send notification"
                );
            }
        }
    }
}

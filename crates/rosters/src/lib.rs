//! `flock-rosters` — duty-roster rotation and confirmation lifecycle.
//!
//! Two halves:
//!
//! - [`rotation`]: the per-ministry rotation cursor (a versioned record the
//!   store updates with compare-and-swap) and the round-robin assignment
//!   engine that drafts one entry per duty role.
//! - [`roster`]: the `Roster` aggregate — one dated occurrence of a
//!   ministry's duty, holding the assignee entries and their confirmation
//!   state machine (pending → confirmed / substituted / absent).

pub mod roster;
pub mod rotation;

pub use roster::{
    ChangeRosterStatus, ConfirmPresence, CreateRoster, EntryStatus, MarkAbsent, MarkedAbsent,
    PresenceConfirmed, RemoveRoster, RequestSubstitution, Roster, RosterCommand, RosterCreated,
    RosterDraftEntry, RosterEntry, RosterEvent, RosterId, RosterNotesUpdated, RosterRemoved,
    RosterStatus, RosterStatusChanged, SubstitutionApplied, UpdateRosterNotes,
};
pub use rotation::{AssignmentRecord, DraftAssignment, RotationCursor, RotationPlan};

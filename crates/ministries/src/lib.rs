//! `flock-ministries` — the ministry registry.
//!
//! A ministry is a recurring duty group (worship team, ushers, nursery…)
//! with an ordered list of duty roles, an ordered pool of eligible members,
//! and a recurrence descriptor. The pool order is significant: it defines
//! rotation fairness for the roster assignment engine.

pub mod ministry;

pub use ministry::{
    DeactivateMinistry, DefineMinistry, DetailsUpdated, DutyRolesUpdated, MemberPoolUpdated,
    Ministry, MinistryCommand, MinistryDeactivated, MinistryDefined, MinistryEvent, MinistryId,
    MinistryReactivated, MinistryRemoved, MinistryStatus, ReactivateMinistry, Recurrence,
    RemoveMinistry, UpdateDetails, UpdateDutyRoles, UpdateMemberPool,
};

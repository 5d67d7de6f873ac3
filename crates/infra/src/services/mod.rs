//! Application services: the operation surface consumed by the
//! administration/UI layers.

mod ministry_service;
mod roster_service;

pub use ministry_service::MinistryService;
pub use roster_service::{ManualAssignment, RosterService, ServiceError};

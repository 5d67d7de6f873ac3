//! Ministry registry operations.
//!
//! Thin orchestration over the command dispatcher plus the one cross-store
//! rule the registry owns: the rotation cursor follows the member pool.
//! Every accepted pool edit re-initializes the cursor (index 0, empty
//! history) and ministry removal cascades to cursor removal.

use serde_json::Value as JsonValue;

use flock_core::{DomainError, TenantId};
use flock_events::{EventBus, EventEnvelope};
use flock_ministries::{
    DeactivateMinistry, DefineMinistry, Ministry, MinistryCommand, MinistryId, ReactivateMinistry,
    RemoveMinistry, UpdateDetails, UpdateDutyRoles, UpdateMemberPool,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::rotation_store::RotationCursorStore;

use super::roster_service::ServiceError;

pub(crate) const MINISTRY_AGGREGATE: &str = "ministries.ministry";

/// Create/update/remove ministries and keep their rotation cursors in step.
#[derive(Debug)]
pub struct MinistryService<S, B, C> {
    dispatcher: CommandDispatcher<S, B>,
    cursors: C,
}

impl<S, B, C> MinistryService<S, B, C>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    C: RotationCursorStore,
{
    pub fn new(dispatcher: CommandDispatcher<S, B>, cursors: C) -> Self {
        Self { dispatcher, cursors }
    }

    pub fn define_ministry(&self, cmd: DefineMinistry) -> Result<MinistryId, ServiceError> {
        let tenant_id = cmd.tenant_id;
        let ministry_id = cmd.ministry_id;
        let pool = cmd.member_pool.clone();

        self.dispatcher.dispatch(
            tenant_id,
            ministry_id.0,
            MINISTRY_AGGREGATE,
            MinistryCommand::DefineMinistry(cmd),
            |_, id| Ministry::empty(MinistryId::new(id)),
        )?;

        self.cursors.initialize(tenant_id, ministry_id, pool)?;
        Ok(ministry_id)
    }

    pub fn update_duty_roles(&self, cmd: UpdateDutyRoles) -> Result<(), ServiceError> {
        self.dispatcher.dispatch(
            cmd.tenant_id,
            cmd.ministry_id.0,
            MINISTRY_AGGREGATE,
            MinistryCommand::UpdateDutyRoles(cmd),
            |_, id| Ministry::empty(MinistryId::new(id)),
        )?;
        Ok(())
    }

    /// Pool edits reset rotation fairness: the cursor restarts at index 0.
    pub fn update_member_pool(&self, cmd: UpdateMemberPool) -> Result<(), ServiceError> {
        let tenant_id = cmd.tenant_id;
        let ministry_id = cmd.ministry_id;
        let pool = cmd.member_pool.clone();

        self.dispatcher.dispatch(
            tenant_id,
            ministry_id.0,
            MINISTRY_AGGREGATE,
            MinistryCommand::UpdateMemberPool(cmd),
            |_, id| Ministry::empty(MinistryId::new(id)),
        )?;

        self.cursors.initialize(tenant_id, ministry_id, pool)?;
        Ok(())
    }

    pub fn update_details(&self, cmd: UpdateDetails) -> Result<(), ServiceError> {
        self.dispatcher.dispatch(
            cmd.tenant_id,
            cmd.ministry_id.0,
            MINISTRY_AGGREGATE,
            MinistryCommand::UpdateDetails(cmd),
            |_, id| Ministry::empty(MinistryId::new(id)),
        )?;
        Ok(())
    }

    pub fn deactivate_ministry(&self, cmd: DeactivateMinistry) -> Result<(), ServiceError> {
        self.dispatcher.dispatch(
            cmd.tenant_id,
            cmd.ministry_id.0,
            MINISTRY_AGGREGATE,
            MinistryCommand::DeactivateMinistry(cmd),
            |_, id| Ministry::empty(MinistryId::new(id)),
        )?;
        Ok(())
    }

    pub fn reactivate_ministry(&self, cmd: ReactivateMinistry) -> Result<(), ServiceError> {
        self.dispatcher.dispatch(
            cmd.tenant_id,
            cmd.ministry_id.0,
            MINISTRY_AGGREGATE,
            MinistryCommand::ReactivateMinistry(cmd),
            |_, id| Ministry::empty(MinistryId::new(id)),
        )?;
        Ok(())
    }

    /// Removal cascades: the ministry's rotation cursor goes with it.
    pub fn remove_ministry(&self, cmd: RemoveMinistry) -> Result<(), ServiceError> {
        let tenant_id = cmd.tenant_id;
        let ministry_id = cmd.ministry_id;

        self.dispatcher.dispatch(
            tenant_id,
            ministry_id.0,
            MINISTRY_AGGREGATE,
            MinistryCommand::RemoveMinistry(cmd),
            |_, id| Ministry::empty(MinistryId::new(id)),
        )?;

        self.cursors.remove(tenant_id, ministry_id)?;
        Ok(())
    }

    pub fn get_ministry(
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
            return Err(ServiceError::Dispatch(DispatchError::from(
                DomainError::not_found(),
            )));
        }
        Ok(ministry)
    }
}

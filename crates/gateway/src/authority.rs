//! Seams between the gateway and the policy engine.
//!
//! The gateway only needs two capabilities: something that decides
//! ([`Authority`]) and something that can vouch for a previously scheduled call
//! ([`Scheduler`]). Both are traits so gateways can be tested with stand-ins and
//! pointed at any authority implementation.

use std::sync::Arc;

use accessgate_core::{AccountId, OperationId, TargetId};
use accessgate_policy::{AccessError, AccessManager, Decision, RoleAdministration};

/// Decision oracle consulted on every call.
pub trait Authority {
    fn decide(
        &self,
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    ) -> Result<Decision, AccessError>;
}

impl<R> Authority for AccessManager<R>
where
    R: RoleAdministration,
{
    fn decide(
        &self,
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    ) -> Result<Decision, AccessError> {
        AccessManager::decide(self, caller, target, operation)
    }
}

impl<A> Authority for Arc<A>
where
    A: Authority + ?Sized,
{
    fn decide(
        &self,
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    ) -> Result<Decision, AccessError> {
        (**self).decide(caller, target, operation)
    }
}

impl<A> Authority for &A
where
    A: Authority + ?Sized,
{
    fn decide(
        &self,
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    ) -> Result<Decision, AccessError> {
        (**self).decide(caller, target, operation)
    }
}

/// External time-delay scheduler.
///
/// Scheduling itself happens elsewhere; the gateway only asks whether a
/// matching, matured schedule exists for this exact call and, if so, consumes
/// it so it cannot be replayed.
pub trait Scheduler {
    fn consume_scheduled(
        &self,
        caller: AccountId,
        target: TargetId,
        call: &[u8],
    ) -> Result<bool, AccessError>;
}

/// Scheduler for deployments without one: nothing is ever scheduled, so every
/// delayed allow is rejected with `SchedulingRequired`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScheduler;

impl Scheduler for NoScheduler {
    fn consume_scheduled(
        &self,
        _caller: AccountId,
        _target: TargetId,
        _call: &[u8],
    ) -> Result<bool, AccessError> {
        Ok(false)
    }
}

impl<S> Scheduler for Arc<S>
where
    S: Scheduler + ?Sized,
{
    fn consume_scheduled(
        &self,
        caller: AccountId,
        target: TargetId,
        call: &[u8],
    ) -> Result<bool, AccessError> {
        (**self).consume_scheduled(caller, target, call)
    }
}

use std::time::Duration;

use thiserror::Error;

use accessgate_core::{AccountId, OperationId, RoleId, TargetId};

/// Authorization failures surfaced by the engine.
///
/// There is intentionally no "configuration conflict" variant: overwriting an
/// operation's role is always legal and silently replaces the previous value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The evaluator denied the call. Not retried; needs a configuration change.
    #[error("unauthorized: {caller} may not call {operation} on {target}")]
    Unauthorized {
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    },

    /// The target is closed; every call is denied regardless of role.
    #[error("target {0} is closed")]
    TargetClosed(TargetId),

    /// The caller holds the role with an execution delay and must go through
    /// the external scheduler first.
    #[error("scheduling required: {caller} must schedule {operation} on {target} ({delay:?} delay)")]
    SchedulingRequired {
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
        delay: Duration,
    },

    /// Membership of this role is implicit and cannot be granted or revoked.
    #[error("role {0} is locked")]
    LockedRole(RoleId),

    /// The target cannot be closed (it hosts the engine's own administration).
    #[error("target {0} is locked")]
    LockedTarget(TargetId),

    /// The role registry could not answer a membership query.
    #[error("role registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Shared state lock was poisoned by a panicking writer.
    #[error("policy state lock poisoned")]
    Poisoned,
}

impl AccessError {
    /// Caller the rejection is attributed to, when the failure is caller-specific.
    pub fn caller(&self) -> Option<AccountId> {
        match self {
            AccessError::Unauthorized { caller, .. }
            | AccessError::SchedulingRequired { caller, .. } => Some(*caller),
            _ => None,
        }
    }

    /// `true` for the variants produced by a denied or deferred evaluation.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AccessError::Unauthorized { .. }
                | AccessError::TargetClosed(_)
                | AccessError::SchedulingRequired { .. }
        )
    }
}

//! Role Registry: role membership and per-member execution delay.
//!
//! The engine only ever asks one question of the registry (`has_role`). The
//! in-memory implementation below also carries the bookkeeping an operator
//! needs (grant, revoke, labels, member listings).

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use accessgate_core::{AccountId, RoleId};

use crate::error::AccessError;

/// Answer to a membership query.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub is_member: bool,
    /// Delay the member must wait (via an external scheduler) before a call
    /// requiring this role may execute. Zero means immediate.
    pub execution_delay: Duration,
}

impl Membership {
    pub const NONE: Membership = Membership {
        is_member: false,
        execution_delay: Duration::ZERO,
    };

    pub const fn immediate() -> Self {
        Self {
            is_member: true,
            execution_delay: Duration::ZERO,
        }
    }

    pub const fn delayed(delay: Duration) -> Self {
        Self {
            is_member: true,
            execution_delay: delay,
        }
    }
}

/// Membership oracle consulted by the evaluator.
pub trait RoleRegistry {
    fn has_role(&self, role: RoleId, account: AccountId) -> Result<Membership, AccessError>;
}

impl<R> RoleRegistry for &R
where
    R: RoleRegistry + ?Sized,
{
    fn has_role(&self, role: RoleId, account: AccountId) -> Result<Membership, AccessError> {
        (**self).has_role(role, account)
    }
}

impl<R> RoleRegistry for std::sync::Arc<R>
where
    R: RoleRegistry + ?Sized,
{
    fn has_role(&self, role: RoleId, account: AccountId) -> Result<Membership, AccessError> {
        (**self).has_role(role, account)
    }
}

/// Write side of a role registry, used by the access manager's gated
/// administrative operations.
pub trait RoleAdministration: RoleRegistry {
    /// Returns `true` if the account was not a member before.
    fn grant_role(
        &self,
        role: RoleId,
        account: AccountId,
        execution_delay: Duration,
    ) -> Result<bool, AccessError>;

    /// Returns `true` if a grant was removed.
    fn revoke_role(&self, role: RoleId, account: AccountId) -> Result<bool, AccessError>;

    fn label_role(&self, role: RoleId, label: String) -> Result<(), AccessError>;
}

/// A single (role, account) grant, for audit listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleGrant {
    pub account: AccountId,
    pub execution_delay: Duration,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RegistryState {
    grants: HashMap<RoleId, HashMap<AccountId, RoleGrant>>,
    labels: HashMap<RoleId, String>,
}

/// In-memory role registry.
///
/// `PUBLIC` membership is implicit for every account and cannot be granted or
/// revoked.
#[derive(Debug, Default)]
pub struct InMemoryRoleRegistry {
    state: RwLock<RegistryState>,
}

impl InMemoryRoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `role` to `account`. Re-granting replaces the execution delay.
    ///
    /// Returns `true` if the account was not a member before.
    pub fn grant_role(
        &self,
        role: RoleId,
        account: AccountId,
        execution_delay: Duration,
    ) -> Result<bool, AccessError> {
        if role.is_public() {
            return Err(AccessError::LockedRole(role));
        }
        let mut state = self.state.write().map_err(|_| AccessError::Poisoned)?;
        let previous = state.grants.entry(role).or_default().insert(
            account,
            RoleGrant {
                account,
                execution_delay,
                granted_at: Utc::now(),
            },
        );
        Ok(previous.is_none())
    }

    /// Revoke `role` from `account`. Returns `true` if a grant was removed.
    pub fn revoke_role(&self, role: RoleId, account: AccountId) -> Result<bool, AccessError> {
        if role.is_public() {
            return Err(AccessError::LockedRole(role));
        }
        let mut state = self.state.write().map_err(|_| AccessError::Poisoned)?;
        let removed = state
            .grants
            .get_mut(&role)
            .map(|members| members.remove(&account).is_some())
            .unwrap_or(false);
        Ok(removed)
    }

    /// Current members of `role`, ordered by account id.
    pub fn members(&self, role: RoleId) -> Result<Vec<RoleGrant>, AccessError> {
        let state = self.state.read().map_err(|_| AccessError::Poisoned)?;
        let mut members: Vec<RoleGrant> = state
            .grants
            .get(&role)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        members.sort_by_key(|g| g.account);
        Ok(members)
    }

    /// Attach a human-readable label to a role (display only).
    pub fn label_role(&self, role: RoleId, label: impl Into<String>) -> Result<(), AccessError> {
        let mut state = self.state.write().map_err(|_| AccessError::Poisoned)?;
        state.labels.insert(role, label.into());
        Ok(())
    }

    pub fn role_label(&self, role: RoleId) -> Result<Option<String>, AccessError> {
        let state = self.state.read().map_err(|_| AccessError::Poisoned)?;
        Ok(state.labels.get(&role).cloned())
    }
}

impl RoleRegistry for InMemoryRoleRegistry {
    fn has_role(&self, role: RoleId, account: AccountId) -> Result<Membership, AccessError> {
        if role.is_public() {
            return Ok(Membership::immediate());
        }
        let state = self.state.read().map_err(|_| AccessError::Poisoned)?;
        Ok(state
            .grants
            .get(&role)
            .and_then(|members| members.get(&account))
            .map(|g| Membership::delayed(g.execution_delay))
            .unwrap_or(Membership::NONE))
    }
}

impl RoleAdministration for InMemoryRoleRegistry {
    fn grant_role(
        &self,
        role: RoleId,
        account: AccountId,
        execution_delay: Duration,
    ) -> Result<bool, AccessError> {
        InMemoryRoleRegistry::grant_role(self, role, account, execution_delay)
    }

    fn revoke_role(&self, role: RoleId, account: AccountId) -> Result<bool, AccessError> {
        InMemoryRoleRegistry::revoke_role(self, role, account)
    }

    fn label_role(&self, role: RoleId, label: String) -> Result<(), AccessError> {
        InMemoryRoleRegistry::label_role(self, role, label)
    }
}

//! Policy Store: per-target operation roles and the closed flag.
//!
//! ## Model
//!
//! ```text
//! target ─┬─ closed: bool
//!         └─ operations: op ─→ { required_role, configured }
//! ```
//!
//! - An untouched target is open and every operation is unconfigured.
//! - `configured == false` means the effective role is `PUBLIC`, whatever stale
//!   role value is stored underneath.
//! - Writing `PUBLIC` clears `configured`; writing any other role sets it.
//!
//! The store never evaluates the closed flag against roles; that happens in the
//! evaluator. Entries are never removed.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;

use accessgate_core::{OperationId, RoleId, TargetId};

use crate::error::AccessError;

/// Stored policy record for one (target, operation) key.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct OperationPolicy {
    required_role: RoleId,
    configured: bool,
}

#[derive(Debug, Default, Clone)]
struct TargetPolicy {
    closed: bool,
    operations: HashMap<OperationId, OperationPolicy>,
}

/// One consistent read of everything the evaluator needs for a key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyLookup {
    pub closed: bool,
    /// Effective role: `PUBLIC` whenever `configured` is false.
    pub required_role: RoleId,
    pub configured: bool,
}

impl PolicyLookup {
    /// Default state of a key nobody has written.
    pub const UNTOUCHED: PolicyLookup = PolicyLookup {
        closed: false,
        required_role: RoleId::PUBLIC,
        configured: false,
    };
}

/// Read side of the policy store, as consumed by the evaluator.
///
/// Implementors only provide [`PolicySource::lookup`]; the accessors are derived
/// from it so all of them observe the same snapshot semantics.
pub trait PolicySource {
    fn lookup(&self, target: TargetId, operation: OperationId) -> Result<PolicyLookup, AccessError>;

    fn required_role(&self, target: TargetId, operation: OperationId) -> Result<RoleId, AccessError> {
        Ok(self.lookup(target, operation)?.required_role)
    }

    fn is_configured(&self, target: TargetId, operation: OperationId) -> Result<bool, AccessError> {
        Ok(self.lookup(target, operation)?.configured)
    }

    fn is_closed(&self, target: TargetId) -> Result<bool, AccessError>;
}

impl<P> PolicySource for &P
where
    P: PolicySource + ?Sized,
{
    fn lookup(&self, target: TargetId, operation: OperationId) -> Result<PolicyLookup, AccessError> {
        (**self).lookup(target, operation)
    }

    fn is_closed(&self, target: TargetId) -> Result<bool, AccessError> {
        (**self).is_closed(target)
    }
}

/// In-memory policy store.
///
/// A single lock covers all targets, so a lookup never observes a torn write
/// between `configured` and `required_role` or between a key and its target's
/// closed flag. Writers on the same key are linearized (last writer wins).
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    targets: RwLock<HashMap<TargetId, TargetPolicy>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `role` to every operation in `operations`.
    ///
    /// This is the only mutation path for operation roles. Passing `PUBLIC`
    /// "unsets" the operation: `configured` becomes false. Previous values are
    /// overwritten without history.
    pub fn set_required_role<I>(
        &self,
        target: TargetId,
        operations: I,
        role: RoleId,
    ) -> Result<usize, AccessError>
    where
        I: IntoIterator<Item = OperationId>,
    {
        let mut targets = self.targets.write().map_err(|_| AccessError::Poisoned)?;
        let entry = targets.entry(target).or_default();

        let record = OperationPolicy {
            required_role: role,
            configured: !role.is_public(),
        };

        let mut written = 0;
        for op in operations {
            entry.operations.insert(op, record);
            written += 1;
        }
        Ok(written)
    }

    /// Toggle the closed flag. Operation roles are untouched.
    pub fn set_closed(&self, target: TargetId, closed: bool) -> Result<(), AccessError> {
        let mut targets = self.targets.write().map_err(|_| AccessError::Poisoned)?;
        targets.entry(target).or_default().closed = closed;
        Ok(())
    }

    /// Explicitly configured operations of `target`, sorted by operation id.
    pub fn configured_operations(
        &self,
        target: TargetId,
    ) -> Result<Vec<(OperationId, RoleId)>, AccessError> {
        let targets = self.targets.read().map_err(|_| AccessError::Poisoned)?;
        let mut ops: Vec<(OperationId, RoleId)> = targets
            .get(&target)
            .map(|t| {
                t.operations
                    .iter()
                    .filter(|(_, p)| p.configured)
                    .map(|(op, p)| (*op, p.required_role))
                    .collect()
            })
            .unwrap_or_default();
        ops.sort();
        Ok(ops)
    }
}

impl PolicySource for InMemoryPolicyStore {
    fn lookup(&self, target: TargetId, operation: OperationId) -> Result<PolicyLookup, AccessError> {
        let targets = self.targets.read().map_err(|_| AccessError::Poisoned)?;

        let Some(entry) = targets.get(&target) else {
            return Ok(PolicyLookup::UNTOUCHED);
        };

        let (required_role, configured) = match entry.operations.get(&operation) {
            Some(p) if p.configured => (p.required_role, true),
            _ => (RoleId::PUBLIC, false),
        };

        Ok(PolicyLookup {
            closed: entry.closed,
            required_role,
            configured,
        })
    }

    fn is_closed(&self, target: TargetId) -> Result<bool, AccessError> {
        let targets = self.targets.read().map_err(|_| AccessError::Poisoned)?;
        Ok(targets.get(&target).map(|t| t.closed).unwrap_or(false))
    }
}

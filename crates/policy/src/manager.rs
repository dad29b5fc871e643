//! Self-hosted access manager.
//!
//! The manager owns the policy store and the role registry, and is itself a
//! target: every administrative operation is identified by an [`OperationId`]
//! on the manager's own [`TargetId`] and is checked through the very same
//! evaluator that guards every other target. There is no privileged bypass.
//!
//! ```text
//! admin call ─→ evaluate(caller, manager, op) ─┬─ ImmediateAllow → mutate store/registry
//!                                               ├─ DelayedAllow   → SchedulingRequired
//!                                               └─ Deny           → Unauthorized / TargetClosed
//! ```

use std::time::Duration;

use accessgate_core::{AccountId, OperationId, RoleId, TargetId};

use crate::error::AccessError;
use crate::evaluate::{Decision, DecisionExplanation, Evaluator, Verdict};
use crate::registry::{InMemoryRoleRegistry, RoleAdministration, RoleGrant};
use crate::store::{InMemoryPolicyStore, PolicySource};

/// Administrative entry points of the manager.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AdminOperation {
    SetRequiredRole,
    SetClosed,
    GrantRole,
    RevokeRole,
    LabelRole,
    GetRequiredRole,
    IsConfigured,
    IsClosed,
    ConfiguredOperations,
    RoleMembers,
}

impl AdminOperation {
    pub const ALL: [AdminOperation; 10] = [
        AdminOperation::SetRequiredRole,
        AdminOperation::SetClosed,
        AdminOperation::GrantRole,
        AdminOperation::RevokeRole,
        AdminOperation::LabelRole,
        AdminOperation::GetRequiredRole,
        AdminOperation::IsConfigured,
        AdminOperation::IsClosed,
        AdminOperation::ConfiguredOperations,
        AdminOperation::RoleMembers,
    ];

    pub fn signature(self) -> &'static str {
        match self {
            AdminOperation::SetRequiredRole => "setRequiredRole(target,operation[],role)",
            AdminOperation::SetClosed => "setClosed(target,bool)",
            AdminOperation::GrantRole => "grantRole(role,account,delay)",
            AdminOperation::RevokeRole => "revokeRole(role,account)",
            AdminOperation::LabelRole => "labelRole(role,string)",
            AdminOperation::GetRequiredRole => "getRequiredRole(target,operation)",
            AdminOperation::IsConfigured => "isConfigured(target,operation)",
            AdminOperation::IsClosed => "isClosed(target)",
            AdminOperation::ConfiguredOperations => "configuredOperations(target)",
            AdminOperation::RoleMembers => "roleMembers(role)",
        }
    }

    pub fn id(self) -> OperationId {
        OperationId::from_signature(self.signature())
    }
}

/// Central authority: policy store + role registry + self-hosted administration.
///
/// Share it behind an `Arc` between every gateway and operator surface; all
/// state is internally synchronized.
#[derive(Debug)]
pub struct AccessManager<R = InMemoryRoleRegistry> {
    id: TargetId,
    store: InMemoryPolicyStore,
    registry: R,
}

impl AccessManager<InMemoryRoleRegistry> {
    /// Bootstrap a manager with an in-memory registry and `initial_admin`
    /// holding `ADMIN`.
    pub fn new(initial_admin: AccountId) -> Result<Self, AccessError> {
        Self::with_registry(InMemoryRoleRegistry::new(), initial_admin)
    }

    /// Current members of `role` (gated like the other queries).
    pub fn members(
        &self,
        caller: AccountId,
        role: RoleId,
    ) -> Result<Vec<RoleGrant>, AccessError> {
        self.authorize(caller, AdminOperation::RoleMembers)?;
        self.registry.members(role)
    }
}

impl<R> AccessManager<R>
where
    R: RoleAdministration,
{
    /// Bootstrap a manager over an existing registry.
    ///
    /// `initial_admin` is granted `ADMIN` without delay and every
    /// [`AdminOperation`] on the manager's own target is restricted to `ADMIN`.
    pub fn with_registry(registry: R, initial_admin: AccountId) -> Result<Self, AccessError> {
        let manager = Self {
            id: TargetId::new(),
            store: InMemoryPolicyStore::new(),
            registry,
        };

        manager
            .registry
            .grant_role(RoleId::ADMIN, initial_admin, Duration::ZERO)?;
        manager.store.set_required_role(
            manager.id,
            AdminOperation::ALL.iter().map(|op| op.id()),
            RoleId::ADMIN,
        )?;

        tracing::info!(
            manager = %manager.id,
            admin = %initial_admin,
            "access manager initialized"
        );

        Ok(manager)
    }

    /// The manager's own target id (administrative operations live here).
    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn evaluator(&self) -> Evaluator<'_, InMemoryPolicyStore, R> {
        Evaluator::new(&self.store, &self.registry)
    }

    /// Ungated evaluation entry point used by gateways.
    pub fn decide(
        &self,
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    ) -> Result<Decision, AccessError> {
        self.evaluator().decide(caller, target, operation)
    }

    pub fn can_call(
        &self,
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    ) -> Result<Verdict, AccessError> {
        self.evaluator().evaluate(caller, target, operation)
    }

    pub fn explain(
        &self,
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    ) -> Result<DecisionExplanation, AccessError> {
        self.evaluator().explain(caller, target, operation)
    }

    fn authorize(&self, caller: AccountId, op: AdminOperation) -> Result<(), AccessError> {
        let operation = op.id();
        let result = self
            .decide(caller, self.id, operation)?
            .into_result(caller, self.id, operation);

        if let Err(err) = &result {
            tracing::warn!(
                caller = %caller,
                operation = op.signature(),
                error = %err,
                "administrative call rejected"
            );
        }
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutators
    // ─────────────────────────────────────────────────────────────────────────

    /// Assign `role` to `operations` on `target`. `PUBLIC` unsets them.
    ///
    /// Operations on the manager's own target stay pinned to `ADMIN`; any
    /// other role there is refused with [`AccessError::LockedTarget`].
    ///
    /// Returns the number of operations written.
    pub fn set_required_role<I>(
        &self,
        caller: AccountId,
        target: TargetId,
        operations: I,
        role: RoleId,
    ) -> Result<usize, AccessError>
    where
        I: IntoIterator<Item = OperationId>,
    {
        self.authorize(caller, AdminOperation::SetRequiredRole)?;
        if target == self.id && !role.is_admin() {
            return Err(AccessError::LockedTarget(target));
        }

        let operations: Vec<OperationId> = operations.into_iter().collect();
        let written = self
            .store
            .set_required_role(target, operations.iter().copied(), role)?;

        tracing::info!(
            caller = %caller,
            target = %target,
            role = %role,
            operations = ?operations,
            "required role updated"
        );
        Ok(written)
    }

    /// Open or close `target`. The manager's own target cannot be closed.
    pub fn set_closed(
        &self,
        caller: AccountId,
        target: TargetId,
        closed: bool,
    ) -> Result<(), AccessError> {
        self.authorize(caller, AdminOperation::SetClosed)?;
        if closed && target == self.id {
            return Err(AccessError::LockedTarget(target));
        }

        self.store.set_closed(target, closed)?;
        tracing::info!(caller = %caller, target = %target, closed, "target closed flag updated");
        Ok(())
    }

    pub fn grant_role(
        &self,
        caller: AccountId,
        role: RoleId,
        account: AccountId,
        execution_delay: Duration,
    ) -> Result<bool, AccessError> {
        self.authorize(caller, AdminOperation::GrantRole)?;
        let newly = self.registry.grant_role(role, account, execution_delay)?;
        tracing::info!(
            caller = %caller,
            role = %role,
            account = %account,
            delay_secs = execution_delay.as_secs(),
            newly,
            "role granted"
        );
        Ok(newly)
    }

    pub fn revoke_role(
        &self,
        caller: AccountId,
        role: RoleId,
        account: AccountId,
    ) -> Result<bool, AccessError> {
        self.authorize(caller, AdminOperation::RevokeRole)?;
        let removed = self.registry.revoke_role(role, account)?;
        tracing::info!(caller = %caller, role = %role, account = %account, removed, "role revoked");
        Ok(removed)
    }

    pub fn label_role(
        &self,
        caller: AccountId,
        role: RoleId,
        label: impl Into<String>,
    ) -> Result<(), AccessError> {
        self.authorize(caller, AdminOperation::LabelRole)?;
        let label = label.into();
        self.registry.label_role(role, label.clone())?;
        tracing::info!(caller = %caller, role = %role, label = %label, "role labeled");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn required_role(
        &self,
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    ) -> Result<RoleId, AccessError> {
        self.authorize(caller, AdminOperation::GetRequiredRole)?;
        self.store.required_role(target, operation)
    }

    pub fn is_configured(
        &self,
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    ) -> Result<bool, AccessError> {
        self.authorize(caller, AdminOperation::IsConfigured)?;
        self.store.is_configured(target, operation)
    }

    pub fn is_closed(&self, caller: AccountId, target: TargetId) -> Result<bool, AccessError> {
        self.authorize(caller, AdminOperation::IsClosed)?;
        self.store.is_closed(target)
    }

    pub fn configured_operations(
        &self,
        caller: AccountId,
        target: TargetId,
    ) -> Result<Vec<(OperationId, RoleId)>, AccessError> {
        self.authorize(caller, AdminOperation::ConfiguredOperations)?;
        self.store.configured_operations(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Membership, RoleRegistry};

    fn op(sig: &str) -> OperationId {
        OperationId::from_signature(sig)
    }

    fn setup() -> (AccessManager, AccountId) {
        let admin = AccountId::new();
        (AccessManager::new(admin).unwrap(), admin)
    }

    #[test]
    fn bootstrap_restricts_admin_operations_to_admin() {
        let (manager, admin) = setup();

        for admin_op in AdminOperation::ALL {
            assert_eq!(
                manager.required_role(admin, manager.id(), admin_op.id()).unwrap(),
                RoleId::ADMIN,
                "{admin_op:?}"
            );
        }
    }

    #[test]
    fn admin_operation_ids_are_distinct() {
        let mut ids: Vec<OperationId> = AdminOperation::ALL.iter().map(|op| op.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), AdminOperation::ALL.len());
    }

    #[test]
    fn non_admin_cannot_configure() {
        let (manager, _admin) = setup();
        let intruder = AccountId::new();
        let target = TargetId::new();

        let err = manager
            .set_required_role(intruder, target, [op("reset()")], RoleId::new(1))
            .unwrap_err();
        assert_eq!(
            err,
            AccessError::Unauthorized {
                caller: intruder,
                target: manager.id(),
                operation: AdminOperation::SetRequiredRole.id(),
            }
        );
        assert!(manager.set_closed(intruder, target, true).is_err());
        assert!(manager.grant_role(intruder, RoleId::ADMIN, intruder, Duration::ZERO).is_err());
        assert!(manager.is_closed(intruder, target).is_err());
    }

    #[test]
    fn admin_configures_and_queries() {
        let (manager, admin) = setup();
        let target = TargetId::new();

        assert_eq!(
            manager.set_required_role(admin, target, [op("increment()")], RoleId::new(1)).unwrap(),
            1
        );
        assert!(manager.is_configured(admin, target, op("increment()")).unwrap());
        assert_eq!(
            manager.required_role(admin, target, op("increment()")).unwrap(),
            RoleId::new(1)
        );

        manager.set_required_role(admin, target, [op("increment()")], RoleId::PUBLIC).unwrap();
        assert!(!manager.is_configured(admin, target, op("increment()")).unwrap());
        assert_eq!(
            manager.required_role(admin, target, op("increment()")).unwrap(),
            RoleId::PUBLIC
        );
    }

    #[test]
    fn admin_operations_stay_pinned_to_admin() {
        let (manager, admin) = setup();
        let stranger = AccountId::new();

        for role in [RoleId::PUBLIC, RoleId::new(7), RoleId::new(99)] {
            assert_eq!(
                manager.set_required_role(
                    admin,
                    manager.id(),
                    [AdminOperation::SetRequiredRole.id(), AdminOperation::GrantRole.id()],
                    role,
                ),
                Err(AccessError::LockedTarget(manager.id()))
            );
        }

        // Nothing was opened up to strangers.
        assert!(manager
            .set_required_role(stranger, TargetId::new(), [op("x()")], RoleId::new(1))
            .is_err());
        assert!(manager.grant_role(stranger, RoleId::ADMIN, stranger, Duration::ZERO).is_err());

        // And the admin kept control.
        for admin_op in AdminOperation::ALL {
            assert_eq!(
                manager.required_role(admin, manager.id(), admin_op.id()).unwrap(),
                RoleId::ADMIN
            );
        }
        assert_eq!(
            manager
                .set_required_role(admin, manager.id(), [AdminOperation::SetClosed.id()], RoleId::ADMIN)
                .unwrap(),
            1
        );
    }

    /// Registry whose label table is unavailable.
    #[derive(Debug, Default)]
    struct ReadOnlyLabels(InMemoryRoleRegistry);

    impl RoleRegistry for ReadOnlyLabels {
        fn has_role(&self, role: RoleId, account: AccountId) -> Result<Membership, AccessError> {
            self.0.has_role(role, account)
        }
    }

    impl RoleAdministration for ReadOnlyLabels {
        fn grant_role(
            &self,
            role: RoleId,
            account: AccountId,
            execution_delay: Duration,
        ) -> Result<bool, AccessError> {
            self.0.grant_role(role, account, execution_delay)
        }

        fn revoke_role(&self, role: RoleId, account: AccountId) -> Result<bool, AccessError> {
            self.0.revoke_role(role, account)
        }

        fn label_role(&self, _role: RoleId, _label: String) -> Result<(), AccessError> {
            Err(AccessError::RegistryUnavailable("labels are read-only".into()))
        }
    }

    #[test]
    fn failed_label_write_is_reported() {
        let admin = AccountId::new();
        let manager = AccessManager::with_registry(ReadOnlyLabels::default(), admin).unwrap();
        assert_eq!(
            manager.label_role(admin, RoleId::new(3), "auditor"),
            Err(AccessError::RegistryUnavailable("labels are read-only".into()))
        );
    }

    #[test]
    fn delayed_admin_must_schedule() {
        let (manager, admin) = setup();
        let slow_admin = AccountId::new();
        let delay = Duration::from_secs(86_400);
        manager.grant_role(admin, RoleId::ADMIN, slow_admin, delay).unwrap();

        let err = manager.set_closed(slow_admin, TargetId::new(), true).unwrap_err();
        assert!(matches!(err, AccessError::SchedulingRequired { delay: d, .. } if d == delay));
    }

    #[test]
    fn manager_target_cannot_be_closed() {
        let (manager, admin) = setup();
        assert_eq!(
            manager.set_closed(admin, manager.id(), true),
            Err(AccessError::LockedTarget(manager.id()))
        );
        // Re-opening is a harmless no-op.
        manager.set_closed(admin, manager.id(), false).unwrap();
    }

    #[test]
    fn revoking_admin_removes_administrative_access() {
        let (manager, admin) = setup();
        let second = AccountId::new();
        manager.grant_role(admin, RoleId::ADMIN, second, Duration::ZERO).unwrap();

        assert!(manager.revoke_role(second, RoleId::ADMIN, admin).unwrap());
        assert!(manager.is_closed(admin, TargetId::new()).is_err());
        assert!(!manager.is_closed(second, TargetId::new()).unwrap());
    }

    #[test]
    fn public_role_is_locked() {
        let (manager, admin) = setup();
        assert_eq!(
            manager.grant_role(admin, RoleId::PUBLIC, AccountId::new(), Duration::ZERO),
            Err(AccessError::LockedRole(RoleId::PUBLIC))
        );
    }

    #[test]
    fn closing_and_reopening_preserves_configuration() {
        let (manager, admin) = setup();
        let target = TargetId::new();
        manager.set_required_role(admin, target, [op("reset()")], RoleId::ADMIN).unwrap();

        manager.set_closed(admin, target, true).unwrap();
        assert_eq!(manager.can_call(admin, target, op("reset()")).unwrap(), Verdict::Deny);
        manager.set_closed(admin, target, false).unwrap();
        assert_eq!(
            manager.can_call(admin, target, op("reset()")).unwrap(),
            Verdict::ImmediateAllow
        );
        assert_eq!(
            manager.configured_operations(admin, target).unwrap(),
            vec![(op("reset()"), RoleId::ADMIN)]
        );
    }

    #[test]
    fn labels_and_members() {
        let (manager, admin) = setup();
        let member = AccountId::new();
        manager.label_role(admin, RoleId::new(3), "auditor").unwrap();
        manager.grant_role(admin, RoleId::new(3), member, Duration::from_secs(5)).unwrap();

        let members = manager.members(admin, RoleId::new(3)).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].account, member);
        assert_eq!(members[0].execution_delay, Duration::from_secs(5));
    }
}

//! Policy evaluation: closed flag, then public operations, then role membership.

use std::time::Duration;

use serde::Serialize;

use accessgate_core::{AccountId, OperationId, RoleId, TargetId};

use crate::error::AccessError;
use crate::registry::RoleRegistry;
use crate::store::{PolicyLookup, PolicySource};

/// Outcome of evaluating one (caller, target, operation) triple.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "delay", rename_all = "snake_case")]
pub enum Verdict {
    ImmediateAllow,
    /// Authorized, but only after the external scheduler has cleared the call.
    DelayedAllow(Duration),
    Deny,
}

impl Verdict {
    pub fn is_immediate(self) -> bool {
        matches!(self, Verdict::ImmediateAllow)
    }

    /// Execution delay attached to the verdict (zero unless delayed).
    pub fn delay(self) -> Duration {
        match self {
            Verdict::DelayedAllow(delay) => delay,
            _ => Duration::ZERO,
        }
    }
}

/// Which signal decided the verdict.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionBasis {
    /// The target's closed flag overrode everything else.
    TargetClosed,
    /// Effective role is `PUBLIC`. `configured` is always false here but is
    /// reported so audits can distinguish intent from effect.
    Public { configured: bool },
    /// The caller holds the required role.
    RoleGranted { role: RoleId, delay: Duration },
    /// The caller does not hold the required role.
    RoleMissing { role: RoleId },
}

/// A verdict together with the reason it was reached.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub basis: DecisionBasis,
}

impl Decision {
    /// Map the decision onto the engine's error taxonomy.
    ///
    /// `ImmediateAllow` is `Ok`; a delayed allow is reported as
    /// `SchedulingRequired` because the call may not execute now.
    pub fn into_result(
        self,
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    ) -> Result<(), AccessError> {
        match (self.verdict, self.basis) {
            (Verdict::ImmediateAllow, _) => Ok(()),
            (Verdict::DelayedAllow(delay), _) => Err(AccessError::SchedulingRequired {
                caller,
                target,
                operation,
                delay,
            }),
            (Verdict::Deny, DecisionBasis::TargetClosed) => Err(AccessError::TargetClosed(target)),
            (Verdict::Deny, _) => Err(AccessError::Unauthorized {
                caller,
                target,
                operation,
            }),
        }
    }
}

/// Pure decision function over a policy source and a role registry.
///
/// Holds borrowed capabilities only; it has no state of its own, so the same
/// inputs against the same snapshot always give the same verdict.
#[derive(Debug)]
pub struct Evaluator<'a, P: ?Sized, R: ?Sized> {
    policies: &'a P,
    roles: &'a R,
}

impl<'a, P, R> Evaluator<'a, P, R>
where
    P: PolicySource + ?Sized,
    R: RoleRegistry + ?Sized,
{
    pub fn new(policies: &'a P, roles: &'a R) -> Self {
        Self { policies, roles }
    }

    /// Decide whether `caller` may call `operation` on `target`.
    ///
    /// Order is strict and short-circuiting:
    /// 1. closed target → deny (before any role lookup)
    /// 2. effective role `PUBLIC` → immediate allow (registry not consulted)
    /// 3. otherwise membership decides: none → deny, zero delay → immediate,
    ///    positive delay → delayed
    pub fn decide(
        &self,
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    ) -> Result<Decision, AccessError> {
        let lookup = self.policies.lookup(target, operation)?;
        let decision = self.decide_with(caller, &lookup)?;

        tracing::debug!(
            caller = %caller,
            target = %target,
            operation = %operation,
            verdict = ?decision.verdict,
            basis = ?decision.basis,
            "access decision"
        );

        Ok(decision)
    }

    pub fn evaluate(
        &self,
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    ) -> Result<Verdict, AccessError> {
        Ok(self.decide(caller, target, operation)?.verdict)
    }

    fn decide_with(&self, caller: AccountId, lookup: &PolicyLookup) -> Result<Decision, AccessError> {
        if lookup.closed {
            return Ok(Decision {
                verdict: Verdict::Deny,
                basis: DecisionBasis::TargetClosed,
            });
        }

        let role = lookup.required_role;
        if role.is_public() {
            return Ok(Decision {
                verdict: Verdict::ImmediateAllow,
                basis: DecisionBasis::Public {
                    configured: lookup.configured,
                },
            });
        }

        let membership = self.roles.has_role(role, caller)?;
        if !membership.is_member {
            return Ok(Decision {
                verdict: Verdict::Deny,
                basis: DecisionBasis::RoleMissing { role },
            });
        }

        let delay = membership.execution_delay;
        let verdict = if delay.is_zero() {
            Verdict::ImmediateAllow
        } else {
            Verdict::DelayedAllow(delay)
        };
        Ok(Decision {
            verdict,
            basis: DecisionBasis::RoleGranted { role, delay },
        })
    }

    /// Explain a decision for audit tooling ("why was this allowed/denied?").
    pub fn explain(
        &self,
        caller: AccountId,
        target: TargetId,
        operation: OperationId,
    ) -> Result<DecisionExplanation, AccessError> {
        let lookup = self.policies.lookup(target, operation)?;
        let decision = self.decide_with(caller, &lookup)?;

        let reason = match decision.basis {
            DecisionBasis::TargetClosed => {
                format!("Target {target} is closed; every operation is denied to every caller")
            }
            DecisionBasis::Public { .. } => format!(
                "Operation {operation} has never been restricted (or was reset to PUBLIC); anyone may call it"
            ),
            DecisionBasis::RoleGranted { role, delay } if delay.is_zero() => {
                format!("Caller holds required role {role} with no execution delay")
            }
            DecisionBasis::RoleGranted { role, delay } => format!(
                "Caller holds required role {role} but must schedule the call {delay:?} ahead"
            ),
            DecisionBasis::RoleMissing { role } => {
                format!("Operation {operation} requires role {role}, which the caller does not hold")
            }
        };

        Ok(DecisionExplanation {
            caller,
            target,
            operation,
            closed: lookup.closed,
            configured: lookup.configured,
            required_role: lookup.required_role,
            verdict: decision.verdict,
            basis: decision.basis,
            reason,
        })
    }
}

/// Detailed, serializable account of a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionExplanation {
    pub caller: AccountId,
    pub target: TargetId,
    pub operation: OperationId,
    pub closed: bool,
    /// Whether an administrator explicitly wrote this key (false for `PUBLIC`).
    pub configured: bool,
    pub required_role: RoleId,
    pub verdict: Verdict,
    pub basis: DecisionBasis,
    /// Human-readable reason for the decision.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{InMemoryRoleRegistry, Membership};
    use crate::store::InMemoryPolicyStore;
    use proptest::prelude::*;

    fn op(sig: &str) -> OperationId {
        OperationId::from_signature(sig)
    }

    /// Registry that fails every lookup.
    struct UnavailableRegistry;

    impl RoleRegistry for UnavailableRegistry {
        fn has_role(&self, _role: RoleId, _account: AccountId) -> Result<Membership, AccessError> {
            Err(AccessError::RegistryUnavailable("offline".to_string()))
        }
    }

    struct Fixture {
        store: InMemoryPolicyStore,
        registry: InMemoryRoleRegistry,
        target: TargetId,
        admin: AccountId,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = InMemoryRoleRegistry::new();
            let admin = AccountId::new();
            registry.grant_role(RoleId::ADMIN, admin, Duration::ZERO).unwrap();
            Self {
                store: InMemoryPolicyStore::new(),
                registry,
                target: TargetId::new(),
                admin,
            }
        }

        fn evaluator(&self) -> Evaluator<'_, InMemoryPolicyStore, InMemoryRoleRegistry> {
            Evaluator::new(&self.store, &self.registry)
        }
    }

    #[test]
    fn role_holder_is_allowed_and_stranger_denied() {
        let f = Fixture::new();
        let r1 = RoleId::new(1);
        let a = AccountId::new();
        let b = AccountId::new();
        f.store.set_required_role(f.target, [op("increment()")], r1).unwrap();
        f.registry.grant_role(r1, a, Duration::ZERO).unwrap();

        let eval = f.evaluator();
        assert_eq!(eval.evaluate(a, f.target, op("increment()")).unwrap(), Verdict::ImmediateAllow);
        assert_eq!(eval.evaluate(b, f.target, op("increment()")).unwrap(), Verdict::Deny);
    }

    #[test]
    fn admin_only_operation_rejects_unrelated_roles() {
        let f = Fixture::new();
        let other = AccountId::new();
        f.registry.grant_role(RoleId::new(1), other, Duration::ZERO).unwrap();
        f.store.set_required_role(f.target, [op("reset()")], RoleId::ADMIN).unwrap();

        let eval = f.evaluator();
        assert_eq!(eval.evaluate(f.admin, f.target, op("reset()")).unwrap(), Verdict::ImmediateAllow);
        assert_eq!(eval.evaluate(other, f.target, op("reset()")).unwrap(), Verdict::Deny);
    }

    #[test]
    fn closing_denies_admin_and_reopening_restores() {
        let f = Fixture::new();
        f.store.set_required_role(f.target, [op("reset()")], RoleId::ADMIN).unwrap();
        let eval = f.evaluator();

        f.store.set_closed(f.target, true).unwrap();
        let decision = eval.decide(f.admin, f.target, op("reset()")).unwrap();
        assert_eq!(decision.verdict, Verdict::Deny);
        assert_eq!(decision.basis, DecisionBasis::TargetClosed);
        // Public operations are blocked too.
        assert_eq!(eval.evaluate(f.admin, f.target, op("value()")).unwrap(), Verdict::Deny);

        f.store.set_closed(f.target, false).unwrap();
        assert_eq!(eval.evaluate(f.admin, f.target, op("reset()")).unwrap(), Verdict::ImmediateAllow);
    }

    #[test]
    fn reconfiguring_to_public_opens_the_operation() {
        let f = Fixture::new();
        let caller = AccountId::new();
        f.store.set_required_role(f.target, [op("setValue(uint64)")], RoleId::new(1)).unwrap();
        let eval = f.evaluator();

        assert_eq!(eval.evaluate(caller, f.target, op("setValue(uint64)")).unwrap(), Verdict::Deny);
        f.store.set_required_role(f.target, [op("setValue(uint64)")], RoleId::PUBLIC).unwrap();
        assert_eq!(
            eval.evaluate(caller, f.target, op("setValue(uint64)")).unwrap(),
            Verdict::ImmediateAllow
        );
    }

    #[test]
    fn delayed_membership_yields_delayed_allow() {
        let f = Fixture::new();
        let caller = AccountId::new();
        let delay = Duration::from_secs(3600);
        f.store.set_required_role(f.target, [op("withdraw()")], RoleId::new(9)).unwrap();
        f.registry.grant_role(RoleId::new(9), caller, delay).unwrap();

        let decision = f.evaluator().decide(caller, f.target, op("withdraw()")).unwrap();
        assert_eq!(decision.verdict, Verdict::DelayedAllow(delay));
        assert_eq!(decision.verdict.delay(), delay);
        assert_eq!(
            decision.into_result(caller, f.target, op("withdraw()")),
            Err(AccessError::SchedulingRequired {
                caller,
                target: f.target,
                operation: op("withdraw()"),
                delay,
            })
        );
    }

    #[test]
    fn revocation_takes_effect_immediately() {
        let f = Fixture::new();
        let caller = AccountId::new();
        f.store.set_required_role(f.target, [op("increment()")], RoleId::new(1)).unwrap();
        f.registry.grant_role(RoleId::new(1), caller, Duration::ZERO).unwrap();
        let eval = f.evaluator();

        assert_eq!(eval.evaluate(caller, f.target, op("increment()")).unwrap(), Verdict::ImmediateAllow);
        f.registry.revoke_role(RoleId::new(1), caller).unwrap();
        assert_eq!(eval.evaluate(caller, f.target, op("increment()")).unwrap(), Verdict::Deny);
    }

    #[test]
    fn public_operations_do_not_need_the_registry() {
        let store = InMemoryPolicyStore::new();
        let target = TargetId::new();
        store.set_required_role(target, [op("guarded()")], RoleId::new(1)).unwrap();
        let eval = Evaluator::new(&store, &UnavailableRegistry);

        assert_eq!(
            eval.evaluate(AccountId::new(), target, op("open()")).unwrap(),
            Verdict::ImmediateAllow
        );
        assert_eq!(
            eval.evaluate(AccountId::new(), target, op("guarded()")),
            Err(AccessError::RegistryUnavailable("offline".to_string()))
        );
    }

    #[test]
    fn closed_target_is_denied_without_consulting_the_registry() {
        let store = InMemoryPolicyStore::new();
        let target = TargetId::new();
        store.set_required_role(target, [op("guarded()")], RoleId::new(1)).unwrap();
        store.set_closed(target, true).unwrap();
        let eval = Evaluator::new(&store, &UnavailableRegistry);

        assert_eq!(eval.evaluate(AccountId::new(), target, op("guarded()")).unwrap(), Verdict::Deny);
    }

    #[test]
    fn denial_maps_to_caller_attributed_errors() {
        let f = Fixture::new();
        let caller = AccountId::new();
        f.store.set_required_role(f.target, [op("reset()")], RoleId::ADMIN).unwrap();
        let eval = f.evaluator();

        let err = eval
            .decide(caller, f.target, op("reset()"))
            .unwrap()
            .into_result(caller, f.target, op("reset()"))
            .unwrap_err();
        assert_eq!(err.caller(), Some(caller));
        assert!(err.is_rejection());

        f.store.set_closed(f.target, true).unwrap();
        let err = eval
            .decide(caller, f.target, op("reset()"))
            .unwrap()
            .into_result(caller, f.target, op("reset()"))
            .unwrap_err();
        assert_eq!(err, AccessError::TargetClosed(f.target));
    }

    #[test]
    fn explanation_separates_public_from_configured() {
        let f = Fixture::new();
        let caller = AccountId::new();
        f.store.set_required_role(f.target, [op("increment()")], RoleId::new(1)).unwrap();
        let eval = f.evaluator();

        let open = eval.explain(caller, f.target, op("value()")).unwrap();
        assert!(!open.configured);
        assert_eq!(open.required_role, RoleId::PUBLIC);
        assert_eq!(open.basis, DecisionBasis::Public { configured: false });

        let guarded = eval.explain(caller, f.target, op("increment()")).unwrap();
        assert!(guarded.configured);
        assert_eq!(guarded.verdict, Verdict::Deny);
        assert!(guarded.reason.contains("requires role 1"));

        let json = serde_json::to_value(&guarded).unwrap();
        assert_eq!(json["verdict"]["verdict"], "deny");
        assert_eq!(json["basis"]["kind"], "role_missing");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: a closed target denies every caller and every operation,
        /// whatever roles are configured or held.
        #[test]
        fn closed_target_denies_everything(
            role in prop_oneof![Just(u64::MAX), 0u64..4],
            held in prop::collection::vec(0u64..4, 0..4),
            delay_secs in 0u64..10,
            sig in "[a-z]{1,8}\\(\\)",
        ) {
            let f = Fixture::new();
            let caller = AccountId::new();
            f.store.set_required_role(f.target, [op(&sig)], RoleId::new(role)).unwrap();
            for r in held {
                f.registry.grant_role(RoleId::new(r), caller, Duration::from_secs(delay_secs)).unwrap();
            }
            f.store.set_closed(f.target, true).unwrap();

            let eval = f.evaluator();
            prop_assert_eq!(eval.evaluate(caller, f.target, op(&sig)).unwrap(), Verdict::Deny);
            prop_assert_eq!(eval.evaluate(f.admin, f.target, op(&sig)).unwrap(), Verdict::Deny);
        }

        /// Property: on an open target the verdict is a function of required
        /// role and membership only.
        #[test]
        fn open_target_verdict_follows_membership(
            role in 0u64..4,
            held in prop::option::of(0u64..4),
            delay_secs in 0u64..10,
        ) {
            let f = Fixture::new();
            let caller = AccountId::new();
            f.store.set_required_role(f.target, [op("call()")], RoleId::new(role)).unwrap();
            if let Some(r) = held {
                f.registry.grant_role(RoleId::new(r), caller, Duration::from_secs(delay_secs)).unwrap();
            }

            let expected = match held {
                Some(r) if r == role && delay_secs == 0 => Verdict::ImmediateAllow,
                Some(r) if r == role => Verdict::DelayedAllow(Duration::from_secs(delay_secs)),
                _ => Verdict::Deny,
            };
            prop_assert_eq!(f.evaluator().evaluate(caller, f.target, op("call()")).unwrap(), expected);
        }
    }
}

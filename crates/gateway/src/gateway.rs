//! Call interception pipeline.
//!
//! Every call to a protected resource goes through [`Gateway::call`]:
//!
//! ```text
//! (caller, call bytes)
//!   ↓
//! 1. Read the operation selector (first 4 bytes; shorter calls are malformed)
//!   ↓
//! 2. Ask the authority: decide(caller, target, operation)
//!   ↓
//! 3. ImmediateAllow            → forward
//!    DelayedAllow + scheduled  → forward (schedule consumed)
//!    DelayedAllow, no schedule → SchedulingRequired
//!    Deny                      → Unauthorized / TargetClosed
//!   ↓
//! 4. Forward the unmodified call to the resource, relay its output or error
//! ```
//!
//! Steps 1–3 never touch the resource, so a rejected call is never partially
//! executed.

use accessgate_core::{AccountId, OperationId, TargetId};
use accessgate_policy::{AccessError, Verdict};

use crate::authority::{Authority, NoScheduler, Scheduler};
use crate::error::GatewayError;
use crate::resource::Resource;

/// Interception gateway in front of one resource.
///
/// Generic over the resource (`R`), the authority it consults (`A`, typically
/// `Arc<AccessManager>`) and the external scheduler (`S`).
#[derive(Debug)]
pub struct Gateway<R, A, S = NoScheduler> {
    target: TargetId,
    resource: R,
    authority: A,
    scheduler: S,
}

impl<R, A> Gateway<R, A, NoScheduler> {
    pub fn new(target: TargetId, resource: R, authority: A) -> Self {
        Self {
            target,
            resource,
            authority,
            scheduler: NoScheduler,
        }
    }
}

impl<R, A, S> Gateway<R, A, S> {
    /// Replace the scheduler consulted on delayed allows.
    pub fn with_scheduler<S2>(self, scheduler: S2) -> Gateway<R, A, S2> {
        Gateway {
            target: self.target,
            resource: self.resource,
            authority: self.authority,
            scheduler,
        }
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    /// Read-only access to the resource (e.g. for inspection in tests).
    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn into_parts(self) -> (R, A, S) {
        (self.resource, self.authority, self.scheduler)
    }
}

impl<R, A, S> Gateway<R, A, S>
where
    R: Resource,
    A: Authority,
    S: Scheduler,
{
    /// Authorize and, if allowed, forward `call` from `caller` to the resource.
    ///
    /// On success the resource's return data is returned unchanged; on a
    /// resource failure its error is returned inside [`GatewayError::Resource`].
    pub fn call(&mut self, caller: AccountId, call: &[u8]) -> Result<Vec<u8>, GatewayError<R::Error>> {
        self.check(caller, call)?;
        self.resource.invoke(caller, call).map_err(GatewayError::Resource)
    }

    /// Run steps 1–3 of the pipeline without invoking the resource.
    ///
    /// Note that a matured schedule is consumed by this check.
    pub fn check(&self, caller: AccountId, call: &[u8]) -> Result<OperationId, GatewayError<R::Error>> {
        let Some(operation) = OperationId::from_call(call) else {
            tracing::warn!(caller = %caller, target = %self.target, len = call.len(), "malformed call rejected");
            return Err(GatewayError::MalformedCall {
                caller,
                len: call.len(),
            });
        };

        self.authorize(caller, operation, call)
            .map_err(|error| {
                tracing::warn!(
                    caller = %caller,
                    target = %self.target,
                    operation = %operation,
                    error = %error,
                    "call rejected"
                );
                GatewayError::Rejected { caller, error }
            })?;

        Ok(operation)
    }

    fn authorize(&self, caller: AccountId, operation: OperationId, call: &[u8]) -> Result<(), AccessError> {
        let decision = self.authority.decide(caller, self.target, operation)?;

        if let Verdict::DelayedAllow(delay) = decision.verdict {
            if self.scheduler.consume_scheduled(caller, self.target, call)? {
                tracing::debug!(
                    caller = %caller,
                    target = %self.target,
                    operation = %operation,
                    delay_secs = delay.as_secs(),
                    "scheduled call released"
                );
                return Ok(());
            }
        }

        decision.into_result(caller, self.target, operation)
    }
}

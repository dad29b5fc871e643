use thiserror::Error;

use accessgate_core::{AccountId, OperationId};
use accessgate_policy::AccessError;

/// Failure of a gated call.
///
/// Authorization failures (`MalformedCall`, `Rejected`) are always raised
/// before the resource is touched; `Resource` carries the resource's own error
/// untouched so monitoring can tell "authorization failed" apart from
/// "business logic failed".
#[derive(Debug, Error)]
pub enum GatewayError<E: core::fmt::Debug> {
    /// The call is shorter than an operation selector.
    #[error("malformed call from {caller}: {len} bytes, need at least {}", OperationId::LEN)]
    MalformedCall { caller: AccountId, len: usize },

    /// The policy engine did not allow the call to execute now.
    #[error("call from {caller} rejected: {error}")]
    Rejected {
        caller: AccountId,
        #[source]
        error: AccessError,
    },

    /// The resource ran and failed.
    #[error("resource error: {0:?}")]
    Resource(E),
}

impl<E: core::fmt::Debug> GatewayError<E> {
    /// `true` for failures raised by the gateway rather than the resource.
    pub fn is_authorization_failure(&self) -> bool {
        !matches!(self, GatewayError::Resource(_))
    }

    /// Caller a gateway-level failure is attributed to.
    pub fn rejected_caller(&self) -> Option<AccountId> {
        match self {
            GatewayError::MalformedCall { caller, .. } | GatewayError::Rejected { caller, .. } => {
                Some(*caller)
            }
            GatewayError::Resource(_) => None,
        }
    }

    pub fn access_error(&self) -> Option<&AccessError> {
        match self {
            GatewayError::Rejected { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn into_resource_error(self) -> Option<E> {
        match self {
            GatewayError::Resource(e) => Some(e),
            _ => None,
        }
    }
}

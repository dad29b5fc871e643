//! `accessgate-core`: identifiers and value types shared by the policy engine
//! and the gateway.
//!
//! This crate contains **pure values** (no locking, no IO, no policy decisions).

pub mod error;
pub mod id;
pub mod operation;
pub mod role;

pub use error::{CoreError, CoreResult};
pub use id::{AccountId, TargetId};
pub use operation::OperationId;
pub use role::RoleId;

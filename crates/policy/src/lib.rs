//! `accessgate-policy`: centralized policy evaluation.
//!
//! This crate is intentionally decoupled from transport and from the resources
//! it protects: it answers "may this caller invoke this operation on this
//! target, and why?" and nothing else.

pub mod document;
pub mod error;
pub mod evaluate;
pub mod manager;
pub mod registry;
pub mod store;

pub use document::{ApplySummary, DocumentError, PolicyDocument};
pub use error::AccessError;
pub use evaluate::{Decision, DecisionBasis, DecisionExplanation, Evaluator, Verdict};
pub use manager::{AccessManager, AdminOperation};
pub use registry::{InMemoryRoleRegistry, Membership, RoleAdministration, RoleGrant, RoleRegistry};
pub use store::{InMemoryPolicyStore, PolicyLookup, PolicySource};

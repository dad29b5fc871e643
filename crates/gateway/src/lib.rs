//! `accessgate-gateway`: call interception in front of protected resources.
//!
//! Resources implement [`Resource`] and carry no authorization logic; a
//! [`Gateway`] owns the resource and lets a call through only when the
//! [`Authority`] grants an immediate allow (or a delayed allow whose schedule
//! the [`Scheduler`] vouches for).

pub mod authority;
pub mod error;
pub mod gateway;
pub mod resource;

pub use authority::{Authority, NoScheduler, Scheduler};
pub use error::GatewayError;
pub use gateway::Gateway;
pub use resource::Resource;

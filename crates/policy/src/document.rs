//! Declarative policy documents.
//!
//! A document describes roles, their members, and per-target operation roles.
//! Applying it goes through the access manager's gated administrative API, so
//! the applying caller needs the same rights as if it made every call by hand.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use accessgate_core::{AccountId, CoreError, OperationId, RoleId, TargetId};

use crate::error::AccessError;
use crate::manager::AccessManager;
use crate::registry::RoleAdministration;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read policy document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed policy document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid operation in policy document: {0}")]
    Operation(#[from] CoreError),

    #[error("operation {operation} is listed more than once for target {target}")]
    DuplicateOperation {
        target: TargetId,
        operation: OperationId,
    },

    #[error("policy document rejected: {0}")]
    Access(#[from] AccessError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    /// Account bootstrapped with `ADMIN` when a manager is built from the document.
    pub admin: AccountId,

    #[serde(default)]
    pub roles: Vec<RoleSpec>,

    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleSpec {
    pub id: RoleId,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub members: Vec<MemberSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberSpec {
    pub account: AccountId,

    #[serde(default)]
    pub execution_delay_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    pub id: TargetId,

    #[serde(default)]
    pub closed: bool,

    /// Operation (signature or `0x` selector) → required role.
    #[serde(default)]
    pub operations: BTreeMap<String, RoleId>,
}

/// Counts of what an [`PolicyDocument::apply`] call wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub roles_labeled: usize,
    pub grants: usize,
    pub operations: usize,
    pub closed_targets: usize,
}

impl PolicyDocument {
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Build a fresh in-memory manager for the document's admin and apply it.
    pub fn build_manager(&self) -> Result<AccessManager, DocumentError> {
        let manager = AccessManager::new(self.admin)?;
        self.apply(&manager, self.admin)?;
        Ok(manager)
    }

    /// Apply every role grant and target setting as `caller`.
    ///
    /// All operation keys are resolved before anything is written, so a typo
    /// in a selector does not leave the manager half-configured. A signature
    /// and its own `0x` selector under one target count as a duplicate. Access
    /// failures part-way through are returned as-is; earlier writes stay.
    pub fn apply<R>(
        &self,
        manager: &AccessManager<R>,
        caller: AccountId,
    ) -> Result<ApplySummary, DocumentError>
    where
        R: RoleAdministration,
    {
        let mut resolved: Vec<(TargetId, bool, BTreeMap<RoleId, Vec<OperationId>>)> =
            Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            let mut seen = BTreeSet::new();
            let mut by_role: BTreeMap<RoleId, Vec<OperationId>> = BTreeMap::new();
            for (key, role) in &target.operations {
                let operation = OperationId::resolve(key)?;
                if !seen.insert(operation) {
                    return Err(DocumentError::DuplicateOperation {
                        target: target.id,
                        operation,
                    });
                }
                by_role.entry(*role).or_default().push(operation);
            }
            resolved.push((target.id, target.closed, by_role));
        }

        let mut summary = ApplySummary::default();

        for role in &self.roles {
            if let Some(label) = &role.label {
                manager.label_role(caller, role.id, label.clone())?;
                summary.roles_labeled += 1;
            }
            for member in &role.members {
                manager.grant_role(
                    caller,
                    role.id,
                    member.account,
                    Duration::from_secs(member.execution_delay_secs),
                )?;
                summary.grants += 1;
            }
        }

        for (target, closed, by_role) in resolved {
            for (role, operations) in by_role {
                summary.operations += manager.set_required_role(caller, target, operations, role)?;
            }
            manager.set_closed(caller, target, closed)?;
            if closed {
                summary.closed_targets += 1;
            }
        }

        tracing::info!(
            caller = %caller,
            roles_labeled = summary.roles_labeled,
            grants = summary.grants,
            operations = summary.operations,
            closed_targets = summary.closed_targets,
            "policy document applied"
        );

        Ok(summary)
    }
}

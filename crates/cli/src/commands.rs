//! Operator commands over a policy document.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use accessgate_core::{AccountId, OperationId, RoleId, TargetId};
use accessgate_policy::{AccessManager, PolicyDocument, Verdict};

#[derive(Debug, Parser)]
#[command(name = "accessgate", version, about = "Evaluate and audit accessgate policy documents")]
pub struct Cli {
    /// Policy document (JSON).
    #[arg(long, env = "ACCESSGATE_POLICY")]
    pub policy: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the verdict for a call; exits non-zero unless immediately allowed.
    Check(Query),
    /// Print a JSON explanation of the decision.
    Explain(Query),
    /// List the explicitly configured operations of a target.
    List {
        #[arg(long)]
        target: TargetId,
    },
}

#[derive(Debug, Args)]
pub struct Query {
    #[arg(long)]
    pub caller: AccountId,

    #[arg(long)]
    pub target: TargetId,

    /// Operation signature (e.g. `increment()`) or `0x` selector.
    #[arg(long)]
    pub operation: String,
}

#[derive(Debug, Serialize)]
struct TargetListing {
    target: TargetId,
    closed: bool,
    operations: Vec<OperationListing>,
}

#[derive(Debug, Serialize)]
struct OperationListing {
    operation: OperationId,
    role: RoleId,
}

/// Build the manager described by the document and run `command` against it.
///
/// Returns whether the command succeeded from the operator's point of view.
pub fn run(cli: Cli) -> anyhow::Result<bool> {
    let document = PolicyDocument::from_path(&cli.policy)
        .with_context(|| format!("loading policy from {}", cli.policy.display()))?;
    let manager = document
        .build_manager()
        .context("applying policy document")?;

    tracing::debug!(policy = %cli.policy.display(), manager = %manager.id(), "policy loaded");

    match cli.command {
        Command::Check(query) => {
            let operation = OperationId::resolve(&query.operation)?;
            let verdict = manager.can_call(query.caller, query.target, operation)?;
            println!("{}", serde_json::to_string(&verdict)?);
            Ok(verdict == Verdict::ImmediateAllow)
        }
        Command::Explain(query) => {
            let operation = OperationId::resolve(&query.operation)?;
            let explanation = manager.explain(query.caller, query.target, operation)?;
            println!("{}", serde_json::to_string_pretty(&explanation)?);
            Ok(true)
        }
        Command::List { target } => {
            let listing = list(&manager, document.admin, target)?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
            Ok(true)
        }
    }
}

fn list(manager: &AccessManager, admin: AccountId, target: TargetId) -> anyhow::Result<TargetListing> {
    let operations = manager
        .configured_operations(admin, target)?
        .into_iter()
        .map(|(operation, role)| OperationListing { operation, role })
        .collect();

    Ok(TargetListing {
        target,
        closed: manager.is_closed(admin, target)?,
        operations,
    })
}

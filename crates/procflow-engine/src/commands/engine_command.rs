//! Engine-level commands, one transaction boundary per call.
//!
//! ## Logging Ownership
//!
//! This layer owns lifecycle logging:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! The core only emits `tracing::debug!()` details and audit events.

#![allow(clippy::result_large_err)]

use crate::runtime::ProcessRuntime;
use procflow_core::errors::ExError;
use procflow_core::flownode::model::Session;
use procflow_core::transaction::TransactionContext;
use procflow_core::{execute_command, Command, CommandOutcome};
use procflow_core::{log_op_end, log_op_error, log_op_start};
use procflow_core_types::{AssociationId, RequestContext};

/// Commands accepted by the engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Run a core command in a fresh transaction
    Run(Command),
    /// Lock an object, run the command in a transaction, then release
    RunLocked {
        object_id: i64,
        object_type: String,
        command: Command,
    },
}

impl EngineCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EngineCommand::Run(command) | EngineCommand::RunLocked { command, .. } => {
                command.name()
            }
        }
    }
}

/// Result of applying an engine command
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommandResult {
    /// The command ran and its transaction committed
    Committed {
        outcome: CommandOutcome,
        association_id: AssociationId,
    },
}

/// Apply an engine command on behalf of `session`
///
/// ## Errors
///
/// The command's own failure, or the boundary's when the transaction could
/// not be opened or committed. Either way the transaction is rolled back and
/// the error carries the operation name and the request id.
pub fn apply_engine_command(
    cmd: EngineCommand,
    runtime: &ProcessRuntime,
    session: &Session,
    request: &RequestContext,
) -> Result<EngineCommandResult, ExError> {
    let op = cmd.name();
    log_op_start!(
        op,
        request_id = request.request_id.as_str(),
        user_id = session.user_id
    );
    let start = std::time::Instant::now();

    let mut ctx = TransactionContext::new();
    let association_id = ctx.association().clone();

    let outcome = apply_engine_command_impl(cmd, runtime, session, &mut ctx).map_err(|e| {
        let mut ex_err = ExError::from(e)
            .with_op(op)
            .with_request_id(request.request_id.clone());
        if let Some(trace_id) = &request.trace_id {
            ex_err = ex_err.with_trace_id(trace_id.clone());
        }
        log_op_error!(
            op,
            ex_err.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = request.request_id.as_str()
        );
        ex_err
    })?;

    log_op_end!(
        op,
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = request.request_id.as_str(),
        association_id = association_id.as_str()
    );

    Ok(EngineCommandResult::Committed {
        outcome,
        association_id,
    })
}

fn apply_engine_command_impl(
    cmd: EngineCommand,
    runtime: &ProcessRuntime,
    session: &Session,
    ctx: &mut TransactionContext,
) -> procflow_core::Result<CommandOutcome> {
    let services = runtime.services();
    match cmd {
        EngineCommand::Run(command) => runtime
            .transactions()
            .execute_in_transaction(ctx, |_| execute_command(services, session, command)),
        EngineCommand::RunLocked {
            object_id,
            object_type,
            command,
        } => runtime.transactions().execute_locked(
            ctx,
            runtime.locks(),
            object_id,
            &object_type,
            |_| execute_command(services, session, command),
        ),
    }
}

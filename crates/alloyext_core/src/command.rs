//! Command protocol shared by instance handles and the external SDK.
//!
//! # Responsibility
//! - Define the `(name, payload?)` shape forwarded to SDK instances.
//! - Provide the pending-result type returned by every handle invocation.
//!
//! # Invariants
//! - A `CommandFuture` settles with exactly the result the real instance
//!   produced for that call, or with a load/abandon error.
//! - Dropping a `CommandFuture` never retracts an already submitted command.

use crate::loader::LoadFailure;
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Command name issued once per instance during bootstrap.
pub const CONFIGURE_COMMAND: &str = "configure";

pub type CommandResult = Result<Value, CommandError>;

/// One invocation forwarded to an SDK instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    /// Command name, e.g. `configure` or `getEcid`.
    pub name: String,
    /// Optional command options object.
    pub payload: Option<Value>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    pub fn with_payload(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload: Some(payload),
        }
    }

    /// Builds the `configure` command carrying per-instance settings.
    pub fn configure(payload: Value) -> Self {
        Self::with_payload(CONFIGURE_COMMAND, payload)
    }
}

/// Failure settled into a command's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The real implementation rejected this call.
    Rejected { command: String, message: String },
    /// The SDK library failed to load; no instance can serve commands.
    LibraryLoadFailed {
        instance_name: String,
        failure: LoadFailure,
    },
    /// The handle was dropped while the command was still queued.
    Abandoned { instance_name: String },
}

impl CommandError {
    pub fn rejected(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            command: command.into(),
            message: message.into(),
        }
    }
}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected { command, message } => {
                write!(f, "command `{command}` rejected: {message}")
            }
            Self::LibraryLoadFailed {
                instance_name,
                failure,
            } => write!(
                f,
                "instance `{instance_name}` is unavailable because the SDK library failed to load: {failure}"
            ),
            Self::Abandoned { instance_name } => write!(
                f,
                "command queued on instance `{instance_name}` was abandoned before the SDK loaded"
            ),
        }
    }
}

impl Error for CommandError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::LibraryLoadFailed { failure, .. } => Some(failure),
            Self::Rejected { .. } | Self::Abandoned { .. } => None,
        }
    }
}

/// What the drain step hands to a queued command: either the submitted
/// call on the real instance, or the reason it can never be submitted.
pub(crate) type Dispatch = Result<BoxFuture<'static, CommandResult>, CommandError>;

pub(crate) type DispatchSender = oneshot::Sender<Dispatch>;

/// Pending result of one handle invocation.
///
/// Created synchronously by [`InstanceHandle::call`](crate::InstanceHandle::call);
/// awaiting it is the only suspension point for callers.
#[must_use = "the command is submitted either way; await the future to observe its result"]
pub struct CommandFuture {
    inner: BoxFuture<'static, CommandResult>,
}

impl CommandFuture {
    /// Future for a command already submitted to the real instance.
    pub(crate) fn submitted(call: BoxFuture<'static, CommandResult>) -> Self {
        Self { inner: call }
    }

    /// Future for a command parked in a shim queue.
    pub(crate) fn queued(receiver: oneshot::Receiver<Dispatch>, instance_name: String) -> Self {
        let inner = async move {
            match receiver.await {
                Ok(Ok(call)) => call.await,
                Ok(Err(err)) => Err(err),
                Err(_) => Err(CommandError::Abandoned { instance_name }),
            }
        };
        Self {
            inner: inner.boxed(),
        }
    }

    /// Future that is already settled.
    pub(crate) fn settled(result: CommandResult) -> Self {
        Self {
            inner: futures::future::ready(result).boxed(),
        }
    }
}

impl Future for CommandFuture {
    type Output = CommandResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl std::fmt::Debug for CommandFuture {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandFuture").finish_non_exhaustive()
    }
}

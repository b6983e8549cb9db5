//! Callable instance handle with shim and real-implementation states.
//!
//! # Responsibility
//! - Accept invocations before the SDK has loaded and park them in FIFO order.
//! - Swap the backing implementation in place once the SDK arrives.
//!
//! # Invariants
//! - A handle's identity never changes; clones share one state.
//! - `Pending -> Ready` and `Pending -> Failed` are the only transitions and
//!   each happens at most once.
//! - Queued commands are submitted to the real instance in enqueue order,
//!   including commands enqueued while the drain is in progress.

use crate::command::{Command, CommandError, CommandFuture, DispatchSender};
use crate::loader::{LoadFailure, SdkInstance};
use log::{debug, warn};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// Queue length at which a stalled-load warning is logged for one handle.
///
/// The queue is never capped; this only surfaces the liveness risk.
pub const QUEUE_WARN_THRESHOLD: usize = 256;

/// Observable lifecycle state of one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStatus {
    /// Shim state; `queued` commands await the SDK.
    Pending { queued: usize },
    /// Backed by the real SDK instance.
    Ready,
    /// The SDK failed to load; all calls reject.
    Failed,
}

struct QueuedCommand {
    command: Command,
    sender: DispatchSender,
}

enum HandleState {
    Pending { queue: VecDeque<QueuedCommand> },
    Ready { instance: Arc<dyn SdkInstance> },
    Failed { failure: LoadFailure },
}

struct HandleInner {
    name: String,
    state: Mutex<HandleState>,
}

/// Shared callable identity for one named SDK instance.
#[derive(Clone)]
pub struct InstanceHandle {
    inner: Arc<HandleInner>,
}

impl InstanceHandle {
    pub(crate) fn shim(name: impl Into<String>) -> Self {
        Self::with_state(
            name.into(),
            HandleState::Pending {
                queue: VecDeque::new(),
            },
        )
    }

    pub(crate) fn failed(name: impl Into<String>, failure: LoadFailure) -> Self {
        Self::with_state(name.into(), HandleState::Failed { failure })
    }

    fn with_state(name: String, state: HandleState) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                name,
                state: Mutex::new(state),
            }),
        }
    }

    /// Instance name this handle is registered under.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns whether both values are the same handle identity.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn status(&self) -> HandleStatus {
        match &*self.lock() {
            HandleState::Pending { queue } => HandleStatus::Pending {
                queued: queue.len(),
            },
            HandleState::Ready { .. } => HandleStatus::Ready,
            HandleState::Failed { .. } => HandleStatus::Failed,
        }
    }

    pub(crate) fn queued_len(&self) -> usize {
        match &*self.lock() {
            HandleState::Pending { queue } => queue.len(),
            _ => 0,
        }
    }

    /// Invokes the instance without blocking.
    ///
    /// While the SDK is loading the command is queued; once loaded it goes
    /// straight to the real instance; after a load failure it rejects.
    pub fn call(&self, command: Command) -> CommandFuture {
        let instance = {
            let mut state = self.lock();
            match &mut *state {
                HandleState::Pending { queue } => {
                    let (sender, receiver) = oneshot::channel();
                    debug!(
                        "event=command_queued module=instance instance={} command={} position={}",
                        self.inner.name,
                        command.name,
                        queue.len()
                    );
                    queue.push_back(QueuedCommand { command, sender });
                    if queue.len() == QUEUE_WARN_THRESHOLD {
                        warn!(
                            "event=queue_backlog module=instance status=warn instance={} queued={} reason=sdk_not_loaded",
                            self.inner.name,
                            queue.len()
                        );
                    }
                    return CommandFuture::queued(receiver, self.inner.name.clone());
                }
                HandleState::Ready { instance } => Arc::clone(instance),
                HandleState::Failed { failure } => {
                    return CommandFuture::settled(Err(CommandError::LibraryLoadFailed {
                        instance_name: self.inner.name.clone(),
                        failure: failure.clone(),
                    }));
                }
            }
        };
        CommandFuture::submitted(instance.invoke(command))
    }

    /// Shorthand for `call` with a command name and optional payload.
    pub fn invoke(&self, name: &str, payload: Option<Value>) -> CommandFuture {
        self.call(Command {
            name: name.to_string(),
            payload,
        })
    }

    /// Switches the handle to the real instance and replays its queue.
    ///
    /// Returns the number of replayed commands. A handle that already left
    /// the pending state is left untouched.
    pub(crate) fn upgrade(&self, instance: Arc<dyn SdkInstance>) -> usize {
        let mut replayed = 0;
        loop {
            // The lock is released around `invoke` so the real instance may
            // call back into this handle; such calls land behind the backlog.
            let next = {
                let mut state = self.lock();
                match &mut *state {
                    HandleState::Pending { queue } => match queue.pop_front() {
                        Some(queued) => queued,
                        None => {
                            *state = HandleState::Ready {
                                instance: Arc::clone(&instance),
                            };
                            break;
                        }
                    },
                    _ => {
                        warn!(
                            "event=handle_upgrade module=instance status=skipped instance={} reason=not_pending",
                            self.inner.name
                        );
                        return replayed;
                    }
                }
            };

            let call = instance.invoke(next.command);
            // A dropped receiver means the caller stopped listening; the
            // command itself is already submitted.
            let _ = next.sender.send(Ok(call));
            replayed += 1;
        }

        debug!(
            "event=queue_drained module=instance status=ok instance={} replayed={}",
            self.inner.name, replayed
        );
        replayed
    }

    /// Marks the handle unusable and rejects every queued command.
    ///
    /// Returns the number of rejected commands.
    pub(crate) fn fail(&self, failure: &LoadFailure) -> usize {
        let queue = {
            let mut state = self.lock();
            match &mut *state {
                HandleState::Pending { queue } => {
                    let queue = std::mem::take(queue);
                    *state = HandleState::Failed {
                        failure: failure.clone(),
                    };
                    queue
                }
                _ => return 0,
            }
        };

        let rejected = queue.len();
        for queued in queue {
            let _ = queued.sender.send(Err(CommandError::LibraryLoadFailed {
                instance_name: self.inner.name.clone(),
                failure: failure.clone(),
            }));
        }
        rejected
    }

    fn lock(&self) -> MutexGuard<'_, HandleState> {
        // State is replaced whole under the lock, so a poisoned guard still
        // holds a consistent value.
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for InstanceHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("name", &self.inner.name)
            .field("status", &self.status())
            .finish()
    }
}

//! SDK library loading and shim reconciliation.
//!
//! # Responsibility
//! - Define the seams to the external SDK (library source, library, instance).
//! - Run the library load once per namespace and reconcile every shim with it.
//!
//! # Invariants
//! - The load is triggered at most once; later triggers are rejected without
//!   touching namespace state.
//! - On success every registered handle is upgraded and its queue replayed in
//!   FIFO order; on failure every queued and future command is rejected.
//! - Dropping `run` mid-load counts as a failure, never a silent `Loading`.

use crate::command::{Command, CommandResult};
use crate::instance::namespace::InstanceNamespace;
use futures::future::BoxFuture;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Failure reason recorded when a load is dropped while in flight.
pub const LOAD_CANCELLED_REASON: &str = "library load cancelled";

/// One live SDK instance.
///
/// Calling `invoke` is the submission point: the drain step relies on the
/// call order of `invoke`, not on when the returned future completes.
pub trait SdkInstance: Send + Sync {
    fn invoke(&self, command: Command) -> BoxFuture<'static, CommandResult>;
}

/// Loaded SDK library able to back named instances.
pub trait SdkLibrary: Send + Sync {
    fn create_instance(&self, instance_name: &str) -> Arc<dyn SdkInstance>;
}

/// Asynchronous provider of the SDK library (script fetch, plugin load, ...).
pub trait LibrarySource: Send + Sync {
    fn load(&self) -> BoxFuture<'static, Result<Arc<dyn SdkLibrary>, LoadFailure>>;
}

/// Fatal library load failure shared by every instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub reason: String,
}

impl LoadFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Display for LoadFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl Error for LoadFailure {}

/// Errors returned by [`LibraryLoader::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    AlreadyTriggered,
    Failed(LoadFailure),
}

impl Display for LoaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyTriggered => write!(f, "SDK library load was already triggered"),
            Self::Failed(failure) => write!(f, "SDK library failed to load: {failure}"),
        }
    }
}

impl Error for LoaderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AlreadyTriggered => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

/// Summary of a successful load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadReport {
    /// Handles upgraded to the real implementation, in registration order.
    pub upgraded: Vec<String>,
    /// Queued commands replayed against real instances.
    pub replayed: usize,
}

/// Drives the one-time library load for a namespace.
pub struct LibraryLoader {
    namespace: Arc<InstanceNamespace>,
}

impl LibraryLoader {
    pub fn new(namespace: Arc<InstanceNamespace>) -> Self {
        Self { namespace }
    }

    /// Loads the SDK library and reconciles all shims with it.
    ///
    /// # Errors
    /// - `AlreadyTriggered` when a load was started before on this namespace.
    /// - `Failed` when the source fails; all queued commands are rejected.
    pub async fn run(&self, source: &dyn LibrarySource) -> Result<LoadReport, LoaderError> {
        if !self.namespace.begin_load() {
            return Err(LoaderError::AlreadyTriggered);
        }

        let mut guard = LoadGuard {
            namespace: &self.namespace,
            armed: true,
        };
        let started_at = Instant::now();
        info!(
            "event=library_load module=loader status=start instances={}",
            self.namespace.len()
        );

        let outcome = source.load().await;
        guard.armed = false;
        match outcome {
            Ok(library) => {
                let report = self.namespace.complete_load(library);
                info!(
                    "event=library_load module=loader status=ok duration_ms={} upgraded={} replayed={}",
                    started_at.elapsed().as_millis(),
                    report.upgraded.len(),
                    report.replayed
                );
                Ok(report)
            }
            Err(failure) => {
                let rejected = self.namespace.fail_load(failure.clone());
                error!(
                    "event=library_load module=loader status=error duration_ms={} rejected={} error={}",
                    started_at.elapsed().as_millis(),
                    rejected,
                    failure
                );
                Err(LoaderError::Failed(failure))
            }
        }
    }
}

/// Fails the load when `run` is dropped before the source settles.
struct LoadGuard<'a> {
    namespace: &'a InstanceNamespace,
    armed: bool,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let rejected = self
            .namespace
            .fail_load(LoadFailure::new(LOAD_CANCELLED_REASON));
        warn!(
            "event=library_load module=loader status=cancelled rejected={}",
            rejected
        );
    }
}

//! Process-wide namespace of instance handles.
//!
//! # Responsibility
//! - Own exactly one handle per instance name for the namespace lifetime.
//! - Track the SDK library load state so late shims match the current phase.
//!
//! # Invariants
//! - `create_shim` never replaces an existing handle or its queue.
//! - Handle names are kept in registration order.
//! - Load state moves `NotStarted -> Loading -> Loaded | Failed` only.

use crate::instance::handle::InstanceHandle;
use crate::loader::{LoadFailure, LoadReport, SdkLibrary};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Observable SDK library load phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    NotStarted,
    Loading,
    Loaded,
    Failed(LoadFailure),
}

enum LibraryState {
    NotStarted,
    Loading,
    Loaded(Arc<dyn SdkLibrary>),
    Failed(LoadFailure),
}

struct NamespaceState {
    handles: HashMap<String, InstanceHandle>,
    order: Vec<String>,
    library: LibraryState,
}

/// Registry of named handles shared by bootstrapper, loader and accessor.
///
/// Create one per process at startup and pass it around behind `Arc`.
pub struct InstanceNamespace {
    state: Mutex<NamespaceState>,
}

impl Default for InstanceNamespace {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceNamespace {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NamespaceState {
                handles: HashMap::new(),
                order: Vec::new(),
                library: LibraryState::NotStarted,
            }),
        }
    }

    /// Returns the handle for `name`, installing a shim when none exists.
    ///
    /// After a successful load the new handle is backed by the real instance
    /// immediately; after a failed load it starts in the failed state.
    pub fn create_shim(&self, name: &str) -> InstanceHandle {
        let (handle, library) = {
            let mut state = self.lock();
            if let Some(existing) = state.handles.get(name) {
                debug!("event=shim_create module=namespace status=exists instance={name}");
                return existing.clone();
            }

            let (handle, library) = match &state.library {
                LibraryState::NotStarted | LibraryState::Loading => {
                    (InstanceHandle::shim(name), None)
                }
                LibraryState::Loaded(library) => {
                    (InstanceHandle::shim(name), Some(Arc::clone(library)))
                }
                LibraryState::Failed(failure) => {
                    (InstanceHandle::failed(name, failure.clone()), None)
                }
            };
            state.handles.insert(name.to_string(), handle.clone());
            state.order.push(name.to_string());
            (handle, library)
        };

        info!(
            "event=shim_create module=namespace status=ok instance={name} late={}",
            library.is_some()
        );
        if let Some(library) = library {
            handle.upgrade(library.create_instance(name));
        }
        handle
    }

    /// Returns the current handle registered under `name`.
    pub fn get(&self, name: &str) -> Option<InstanceHandle> {
        self.lock().handles.get(name).cloned()
    }

    /// Registered handle names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.lock().order.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().order.is_empty()
    }

    /// Total commands still waiting for the SDK across all handles.
    pub fn pending_commands(&self) -> usize {
        self.snapshot().iter().map(InstanceHandle::queued_len).sum()
    }

    pub fn load_state(&self) -> LoadState {
        match &self.lock().library {
            LibraryState::NotStarted => LoadState::NotStarted,
            LibraryState::Loading => LoadState::Loading,
            LibraryState::Loaded(_) => LoadState::Loaded,
            LibraryState::Failed(failure) => LoadState::Failed(failure.clone()),
        }
    }

    /// Marks the load as started. Returns `false` when it already was.
    pub(crate) fn begin_load(&self) -> bool {
        let mut state = self.lock();
        if !matches!(state.library, LibraryState::NotStarted) {
            return false;
        }
        state.library = LibraryState::Loading;
        true
    }

    /// Publishes the loaded library and upgrades every registered handle.
    pub(crate) fn complete_load(&self, library: Arc<dyn SdkLibrary>) -> LoadReport {
        let handles = {
            let mut state = self.lock();
            state.library = LibraryState::Loaded(Arc::clone(&library));
            Self::ordered_handles(&state)
        };

        let mut report = LoadReport::default();
        for handle in handles {
            report.replayed += handle.upgrade(library.create_instance(handle.name()));
            report.upgraded.push(handle.name().to_string());
        }
        report
    }

    /// Records a fatal load failure and rejects every queued command.
    ///
    /// Returns the number of rejected commands.
    pub(crate) fn fail_load(&self, failure: LoadFailure) -> usize {
        let handles = {
            let mut state = self.lock();
            state.library = LibraryState::Failed(failure.clone());
            Self::ordered_handles(&state)
        };

        handles.iter().map(|handle| handle.fail(&failure)).sum()
    }

    fn snapshot(&self) -> Vec<InstanceHandle> {
        Self::ordered_handles(&self.lock())
    }

    fn ordered_handles(state: &NamespaceState) -> Vec<InstanceHandle> {
        state
            .order
            .iter()
            .filter_map(|name| state.handles.get(name).cloned())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, NamespaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

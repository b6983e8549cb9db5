//! Instance manager facade used by the extension runtime.
//!
//! # Responsibility
//! - Wire bootstrapper, registry and loader around one shared namespace.
//! - Expose property-ID lookups to downstream collaborators.
//!
//! # Invariants
//! - Every configured account has a handle with a queued `configure` before
//!   the library load can start.

use crate::bootstrap::{bootstrap, AccountConfigError, ConfiguredInstance};
use crate::config::ExtensionSettings;
use crate::instance::handle::InstanceHandle;
use crate::instance::namespace::InstanceNamespace;
use crate::loader::{LibraryLoader, LibrarySource, LoadReport, LoaderError};
use crate::registry::{InstanceLookup, InstanceRegistry};
use std::sync::Arc;

/// Result of [`InstanceManager::start`].
#[derive(Debug)]
pub struct Startup {
    pub manager: InstanceManager,
    /// Pending `configure` results, one per account in settings order.
    pub configured: Vec<ConfiguredInstance>,
}

/// Owns the accessor and the one-time loader for a namespace.
pub struct InstanceManager {
    namespace: Arc<InstanceNamespace>,
    registry: InstanceRegistry,
    loader: LibraryLoader,
}

impl InstanceManager {
    /// Bootstraps every configured account and builds the accessor.
    ///
    /// # Errors
    /// Returns [`AccountConfigError`] for an invalid account list; nothing is
    /// registered in that case.
    pub fn start(
        namespace: Arc<InstanceNamespace>,
        settings: &ExtensionSettings,
    ) -> Result<Startup, AccountConfigError> {
        let configured = bootstrap(&namespace, &settings.accounts)?;
        let registry = InstanceRegistry::from_accounts(Arc::clone(&namespace), &settings.accounts);
        let loader = LibraryLoader::new(Arc::clone(&namespace));
        Ok(Startup {
            manager: Self {
                namespace,
                registry,
                loader,
            },
            configured,
        })
    }

    /// Loads the SDK library once and replays queued commands.
    pub async fn load(&self, source: &dyn LibrarySource) -> Result<LoadReport, LoaderError> {
        self.loader.run(source).await
    }

    pub fn get_instance(&self, property_id: &str) -> Option<InstanceHandle> {
        self.registry.get_instance(property_id)
    }

    pub fn get_accessor(&self, property_id: &str) -> Option<InstanceHandle> {
        self.registry.get_accessor(property_id)
    }

    pub fn get_by_instance_name(&self, instance_name: &str) -> Option<InstanceHandle> {
        self.registry.get_by_instance_name(instance_name)
    }

    pub fn namespace(&self) -> &Arc<InstanceNamespace> {
        &self.namespace
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }
}

impl InstanceLookup for InstanceManager {
    fn instance_by_name(&self, instance_name: &str) -> Option<InstanceHandle> {
        self.get_by_instance_name(instance_name)
    }
}

impl std::fmt::Debug for InstanceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceManager")
            .field("instances", &self.namespace.names())
            .field("load_state", &self.namespace.load_state())
            .finish()
    }
}

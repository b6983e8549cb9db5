//! Core instance management for the analytics SDK extension.
//! Owns handle lifecycles, command queuing and property-ID lookups.

pub mod bootstrap;
pub mod collaborators;
pub mod command;
pub mod config;
pub mod instance;
pub mod loader;
pub mod logging;
pub mod manager;
pub mod registry;

pub use bootstrap::{bootstrap, validate_accounts, AccountConfigError, ConfiguredInstance};
pub use collaborators::customer_ids::{
    set_customer_ids, ActionError, AuthenticatedState, CustomerId, SetCustomerIdsSettings,
};
pub use collaborators::ecid::{resolve_ecid, EcidSettings};
pub use command::{Command, CommandError, CommandFuture, CommandResult, CONFIGURE_COMMAND};
pub use config::{Account, ConfigError, ExtensionSettings};
pub use instance::handle::{HandleStatus, InstanceHandle, QUEUE_WARN_THRESHOLD};
pub use instance::namespace::{InstanceNamespace, LoadState};
pub use loader::{
    LibraryLoader, LibrarySource, LoadFailure, LoadReport, LoaderError, SdkInstance, SdkLibrary,
    LOAD_CANCELLED_REASON,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use manager::{InstanceManager, Startup};
pub use registry::{InstanceLookup, InstanceRegistry};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

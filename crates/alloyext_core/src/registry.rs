//! Property ID to instance handle lookup.
//!
//! # Responsibility
//! - Map each configured property ID to its instance name.
//! - Resolve the live handle from the namespace on every lookup.
//!
//! # Invariants
//! - The mapping is built once from the account list and never mutated.
//! - No handle reference is cached; upgrades are always observed.
//! - A miss is `None`, never an error.

use crate::config::Account;
use crate::instance::handle::InstanceHandle;
use crate::instance::namespace::InstanceNamespace;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Lookup seam used by data elements and actions.
pub trait InstanceLookup {
    /// Returns the live handle for a configured instance name.
    fn instance_by_name(&self, instance_name: &str) -> Option<InstanceHandle>;
}

/// Read-only accessor over configured accounts.
pub struct InstanceRegistry {
    namespace: Arc<InstanceNamespace>,
    by_property_id: BTreeMap<String, String>,
    instance_names: BTreeSet<String>,
}

impl InstanceRegistry {
    pub fn from_accounts(namespace: Arc<InstanceNamespace>, accounts: &[Account]) -> Self {
        let mut by_property_id = BTreeMap::new();
        let mut instance_names = BTreeSet::new();
        for account in accounts {
            // First account wins, matching a linear scan of the list.
            by_property_id
                .entry(account.property_id.clone())
                .or_insert_with(|| account.instance_name.clone());
            instance_names.insert(account.instance_name.clone());
        }
        Self {
            namespace,
            by_property_id,
            instance_names,
        }
    }

    pub fn len(&self) -> usize {
        self.by_property_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_property_id.is_empty()
    }

    /// Configured instance name for `property_id`.
    pub fn instance_name_for(&self, property_id: &str) -> Option<&str> {
        self.by_property_id.get(property_id).map(String::as_str)
    }

    /// Returns the current handle of the account owning `property_id`.
    pub fn get_instance(&self, property_id: &str) -> Option<InstanceHandle> {
        let Some(instance_name) = self.instance_name_for(property_id) else {
            debug!("event=instance_lookup module=registry status=miss key=property_id");
            return None;
        };
        self.namespace.get(instance_name)
    }

    /// Alias of [`get_instance`](Self::get_instance) for accessor callers.
    pub fn get_accessor(&self, property_id: &str) -> Option<InstanceHandle> {
        self.get_instance(property_id)
    }

    /// Returns the current handle of a configured instance name.
    pub fn get_by_instance_name(&self, instance_name: &str) -> Option<InstanceHandle> {
        if !self.instance_names.contains(instance_name) {
            debug!("event=instance_lookup module=registry status=miss key=instance_name");
            return None;
        }
        self.namespace.get(instance_name)
    }
}

impl InstanceLookup for InstanceRegistry {
    fn instance_by_name(&self, instance_name: &str) -> Option<InstanceHandle> {
        self.get_by_instance_name(instance_name)
    }
}

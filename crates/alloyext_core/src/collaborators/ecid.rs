//! ECID data element.

use crate::registry::InstanceLookup;
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GET_ECID_COMMAND: &str = "getEcid";

/// Data element settings saved by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcidSettings {
    pub instance_name: String,
}

/// Resolves the ECID of the configured instance.
///
/// Lookup misses and command failures are logged and yield `None`.
pub async fn resolve_ecid(lookup: &impl InstanceLookup, settings: &EcidSettings) -> Option<Value> {
    let Some(instance) = lookup.instance_by_name(&settings.instance_name) else {
        error!(
            "Failed to retrieve ECID for instance \"{}\". No matching instance was configured with this name.",
            settings.instance_name
        );
        return None;
    };

    match instance.invoke(GET_ECID_COMMAND, None).await {
        Ok(ecid) => Some(ecid),
        Err(err) => {
            error!(
                "Failed to retrieve ECID for instance \"{}\". {err}",
                settings.instance_name
            );
            None
        }
    }
}

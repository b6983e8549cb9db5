//! Set customer IDs action.
//!
//! Forwards the configured identities to the named instance. Unlike the data
//! element, failures are returned so the host can mark the rule as failed.

use crate::command::{Command, CommandError};
use crate::registry::InstanceLookup;
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const SET_CUSTOMER_IDS_COMMAND: &str = "setCustomerIds";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthenticatedState {
    Ambiguous,
    Authenticated,
    LoggedOut,
}

/// One identity entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerId {
    pub namespace: String,
    pub id: String,
    pub authenticated_state: AuthenticatedState,
    #[serde(default)]
    pub primary: bool,
    /// Whether the SDK should hash `id` before sending it.
    #[serde(default)]
    pub hash: bool,
}

/// Action settings saved by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCustomerIdsSettings {
    pub instance_name: String,
    #[serde(default)]
    pub customer_ids: Vec<CustomerId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    InstanceNotFound(String),
    Command(CommandError),
}

impl Display for ActionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InstanceNotFound(name) => write!(
                f,
                "no matching instance was configured with the name \"{name}\""
            ),
            Self::Command(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ActionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InstanceNotFound(_) => None,
            Self::Command(err) => Some(err),
        }
    }
}

impl From<CommandError> for ActionError {
    fn from(value: CommandError) -> Self {
        Self::Command(value)
    }
}

/// Sends `setCustomerIds` to the configured instance.
pub async fn set_customer_ids(
    lookup: &impl InstanceLookup,
    settings: &SetCustomerIdsSettings,
) -> Result<Value, ActionError> {
    let Some(instance) = lookup.instance_by_name(&settings.instance_name) else {
        error!(
            "Failed to set customer IDs for instance \"{}\". No matching instance was configured with this name.",
            settings.instance_name
        );
        return Err(ActionError::InstanceNotFound(settings.instance_name.clone()));
    };

    let payload = json!({ "customerIds": settings.customer_ids });
    let result = instance
        .call(Command::with_payload(SET_CUSTOMER_IDS_COMMAND, payload))
        .await?;
    Ok(result)
}

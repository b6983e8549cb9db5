//! Per-account handle creation and configuration.
//!
//! # Responsibility
//! - Validate the account list before touching the namespace.
//! - Ensure one handle per account and issue its `configure` command first.
//!
//! # Invariants
//! - On a validation error no handle is created.
//! - `configure` goes through the regular queue, so it is the first command
//!   of every handle created here.

use crate::command::{Command, CommandFuture};
use crate::config::Account;
use crate::instance::namespace::InstanceNamespace;
use log::{error, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Handle configured for one account, with its pending `configure` result.
#[derive(Debug)]
pub struct ConfiguredInstance {
    pub instance_name: String,
    pub property_id: String,
    pub configure: CommandFuture,
}

/// Account list problems detected before bootstrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountConfigError {
    MissingInstanceName {
        index: usize,
    },
    NumericInstanceName {
        index: usize,
        instance_name: String,
    },
    MissingPropertyId {
        index: usize,
        instance_name: String,
    },
    DuplicateInstanceName {
        index: usize,
        instance_name: String,
    },
    DuplicatePropertyId {
        index: usize,
        property_id: String,
    },
    /// Leading or trailing whitespace; identifiers are used verbatim.
    PaddedIdentifier {
        index: usize,
        field: &'static str,
        value: String,
    },
}

impl AccountConfigError {
    /// Stable machine-readable code for host reporting.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingInstanceName { .. } => "missing_instance_name",
            Self::NumericInstanceName { .. } => "numeric_instance_name",
            Self::MissingPropertyId { .. } => "missing_property_id",
            Self::DuplicateInstanceName { .. } => "duplicate_instance_name",
            Self::DuplicatePropertyId { .. } => "duplicate_property_id",
            Self::PaddedIdentifier { .. } => "padded_identifier",
        }
    }

    /// Index of the offending account in the configured list.
    pub fn index(&self) -> usize {
        match self {
            Self::MissingInstanceName { index }
            | Self::NumericInstanceName { index, .. }
            | Self::MissingPropertyId { index, .. }
            | Self::DuplicateInstanceName { index, .. }
            | Self::DuplicatePropertyId { index, .. }
            | Self::PaddedIdentifier { index, .. } => *index,
        }
    }
}

impl Display for AccountConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingInstanceName { index } => {
                write!(f, "accounts[{index}]: instance name is required")
            }
            Self::NumericInstanceName {
                index,
                instance_name,
            } => write!(
                f,
                "accounts[{index}]: instance name `{instance_name}` must contain a non-digit character"
            ),
            Self::MissingPropertyId {
                index,
                instance_name,
            } => write!(
                f,
                "accounts[{index}]: property ID is required for instance `{instance_name}`"
            ),
            Self::DuplicateInstanceName {
                index,
                instance_name,
            } => write!(
                f,
                "accounts[{index}]: instance name `{instance_name}` is already configured"
            ),
            Self::DuplicatePropertyId { index, property_id } => write!(
                f,
                "accounts[{index}]: property ID `{property_id}` is already configured"
            ),
            Self::PaddedIdentifier {
                index,
                field,
                value,
            } => write!(
                f,
                "accounts[{index}]: {field} `{value}` has leading or trailing whitespace"
            ),
        }
    }
}

impl Error for AccountConfigError {}

/// Checks identifiers and uniqueness across the whole account list.
pub fn validate_accounts(accounts: &[Account]) -> Result<(), AccountConfigError> {
    let mut instance_names = HashMap::<&str, usize>::new();
    let mut property_ids = HashMap::<&str, usize>::new();

    for (index, account) in accounts.iter().enumerate() {
        let instance_name = account.instance_name.as_str();
        if instance_name.trim().is_empty() {
            return Err(AccountConfigError::MissingInstanceName { index });
        }
        reject_padding(index, "instanceName", instance_name)?;
        if instance_name.chars().all(|c| c.is_ascii_digit()) {
            return Err(AccountConfigError::NumericInstanceName {
                index,
                instance_name: instance_name.to_string(),
            });
        }
        let property_id = account.property_id.as_str();
        if property_id.trim().is_empty() {
            return Err(AccountConfigError::MissingPropertyId {
                index,
                instance_name: instance_name.to_string(),
            });
        }
        reject_padding(index, "propertyID", property_id)?;
        if instance_names.insert(instance_name, index).is_some() {
            return Err(AccountConfigError::DuplicateInstanceName {
                index,
                instance_name: instance_name.to_string(),
            });
        }
        if property_ids.insert(property_id, index).is_some() {
            return Err(AccountConfigError::DuplicatePropertyId {
                index,
                property_id: property_id.to_string(),
            });
        }
    }
    Ok(())
}

fn reject_padding(
    index: usize,
    field: &'static str,
    value: &str,
) -> Result<(), AccountConfigError> {
    if value.trim() != value {
        return Err(AccountConfigError::PaddedIdentifier {
            index,
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Creates (or reuses) a handle per account and queues its `configure`.
///
/// # Errors
/// Returns the first [`AccountConfigError`]; the namespace is left untouched.
pub fn bootstrap(
    namespace: &InstanceNamespace,
    accounts: &[Account],
) -> Result<Vec<ConfiguredInstance>, AccountConfigError> {
    if let Err(err) = validate_accounts(accounts) {
        error!(
            "event=bootstrap module=bootstrap status=error error_code={} index={}",
            err.code(),
            err.index()
        );
        return Err(err);
    }

    let configured = accounts
        .iter()
        .map(|account| {
            let handle = namespace.create_shim(&account.instance_name);
            let configure = handle.call(Command::configure(account.configure_payload()));
            ConfiguredInstance {
                instance_name: account.instance_name.clone(),
                property_id: account.property_id.clone(),
                configure,
            }
        })
        .collect::<Vec<_>>();

    info!(
        "event=bootstrap module=bootstrap status=ok instances={}",
        configured.len()
    );
    Ok(configured)
}

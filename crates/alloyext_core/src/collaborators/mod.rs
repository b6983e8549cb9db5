//! Data elements and actions that reach SDK instances through a lookup.

pub mod customer_ids;
pub mod ecid;

//! Instance handles and the namespace that owns them.
//!
//! Handles start as queueing shims and are upgraded in place by the library
//! loader; the namespace guarantees one handle identity per instance name.

pub mod handle;
pub mod namespace;

//! Persistent state: settings, storage layout, deployment records

pub mod deployments;
pub mod layout;
pub mod settings;

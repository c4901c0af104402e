//! Server state

use std::sync::Arc;

use crate::deploy::engine::DeployEngine;

/// Server state shared across handlers
pub struct ServerState {
    pub engine: Arc<DeployEngine>,
}

impl ServerState {
    pub fn new(engine: Arc<DeployEngine>) -> Self {
        Self { engine }
    }
}

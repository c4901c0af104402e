//! Deployment state transitions

use crate::errors::DeployError;
use crate::models::deployment::DeployState;

/// Event driving a deployment state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployEvent {
    /// A deploy run starts
    Deploy,

    /// The deploy run finished every step
    DeploySucceeded,

    /// The deploy run aborted on an error
    DeployFailed,
}

/// Compute the successor state, rejecting transitions the lifecycle does
/// not allow
pub fn transition(state: DeployState, event: DeployEvent) -> Result<DeployState, DeployError> {
    let next = match (state, event) {
        // From Idle
        (DeployState::Idle, DeployEvent::Deploy) => DeployState::Deploying,

        // From Deploying
        (DeployState::Deploying, DeployEvent::DeploySucceeded) => DeployState::Deployed,
        (DeployState::Deploying, DeployEvent::DeployFailed) => DeployState::Failed,
        // A crashed process can leave a persisted record in deploying; a
        // fresh run takes it over
        (DeployState::Deploying, DeployEvent::Deploy) => DeployState::Deploying,

        // From Deployed / Failed: re-deploy
        (DeployState::Deployed, DeployEvent::Deploy) => DeployState::Deploying,
        (DeployState::Failed, DeployEvent::Deploy) => DeployState::Deploying,

        (state, event) => {
            return Err(DeployError::StateError(format!(
                "invalid transition: {:?} -> {:?}",
                state, event
            )));
        }
    };

    Ok(next)
}

//! Observes whether an operator is installed.
use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{
    control_plane::ControlPlane,
    registry::CanonicalOperatorId,
    utils::{Clock, Context},
    Error,
};

/// Install state as observed on the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    /// No Operator resource exists.
    NotInstalled,
    /// OLM reports the operator.
    Installed,
}

impl InstallState {
    /// Report whether the state is [`InstallState::Installed`].
    pub fn is_installed(&self) -> bool {
        matches!(self, InstallState::Installed)
    }
}

impl From<bool> for InstallState {
    fn from(installed: bool) -> Self {
        if installed {
            InstallState::Installed
        } else {
            InstallState::NotInstalled
        }
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallState::NotInstalled => f.write_str("not installed"),
            InstallState::Installed => f.write_str("installed"),
        }
    }
}

/// Query the cluster for the operator resource, a missing resource is not an error.
pub async fn install_state(
    cx: Arc<Context<impl ControlPlane, impl Clock>>,
    id: &CanonicalOperatorId,
) -> Result<InstallState, Error> {
    let state = InstallState::from(cx.control_plane.operator_exists(id.as_str()).await?);
    debug!(%id, %state, "probed install state");
    Ok(state)
}

/// Report whether the operator is installed.
pub async fn is_installed(
    cx: Arc<Context<impl ControlPlane, impl Clock>>,
    id: &CanonicalOperatorId,
) -> Result<bool, Error> {
    Ok(install_state(cx, id).await?.is_installed())
}

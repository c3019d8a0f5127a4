//! Installs an operator and waits until OLM reports it.
use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    control_plane::ControlPlane,
    manifest::Manifest,
    probe::is_installed,
    registry::CanonicalOperatorId,
    utils::{Clock, Context},
    Error,
};

/// Default wait between two install probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Default number of install probes before giving up.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 60;

/// Bounds the wait for an operator to appear after its manifest was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Time slept before each probe.
    pub interval: Duration,
    /// Maximum number of probes.
    pub attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

impl PollConfig {
    /// Longest time the wait can take, saturating at [`Duration::MAX`].
    pub fn budget(&self) -> Duration {
        self.interval
            .checked_mul(self.attempts)
            .unwrap_or(Duration::MAX)
    }
}

/// Result of an install request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The operator was present before anything was applied.
    AlreadyInstalled,
    /// The operator appeared after the given number of probes.
    Installed {
        /// Probes used.
        attempts: u32,
    },
    /// The wait budget ran out, the operator may still be installing.
    StillInstalling {
        /// Probes used.
        attempts: u32,
    },
}

impl InstallOutcome {
    /// Report whether the wait budget was exhausted.
    pub fn timed_out(&self) -> bool {
        matches!(self, InstallOutcome::StillInstalling { .. })
    }
}

/// Install the operator from its manifest unless it is already present.
#[tracing::instrument(skip_all, fields(id = %id, manifest = %manifest.path().display()))]
pub async fn install(
    cx: Arc<Context<impl ControlPlane, impl Clock>>,
    id: &CanonicalOperatorId,
    manifest: &Manifest,
) -> Result<InstallOutcome, Error> {
    if is_installed(cx.clone(), id).await? {
        info!("operator already installed");
        return Ok(InstallOutcome::AlreadyInstalled);
    }

    cx.control_plane.apply_manifest(manifest).await?;
    info!("manifest applied, waiting for operator");

    wait_for_operator(cx, id).await
}

/// Probe for the operator until it appears or the poll budget is spent.
///
/// Each attempt sleeps one interval and then probes once.
pub async fn wait_for_operator(
    cx: Arc<Context<impl ControlPlane, impl Clock>>,
    id: &CanonicalOperatorId,
) -> Result<InstallOutcome, Error> {
    let started = cx.clock.now();
    for attempt in 1..=cx.poll.attempts {
        cx.clock.sleep(cx.poll.interval).await;
        if is_installed(cx.clone(), id).await? {
            let elapsed = cx.clock.now() - started;
            info!(attempt, elapsed_secs = elapsed.num_seconds(), "operator installed");
            return Ok(InstallOutcome::Installed { attempts: attempt });
        }
        debug!(attempt, "operator not installed yet");
    }
    warn!(
        attempts = cx.poll.attempts,
        budget_secs = cx.poll.budget().as_secs(),
        "operator not observed within budget, it may still be installing"
    );
    Ok(InstallOutcome::StillInstalling {
        attempts: cx.poll.attempts,
    })
}

//! Utils is shared context and time handling for the lifecycle operations

use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::chrono::{DateTime, Utc};

use crate::{
    control_plane::{ControlPlane, KubeControlPlane},
    install::PollConfig,
    Error,
};

/// Operator Context
pub struct Context<P, C> {
    /// Access to the cluster
    pub control_plane: P,
    /// Clock that provide the current time and waits between polls
    pub clock: C,
    /// Budget for waiting on an install
    pub poll: PollConfig,
}

impl<P, C> Context<P, C>
where
    P: ControlPlane,
    C: Clock,
{
    /// Create a context from its parts
    pub fn new(control_plane: P, clock: C, poll: PollConfig) -> Self {
        Self {
            control_plane,
            clock,
            poll,
        }
    }
}

impl Context<KubeControlPlane, UtcClock> {
    /// Create a context connected to the ambient cluster, checking prerequisites first
    pub async fn connect(poll: PollConfig) -> Result<Self, Error> {
        Ok(Self::new(KubeControlPlane::connect().await?, UtcClock, poll))
    }
}

/// Provides the current time and a way to wait.
#[async_trait]
pub trait Clock {
    /// Report the current time.
    fn now(&self) -> DateTime<Utc>;
    /// Suspend for the given duration.
    async fn sleep(&self, duration: Duration);
}

/// Provides the current time using real time.
pub struct UtcClock;

#[async_trait]
impl Clock for UtcClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

use std::{future::Future, time::Duration};

use kube::runtime::wait::Condition;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::{api::machines::Machine, Error, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// What "upgraded" means for a machine once its update was accepted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Readiness {
    /// A follow-up GET of the machine succeeds.
    #[default]
    Observed,
    /// The machine status reports the target versions.
    VersionsReported,
}

/// Condition satisfied once a freshly fetched machine counts as upgraded to `version`.
pub fn is_machine_upgraded(readiness: Readiness, version: String) -> impl Condition<Machine> {
    move |obj: Option<&Machine>| match (readiness, obj) {
        (_, None) => false,
        (Readiness::Observed, Some(_)) => true,
        (Readiness::VersionsReported, Some(machine)) => machine.has_observed_version(&version),
    }
}

/// Fixed-interval poll. Sleeps `interval`, then runs `check`, until it
/// yields `Ok(true)`, fails, or `timeout` has elapsed.
pub async fn poll<F, Fut>(
    interval: Duration,
    timeout: Duration,
    description: &str,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    // A timeout too large to represent means no deadline at all.
    let deadline = Instant::now().checked_add(timeout);
    loop {
        sleep(interval).await;
        if check().await? {
            return Ok(());
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(Error::PollTimeout {
                description: description.to_string(),
                timeout,
            });
        }
        debug!("Waiting for {}...", description);
    }
}

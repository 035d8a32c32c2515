use kube::Client;
use tokio::time::sleep;
use tracing::debug;

use crate::checker::{run_checks, Observation};
use crate::config::Config;
use crate::probe::ProbeRunner;
use crate::topology::Snapshot;
use crate::Result;

/// One full pass: fresh snapshot, then the whole check matrix. An inventory
/// read error propagates; probe failures are already folded into the
/// observations.
pub async fn run_cycle<R: ProbeRunner>(
    client: Client,
    runner: &R,
    config: &Config,
) -> Result<Vec<Observation>> {
    let snapshot = Snapshot::build(client, &config.node_name).await?;
    debug!(
        sources = snapshot.sources.len(),
        destinations = snapshot.destinations.len(),
        services = snapshot.services.len(),
        "built topology snapshot"
    );
    Ok(run_checks(&snapshot, config, runner).await)
}

/// Repeat the cycle forever. The interval is measured from the end of one
/// cycle to the start of the next, not as a fixed wall-clock cadence. Only
/// an inventory read error returns, so the surrounding supervisor (e.g. the
/// pod restart policy) can re-attempt on a fresh process.
pub async fn run<R: ProbeRunner>(client: Client, runner: R, config: &Config) -> Result<()> {
    loop {
        run_cycle(client.clone(), &runner, config).await?;
        sleep(config.interval).await;
    }
}

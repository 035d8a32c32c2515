use kube::Client;
use tracing::info;

use kube_conncheck::probe::Cnsenter;
use kube_conncheck::{scheduler, telemetry, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_logger();

    let config = Config::from_env()?;
    info!(?config, "applied options");

    info!("init k8s client");
    let client = Client::try_default().await?;

    info!("run connectivity checker");
    scheduler::run(client, Cnsenter, &config).await?;
    Ok(())
}

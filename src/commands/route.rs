// ABOUTME: Route command implementation.
// ABOUTME: Registers a slot's proxy route without deploying.

use bitswan_gitops::config::Config;
use bitswan_gitops::deploy::GitDeployer;
use bitswan_gitops::error::{Error, Result};
use bitswan_gitops::output::{Output, OutputMode};
use bitswan_gitops::pipeline;
use bitswan_gitops::route::RouteOutcome;
use bitswan_gitops::types::{DeploymentId, Fingerprint};

pub async fn route(
    config: &Config,
    deployment_id: &str,
    port: Option<u16>,
    output: Output,
) -> Result<()> {
    let slot = DeploymentId::new(deployment_id)?;
    let proxy = config.proxy.as_ref().ok_or(Error::NoProxy)?;
    let deployer = GitDeployer::from_config(config)?;

    // The slot's current bundle may declare its own port.
    let artifact = deployer
        .status()?
        .into_iter()
        .find(|s| s.deployment == slot.as_str())
        .and_then(|s| s.checksum)
        .and_then(|c| Fingerprint::parse(&c).ok())
        .map(|fp| deployer.store().artifact_path(&fp));
    let port = match artifact.map(|dir| pipeline::declared_port(&dir)) {
        Some(Ok(Some(declared))) => Some(declared),
        Some(Err(e)) => {
            output.warning(&format!("ignoring bundle port: {e}"));
            port
        }
        _ => port,
    };

    let outcome = deployer.ensure_route(&slot, port).await?.ok_or(Error::NoProxy)?;
    let message = match outcome {
        RouteOutcome::Added => format!("Added route {}.{}", slot, proxy.domain),
        RouteOutcome::AlreadyPresent => {
            format!("Route {}.{} already present", slot, proxy.domain)
        }
    };

    if output.mode() == OutputMode::Json {
        output.json(&serde_json::json!({
            "deployment": slot.as_str(),
            "added": outcome == RouteOutcome::Added,
        }));
    } else {
        output.success(&message);
    }
    Ok(())
}

// ABOUTME: Deploy command implementation.
// ABOUTME: Feeds an archive from disk through the Deployer and reports the response payload.

use bitswan_gitops::config::Config;
use bitswan_gitops::deploy::{DeployResponse, GitDeployer, Upload};
use bitswan_gitops::error::Result;
use bitswan_gitops::output::{Output, OutputMode};
use bitswan_gitops::route::RouteOutcome;
use bitswan_gitops::types::DeploymentId;
use std::path::Path;

/// Deploy `archive` to the slot `deployment_id`.
pub async fn deploy(
    config: &Config,
    deployment_id: &str,
    archive: &Path,
    port: Option<u16>,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let slot = DeploymentId::new(deployment_id)?;
    let deployer = GitDeployer::from_config(config)?;

    output.progress(&format!("Deploying {} to {}", archive.display(), slot));

    let result = match Upload::from_path(archive).await {
        Ok(upload) => deployer.deploy_on_port(slot, upload, port).await,
        Err(e) => Err(e),
    };
    let response = DeployResponse::from(&result);

    if output.mode() == OutputMode::Json {
        output.json(&response);
    }

    let report = result?;
    for warning in &report.warnings {
        output.warning(&warning.message);
    }

    output.progress(&format!("  → Artifact: {}", report.output_directory.display()));
    if let Some(old) = &report.reclaimed {
        output.progress(&format!("  → Removed superseded artifact {}", old.short()));
    }
    match report.route {
        Some(RouteOutcome::Added) => output.progress("  → Proxy route added"),
        Some(RouteOutcome::AlreadyPresent) => output.progress("  → Proxy route already present"),
        None => {}
    }

    if output.mode() != OutputMode::Json {
        output.success(&format!(
            "Deployed {} with checksum {}",
            report.deployment, report.fingerprint
        ));
    }
    Ok(())
}

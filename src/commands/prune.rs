// ABOUTME: Prune command implementation.
// ABOUTME: Removes artifact directories that no ledger slot references.

use bitswan_gitops::config::Config;
use bitswan_gitops::deploy::GitDeployer;
use bitswan_gitops::error::Result;
use bitswan_gitops::output::{Output, OutputMode};

pub async fn prune(config: &Config, output: Output) -> Result<()> {
    let deployer = GitDeployer::from_config(config)?;
    let report = deployer.prune().await?;

    if output.mode() == OutputMode::Json {
        output.json(&report);
        return Ok(());
    }

    for fingerprint in &report.removed {
        output.progress(&format!("  → Removed {}", fingerprint));
    }
    output.success(&format!(
        "Pruned {} artifact(s), {} staging director{}",
        report.removed.len(),
        report.staging_removed,
        if report.staging_removed == 1 { "y" } else { "ies" }
    ));
    Ok(())
}

// ABOUTME: Status command implementation.
// ABOUTME: Lists ledger slots with their checksum and whether the artifact is on disk.

use bitswan_gitops::config::Config;
use bitswan_gitops::deploy::GitDeployer;
use bitswan_gitops::error::Result;
use bitswan_gitops::output::{Output, OutputMode};

pub fn status(config: &Config, output: Output) -> Result<()> {
    let deployer = GitDeployer::from_config(config)?;
    let slots = deployer.status()?;

    if output.mode() == OutputMode::Json {
        output.json(&slots);
        return Ok(());
    }

    if slots.is_empty() {
        println!("No deployments in {}", deployer.ledger().path().display());
        return Ok(());
    }

    for slot in &slots {
        let checksum = slot.checksum.as_deref().unwrap_or("-");
        let mut flags = Vec::new();
        if !slot.active {
            flags.push("inactive");
        }
        if !slot.installed {
            flags.push("missing artifact");
        }
        if flags.is_empty() {
            println!("{}  {}", slot.deployment, checksum);
        } else {
            println!("{}  {}  ({})", slot.deployment, checksum, flags.join(", "));
        }
    }
    Ok(())
}

// ABOUTME: Config scaffolding for new installations.
// ABOUTME: Creates gitops.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, gitops_dir: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let gitops_dir = gitops_dir.unwrap_or("/gitops/gitops");
    if gitops_dir.trim().is_empty() {
        return Err(Error::InvalidConfig("gitops_dir cannot be empty".to_string()));
    }

    std::fs::write(&config_path, generate_template_yaml(gitops_dir))?;

    Ok(())
}

fn generate_template_yaml(gitops_dir: &str) -> String {
    format!(
        r#"# Directory holding bitswan.yaml, the lock file and artifact directories.
gitops_dir: {gitops_dir}

# How long a deploy waits for another deploy to finish with the ledger.
lock_timeout: 30s

# What to do when bitswan.yaml cannot be parsed: fail-closed or reset-to-empty.
on_corrupt_ledger: fail-closed

git:
  author_name: gitops
  author_email: info@bitswan.space

# Run git on the host instead of inside this container.
# host:
#   dir: /home/root/.config/bitswan/local-gitops/gitops
#   path: /usr/local/bin:/usr/bin:/bin
#   home: /root
#   user: root

# Register {{deployment_id}}.{{domain}} routes with Caddy after each deploy.
# proxy:
#   url: http://caddy:2019
#   domain: gitops.bitswan.space
#   port: 8080
#   timeout: 10s
"#
    )
}

// ABOUTME: Configuration types and parsing for gitops.yml.
// ABOUTME: Handles YAML discovery and the environment variable fallback used in containers.

mod host;
mod init;
mod proxy;

pub use host::HostExecConfig;
pub use init::init_config;
pub use proxy::ProxyConfig;

use crate::error::{Error, Result};
use crate::ledger::{CorruptLedgerPolicy, LEDGER_FILENAME, LOCK_FILENAME};
use crate::vcs::CommitAuthor;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "gitops.yml";
pub const CONFIG_FILENAME_ALT: &str = "gitops.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".gitops/config.yml";

const DEFAULT_GITOPS_HOME: &str = "/gitops";
const DEFAULT_GITOPS_HOME_HOST: &str = "/home/root/.config/bitswan/local-gitops/";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding the ledger, its lock and the artifact directories.
    pub gitops_dir: PathBuf,

    #[serde(default = "default_lock_timeout", with = "humantime_serde")]
    pub lock_timeout: Duration,

    #[serde(default)]
    pub on_corrupt_ledger: CorruptLedgerPolicy,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub host: Option<HostExecConfig>,

    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_author_name")]
    pub author_name: String,
    #[serde(default = "default_author_email")]
    pub author_email: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            author_name: default_author_name(),
            author_email: default_author_email(),
        }
    }
}

impl GitConfig {
    pub fn author(&self) -> CommitAuthor {
        CommitAuthor {
            name: self.author_name.clone(),
            email: self.author_email.clone(),
        }
    }
}

fn default_lock_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_author_name() -> String {
    CommitAuthor::default().name
}

fn default_author_email() -> String {
    CommitAuthor::default().email
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Build configuration from the process environment.
    ///
    /// Recognizes `BITSWAN_GITOPS_DIR`, `BITSWAN_GITOPS_DIR_HOST`, `HOST_PATH`,
    /// `HOST_HOME`, `HOST_USER`, `CADDY_URL` and `BITSWAN_GITOPS_DOMAIN`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let gitops_home = var("BITSWAN_GITOPS_DIR").unwrap_or_else(|| DEFAULT_GITOPS_HOME.into());
        let gitops_dir = Path::new(&gitops_home).join("gitops");

        // Host execution needs all three; any one missing means run locally.
        let host = match (var("HOST_PATH"), var("HOST_HOME"), var("HOST_USER")) {
            (Some(path), Some(home), Some(user)) => {
                let host_home = var("BITSWAN_GITOPS_DIR_HOST")
                    .unwrap_or_else(|| DEFAULT_GITOPS_HOME_HOST.into());
                Some(HostExecConfig {
                    dir: Path::new(&host_home).join("gitops"),
                    path,
                    home,
                    user,
                })
            }
            _ => None,
        };

        let proxy = var("CADDY_URL").map(|url| ProxyConfig {
            url,
            domain: var("BITSWAN_GITOPS_DOMAIN").unwrap_or_else(proxy::default_domain),
            ..ProxyConfig::default()
        });

        let config = Config {
            gitops_dir,
            lock_timeout: default_lock_timeout(),
            on_corrupt_ledger: CorruptLedgerPolicy::default(),
            git: GitConfig::default(),
            host,
            proxy,
        };
        config.validate()?;
        Ok(config)
    }

    /// Locate configuration: an explicit file, else discovery in `dir`, else the
    /// environment.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => {
                tracing::debug!("no config file in {}, using environment", dir.display());
                Self::from_env()
            }
            other => other,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.gitops_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("gitops_dir cannot be empty".to_string()));
        }
        if self.lock_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "lock_timeout must be greater than zero".to_string(),
            ));
        }
        if let Some(proxy) = &self.proxy {
            if proxy.domain.is_empty() {
                return Err(Error::InvalidConfig("proxy.domain cannot be empty".to_string()));
            }
            if proxy.port == 0 {
                return Err(Error::InvalidConfig("proxy.port cannot be 0".to_string()));
            }
        }
        Ok(())
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.gitops_dir.join(LEDGER_FILENAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.gitops_dir.join(LOCK_FILENAME)
    }
}

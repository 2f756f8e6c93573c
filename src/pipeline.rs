// ABOUTME: Reads the bundle's own pipelines.conf from an installed artifact.
// ABOUTME: Supplies the port a slot's workload listens on for route registration.

use configparser::ini::Ini;
use std::path::{Path, PathBuf};

/// Bundle configuration file at the artifact root.
pub const PIPELINE_CONF: &str = "pipelines.conf";

const DEPLOYMENT_SECTION: &str = "deployment";
const PORT_KEY: &str = "port";

#[derive(Debug, thiserror::Error)]
pub enum PipelineConfError {
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid port in {path}: {message}")]
    Port { path: PathBuf, message: String },
}

/// Parsed `pipelines.conf`.
#[derive(Debug)]
pub struct PipelineConf {
    ini: Ini,
    path: PathBuf,
}

impl PipelineConf {
    /// Load `pipelines.conf` from an artifact directory. `Ok(None)` when absent.
    pub fn load(artifact_dir: &Path) -> Result<Option<Self>, PipelineConfError> {
        let path = artifact_dir.join(PIPELINE_CONF);
        if !path.is_file() {
            return Ok(None);
        }

        let mut ini = Ini::new();
        ini.load(&path).map_err(|message| PipelineConfError::Parse {
            path: path.clone(),
            message,
        })?;
        Ok(Some(Self { ini, path }))
    }

    /// `port` from the `[deployment]` section.
    pub fn port(&self) -> Result<Option<u16>, PipelineConfError> {
        let invalid = |message: String| PipelineConfError::Port {
            path: self.path.clone(),
            message,
        };

        let Some(raw) = self.ini.getuint(DEPLOYMENT_SECTION, PORT_KEY).map_err(invalid)? else {
            return Ok(None);
        };
        match u16::try_from(raw) {
            Ok(0) | Err(_) => Err(invalid(format!("{raw} is not a TCP port"))),
            Ok(port) => Ok(Some(port)),
        }
    }
}

/// Port declared by the bundle installed at `artifact_dir`, if any.
pub fn declared_port(artifact_dir: &Path) -> Result<Option<u16>, PipelineConfError> {
    match PipelineConf::load(artifact_dir)? {
        Some(conf) => conf.port(),
        None => Ok(None),
    }
}

// ABOUTME: Drives uploads through the deployment state machine for one gitops directory.
// ABOUTME: Also hosts the maintenance operations that share its lock: prune and status.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::ledger::{CorruptLedgerPolicy, Ledger, LedgerError, LedgerLock, LockInfo};
use crate::pipeline;
use crate::route::{CaddyClient, RouteError, RouteOutcome};
use crate::store::ArtifactStore;
use crate::types::{DeploymentId, Fingerprint};
use crate::vcs::{CommandRunner, Git, VersionControl, runner_for};

use super::report::{DeployReport, DeployResponse};
use super::{CleanedUp, DeployError, Deployment, Upload};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Staging directories untouched this long are treated as abandoned by `prune`.
const STALE_STAGING_AGE: Duration = Duration::from_secs(60 * 60);

/// The production deployer: git through the configured command runner.
pub type GitDeployer = Deployer<Git<Box<dyn CommandRunner>>>;

/// Deploys uploads into one gitops directory.
pub struct Deployer<V> {
    store: ArtifactStore,
    ledger: Ledger,
    lock_path: PathBuf,
    lock_timeout: Duration,
    vcs: V,
    routes: Option<CaddyClient>,
}

/// What `prune` removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub removed: Vec<Fingerprint>,
    pub staging_removed: usize,
}

/// One ledger slot as seen on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub deployment: String,
    pub checksum: Option<String>,
    pub active: bool,
    /// Whether the artifact directory for the checksum exists.
    pub installed: bool,
}

impl<V: VersionControl> Deployer<V> {
    pub fn new(gitops_dir: impl Into<PathBuf>, vcs: V) -> Self {
        let gitops_dir = gitops_dir.into();
        Self {
            ledger: Ledger::in_dir(&gitops_dir, CorruptLedgerPolicy::default()),
            lock_path: LockInfo::lock_path(&gitops_dir),
            store: ArtifactStore::new(gitops_dir),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            vcs,
            routes: None,
        }
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn on_corrupt_ledger(mut self, policy: CorruptLedgerPolicy) -> Self {
        self.ledger = Ledger::new(self.ledger.path(), policy);
        self
    }

    /// Register a proxy route for each deployed slot.
    pub fn routes(mut self, client: CaddyClient) -> Self {
        self.routes = Some(client);
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn gitops_dir(&self) -> &Path {
        self.store.root()
    }

    /// Deploy `upload` to `slot`.
    pub async fn deploy(
        &self,
        slot: DeploymentId,
        upload: Upload,
    ) -> Result<DeployReport, DeployError> {
        self.deploy_on_port(slot, upload, None).await
    }

    /// Deploy `upload` to `slot`.
    ///
    /// The route port is the one the bundle's `pipelines.conf` declares, else
    /// `port`, else the proxy default.
    ///
    /// The ledger is only changed once the artifact is installed, and the
    /// superseded artifact is only collected once the ledger is synced.
    pub async fn deploy_on_port(
        &self,
        slot: DeploymentId,
        upload: Upload,
        port: Option<u16>,
    ) -> Result<DeployReport, DeployError> {
        let mut diag = Diagnostics::default();
        tracing::info!("deploying upload to {}", slot);

        let deployment = Deployment::new(slot, upload).identify().await?;
        let deployment = deployment.install(&self.store).await?;
        let deployment = deployment.lock(&self.lock_path, self.lock_timeout).await?;
        let deployment = deployment
            .update_ledger(&self.ledger, &self.store, &mut diag)
            .await?;
        let deployment = deployment.sync(&self.vcs).await?;
        let deployment = deployment.clean_up(&self.store, &mut diag);

        let port = if self.routes.is_some() {
            self.route_port(&deployment, port, &mut diag)
        } else {
            port
        };
        let route = match self.ensure_route(deployment.slot(), port).await {
            Ok(outcome) => outcome,
            Err(e) => {
                diag.warn(Warning::route_registration(format!(
                    "could not register route for {}: {}",
                    deployment.slot(),
                    e
                )));
                None
            }
        };

        let mut report = deployment.finish(diag);
        report.route = route;
        tracing::info!(
            "deployed {} at {}",
            report.deployment,
            report.fingerprint.short()
        );
        Ok(report)
    }

    fn route_port(
        &self,
        deployment: &Deployment<CleanedUp>,
        requested: Option<u16>,
        diag: &mut Diagnostics,
    ) -> Option<u16> {
        match pipeline::declared_port(deployment.output_directory()) {
            Ok(declared) => declared.or(requested),
            Err(e) => {
                diag.warn(Warning::route_registration(format!(
                    "ignoring bundle port for {}: {}",
                    deployment.slot(),
                    e
                )));
                requested
            }
        }
    }

    /// Deploy raw upload bytes and shape the outcome as the caller-facing payload.
    pub async fn handle_upload(
        &self,
        deployment_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> DeployResponse {
        let result = self.deploy_bytes(deployment_id, file_name, bytes).await;
        if let Err(e) = &result {
            tracing::error!("deploy of {} failed: {}", deployment_id, e);
        }
        DeployResponse::from(&result)
    }

    async fn deploy_bytes(
        &self,
        deployment_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<DeployReport, DeployError> {
        let slot = DeploymentId::new(deployment_id)?;
        let upload = Upload::from_bytes(file_name, bytes)?;
        self.deploy(slot, upload).await
    }

    /// Make sure the proxy routes `slot`. `Ok(None)` when no proxy is configured.
    pub async fn ensure_route(
        &self,
        slot: &DeploymentId,
        port: Option<u16>,
    ) -> Result<Option<RouteOutcome>, RouteError> {
        match &self.routes {
            Some(client) => client.ensure_route(slot, port).await.map(Some),
            None => Ok(None),
        }
    }

    /// Delete artifacts no slot references and abandoned staging directories.
    pub async fn prune(&self) -> Result<PruneReport, DeployError> {
        let lock = LedgerLock::acquire(&self.lock_path, self.lock_timeout, None).await?;
        // An unreadable ledger references nothing; pruning against it would
        // delete every artifact, whatever the corrupt-file policy says.
        let document = match self.ledger.load_detailed()? {
            (document, None) => document,
            (_, Some(message)) => {
                return Err(LedgerError::Corrupt {
                    path: self.ledger.path().to_path_buf(),
                    message,
                }
                .into());
            }
        };

        let mut report = PruneReport::default();
        for fingerprint in self.store.list()? {
            if document.is_referenced(fingerprint.as_str()) {
                continue;
            }
            if self.store.remove(&fingerprint)? {
                tracing::info!("pruned artifact {}", fingerprint.short());
                report.removed.push(fingerprint);
            }
        }
        report.staging_removed = self.store.sweep_staging(STALE_STAGING_AGE)?;

        lock.release();
        Ok(report)
    }

    /// Slots recorded in the ledger.
    pub fn status(&self) -> Result<Vec<SlotStatus>, DeployError> {
        let document = self.ledger.load()?;
        Ok(document
            .deployments
            .iter()
            .map(|(id, record)| SlotStatus {
                deployment: id.clone(),
                installed: record
                    .checksum
                    .as_deref()
                    .and_then(|c| Fingerprint::parse(c).ok())
                    .is_some_and(|fp| self.store.exists(&fp)),
                checksum: record.checksum.clone(),
                active: record.active,
            })
            .collect())
    }
}

impl GitDeployer {
    /// Build the deployer described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, RouteError> {
        let runner = runner_for(&config.gitops_dir, config.host.as_ref());
        let git = Git::new(runner, config.git.author());

        let mut deployer = Deployer::new(&config.gitops_dir, git)
            .lock_timeout(config.lock_timeout)
            .on_corrupt_ledger(config.on_corrupt_ledger);
        if let Some(proxy) = &config.proxy {
            deployer = deployer.routes(CaddyClient::from_config(proxy)?);
        }
        Ok(deployer)
    }
}

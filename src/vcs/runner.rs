// ABOUTME: Execution contexts for version control commands.
// ABOUTME: Runs commands locally or inside the host's namespaces via nsenter.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::config::HostExecConfig;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit status for error messages.
    pub fn status_label(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "signal".to_string(),
        }
    }

    /// Stderr if present, otherwise stdout, trimmed.
    pub fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Where version control commands execute.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` in the runner's working directory.
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;

    /// Working directory as seen by the commands.
    fn working_dir(&self) -> &Path;
}

#[async_trait]
impl<R: CommandRunner + ?Sized> CommandRunner for Box<R> {
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        (**self).run(program, args).await
    }

    fn working_dir(&self) -> &Path {
        (**self).working_dir()
    }
}

/// Runs commands as child processes of this one.
#[derive(Debug, Clone)]
pub struct LocalRunner {
    dir: PathBuf,
}

impl LocalRunner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl CommandRunner for LocalRunner {
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        tracing::debug!("running {} {:?} in {}", program, args, self.dir.display());
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Ok(into_output(output))
    }

    fn working_dir(&self) -> &Path {
        &self.dir
    }
}

/// Runs commands on the host from inside a container.
///
/// Enters PID 1's mount, UTS, network and IPC namespaces and switches to the host
/// user, so git operates on the host's checkout with the host's credentials.
#[derive(Debug, Clone)]
pub struct HostNamespaceRunner {
    host: HostExecConfig,
}

impl HostNamespaceRunner {
    pub fn new(host: HostExecConfig) -> Self {
        Self { host }
    }

    /// Full argv passed to `nsenter`.
    pub fn host_command(&self, program: &str, args: &[String]) -> io::Result<Vec<String>> {
        let quoted = shlex::try_join(std::iter::once(program).chain(args.iter().map(String::as_str)))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let dir = quote(&self.host.dir.to_string_lossy())?;
        let path = quote(&self.host.path)?;
        let home = quote(&self.host.home)?;

        let inner = format!("cd {dir} && PATH={path} HOME={home} {quoted}");
        let script = format!(
            "PATH={path} su - {} -c {}",
            quote(&self.host.user)?,
            quote(&inner)?
        );

        Ok(["-t", "1", "-m", "-u", "-n", "-i", "sh", "-c"]
            .into_iter()
            .map(str::to_string)
            .chain(std::iter::once(script))
            .collect())
    }
}

#[async_trait]
impl CommandRunner for HostNamespaceRunner {
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let argv = self.host_command(program, args)?;
        tracing::debug!("running {} {:?} on host as {}", program, args, self.host.user);
        let output = Command::new("nsenter")
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Ok(into_output(output))
    }

    fn working_dir(&self) -> &Path {
        &self.host.dir
    }
}

/// Pick the execution context once, from configuration.
pub fn runner_for(gitops_dir: &Path, host: Option<&HostExecConfig>) -> Box<dyn CommandRunner> {
    match host {
        Some(host) => Box::new(HostNamespaceRunner::new(host.clone())),
        None => Box::new(LocalRunner::new(gitops_dir)),
    }
}

fn quote(value: &str) -> io::Result<String> {
    shlex::try_quote(value)
        .map(|q| q.into_owned())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn into_output(output: std::process::Output) -> CommandOutput {
    CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> HostExecConfig {
        HostExecConfig {
            dir: PathBuf::from("/home/root/.config/bitswan/local-gitops/gitops"),
            path: "/usr/local/bin:/usr/bin".to_string(),
            home: "/root".to_string(),
            user: "root".to_string(),
        }
    }

    #[test]
    fn host_command_enters_pid1_namespaces() {
        let runner = HostNamespaceRunner::new(host());
        let argv = runner
            .host_command("git", &["pull".to_string()])
            .unwrap();

        assert_eq!(&argv[..8], &["-t", "1", "-m", "-u", "-n", "-i", "sh", "-c"]);

        let outer = shlex::split(&argv[8]).unwrap();
        assert_eq!(
            &outer[..5],
            &["PATH=/usr/local/bin:/usr/bin", "su", "-", "root", "-c"]
        );
        let inner = shlex::split(&outer[5]).unwrap();
        assert_eq!(
            inner,
            vec![
                "cd",
                "/home/root/.config/bitswan/local-gitops/gitops",
                "&&",
                "PATH=/usr/local/bin:/usr/bin",
                "HOME=/root",
                "git",
                "pull",
            ]
        );
    }

    #[test]
    fn host_command_quotes_arguments() {
        let runner = HostNamespaceRunner::new(host());
        let argv = runner
            .host_command("git", &["commit".to_string(), "-m".to_string(), "it's done".to_string()])
            .unwrap();

        let script = &argv[8];
        assert!(script.starts_with("PATH=/usr/local/bin:/usr/bin su - root -c "));
        // The message survives two levels of shell parsing intact.
        let outer = shlex::split(script).unwrap();
        let inner = shlex::split(&outer[5]).unwrap();
        assert_eq!(inner.last().map(String::as_str), Some("it's done"));
    }

    #[test]
    fn runner_for_prefers_host_when_configured() {
        let local = runner_for(Path::new("/gitops"), None);
        assert_eq!(local.working_dir(), Path::new("/gitops"));

        let host_cfg = host();
        let on_host = runner_for(Path::new("/gitops"), Some(&host_cfg));
        assert_eq!(on_host.working_dir(), host_cfg.dir.as_path());
    }

    #[tokio::test]
    async fn local_runner_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = LocalRunner::new(dir.path());
        let output = runner
            .run("sh", &["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()])
            .await
            .unwrap();

        assert!(!output.success());
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.detail(), "err");
    }
}

//! Docker engine driven through the `docker` CLI against a local endpoint

use crate::engine::{ContainerEngine, EngineFactory};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use url::{Host, Url};

/// stderr fragments the docker CLI prints when an image or tag is absent
const NOT_FOUND_MARKERS: &[&str] = &[
    "no such image",
    "not found",
    "manifest unknown",
    "does not exist",
    "reference does not exist",
];

#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
    host: String,
    timeout: Duration,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>, host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            host: host.into(),
            timeout,
        }
    }

    async fn run(&self, args: &[&str]) -> Result<()> {
        let operation = format!("docker {}", args.join(" "));

        let mut command = Command::new(&self.binary);
        command
            .arg("--host")
            .arg(&self.host)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|e| {
                SyncError::Api(format!("Failed to run {}: {}", operation, e))
            })?,
            Err(_) => {
                return Err(SyncError::Transient(format!(
                    "{} timed out after {}s",
                    operation,
                    self.timeout.as_secs()
                )));
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(classify_failure(&operation, stderr.trim()))
    }
}

/// Map a failed docker invocation onto a failure kind
pub fn classify_failure(operation: &str, stderr: &str) -> SyncError {
    let lowered = stderr.to_lowercase();
    if NOT_FOUND_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        SyncError::NotFound(format!("{}: {}", operation, stderr))
    } else {
        SyncError::Api(format!("{} failed: {}", operation, stderr))
    }
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn pull(&self, image: &str) -> Result<()> {
        self.run(&["pull", "--quiet", image]).await
    }

    async fn tag(&self, source: &str, target: &str) -> Result<()> {
        self.run(&["tag", source, target]).await
    }

    async fn push(&self, image: &str) -> Result<()> {
        self.run(&["push", "--quiet", image]).await
    }

    async fn remove_image(&self, image: &str) -> Result<()> {
        self.run(&["image", "rm", image]).await
    }
}

/// Hands every worker its own [`DockerCli`] bound to the same local endpoint
#[derive(Debug, Clone)]
pub struct DockerCliFactory {
    binary: String,
    host: String,
    timeout: Duration,
}

impl DockerCliFactory {
    pub fn new(binary: impl Into<String>, host: impl Into<String>, timeout: Duration) -> Result<Self> {
        let host = host.into();
        if !is_local_endpoint(&host) {
            return Err(SyncError::Config(format!(
                "Docker host must be a local endpoint, got {}",
                host
            )));
        }
        Ok(Self {
            binary: binary.into(),
            host,
            timeout,
        })
    }
}

/// Unix sockets, named pipes, and `tcp://` on a loopback address
fn is_local_endpoint(endpoint: &str) -> bool {
    if endpoint.starts_with("unix://") || endpoint.starts_with("npipe://") {
        return true;
    }
    if !endpoint.starts_with("tcp://") {
        return false;
    }

    // tcp is not a special scheme, so IPv4 and names both come back as Domain
    match Url::parse(endpoint).ok().as_ref().and_then(Url::host) {
        Some(Host::Domain(name)) => match name.parse::<IpAddr>() {
            Ok(ip) => ip.is_loopback(),
            Err(_) => name.eq_ignore_ascii_case("localhost"),
        },
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

impl EngineFactory for DockerCliFactory {
    fn connect(&self) -> Result<Box<dyn ContainerEngine>> {
        Ok(Box::new(DockerCli::new(
            self.binary.clone(),
            self.host.clone(),
            self.timeout,
        )))
    }
}

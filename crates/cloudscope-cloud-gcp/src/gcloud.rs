//! gcloud CLI wrapper
//!
//! Wraps the gcloud compute commands used for instance and network
//! management. Every call is bound to one project.

use crate::error::{GcpError, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::process::Command;

/// gcloud CLI wrapper
pub struct Gcloud {
    project: String,
}

impl Gcloud {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Run a gcloud command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("gcloud");
        cmd.args(args);
        cmd.arg("--project").arg(&self.project);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: gcloud {} --project {}", args.join(" "), self.project);

        let output = cmd.output().await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => GcpError::GcloudNotFound,
            _ => GcpError::IoError(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GcpError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn list<T: DeserializeOwned>(&self, args: &[&str]) -> Result<Vec<T>> {
        let mut args = args.to_vec();
        args.push("--format=json");
        let output = self.run_command(&args).await?;

        if output.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&output)?)
    }

    /// List instances across all zones
    pub async fn list_instances(&self) -> Result<Vec<Instance>> {
        self.list(&["compute", "instances", "list"]).await
    }

    pub async fn list_networks(&self) -> Result<Vec<Network>> {
        self.list(&["compute", "networks", "list"]).await
    }

    pub async fn delete_instance(&self, name: &str, zone: &str) -> Result<()> {
        self.run_command(&[
            "compute",
            "instances",
            "delete",
            name,
            "--zone",
            zone,
            "--quiet",
        ])
        .await?;
        Ok(())
    }

    /// Add or overwrite a single instance label
    pub async fn add_instance_label(
        &self,
        name: &str,
        zone: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let labels = format!("--labels={}={}", key, value);
        self.run_command(&[
            "compute",
            "instances",
            "add-labels",
            name,
            "--zone",
            zone,
            &labels,
        ])
        .await?;
        Ok(())
    }

    pub async fn set_deletion_protection(
        &self,
        name: &str,
        zone: &str,
        enabled: bool,
    ) -> Result<()> {
        let flag = if enabled {
            "--deletion-protection"
        } else {
            "--no-deletion-protection"
        };
        self.run_command(&["compute", "instances", "update", name, "--zone", zone, flag])
            .await?;
        Ok(())
    }

    pub async fn delete_network(&self, name: &str) -> Result<()> {
        self.run_command(&["compute", "networks", "delete", name, "--quiet"])
            .await?;
        Ok(())
    }
}

/// Last path segment of a resource URL
pub fn resource_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Region of a zone name ("us-central1-a" -> "us-central1")
pub fn zone_region(zone: &str) -> &str {
    zone.rsplit_once('-').map(|(region, _)| region).unwrap_or(zone)
}

/// Instance information from `compute instances list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub name: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub status: String,
    pub creation_timestamp: Option<String>,
    pub labels: Option<Value>,
    #[serde(default)]
    pub disks: Vec<AttachedDisk>,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
    #[serde(default)]
    pub deletion_protection: bool,
}

impl Instance {
    pub fn zone_name(&self) -> &str {
        resource_name(&self.zone)
    }

    /// Name of the boot disk, "unknown" when there is none
    pub fn boot_disk_name(&self) -> &str {
        self.disks
            .iter()
            .find(|d| d.boot)
            .and_then(|d| d.source.as_deref())
            .filter(|source| source.contains("disks/"))
            .map(resource_name)
            .unwrap_or("unknown")
    }

    pub fn network_name(&self) -> &str {
        self.network_interfaces
            .first()
            .and_then(|nic| nic.network.as_deref())
            .map(resource_name)
            .unwrap_or("")
    }

    pub fn subnetwork_name(&self) -> &str {
        self.network_interfaces
            .first()
            .and_then(|nic| nic.subnetwork.as_deref())
            .map(resource_name)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    #[serde(default)]
    pub boot: bool,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub network: Option<String>,
    pub subnetwork: Option<String>,
}

/// VPC network information from `compute networks list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub auto_create_subnetworks: Option<bool>,
    pub routing_config: Option<RoutingConfig>,
    pub mtu: Option<u32>,
}

impl Network {
    pub fn subnet_mode(&self) -> &'static str {
        match self.auto_create_subnetworks {
            Some(true) => "auto",
            Some(false) => "custom",
            None => "legacy",
        }
    }

    pub fn routing_mode(&self) -> &str {
        self.routing_config
            .as_ref()
            .and_then(|c| c.routing_mode.as_deref())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    pub routing_mode: Option<String>,
}

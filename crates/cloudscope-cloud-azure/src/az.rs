//! az CLI wrapper
//!
//! Wraps the az CLI commands used for VM and virtual network management.
//! Every call is bound to one subscription.

use crate::error::{AzureError, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::process::Command;

/// az CLI wrapper
pub struct AzCli {
    subscription: String,
}

impl AzCli {
    pub fn new(subscription: impl Into<String>) -> Self {
        Self {
            subscription: subscription.into(),
        }
    }

    /// Run an az command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("az");
        cmd.args(args);
        cmd.arg("--subscription").arg(&self.subscription);
        cmd.arg("--output").arg("json");
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(
            "Running: az {} --subscription {}",
            args.join(" "),
            self.subscription
        );

        let output = cmd.output().await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => AzureError::AzNotFound,
            _ => AzureError::IoError(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AzureError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn list<T: DeserializeOwned>(&self, args: &[&str]) -> Result<Vec<T>> {
        let output = self.run_command(args).await?;
        if output.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&output)?)
    }

    pub async fn list_vms(&self) -> Result<Vec<VirtualMachine>> {
        self.list(&["vm", "list"]).await
    }

    pub async fn list_nics(&self) -> Result<Vec<NetworkInterface>> {
        self.list(&["network", "nic", "list"]).await
    }

    pub async fn list_vnets(&self) -> Result<Vec<VirtualNetwork>> {
        self.list(&["network", "vnet", "list"]).await
    }

    pub async fn delete_vm(&self, name: &str, resource_group: &str) -> Result<()> {
        self.run_command(&[
            "vm",
            "delete",
            "--name",
            name,
            "--resource-group",
            resource_group,
            "--yes",
        ])
        .await?;
        Ok(())
    }

    pub async fn delete_vnet(&self, name: &str, resource_group: &str) -> Result<()> {
        self.run_command(&[
            "network",
            "vnet",
            "delete",
            "--name",
            name,
            "--resource-group",
            resource_group,
        ])
        .await?;
        Ok(())
    }

    /// Set one tag on a VM (`resource` = ["vm"]) or VNet (["network", "vnet"])
    pub async fn set_tag(
        &self,
        resource: &[&str],
        name: &str,
        resource_group: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let tag = format!("tags.{}={}", key, value);
        let mut args = resource.to_vec();
        args.extend_from_slice(&[
            "update",
            "--name",
            name,
            "--resource-group",
            resource_group,
            "--set",
            &tag,
        ]);
        self.run_command(&args).await?;
        Ok(())
    }
}

/// Resource group segment of an ARM resource id
pub fn resource_group(id: &str) -> Option<&str> {
    id.split('/').nth(4).filter(|s| !s.is_empty())
}

/// VNet and subnet names from a subnet resource id
pub fn subnet_names(subnet_id: &str) -> Option<(&str, &str)> {
    let (_, rest) = subnet_id.split_once("/virtualNetworks/")?;
    let (vnet, subnet) = rest.split_once("/subnets/")?;
    Some((vnet, subnet))
}

/// VM information from `az vm list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    pub zones: Option<Vec<String>>,
    pub tags: Option<Value>,
    pub time_created: Option<String>,
    pub storage_profile: Option<StorageProfile>,
    pub network_profile: Option<NetworkProfile>,
}

impl VirtualMachine {
    /// "publisher/offer/sku[/version]", "unknown" for custom images
    pub fn image_name(&self) -> String {
        let Some(image) = self
            .storage_profile
            .as_ref()
            .and_then(|p| p.image_reference.as_ref())
        else {
            return "unknown".to_string();
        };

        match (&image.publisher, &image.offer, &image.sku) {
            (Some(publisher), Some(offer), Some(sku)) => {
                let mut name = format!("{}/{}/{}", publisher, offer, sku);
                if let Some(version) = &image.version {
                    name.push('/');
                    name.push_str(version);
                }
                name
            }
            _ => "unknown".to_string(),
        }
    }

    pub fn primary_nic_id(&self) -> Option<&str> {
        self.network_profile
            .as_ref()?
            .network_interfaces
            .first()
            .map(|nic| nic.id.as_str())
    }

    pub fn zone(&self) -> &str {
        self.zones
            .as_ref()
            .and_then(|z| z.first())
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    pub image_reference: Option<ImageReference>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    pub publisher: Option<String>,
    pub offer: Option<String>,
    pub sku: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    #[serde(default)]
    pub network_interfaces: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceRef {
    pub id: String,
}

/// NIC information from `az network nic list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub id: String,
    #[serde(default)]
    pub ip_configurations: Vec<IpConfiguration>,
}

impl NetworkInterface {
    pub fn subnet_id(&self) -> Option<&str> {
        self.ip_configurations
            .first()?
            .subnet
            .as_ref()
            .map(|s| s.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpConfiguration {
    pub subnet: Option<ResourceRef>,
}

/// VNet information from `az network vnet list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetwork {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    pub address_space: Option<AddressSpace>,
    pub provisioning_state: Option<String>,
    pub tags: Option<Value>,
}

impl VirtualNetwork {
    pub fn address_prefixes(&self) -> Vec<String> {
        self.address_space
            .as_ref()
            .map(|s| s.address_prefixes.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

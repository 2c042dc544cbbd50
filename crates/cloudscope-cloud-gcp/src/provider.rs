//! Google Cloud provider implementation

use crate::gcloud::{Gcloud, Instance, Network, zone_region};
use async_trait::async_trait;
use cloudscope_cloud::{
    CloudError, CloudProvider, DiscoveryExecutor, Item, Operation, ResourceKind, Result, Scope,
    TaskBuilder, discovery_fn, normalize_tags, normalize_timestamp,
};
use tracing::{error, info, warn};

const CLOUD: &str = "gcp";

/// Google Cloud provider
pub struct GcpProvider {
    projects: Vec<String>,
    max_workers: usize,
}

impl GcpProvider {
    pub fn new(projects: Vec<String>, max_workers: usize) -> Self {
        Self {
            projects,
            max_workers,
        }
    }
}

#[async_trait]
impl CloudProvider for GcpProvider {
    fn name(&self) -> &str {
        CLOUD
    }

    fn display_name(&self) -> &str {
        "Google Cloud"
    }

    async fn discover(&self, kind: ResourceKind) -> Result<Vec<Item>> {
        let handler = match kind {
            ResourceKind::Vm => discovery_fn(list_vms),
            ResourceKind::Vpc => discovery_fn(list_networks),
        };

        let batch = TaskBuilder::new(CLOUD, self.projects.clone())
            .build(handler, kind.label())
            .await;

        DiscoveryExecutor::new(self.max_workers)
            .discover(CLOUD, batch)
            .await
    }

    async fn apply(&self, kind: ResourceKind, operation: &Operation, item: &Item) -> Result<bool> {
        let missing = |field| CloudError::MissingField {
            cloud: CLOUD.to_string(),
            id: item.id.clone(),
            field,
        };

        let project = match item.get_str("account_id") {
            Some(project) if !item.id.is_empty() => project,
            Some(_) => {
                error!("{}: {}", item.display_name(), missing("id"));
                return Ok(false);
            }
            None => {
                error!("{}: {}", item.display_name(), missing("account_id"));
                return Ok(false);
            }
        };
        let gcloud = Gcloud::new(project);

        match kind {
            ResourceKind::Vm => {
                let Some(zone) = item.get_str("zone").or_else(|| item.get_str("region")) else {
                    error!("{}: {}", item.display_name(), missing("zone"));
                    return Ok(false);
                };
                apply_vm(&gcloud, operation, &item.id, zone).await
            }
            ResourceKind::Vpc => apply_network(&gcloud, operation, &item.id).await,
        }
    }
}

async fn apply_vm(gcloud: &Gcloud, operation: &Operation, name: &str, zone: &str) -> Result<bool> {
    match operation {
        Operation::Delete => {
            gcloud.delete_instance(name, zone).await?;
            info!("Successfully deleted GCP instance {}", name);
        }
        Operation::AddTag { key, value } => {
            let (key, value) = label_pair(key, value);
            gcloud.add_instance_label(name, zone, &key, &value).await?;
            info!("Successfully added {} label to GCP instance {}", key, name);
        }
        Operation::SetProtection(enabled) => {
            gcloud.set_deletion_protection(name, zone, *enabled).await?;
            info!(
                "Successfully {} deletion protection for GCP instance {}",
                if *enabled { "enabled" } else { "disabled" },
                name
            );
        }
    }
    Ok(true)
}

async fn apply_network(gcloud: &Gcloud, operation: &Operation, name: &str) -> Result<bool> {
    match operation {
        Operation::Delete => {
            if name == "default" {
                error!("Cannot delete default VPC network in {}", gcloud.project());
                return Ok(false);
            }
            gcloud.delete_network(name).await?;
            info!("Successfully deleted GCP VPC network {}", name);
            Ok(true)
        }
        Operation::AddTag { .. } => {
            warn!("{}: labels are not supported for GCP VPC networks", name);
            Ok(false)
        }
        Operation::SetProtection(_) => {
            warn!("{}: protection is not supported for GCP VPC networks", name);
            Ok(false)
        }
    }
}

/// Labels only accept lower-case keys and values without dots
fn label_pair(key: &str, value: &str) -> (String, String) {
    (key.to_lowercase(), value.to_lowercase().replace('.', "-"))
}

async fn list_vms(scope: Scope) -> Result<Vec<Item>> {
    let instances = Gcloud::new(&scope.account).list_instances().await?;
    Ok(instances
        .iter()
        .map(|instance| vm_item(instance, &scope.account))
        .collect())
}

async fn list_networks(scope: Scope) -> Result<Vec<Item>> {
    let networks = Gcloud::new(&scope.account).list_networks().await?;
    Ok(networks
        .iter()
        .map(|network| network_item(network, &scope.account))
        .collect())
}

fn vm_item(instance: &Instance, project: &str) -> Item {
    let zone = instance.zone_name();
    let launch_time = instance
        .creation_timestamp
        .as_deref()
        .and_then(normalize_timestamp);

    // Instance names are unique per project and double as the id.
    Item::new(CLOUD, &instance.name, &instance.name)
        .with("account_id", project)
        .with("account_name", project)
        .with("state", instance.status.to_lowercase())
        .with("image_name", instance.boot_disk_name())
        .with("launch_time", launch_time)
        .with("vpc_id", instance.network_name())
        .with("subnet_id", instance.subnetwork_name())
        .with("region", zone_region(zone))
        .with("zone", zone)
        .with("deletion_protection", instance.deletion_protection)
        .with("tags", normalize_tags(instance.labels.as_ref()))
}

fn network_item(network: &Network, project: &str) -> Item {
    Item::new(CLOUD, &network.name, &network.name)
        .with("description", network.description.as_str())
        .with("subnet_mode", network.subnet_mode())
        .with("eni_count", 0)
        .with("vm_count", 0)
        .with("routing_mode", network.routing_mode())
        .with("mtu", network.mtu.unwrap_or(1460))
        .with("account_id", project)
}

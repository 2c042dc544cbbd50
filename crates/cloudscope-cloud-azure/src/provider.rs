//! Azure provider implementation

use crate::az::{
    AzCli, NetworkInterface, VirtualMachine, VirtualNetwork, resource_group, subnet_names,
};
use async_trait::async_trait;
use cloudscope_cloud::{
    CloudError, CloudProvider, DiscoveryExecutor, Item, Operation, ResourceKind, Result, Scope,
    TaskBuilder, discovery_fn, normalize_tags, normalize_timestamp,
};
use std::collections::HashMap;
use tracing::{error, info, warn};

const CLOUD: &str = "azure";

/// Azure provider
pub struct AzureProvider {
    subscriptions: Vec<String>,
    max_workers: usize,
}

impl AzureProvider {
    pub fn new(subscriptions: Vec<String>, max_workers: usize) -> Self {
        Self {
            subscriptions,
            max_workers,
        }
    }
}

#[async_trait]
impl CloudProvider for AzureProvider {
    fn name(&self) -> &str {
        CLOUD
    }

    fn display_name(&self) -> &str {
        "Microsoft Azure"
    }

    async fn discover(&self, kind: ResourceKind) -> Result<Vec<Item>> {
        let handler = match kind {
            ResourceKind::Vm => discovery_fn(list_vms),
            ResourceKind::Vpc => discovery_fn(list_vnets),
        };

        let batch = TaskBuilder::new(CLOUD, self.subscriptions.clone())
            .build(handler, kind.label())
            .await;

        DiscoveryExecutor::new(self.max_workers)
            .discover(CLOUD, batch)
            .await
    }

    async fn apply(&self, kind: ResourceKind, operation: &Operation, item: &Item) -> Result<bool> {
        if let Operation::SetProtection(_) = operation {
            warn!(
                "Protection is not supported for Azure {}s ({})",
                kind.label(),
                item.id
            );
            return Ok(false);
        }

        let (name, subscription, group) = match target(item) {
            Ok(target) => target,
            Err(e) => {
                error!("{}: {}", item.display_name(), e);
                return Ok(false);
            }
        };

        let az = AzCli::new(subscription);
        let (resource, label): (&[&str], &str) = match kind {
            ResourceKind::Vm => (&["vm"], "VM"),
            ResourceKind::Vpc => (&["network", "vnet"], "VNet"),
        };

        match operation {
            Operation::Delete => {
                match kind {
                    ResourceKind::Vm => az.delete_vm(name, group).await?,
                    ResourceKind::Vpc => az.delete_vnet(name, group).await?,
                }
                info!("Successfully deleted Azure {} {}", label, name);
            }
            Operation::AddTag { key, value } => {
                az.set_tag(resource, name, group, key, value).await?;
                info!("Successfully added {} tag to Azure {} {}", key, label, name);
            }
            Operation::SetProtection(_) => return Ok(false),
        }

        Ok(true)
    }
}

/// Name, subscription and resource group an operation needs
fn target(item: &Item) -> Result<(&str, &str, &str)> {
    let missing = |field| CloudError::MissingField {
        cloud: CLOUD.to_string(),
        id: item.id.clone(),
        field,
    };

    if item.id.is_empty() {
        return Err(missing("id"));
    }
    let subscription = item
        .get_str("account_id")
        .ok_or_else(|| missing("account_id"))?;
    let group = item
        .get_str("resource_group")
        .ok_or_else(|| missing("resource_group"))?;

    Ok((item.id.as_str(), subscription, group))
}

async fn list_vms(scope: Scope) -> Result<Vec<Item>> {
    let az = AzCli::new(&scope.account);

    let nics = match az.list_nics().await {
        Ok(nics) => nics,
        Err(e) => {
            warn!(
                "Could not fetch network interfaces for {}: {}",
                scope.account, e
            );
            Vec::new()
        }
    };
    let networks = nic_networks(&nics);

    let vms = az.list_vms().await?;
    Ok(vms
        .iter()
        .map(|vm| vm_item(vm, &scope.account, &networks))
        .collect())
}

async fn list_vnets(scope: Scope) -> Result<Vec<Item>> {
    let vnets = AzCli::new(&scope.account).list_vnets().await?;
    Ok(vnets
        .iter()
        .map(|vnet| vnet_item(vnet, &scope.account))
        .collect())
}

/// Map lower-cased NIC id to its (vnet, subnet) names
fn nic_networks(nics: &[NetworkInterface]) -> HashMap<String, (String, String)> {
    nics.iter()
        .filter_map(|nic| {
            let (vnet, subnet) = subnet_names(nic.subnet_id()?)?;
            Some((
                nic.id.to_lowercase(),
                (vnet.to_string(), subnet.to_string()),
            ))
        })
        .collect()
}

fn vm_item(
    vm: &VirtualMachine,
    subscription: &str,
    networks: &HashMap<String, (String, String)>,
) -> Item {
    let (vnet, subnet) = vm
        .primary_nic_id()
        .and_then(|id| networks.get(&id.to_lowercase()))
        .map(|(vnet, subnet)| (vnet.as_str(), subnet.as_str()))
        .unwrap_or(("", ""));
    let launch_time = vm.time_created.as_deref().and_then(normalize_timestamp);

    // VM names are the handle the az CLI operates on, so they double as the id.
    Item::new(CLOUD, &vm.name, &vm.name)
        .with("account_id", subscription)
        .with("account_name", subscription)
        .with("image_name", vm.image_name())
        .with("launch_time", launch_time)
        .with("region", vm.location.as_str())
        .with("zone", vm.zone())
        .with(
            "resource_group",
            resource_group(&vm.id).unwrap_or("unknown"),
        )
        .with("vpc_id", vnet)
        .with("subnet_id", subnet)
        .with("tags", normalize_tags(vm.tags.as_ref()))
}

fn vnet_item(vnet: &VirtualNetwork, subscription: &str) -> Item {
    Item::new(CLOUD, &vnet.name, &vnet.name)
        .with(
            "resource_group",
            resource_group(&vnet.id).unwrap_or("unknown"),
        )
        .with("location", vnet.location.as_str())
        .with("address_prefixes", vnet.address_prefixes())
        .with("eni_count", 0)
        .with("vm_count", 0)
        .with(
            "provisioning_state",
            vnet.provisioning_state.as_deref().unwrap_or(""),
        )
        .with("account_id", subscription)
        .with("tags", normalize_tags(vnet.tags.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vm_item_joins_nic_network() {
        let nics: Vec<NetworkInterface> = serde_json::from_value(json!([{
            "id": "/subscriptions/0000/resourceGroups/RG-WEB/providers/Microsoft.Network/networkInterfaces/web-1-nic",
            "ipConfigurations": [{"subnet": {
                "id": "/subscriptions/0000/resourceGroups/rg-net/providers/Microsoft.Network/virtualNetworks/vnet-a/subnets/app"
            }}]
        }]))
        .unwrap();
        let vm: VirtualMachine = serde_json::from_value(json!({
            "id": "/subscriptions/0000/resourceGroups/rg-web/providers/Microsoft.Compute/virtualMachines/web-1",
            "name": "web-1",
            "location": "westeurope",
            "tags": {"Env": "prod"},
            "networkProfile": {"networkInterfaces": [{
                "id": "/subscriptions/0000/resourceGroups/rg-web/providers/Microsoft.Network/networkInterfaces/web-1-nic"
            }]}
        }))
        .unwrap();

        let item = vm_item(&vm, "0000", &nic_networks(&nics));

        assert_eq!(item.id, "web-1");
        assert_eq!(item.location(), "westeurope");
        assert_eq!(item.account(), "0000");
        assert_eq!(item.get_str("resource_group"), Some("rg-web"));
        assert_eq!(item.get_str("vpc_id"), Some("vnet-a"));
        assert_eq!(item.get_str("subnet_id"), Some("app"));
        assert_eq!(item.get("tags").unwrap()["env"], "prod");
    }

    #[test]
    fn test_vnet_item() {
        let vnet: VirtualNetwork = serde_json::from_value(json!({
            "id": "/subscriptions/0000/resourceGroups/rg-net/providers/Microsoft.Network/virtualNetworks/vnet-a",
            "name": "vnet-a",
            "location": "northeurope",
            "addressSpace": {"addressPrefixes": ["10.1.0.0/16", "10.2.0.0/16"]},
            "provisioningState": "Succeeded"
        }))
        .unwrap();

        let item = vnet_item(&vnet, "0000");

        assert_eq!(item.location(), "northeurope");
        assert_eq!(item.get_str("resource_group"), Some("rg-net"));
        assert_eq!(
            item.get("address_prefixes").unwrap(),
            &json!(["10.1.0.0/16", "10.2.0.0/16"])
        );
        assert_eq!(item.get("tags").unwrap(), &json!({}));
    }

    #[tokio::test]
    async fn test_protection_is_unsupported() {
        let provider = AzureProvider::new(vec!["0000".into()], 4);
        let item = Item::new("azure", "web-1", "web-1")
            .with("account_id", "0000")
            .with("resource_group", "rg-web");

        let applied = provider
            .apply(ResourceKind::Vm, &Operation::SetProtection(true), &item)
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn test_missing_resource_group_is_not_a_success() {
        let provider = AzureProvider::new(vec!["0000".into()], 4);
        let item = Item::new("azure", "web-1", "web-1").with("account_id", "0000");

        let applied = provider
            .apply(ResourceKind::Vm, &Operation::Delete, &item)
            .await
            .unwrap();
        assert!(!applied);
    }
}

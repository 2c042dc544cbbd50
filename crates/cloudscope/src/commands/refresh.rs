use super::build_fleet;
use anyhow::bail;
use cloudscope_cloud::{
    InventoryStore, Item, ResourceKind, annotate_vm_counts, log_discovery_stats,
};
use cloudscope_config::Config;
use colored::Colorize;
use std::time::Instant;
use tracing::{info, warn};

/// `csp refresh`: VMs first so the VPC inventory can count them
pub async fn handle(config: &Config) -> anyhow::Result<()> {
    println!("{}", "=== Starting refresh of cloud resources ===".bold());
    let start = Instant::now();

    let mut failures = Vec::new();
    for kind in [ResourceKind::Vm, ResourceKind::Vpc] {
        for provider in refresh_kind(kind, config).await? {
            failures.push(format!("{} ({}s)", provider, kind.label()));
        }
    }

    let store = InventoryStore::new(config.inventory_dir());
    println!();
    println!("{}", "=== Refresh complete ===".green().bold());
    println!("Inventory files updated:");
    for kind in [ResourceKind::Vm, ResourceKind::Vpc] {
        println!("  - {}", store.path(kind).display().to_string().cyan());
    }
    if !failures.is_empty() {
        println!("{}", "Discovery failed for:".yellow());
        for failure in &failures {
            println!("  - {}", failure.yellow());
        }
    }
    println!();
    println!("Total time: {}", format_duration(start.elapsed().as_secs()));

    Ok(())
}

/// Discover one resource kind on every provider and save the inventory.
///
/// Returns the display names of the providers whose discovery failed.
pub async fn refresh_kind(kind: ResourceKind, config: &Config) -> anyhow::Result<Vec<String>> {
    if config.is_empty() {
        bail!(
            "No cloud accounts configured. Add aws_profiles, azure_subs or gcp_projects to config.json"
        );
    }

    info!("Discovering {}s...", kind.label());
    let fleet = build_fleet(config);
    let result = fleet.discover(kind).await;
    log_discovery_stats(&result.stats, kind.label());

    let store = InventoryStore::new(config.inventory_dir());
    save_inventory(&store, kind, result.items).await?;

    Ok(fleet
        .failed_providers(&result.stats)
        .into_iter()
        .map(String::from)
        .collect())
}

/// Save discovered items; networks get `vm_count` from the VM inventory when
/// it can be read
async fn save_inventory(
    store: &InventoryStore,
    kind: ResourceKind,
    mut items: Vec<Item>,
) -> anyhow::Result<()> {
    if kind == ResourceKind::Vpc && store.exists(ResourceKind::Vm) {
        match store.load(ResourceKind::Vm).await {
            Ok(vms) => annotate_vm_counts(&mut items, &vms),
            Err(e) => warn!("Skipping VM counts, could not read the VM inventory: {}", e),
        }
    }

    store.save(kind, &items).await?;
    Ok(())
}

fn format_duration(seconds: u64) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn vpc(id: &str) -> Item {
        Item::new("gcp", id, id).with("account_id", "demo-project")
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0m 0s");
        assert_eq!(format_duration(59), "0m 59s");
        assert_eq!(format_duration(125), "2m 5s");
    }

    #[tokio::test]
    async fn test_refresh_without_accounts_fails() {
        let err = refresh_kind(ResourceKind::Vm, &Config::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No cloud accounts configured"));
    }

    #[tokio::test]
    async fn test_vpc_save_counts_vms() {
        let temp_dir = tempdir().unwrap();
        let store = InventoryStore::new(temp_dir.path());
        store
            .save(
                ResourceKind::Vm,
                &[Item::new("gcp", "vm-1", "vm-1")
                    .with("account_id", "demo-project")
                    .with("vpc_id", "prod")],
            )
            .await
            .unwrap();

        save_inventory(&store, ResourceKind::Vpc, vec![vpc("prod"), vpc("dev")])
            .await
            .unwrap();

        let saved = store.load(ResourceKind::Vpc).await.unwrap();
        assert_eq!(saved[0].get("vm_count").unwrap(), 1);
        assert_eq!(saved[1].get("vm_count").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_vm_inventory_does_not_block_vpc_save() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(temp_dir.path().join("vm.json"), "{corrupt").unwrap();
        std::fs::write(
            temp_dir.path().join("vpc.json"),
            r#"[{"cloud":"gcp","id":"old","name":"old"}]"#,
        )
        .unwrap();
        let store = InventoryStore::new(temp_dir.path());

        save_inventory(&store, ResourceKind::Vpc, vec![vpc("prod")])
            .await
            .unwrap();

        let saved = store.load(ResourceKind::Vpc).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, "prod");
        assert_eq!(saved[0].get("vm_count"), None);
    }
}

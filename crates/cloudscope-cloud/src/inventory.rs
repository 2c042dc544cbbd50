//! JSON inventory files
//!
//! Each resource kind lives in `{dir}/{kind}.json` as a list of flat item
//! objects. The previous file is kept as `{kind}.json.backup` on save, and
//! the new content is written to a temporary file that is renamed into place,
//! so an interrupted save never leaves a truncated inventory behind.

use crate::error::{CloudError, Result};
use crate::item::{Item, ResourceKind};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Reads and writes inventory files
#[derive(Debug, Clone)]
pub struct InventoryStore {
    dir: PathBuf,
}

impl InventoryStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Inventory file path for a kind
    pub fn path(&self, kind: ResourceKind) -> PathBuf {
        self.dir.join(format!("{}.json", kind.stem()))
    }

    fn backup_path(&self, kind: ResourceKind) -> PathBuf {
        self.dir.join(format!("{}.json.backup", kind.stem()))
    }

    pub fn exists(&self, kind: ResourceKind) -> bool {
        self.path(kind).exists()
    }

    pub async fn load(&self, kind: ResourceKind) -> Result<Vec<Item>> {
        let path = self.path(kind);
        if !path.exists() {
            return Err(CloudError::InventoryNotFound(path));
        }

        let content = fs::read_to_string(&path).await?;
        let items: Vec<Item> = serde_json::from_str(&content)?;

        tracing::debug!("Loaded {} items from {}", items.len(), path.display());
        Ok(items)
    }

    pub async fn save(&self, kind: ResourceKind, items: &[Item]) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).await?;
            tracing::debug!("Created inventory directory: {}", self.dir.display());
        }

        let content = serde_json::to_string_pretty(items)?;
        let staged = tempfile::Builder::new()
            .prefix(&format!(".{}.json.", kind.stem()))
            .tempfile_in(&self.dir)?;
        fs::write(staged.path(), content).await?;

        let path = self.path(kind);
        if path.exists() {
            fs::copy(&path, self.backup_path(kind)).await?;
            tracing::debug!("Created inventory backup for {}", kind);
        }

        staged.persist(&path).map_err(|e| e.error)?;

        tracing::info!("Saved {} items to {}", items.len(), path.display());
        Ok(())
    }
}

/// Set `vm_count` on every network from the VM inventory.
///
/// A VM belongs to a network when cloud and account match and its `vpc_id`
/// equals the network id.
pub fn annotate_vm_counts(vpcs: &mut [Item], vms: &[Item]) {
    let mut counts: HashMap<(String, &str, &str), usize> = HashMap::new();
    for vm in vms {
        if let Some(vpc_id) = vm.get_str("vpc_id") {
            *counts
                .entry((vm.cloud_key(), vm.account(), vpc_id))
                .or_default() += 1;
        }
    }

    for vpc in vpcs.iter_mut() {
        let count = counts
            .get(&(vpc.cloud_key(), vpc.account(), vpc.id.as_str()))
            .copied()
            .unwrap_or(0);
        vpc.set("vm_count", count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_inventory_save_load() {
        let temp_dir = tempdir().unwrap();
        let store = InventoryStore::new(temp_dir.path().join("inventory"));

        let items = vec![
            Item::new("aws", "i-0abc", "web-1").with("region", "us-east-1"),
            Item::new("gcp", "db-1", "db-1").with("zone", "europe-west1-b"),
        ];
        store.save(ResourceKind::Vm, &items).await.unwrap();

        let loaded = store.load(ResourceKind::Vm).await.unwrap();
        assert_eq!(loaded, items);
        assert!(store.path(ResourceKind::Vm).ends_with("inventory/vm.json"));
    }

    #[tokio::test]
    async fn test_save_keeps_backup() {
        let temp_dir = tempdir().unwrap();
        let store = InventoryStore::new(temp_dir.path());

        store
            .save(ResourceKind::Vpc, &[Item::new("aws", "vpc-1", "old")])
            .await
            .unwrap();
        store
            .save(ResourceKind::Vpc, &[Item::new("aws", "vpc-2", "new")])
            .await
            .unwrap();

        let backup = std::fs::read_to_string(temp_dir.path().join("vpc.json.backup")).unwrap();
        assert!(backup.contains("vpc-1"));
        let loaded = store.load(ResourceKind::Vpc).await.unwrap();
        assert_eq!(loaded[0].id, "vpc-2");
    }

    #[tokio::test]
    async fn test_save_leaves_only_inventory_and_backup() {
        let temp_dir = tempdir().unwrap();
        let store = InventoryStore::new(temp_dir.path());

        store
            .save(ResourceKind::Vm, &[Item::new("aws", "i-1", "old")])
            .await
            .unwrap();
        let mut files: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files, vec!["vm.json"]);

        store
            .save(ResourceKind::Vm, &[Item::new("aws", "i-2", "new")])
            .await
            .unwrap();
        files = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files, vec!["vm.json", "vm.json.backup"]);

        let current = std::fs::read_to_string(store.path(ResourceKind::Vm)).unwrap();
        assert!(current.contains("i-2"));
        assert!(!current.contains("i-1"));
    }

    #[tokio::test]
    async fn test_save_into_missing_dir_keeps_existing_file_until_replaced() {
        let temp_dir = tempdir().unwrap();
        let store = InventoryStore::new(temp_dir.path().join("nested").join("inventory"));

        store
            .save(ResourceKind::Vpc, &[Item::new("gcp", "prod", "prod")])
            .await
            .unwrap();
        store.save(ResourceKind::Vpc, &[]).await.unwrap();

        assert!(store.load(ResourceKind::Vpc).await.unwrap().is_empty());
        let backup = std::fs::read_to_string(store.dir().join("vpc.json.backup")).unwrap();
        assert!(backup.contains("\"prod\""));
    }

    #[tokio::test]
    async fn test_missing_inventory() {
        let temp_dir = tempdir().unwrap();
        let store = InventoryStore::new(temp_dir.path());

        let err = store.load(ResourceKind::Vm).await.unwrap_err();
        assert!(matches!(err, CloudError::InventoryNotFound(_)));
        assert!(err.to_string().contains("--refresh"));
    }

    #[tokio::test]
    async fn test_malformed_inventory() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(temp_dir.path().join("vm.json"), "{not json").unwrap();
        let store = InventoryStore::new(temp_dir.path());

        let err = store.load(ResourceKind::Vm).await.unwrap_err();
        assert!(matches!(err, CloudError::Json(_)));
    }

    #[test]
    fn test_annotate_vm_counts() {
        let vms = vec![
            Item::new("aws", "i-1", "a")
                .with("profile", "prod")
                .with("vpc_id", "vpc-1"),
            Item::new("aws", "i-2", "b")
                .with("profile", "prod")
                .with("vpc_id", "vpc-1"),
            Item::new("aws", "i-3", "c")
                .with("profile", "dev")
                .with("vpc_id", "vpc-1"),
            Item::new("gcp", "vm-1", "vm-1")
                .with("account_id", "proj")
                .with("vpc_id", "default"),
        ];
        let mut vpcs = vec![
            Item::new("aws", "vpc-1", "main").with("profile", "prod"),
            Item::new("gcp", "default", "default").with("account_id", "proj"),
            Item::new("azure", "vnet-1", "vnet-1").with("account_id", "sub"),
        ];

        annotate_vm_counts(&mut vpcs, &vms);

        assert_eq!(vpcs[0].get("vm_count").unwrap(), 2);
        assert_eq!(vpcs[1].get("vm_count").unwrap(), 1);
        assert_eq!(vpcs[2].get("vm_count").unwrap(), 0);
    }
}

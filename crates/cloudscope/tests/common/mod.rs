use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Temporary working directory with its own config and inventory
pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let project = Self { root };
        project.write_config("{}");
        project
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.config_path(), content).unwrap();
    }

    pub fn write_inventory(&self, stem: &str, items: Value) {
        let dir = self.inventory_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(format!("{}.json", stem)),
            serde_json::to_string_pretty(&items).unwrap(),
        )
        .unwrap();
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.path().join("config.json")
    }

    pub fn inventory_dir(&self) -> PathBuf {
        self.root.path().join("inventory")
    }

    /// `csp` running inside the project, isolated from the user's setup
    #[allow(deprecated)]
    pub fn csp(&self) -> Command {
        let mut cmd = Command::cargo_bin("csp").unwrap();
        cmd.current_dir(self.root.path())
            .env("CLOUDSCOPE_CONFIG", self.config_path())
            .env("CLOUDSCOPE_INVENTORY_DIR", self.inventory_dir())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("CLOUDSCOPE_LOG_LEVEL");
        cmd
    }
}

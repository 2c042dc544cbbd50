pub mod refresh;
pub mod resource;

use clap::Args;
use cloudscope_cloud::Fleet;
use cloudscope_cloud_aws::AwsProvider;
use cloudscope_cloud_azure::AzureProvider;
use cloudscope_cloud_gcp::GcpProvider;
use cloudscope_config::Config;
use std::sync::Arc;

/// Flags shared by `csp vm` and `csp vpc`
#[derive(Args, Debug, Clone, Default)]
pub struct ResourceArgs {
    /// Discover across all clouds and save the inventory
    #[arg(short, long)]
    pub refresh: bool,

    /// Select by 1-based index, id or name (comma-separated), or @file
    #[arg(short, long, value_name = "IDS")]
    pub ids: Option<String>,

    /// Delete the selected resources
    #[arg(short, long)]
    pub delete: bool,

    /// Tag key to add (requires --value)
    #[arg(short, long, value_name = "KEY")]
    pub tag: Option<String>,

    /// Tag value to add (requires --tag)
    #[arg(short, long, value_name = "VALUE")]
    pub value: Option<String>,

    /// Enable or disable termination/deletion protection (VMs only)
    #[arg(long, value_name = "true|false")]
    pub protected: Option<bool>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Every provider, scoped to the accounts in `config`
///
/// Providers without accounts stay registered so that operations on items
/// from an older inventory still reach them.
pub fn build_fleet(config: &Config) -> Fleet {
    let workers = &config.workers;

    Fleet::new(workers.clouds, workers.operations)
        .with_provider(Arc::new(AwsProvider::new(
            config.aws_profiles.clone(),
            workers.aws,
        )))
        .with_provider(Arc::new(AzureProvider::new(
            config.azure_subs.clone(),
            workers.azure,
        )))
        .with_provider(Arc::new(GcpProvider::new(
            config.gcp_projects.clone(),
            workers.gcp,
        )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_fleet_registers_every_provider() {
        let fleet = build_fleet(&Config::default());
        let names: Vec<&str> = fleet.providers().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["aws", "azure", "gcp"]);
    }
}

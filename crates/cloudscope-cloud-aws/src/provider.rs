//! AWS provider implementation

use crate::ec2::{self, Ec2};
use async_trait::async_trait;
use aws_sdk_ec2::types::{Image, Instance, NetworkInterface, Reservation, Tag, Vpc};
use cloudscope_cloud::{
    CloudError, CloudProvider, DiscoveryExecutor, Item, Operation, ResourceKind, Result, Scope,
    ScopeEnumerator, TaskBuilder, discovery_fn, normalize_tags, normalize_timestamp,
};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const CLOUD: &str = "aws";

/// AWS provider
pub struct AwsProvider {
    profiles: Vec<String>,
    max_workers: usize,
}

impl AwsProvider {
    pub fn new(profiles: Vec<String>, max_workers: usize) -> Self {
        Self {
            profiles,
            max_workers,
        }
    }
}

#[async_trait]
impl CloudProvider for AwsProvider {
    fn name(&self) -> &str {
        CLOUD
    }

    fn display_name(&self) -> &str {
        "Amazon Web Services"
    }

    async fn discover(&self, kind: ResourceKind) -> Result<Vec<Item>> {
        let handler = match kind {
            ResourceKind::Vm => discovery_fn(list_vms),
            ResourceKind::Vpc => discovery_fn(list_vpcs),
        };

        let batch = TaskBuilder::new(CLOUD, self.profiles.clone())
            .with_enumerator(Arc::new(RegionEnumerator))
            .build(handler, kind.label())
            .await;

        DiscoveryExecutor::new(self.max_workers)
            .discover(CLOUD, batch)
            .await
    }

    async fn apply(&self, kind: ResourceKind, operation: &Operation, item: &Item) -> Result<bool> {
        let target = match Target::from_item(item) {
            Ok(target) => target,
            Err(e) => {
                error!("{}: {}", item.display_name(), e);
                return Ok(false);
            }
        };
        let ec2 = Ec2::connect(target.profile, Some(target.region)).await;

        match (kind, operation) {
            (ResourceKind::Vm, Operation::Delete) => {
                ec2.terminate_instance(target.id).await?;
                info!("Successfully initiated deletion of AWS instance {}", target.id);
            }
            (ResourceKind::Vm, Operation::SetProtection(enabled)) => {
                ec2.set_instance_protection(target.id, *enabled).await?;
                info!(
                    "Successfully {} API termination and stop protection for AWS instance {}",
                    if *enabled { "enabled" } else { "disabled" },
                    target.id
                );
            }
            (ResourceKind::Vpc, Operation::Delete) => {
                delete_vpc(&ec2, target.id, item.display_name()).await?;
            }
            (_, Operation::AddTag { key, value }) => {
                ec2.create_tag(target.id, key, value).await?;
                info!(
                    "Successfully added {} tag to AWS {} {}",
                    key,
                    kind.label(),
                    target.id
                );
            }
            (ResourceKind::Vpc, Operation::SetProtection(_)) => {
                warn!(
                    "{}: protection is not supported for AWS VPCs",
                    item.display_name()
                );
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Lists the regions of each profile
struct RegionEnumerator;

#[async_trait]
impl ScopeEnumerator for RegionEnumerator {
    async fn scopes(&self, account: &str) -> Result<Vec<String>> {
        Ok(Ec2::connect(account, None).await.describe_regions().await?)
    }
}

/// The id, region and profile an operation needs
#[derive(Debug)]
struct Target<'a> {
    id: &'a str,
    region: &'a str,
    profile: &'a str,
}

impl<'a> Target<'a> {
    fn from_item(item: &'a Item) -> Result<Self> {
        let missing = |field| CloudError::MissingField {
            cloud: CLOUD.to_string(),
            id: item.id.clone(),
            field,
        };

        if item.id.is_empty() {
            return Err(missing("id"));
        }
        let region = item.get_str("region").ok_or_else(|| missing("region"))?;
        let profile = item.get_str("profile").ok_or_else(|| missing("profile"))?;

        Ok(Self {
            id: &item.id,
            region,
            profile,
        })
    }
}

fn region_of(scope: &Scope) -> Result<String> {
    scope
        .region
        .clone()
        .ok_or_else(|| CloudError::ApiError(format!("no region for profile {}", scope.account)))
}

async fn list_vms(scope: Scope) -> Result<Vec<Item>> {
    let region = region_of(&scope)?;
    let ec2 = Ec2::connect(&scope.account, Some(&region)).await;

    let reservations = ec2.describe_instances().await?;
    if reservations.iter().all(|r| r.instances().is_empty()) {
        return Ok(Vec::new());
    }
    let image_ids = image_ids(&reservations);

    // Deregistered images make the batched call fail; fall back to ids.
    let images = if image_ids.is_empty() {
        Vec::new()
    } else {
        match ec2.describe_images(&image_ids).await {
            Ok(images) => images,
            Err(e) => {
                debug!("Could not resolve image names in {}: {}", region, e);
                Vec::new()
            }
        }
    };
    let image_names = image_name_map(&images);

    Ok(vm_items(&reservations, ec2.profile(), &region, &image_names))
}

async fn list_vpcs(scope: Scope) -> Result<Vec<Item>> {
    let region = region_of(&scope)?;
    let ec2 = Ec2::connect(&scope.account, Some(&region)).await;

    let vpcs = ec2.describe_vpcs().await?;
    if vpcs.is_empty() {
        return Ok(Vec::new());
    }

    let vpc_ids: Vec<&str> = vpcs.iter().filter_map(|v| v.vpc_id()).collect();
    let interfaces = match ec2.describe_network_interfaces(&vpc_ids).await {
        Ok(interfaces) => interfaces,
        Err(e) => {
            debug!("Could not count network interfaces in {}: {}", region, e);
            Vec::new()
        }
    };
    let eni_counts = eni_counts(&interfaces);

    Ok(vpcs
        .iter()
        .map(|vpc| vpc_item(vpc, ec2.profile(), &region, &eni_counts))
        .collect())
}

/// Distinct image ids across all instances, for one batched lookup
fn image_ids(reservations: &[Reservation]) -> Vec<&str> {
    let ids: BTreeSet<&str> = reservations
        .iter()
        .flat_map(|r| r.instances())
        .filter_map(|i| i.image_id())
        .collect();
    ids.into_iter().collect()
}

fn image_name_map(images: &[Image]) -> HashMap<String, String> {
    images
        .iter()
        .filter_map(|image| Some((image.image_id()?.to_string(), image.name()?.to_string())))
        .collect()
}

fn eni_counts(interfaces: &[NetworkInterface]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for vpc_id in interfaces.iter().filter_map(|eni| eni.vpc_id()) {
        *counts.entry(vpc_id).or_default() += 1;
    }
    counts
}

/// Lower-cased tag map, shaped like the other clouds' tags/labels
fn tag_map(tags: &[Tag]) -> Map<String, Value> {
    let raw: Map<String, Value> = tags
        .iter()
        .filter_map(|tag| Some((tag.key()?.to_string(), Value::from(tag.value().unwrap_or("")))))
        .collect();
    normalize_tags(Some(&Value::Object(raw)))
}

/// Name tag, falling back to the resource id
fn tag_name(tags: &Map<String, Value>, fallback: &str) -> String {
    tags.get("name")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// One item per instance; the reservation owner is the account id
fn vm_items(
    reservations: &[Reservation],
    profile: &str,
    region: &str,
    image_names: &HashMap<String, String>,
) -> Vec<Item> {
    reservations
        .iter()
        .flat_map(|reservation| {
            let account_id = reservation.owner_id().unwrap_or("");
            reservation
                .instances()
                .iter()
                .map(move |instance| vm_item(instance, profile, region, account_id, image_names))
        })
        .collect()
}

fn vm_item(
    instance: &Instance,
    profile: &str,
    region: &str,
    account_id: &str,
    image_names: &HashMap<String, String>,
) -> Item {
    let instance_id = instance.instance_id().unwrap_or_default();
    let tags = tag_map(instance.tags());
    let name = tag_name(&tags, instance_id);

    let image_id = instance.image_id().unwrap_or("unknown");
    let image_name = image_names
        .get(image_id)
        .map(String::as_str)
        .unwrap_or(image_id);

    let state = instance
        .state()
        .and_then(|s| s.name())
        .map(|n| n.as_str())
        .unwrap_or("unknown");

    let launch_time = instance
        .launch_time()
        .and_then(ec2::rfc3339)
        .map(|raw| normalize_timestamp(&raw).unwrap_or(raw));

    let zone = instance
        .placement()
        .and_then(|p| p.availability_zone())
        .unwrap_or("");

    Item::new(CLOUD, instance_id, name)
        .with("account_id", account_id)
        .with("account_name", profile)
        .with("state", state)
        .with("image_name", image_name)
        .with("profile", profile)
        .with("launch_time", launch_time)
        .with("region", region)
        .with("zone", zone)
        .with("vpc_id", instance.vpc_id().unwrap_or(""))
        .with("subnet_id", instance.subnet_id().unwrap_or(""))
        .with("tags", tags)
}

fn vpc_item(vpc: &Vpc, profile: &str, region: &str, eni_counts: &HashMap<&str, usize>) -> Item {
    let vpc_id = vpc.vpc_id().unwrap_or_default();
    let tags = tag_map(vpc.tags());
    let name = tag_name(&tags, vpc_id);

    Item::new(CLOUD, vpc_id, name)
        .with("cidr_block", vpc.cidr_block().unwrap_or(""))
        .with("state", vpc.state().map(|s| s.as_str()).unwrap_or(""))
        .with("is_default", vpc.is_default().unwrap_or(false))
        .with("eni_count", eni_counts.get(vpc_id).copied().unwrap_or(0))
        .with("vm_count", 0)
        .with("region", region)
        .with("profile", profile)
        .with("tags", tags)
}

/// Remove the VPC's dependencies, then the VPC itself.
///
/// Cleanup steps only warn on failure; the final delete-vpc reports whatever
/// is still attached.
async fn delete_vpc(ec2: &Ec2, vpc_id: &str, vpc_name: &str) -> Result<()> {
    info!("{}: Deleting VPC endpoints...", vpc_name);
    match ec2.describe_vpc_endpoints(vpc_id).await {
        Ok(endpoints) => {
            for endpoint in endpoints {
                match ec2.delete_vpc_endpoint(&endpoint).await {
                    Ok(()) => info!("{}: Deleted VPC endpoint {}", vpc_name, endpoint),
                    Err(e) => warn!(
                        "{}: Failed to delete VPC endpoint {}: {}",
                        vpc_name, endpoint, e
                    ),
                }
            }
        }
        Err(e) => warn!("{}: Error listing VPC endpoints: {}", vpc_name, e),
    }

    info!("{}: Deleting subnets...", vpc_name);
    match ec2.describe_subnets(vpc_id).await {
        Ok(subnets) => {
            for subnet in subnets {
                match ec2.delete_subnet(&subnet).await {
                    Ok(()) => info!("{}: Deleted subnet {}", vpc_name, subnet),
                    Err(e) => warn!("{}: Failed to delete subnet {}: {}", vpc_name, subnet, e),
                }
            }
        }
        Err(e) => warn!("{}: Error listing subnets: {}", vpc_name, e),
    }

    // Rules go first so groups referencing each other can be deleted.
    info!("{}: Revoking security group rules...", vpc_name);
    let groups = match ec2.describe_security_groups(vpc_id).await {
        Ok(groups) => groups,
        Err(e) => {
            warn!("{}: Error listing security groups: {}", vpc_name, e);
            Vec::new()
        }
    };
    for group in &groups {
        let Some(group_id) = group.group_id() else {
            continue;
        };
        for (egress, rules) in [
            (false, group.ip_permissions()),
            (true, group.ip_permissions_egress()),
        ] {
            if rules.is_empty() {
                continue;
            }
            let direction = if egress { "egress" } else { "ingress" };
            match ec2.revoke_security_group_rules(group_id, rules, egress).await {
                Ok(()) => info!(
                    "{}: Revoked {} rules from security group {} ({})",
                    vpc_name,
                    direction,
                    group_id,
                    group.group_name().unwrap_or_default()
                ),
                Err(e) => warn!(
                    "{}: Failed to revoke {} rules from {}: {}",
                    vpc_name, direction, group_id, e
                ),
            }
        }
    }

    info!("{}: Deleting security groups...", vpc_name);
    for group_id in groups
        .iter()
        .filter(|g| g.group_name() != Some("default"))
        .filter_map(|g| g.group_id())
    {
        match ec2.delete_security_group(group_id).await {
            Ok(()) => info!("{}: Deleted security group {}", vpc_name, group_id),
            Err(e) => warn!(
                "{}: Failed to delete security group {}: {}",
                vpc_name, group_id, e
            ),
        }
    }

    info!("{}: Deleting route tables...", vpc_name);
    match ec2.describe_route_tables(vpc_id).await {
        Ok(tables) => {
            for table_id in tables
                .iter()
                .filter(|t| !ec2::is_main(t))
                .filter_map(|t| t.route_table_id())
            {
                match ec2.delete_route_table(table_id).await {
                    Ok(()) => info!("{}: Deleted route table {}", vpc_name, table_id),
                    Err(e) => warn!(
                        "{}: Failed to delete route table {}: {}",
                        vpc_name, table_id, e
                    ),
                }
            }
        }
        Err(e) => warn!("{}: Error listing route tables: {}", vpc_name, e),
    }

    info!("{}: Deleting internet gateways...", vpc_name);
    match ec2.describe_internet_gateways(vpc_id).await {
        Ok(gateways) => {
            for gateway in gateways {
                match ec2.remove_internet_gateway(&gateway, vpc_id).await {
                    Ok(()) => info!("{}: Deleted internet gateway {}", vpc_name, gateway),
                    Err(e) => warn!(
                        "{}: Failed to delete internet gateway {}: {}",
                        vpc_name, gateway, e
                    ),
                }
            }
        }
        Err(e) => warn!("{}: Error listing internet gateways: {}", vpc_name, e),
    }

    info!("{}: Deleting VPC...", vpc_name);
    ec2.delete_vpc(vpc_id).await?;
    info!("{}: Successfully deleted VPC {}", vpc_name, vpc_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::primitives::DateTime;
    use aws_sdk_ec2::types::{InstanceState, InstanceStateName, Placement, VpcState};

    fn tag(key: &str, value: &str) -> Tag {
        Tag::builder().key(key).value(value).build()
    }

    fn web_instance() -> Instance {
        Instance::builder()
            .instance_id("i-0abc")
            .image_id("ami-123")
            .state(
                InstanceState::builder()
                    .name(InstanceStateName::Running)
                    .build(),
            )
            .launch_time(DateTime::from_secs(1_709_288_430))
            .placement(
                Placement::builder()
                    .availability_zone("eu-west-1a")
                    .build(),
            )
            .vpc_id("vpc-1")
            .subnet_id("subnet-1")
            .tags(tag("Name", "web-1"))
            .tags(tag("Team", "infra"))
            .build()
    }

    #[test]
    fn test_vm_item_fields() {
        let images = HashMap::from([("ami-123".to_string(), "ubuntu-22.04".to_string())]);

        let item = vm_item(&web_instance(), "prod", "eu-west-1", "123456789012", &images);

        assert_eq!(item.cloud, "aws");
        assert_eq!(item.id, "i-0abc");
        assert_eq!(item.name, "web-1");
        assert_eq!(item.location(), "eu-west-1");
        assert_eq!(item.account(), "prod");
        assert_eq!(item.get_str("account_id"), Some("123456789012"));
        assert_eq!(item.get_str("state"), Some("running"));
        assert_eq!(item.get_str("image_name"), Some("ubuntu-22.04"));
        assert_eq!(item.get_str("launch_time"), Some("2024-03-01T10:20:30"));
        assert_eq!(item.get_str("zone"), Some("eu-west-1a"));
        assert_eq!(item.get_str("vpc_id"), Some("vpc-1"));
        assert_eq!(item.get("tags").unwrap()["team"], "infra");
    }

    #[test]
    fn test_vm_item_fallbacks() {
        let instance = Instance::builder()
            .instance_id("i-0def")
            .image_id("ami-gone")
            .state(
                InstanceState::builder()
                    .name(InstanceStateName::Stopped)
                    .build(),
            )
            .build();

        let item = vm_item(&instance, "dev", "us-east-1", "1111", &HashMap::new());

        assert_eq!(item.name, "i-0def");
        assert_eq!(item.get_str("state"), Some("stopped"));
        assert_eq!(item.get_str("image_name"), Some("ami-gone"));
        assert_eq!(item.get("launch_time"), Some(&Value::Null));
        assert_eq!(item.get_str("vpc_id"), None);
    }

    #[test]
    fn test_vm_items_take_account_from_reservation_owner() {
        let reservations = vec![
            Reservation::builder()
                .owner_id("123456789012")
                .instances(web_instance())
                .build(),
            Reservation::builder()
                .owner_id("210987654321")
                .instances(Instance::builder().instance_id("i-0def").build())
                .build(),
        ];

        let items = vm_items(&reservations, "prod", "eu-west-1", &HashMap::new());

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get_str("account_id"), Some("123456789012"));
        assert_eq!(items[1].get_str("account_id"), Some("210987654321"));
        assert_eq!(image_ids(&reservations), vec!["ami-123"]);
    }

    #[test]
    fn test_image_name_map_skips_unnamed_images() {
        let images = vec![
            Image::builder().image_id("ami-1").name("ubuntu").build(),
            Image::builder().image_id("ami-2").build(),
        ];

        let names = image_name_map(&images);

        assert_eq!(names.len(), 1);
        assert_eq!(names["ami-1"], "ubuntu");
    }

    #[test]
    fn test_vpc_item_with_eni_counts() {
        let vpc = Vpc::builder()
            .vpc_id("vpc-1")
            .cidr_block("10.0.0.0/16")
            .state(VpcState::Available)
            .is_default(false)
            .tags(tag("Name", "main"))
            .build();
        let interfaces: Vec<NetworkInterface> = ["vpc-1", "vpc-1", "vpc-2"]
            .into_iter()
            .map(|vpc_id| NetworkInterface::builder().vpc_id(vpc_id).build())
            .collect();
        let counts = eni_counts(&interfaces);

        let item = vpc_item(&vpc, "prod", "us-east-1", &counts);

        assert_eq!(item.name, "main");
        assert_eq!(item.get_str("cidr_block"), Some("10.0.0.0/16"));
        assert_eq!(item.get_str("state"), Some("available"));
        assert_eq!(item.get("eni_count").unwrap(), 2);
        assert_eq!(item.get("vm_count").unwrap(), 0);
        assert_eq!(item.get("is_default").unwrap(), false);
    }

    #[test]
    fn test_target_requires_region_and_profile() {
        let item = Item::new("aws", "i-1", "web").with("profile", "prod");
        let err = Target::from_item(&item).err().unwrap();
        assert!(matches!(
            err,
            CloudError::MissingField {
                field: "region",
                ..
            }
        ));

        let item = item.with("region", "us-east-1");
        let target = Target::from_item(&item).unwrap();
        assert_eq!(target.id, "i-1");
        assert_eq!(target.profile, "prod");
        assert_eq!(target.region, "us-east-1");
    }

    #[tokio::test]
    async fn test_apply_with_missing_fields_is_not_a_success() {
        let provider = AwsProvider::new(vec!["prod".into()], 4);
        let item = Item::new("aws", "i-1", "web");

        let applied = provider
            .apply(ResourceKind::Vm, &Operation::Delete, &item)
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn test_no_profiles_discovers_nothing() {
        let provider = AwsProvider::new(Vec::new(), 4);
        let items = provider.discover(ResourceKind::Vm).await.unwrap();
        assert!(items.is_empty());
    }
}

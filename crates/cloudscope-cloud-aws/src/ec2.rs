//! EC2 client wrapper
//!
//! Thin layer over `aws_sdk_ec2::Client` bound to one profile and region.
//! `describe_*` calls drain their paginators, so every method returns full
//! lists.

use crate::error::Result;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::primitives::{DateTime, DateTimeFormat};
use aws_sdk_ec2::types::{
    AttributeBooleanValue, Filter, Image, IpPermission, NetworkInterface, Reservation, RouteTable,
    SecurityGroup, Tag, Vpc,
};
use tracing::debug;

/// Endpoint region used when the profile does not name one
const DEFAULT_REGION: &str = "us-east-1";

/// EC2 client for one profile and region
#[derive(Debug, Clone)]
pub struct Ec2 {
    profile: String,
    client: Client,
}

impl Ec2 {
    /// Load the shared config of `profile`, optionally pinned to `region`
    pub async fn connect(profile: &str, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).profile_name(profile);
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }

        let mut config = loader.load().await;
        if config.region().is_none() {
            config = config
                .into_builder()
                .region(Region::new(DEFAULT_REGION))
                .build();
        }

        debug!(
            "EC2 client for profile {} in {}",
            profile,
            config.region().map(|r| r.as_ref()).unwrap_or(DEFAULT_REGION)
        );

        Self {
            profile: profile.to_string(),
            client: Client::new(&config),
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Region names enabled for the account
    pub async fn describe_regions(&self) -> Result<Vec<String>> {
        let output = self.client.describe_regions().send().await?;
        Ok(output
            .regions()
            .iter()
            .filter_map(|r| r.region_name())
            .map(String::from)
            .collect())
    }

    /// Reservations carry the owning account id next to their instances
    pub async fn describe_instances(&self) -> Result<Vec<Reservation>> {
        let pages = self
            .client
            .describe_instances()
            .into_paginator()
            .send()
            .try_collect()
            .await?;
        Ok(pages
            .iter()
            .flat_map(|page| page.reservations())
            .cloned()
            .collect())
    }

    /// Describe several images in one call
    pub async fn describe_images(&self, image_ids: &[&str]) -> Result<Vec<Image>> {
        let output = self
            .client
            .describe_images()
            .set_image_ids(Some(image_ids.iter().map(|id| id.to_string()).collect()))
            .send()
            .await?;
        Ok(output.images().to_vec())
    }

    pub async fn describe_vpcs(&self) -> Result<Vec<Vpc>> {
        let pages = self
            .client
            .describe_vpcs()
            .into_paginator()
            .send()
            .try_collect()
            .await?;
        Ok(pages.iter().flat_map(|page| page.vpcs()).cloned().collect())
    }

    pub async fn describe_network_interfaces(
        &self,
        vpc_ids: &[&str],
    ) -> Result<Vec<NetworkInterface>> {
        let pages = self
            .client
            .describe_network_interfaces()
            .filters(filter("vpc-id", vpc_ids))
            .into_paginator()
            .send()
            .try_collect()
            .await?;
        Ok(pages
            .iter()
            .flat_map(|page| page.network_interfaces())
            .cloned()
            .collect())
    }

    pub async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        self.client
            .terminate_instances()
            .instance_ids(instance_id)
            .send()
            .await?;
        Ok(())
    }

    /// Set a tag on any EC2 resource (instance, VPC, ...)
    pub async fn create_tag(&self, resource_id: &str, key: &str, value: &str) -> Result<()> {
        self.client
            .create_tags()
            .resources(resource_id)
            .tags(Tag::builder().key(key).value(value).build())
            .send()
            .await?;
        Ok(())
    }

    /// Toggle API termination and stop protection
    pub async fn set_instance_protection(&self, instance_id: &str, enabled: bool) -> Result<()> {
        self.client
            .modify_instance_attribute()
            .instance_id(instance_id)
            .disable_api_termination(AttributeBooleanValue::builder().value(enabled).build())
            .send()
            .await?;
        self.client
            .modify_instance_attribute()
            .instance_id(instance_id)
            .disable_api_stop(AttributeBooleanValue::builder().value(enabled).build())
            .send()
            .await?;
        Ok(())
    }

    pub async fn describe_vpc_endpoints(&self, vpc_id: &str) -> Result<Vec<String>> {
        let pages = self
            .client
            .describe_vpc_endpoints()
            .filters(filter("vpc-id", &[vpc_id]))
            .into_paginator()
            .send()
            .try_collect()
            .await?;
        Ok(pages
            .iter()
            .flat_map(|page| page.vpc_endpoints())
            .filter_map(|e| e.vpc_endpoint_id())
            .map(String::from)
            .collect())
    }

    pub async fn delete_vpc_endpoint(&self, endpoint_id: &str) -> Result<()> {
        self.client
            .delete_vpc_endpoints()
            .vpc_endpoint_ids(endpoint_id)
            .send()
            .await?;
        Ok(())
    }

    pub async fn describe_subnets(&self, vpc_id: &str) -> Result<Vec<String>> {
        let pages = self
            .client
            .describe_subnets()
            .filters(filter("vpc-id", &[vpc_id]))
            .into_paginator()
            .send()
            .try_collect()
            .await?;
        Ok(pages
            .iter()
            .flat_map(|page| page.subnets())
            .filter_map(|s| s.subnet_id())
            .map(String::from)
            .collect())
    }

    pub async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        self.client
            .delete_subnet()
            .subnet_id(subnet_id)
            .send()
            .await?;
        Ok(())
    }

    pub async fn describe_security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroup>> {
        let pages = self
            .client
            .describe_security_groups()
            .filters(filter("vpc-id", &[vpc_id]))
            .into_paginator()
            .send()
            .try_collect()
            .await?;
        Ok(pages
            .iter()
            .flat_map(|page| page.security_groups())
            .cloned()
            .collect())
    }

    /// Revoke rules from a security group; `egress` picks the direction
    pub async fn revoke_security_group_rules(
        &self,
        group_id: &str,
        permissions: &[IpPermission],
        egress: bool,
    ) -> Result<()> {
        let permissions = Some(permissions.to_vec());
        if egress {
            self.client
                .revoke_security_group_egress()
                .group_id(group_id)
                .set_ip_permissions(permissions)
                .send()
                .await?;
        } else {
            self.client
                .revoke_security_group_ingress()
                .group_id(group_id)
                .set_ip_permissions(permissions)
                .send()
                .await?;
        }
        Ok(())
    }

    pub async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        self.client
            .delete_security_group()
            .group_id(group_id)
            .send()
            .await?;
        Ok(())
    }

    pub async fn describe_route_tables(&self, vpc_id: &str) -> Result<Vec<RouteTable>> {
        let pages = self
            .client
            .describe_route_tables()
            .filters(filter("vpc-id", &[vpc_id]))
            .into_paginator()
            .send()
            .try_collect()
            .await?;
        Ok(pages
            .iter()
            .flat_map(|page| page.route_tables())
            .cloned()
            .collect())
    }

    pub async fn delete_route_table(&self, route_table_id: &str) -> Result<()> {
        self.client
            .delete_route_table()
            .route_table_id(route_table_id)
            .send()
            .await?;
        Ok(())
    }

    pub async fn describe_internet_gateways(&self, vpc_id: &str) -> Result<Vec<String>> {
        let pages = self
            .client
            .describe_internet_gateways()
            .filters(filter("attachment.vpc-id", &[vpc_id]))
            .into_paginator()
            .send()
            .try_collect()
            .await?;
        Ok(pages
            .iter()
            .flat_map(|page| page.internet_gateways())
            .filter_map(|g| g.internet_gateway_id())
            .map(String::from)
            .collect())
    }

    /// Detach an internet gateway from the VPC and delete it
    pub async fn remove_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        self.client
            .detach_internet_gateway()
            .internet_gateway_id(gateway_id)
            .vpc_id(vpc_id)
            .send()
            .await?;
        self.client
            .delete_internet_gateway()
            .internet_gateway_id(gateway_id)
            .send()
            .await?;
        Ok(())
    }

    pub async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        self.client.delete_vpc().vpc_id(vpc_id).send().await?;
        Ok(())
    }
}

fn filter(name: &str, values: &[&str]) -> Filter {
    Filter::builder()
        .name(name)
        .set_values(Some(values.iter().map(|v| v.to_string()).collect()))
        .build()
}

/// A route table is the VPC's main table when any association says so
pub fn is_main(table: &RouteTable) -> bool {
    table
        .associations()
        .iter()
        .any(|a| a.main().unwrap_or(false))
}

/// RFC 3339 rendering of an SDK timestamp
pub fn rfc3339(time: &DateTime) -> Option<String> {
    time.fmt(DateTimeFormat::DateTime).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::RouteTableAssociation;

    #[test]
    fn test_filter() {
        let filter = filter("vpc-id", &["vpc-1", "vpc-2"]);
        assert_eq!(filter.name(), Some("vpc-id"));
        assert_eq!(filter.values(), ["vpc-1", "vpc-2"]);
    }

    #[test]
    fn test_route_table_main_detection() {
        let main = RouteTable::builder()
            .route_table_id("rtb-main")
            .associations(RouteTableAssociation::builder().main(true).build())
            .build();
        let app = RouteTable::builder()
            .route_table_id("rtb-app")
            .associations(
                RouteTableAssociation::builder()
                    .main(false)
                    .subnet_id("subnet-1")
                    .build(),
            )
            .build();
        let orphan = RouteTable::builder().route_table_id("rtb-orphan").build();

        assert!(is_main(&main));
        assert!(!is_main(&app));
        assert!(!is_main(&orphan));
    }

    #[test]
    fn test_rfc3339() {
        let time = DateTime::from_secs(1_709_288_430);
        assert_eq!(rfc3339(&time).as_deref(), Some("2024-03-01T10:20:30Z"));
    }
}

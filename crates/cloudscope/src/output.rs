//! Inventory tables

use cloudscope_cloud::{Item, ResourceKind};
use colored::Colorize;
use serde_json::Value;
use tracing::info;

pub fn print_items(kind: ResourceKind, items: &[Item]) {
    match kind {
        ResourceKind::Vm => print_vms(items),
        ResourceKind::Vpc => print_vpcs(items),
    }
}

fn print_vms(vms: &[Item]) {
    if vms.is_empty() {
        info!("No VMs found matching the criteria.");
        return;
    }
    info!("Found {} VM(s):", vms.len());

    println!(
        "{}",
        format!(
            "{:>4}  {:<34} {:<6} {:<21} {:<16}",
            "ID", "VM NAME", "CLOUD", "ACCOUNT", "REGION"
        )
        .bold()
    );
    println!("{}", "─".repeat(85).dimmed());

    for (idx, vm) in vms.iter().enumerate() {
        let account = vm.get_str("account_name").unwrap_or_else(|| vm.account());
        println!(
            "{:>4}  {} {:<6} {:<21} {:<16}",
            idx + 1,
            format!("{:<34}", short_name(vm.display_name())).cyan(),
            vm.cloud,
            short_account(account),
            vm.get_str("region").unwrap_or("unknown")
        );
    }
    println!();
}

fn print_vpcs(vpcs: &[Item]) {
    if vpcs.is_empty() {
        info!("No VPCs/VNets found.");
        return;
    }

    println!(
        "{}",
        format!(
            "{:>4}  {:<34} {:<6} {:<21} {:<16} {:<24} {:>5} {:>5}",
            "ID", "NAME", "CLOUD", "ACCOUNT", "REGION", "CIDR/MODE", "ENIS", "VMS"
        )
        .bold()
    );
    println!("{}", "─".repeat(121).dimmed());

    // Default VPCs are hidden but keep their index for -i
    for (idx, vpc) in vpcs.iter().enumerate() {
        if vpc.get("is_default").and_then(Value::as_bool).unwrap_or(false) {
            continue;
        }

        println!(
            "{:>4}  {} {:<6} {:<21} {:<16} {:<24} {:>5} {:>5}",
            idx + 1,
            format!("{:<34}", short_name(vpc.display_name())).cyan(),
            vpc.cloud.to_uppercase(),
            short_account(vpc.account()),
            vpc.location(),
            cidr(vpc),
            count(vpc, "eni_count"),
            count(vpc, "vm_count")
        );
    }
    println!();
}

/// Collapse whitespace; over 32 chars keep the first 22 and last 7
fn short_name(name: &str) -> String {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    abbreviate(&name, 32, 22, 7)
}

/// Over 20 chars keep the first 10 and last 7
fn short_account(account: &str) -> String {
    abbreviate(account, 20, 10, 7)
}

fn abbreviate(s: &str, max: usize, head: usize, tail: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max {
        return s.to_string();
    }
    let head: String = chars[..head].iter().collect();
    let tail: String = chars[chars.len() - tail..].iter().collect();
    format!("{}...{}", head, tail)
}

/// CIDR block (AWS), first two address prefixes (Azure) or subnet mode (GCP)
fn cidr(vpc: &Item) -> String {
    if let Some(block) = vpc.get_str("cidr_block") {
        return block.to_string();
    }

    let prefixes: Vec<&str> = vpc
        .get("address_prefixes")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if !prefixes.is_empty() {
        let mut shown = prefixes[..prefixes.len().min(2)].join(", ");
        if prefixes.len() > 2 {
            shown.push_str("...");
        }
        return shown;
    }

    vpc.get_str("subnet_mode").unwrap_or_default().to_string()
}

fn count(vpc: &Item, key: &str) -> u64 {
    vpc.get(key).and_then(Value::as_u64).unwrap_or(0)
}

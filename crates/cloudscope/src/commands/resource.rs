use super::{ResourceArgs, build_fleet, refresh};
use crate::output;
use anyhow::bail;
use cloudscope_cloud::{
    InventoryStore, Operation, OperationOutcome, ResourceKind, TerminalConfirmation,
    expand_identifier_input, resolve_identifiers,
};
use cloudscope_config::Config;
use colored::Colorize;
use tracing::warn;

pub async fn handle(kind: ResourceKind, args: &ResourceArgs, config: &Config) -> anyhow::Result<()> {
    let operation = requested_operation(kind, args)?;

    if args.refresh {
        return refresh::refresh_kind(kind, config).await;
    }

    let store = InventoryStore::new(config.inventory_dir());
    let mut items = store.load(kind).await?;

    if let Some(ids) = &args.ids {
        let expression = expand_identifier_input(ids)?;
        items = resolve_identifiers(&items, &expression).items;
        if items.is_empty() {
            warn!("No {}s found matching the specified identifiers.", kind.label());
            return Ok(());
        }
    }

    let Some(operation) = operation else {
        output::print_items(kind, &items);
        return Ok(());
    };

    let fleet = build_fleet(config);
    let summary = fleet
        .apply(kind, &operation, &items, !args.yes, &TerminalConfirmation)
        .await;

    if summary.outcome == OperationOutcome::Completed {
        let line = format!(
            "{}: {} succeeded, {} failed, {} skipped",
            operation.description(kind),
            summary.succeeded,
            summary.failed(),
            summary.skipped
        );
        if summary.failed() == 0 && summary.skipped == 0 {
            println!("{}", line.green());
        } else {
            println!("{}", line.yellow());
        }
    }

    Ok(())
}

/// Validate the action flags and turn them into an operation.
///
/// Delete wins over tagging, which wins over protection.
fn requested_operation(kind: ResourceKind, args: &ResourceArgs) -> anyhow::Result<Option<Operation>> {
    if args.tag.is_some() != args.value.is_some() {
        bail!("--tag and --value must be used together.");
    }
    if args.protected.is_some() && kind != ResourceKind::Vm {
        bail!("--protected is only supported for VMs.");
    }

    if args.delete {
        if args.ids.is_none() {
            bail!(
                "Delete action requires at least one filter (-i). \
                 This prevents accidental deletion of all {}s.",
                kind.label()
            );
        }
        return Ok(Some(Operation::Delete));
    }

    if let (Some(key), Some(value)) = (&args.tag, &args.value) {
        return Ok(Some(Operation::AddTag {
            key: key.clone(),
            value: value.clone(),
        }));
    }

    Ok(args.protected.map(Operation::SetProtection))
}

//! Imports each flagged item into the state store, one at a time.

use crate::azure::resource_id::ResourceKey;
use crate::pipeline::error::ItemError;
use crate::pipeline::list::{ImportItem, ImportList};
use crate::shared::logging;
use crate::terraform::noise::strip_tool_noise;
use crate::terraform::schema::{terraform_type_for_arm, RESOURCE_GROUP_TYPE};
use crate::terraform::workspace::Workspace;

/// Fill in the resource type of an auto-named address from the resource id.
pub fn resolve_address(item: &mut ImportItem) -> Result<(), ItemError> {
    if item.address.resource_type.is_empty() {
        let resource_type = if item.is_root() {
            RESOURCE_GROUP_TYPE
        } else {
            ResourceKey::parse_id(&item.resource_id)
                .ok()
                .and_then(|key| terraform_type_for_arm(&key.resource_type))
                .ok_or_else(|| ItemError::UnknownResourceType {
                    resource_id: item.resource_id.clone(),
                })?
        };
        item.address.resource_type = resource_type.to_string();
    }

    item.address
        .validate()
        .map_err(|reason| ItemError::MalformedAddress {
            address: item.address.to_string(),
            reason,
        })
}

/// Import one item, recording the outcome on it. Failure stays local to
/// the item.
pub fn import_item(ws: &mut Workspace, item: &mut ImportItem) {
    if item.skip() {
        logging::warn(&format!("Not importing skipped resource {}", item.resource_id));
        return;
    }
    match try_import(ws, item) {
        Ok(()) => item.record_success(),
        Err(err) => {
            logging::error(&format!("{}", err));
            item.record_failure(err);
        }
    }
}

fn try_import(ws: &mut Workspace, item: &mut ImportItem) -> Result<(), ItemError> {
    resolve_address(item)?;
    let address = item.address.to_string();

    // terraform needs a block for the address before it can bind state to it.
    let scaffold = ws
        .tool()
        .add(&address, false)
        .map_err(|e| ItemError::Scaffold {
            address: address.clone(),
            message: e.to_string(),
        })?;
    let scaffold = strip_tool_noise(&scaffold);

    let _guard = ws
        .write_scaffold(&scaffold)
        .map_err(|e| ItemError::ScaffoldWrite {
            address: address.clone(),
            message: e.to_string(),
        })?;

    ws.tool()
        .import(&address, &item.resource_id)
        .map_err(|e| ItemError::StateImport {
            address,
            resource_id: item.resource_id.clone(),
            message: e.to_string(),
        })
}

/// Import every flagged item in list order.
pub fn import_all(ws: &mut Workspace, list: &mut ImportList) {
    let total = list.to_import().count();
    for (i, item) in list.to_import_mut().enumerate() {
        logging::info(&format!(
            "({}/{}) Importing {} as {}",
            i + 1,
            total,
            item.resource_id,
            item.address
        ));
        import_item(ws, item);
    }
}

/// Retract an address from the state store, e.g. before retrying it.
pub fn remove_from_state(ws: &mut Workspace, address: &str) -> anyhow::Result<()> {
    ws.tool()
        .state_rm(address)
        .map_err(|e| anyhow::anyhow!("removing {} from state: {}", address, e))?;
    logging::info(&format!("Removed {} from state", address));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::address::TfAddr;
    use crate::pipeline::list::ItemRole;

    #[test]
    fn test_resolve_address_from_arm_type() {
        let mut item = ImportItem::new(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/a",
            TfAddr::named("res-1"),
            ItemRole::Resource,
        );
        resolve_address(&mut item).unwrap();
        assert_eq!(item.address.to_string(), "azurerm_subnet.res-1");
    }

    #[test]
    fn test_resolve_address_root() {
        let mut item = ImportItem::new(
            "/subscriptions/s/resourceGroups/rg",
            TfAddr::named("res-0"),
            ItemRole::ResourceGroup,
        );
        resolve_address(&mut item).unwrap();
        assert_eq!(item.address.resource_type, RESOURCE_GROUP_TYPE);
    }

    #[test]
    fn test_resolve_address_errors() {
        let mut unknown = ImportItem::new(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Foo/bars/x",
            TfAddr::named("res-1"),
            ItemRole::Resource,
        );
        assert!(matches!(
            resolve_address(&mut unknown),
            Err(ItemError::UnknownResourceType { .. })
        ));

        let mut bad_name =
            ImportItem::new("/x", TfAddr::new("x_y", "has space"), ItemRole::Resource);
        assert!(matches!(
            resolve_address(&mut bad_name),
            Err(ItemError::MalformedAddress { .. })
        ));
    }
}

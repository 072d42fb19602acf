//! Turns imported state back into configuration blocks.

use crate::pipeline::error::PipelineError;
use crate::pipeline::list::{ImportItem, ImportList};
use crate::terraform::hcl::{Block, ConfigFile, HclError};
use crate::terraform::noise::strip_tool_noise;
use crate::terraform::schema::tune_resource_body;
use crate::terraform::workspace::Workspace;

/// An imported item together with its generated configuration.
#[derive(Debug, Clone)]
pub struct ConfigInfo {
    pub item: ImportItem,
    file: ConfigFile,
}

impl ConfigInfo {
    /// `file` must contain at least one block.
    pub fn new(item: ImportItem, file: ConfigFile) -> Result<Self, PipelineError> {
        if file.first_block().is_none() {
            return Err(PipelineError::ConfigParse {
                address: item.address.to_string(),
                source: HclError::Unexpected {
                    line: 1,
                    text: "no configuration block generated".to_string(),
                },
            });
        }
        Ok(Self { item, file })
    }

    pub fn block(&self) -> &Block {
        self.file
            .first_block()
            .unwrap_or_else(|| unreachable!("checked in ConfigInfo::new"))
    }

    pub fn block_mut(&mut self) -> &mut Block {
        self.file
            .first_block_mut()
            .unwrap_or_else(|| unreachable!("checked in ConfigInfo::new"))
    }

    /// The configuration address as rendered in the block header.
    pub fn address(&self) -> String {
        self.item.address.to_string()
    }

    pub fn render(&self) -> String {
        self.file.render()
    }
}

/// Parse tool output for one item and tune it to the resource schema.
pub fn build_config(item: &ImportItem, generated: &str) -> Result<ConfigInfo, PipelineError> {
    let address = item.address.to_string();
    let cleaned = strip_tool_noise(generated);
    let file = ConfigFile::parse(&cleaned).map_err(|source| PipelineError::ConfigParse {
        address: address.clone(),
        source,
    })?;

    let mut info = ConfigInfo::new(item.clone(), file)?;
    let block = info.block_mut();
    // The generated header is authoritative for the type.
    if let Some(resource_type) = block.resource_type().map(str::to_string) {
        tune_resource_body(&mut block.body, &resource_type);
        info.item.address.resource_type = resource_type;
    }
    Ok(info)
}

/// One `ConfigInfo` per successfully imported item, in list order. Any
/// failure here aborts the batch.
pub fn state_to_config(
    ws: &mut Workspace,
    list: &ImportList,
) -> Result<Vec<ConfigInfo>, PipelineError> {
    let mut out = Vec::new();
    for item in list.imported() {
        let address = item.address.to_string();
        let generated = ws
            .tool()
            .add(&address, true)
            .map_err(|e| PipelineError::StateToConfig {
                address: address.clone(),
                message: e.to_string(),
            })?;
        out.push(build_config(item, &generated)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::address::TfAddr;
    use crate::pipeline::list::ItemRole;

    fn item() -> ImportItem {
        let mut item = ImportItem::new(
            "/subscriptions/s/resourceGroups/rg",
            TfAddr::new("azurerm_resource_group", "res-0"),
            ItemRole::ResourceGroup,
        );
        item.record_success();
        item
    }

    #[test]
    fn test_build_config_strips_and_tunes() {
        let generated = "# __generated__ by Terraform from state\nresource \"azurerm_resource_group\" \"res-0\" {\n  id       = \"/subscriptions/s/resourceGroups/rg\"\n  location = \"westeurope\"\n  name     = \"rg\"\n  tags     = {}\n}\n\nReleasing state lock. This may take a few moments...\n";
        let info = build_config(&item(), generated).unwrap();
        assert_eq!(
            info.render(),
            "resource \"azurerm_resource_group\" \"res-0\" {\n  location = \"westeurope\"\n  name     = \"rg\"\n}\n"
        );
    }

    #[test]
    fn test_build_config_parse_failure_names_address() {
        let err = build_config(&item(), "Error: Invalid address").unwrap_err();
        assert!(matches!(err, PipelineError::ConfigParse { .. }));
        assert!(err.to_string().contains("azurerm_resource_group.res-0"));
    }

    #[test]
    fn test_build_config_requires_a_block() {
        let err = build_config(&item(), "\n\n").unwrap_err();
        assert!(matches!(err, PipelineError::ConfigParse { .. }));
    }
}

//! The import list: one item per discovered resource, in discovery order.

use crate::azure::template::Inventory;
use crate::config::split_name_pattern;
use crate::pipeline::address::{ResourceMapping, TfAddr};
use crate::pipeline::error::ItemError;
use crate::shared::logging;
use crate::terraform::schema::RESOURCE_GROUP_TYPE;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRole {
    Resource,
    /// The resource group itself: the dependency root.
    ResourceGroup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportItem {
    pub resource_id: String,
    pub address: TfAddr,
    pub role: ItemRole,
    pub imported: bool,
    pub import_error: Option<ItemError>,
}

impl ImportItem {
    pub fn new(resource_id: impl Into<String>, address: TfAddr, role: ItemRole) -> Self {
        Self {
            resource_id: resource_id.into(),
            address,
            role,
            imported: false,
            import_error: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.role == ItemRole::ResourceGroup
    }

    pub fn skip(&self) -> bool {
        self.address.is_skip()
    }

    pub fn record_success(&mut self) {
        self.imported = true;
        self.import_error = None;
    }

    pub fn record_failure(&mut self, err: ItemError) {
        self.imported = false;
        self.import_error = Some(err);
    }
}

/// Auto-naming pattern: `prefix + index + suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    pub prefix: String,
    pub suffix: String,
}

impl NamePattern {
    /// Split at the last `*`; a pattern without one is all prefix.
    pub fn parse(pattern: &str) -> Self {
        let (prefix, suffix) = split_name_pattern(pattern);
        Self { prefix, suffix }
    }

    pub fn name(&self, index: usize) -> String {
        format!("{}{}{}", self.prefix, index, self.suffix)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportList {
    items: Vec<ImportItem>,
}

impl ImportList {
    /// Build one item per inventory id, in inventory order.
    ///
    /// Without a mapping every item is auto-named and its type is left to be
    /// resolved at import time. With a mapping, ids found in it take their
    /// address verbatim and everything else is skipped. The resource group
    /// is never skipped.
    pub fn build(inventory: &Inventory, mapping: &ResourceMapping, naming: &NamePattern) -> Self {
        let items = inventory
            .ids()
            .enumerate()
            .map(|(i, id)| {
                let role = if id == inventory.root {
                    ItemRole::ResourceGroup
                } else {
                    ItemRole::Resource
                };

                let address = if mapping.is_empty() {
                    TfAddr::named(naming.name(i))
                } else {
                    match (mapping.get(id), role) {
                        (Some(addr), ItemRole::ResourceGroup) if addr.is_skip() => {
                            logging::warn(&format!(
                                "The resource group {} can't be skipped, it is the dependency root",
                                id
                            ));
                            TfAddr::new(RESOURCE_GROUP_TYPE, naming.name(i))
                        }
                        (Some(addr), _) => addr.clone(),
                        (None, ItemRole::ResourceGroup) => {
                            TfAddr::new(RESOURCE_GROUP_TYPE, naming.name(i))
                        }
                        (None, ItemRole::Resource) => TfAddr::skip(),
                    }
                };
                ImportItem::new(id, address, role)
            })
            .collect();
        Self { items }
    }

    pub fn from_items(items: Vec<ImportItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[ImportItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items flagged for import.
    pub fn to_import(&self) -> impl Iterator<Item = &ImportItem> {
        self.items.iter().filter(|item| !item.skip())
    }

    pub fn to_import_mut(&mut self) -> impl Iterator<Item = &mut ImportItem> {
        self.items.iter_mut().filter(|item| !item.skip())
    }

    /// Items successfully imported.
    pub fn imported(&self) -> impl Iterator<Item = &ImportItem> {
        self.items.iter().filter(|item| item.imported)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ImportItem> {
        self.items.iter().filter(|item| item.import_error.is_some())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ImportItem> {
        self.items.iter().filter(|item| item.skip())
    }

    /// The mapping that would reproduce this list's addresses on a later run.
    pub fn to_mapping(&self) -> ResourceMapping {
        let mut mapping = ResourceMapping::new();
        for item in self.to_import() {
            mapping.insert(item.resource_id.clone(), item.address.clone());
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory() -> Inventory {
        Inventory::new(
            vec!["/sub/rg/a".to_string(), "/sub/rg/b".to_string()],
            "/sub/rg".to_string(),
        )
    }

    #[test]
    fn test_auto_naming() {
        let list = ImportList::build(
            &inventory(),
            &ResourceMapping::new(),
            &NamePattern::parse("res-*-x"),
        );
        let names: Vec<&str> = list.items().iter().map(|i| i.address.name.as_str()).collect();
        assert_eq!(names, ["res-0-x", "res-1-x", "res-2-x"]);
        assert!(list.items().iter().all(|i| i.address.resource_type.is_empty()));
        assert!(list.items()[2].is_root());
        assert_eq!(list.to_import().count(), 3);
    }

    #[test]
    fn test_mapping_is_closed_world() {
        let mut mapping = ResourceMapping::new();
        mapping.insert("/sub/rg/a", TfAddr::new("x_y", "r0"));
        let list = ImportList::build(&inventory(), &mapping, &NamePattern::parse("res-"));

        assert_eq!(list.len(), 3);
        assert_eq!(list.items()[0].address, TfAddr::new("x_y", "r0"));
        assert!(list.items()[1].skip());
        let root = &list.items()[2];
        assert!(root.is_root());
        assert_eq!(root.address, TfAddr::new(RESOURCE_GROUP_TYPE, "res-2"));
        assert_eq!(list.skipped().count(), 1);
    }

    #[test]
    fn test_root_cannot_be_skipped() {
        let mut mapping = ResourceMapping::new();
        mapping.insert("/sub/rg", TfAddr::skip());
        let list = ImportList::build(&inventory(), &mapping, &NamePattern::parse("res-"));
        assert!(!list.items()[2].skip());
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut mapping = ResourceMapping::new();
        mapping.insert("/sub/rg/b", TfAddr::new("x_y", "rb"));
        let naming = NamePattern::parse("res-");
        assert_eq!(
            ImportList::build(&inventory(), &mapping, &naming),
            ImportList::build(&inventory(), &mapping, &naming)
        );
    }

    #[test]
    fn test_outcome_views() {
        let mut list = ImportList::build(
            &inventory(),
            &ResourceMapping::new(),
            &NamePattern::parse("res-"),
        );
        let mut items = list.to_import_mut();
        items.next().unwrap().record_success();
        items.next().unwrap().record_failure(ItemError::UnknownResourceType {
            resource_id: "/sub/rg/b".to_string(),
        });
        drop(items);

        assert_eq!(list.imported().count(), 1);
        assert_eq!(list.failed().count(), 1);
        assert_eq!(list.to_mapping().len(), 3);
    }
}

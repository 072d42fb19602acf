//! Terraform addresses and the resumable resource-id to address mapping.

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Reserved type marking a discovered resource that must not be imported.
pub const SKIP_TYPE: &str = "skip";

pub const RESOURCE_MAPPING_FILE_NAME: &str = "aztfimportResourceMapping.json";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("Invalid identifier regex"));

/// A `type.name` configuration address. The type may still be empty when
/// the address was auto-named; it is resolved before import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TfAddr {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
}

impl TfAddr {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new("", name)
    }

    pub fn skip() -> Self {
        Self::new(SKIP_TYPE, "")
    }

    pub fn is_skip(&self) -> bool {
        self.resource_type == SKIP_TYPE
    }

    /// Both parts must be valid identifiers.
    pub fn validate(&self) -> Result<(), String> {
        if self.is_skip() {
            return Err("address is marked as skipped".to_string());
        }
        if !IDENTIFIER.is_match(&self.resource_type) {
            return Err(format!("invalid resource type {:?}", self.resource_type));
        }
        if !IDENTIFIER.is_match(&self.name) {
            return Err(format!("invalid resource name {:?}", self.name));
        }
        Ok(())
    }
}

impl fmt::Display for TfAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Resource id to address. Lookups ignore case, as azure ids do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceMapping(BTreeMap<String, TfAddr>);

impl ResourceMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource_id: impl Into<String>, addr: TfAddr) {
        self.0.insert(resource_id.into(), addr);
    }

    pub fn get(&self, resource_id: &str) -> Option<&TfAddr> {
        self.0.get(resource_id).or_else(|| {
            self.0
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(resource_id))
                .map(|(_, v)| v)
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TfAddr)> {
        self.0.iter()
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading mapping file {}", path.display()))?;
        serde_json::from_str(&raw).context("unmarshalling the mapping file")
    }

    /// Tab-indented JSON, keys sorted.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_validate() {
        let addr = TfAddr::new("azurerm_subnet", "res-3");
        assert_eq!(addr.to_string(), "azurerm_subnet.res-3");
        assert!(addr.validate().is_ok());
        assert!(TfAddr::named("res-0").validate().is_err());
        assert!(TfAddr::new("azurerm_subnet", "1bad").validate().is_err());
        assert!(TfAddr::skip().validate().is_err());
        assert!(TfAddr::skip().is_skip());
    }

    #[test]
    fn test_mapping_json_shape() {
        let raw = r#"{"/sub/rg/a": {"type": "x_y", "name": "r0"}, "/sub/rg/b": {"type": "skip", "name": ""}}"#;
        let mapping: ResourceMapping = serde_json::from_str(raw).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("/sub/rg/a"), Some(&TfAddr::new("x_y", "r0")));
        assert_eq!(mapping.get("/SUB/RG/A"), Some(&TfAddr::new("x_y", "r0")));
        assert!(mapping.get("/sub/rg/b").unwrap().is_skip());

        let out = String::from_utf8(mapping.to_json().unwrap()).unwrap();
        assert!(out.contains("\n\t\"/sub/rg/a\": {\n\t\t\"type\": \"x_y\""));
        let back: ResourceMapping = serde_json::from_str(&out).unwrap();
        assert_eq!(back, mapping);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(ResourceMapping::load(&path).is_err());
    }
}

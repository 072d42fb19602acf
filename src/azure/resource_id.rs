//! Identity of a resource inside an exported resource group.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("resource type {resource_type:?} has {types} nested types but name {name:?} has {names} segments")]
    SegmentMismatch {
        resource_type: String,
        name: String,
        types: usize,
        names: usize,
    },

    #[error("malformed resource type {0:?}")]
    MalformedType(String),

    #[error("malformed azure resource id {0:?}")]
    MalformedId(String),
}

/// A resource as the export document names it: its ARM type plus its
/// (possibly nested, slash separated) name. The resource group itself is
/// the key with an empty type and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// The dependency root of every resource in the group.
    pub fn resource_group() -> Self {
        Self::new("", "")
    }

    pub fn is_resource_group(&self) -> bool {
        self.resource_type.is_empty() && self.name.is_empty()
    }

    /// Case-insensitive form used for lookups; ARM treats both parts that way.
    pub fn normalized(&self) -> Self {
        Self::new(
            self.resource_type.to_lowercase(),
            self.name.to_lowercase(),
        )
    }

    /// Check that the type and name have compatible segment counts.
    pub fn validate(&self) -> Result<(), ResourceIdError> {
        if self.is_resource_group() {
            return Ok(());
        }
        let types: Vec<&str> = self.resource_type.split('/').collect();
        if types.len() < 2 || types.iter().any(|s| s.is_empty()) {
            return Err(ResourceIdError::MalformedType(self.resource_type.clone()));
        }
        let names: Vec<&str> = self.name.split('/').collect();
        if types.len() - 1 != names.len() {
            return Err(ResourceIdError::SegmentMismatch {
                resource_type: self.resource_type.clone(),
                name: self.name.clone(),
                types: types.len() - 1,
                names: names.len(),
            });
        }
        Ok(())
    }

    /// Render the absolute azure resource id within the given subscription
    /// and resource group.
    pub fn to_id(
        &self,
        subscription_id: &str,
        resource_group: &str,
    ) -> Result<String, ResourceIdError> {
        let mut out = format!(
            "/subscriptions/{}/resourceGroups/{}",
            subscription_id, resource_group
        );
        if self.is_resource_group() {
            return Ok(out);
        }
        self.validate()?;

        let types: Vec<&str> = self.resource_type.split('/').collect();
        let names: Vec<&str> = self.name.split('/').collect();
        out.push_str(&format!("/providers/{}", types[0]));
        for (t, n) in types[1..].iter().zip(names.iter()) {
            out.push('/');
            out.push_str(t);
            out.push('/');
            out.push_str(n);
        }
        Ok(out)
    }

    /// Parse an absolute azure resource id back into a key. Only ids scoped
    /// to a resource group are accepted.
    pub fn parse_id(id: &str) -> Result<Self, ResourceIdError> {
        let malformed = || ResourceIdError::MalformedId(id.to_string());
        let segs: Vec<&str> = id.trim_matches('/').split('/').collect();
        if segs.len() < 4
            || !segs[0].eq_ignore_ascii_case("subscriptions")
            || !segs[2].eq_ignore_ascii_case("resourceGroups")
            || segs.iter().any(|s| s.is_empty())
        {
            return Err(malformed());
        }
        if segs.len() == 4 {
            return Ok(Self::resource_group());
        }
        if !segs[4].eq_ignore_ascii_case("providers") || segs.len() < 8 || segs.len() % 2 != 0 {
            return Err(malformed());
        }

        let mut types = vec![segs[5]];
        let mut names = Vec::new();
        for pair in segs[6..].chunks(2) {
            types.push(pair[0]);
            names.push(pair[1]);
        }
        Ok(Self::new(types.join("/"), names.join("/")))
    }

    /// Parse a `type/name` shorthand such as
    /// `Microsoft.Network/virtualNetworks/vnet1/subnets/sub1`.
    pub fn parse_type_name(value: &str) -> Option<Self> {
        let segs: Vec<&str> = value.trim_matches('/').split('/').collect();
        if segs.len() < 3 || segs.len() % 2 == 0 || segs.iter().any(|s| s.is_empty()) {
            return None;
        }
        let mut types = vec![segs[0]];
        let mut names = Vec::new();
        for pair in segs[1..].chunks(2) {
            types.push(pair[0]);
            names.push(pair[1]);
        }
        Some(Self::new(types.join("/"), names.join("/")))
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_resource_group() {
            write!(f, "<resource group>")
        } else {
            write!(f, "{} {}", self.resource_type, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_id_nested() {
        let key = ResourceKey::new("Microsoft.Network/virtualNetworks/subnets", "vnet1/sub1");
        assert_eq!(
            key.to_id("sub", "rg").unwrap(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/sub1"
        );
    }

    #[test]
    fn test_to_id_resource_group() {
        assert_eq!(
            ResourceKey::resource_group().to_id("sub", "rg").unwrap(),
            "/subscriptions/sub/resourceGroups/rg"
        );
    }

    #[test]
    fn test_to_id_segment_mismatch() {
        let key = ResourceKey::new("Microsoft.Network/virtualNetworks/subnets", "vnet1");
        assert!(matches!(
            key.to_id("sub", "rg"),
            Err(ResourceIdError::SegmentMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_id_round_trip_shape() {
        let id = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct";
        let key = ResourceKey::parse_id(id).unwrap();
        assert_eq!(key.resource_type, "Microsoft.Storage/storageAccounts");
        assert_eq!(key.name, "acct");
        assert!(ResourceKey::parse_id("/subscriptions/sub/resourceGroups/rg")
            .unwrap()
            .is_resource_group());
        assert!(ResourceKey::parse_id("/subscriptions/sub").is_err());
        assert!(ResourceKey::parse_id("/subscriptions/sub/resourceGroups/rg/providers/X").is_err());
    }

    #[test]
    fn test_parse_type_name() {
        let key = ResourceKey::parse_type_name("Microsoft.Network/virtualNetworks/vnet1").unwrap();
        assert_eq!(key, ResourceKey::new("Microsoft.Network/virtualNetworks", "vnet1"));
        assert!(ResourceKey::parse_type_name("vnet1").is_none());
        assert!(ResourceKey::parse_type_name("Microsoft.Network/virtualNetworks").is_none());
    }
}

//! Model of the resource group export document.

use crate::azure::resource_id::{ResourceIdError, ResourceKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("invalid resource {key}: {source}")]
    InvalidResource {
        key: ResourceKey,
        #[source]
        source: ResourceIdError,
    },

    #[error("resource {resource} depends on {expression:?}, which matches no resource in the export")]
    UnresolvedDependency { resource: String, expression: String },

    #[error("resource {resource} depends on {expression:?}, which matches more than one resource")]
    AmbiguousDependency { resource: String, expression: String },
}

/// The exported template. Only the parts relevant to discovery and
/// dependency ordering are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArmTemplate {
    #[serde(default)]
    pub resources: Vec<TemplateResource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default, rename = "dependsOn")]
    pub depends_on: Vec<String>,
    /// Child resources declared inline. Their type and name may be given
    /// relative to the parent.
    #[serde(default)]
    pub resources: Vec<TemplateResource>,
}

/// A resource definition with its absolute key, as collected by the first
/// pass over the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub key: ResourceKey,
    pub parent: Option<ResourceKey>,
    pub depends_on: Vec<String>,
}

/// Every discovered resource id, in document order, plus the resource group
/// root which is kept apart instead of being the implicit last element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    pub resources: Vec<String>,
    pub root: String,
}

impl Inventory {
    pub fn new(resources: Vec<String>, root: String) -> Self {
        Self { resources, root }
    }

    /// All ids with the root last, which is the order items are listed in.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.resources
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.root.as_str()))
    }

    pub fn len(&self) -> usize {
        self.resources.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl ArmTemplate {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Flatten the (possibly nested) resource list into absolute definitions,
    /// parents before their children.
    pub fn definitions(&self) -> Vec<Definition> {
        let mut out = Vec::new();
        for res in &self.resources {
            collect_definitions(res, None, &mut out);
        }
        out
    }

    pub fn inventory(
        &self,
        subscription_id: &str,
        resource_group: &str,
    ) -> Result<Inventory, TemplateError> {
        let mut resources = Vec::new();
        for def in self.definitions() {
            let id = def
                .key
                .to_id(subscription_id, resource_group)
                .map_err(|source| TemplateError::InvalidResource {
                    key: def.key.clone(),
                    source,
                })?;
            resources.push(id);
        }
        let root = ResourceKey::resource_group()
            .to_id(subscription_id, resource_group)
            .map_err(|source| TemplateError::InvalidResource {
                key: ResourceKey::resource_group(),
                source,
            })?;
        Ok(Inventory::new(resources, root))
    }
}

fn collect_definitions(
    res: &TemplateResource,
    parent: Option<&ResourceKey>,
    out: &mut Vec<Definition>,
) {
    let key = match parent {
        Some(p) if !is_fully_qualified_type(&res.resource_type) => ResourceKey::new(
            format!("{}/{}", p.resource_type, res.resource_type),
            format!("{}/{}", p.name, res.name),
        ),
        _ => ResourceKey::new(res.resource_type.clone(), res.name.clone()),
    };
    out.push(Definition {
        key: key.clone(),
        parent: parent.cloned(),
        depends_on: res.depends_on.clone(),
    });
    for child in &res.resources {
        collect_definitions(child, Some(&key), out);
    }
}

// A fully qualified type starts with a provider namespace, e.g. `Microsoft.Network/...`.
fn is_fully_qualified_type(resource_type: &str) -> bool {
    resource_type
        .split('/')
        .next()
        .is_some_and(|ns| ns.contains('.'))
        && resource_type.contains('/')
}

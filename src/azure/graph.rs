//! Dependency graph derived from the export document.
//!
//! Extraction runs in two passes: the first collects every definition and
//! its absolute key into an index, the second resolves each `dependsOn`
//! expression against that index. A reference that resolves to nothing is
//! an error for the whole document.

use crate::azure::resource_id::ResourceKey;
use crate::azure::template::{ArmTemplate, Definition, TemplateError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static RESOURCE_ID_EXPR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\[\s*resourceId\s*\((.*)\)\s*\]$").expect("Invalid resourceId regex")
});

static QUOTED_ARG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^'((?:[^']|'')*)'$").expect("Invalid quoted argument regex"));

/// Resource id to the ordered ids it depends on. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    root: String,
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build a graph directly from edges. The root is always present as a
    /// key with no dependencies.
    pub fn from_edges(root: impl Into<String>, edges: HashMap<String, Vec<String>>) -> Self {
        let root = root.into();
        let mut edges = edges;
        edges.entry(root.clone()).or_default();
        Self { root, edges }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn dependencies(&self, id: &str) -> Option<&[String]> {
        self.edges.get(id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.edges.iter()
    }

    /// Extract the graph from an export document.
    pub fn extract(
        template: &ArmTemplate,
        subscription_id: &str,
        resource_group: &str,
    ) -> Result<Self, TemplateError> {
        let defs = template.definitions();
        let index = DefinitionIndex::build(&defs);

        let to_id = |key: &ResourceKey| {
            key.to_id(subscription_id, resource_group)
                .map_err(|source| TemplateError::InvalidResource {
                    key: key.clone(),
                    source,
                })
        };
        let root = to_id(&ResourceKey::resource_group())?;

        let mut edges = HashMap::new();
        for def in &defs {
            let id = to_id(&def.key)?;
            let mut deps: Vec<String> = Vec::new();
            let mut push = |dep: String| {
                if dep != id && !deps.contains(&dep) {
                    deps.push(dep);
                }
            };

            if let Some(parent) = &def.parent {
                push(to_id(parent)?);
            }
            for expr in &def.depends_on {
                let key = index.resolve(expr).map_err(|kind| match kind {
                    Resolution::Missing => TemplateError::UnresolvedDependency {
                        resource: id.clone(),
                        expression: expr.clone(),
                    },
                    Resolution::Ambiguous => TemplateError::AmbiguousDependency {
                        resource: id.clone(),
                        expression: expr.clone(),
                    },
                })?;
                push(to_id(&key)?);
            }
            // Every resource hangs off the resource group, listed or not.
            push(root.clone());

            edges.insert(id, deps);
        }

        Ok(Self::from_edges(root, edges))
    }
}

enum Resolution {
    Missing,
    Ambiguous,
}

/// Lookup table from (type, name) and bare name to the definition key.
struct DefinitionIndex {
    by_key: HashMap<ResourceKey, ResourceKey>,
    by_name: HashMap<String, Vec<ResourceKey>>,
}

impl DefinitionIndex {
    fn build(defs: &[Definition]) -> Self {
        let mut by_key = HashMap::new();
        let mut by_name: HashMap<String, Vec<ResourceKey>> = HashMap::new();
        for def in defs {
            by_key.insert(def.key.normalized(), def.key.clone());
            by_name
                .entry(def.key.name.to_lowercase())
                .or_default()
                .push(def.key.clone());
        }
        Self { by_key, by_name }
    }

    fn resolve(&self, expr: &str) -> Result<ResourceKey, Resolution> {
        let expr = expr.trim();

        let candidate = if let Some(caps) = RESOURCE_ID_EXPR.captures(expr) {
            parse_resource_id_args(&caps[1]).ok_or(Resolution::Missing)?
        } else if expr.to_lowercase().starts_with("/subscriptions/") {
            ResourceKey::parse_id(expr).map_err(|_| Resolution::Missing)?
        } else if let Some(key) = ResourceKey::parse_type_name(expr) {
            key
        } else {
            return match self.by_name.get(&expr.to_lowercase()).map(Vec::as_slice) {
                Some([only]) => Ok(only.clone()),
                Some([_, _, ..]) => Err(Resolution::Ambiguous),
                _ => Err(Resolution::Missing),
            };
        };

        if candidate.is_resource_group() {
            return Ok(candidate);
        }
        self.by_key
            .get(&candidate.normalized())
            .cloned()
            .ok_or(Resolution::Missing)
    }
}

/// Parse the arguments of `resourceId(...)`. Optional leading subscription
/// and resource group arguments are skipped: the type is the first argument
/// carrying a provider namespace, the remaining ones are name segments.
fn parse_resource_id_args(args: &str) -> Option<ResourceKey> {
    let mut literals = Vec::new();
    for arg in split_args(args) {
        let caps = QUOTED_ARG.captures(arg.trim())?;
        literals.push(caps[1].replace("''", "'"));
    }

    let type_pos = literals
        .iter()
        .position(|a| a.contains('/') && a.split('/').next().is_some_and(|ns| ns.contains('.')))?;
    let names = &literals[type_pos + 1..];
    if names.is_empty() {
        return None;
    }
    Some(ResourceKey::new(literals[type_pos].clone(), names.join("/")))
}

// Split on commas that are not inside a quoted literal.
fn split_args(args: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            ',' if !in_quote => {
                out.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&args[start..]);
    out
}

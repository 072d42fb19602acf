//! Writes explicit `depends_on` declarations into generated blocks.

use crate::azure::graph::DependencyGraph;
use crate::config::RootDependency;
use crate::pipeline::error::PipelineError;
use crate::pipeline::synthesizer::ConfigInfo;
use crate::terraform::hcl::Expression;
use std::collections::HashMap;

pub const DEPENDS_ON: &str = "depends_on";

/// Add a `depends_on` to every block except the resource group's. Edges
/// to resources in the batch become references; edges to resources that
/// were not imported become a comment so the gap stays visible.
pub fn inject_dependencies(
    configs: &mut [ConfigInfo],
    graph: &DependencyGraph,
    root_dependency: RootDependency,
) -> Result<(), PipelineError> {
    let addresses: HashMap<String, String> = configs
        .iter()
        .map(|cfg| (cfg.item.resource_id.to_lowercase(), cfg.address()))
        .collect();

    for cfg in configs.iter_mut() {
        if cfg.item.is_root() {
            continue;
        }
        let deps = graph.dependencies(&cfg.item.resource_id).ok_or_else(|| {
            PipelineError::MissingFromGraph {
                resource_id: cfg.item.resource_id.clone(),
                address: cfg.address(),
            }
        })?;

        let mut entries = Vec::new();
        for dep in deps {
            if root_dependency == RootDependency::Implicit && dep == graph.root() {
                continue;
            }
            match addresses.get(&dep.to_lowercase()) {
                Some(addr) => entries.push(format!("{},", addr)),
                None => entries.push(format!(
                    "# Depending on {:?}, which is not imported by Terraform.",
                    dep
                )),
            }
        }

        if !entries.is_empty() {
            tracing::debug!(address = %cfg.address(), count = entries.len(), "adding depends_on");
            cfg.block_mut()
                .body
                .set_attribute(DEPENDS_ON, depends_on_expression(&entries));
        }
    }
    Ok(())
}

fn depends_on_expression(entries: &[String]) -> Expression {
    let mut lines = Vec::with_capacity(entries.len() + 2);
    lines.push("[".to_string());
    lines.extend(entries.iter().map(|e| format!("  {}", e)));
    lines.push("]".to_string());
    Expression::from_lines(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::address::TfAddr;
    use crate::pipeline::list::{ImportItem, ItemRole};
    use crate::terraform::hcl::ConfigFile;

    const ROOT: &str = "/subscriptions/s/resourceGroups/rg";
    const A: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Test/as/a";
    const B: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Test/bs/b";

    fn config(id: &str, addr: TfAddr, role: ItemRole) -> ConfigInfo {
        let src = format!(
            "resource \"{}\" \"{}\" {{\n  name = \"x\"\n}}\n",
            addr.resource_type, addr.name
        );
        let mut item = ImportItem::new(id, addr, role);
        item.record_success();
        ConfigInfo::new(item, ConfigFile::parse(&src).unwrap()).unwrap()
    }

    fn graph() -> DependencyGraph {
        DependencyGraph::from_edges(
            ROOT,
            HashMap::from([
                (A.to_string(), vec![B.to_string(), ROOT.to_string()]),
                (B.to_string(), vec![ROOT.to_string()]),
            ]),
        )
    }

    #[test]
    fn test_missing_dependency_becomes_comment() {
        let mut configs = vec![
            config(A, TfAddr::new("x_a", "res-0"), ItemRole::Resource),
            config(ROOT, TfAddr::new("azurerm_resource_group", "res-2"), ItemRole::ResourceGroup),
        ];
        inject_dependencies(&mut configs, &graph(), RootDependency::Explicit).unwrap();

        let rendered = configs[0].render();
        assert!(rendered.contains(&format!(
            "    # Depending on \"{}\", which is not imported by Terraform.\n",
            B
        )));
        assert!(rendered.contains("    azurerm_resource_group.res-2,\n"));
        assert!(!rendered.contains("x_b."));
        assert!(configs[1].block().body.get_attribute(DEPENDS_ON).is_none());
    }

    #[test]
    fn test_references_in_graph_order() {
        let mut configs = vec![
            config(A, TfAddr::new("x_a", "res-0"), ItemRole::Resource),
            config(B, TfAddr::new("x_b", "res-1"), ItemRole::Resource),
            config(ROOT, TfAddr::new("azurerm_resource_group", "res-2"), ItemRole::ResourceGroup),
        ];
        inject_dependencies(&mut configs, &graph(), RootDependency::Explicit).unwrap();

        let deps = configs[0].block().body.get_attribute(DEPENDS_ON).unwrap();
        assert_eq!(
            deps.expr.lines(),
            ["[", "  x_b.res-1,", "  azurerm_resource_group.res-2,", "]"]
        );
    }

    #[test]
    fn test_implicit_root_dependency_is_omitted() {
        let mut configs = vec![
            config(B, TfAddr::new("x_b", "res-1"), ItemRole::Resource),
            config(ROOT, TfAddr::new("azurerm_resource_group", "res-2"), ItemRole::ResourceGroup),
        ];
        inject_dependencies(&mut configs, &graph(), RootDependency::Implicit).unwrap();
        assert!(configs[0].block().body.get_attribute(DEPENDS_ON).is_none());
    }

    #[test]
    fn test_missing_from_graph_is_fatal() {
        let mut configs = vec![config(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Test/cs/c",
            TfAddr::new("x_c", "res-9"),
            ItemRole::Resource,
        )];
        let err =
            inject_dependencies(&mut configs, &graph(), RootDependency::Explicit).unwrap_err();
        assert!(matches!(err, PipelineError::MissingFromGraph { .. }));
        assert!(err.to_string().contains("x_c.res-9"));
    }
}

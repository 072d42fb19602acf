//! Static schema descriptors for the azurerm resource types this tool knows
//! how to tidy up, and the tuning applied to generated blocks.

use crate::terraform::hcl::{Body, BodyItem};

/// Provider version pinned in the generated bootstrap configuration.
pub const PROVIDER_VERSION: &str = "2.99.0";

pub const RESOURCE_GROUP_TYPE: &str = "azurerm_resource_group";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Required,
    Optional,
    /// Optional, and filled in by the platform when left out.
    OptionalComputed,
    /// Always computed by the platform; never belongs in configuration.
    Computed,
}

#[derive(Debug, Clone, Copy)]
pub struct AttributeSchema {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub default: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub struct NestedBlockSchema {
    pub name: &'static str,
    pub computed: bool,
    pub block: BlockSchema,
}

#[derive(Debug, Clone, Copy)]
pub struct BlockSchema {
    pub attributes: &'static [AttributeSchema],
    pub blocks: &'static [NestedBlockSchema],
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceSchema {
    pub resource_type: &'static str,
    /// ARM type the resource is exported as, e.g. `Microsoft.Storage/storageAccounts`.
    /// Empty for the resource group itself.
    pub arm_type: &'static str,
    pub block: BlockSchema,
}

impl BlockSchema {
    fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    fn nested(&self, name: &str) -> Option<&NestedBlockSchema> {
        self.blocks.iter().find(|b| b.name == name)
    }
}

const fn req(name: &'static str) -> AttributeSchema {
    AttributeSchema {
        name,
        kind: AttributeKind::Required,
        default: None,
    }
}

const fn opt(name: &'static str) -> AttributeSchema {
    AttributeSchema {
        name,
        kind: AttributeKind::Optional,
        default: None,
    }
}

const fn opt_default(name: &'static str, default: &'static str) -> AttributeSchema {
    AttributeSchema {
        name,
        kind: AttributeKind::Optional,
        default: Some(default),
    }
}

const fn opt_computed(name: &'static str) -> AttributeSchema {
    AttributeSchema {
        name,
        kind: AttributeKind::OptionalComputed,
        default: None,
    }
}

const fn computed(name: &'static str) -> AttributeSchema {
    AttributeSchema {
        name,
        kind: AttributeKind::Computed,
        default: None,
    }
}

const NO_BLOCKS: &[NestedBlockSchema] = &[];

static RESOURCE_SCHEMAS: &[ResourceSchema] = &[
    ResourceSchema {
        resource_type: RESOURCE_GROUP_TYPE,
        arm_type: "",
        block: BlockSchema {
            attributes: &[req("name"), req("location"), opt("tags")],
            blocks: NO_BLOCKS,
        },
    },
    ResourceSchema {
        resource_type: "azurerm_storage_account",
        arm_type: "Microsoft.Storage/storageAccounts",
        block: BlockSchema {
            attributes: &[
                req("name"),
                req("resource_group_name"),
                req("location"),
                req("account_tier"),
                req("account_replication_type"),
                opt_default("account_kind", "\"StorageV2\""),
                opt_computed("access_tier"),
                opt_default("enable_https_traffic_only", "true"),
                opt_default("min_tls_version", "\"TLS1_0\""),
                opt_default("allow_blob_public_access", "false"),
                opt_default("is_hns_enabled", "false"),
                opt_default("nfsv3_enabled", "false"),
                opt("tags"),
                computed("primary_location"),
                computed("secondary_location"),
                computed("primary_blob_endpoint"),
                computed("primary_blob_host"),
                computed("secondary_blob_endpoint"),
                computed("secondary_blob_host"),
                computed("primary_access_key"),
                computed("secondary_access_key"),
                computed("primary_connection_string"),
                computed("secondary_connection_string"),
                computed("primary_blob_connection_string"),
                computed("secondary_blob_connection_string"),
            ],
            blocks: &[
                NestedBlockSchema {
                    name: "network_rules",
                    computed: false,
                    block: BlockSchema {
                        attributes: &[
                            req("default_action"),
                            opt_computed("bypass"),
                            opt_computed("ip_rules"),
                            opt_computed("virtual_network_subnet_ids"),
                        ],
                        blocks: NO_BLOCKS,
                    },
                },
                NestedBlockSchema {
                    name: "identity",
                    computed: false,
                    block: BlockSchema {
                        attributes: &[req("type"), computed("principal_id"), computed("tenant_id")],
                        blocks: NO_BLOCKS,
                    },
                },
            ],
        },
    },
    ResourceSchema {
        resource_type: "azurerm_virtual_network",
        arm_type: "Microsoft.Network/virtualNetworks",
        block: BlockSchema {
            attributes: &[
                req("name"),
                req("resource_group_name"),
                req("location"),
                req("address_space"),
                opt_computed("dns_servers"),
                opt_computed("bgp_community"),
                opt_default("flow_timeout_in_minutes", "0"),
                opt("tags"),
                computed("guid"),
            ],
            blocks: &[
                NestedBlockSchema {
                    name: "subnet",
                    computed: false,
                    block: BlockSchema {
                        attributes: &[
                            req("name"),
                            req("address_prefix"),
                            opt("security_group"),
                            computed("id"),
                        ],
                        blocks: NO_BLOCKS,
                    },
                },
                NestedBlockSchema {
                    name: "ddos_protection_plan",
                    computed: false,
                    block: BlockSchema {
                        attributes: &[req("id"), req("enable")],
                        blocks: NO_BLOCKS,
                    },
                },
            ],
        },
    },
    ResourceSchema {
        resource_type: "azurerm_subnet",
        arm_type: "Microsoft.Network/virtualNetworks/subnets",
        block: BlockSchema {
            attributes: &[
                req("name"),
                req("resource_group_name"),
                req("virtual_network_name"),
                opt_computed("address_prefixes"),
                opt("service_endpoints"),
                opt("service_endpoint_policy_ids"),
                opt_default("enforce_private_link_endpoint_network_policies", "false"),
                opt_default("enforce_private_link_service_network_policies", "false"),
                computed("address_prefix"),
            ],
            blocks: &[NestedBlockSchema {
                name: "delegation",
                computed: false,
                block: BlockSchema {
                    attributes: &[req("name")],
                    blocks: &[NestedBlockSchema {
                        name: "service_delegation",
                        computed: false,
                        block: BlockSchema {
                            attributes: &[req("name"), opt_computed("actions")],
                            blocks: NO_BLOCKS,
                        },
                    }],
                },
            }],
        },
    },
    ResourceSchema {
        resource_type: "azurerm_network_security_group",
        arm_type: "Microsoft.Network/networkSecurityGroups",
        block: BlockSchema {
            attributes: &[
                req("name"),
                req("resource_group_name"),
                req("location"),
                opt_computed("security_rule"),
                opt("tags"),
            ],
            blocks: NO_BLOCKS,
        },
    },
    ResourceSchema {
        resource_type: "azurerm_public_ip",
        arm_type: "Microsoft.Network/publicIPAddresses",
        block: BlockSchema {
            attributes: &[
                req("name"),
                req("resource_group_name"),
                req("location"),
                req("allocation_method"),
                opt_default("sku", "\"Basic\""),
                opt_default("ip_version", "\"IPv4\""),
                opt_default("idle_timeout_in_minutes", "4"),
                opt("domain_name_label"),
                opt("reverse_fqdn"),
                opt("public_ip_prefix_id"),
                opt_computed("availability_zone"),
                opt("tags"),
                computed("ip_address"),
                computed("fqdn"),
            ],
            blocks: NO_BLOCKS,
        },
    },
    ResourceSchema {
        resource_type: "azurerm_network_interface",
        arm_type: "Microsoft.Network/networkInterfaces",
        block: BlockSchema {
            attributes: &[
                req("name"),
                req("resource_group_name"),
                req("location"),
                opt_computed("dns_servers"),
                opt_default("enable_accelerated_networking", "false"),
                opt_default("enable_ip_forwarding", "false"),
                opt("internal_dns_name_label"),
                opt("tags"),
                computed("applied_dns_servers"),
                computed("internal_domain_name_suffix"),
                computed("mac_address"),
                computed("private_ip_address"),
                computed("private_ip_addresses"),
                computed("virtual_machine_id"),
            ],
            blocks: &[NestedBlockSchema {
                name: "ip_configuration",
                computed: false,
                block: BlockSchema {
                    attributes: &[
                        req("name"),
                        req("private_ip_address_allocation"),
                        opt("subnet_id"),
                        opt_computed("private_ip_address"),
                        opt_default("private_ip_address_version", "\"IPv4\""),
                        opt("public_ip_address_id"),
                        opt_computed("primary"),
                    ],
                    blocks: NO_BLOCKS,
                },
            }],
        },
    },
    ResourceSchema {
        resource_type: "azurerm_log_analytics_workspace",
        arm_type: "Microsoft.OperationalInsights/workspaces",
        block: BlockSchema {
            attributes: &[
                req("name"),
                req("resource_group_name"),
                req("location"),
                opt_computed("sku"),
                opt_computed("retention_in_days"),
                opt_default("daily_quota_gb", "-1"),
                opt_default("internet_ingestion_enabled", "true"),
                opt_default("internet_query_enabled", "true"),
                opt("tags"),
                computed("workspace_id"),
                computed("primary_shared_key"),
                computed("secondary_shared_key"),
            ],
            blocks: NO_BLOCKS,
        },
    },
];

/// Schema descriptor for a terraform resource type, if known.
pub fn resource_schema(resource_type: &str) -> Option<&'static ResourceSchema> {
    RESOURCE_SCHEMAS.iter().find(|s| s.resource_type == resource_type)
}

/// Terraform resource type for an ARM type. ARM types compare
/// case-insensitively; the empty type is the resource group.
pub fn terraform_type_for_arm(arm_type: &str) -> Option<&'static str> {
    RESOURCE_SCHEMAS
        .iter()
        .find(|s| s.arm_type.eq_ignore_ascii_case(arm_type))
        .map(|s| s.resource_type)
}

/// Normalise a generated resource body according to its schema. Unknown
/// types are left untouched.
pub fn tune_resource_body(body: &mut Body, resource_type: &str) {
    let Some(schema) = resource_schema(resource_type) else {
        tracing::debug!(resource_type, "no schema descriptor, leaving block as generated");
        return;
    };
    body.remove_attribute("id");
    body.remove_blocks("timeouts");
    tune_body(body, &schema.block);
}

fn tune_body(body: &mut Body, schema: &BlockSchema) {
    body.retain(|item| match item {
        BodyItem::Attribute(attr) => {
            if attr.expr.is_null() {
                return false;
            }
            match schema.attribute(&attr.name) {
                Some(s) => match s.kind {
                    AttributeKind::Computed => false,
                    AttributeKind::Required => true,
                    AttributeKind::Optional | AttributeKind::OptionalComputed => {
                        let value = attr.expr.text();
                        let is_default = s.default.is_some_and(|d| value.trim() == d);
                        !(is_default || attr.expr.is_empty_value())
                    }
                },
                None => true,
            }
        }
        BodyItem::Block(block) => !schema.nested(&block.kind).is_some_and(|n| n.computed),
        _ => true,
    });

    for block in body.blocks_mut() {
        if let Some(nested) = schema.nested(&block.kind) {
            tune_body(&mut block.body, &nested.block);
        }
    }
}

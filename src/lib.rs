// Re-export modules for testing and external use
pub mod azure {
    pub mod export;
    pub mod graph;
    pub mod resource_id;
    pub mod template;

    pub use export::{ArmExportClient, FileTemplateSource, TemplateSource};
    pub use graph::DependencyGraph;
    pub use resource_id::ResourceKey;
    pub use template::{ArmTemplate, Inventory, TemplateError};
}

pub mod terraform {
    pub mod hcl;
    pub mod noise;
    pub mod schema;
    pub mod tool;
    pub mod workspace;

    pub use tool::{TerraformCli, TerraformError, TerraformTool};
    pub use workspace::Workspace;
}

pub mod pipeline {
    pub mod address;
    pub mod assembler;
    pub mod dependency;
    pub mod error;
    pub mod importer;
    pub mod list;
    pub mod report;
    pub mod synthesizer;

    pub use address::{ResourceMapping, TfAddr};
    pub use error::{ItemError, PipelineError};
    pub use list::{ImportItem, ImportList, NamePattern};
    pub use report::ImportReport;
    pub use synthesizer::ConfigInfo;
}

pub mod shared {
    pub mod logging;
}

pub mod core {
    pub mod aztfimport;
}

pub mod config;

// Re-export commonly used types for easier testing and external use
pub use crate::core::aztfimport::{run_import, AzTfImport, ImportOptions, RunSettings};
pub use config::{Config, RootDependency};

use crate::azure::template::TemplateError;
use crate::terraform::hcl::HclError;
use serde::Serialize;
use thiserror::Error;

/// Failure of a single item. Recorded on the item; the batch carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemError {
    #[error("malformed address {address:?}: {reason}")]
    MalformedAddress { address: String, reason: String },

    #[error("no terraform resource type known for {resource_id}")]
    UnknownResourceType { resource_id: String },

    #[error("generating resource template for {address}: {message}")]
    Scaffold { address: String, message: String },

    #[error("writing resource template file for {address}: {message}")]
    ScaffoldWrite { address: String, message: String },

    #[error("importing {resource_id} as {address}: {message}")]
    StateImport {
        address: String,
        resource_id: String,
        message: String,
    },
}

/// Failure that aborts the whole run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("converting terraform state to config for {address}: {message}")]
    StateToConfig { address: String, message: String },

    #[error("parsing the configuration generated for {address}: {source}")]
    ConfigParse {
        address: String,
        #[source]
        source: HclError,
    },

    #[error("can't find resource {resource_id} ({address}) in the dependency graph")]
    MissingFromGraph { resource_id: String, address: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PipelineError::Io {
            context: context.into(),
            source,
        }
    }
}

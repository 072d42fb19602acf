use crate::pipeline::error::ItemError;
use crate::pipeline::list::ImportList;
use chrono::{DateTime, Local};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ImportedResource {
    pub resource_id: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedResource {
    pub resource_id: String,
    pub address: String,
    pub error: ItemError,
}

/// Summary of a run, derived from the final state of the import list.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub resource_group: String,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub imported: Vec<ImportedResource>,
    pub failed: Vec<FailedResource>,
    pub skipped: usize,
    pub output_file: Option<String>,
}

impl ImportReport {
    pub fn from_list(resource_group: &str, started_at: DateTime<Local>, list: &ImportList) -> Self {
        Self {
            resource_group: resource_group.to_string(),
            started_at,
            finished_at: Local::now(),
            imported: list
                .imported()
                .map(|item| ImportedResource {
                    resource_id: item.resource_id.clone(),
                    address: item.address.to_string(),
                })
                .collect(),
            failed: list
                .failed()
                .filter_map(|item| {
                    item.import_error.clone().map(|error| FailedResource {
                        resource_id: item.resource_id.clone(),
                        address: item.address.to_string(),
                        error,
                    })
                })
                .collect(),
            skipped: list.skipped().count(),
            output_file: None,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

//! Concatenates the generated blocks into the final configuration file.

use crate::pipeline::error::PipelineError;
use crate::pipeline::synthesizer::ConfigInfo;
use crate::terraform::workspace::{Workspace, MAIN_CONFIG_FILE};
use std::path::PathBuf;

/// Blocks in the given order, separated by exactly one blank line.
pub fn assemble(configs: &[ConfigInfo]) -> String {
    configs
        .iter()
        .map(|cfg| format!("{}\n", cfg.render().trim_matches('\n')))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn write_document(ws: &Workspace, configs: &[ConfigInfo]) -> Result<PathBuf, PipelineError> {
    let document = assemble(configs);
    ws.write_file(MAIN_CONFIG_FILE, document.as_bytes())
        .map_err(|e| PipelineError::io("generating main configuration file", e))
}

//! The working directory terraform runs in, and the files the pipeline
//! keeps there.

use crate::shared::logging;
use crate::terraform::schema::PROVIDER_VERSION;
use crate::terraform::tool::TerraformTool;
use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MAIN_CONFIG_FILE: &str = "main.tf";
pub const PROVIDER_CONFIG_FILE: &str = "provider.tf";

/// Handle on the shared working directory and the tool bound to it.
/// Pipeline stages take it by `&mut`, which keeps tool invocations and
/// scratch file writes strictly one at a time.
pub struct Workspace {
    dir: PathBuf,
    tool: Box<dyn TerraformTool>,
}

impl Workspace {
    pub fn new(dir: PathBuf, tool: Box<dyn TerraformTool>) -> Self {
        Self { dir, tool }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tool(&self) -> &dyn TerraformTool {
        self.tool.as_ref()
    }

    /// Check the output directory exists and is empty. With `overwrite`
    /// its contents are removed instead of failing.
    pub fn prepare_output_dir(dir: &Path, overwrite: bool) -> anyhow::Result<()> {
        let meta = std::fs::metadata(dir)
            .with_context(|| format!("the output directory {:?} doesn't exist", dir))?;
        if !meta.is_dir() {
            anyhow::bail!("the output path {:?} is not a directory", dir);
        }

        let mut entries = std::fs::read_dir(dir)
            .with_context(|| format!("reading output directory {:?}", dir))?
            .peekable();
        if entries.peek().is_none() {
            return Ok(());
        }
        if !overwrite {
            anyhow::bail!("the output directory {:?} is not empty", dir);
        }

        logging::warn(&format!("Removing existing content under {}", dir.display()));
        for entry in entries {
            let path = entry?.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            result.with_context(|| format!("failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    /// Write the provider/backend configuration and initialise terraform.
    pub fn bootstrap(
        &mut self,
        backend_type: &str,
        backend_config: &[String],
    ) -> anyhow::Result<()> {
        let path = self.dir.join(PROVIDER_CONFIG_FILE);
        std::fs::write(&path, provider_config(backend_type))
            .with_context(|| format!("error creating provider config {}", path.display()))?;

        match self.tool.version() {
            Ok(version) => logging::info(&format!("Using terraform {}", version)),
            Err(e) => logging::warn(&format!("Could not determine terraform version: {}", e)),
        }

        self.tool
            .init(backend_config)
            .context("error running terraform init")?;
        Ok(())
    }

    /// Write a scaffold into the shared main config file. The file is
    /// removed when the returned guard is dropped.
    pub fn write_scaffold(&mut self, content: &str) -> std::io::Result<ScaffoldFile> {
        let path = self.dir.join(MAIN_CONFIG_FILE);
        std::fs::write(&path, content)?;
        Ok(ScaffoldFile { path })
    }

    /// Write a file into the workspace through a temp file, so a failed
    /// write never leaves a truncated artifact behind.
    pub fn write_file(&self, name: &str, content: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.dir.join(name);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(path)
    }
}

/// Scratch scaffold on disk, deleted on drop.
#[derive(Debug)]
pub struct ScaffoldFile {
    path: PathBuf,
}

impl ScaffoldFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScaffoldFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                logging::warn(&format!(
                    "Failed to remove scaffold {}: {}",
                    self.path.display(),
                    e
                ));
            }
        }
    }
}

pub fn provider_config(backend_type: &str) -> String {
    format!(
        r#"terraform {{
  backend "{}" {{}}
  required_providers {{
    azurerm = {{
      source  = "hashicorp/azurerm"
      version = "{}"
    }}
  }}
}}

provider "azurerm" {{
  features {{}}
}}
"#,
        backend_type, PROVIDER_VERSION
    )
}

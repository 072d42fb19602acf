//! The external terraform executable, behind a trait so the pipeline can be
//! driven by a fake in tests.

use crate::shared::logging;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror::Error;

pub const USER_AGENT: &str = "aztfimport";

#[derive(Error, Debug)]
pub enum TerraformError {
    #[error("terraform {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Terraform binary not found: {0}")]
    BinaryNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Operations the pipeline needs from terraform. Every call is blocking and
/// runs against a single working directory, so implementations are never
/// used from more than one thread at a time.
pub trait TerraformTool {
    fn version(&self) -> Result<String, TerraformError>;

    fn init(&self, backend_config: &[String]) -> Result<(), TerraformError>;

    /// Generate configuration for `address`. With `from_state` the block is
    /// filled from the state store, otherwise it is a blank scaffold.
    fn add(&self, address: &str, from_state: bool) -> Result<String, TerraformError>;

    fn import(&self, address: &str, resource_id: &str) -> Result<(), TerraformError>;

    fn state_rm(&self, address: &str) -> Result<(), TerraformError>;
}

/// The real terraform CLI.
pub struct TerraformCli {
    terraform_path: PathBuf,
    working_dir: PathBuf,
}

impl TerraformCli {
    pub fn new(terraform_path: PathBuf, working_dir: PathBuf) -> Self {
        logging::debug(&format!(
            "TerraformCli initialized with terraform path: {} and working directory: {}",
            terraform_path.display(),
            working_dir.display()
        ));
        Self {
            terraform_path,
            working_dir,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Find the terraform binary: an explicit path wins, otherwise the
    /// binary name is looked up in PATH.
    pub fn locate(explicit: Option<&str>, binary_name: &str) -> Result<PathBuf, TerraformError> {
        match explicit {
            Some(path) => {
                let path = PathBuf::from(path);
                let path = if path.is_absolute() {
                    path
                } else {
                    std::env::current_dir()?.join(path)
                };
                if !path.exists() {
                    return Err(TerraformError::BinaryNotFound(path.display().to_string()));
                }
                logging::info(&format!("Using specified Terraform binary: {}", path.display()));
                Ok(path)
            }
            None => {
                let path = which::which(binary_name)
                    .map_err(|_| TerraformError::BinaryNotFound(binary_name.to_string()))?;
                logging::info(&format!(
                    "Found Terraform binary '{}' in PATH: {}",
                    binary_name,
                    path.display()
                ));
                Ok(path)
            }
        }
    }

    fn run(&self, command: &str, args: &[&str]) -> Result<Output, TerraformError> {
        tracing::debug!(command, ?args, "running terraform");
        let output = Command::new(&self.terraform_path)
            .arg(command)
            .args(args)
            .env("AZURE_HTTP_USER_AGENT", USER_AGENT)
            .env("TF_IN_AUTOMATION", "1")
            .current_dir(&self.working_dir)
            .output()?;

        if output.status.success() {
            Ok(output)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let message = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            Err(TerraformError::CommandFailed {
                command: command.to_string(),
                message: message.replace('\n', " "),
            })
        }
    }
}

impl TerraformTool for TerraformCli {
    fn version(&self) -> Result<String, TerraformError> {
        let output = self.run("version", &["-json"])?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&stdout) {
            if let Some(version) = json.get("terraform_version").and_then(|v| v.as_str()) {
                return Ok(version.to_string());
            }
        }
        Ok(stdout
            .lines()
            .find(|line| line.starts_with("Terraform"))
            .unwrap_or("Unknown version")
            .to_string())
    }

    fn init(&self, backend_config: &[String]) -> Result<(), TerraformError> {
        let backend_args: Vec<String> = backend_config
            .iter()
            .map(|opt| format!("-backend-config={}", opt))
            .collect();
        let mut args = vec!["-no-color", "-input=false"];
        args.extend(backend_args.iter().map(String::as_str));
        self.run("init", &args)?;
        Ok(())
    }

    fn add(&self, address: &str, from_state: bool) -> Result<String, TerraformError> {
        let mut args = vec!["-no-color"];
        if from_state {
            args.push("-from-state");
        }
        args.push(address);
        let output = self.run("add", &args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn import(&self, address: &str, resource_id: &str) -> Result<(), TerraformError> {
        self.run("import", &["-no-color", "-input=false", address, resource_id])?;
        Ok(())
    }

    fn state_rm(&self, address: &str) -> Result<(), TerraformError> {
        self.run("state", &["rm", address])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_missing_explicit_path() {
        let err = TerraformCli::locate(Some("/definitely/not/terraform"), "terraform").unwrap_err();
        assert!(matches!(err, TerraformError::BinaryNotFound(_)));
    }

    #[test]
    fn test_locate_missing_binary_in_path() {
        let err = TerraformCli::locate(None, "terraform-binary-that-does-not-exist").unwrap_err();
        assert!(err.to_string().contains("terraform-binary-that-does-not-exist"));
    }

    #[test]
    fn test_missing_executable_surfaces_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = TerraformCli::new(dir.path().join("no-terraform"), dir.path().to_path_buf());
        assert!(matches!(
            cli.import("azurerm_resource_group.res-0", "/subscriptions/s/resourceGroups/rg"),
            Err(TerraformError::IoError(_))
        ));
    }
}

use crate::azure::export::{ArmExportClient, FileTemplateSource, TemplateSource};
use crate::azure::graph::DependencyGraph;
use crate::config::{self, Config, RootDependency};
use crate::pipeline::address::{ResourceMapping, RESOURCE_MAPPING_FILE_NAME};
use crate::pipeline::assembler::write_document;
use crate::pipeline::dependency::inject_dependencies;
use crate::pipeline::error::PipelineError;
use crate::pipeline::importer::{import_all, remove_from_state};
use crate::pipeline::list::{ImportList, NamePattern};
use crate::pipeline::report::ImportReport;
use crate::pipeline::synthesizer::state_to_config;
use crate::shared::logging;
use crate::terraform::tool::TerraformCli;
use crate::terraform::workspace::Workspace;
use anyhow::Context;
use chrono::Local;
use std::path::{Path, PathBuf};

/// Options of one `import` invocation. Unset fields fall back to the
/// environment, then the config file.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub resource_group: String,
    pub output_dir: Option<String>,
    pub mapping_file: Option<String>,
    pub name_pattern: Option<String>,
    pub overwrite: bool,
    pub backend_type: Option<String>,
    pub backend_config: Vec<String>,
    pub template_file: Option<String>,
    pub subscription_id: Option<String>,
    pub root_dependency: Option<RootDependency>,
}

/// Everything the pipeline needs once options and config are merged.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub resource_group: String,
    pub subscription_id: String,
    pub mapping: ResourceMapping,
    pub naming: NamePattern,
    pub backend_type: String,
    pub backend_config: Vec<String>,
    pub root_dependency: RootDependency,
}

pub struct AzTfImport {
    config: Config,
}

impl AzTfImport {
    pub fn new(config_path: Option<String>) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(path) => {
                let path_buf = PathBuf::from(&path);
                let abs_path = if path_buf.is_absolute() {
                    path_buf
                } else {
                    std::env::current_dir()?.join(&path)
                };
                logging::info(&format!("Using config file: {}", abs_path.display()));
                config::init_from_path(&abs_path.to_string_lossy())?
            }
            None => {
                logging::debug("No config path provided, using default configuration");
                config::init_default()?
            }
        };
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self, opts: &ImportOptions) -> anyhow::Result<RunSettings> {
        if opts.resource_group.trim().is_empty() {
            anyhow::bail!("resource group name is not specified");
        }
        let subscription_id = opts
            .subscription_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.config.subscription_id())
            .context(
                "subscription id is not specified (use --subscription-id or ARM_SUBSCRIPTION_ID)",
            )?;

        let mapping = match &opts.mapping_file {
            Some(path) => {
                let mapping = ResourceMapping::load(Path::new(path))?;
                logging::info(&format!("Loaded {} mapping entries from {}", mapping.len(), path));
                mapping
            }
            None => ResourceMapping::new(),
        };

        let pattern = opts
            .name_pattern
            .as_deref()
            .unwrap_or(&self.config.import.resource_name_pattern);

        Ok(RunSettings {
            resource_group: opts.resource_group.clone(),
            subscription_id,
            mapping,
            naming: NamePattern::parse(pattern),
            backend_type: opts
                .backend_type
                .clone()
                .unwrap_or_else(|| self.config.import.backend_type.clone()),
            backend_config: if opts.backend_config.is_empty() {
                self.config.import.backend_config.clone()
            } else {
                opts.backend_config.clone()
            },
            root_dependency: opts
                .root_dependency
                .unwrap_or(self.config.import.root_dependency),
        })
    }

    pub async fn import(&self, opts: ImportOptions) -> anyhow::Result<ImportReport> {
        let settings = self.settings(&opts)?;
        let output_dir = resolve_dir(opts.output_dir.as_deref())?;
        Workspace::prepare_output_dir(&output_dir, opts.overwrite || self.config.import.overwrite)?;

        let source: Box<dyn TemplateSource> = match &opts.template_file {
            Some(path) => Box::new(FileTemplateSource::new(PathBuf::from(path))),
            None => {
                let token = self
                    .config
                    .access_token()
                    .context("no access token available (set AZURE_ACCESS_TOKEN)")?;
                Box::new(ArmExportClient::new(
                    &self.config.azure.management_endpoint,
                    &self.config.azure.api_version,
                    &settings.subscription_id,
                    token,
                ))
            }
        };

        let mut ws = self.workspace(output_dir)?;
        run_import(&mut ws, source.as_ref(), &settings).await
    }

    pub fn state_rm(&self, address: &str, output_dir: Option<&str>) -> anyhow::Result<()> {
        let dir = resolve_dir(output_dir)?;
        let mut ws = self.workspace(dir)?;
        remove_from_state(&mut ws, address)
    }

    fn workspace(&self, dir: PathBuf) -> anyhow::Result<Workspace> {
        let terraform_path = TerraformCli::locate(
            self.config.terraform.executable_path.as_deref(),
            &self.config.terraform_binary_name(),
        )?;
        Ok(Workspace::new(
            dir.clone(),
            Box::new(TerraformCli::new(terraform_path, dir)),
        ))
    }
}

fn resolve_dir(dir: Option<&str>) -> anyhow::Result<PathBuf> {
    let cwd = std::env::current_dir().context("determining the current directory")?;
    Ok(match dir {
        Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
        Some(dir) => cwd.join(dir),
        None => cwd,
    })
}

/// Run the whole pipeline against a prepared workspace.
pub async fn run_import(
    ws: &mut Workspace,
    source: &dyn TemplateSource,
    settings: &RunSettings,
) -> anyhow::Result<ImportReport> {
    let started_at = Local::now();
    let rg = settings.resource_group.as_str();

    let template = source.export(rg).await?;
    let graph = DependencyGraph::extract(&template, &settings.subscription_id, rg)
        .map_err(PipelineError::from)?;
    let inventory = template
        .inventory(&settings.subscription_id, rg)
        .map_err(PipelineError::from)?;
    logging::info(&format!(
        "Resource group {} has {} resources",
        rg,
        inventory.len()
    ));

    ws.bootstrap(&settings.backend_type, &settings.backend_config)?;

    let mut list = ImportList::build(&inventory, &settings.mapping, &settings.naming);
    import_all(ws, &mut list);

    let mut configs = state_to_config(ws, &list)?;
    inject_dependencies(&mut configs, &graph, settings.root_dependency)?;
    let document = write_document(ws, &configs)?;
    logging::info(&format!("Wrote {}", document.display()));

    let mapping = list
        .to_mapping()
        .to_json()
        .context("serializing the resource mapping")?;
    ws.write_file(RESOURCE_MAPPING_FILE_NAME, &mapping)
        .context("writing the resource mapping file")?;

    let mut report = ImportReport::from_list(rg, started_at, &list);
    report.output_file = Some(document.display().to_string());
    if report.has_failures() {
        logging::warn(&format!(
            "{} of {} resources failed to import",
            report.failed.len(),
            list.to_import().count()
        ));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(rg: &str) -> ImportOptions {
        ImportOptions {
            resource_group: rg.to_string(),
            subscription_id: Some("sub".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_settings_cli_overrides_config() {
        let mut config = Config::default();
        config.import.resource_name_pattern = "cfg-*-x".to_string();
        config.import.backend_type = "azurerm".to_string();
        config.import.root_dependency = RootDependency::Implicit;
        let app = AzTfImport::with_config(config);

        let settings = app.settings(&opts("rg")).unwrap();
        assert_eq!(settings.naming.name(1), "cfg-1-x");
        assert_eq!(settings.backend_type, "azurerm");
        assert_eq!(settings.root_dependency, RootDependency::Implicit);

        let mut o = opts("rg");
        o.name_pattern = Some("cli-".to_string());
        o.backend_type = Some("local".to_string());
        o.root_dependency = Some(RootDependency::Explicit);
        let settings = app.settings(&o).unwrap();
        assert_eq!(settings.naming.name(0), "cli-0");
        assert_eq!(settings.backend_type, "local");
        assert_eq!(settings.root_dependency, RootDependency::Explicit);
    }

    #[test]
    fn test_settings_requires_resource_group() {
        let app = AzTfImport::with_config(Config::default());
        assert!(app.settings(&opts(" ")).is_err());
    }

    #[test]
    fn test_settings_loads_mapping_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        std::fs::write(&path, r#"{"/sub/rg/a": {"type": "x_y", "name": "r0"}}"#).unwrap();

        let app = AzTfImport::with_config(Config::default());
        let mut o = opts("rg");
        o.mapping_file = Some(path.to_string_lossy().into_owned());
        let settings = app.settings(&o).unwrap();
        assert_eq!(settings.mapping.len(), 1);
        assert_eq!(settings.mapping.get("/sub/rg/a").unwrap().to_string(), "x_y.r0");
    }

    // The only test in the crate that touches these variables.
    #[test]
    fn test_environment_overrides_config_file() {
        let mut config = Config::default();
        config.azure.subscription_id = Some("from-config".to_string());
        config.azure.access_token = Some("config-token".to_string());
        config.terraform.binary_name = Some("terraform-config".to_string());
        let app = AzTfImport::with_config(config);

        let mut o = opts("rg");
        o.subscription_id = None;

        std::env::set_var("ARM_SUBSCRIPTION_ID", "from-env");
        std::env::set_var("AZURE_ACCESS_TOKEN", "env-token");
        std::env::set_var("TERRAFORM_BINARY_NAME", "terraform-env");
        let from_env = app.settings(&o).unwrap().subscription_id;
        let token = app.config().access_token();
        let binary = app.config().terraform_binary_name();
        let from_cli = app.settings(&opts("rg")).unwrap().subscription_id;
        std::env::remove_var("ARM_SUBSCRIPTION_ID");
        std::env::remove_var("AZURE_ACCESS_TOKEN");
        std::env::remove_var("TERRAFORM_BINARY_NAME");

        assert_eq!(from_env, "from-env");
        assert_eq!(token.as_deref(), Some("env-token"));
        assert_eq!(binary, "terraform-env");
        assert_eq!(from_cli, "sub");
    }
}

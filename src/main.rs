use aztfimport::config::RootDependency;
use aztfimport::shared::logging::{self, LogLevel};
use aztfimport::{AzTfImport, ImportOptions};
use clap::{Parser, Subcommand};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(
    name = "aztfimport",
    about = "Bring an existing Azure resource group under Terraform management.",
    version = APP_VERSION,
    disable_version_flag(true)
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(
        long,
        short = 'c',
        value_name = "PATH",
        help = "Path to the configuration file"
    )]
    pub config: Option<String>,

    #[arg(long, short = 'V', help = "Print version")]
    pub version: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "import", about = "Import a resource group and generate its configuration")]
    Import(ImportArgs),

    #[command(name = "state-rm", about = "Remove an address from the terraform state")]
    StateRm {
        address: String,

        #[arg(long, short = 'o', value_name = "DIR", help = "Terraform working directory")]
        output_dir: Option<String>,
    },
}

#[derive(clap::Args)]
struct ImportArgs {
    /// Name of the resource group to import
    resource_group: String,

    #[arg(
        long,
        short = 'o',
        value_name = "DIR",
        help = "Output directory (defaults to the current directory)"
    )]
    output_dir: Option<String>,

    #[arg(long, short = 'm', value_name = "PATH", help = "Resource mapping file")]
    mapping_file: Option<String>,

    #[arg(
        long,
        short = 'p',
        value_name = "PATTERN",
        help = "Pattern of auto-generated resource names, e.g. res-*"
    )]
    name_pattern: Option<String>,

    #[arg(long, short = 'f', help = "Remove existing content of the output directory")]
    overwrite: bool,

    #[arg(long, value_name = "TYPE", help = "Terraform backend type")]
    backend_type: Option<String>,

    #[arg(long, value_name = "KEY=VALUE", help = "Terraform backend config (repeatable)")]
    backend_config: Vec<String>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Read the export document from a file instead of Azure"
    )]
    template_file: Option<String>,

    #[arg(long, value_name = "ID", help = "Azure subscription id")]
    subscription_id: Option<String>,

    #[arg(long, value_enum, help = "Whether depends_on lists the resource group")]
    root_dependency: Option<RootDependency>,
}

impl From<ImportArgs> for ImportOptions {
    fn from(args: ImportArgs) -> Self {
        ImportOptions {
            resource_group: args.resource_group,
            output_dir: args.output_dir,
            mapping_file: args.mapping_file,
            name_pattern: args.name_pattern,
            overwrite: args.overwrite,
            backend_type: args.backend_type,
            backend_config: args.backend_config,
            template_file: args.template_file,
            subscription_id: args.subscription_id,
            root_dependency: args.root_dependency,
        }
    }
}

#[tokio::main]
async fn main() {
    let level = std::env::var("AZTFIMPORT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    logging::init(LogLevel::parse_lenient(&level));

    let cli = Cli::parse();

    if cli.version {
        println!("{}", APP_VERSION);
        std::process::exit(0);
    }

    let Some(command) = cli.command else {
        println!("No command specified. Use --help for usage information.");
        return;
    };

    let app = match AzTfImport::new(cli.config.clone()) {
        Ok(app) => app,
        Err(e) => {
            logging::error(&format!("Failed to initialize aztfimport: {:#}", e));
            std::process::exit(1);
        }
    };

    match command {
        Commands::Import(args) => {
            logging::info(&format!("Importing resource group {}", args.resource_group));
            match app.import(args.into()).await {
                Ok(report) => match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        logging::error(&format!("Error rendering the run report: {}", e));
                        std::process::exit(1);
                    }
                },
                Err(e) => {
                    logging::error(&format!("Error importing resource group: {:#}", e));
                    std::process::exit(1);
                }
            }
        }
        Commands::StateRm { address, output_dir } => {
            if let Err(e) = app.state_rm(&address, output_dir.as_deref()) {
                logging::error(&format!("Error removing {} from state: {:#}", address, e));
                std::process::exit(1);
            }
        }
    }
}

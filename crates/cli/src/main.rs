mod app;
mod catalog_commands;
mod skill_commands;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "skillport",
    version,
    about = "Install and manage agent skills for Claude Code and Codex"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/skillport/).
    #[arg(long, global = true, env = "SKILLPORT_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
    /// Custom data directory for the catalog registry and git mirrors.
    #[arg(long, global = true, env = "SKILLPORT_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Skills(skill_commands::SkillAction),
    /// Catalog management.
    Catalogs {
        #[command(subcommand)]
        action: catalog_commands::CatalogAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output stays pipeable.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "skillport starting");

    if let Some(ref dir) = cli.config_dir {
        skillport_config::set_config_dir(dir.clone());
    }
    if let Some(ref dir) = cli.data_dir {
        skillport_config::set_data_dir(dir.clone());
    }
    let config = skillport_config::discover_and_load();

    match cli.command {
        Commands::Skills(action) => skill_commands::handle_skills(action, config).await,
        Commands::Catalogs { action } => catalog_commands::handle_catalogs(action, config).await,
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use vigil_service::config::Config;
use vigil_service::database::models::{
    IntegrationKind, Monitor, MonitorPatch, NewIntegration, NewMonitor, unix_now_millis,
};
use vigil_service::database::{Database, DatabaseImpl, initialize_database};
use vigil_service::monitoring::{MonitorStatus, Slot, load_slots};
use vigil_service::orchestrator::Orchestrator;
use vigil_service::pool::open_pool;
use vigil_service::validation;

#[derive(Parser)]
#[command(
    name = "vigil",
    about = "HTTP endpoint monitoring with Discord and Slack alerts",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the config file (default: $XDG_CONFIG_HOME/vigil/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler until Ctrl-C
    Run,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage monitors
    Monitor {
        #[command(subcommand)]
        action: MonitorAction,
    },
    /// Manage alert integrations
    Integration {
        #[command(subcommand)]
        action: IntegrationAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
}

#[derive(Subcommand)]
enum MonitorAction {
    /// Create a monitor
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "GET")]
        method: String,
        /// Seconds between probes
        #[arg(long, default_value_t = 60)]
        interval: u64,
        /// Consecutive failures before alerting
        #[arg(long, default_value_t = 3)]
        threshold: u32,
        /// Probe timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,
        /// Integration to alert (repeatable)
        #[arg(long = "integration", required = true)]
        integrations: Vec<i64>,
    },
    /// List monitors with their recent history
    List,
    /// Show one monitor
    Show { id: i64 },
    /// Change fields of a monitor
    Update {
        id: i64,
        #[command(flatten)]
        patch: PatchArgs,
    },
}

#[derive(Args)]
struct PatchArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    method: Option<String>,
    #[arg(long)]
    interval: Option<u64>,
    #[arg(long)]
    threshold: Option<u32>,
    #[arg(long)]
    timeout: Option<u64>,
    #[arg(long, conflicts_with = "disable")]
    enable: bool,
    #[arg(long)]
    disable: bool,
    /// Replace the monitor's integrations (repeatable)
    #[arg(long = "integration")]
    integrations: Vec<i64>,
}

impl From<PatchArgs> for MonitorPatch {
    fn from(args: PatchArgs) -> Self {
        let enabled = match (args.enable, args.disable) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };

        MonitorPatch {
            name: args.name,
            url: args.url,
            method: args.method,
            interval_seconds: args.interval,
            threshold: args.threshold,
            timeout_seconds: args.timeout,
            enabled,
            integration_ids: (!args.integrations.is_empty()).then_some(args.integrations),
        }
    }
}

#[derive(Subcommand)]
enum IntegrationAction {
    /// Register a webhook
    Add {
        #[arg(long)]
        name: String,
        /// discord or slack
        #[arg(long = "type")]
        kind: IntegrationKind,
        #[arg(long)]
        url: String,
    },
    /// List integrations
    List {
        /// Name prefix to filter by
        #[arg(long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logger::init_with_level(if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO });

    let config = Config::from_config(cli.config.as_ref()).context("failed to load config")?;

    match cli.command {
        Commands::Run => Orchestrator::start(config).await,
        Commands::Config { action: ConfigAction::Show } => {
            print!("{config}");
            Ok(())
        }
        Commands::Monitor { action } => {
            let database = open_database(&config).await?;
            monitor_command(database.as_ref(), action).await
        }
        Commands::Integration { action } => {
            let database = open_database(&config).await?;
            integration_command(database.as_ref(), action).await
        }
    }
}

async fn open_database(config: &Config) -> Result<Arc<dyn Database>> {
    let pool = open_pool(&config.database.path, config.database.pool_size).await?;
    {
        let conn = pool.get().await?;
        initialize_database(&conn).await?;
    }
    Ok(Arc::new(DatabaseImpl::new_from_pool(pool)))
}

async fn monitor_command(database: &dyn Database, action: MonitorAction) -> Result<()> {
    match action {
        MonitorAction::Add { name, url, method, interval, threshold, timeout, integrations } => {
            let monitor = NewMonitor {
                name,
                url,
                method,
                interval_seconds: interval,
                threshold,
                timeout_seconds: timeout,
                integration_ids: integrations,
            };
            validation::validate_new_monitor(&monitor).to_result()?;

            let created = database.create_monitor(&monitor).await?;
            println!("Created monitor {} ({})", created.id, created.name);
        }
        MonitorAction::List => {
            let now_ms = unix_now_millis();
            let monitors = database.list_monitors().await?;
            if monitors.is_empty() {
                println!("No monitors configured");
            }
            for monitor in monitors {
                let slots = load_slots(database, &monitor, now_ms).await?;
                println!(
                    "{:>4}  {:<7} {}  {:<24} {}",
                    monitor.id,
                    MonitorStatus::of(&monitor),
                    sparkline(&slots),
                    monitor.name,
                    monitor.url
                );
            }
        }
        MonitorAction::Show { id } => {
            let Some(monitor) = database.get_monitor(id).await? else {
                bail!("monitor {id} not found");
            };
            print_monitor(&monitor);
        }
        MonitorAction::Update { id, patch } => {
            let patch = MonitorPatch::from(patch);
            validation::validate_monitor_patch(&patch).to_result()?;

            let updated = database.update_monitor(id, &patch).await?;
            print_monitor(&updated);
        }
    }
    Ok(())
}

async fn integration_command(database: &dyn Database, action: IntegrationAction) -> Result<()> {
    match action {
        IntegrationAction::Add { name, kind, url } => {
            let integration = NewIntegration { name, kind, url };
            validation::validate_new_integration(&integration).to_result()?;

            let created = database.create_integration(&integration).await?;
            println!("Created {} integration {} ({})", created.kind, created.id, created.name);
        }
        IntegrationAction::List { search } => {
            for integration in database.list_integrations(search.as_deref()).await? {
                println!(
                    "{:>4}  {:<8} {:<24} {}",
                    integration.id, integration.kind, integration.name, integration.url
                );
            }
        }
    }
    Ok(())
}

fn print_monitor(monitor: &Monitor) {
    println!("{} ({})", monitor.name, monitor.id);
    println!("  status:          {}", MonitorStatus::of(monitor));
    println!("  target:          {} {}", monitor.method, monitor.url);
    println!("  interval:        {}s", monitor.interval_seconds);
    println!("  timeout:         {}s", monitor.timeout_seconds);
    println!("  threshold:       {}", monitor.threshold);
    println!("  failed attempts: {}", monitor.failed_attempts);
    println!("  last run:        {}", format_time(monitor.last_run));
    let names: Vec<&str> = monitor.integrations.iter().map(|i| i.name.as_str()).collect();
    println!("  integrations:    {}", names.join(", "));
}

fn format_time(unix: i64) -> String {
    if unix <= 0 {
        return "never".to_string();
    }
    chrono::DateTime::from_timestamp(unix, 0)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| unix.to_string())
}

fn sparkline(slots: &[Slot]) -> String {
    slots
        .iter()
        .map(|slot| match (slot.monitoring_enabled, slot.healthy) {
            (false, _) => '·',
            (true, true) => '█',
            (true, false) => '▁',
        })
        .collect()
}

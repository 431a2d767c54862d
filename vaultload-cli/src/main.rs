use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vaultload_config::{ConfigLoader, LogLevel, VaultloadConfig};
use vaultload_loadtest::{build_client, HttpAttacker, MetricsPoller, StaticEndpoints};
use vaultload_server::{
    create_agent_app, create_coordinator_app, create_report_app, create_summary_app, serve,
    shutdown_signal, AgentContext, CoordinatorContext, OperationRunner, ReportStore,
    SummaryContext,
};

mod cli;
use cli::{AttackArgs, Cli, Commands, ConfigCommands, RunArgs};

/// Load configuration from file or environment
fn load_config(config_path: Option<&PathBuf>) -> Result<VaultloadConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                info!("Loading configuration from: {:?}", path);
                loader
                    .from_file(path)
                    .context(format!("Failed to load configuration from {:?}", path))
            } else {
                warn!("Configuration file not found: {:?}. Using defaults.", path);
                loader
                    .from_env()
                    .context("Failed to load configuration from environment")
            }
        }
        None => {
            debug!("No configuration file specified. Loading from environment or defaults.");
            loader
                .from_env()
                .context("Failed to load configuration from environment")
        }
    }
}

/// Initialize logging from the loaded configuration, honoring `--log-level`
fn init_logging(config: &VaultloadConfig, log_level: Option<&str>) -> Result<()> {
    let mut logging = config.logging.clone();
    if let Some(level) = log_level {
        logging.level = level
            .parse::<LogLevel>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    vaultload_logging::init_logging_from_config(&logging)
}

fn socket_addr(bind_address: &str, port: u16) -> Result<SocketAddr> {
    format!("{}:{}", bind_address, port)
        .parse()
        .context(format!("Invalid bind address {}:{}", bind_address, port))
}

/// Serve `app` until Ctrl+C or SIGTERM
async fn serve_until_signal(addr: SocketAddr, app: axum::Router) -> Result<()> {
    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));
    serve(addr, app, shutdown)
        .await
        .context(format!("Server on {} failed", addr))
}

async fn run_command(config: VaultloadConfig, operation: String, overrides: RunArgs) -> Result<()> {
    let request = overrides.into_request(operation);
    let (operation, config) = request.resolve(&config)?;

    let runner = OperationRunner::from_config(&config)?;
    let output = runner.run(operation, &config).await?;

    let body = output
        .to_json(config.server.redash)
        .context("Failed to serialize operation output")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&body).context("Failed to serialize operation output")?
    );
    Ok(())
}

async fn serve_command(config: VaultloadConfig, port: Option<u16>) -> Result<()> {
    let addr = socket_addr(&config.server.bind_address, port.unwrap_or(config.server.port))?;
    let runner = OperationRunner::from_config(&config)?;

    info!("Starting coordinator on {}", addr);
    let app = create_coordinator_app(CoordinatorContext::new(config, runner));
    serve_until_signal(addr, app).await
}

fn agent_context(config: &VaultloadConfig) -> Result<AgentContext> {
    let client = build_client(&config.http)?;
    Ok(AgentContext::new(Arc::new(HttpAttacker::new(client)), config))
}

async fn agent_command(config: VaultloadConfig, port: Option<u16>) -> Result<()> {
    let addr = socket_addr(&config.server.bind_address, port.unwrap_or(config.load.agent_port))?;

    info!("Starting load agent on {}", addr);
    let app = create_agent_app(agent_context(&config)?);
    serve_until_signal(addr, app).await
}

async fn attack_command(config: VaultloadConfig, args: AttackArgs) -> Result<()> {
    let job = args.into_job(&config.load);
    let ctx = agent_context(&config)?;

    let summary = ctx.run_job(&job).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to serialize metrics")?
    );

    let addr = socket_addr(&config.server.bind_address, config.server.report_port)?;
    info!("Serving attack report on {} until interrupted", addr);
    serve_until_signal(addr, create_report_app(ctx)).await
}

async fn aggregate_command(config: VaultloadConfig, port: Option<u16>) -> Result<()> {
    let addr = socket_addr(
        &config.server.bind_address,
        port.unwrap_or(config.server.report_port),
    )?;
    let source = Arc::new(StaticEndpoints::from_config(&config.load)?);
    let poller = MetricsPoller::new(build_client(&config.http)?);
    let reports = Arc::new(ReportStore::new());

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let polling = {
        let reports = reports.clone();
        let cancel = shutdown.clone();
        let period = config.load.poll_interval;
        tokio::spawn(async move {
            poller.run(source, period, reports.sender(), cancel).await;
        })
    };

    info!("Serving merged metrics on {}", addr);
    let app = create_summary_app(SummaryContext::new(reports, config.server.redash));
    let served = serve(addr, app, shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = polling.await {
        error!("Metrics poller stopped abnormally: {}", e);
    }
    served.context(format!("Server on {} failed", addr))
}

/// Handle configuration validation
fn handle_config_validate(config_file: &PathBuf) -> Result<()> {
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow::anyhow!(
            "Configuration file not found: {:?}",
            config_file
        ));
    }

    match load_config(Some(config_file)) {
        Ok(_config) => {
            println!("✅ Configuration file is valid");
            info!("Configuration validation passed");
            Ok(())
        }
        Err(e) => {
            println!("❌ Configuration validation failed: {}", e);
            error!("Configuration validation failed: {}", e);
            Err(e)
        }
    }
}

/// Handle configuration generation
fn handle_config_generate(output: &PathBuf, force: bool) -> Result<()> {
    info!("Generating sample configuration at: {:?}", output);

    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    fs::write(output, VaultloadConfig::generate_sample())
        .context(format!("Failed to write configuration to {:?}", output))?;

    println!("✅ Generated sample configuration: {:?}", output);
    Ok(())
}

/// Handle configuration display
fn handle_config_show(config: &VaultloadConfig, format: &str) -> Result<()> {
    let value = serde_json::to_value(config).context("Failed to serialize config")?;

    match format.to_lowercase().as_str() {
        "yaml" | "yml" => {
            let yaml_output =
                serde_yaml::to_string(&value).context("Failed to serialize to YAML")?;
            println!("{}", yaml_output);
        }
        "json" => {
            let json_output =
                serde_json::to_string_pretty(&value).context("Failed to serialize to JSON")?;
            println!("{}", json_output);
        }
        _ => {
            return Err(anyhow::anyhow!(
                "Unknown output format: {}. Valid formats: yaml, json",
                format
            ));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Validation and generation must work without a loadable config
    if let Some(Commands::Config { config_cmd }) = &cli.command {
        match config_cmd {
            ConfigCommands::Validate { config_file } => {
                vaultload_logging::init_simple_tracing(cli.log_level.as_deref().unwrap_or("info"))?;
                return handle_config_validate(config_file);
            }
            ConfigCommands::Generate { output, force } => {
                vaultload_logging::init_simple_tracing(cli.log_level.as_deref().unwrap_or("info"))?;
                return handle_config_generate(output, *force);
            }
            ConfigCommands::Show { .. } => {}
        }
    }

    let config = load_config(cli.config.as_ref())?;
    init_logging(&config, cli.log_level.as_deref())?;

    match cli.command {
        Some(Commands::Run {
            operation,
            overrides,
        }) => run_command(config, operation, overrides).await,
        Some(Commands::Serve { port }) => serve_command(config, port).await,
        Some(Commands::Agent { port }) => agent_command(config, port).await,
        Some(Commands::Attack(args)) => attack_command(config, args).await,
        Some(Commands::Aggregate { port }) => aggregate_command(config, port).await,
        Some(Commands::Config {
            config_cmd: ConfigCommands::Show { format },
        }) => handle_config_show(&config, &format),
        Some(Commands::Config { .. }) => Ok(()),
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

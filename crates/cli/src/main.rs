mod config_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::bail,
    clap::{Parser, Subcommand},
    lcbot_config::{BotConfig, Severity},
    lcbot_platform::{HttpPlatformClient, OAuthClient, TokenStore},
    lcbot_routing::{BotManager, ManagerConfig},
    tracing::{debug, error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "lcbot", about = "lcbot: LiveChat onboarding bot", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of lcbot.{toml,yaml,yml,json}).
    #[arg(long, global = true, env = "LCBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server (default when no subcommand is provided).
    Serve,
    /// Validate the configuration file and report errors/warnings.
    CheckConfig {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the config, applying `--bind`/`--port` on top.
fn load_config(cli: &Cli) -> anyhow::Result<BotConfig> {
    let mut config = match cli.config {
        Some(ref path) => lcbot_config::load_config(path)?,
        None => lcbot_config::discover_and_load(),
    };
    if let Some(ref bind) = cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

async fn serve(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;

    let report = lcbot_config::validate_config(&config);
    for d in &report.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => debug!(path = %d.path, "{}", d.message),
        }
    }
    if report.has_errors() {
        bail!(
            "configuration has {} error(s); run `lcbot check-config` for details",
            report.count(Severity::Error)
        );
    }

    let tokens = match config.credentials.access_token {
        Some(ref token) => TokenStore::with_token(token.clone()),
        None => {
            info!("no access token configured, waiting for the OAuth callback");
            TokenStore::new()
        },
    };

    let client = HttpPlatformClient::new(
        config.platform.api_url.clone(),
        config.credentials.client_id.clone(),
        config.platform.request_timeout(),
        tokens.clone(),
    )?;
    let oauth = OAuthClient::new(
        client.http().clone(),
        config.platform.accounts_url.clone(),
        config.credentials.client_id.clone(),
        config.credentials.client_secret.clone(),
        config.credentials.redirect_uri.clone(),
    );
    let manager = BotManager::new(
        Arc::new(client),
        tokens,
        ManagerConfig::from_config(&config),
    )
    .with_oauth(oauth);

    lcbot_gateway::start_gateway(&config, Arc::new(manager)).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    match cli.command {
        None | Some(Commands::Serve) => {
            info!(version = env!("CARGO_PKG_VERSION"), "lcbot starting");
            serve(&cli).await
        },
        Some(Commands::CheckConfig { verbose }) => {
            config_commands::check(cli.config.as_deref(), verbose)
        },
    }
}

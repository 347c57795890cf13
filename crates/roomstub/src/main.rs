use std::env;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use roomstub::config::{AppConfig, DEFAULT_CONFIG_FILE, HttpServerConfig, WsServerConfig};
use roomstub::{HttpServer, MatchPolicy, ServerHandle, WsServer};

#[derive(Debug, Parser)]
#[command(
    name = "roomstub",
    version,
    about = "Scripted WebSocket and HTTP stand-in for a chat room service.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Config file path (defaults to ./roomstub.toml when present)
    #[arg(long, value_name = "PATH", env = "ROOMSTUB_CONFIG", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the WebSocket playback server
    Ws(WsArgs),
    /// Run the static HTTP endpoint
    Http(HttpArgs),
    /// Run both servers with the configured settings
    Serve,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
}

#[derive(Debug, Args)]
struct WsArgs {
    /// Address to bind to
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
    /// Playbook fixture file
    #[arg(short, long, value_name = "PATH")]
    fixture: Option<PathBuf>,
    /// How to treat messages that do not match the scripted trigger
    #[arg(long, value_enum)]
    match_policy: Option<MatchPolicy>,
}

impl WsArgs {
    fn apply(self, config: &mut WsServerConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(fixture) = self.fixture {
            config.fixture = fixture;
        }
        if let Some(policy) = self.match_policy {
            config.match_policy = policy;
        }
    }
}

#[derive(Debug, Args)]
struct HttpArgs {
    /// Address to bind to
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
    /// JSON document served from the rooms endpoint
    #[arg(short, long, value_name = "PATH")]
    fixture: Option<PathBuf>,
}

impl HttpArgs {
    fn apply(self, config: &mut HttpServerConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(fixture) = self.fixture {
            config.fixture = fixture;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.common);

    let mut config = load_config(&cli.common)?;

    match cli.command {
        Command::Ws(args) => {
            args.apply(&mut config.ws);
            let server = start_ws(config.ws).await?;
            run_until_shutdown(vec![server]).await
        }
        Command::Http(args) => {
            args.apply(&mut config.http);
            let server = start_http(config.http).await?;
            run_until_shutdown(vec![server]).await
        }
        Command::Serve => {
            // Load both fixtures before binding anything.
            let ws = WsServer::new(config.ws).context("loading websocket playbook")?;
            let http = HttpServer::new(config.http).context("loading HTTP fixture")?;
            let servers = vec![
                ws.start().await.context("starting websocket server")?,
                http.start().await.context("starting HTTP server")?,
            ];
            run_until_shutdown(servers).await
        }
        Command::Config {
            command: ConfigCommand::Show,
        } => {
            print!("{}", config.to_toml().context("serializing config to TOML")?);
            Ok(())
        }
    }
}

fn init_logging(common: &CommonOpts) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let level = if common.quiet {
        "error"
    } else {
        match common.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("roomstub={level},tower_http={level}")));

    if common.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .ok();
    } else {
        let disable_color = env::var_os("NO_COLOR").is_some() || !io::stderr().is_terminal();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_ansi(!disable_color),
            )
            .try_init()
            .ok();
    }
}

fn load_config(common: &CommonOpts) -> Result<AppConfig> {
    let path = match &common.config {
        Some(path) if !path.exists() => bail!("config file not found: {}", path.display()),
        Some(path) => path.clone(),
        None => PathBuf::from(DEFAULT_CONFIG_FILE),
    };
    AppConfig::load(&path).with_context(|| format!("loading config from {}", path.display()))
}

async fn start_ws(config: WsServerConfig) -> Result<ServerHandle> {
    let server = WsServer::new(config).context("loading websocket playbook")?;
    server.start().await.context("starting websocket server")
}

async fn start_http(config: HttpServerConfig) -> Result<ServerHandle> {
    let server = HttpServer::new(config).context("loading HTTP fixture")?;
    server.start().await.context("starting HTTP server")
}

async fn run_until_shutdown(servers: Vec<ServerHandle>) -> Result<()> {
    shutdown_signal().await?;
    info!("Shutdown signal received");

    for server in servers {
        server.stop().await.context("stopping server")?;
    }
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate =
            signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("waiting for Ctrl+C")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;

    Ok(())
}

//! Main entry point for CLI command to start the upload server.

use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::configuration::Configuration;
use crate::configuration::generate_config_schema;
use crate::demo::DemoExecutor;
use crate::server;

/// Options for the upload server
#[derive(Parser, Debug)]
#[command(
    name = "upload-server",
    about = "GraphQL server accepting multipart file uploads",
    version
)]
struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[arg(long = "log", default_value = "info", env = "UPLOAD_SERVER_LOG")]
    log_level: String,

    /// Configuration file, YAML.
    #[arg(short, long = "config", env = "UPLOAD_SERVER_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Overrides `server.listen` from the configuration.
    #[arg(long, env = "UPLOAD_SERVER_LISTEN")]
    listen: Option<SocketAddr>,

    /// Prints the configuration schema.
    #[arg(long)]
    schema: bool,

    /// Prints the GraphQL schema served by the demo executor.
    #[arg(long)]
    sdl: bool,
}

/// Parses the command line, sets up logging and serves the demo schema until
/// ctrl-c.
pub fn main() -> Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(nb) = std::env::var("UPLOAD_SERVER_NUM_CORES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        builder.worker_threads(nb);
    }
    let runtime = builder.build()?;
    runtime.block_on(start(Opt::parse()))
}

async fn start(opt: Opt) -> Result<()> {
    if opt.schema {
        let schema = generate_config_schema();
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }
    if opt.sdl {
        print!("{}", DemoExecutor::sdl());
        return Ok(());
    }

    // RUST_LOG wins over --log so a single module can be turned up.
    let env_filter = std::env::var("RUST_LOG").ok().unwrap_or(opt.log_level);
    let builder = tracing_subscriber::fmt::fmt().with_env_filter(
        EnvFilter::try_new(&env_filter).context("could not parse log configuration")?,
    );
    if std::io::stdout().is_terminal() {
        builder.init();
    } else {
        builder.json().init();
    }

    let mut configuration = match &opt.config_path {
        Some(path) => {
            let path = if path.is_relative() {
                std::env::current_dir()?.join(path)
            } else {
                path.clone()
            };
            tracing::info!(path = %path.display(), "loading configuration");
            Configuration::from_file(&path)?
        }
        None => Configuration::default(),
    };
    if let Some(listen) = opt.listen {
        configuration.server.listen = listen;
    }

    let executor = DemoExecutor::new().map_err(|err| anyhow!(err))?;
    let listener = TcpListener::bind(configuration.server.listen)
        .await
        .with_context(|| format!("could not listen on {}", configuration.server.listen))?;

    tracing::info!(
        "upload-server v{} // GraphQL multipart uploads",
        std::env!("CARGO_PKG_VERSION")
    );
    let router = server::router(&configuration, executor);
    server::serve(listener, router, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("could not listen for ctrl-c: {err}");
        }
        tracing::info!("shutting down");
    })
    .await?;
    Ok(())
}

//! Layered application configuration.
//!
//! Priority: CLI flag > CLI env var > config file > defaults, with
//! `CHENGE_`-prefixed environment variables (e.g. `CHENGE_SERVER__PORT`)
//! layered in through the `config` crate.

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Command-line options.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Base URL of the finance backend
    #[arg(long, env = "BACKEND_BASE_URL")]
    pub backend_url: Option<String>,
}

/// Fully resolved configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Listener settings.
    pub server: ServerConfig,
    /// Finance backend settings.
    pub backend: BackendConfig,
}

/// Where the advisor front end listens.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Port to bind.
    pub port: u16,
    /// Host/interface to bind.
    pub host: String,
}

/// The finance backend this crate talks to.
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
}

impl AppConfig {
    /// Load from process arguments and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Load with explicit arguments (test seam).
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "127.0.0.1")?
            // The finance backend's default address.
            .set_default("backend.base_url", "http://127.0.0.1:5000")?;

        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        } else if Path::new("config.yaml").exists() {
            builder = builder.add_source(File::with_name("config.yaml"));
        }

        builder = builder.add_source(
            Environment::with_prefix("CHENGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(url) = cli.backend_url {
            builder = builder.set_override("backend.base_url", url)?;
        }

        builder.build()?.try_deserialize()
    }
}

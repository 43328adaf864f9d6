use std::{fs, net::SocketAddr, path::PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

mod log;

pub(crate) use log::{LogLevel, LogStyle};

use crate::config::ServerConfig;

#[derive(Debug, Parser)]
#[command(name = "graphql-view-server", version)]
/// Serves a mock GraphQL schema over HTTP
pub(crate) struct Args {
    /// IP address on which the server will listen for incoming connections. Defaults to 127.0.0.1:4000.
    #[arg(short, long, env = "GRAPHQL_VIEW_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,
    /// Path to the TOML configuration file
    #[arg(long, short, env = "GRAPHQL_VIEW_CONFIG_PATH")]
    pub config: Option<PathBuf>,
    /// The mock schema to serve
    #[arg(long, value_enum, default_value_t = SchemaKind::HelloWorld)]
    pub schema: SchemaKind,
    /// Set the logging level
    #[arg(long = "log", env = "GRAPHQL_VIEW_LOG", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
    /// Set the style of log output
    #[arg(long, env = "GRAPHQL_VIEW_LOG_STYLE", default_value_t = LogStyle::Text)]
    pub log_style: LogStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SchemaKind {
    /// Greetings, a mutation and a subscription
    HelloWorld,
    /// Resolvers suspending before answering, executed asynchronously
    Async,
}

impl Args {
    /// The configuration file content, or the defaults without a file.
    pub fn config(&self) -> anyhow::Result<ServerConfig> {
        let Some(path) = &self.config else {
            return Ok(ServerConfig::default());
        };

        let content = fs::read_to_string(path).with_context(|| format!("error reading {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("error parsing {}", path.display()))
    }

    /// The command line argument wins over the configuration file.
    pub fn listen_address(&self, config: &ServerConfig) -> SocketAddr {
        self.listen_address.unwrap_or(config.listen_address)
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.log_level.as_filter_str()));
        let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

        match self.log_style {
            LogStyle::Text => subscriber.init(),
            LogStyle::Json => subscriber.json().init(),
        }
    }
}

pub(crate) fn parse() -> Args {
    Args::parse()
}

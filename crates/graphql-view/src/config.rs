use std::{path::PathBuf, time::Duration};

use duration_str::deserialize_duration;
use serde_json::{Map, Value};

pub const DEFAULT_PATH: &str = "/graphql";
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(86400);
pub const DEFAULT_REQUEST_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read the explorer template at {}: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Settings of a view that can be read from a configuration file.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewSettings {
    /// Route the view is mounted on
    pub path: String,
    /// Always indent JSON responses
    pub pretty: bool,
    /// Accept JSON arrays of operations
    pub batch: bool,
    /// Run deferred operations of a batch concurrently
    pub async_enabled: bool,
    /// Value of `Access-Control-Max-Age` for accepted preflight requests
    #[serde(deserialize_with = "deserialize_duration")]
    pub max_age: Duration,
    /// Maximum size of a request body, in bytes
    pub request_body_limit: usize,
    pub explorer: ExplorerSettings,
    /// Engine specific options, forwarded with every operation
    pub execution_options: Map<String, Value>,
}

impl Default for ViewSettings {
    fn default() -> Self {
        ViewSettings {
            path: DEFAULT_PATH.to_owned(),
            pretty: false,
            batch: false,
            async_enabled: true,
            max_age: DEFAULT_MAX_AGE,
            request_body_limit: DEFAULT_REQUEST_BODY_LIMIT,
            explorer: ExplorerSettings::default(),
            execution_options: Map::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplorerSettings {
    /// Serve GraphiQL to browsers
    pub enabled: bool,
    /// GraphiQL version loaded from the CDN
    pub version: Option<String>,
    /// A template replacing the built-in page
    pub template_path: Option<PathBuf>,
    /// Subscriptions endpoint given to GraphiQL
    pub subscriptions: Option<String>,
}

impl ExplorerSettings {
    pub(crate) fn load_template(&self) -> Result<Option<String>, ConfigError> {
        let Some(path) = &self.template_path else {
            return Ok(None);
        };

        std::fs::read_to_string(path)
            .map(Some)
            .map_err(|source| ConfigError::Template {
                path: path.clone(),
                source,
            })
    }
}

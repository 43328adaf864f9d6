use std::net::SocketAddr;

use graphql_view::ViewSettings;

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerConfig {
    pub listen_address: SocketAddr,
    pub graphql: ViewSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_address: SocketAddr::from(([127, 0, 0, 1], 4000)),
            graphql: ViewSettings::default(),
        }
    }
}

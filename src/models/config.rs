//! Configuration model loaded from external sources.

use serde::Deserialize;

use crate::planner::graph::DEFAULT_GRAPH_BASE_URL;

fn default_graph_base_url() -> String {
    DEFAULT_GRAPH_BASE_URL.to_string()
}

#[derive(Clone, Debug, Deserialize)]
/// Settings read at startup and shared with the handlers.
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Serve built-in leads and keep planner data in memory.
    #[serde(default)]
    pub demo: bool,
    /// Lead feed endpoint. Listing leads needs it unless `demo` is set.
    #[serde(default)]
    pub leads_api_url: Option<String>,
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
    #[serde(default)]
    pub graph_access_token: Option<String>,
    /// Written into reminder tasks when the request carries no context URL.
    pub leads_page_url: String,
}

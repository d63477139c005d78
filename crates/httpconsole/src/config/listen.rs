//! Listener configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally visible port used in absolute URLs (bucket locations,
    /// redirect hops), when the service sits behind a port mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_mask: Option<u16>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            port_mask: None,
        }
    }
}

impl ListenConfig {
    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Port advertised to clients.
    pub fn public_port(&self) -> u16 {
        self.port_mask.unwrap_or(self.port)
    }
}

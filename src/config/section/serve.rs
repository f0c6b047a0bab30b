//! `[serve]` section configuration.
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # 0.0.0.0 makes the server reachable from LAN
//! port = 3000                 # HTTP port
//! reload_port = 35729         # WebSocket port for live reload
//! open = true                 # open a browser once serving
//! ```

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    pub interface: IpAddr,

    /// HTTP port. The next free port is used when taken.
    pub port: u16,

    /// Live reload WebSocket port.
    pub reload_port: u16,

    /// Open the browser after the server starts.
    pub open: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            reload_port: 35729,
            open: true,
        }
    }
}

impl ServeConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.port == 0 {
            diag.error("serve.port", "port must be non-zero");
        }
        if self.reload_port == 0 {
            diag.error("serve.reload_port", "port must be non-zero");
        }
        if self.port == self.reload_port && self.port != 0 {
            diag.error_with_hint(
                "serve.reload_port",
                format!("reload port {} is the same as the HTTP port", self.reload_port),
                "pick a different port for live reload",
            );
        }
    }
}

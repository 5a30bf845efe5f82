/// Comm module configuration
#[derive(Debug, Clone)]
pub struct CommConfig {
    /// Name reported in `serverInfo`
    pub server_name: String,
    /// Version reported in `serverInfo`
    pub server_version: String,
    /// Protocol version offered when the client does not ask for one
    pub protocol_version: String,
    /// Maximum size of one inbound line in bytes (default: 1 MiB)
    pub max_line_bytes: usize,
    /// Capacity of the outbound response queue (default: 256)
    pub outbound_capacity: usize,
}

impl Default for CommConfig {
    fn default() -> Self {
        Self {
            server_name: "terminal_server".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: "2024-11-05".to_string(),
            max_line_bytes: 1024 * 1024,
            outbound_capacity: 256,
        }
    }
}

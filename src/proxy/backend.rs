use crate::types::ProxyMode;

/// Catch-all backend for http traffic no rule selected
pub const DENY_BACKEND: &str = "bk_deny_all";

/// A proxied target: one health-checked server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    name: String,
    mode: ProxyMode,
    host: String,
    port: u16,
    /// Service map row the backend comes from, used as the server index
    row: usize,
}

impl Backend {
    pub fn new(name: impl Into<String>, mode: ProxyMode, host: &str, port: u16, row: usize) -> Self {
        Self {
            name: name.into(),
            mode,
            host: host.to_string(),
            port,
            row,
        }
    }

    /// `bk_<host>_<port>` with dots in the host replaced
    pub fn base_name(host: &str, port: u16) -> String {
        format!("bk_{}_{}", host.replace('.', "_"), port)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ProxyMode {
        self.mode
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn server_line(&self) -> String {
        format!("server srv{} {}:{} check", self.row, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(Backend::base_name("10.0.0.5", 8080), "bk_10_0_0_5_8080");
    }

    #[test]
    fn test_server_line() {
        let backend = Backend::new("bk_10_0_0_5_8080", ProxyMode::Http, "10.0.0.5", 8080, 3);
        assert_eq!(backend.server_line(), "server srv3 10.0.0.5:8080 check");
    }
}

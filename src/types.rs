use std::fmt;

/// Target address meaning "answer with a redirect to the secure port".
pub const REDIRECT_SENTINEL: &str = "REDIRECT443";

/// Wildcard token for Accept/Reject lists
pub const WILDCARD_TOKEN: &str = "ALL";

/// Reserved Reject-list token expanded into the rogue country set
pub const ROGUE_TOKEN: &str = "ROGUE";

/// HAProxy proxy mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyMode {
    Http,
    Tcp,
}

impl ProxyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMode::Http => "http",
            ProxyMode::Tcp => "tcp",
        }
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service type column of the service map.
///
/// Only `http` is proxied in http mode; every other type (`ssh`, `pgsql`, ...)
/// is a tcp passthrough service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceType {
    Http,
    Tcp(String),
}

impl ServiceType {
    /// Parse a service type, case-insensitive. Returns `None` for an empty value.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        match value.as_str() {
            "" => None,
            "http" => Some(ServiceType::Http),
            _ => Some(ServiceType::Tcp(value)),
        }
    }

    pub fn mode(&self) -> ProxyMode {
        match self {
            ServiceType::Http => ProxyMode::Http,
            ServiceType::Tcp(_) => ProxyMode::Tcp,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServiceType::Http => "http",
            ServiceType::Tcp(name) => name,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a service row sends its traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A live server behind a backend
    Server { host: String, port: u16 },
    /// No server: requests are redirected to https
    RedirectToHttps,
}

/// One row of the service map
#[derive(Debug, Clone)]
pub struct ServiceRule {
    /// 0-based data row index (used in backend names and error reports)
    pub row: usize,
    pub enabled: bool,
    pub service_type: ServiceType,
    /// Frontend (listener) port
    pub port: u16,
    pub target: Target,
    pub sni: Option<String>,
    /// Upper-cased Accept tokens, in input order
    pub accept: Vec<String>,
    /// Upper-cased Reject tokens, in input order
    pub reject: Vec<String>,
}

impl ServiceRule {
    /// Create an enabled rule with empty Accept/Reject lists
    pub fn new(row: usize, service_type: ServiceType, port: u16, target: Target) -> Self {
        Self {
            row,
            enabled: true,
            service_type,
            port,
            target,
            sni: None,
            accept: Vec::new(),
            reject: Vec::new(),
        }
    }

    pub fn with_sni(mut self, sni: impl Into<String>) -> Self {
        self.sni = Some(sni.into());
        self
    }

    pub fn with_accept<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accept = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reject<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reject = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

//! ACL conditions.
//!
//! A raw Accept/Reject token is classified into a [`Condition`], which knows
//! its canonical ACL name and how to render its `acl` definition line.

mod registry;

pub use registry::AclRegistry;

use std::fmt::{self, Write as _};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ProxyMode;

/// Two uppercase letters: a geo-IP country code
static COUNTRY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{2}$").expect("COUNTRY_PATTERN: hardcoded regex is invalid")
});

/// Dotted quad. Octet ranges are not checked.
static IPV4_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+\.\d+$").expect("IPV4_PATTERN: hardcoded regex is invalid")
});

/// What an SNI condition is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SniFlavor {
    /// Selects a backend
    Route,
    /// Guards an https redirect
    Redirect,
}

/// A named boolean match predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Source address inside a country's network list (`<CODE>.cidr`)
    Geo { code: String },
    /// Source address equal to an IPv4 literal
    Ipv4 { addr: String },
    /// Exact hostname: Host header in http mode, TLS SNI in tcp mode
    Hostname { host: String, mode: ProxyMode },
    /// Hostname from the SNI column, matched on its prefix in http mode
    Sni {
        host: String,
        mode: ProxyMode,
        flavor: SniFlavor,
    },
}

impl Condition {
    /// Classify a raw token. Never fails: anything that is not a country code
    /// or an IPv4 literal is a hostname.
    pub fn classify(token: &str, mode: ProxyMode) -> Self {
        let token = token.trim();
        if COUNTRY_PATTERN.is_match(token) {
            Condition::Geo {
                code: token.to_string(),
            }
        } else if IPV4_PATTERN.is_match(token) {
            Condition::Ipv4 {
                addr: token.to_string(),
            }
        } else {
            Condition::Hostname {
                host: token.to_lowercase(),
                mode,
            }
        }
    }

    /// SNI condition for a hostname taken from the SNI column
    pub fn sni(host: &str, mode: ProxyMode, flavor: SniFlavor) -> Self {
        Condition::Sni {
            host: host.trim().to_lowercase(),
            mode,
            flavor,
        }
    }

    /// Whether a token is a two-letter country code
    pub fn is_country_code(token: &str) -> bool {
        COUNTRY_PATTERN.is_match(token)
    }

    /// Canonical ACL name, a pure function of the condition's kind and value
    pub fn name(&self) -> String {
        match self {
            Condition::Geo { code } => format!("acl_geo_{}", code),
            Condition::Ipv4 { addr } => format!("acl_ip_{}", addr.replace('.', "_")),
            Condition::Hostname { host, .. } => format!("acl_dns_{}", sanitize(host)),
            Condition::Sni {
                host,
                flavor: SniFlavor::Route,
                ..
            } => format!("acl_sni_{}", sanitize(host)),
            Condition::Sni {
                host,
                flavor: SniFlavor::Redirect,
                ..
            } => format!("acl_redirect_{}", sanitize(host)),
        }
    }

    /// The `acl` definition line, without indentation
    pub fn definition(&self, cidr_dir: &Path) -> String {
        let name = self.name();
        match self {
            Condition::Geo { code } => {
                let cidr_file = cidr_dir.join(format!("{}.cidr", code));
                format!("acl {} src -f {}", name, cidr_file.display())
            }
            Condition::Ipv4 { addr } => format!("acl {} src {}", name, addr),
            Condition::Hostname {
                host,
                mode: ProxyMode::Http,
            } => format!("acl {} hdr(host) -i {}", name, host),
            Condition::Sni {
                host,
                mode: ProxyMode::Http,
                ..
            } => format!("acl {} hdr_beg(host) -i {}", name, host),
            Condition::Hostname {
                host,
                mode: ProxyMode::Tcp,
            }
            | Condition::Sni {
                host,
                mode: ProxyMode::Tcp,
                ..
            } => format!("acl {} req.ssl_sni -i {}", name, host),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Geo { code } => write!(f, "country {}", code),
            Condition::Ipv4 { addr } => write!(f, "address {}", addr),
            Condition::Hostname { host, .. } => write!(f, "host {}", host),
            Condition::Sni {
                host,
                flavor: SniFlavor::Route,
                ..
            } => write!(f, "sni {}", host),
            Condition::Sni {
                host,
                flavor: SniFlavor::Redirect,
                ..
            } => write!(f, "redirect sni {}", host),
        }
    }
}

/// Encode a hostname into ACL name characters.
///
/// Letters, digits and `-` are kept and `.` becomes `_`. Any other character
/// is written as `.<hex code point>.`; a raw `.` never survives, so distinct
/// hosts always get distinct names.
fn sanitize(host: &str) -> String {
    let mut out = String::with_capacity(host.len());
    for c in host.chars() {
        match c {
            c if c.is_ascii_alphanumeric() || c == '-' => out.push(c),
            '.' => out.push('_'),
            c => {
                let _ = write!(out, ".{:x}.", c as u32);
            }
        }
    }
    out
}

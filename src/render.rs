//! HAProxy configuration rendering.
//!
//! Output order is fixed: backend stanzas, frontend stanzas, then the
//! catch-all deny backend.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::Result;
use crate::proxy::{Backend, Frontend, ProxyConfig, DENY_BACKEND};
use crate::types::ProxyMode;

/// Default directory of the `<CODE>.cidr` network lists
pub const DEFAULT_CIDR_DIR: &str = "cidr_maps";

/// Default certificate directory for TLS-terminating listeners
pub const DEFAULT_CERT_DIR: &str = "/etc/haproxy/certs/";

/// Default TLS port
pub const DEFAULT_TLS_PORT: u16 = 443;

/// Stateless ACME http-01 responder; `ACCOUNT_THUMBPRINT` comes from HAProxy's environment.
const ACME_CHALLENGE_RESPONSE: &str = "http-request return status 200 content-type text/plain \
     lf-string \"%[path,field(-1,/)].${ACCOUNT_THUMBPRINT}\\n\" \
     if { path_beg '/.well-known/acme-challenge/' }";

/// Rendering options.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Directory referenced by geo ACLs
    pub cidr_dir: PathBuf,
    /// Certificate directory for the TLS bind line
    pub cert_dir: PathBuf,
    /// Http frontends on this port terminate TLS
    pub tls_port: u16,
    /// Answer ACME challenges on the TLS port
    pub acme_challenge: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            cidr_dir: PathBuf::from(DEFAULT_CIDR_DIR),
            cert_dir: PathBuf::from(DEFAULT_CERT_DIR),
            tls_port: DEFAULT_TLS_PORT,
            acme_challenge: true,
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cidr_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cidr_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_cert_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cert_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_tls_port(mut self, port: u16) -> Self {
        self.tls_port = port;
        self
    }

    pub fn with_acme_challenge(mut self, enabled: bool) -> Self {
        self.acme_challenge = enabled;
        self
    }
}

/// Render the whole configuration
pub fn render(config: &ProxyConfig, options: &RenderOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Generated by haconf. Do not edit by hand.");
    let _ = writeln!(out);

    for backend in config.backends() {
        render_backend(&mut out, backend);
    }
    for frontend in config.frontends() {
        render_frontend(&mut out, frontend, options);
    }
    render_deny_backend(&mut out);

    out
}

fn render_backend(out: &mut String, backend: &Backend) {
    let _ = writeln!(out, "backend    {}", backend.name());
    let _ = writeln!(out, "    mode   {}", backend.mode());
    let _ = writeln!(out, "    {}", backend.server_line());
    let _ = writeln!(out);
}

fn render_frontend(out: &mut String, frontend: &Frontend, options: &RenderOptions) {
    let _ = writeln!(out, "#    ------ Frontend -----");
    let _ = writeln!(out, "frontend   {}", frontend.name());
    let _ = writeln!(out, "    mode   {}", frontend.mode());

    if frontend.mode() == ProxyMode::Http && frontend.port() == options.tls_port {
        let _ = writeln!(
            out,
            "    bind *:{} ssl crt {} strict-sni",
            frontend.port(),
            options.cert_dir.display()
        );
        if options.acme_challenge {
            let _ = writeln!(out, "    {}", ACME_CHALLENGE_RESPONSE);
        }
    } else {
        let _ = writeln!(out, "    bind *:{}", frontend.port());
    }

    let _ = writeln!(out, "#    -------- ACLs -------");
    for definition in frontend.acls().definitions(&options.cidr_dir) {
        let _ = writeln!(out, "    {}", definition);
    }

    let _ = writeln!(out, "#    ------- Rules -------");
    for rule in frontend.rules() {
        let _ = writeln!(out, "    {}", rule);
    }
    let _ = writeln!(out);
}

fn render_deny_backend(out: &mut String) {
    let _ = writeln!(out, "backend    {}", DENY_BACKEND);
    let _ = writeln!(out, "    mode   http");
    let _ = writeln!(out, "    http-request deny deny_status 403");
}

/// Write `contents` to `path` atomically.
///
/// The data goes to a temporary file in the destination directory which is
/// then renamed over `path`; on failure `path` is left untouched.
pub fn write_atomic(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::geo::RogueSet;
    use crate::types::{ServiceRule, ServiceType, Target};

    fn sample_config() -> ProxyConfig {
        let rules = vec![
            ServiceRule::new(
                0,
                ServiceType::Http,
                443,
                Target::Server {
                    host: "10.0.0.5".into(),
                    port: 8080,
                },
            )
            .with_sni("shop.example.com")
            .with_accept(["IT"]),
            ServiceRule::new(
                1,
                ServiceType::Tcp("ssh".into()),
                22,
                Target::Server {
                    host: "10.0.0.9".into(),
                    port: 22,
                },
            )
            .with_accept(["ALL"])
            .with_reject(["CN"]),
        ];
        compile(&rules, &RogueSet::empty()).unwrap()
    }

    #[test]
    fn test_render_layout() {
        let text = render(&sample_config(), &RenderOptions::default());
        let expected = "\
# Generated by haconf. Do not edit by hand.

backend    bk_10_0_0_5_8080
    mode   http
    server srv0 10.0.0.5:8080 check

backend    bk_10_0_0_9_22
    mode   tcp
    server srv1 10.0.0.9:22 check

#    ------ Frontend -----
frontend   http_443_http
    mode   http
    bind *:443 ssl crt /etc/haproxy/certs/ strict-sni
    http-request return status 200 content-type text/plain lf-string \"%[path,field(-1,/)].${ACCOUNT_THUMBPRINT}\\n\" if { path_beg '/.well-known/acme-challenge/' }
#    -------- ACLs -------
    acl acl_sni_shop_example_com hdr_beg(host) -i shop.example.com
    acl acl_geo_IT src -f cidr_maps/IT.cidr
#    ------- Rules -------
    use_backend bk_10_0_0_5_8080 if acl_sni_shop_example_com and acl_geo_IT
    default_backend bk_deny_all

#    ------ Frontend -----
frontend   ssh_22_tcp
    mode   tcp
    bind *:22
#    -------- ACLs -------
    acl acl_geo_CN src -f cidr_maps/CN.cidr
#    ------- Rules -------
    use_backend bk_10_0_0_9_22 if not acl_geo_CN

backend    bk_deny_all
    mode   http
    http-request deny deny_status 403
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_options() {
        let options = RenderOptions::new()
            .with_cidr_dir("/srv/geo")
            .with_cert_dir("/certs")
            .with_acme_challenge(false);
        let text = render(&sample_config(), &options);
        assert!(text.contains("bind *:443 ssl crt /certs strict-sni"));
        assert!(!text.contains("acme-challenge"));
        assert!(text.contains("acl acl_geo_IT src -f /srv/geo/IT.cidr"));
    }

    #[test]
    fn test_tls_port_applies_to_http_only() {
        let options = RenderOptions::new().with_tls_port(22);
        let text = render(&sample_config(), &options);
        assert!(text.contains("    bind *:22\n"));
        assert!(text.contains("    bind *:443\n"));
    }

    #[test]
    fn test_empty_config_still_has_deny_backend() {
        let text = render(&ProxyConfig::new(), &RenderOptions::default());
        assert!(text.ends_with("http-request deny deny_status 403\n"));
    }

    #[test]
    fn test_write_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("haproxy.cfg");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, "new contents\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new contents\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}

//! In-memory proxy model.
//!
//! [`ProxyConfig`] is the build context of a run: rows are folded into it in
//! input order and the renderer reads it back. Every map is insertion-ordered
//! so the rendered artifact is reproducible.

mod backend;
mod frontend;
mod rule;

pub use backend::{Backend, DENY_BACKEND};
pub use frontend::Frontend;
pub use rule::{compose, BackendRoute, Predicate, RoutingRule};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::types::{ProxyMode, ServiceType};

/// Frontends and backends of one generated configuration
#[derive(Debug, Default)]
pub struct ProxyConfig {
    frontends: IndexMap<(ServiceType, u16), Frontend>,
    backends: IndexMap<String, Backend>,
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the frontend for (service type, port), creating it on first use.
    pub fn frontend_mut(&mut self, service_type: &ServiceType, port: u16) -> &mut Frontend {
        let key = (service_type.clone(), port);
        if !self.frontends.contains_key(&key) {
            if let Some(other) = self
                .frontends
                .values()
                .find(|fe| fe.port() == port && fe.service_type() != service_type)
            {
                warn!(
                    "Port {} is already bound by frontend {}, {} will bind it too",
                    port,
                    other.name(),
                    service_type
                );
            }
            debug!("Registering frontend {}_{}", service_type, port);
        }
        self.frontends
            .entry(key)
            .or_insert_with(|| Frontend::new(service_type.clone(), port))
    }

    /// Register a backend for a service row and return its name.
    ///
    /// Rows never share a backend: a taken name gets the row index appended,
    /// then a counter if that is taken too (`a_80:2` is also `bk_a_80_2`).
    pub fn register_backend(&mut self, row: usize, mode: ProxyMode, host: &str, port: u16) -> String {
        let base = Backend::base_name(host, port);
        let mut name = base.clone();
        let mut attempt = 0usize;
        while self.backends.contains_key(&name) {
            name = if attempt == 0 {
                format!("{}_{}", base, row)
            } else {
                format!("{}_{}_{}", base, row, attempt)
            };
            attempt += 1;
        }

        debug!("Registering backend {} for row {}", name, row);
        self.backends
            .insert(name.clone(), Backend::new(name.clone(), mode, host, port, row));
        name
    }

    pub fn frontend(&self, service_type: &ServiceType, port: u16) -> Option<&Frontend> {
        self.frontends.get(&(service_type.clone(), port))
    }

    pub fn backend(&self, name: &str) -> Option<&Backend> {
        self.backends.get(name)
    }

    /// Frontends in registration order
    pub fn frontends(&self) -> impl Iterator<Item = &Frontend> {
        self.frontends.values()
    }

    /// Backends in registration order
    pub fn backends(&self) -> impl Iterator<Item = &Backend> {
        self.backends.values()
    }

    pub fn frontend_count(&self) -> usize {
        self.frontends.len()
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }
}

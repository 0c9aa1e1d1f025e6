use std::sync::Arc;

use indexmap::IndexMap;

use super::rule::{compose, BackendRoute, RoutingRule};
use crate::condition::{AclRegistry, Condition};
use crate::error::Result;
use crate::types::{ProxyMode, ServiceType};

/// A listener: one per (service type, port).
///
/// Owns the ACLs its rules reference and, per backend, the conditions that
/// select it. Rules are composed only when the frontend is rendered.
#[derive(Debug)]
pub struct Frontend {
    service_type: ServiceType,
    port: u16,
    acls: AclRegistry,
    routes: IndexMap<String, BackendRoute>,
    redirects: Vec<Arc<Condition>>,
}

impl Frontend {
    pub fn new(service_type: ServiceType, port: u16) -> Self {
        Self {
            service_type,
            port,
            acls: AclRegistry::new(),
            routes: IndexMap::new(),
            redirects: Vec::new(),
        }
    }

    /// `<service type>_<port>_<mode>`
    pub fn name(&self) -> String {
        format!("{}_{}_{}", self.service_type, self.port, self.mode())
    }

    pub fn mode(&self) -> ProxyMode {
        self.service_type.mode()
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn acls(&self) -> &AclRegistry {
        &self.acls
    }

    /// Register a condition in this frontend's ACL registry
    pub fn intern(&mut self, condition: Condition) -> Result<Arc<Condition>> {
        self.acls.intern(condition)
    }

    /// Attach a backend's conditions. Backend names are unique per run.
    pub fn add_route(&mut self, backend: impl Into<String>, route: BackendRoute) {
        self.routes.insert(backend.into(), route);
    }

    pub fn add_redirect(&mut self, condition: Arc<Condition>) {
        if !self.redirects.iter().any(|c| Arc::ptr_eq(c, &condition)) {
            self.redirects.push(condition);
        }
    }

    /// Routes in backend registration order
    pub fn routes(&self) -> impl Iterator<Item = (&str, &BackendRoute)> {
        self.routes.iter().map(|(name, route)| (name.as_str(), route))
    }

    pub fn route(&self, backend: &str) -> Option<&BackendRoute> {
        self.routes.get(backend)
    }

    pub fn redirects(&self) -> &[Arc<Condition>] {
        &self.redirects
    }

    /// The full rule list: redirects, then each backend's clauses in
    /// registration order, then the deny fallback for http frontends.
    pub fn rules(&self) -> Vec<RoutingRule> {
        let mode = self.mode();
        let mut rules: Vec<RoutingRule> = self
            .redirects
            .iter()
            .map(|c| RoutingRule::Redirect {
                condition: c.name(),
            })
            .collect();

        for (backend, route) in &self.routes {
            rules.extend(compose(backend, route, mode));
        }

        if mode == ProxyMode::Http {
            rules.push(RoutingRule::deny_fallback());
        }
        rules
    }
}

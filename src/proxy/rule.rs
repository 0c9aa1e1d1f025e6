//! Backend-selection rules.
//!
//! Each backend's conditions are composed into one or more independent
//! clauses. HAProxy evaluates them first-match-wins, so the order of the
//! returned rules is part of the output contract.

use std::fmt;
use std::sync::Arc;

use super::backend::DENY_BACKEND;
use crate::condition::Condition;
use crate::types::ProxyMode;

/// Conditions attached to one backend of a frontend
#[derive(Debug, Clone, Default)]
pub struct BackendRoute {
    pub accept: Vec<Arc<Condition>>,
    pub reject: Vec<Arc<Condition>>,
    pub sni: Option<Arc<Condition>>,
    /// Accept list held the `ALL` wildcard
    pub accept_all: bool,
}

/// Boolean expression over ACL names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Acl(String),
    Any(Vec<Predicate>),
    All(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn acl(condition: &Condition) -> Self {
        Predicate::Acl(condition.name())
    }

    /// OR-group of conditions; `None` when empty, the bare ACL for one
    pub fn any_of(conditions: &[Arc<Condition>]) -> Option<Self> {
        match conditions {
            [] => None,
            [single] => Some(Predicate::acl(single)),
            many => Some(Predicate::Any(
                many.iter().map(|c| Predicate::acl(c)).collect(),
            )),
        }
    }

    /// AND of terms, collapsing a single term
    pub fn all(mut terms: Vec<Predicate>) -> Self {
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            Predicate::All(terms)
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Acl(name) => f.write_str(name),
            Predicate::Any(terms) => {
                f.write_str("(")?;
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write!(f, "{}", term)?;
                }
                f.write_str(")")
            }
            Predicate::All(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" and ")?;
                    }
                    write!(f, "{}", term)?;
                }
                Ok(())
            }
            Predicate::Not(inner) => write!(f, "not {}", inner),
        }
    }
}

/// One line of a frontend's rule list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingRule {
    /// Protocol upgrade guarded by a redirect SNI condition
    Redirect { condition: String },
    /// Backend selection; no predicate means unconditional
    UseBackend {
        backend: String,
        predicate: Option<Predicate>,
    },
    DefaultBackend { backend: String },
}

impl RoutingRule {
    fn use_backend(backend: &str, predicate: Option<Predicate>) -> Self {
        RoutingRule::UseBackend {
            backend: backend.to_string(),
            predicate,
        }
    }

    pub fn deny_fallback() -> Self {
        RoutingRule::DefaultBackend {
            backend: DENY_BACKEND.to_string(),
        }
    }
}

impl fmt::Display for RoutingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingRule::Redirect { condition } => {
                write!(f, "http-request redirect scheme https code 301 if {}", condition)
            }
            RoutingRule::UseBackend {
                backend,
                predicate: Some(predicate),
            } => write!(f, "use_backend {} if {}", backend, predicate),
            RoutingRule::UseBackend {
                backend,
                predicate: None,
            } => write!(f, "use_backend {}", backend),
            RoutingRule::DefaultBackend { backend } => write!(f, "default_backend {}", backend),
        }
    }
}

/// Compose the rules selecting `backend`.
///
/// In http mode an SNI condition yields a single clause
/// `sni and (A1 or ...) and not (R1 or ...)`. Otherwise every accept
/// condition gets its own clause `Ai and not (R1 or ...)`; with no accept
/// conditions the negated reject group stands alone.
pub fn compose(backend: &str, route: &BackendRoute, mode: ProxyMode) -> Vec<RoutingRule> {
    let rejected = Predicate::any_of(&route.reject).map(Predicate::negate);

    if let (Some(sni), ProxyMode::Http) = (&route.sni, mode) {
        let mut terms = vec![Predicate::acl(sni)];
        terms.extend(Predicate::any_of(&route.accept));
        terms.extend(rejected);
        return vec![RoutingRule::use_backend(backend, Some(Predicate::all(terms)))];
    }

    if !route.accept.is_empty() {
        return route
            .accept
            .iter()
            .map(|accepted| {
                let mut terms = vec![Predicate::acl(accepted)];
                terms.extend(rejected.clone());
                RoutingRule::use_backend(backend, Some(Predicate::all(terms)))
            })
            .collect();
    }

    match rejected {
        Some(rejected) => vec![RoutingRule::use_backend(backend, Some(rejected))],
        None if route.accept_all => vec![RoutingRule::use_backend(backend, None)],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conds(tokens: &[&str], mode: ProxyMode) -> Vec<Arc<Condition>> {
        tokens
            .iter()
            .map(|t| Arc::new(Condition::classify(t, mode)))
            .collect()
    }

    fn render(rules: &[RoutingRule]) -> Vec<String> {
        rules.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_sni_with_accept_group() {
        let route = BackendRoute {
            accept: conds(&["IT", "DE"], ProxyMode::Http),
            sni: Some(Arc::new(Condition::sni(
                "shop.example.com",
                ProxyMode::Http,
                crate::condition::SniFlavor::Route,
            ))),
            ..Default::default()
        };
        assert_eq!(
            render(&compose("bk_a", &route, ProxyMode::Http)),
            vec!["use_backend bk_a if acl_sni_shop_example_com and (acl_geo_IT or acl_geo_DE)"]
        );
    }

    #[test]
    fn test_sni_with_accept_and_reject() {
        let route = BackendRoute {
            accept: conds(&["IT"], ProxyMode::Http),
            reject: conds(&["CN", "RU"], ProxyMode::Http),
            sni: Some(Arc::new(Condition::sni(
                "a.example.com",
                ProxyMode::Http,
                crate::condition::SniFlavor::Route,
            ))),
            ..Default::default()
        };
        assert_eq!(
            render(&compose("bk_a", &route, ProxyMode::Http)),
            vec![
                "use_backend bk_a if acl_sni_a_example_com and acl_geo_IT and not (acl_geo_CN or acl_geo_RU)"
            ]
        );
    }

    #[test]
    fn test_one_clause_per_accept() {
        let route = BackendRoute {
            accept: conds(&["IT", "10.1.1.1"], ProxyMode::Tcp),
            reject: conds(&["CN"], ProxyMode::Tcp),
            ..Default::default()
        };
        assert_eq!(
            render(&compose("bk_b", &route, ProxyMode::Tcp)),
            vec![
                "use_backend bk_b if acl_geo_IT and not acl_geo_CN",
                "use_backend bk_b if acl_ip_10_1_1_1 and not acl_geo_CN",
            ]
        );
    }

    #[test]
    fn test_reject_only() {
        let route = BackendRoute {
            reject: conds(&["CN", "RU"], ProxyMode::Tcp),
            accept_all: true,
            ..Default::default()
        };
        assert_eq!(
            render(&compose("bk_c", &route, ProxyMode::Tcp)),
            vec!["use_backend bk_c if not (acl_geo_CN or acl_geo_RU)"]
        );
    }

    #[test]
    fn test_sni_ignored_in_tcp_mode() {
        let route = BackendRoute {
            accept: conds(&["IT"], ProxyMode::Tcp),
            sni: Some(Arc::new(Condition::sni(
                "db.example.com",
                ProxyMode::Tcp,
                crate::condition::SniFlavor::Route,
            ))),
            ..Default::default()
        };
        assert_eq!(
            render(&compose("bk_d", &route, ProxyMode::Tcp)),
            vec!["use_backend bk_d if acl_geo_IT"]
        );
    }

    #[test]
    fn test_accept_all_without_conditions_is_unconditional() {
        let route = BackendRoute {
            accept_all: true,
            ..Default::default()
        };
        assert_eq!(
            render(&compose("bk_e", &route, ProxyMode::Tcp)),
            vec!["use_backend bk_e"]
        );
    }

    #[test]
    fn test_nothing_to_route() {
        let route = BackendRoute::default();
        assert!(compose("bk_f", &route, ProxyMode::Http).is_empty());
    }

    #[test]
    fn test_rule_display() {
        assert_eq!(
            RoutingRule::Redirect {
                condition: "acl_redirect_a_com".into()
            }
            .to_string(),
            "http-request redirect scheme https code 301 if acl_redirect_a_com"
        );
        assert_eq!(
            RoutingRule::deny_fallback().to_string(),
            "default_backend bk_deny_all"
        );
    }
}

use tracing::{debug, info, warn};

use crate::condition::{Condition, SniFlavor};
use crate::error::{HaconfError, Result};
use crate::geo::RogueSet;
use crate::proxy::{compose, BackendRoute, ProxyConfig};
use crate::types::{ProxyMode, ServiceRule, Target, ROGUE_TOKEN, WILDCARD_TOKEN};

/// Fold service rows into a proxy model, in input order.
///
/// Stops at the first invalid row; the partial model is dropped.
pub fn compile(rules: &[ServiceRule], rogue: &RogueSet) -> Result<ProxyConfig> {
    let mut config = ProxyConfig::new();

    for rule in rules {
        fold_rule(&mut config, rule, rogue)?;
    }

    Ok(config)
}

/// Fold a single service row into `config`
pub fn fold_rule(config: &mut ProxyConfig, rule: &ServiceRule, rogue: &RogueSet) -> Result<()> {
    if !rule.enabled {
        info!(
            "Service for port {} and target {} disabled",
            rule.port,
            target_label(&rule.target)
        );
        return Ok(());
    }

    match &rule.target {
        Target::RedirectToHttps => fold_redirect(config, rule),
        Target::Server { host, port } => fold_route(config, rule, host, *port, rogue),
    }
}

fn target_label(target: &Target) -> String {
    match target {
        Target::Server { host, port } => format!("{}:{}", host, port),
        Target::RedirectToHttps => "https redirect".to_string(),
    }
}

fn fold_redirect(config: &mut ProxyConfig, rule: &ServiceRule) -> Result<()> {
    let sni = rule
        .sni
        .as_deref()
        .ok_or(HaconfError::MissingRedirectSni { row: rule.row })?;

    if rule.service_type.mode() != ProxyMode::Http {
        return Err(HaconfError::RedirectOnTcpFrontend {
            row: rule.row,
            port: rule.port,
            service_type: rule.service_type.to_string(),
        });
    }

    let frontend = config.frontend_mut(&rule.service_type, rule.port);
    let condition = frontend.intern(Condition::sni(sni, ProxyMode::Http, SniFlavor::Redirect))?;
    debug!("{}: https redirect for {}", frontend.name(), sni);
    frontend.add_redirect(condition);
    Ok(())
}

fn fold_route(
    config: &mut ProxyConfig,
    rule: &ServiceRule,
    host: &str,
    port: u16,
    rogue: &RogueSet,
) -> Result<()> {
    let is_wildcard = |t: &String| t == WILDCARD_TOKEN;
    let accept_all = rule.accept.iter().any(is_wildcard);
    let reject_all = rule.reject.iter().any(is_wildcard);

    if accept_all && reject_all {
        return Err(HaconfError::ConflictingWildcards { row: rule.row });
    }
    if rule.accept.iter().any(|t| t == ROGUE_TOKEN) {
        warn!("Row {}: ROGUE cannot be accepted, row skipped", rule.row);
        return Ok(());
    }
    if rule.accept.is_empty() && rule.reject.is_empty() {
        warn!("Row {}: neither Accept nor Reject given, row skipped", rule.row);
        return Ok(());
    }

    let mode = rule.service_type.mode();
    let backend = config.register_backend(rule.row, mode, host, port);
    let frontend = config.frontend_mut(&rule.service_type, rule.port);

    let mut route = BackendRoute {
        accept_all,
        ..Default::default()
    };

    if let Some(sni) = rule.sni.as_deref() {
        route.sni = Some(frontend.intern(Condition::sni(sni, mode, SniFlavor::Route))?);
    }

    for token in rule.accept.iter().filter(|t| !is_wildcard(*t)) {
        route
            .accept
            .push(frontend.intern(Condition::classify(token, mode))?);
    }

    for token in rule.reject.iter().filter(|t| !is_wildcard(*t)) {
        if token == ROGUE_TOKEN {
            for condition in rogue.expand(mode) {
                route.reject.push(frontend.intern(condition)?);
            }
        } else {
            route
                .reject
                .push(frontend.intern(Condition::classify(token, mode))?);
        }
    }

    if compose(&backend, &route, mode).is_empty() {
        warn!("Row {}: backend {} is never selected", rule.row, backend);
    }
    debug!(
        "{} -> {}: {} accept, {} reject",
        frontend.name(),
        backend,
        route.accept.len(),
        route.reject.len()
    );
    frontend.add_route(backend, route);
    Ok(())
}

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{HaconfError, Result};
use crate::types::{ServiceRule, ServiceType, Target, REDIRECT_SENTINEL};

/// Separators inside Accept/Reject cells: semicolons, commas, whitespace
static LIST_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[;,\s]+").expect("LIST_SEPARATOR: hardcoded regex is invalid"));

/// Default column delimiter of the service map
pub const DEFAULT_DELIMITER: u8 = b'|';

/// Raw service map row, by header name
#[derive(Debug, Deserialize)]
struct ServiceRecord {
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Service Type", default)]
    service_type: String,
    #[serde(rename = "Port", default)]
    port: String,
    #[serde(rename = "Target IP", default)]
    target_ip: String,
    #[serde(rename = "Target Port", default)]
    target_port: String,
    #[serde(rename = "SNI", default)]
    sni: String,
    #[serde(rename = "Accept", default)]
    accept: String,
    #[serde(rename = "Reject", default)]
    reject: String,
}

/// Split an Accept/Reject cell into upper-cased tokens
pub fn parse_list_field(field: &str) -> Vec<String> {
    let field = field.trim();
    if field.is_empty() {
        return Vec::new();
    }
    LIST_SEPARATOR
        .split(field)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_uppercase())
        .collect()
}

/// Parse a delimited service map with a header row.
pub fn parse_service_map(text: &str, delimiter: u8) -> Result<Vec<ServiceRule>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rules = Vec::new();
    for (row, record) in reader.deserialize().enumerate() {
        let record: ServiceRecord = record.map_err(|e| HaconfError::ParseErrorAtRow {
            row,
            message: e.to_string(),
        })?;
        rules.push(parse_record(row, record)?);
    }
    Ok(rules)
}

/// Parse a service map file. Only delimited text (`.csv`, `.txt`) is supported.
pub fn parse_service_map_from_file(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<ServiceRule>> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if ext != "csv" && ext != "txt" {
        return Err(HaconfError::UnsupportedInput(format!(
            "Unknown file type '{}' for {}",
            ext,
            path.display()
        )));
    }

    let text = fs::read_to_string(path).map_err(|e| {
        HaconfError::ConfigError(format!(
            "Failed to read service map '{}': {}",
            path.display(),
            e
        ))
    })?;
    parse_service_map(&text, delimiter)
}

fn is_enabled(status: &str) -> bool {
    status.eq_ignore_ascii_case("enable") || status.eq_ignore_ascii_case("enabled")
}

fn parse_port(value: &str, column: &str, row: usize) -> Result<u16> {
    // spreadsheets export integer cells as "443.0"
    let value = value.strip_suffix(".0").unwrap_or(value);
    value.parse().map_err(|_| HaconfError::ParseErrorAtRow {
        row,
        message: format!("Invalid {}: '{}'", column, value),
    })
}

fn parse_record(row: usize, record: ServiceRecord) -> Result<ServiceRule> {
    let enabled = is_enabled(&record.status);

    // Disabled rows are kept for documentation and never validated
    if !enabled {
        let rule = ServiceRule::new(
            row,
            ServiceType::parse(&record.service_type).unwrap_or(ServiceType::Http),
            parse_port(&record.port, "Port", row).unwrap_or(0),
            Target::Server {
                host: record.target_ip,
                port: parse_port(&record.target_port, "Target Port", row).unwrap_or(0),
            },
        );
        return Ok(rule.disabled());
    }

    let service_type =
        ServiceType::parse(&record.service_type).ok_or_else(|| HaconfError::ParseErrorAtRow {
            row,
            message: "Empty Service Type".to_string(),
        })?;
    let port = parse_port(&record.port, "Port", row)?;

    let target = if record.target_ip.eq_ignore_ascii_case(REDIRECT_SENTINEL) {
        Target::RedirectToHttps
    } else {
        if record.target_ip.is_empty() {
            return Err(HaconfError::ParseErrorAtRow {
                row,
                message: "Empty Target IP".to_string(),
            });
        }
        Target::Server {
            host: record.target_ip,
            port: parse_port(&record.target_port, "Target Port", row)?,
        }
    };

    let mut rule = ServiceRule::new(row, service_type, port, target)
        .with_accept(parse_list_field(&record.accept))
        .with_reject(parse_list_field(&record.reject));
    if !record.sni.is_empty() {
        rule = rule.with_sni(record.sni);
    }
    Ok(rule)
}

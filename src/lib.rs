//! Haconf - HAProxy configuration generator
//!
//! Turns a tabular service map (one row per exposed service) into HAProxy
//! frontends, backends and access-control rules:
//! - Source filtering by geo-IP country, IPv4 address or hostname
//! - SNI-driven routing for http frontends
//! - `ROGUE` shorthand for a configured list of rejected countries
//! - https redirect rows
//! - Deny-by-default fallback on http frontends
//!
//! # Example
//!
//! ```rust
//! use haconf::{compile, parse_service_map, render, RenderOptions, RogueSet};
//!
//! let map = "\
//! Status|Service Type|Port|Target IP|Target Port|SNI|Accept|Reject
//! enable|http|443|10.0.0.5|8080|shop.example.com|IT;DE|
//! enable|ssh|22|10.0.0.9|22||ALL|CN;ROGUE
//! ";
//!
//! let rules = parse_service_map(map, b'|').unwrap();
//! let rogue = RogueSet::new(["KP", "IR"]);
//! let config = compile(&rules, &rogue).unwrap();
//! let text = render(&config, &RenderOptions::default());
//!
//! assert!(text.contains(
//!     "use_backend bk_10_0_0_9_22 if not (acl_geo_CN or acl_geo_KP or acl_geo_IR)"
//! ));
//! ```
//!
//! # Service map tokens
//!
//! | Token | Example | Condition |
//! |-------|---------|-----------|
//! | Country | `IT` | source in `<cidr dir>/IT.cidr` |
//! | IPv4 | `10.1.2.3` | source address |
//! | Hostname | `www.example.com` | Host header (http) or TLS SNI (tcp) |
//! | `ALL` | | wildcard, Accept or Reject but not both |
//! | `ROGUE` | | Reject only: the rogue country list |

pub mod compile;
pub mod condition;
pub mod error;
pub mod geo;
pub mod parser;
pub mod proxy;
pub mod render;
pub mod types;

// Re-export commonly used items
pub use compile::{compile, fold_rule};
pub use condition::{AclRegistry, Condition, SniFlavor};
pub use error::{GeoErrorKind, HaconfError, Result};
pub use geo::{build_cidr_maps, CountryFilter, RogueSet};
pub use parser::{parse_list_field, parse_service_map, parse_service_map_from_file};
pub use proxy::{Backend, Frontend, Predicate, ProxyConfig, RoutingRule, DENY_BACKEND};
pub use render::{render, write_atomic, RenderOptions};
pub use types::{ProxyMode, ServiceRule, ServiceType, Target};

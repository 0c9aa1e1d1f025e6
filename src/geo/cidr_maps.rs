//! Country network lists (`<CODE>.cidr`) built from a GeoLite2 country dump.
//!
//! The locations file maps geoname ids to ISO country codes; the blocks file
//! maps networks to geoname ids. Each block is resolved through the first
//! non-empty id among its own, its registered and its represented country.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use ipnet::IpNet;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{GeoErrorKind, HaconfError, Result};

#[derive(Debug, Deserialize)]
struct LocationRecord {
    geoname_id: String,
    #[serde(default)]
    country_iso_code: String,
}

#[derive(Debug, Deserialize)]
struct BlockRecord {
    network: String,
    #[serde(default)]
    geoname_id: String,
    #[serde(default)]
    registered_country_geoname_id: String,
    #[serde(default)]
    represented_country_geoname_id: String,
}

impl BlockRecord {
    fn resolved_geoname_id(&self) -> Option<&str> {
        [
            &self.geoname_id,
            &self.registered_country_geoname_id,
            &self.represented_country_geoname_id,
        ]
        .into_iter()
        .map(|id| id.trim())
        .find(|id| !id.is_empty())
    }
}

/// Which countries get a network file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CountryFilter {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl CountryFilter {
    /// Parse `ALL` or a comma separated list of country codes (case-insensitive)
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        if spec.eq_ignore_ascii_case("all") {
            return CountryFilter::All;
        }
        CountryFilter::Only(
            spec.split(',')
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty())
                .collect(),
        )
    }

    pub fn includes(&self, code: &str) -> bool {
        match self {
            CountryFilter::All => true,
            CountryFilter::Only(codes) => codes.contains(code),
        }
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| HaconfError::GeoDataError {
        kind: GeoErrorKind::FileError,
        message: format!("Failed to open {}: {}", path.display(), e),
    })
}

/// Load the geoname id → ISO country code table.
///
/// Locations without a country code (continent-only entries) are left out.
pub fn load_locations<R: Read>(reader: R) -> Result<HashMap<String, String>> {
    let mut locations = HashMap::new();
    for record in csv_reader(reader).deserialize() {
        let record: LocationRecord = record?;
        if !record.country_iso_code.is_empty() {
            locations.insert(record.geoname_id, record.country_iso_code.to_uppercase());
        }
    }
    Ok(locations)
}

/// Group the blocks file by resolved country code, keeping network order.
pub fn group_networks<R: Read>(
    reader: R,
    locations: &HashMap<String, String>,
) -> Result<BTreeMap<String, Vec<IpNet>>> {
    let mut countries: BTreeMap<String, Vec<IpNet>> = BTreeMap::new();
    let mut unresolved = 0usize;

    for record in csv_reader(reader).deserialize() {
        let record: BlockRecord = record?;
        let Some(code) = record
            .resolved_geoname_id()
            .and_then(|id| locations.get(id))
        else {
            unresolved += 1;
            continue;
        };

        match record.network.parse::<IpNet>() {
            Ok(network) => countries.entry(code.clone()).or_default().push(network),
            Err(_) => warn!("Skipping invalid network '{}'", record.network),
        }
    }

    if unresolved > 0 {
        debug!("{} blocks had no resolvable country", unresolved);
    }
    Ok(countries)
}

/// Write one `<CODE>.cidr` file per selected country into `dir`.
///
/// Returns the number of networks written per country.
pub fn write_cidr_maps(
    dir: impl AsRef<Path>,
    countries: &BTreeMap<String, Vec<IpNet>>,
    filter: &CountryFilter,
) -> Result<BTreeMap<String, usize>> {
    let dir = dir.as_ref();
    if dir.is_dir() {
        info!("cidr maps destination {} exists", dir.display());
    } else {
        fs::create_dir_all(dir)?;
    }

    let mut summary = BTreeMap::new();
    for (code, networks) in countries.iter().filter(|(code, _)| filter.includes(code)) {
        let path = cidr_file_path(dir, code);
        let mut out = BufWriter::new(File::create(&path).map_err(|e| {
            HaconfError::GeoDataError {
                kind: GeoErrorKind::FileError,
                message: format!("Failed to create {}: {}", path.display(), e),
            }
        })?);
        for network in networks {
            writeln!(out, "{}", network)?;
        }
        out.flush()?;
        set_world_readable(&path)?;

        info!("Wrote {} networks to {}", networks.len(), path.display());
        summary.insert(code.clone(), networks.len());
    }

    if let CountryFilter::Only(codes) = filter {
        for code in codes.iter().filter(|c| !countries.contains_key(*c)) {
            warn!("No networks found for country {}", code);
        }
    }
    Ok(summary)
}

/// Path of a country's network file inside `dir`
pub fn cidr_file_path(dir: &Path, code: &str) -> PathBuf {
    dir.join(format!("{}.cidr", code))
}

#[cfg(unix)]
fn set_world_readable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_world_readable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Build country network files from the GeoLite2 blocks and locations CSVs.
pub fn build_cidr_maps(
    blocks_path: impl AsRef<Path>,
    locations_path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    filter: &CountryFilter,
) -> Result<BTreeMap<String, usize>> {
    let locations = load_locations(open(locations_path.as_ref())?)?;
    if locations.is_empty() {
        return Err(HaconfError::GeoDataError {
            kind: GeoErrorKind::InvalidData,
            message: format!(
                "No country codes found in {}",
                locations_path.as_ref().display()
            ),
        });
    }

    let countries = group_networks(open(blocks_path.as_ref())?, &locations)?;
    write_cidr_maps(out_dir, &countries, filter)
}

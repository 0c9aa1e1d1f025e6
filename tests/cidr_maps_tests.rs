//! Country network list generation and its use by the generated ACLs.

use std::fs;

use haconf::geo::cidr_file_path;
use haconf::{
    build_cidr_maps, compile, parse_service_map, render, CountryFilter, GeoErrorKind,
    HaconfError, RenderOptions, RogueSet,
};

const LOCATIONS: &str = "\
geoname_id,locale_code,continent_code,continent_name,country_iso_code,country_name,is_in_european_union
3175395,en,EU,Europe,IT,Italy,1
2921044,en,EU,Europe,DE,Germany,1
2017370,en,EU,Europe,RU,Russia,0
";

const BLOCKS: &str = "\
network,geoname_id,registered_country_geoname_id,represented_country_geoname_id,is_anonymous_proxy,is_satellite_provider
2.16.0.0/13,3175395,3175395,,0,0
5.1.0.0/16,,2921044,,0,0
2.32.0.0/14,3175395,,,0,0
5.8.0.0/19,2017370,2017370,,0,0
";

#[test]
fn test_build_all_countries() {
    let dir = tempfile::tempdir().unwrap();
    let blocks = dir.path().join("blocks.csv");
    let locations = dir.path().join("locations.csv");
    fs::write(&blocks, BLOCKS).unwrap();
    fs::write(&locations, LOCATIONS).unwrap();

    let out = dir.path().join("maps");
    let summary = build_cidr_maps(&blocks, &locations, &out, &CountryFilter::All).unwrap();

    assert_eq!(summary.get("IT"), Some(&2));
    assert_eq!(summary.get("DE"), Some(&1));
    assert_eq!(summary.get("RU"), Some(&1));
    assert_eq!(
        fs::read_to_string(cidr_file_path(&out, "IT")).unwrap(),
        "2.16.0.0/13\n2.32.0.0/14\n"
    );
}

#[test]
fn test_build_selected_countries() {
    let dir = tempfile::tempdir().unwrap();
    let blocks = dir.path().join("blocks.csv");
    let locations = dir.path().join("locations.csv");
    fs::write(&blocks, BLOCKS).unwrap();
    fs::write(&locations, LOCATIONS).unwrap();

    let out = dir.path().join("maps");
    let summary =
        build_cidr_maps(&blocks, &locations, &out, &CountryFilter::parse("de, fr")).unwrap();

    assert_eq!(summary.len(), 1);
    assert!(cidr_file_path(&out, "DE").exists());
    assert!(!cidr_file_path(&out, "IT").exists());
    assert!(!cidr_file_path(&out, "FR").exists());
}

#[test]
fn test_missing_blocks_file() {
    let dir = tempfile::tempdir().unwrap();
    let locations = dir.path().join("locations.csv");
    fs::write(&locations, LOCATIONS).unwrap();

    let result = build_cidr_maps(
        dir.path().join("absent.csv"),
        &locations,
        dir.path().join("maps"),
        &CountryFilter::All,
    );
    assert!(matches!(
        result,
        Err(HaconfError::GeoDataError {
            kind: GeoErrorKind::FileError,
            ..
        })
    ));
}

#[test]
fn test_generated_acls_point_at_built_files() {
    let dir = tempfile::tempdir().unwrap();
    let blocks = dir.path().join("blocks.csv");
    let locations = dir.path().join("locations.csv");
    fs::write(&blocks, BLOCKS).unwrap();
    fs::write(&locations, LOCATIONS).unwrap();
    let out = dir.path().join("maps");
    build_cidr_maps(&blocks, &locations, &out, &CountryFilter::All).unwrap();

    let map = "\
Status|Service Type|Port|Target IP|Target Port|SNI|Accept|Reject
enable|ssh|22|10.0.0.9|22||IT;DE|RU
";
    let config = compile(&parse_service_map(map, b'|').unwrap(), &RogueSet::empty()).unwrap();
    let text = render(&config, &RenderOptions::new().with_cidr_dir(&out));

    for code in ["IT", "DE", "RU"] {
        let path = cidr_file_path(&out, code);
        assert!(path.exists());
        assert!(text.contains(&format!("acl acl_geo_{} src -f {}", code, path.display())));
    }
}

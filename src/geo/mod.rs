pub mod cidr_maps;
pub mod rogue;

pub use cidr_maps::{build_cidr_maps, cidr_file_path, CountryFilter};
pub use rogue::RogueSet;

//! haconf command line
//!
//! ```bash
//! # Generate the HAProxy configuration from a service map
//! haconf generate -i mappa-servizi.csv -r rogue.txt -c cidr_maps -o haproxy_generated.cfg
//!
//! # Build the country network lists from a GeoLite2 country dump
//! haconf cidr-maps -b GeoLite2-Country-Blocks-IPv4.csv -l GeoLite2-Country-Locations-en.csv
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use haconf::error::{HaconfError, Result};
use haconf::geo::{build_cidr_maps, CountryFilter, RogueSet};
use haconf::parser::{parse_service_map_from_file, DEFAULT_DELIMITER};
use haconf::render::{render, write_atomic, RenderOptions, DEFAULT_CERT_DIR, DEFAULT_TLS_PORT};

#[derive(Parser)]
#[command(name = "haconf", version)]
#[command(about = "Generate HAProxy frontends, backends and ACLs from a service map", long_about = None)]
struct Cli {
    /// Log debug details
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the HAProxy configuration
    Generate {
        /// Service map (delimited text with a header row)
        #[arg(short, long, default_value = "mappa-servizi.csv")]
        input: PathBuf,
        /// File listing rogue country codes, one per line
        #[arg(short, long, default_value = "rogue.txt")]
        rogue: PathBuf,
        /// Directory with the country CIDR files
        #[arg(short, long, default_value = "cidr_maps")]
        cidrmaps: PathBuf,
        /// Output HAProxy config file
        #[arg(short, long, default_value = "haproxy_generated.cfg")]
        output: PathBuf,
        /// Column delimiter of the service map
        #[arg(short, long, default_value_t = DEFAULT_DELIMITER as char)]
        delimiter: char,
        /// Certificate directory for the TLS listener
        #[arg(long, default_value = DEFAULT_CERT_DIR)]
        cert_dir: PathBuf,
        /// Port on which http frontends terminate TLS
        #[arg(long, default_value_t = DEFAULT_TLS_PORT)]
        tls_port: u16,
        /// Do not answer ACME http-01 challenges on the TLS listener
        #[arg(long)]
        no_acme: bool,
    },
    /// Build country CIDR files from a GeoLite2 country dump
    CidrMaps {
        /// GeoLite2 country blocks CSV
        #[arg(short, long, default_value = "/tmp/GeoLite2-Country-Blocks-IPv4.csv")]
        blocks: PathBuf,
        /// GeoLite2 country locations CSV
        #[arg(short, long, default_value = "/tmp/GeoLite2-Country-Locations-en.csv")]
        locations: PathBuf,
        /// Output directory for the CIDR files
        #[arg(short = 'm', long, default_value = "cidr_maps")]
        cidrmaps: PathBuf,
        /// Comma separated country codes, or ALL
        #[arg(long, default_value = "ALL")]
        country_list: String,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_validation() => {
            error!("{e}");
            error!("No configuration written");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Generate {
            input,
            rogue,
            cidrmaps,
            output,
            delimiter,
            cert_dir,
            tls_port,
            no_acme,
        } => {
            if !delimiter.is_ascii() {
                return Err(HaconfError::ConfigError(format!(
                    "Delimiter '{delimiter}' is not an ASCII character"
                )));
            }

            info!("Reading service map {}", input.display());
            let rules = parse_service_map_from_file(&input, delimiter as u8)?;
            let rogue = RogueSet::load(&rogue)?;
            let config = haconf::compile(&rules, &rogue)?;

            let options = RenderOptions::new()
                .with_cidr_dir(&cidrmaps)
                .with_cert_dir(&cert_dir)
                .with_tls_port(tls_port)
                .with_acme_challenge(!no_acme);
            let text = render(&config, &options);

            write_atomic(&output, &text)?;
            info!(
                "Wrote {} frontends and {} backends to {}",
                config.frontend_count(),
                config.backend_count(),
                output.display()
            );
        }
        Commands::CidrMaps {
            blocks,
            locations,
            cidrmaps,
            country_list,
        } => {
            let filter = CountryFilter::parse(&country_list);
            let summary = build_cidr_maps(&blocks, &locations, &cidrmaps, &filter)?;
            let networks: usize = summary.values().sum();
            info!(
                "Wrote {} networks for {} countries to {}",
                networks,
                summary.len(),
                cidrmaps.display()
            );
        }
    }
    Ok(())
}

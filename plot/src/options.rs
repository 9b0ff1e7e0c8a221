use anyhow::{anyhow, Error as AnyError};
use clap::{Parser, Subcommand, ValueEnum};
use geo::geometry::Coord;
use std::{path::PathBuf, str::FromStr};

/// Build terrain profiles over a synthetic isoline project.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// Seed for the synthetic terrain; random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of isoline levels to generate.
    #[arg(long, default_value_t = 12)]
    pub levels: usize,

    /// JSON file overriding profile settings.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Clone, Debug, Copy)]
pub struct LatLon(pub Coord<f64>);

impl FromStr for LatLon {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (lat_str, lon_str) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("not a valid lat,lon pair"))?;
        let lat = f64::from_str(lat_str.trim())?;
        let lon = f64::from_str(lon_str.trim())?;
        Ok(Self(Coord { y: lat, x: lon }))
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the generated isolines as JSON.
    Isolines,

    /// Build a terrain profile.
    Profile {
        /// Start "lat,lon"
        #[arg(long)]
        start: LatLon,

        /// Destination "lat,lon"
        #[arg(long)]
        dest: LatLon,

        /// Raw sampling step, in meters.
        #[arg(long)]
        step: Option<f64>,

        #[arg(long, value_enum, default_value_t = Output::Display)]
        output: Output,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Output {
    /// Print one sample per line.
    Display,

    /// Print samples as JSON.
    Json,

    /// Plot to terminal.
    Chart,
}

#[cfg(test)]
mod tests {
    use super::LatLon;
    use std::str::FromStr;

    #[test]
    fn test_parse_lat_lon() {
        let LatLon(coord) = LatLon::from_str("44.28, -71.31").unwrap();
        assert_eq!(coord.y, 44.28);
        assert_eq!(coord.x, -71.31);
        assert!(LatLon::from_str("44.28").is_err());
        assert!(LatLon::from_str("a,b").is_err());
    }
}

use std::path::PathBuf;

use fitting_room::Size;

#[derive(clap::Parser)]
#[command(version, about = "Try clothes on a photo and export the result")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Put garments on a photo and save the composed PNG
    Compose {
        /// Photo used as background
        #[arg(short, long)]
        background: Option<PathBuf>,
        /// Catalog json file or zip bundle
        #[arg(short, long, env = "FITTING_ROOM_CATALOG")]
        catalog: Option<PathBuf>,
        /// Catalog garment id, may be repeated
        #[arg(short, long = "garment")]
        garments: Vec<String>,
        /// Extra image outside the catalog, as <path>=<width>x<height>
        #[arg(long = "overlay", value_parser = parse_overlay)]
        overlays: Vec<Overlay>,
        /// Output file or directory, defaults to virtual-fitting-<millis>.png
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Export resolution relative to the surface
        #[arg(short, long)]
        multiplier: Option<f64>,
        /// Seed for garment placement
        #[arg(long)]
        seed: Option<u64>,
    },
    /// List the garments of a catalog
    Catalog { path: PathBuf },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pub path: PathBuf,
    pub size: Size,
}

pub fn parse_overlay(value: &str) -> Result<Overlay, String> {
    let (path, size) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected <path>=<width>x<height>, got {value}"))?;
    let (width, height) = size
        .split_once('x')
        .ok_or_else(|| format!("expected <width>x<height>, got {size}"))?;
    let parse = |dim: &str| dim.trim().parse::<f64>().map_err(|err| format!("{dim}: {err}"));
    let size = Size::new(parse(width)?, parse(height)?);
    if path.is_empty() {
        return Err("overlay path is empty".to_string());
    }
    if !size.is_positive() {
        return Err(format!("overlay size must be positive, got {width}x{height}"));
    }

    Ok(Overlay {
        path: PathBuf::from(path),
        size,
    })
}

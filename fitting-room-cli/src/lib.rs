use std::{
    fs::File,
    path::{Path, PathBuf},
};

use clap::{CommandFactory, Parser};
use fitting_room::{
    Catalog, CatalogError, FittingRoom, ImageSource, Level, Notification, Surface,
};
use zip::ZipArchive;

use crate::{
    cli::{Cli, Commands, Overlay},
    config::AppConfig,
};

mod cli;
mod config;
mod utils;

pub async fn run() -> anyhow::Result<()> {
    // parse command
    let args = Cli::parse();

    match args.command {
        Some(Commands::Compose {
            background,
            catalog,
            garments,
            overlays,
            output,
            multiplier,
            seed,
        }) => {
            let config = AppConfig::from_env()?;
            let job = ComposeJob {
                background,
                catalog,
                garments,
                overlays,
                output,
                multiplier,
                seed,
            };
            let output = compose(&config, job, print_notification).await?;
            println!("Saved {}", output.display());
        }
        Some(Commands::Catalog { path }) => {
            catalog_info(&path)?;
        }
        None => {
            Cli::command().print_long_help()?;
        }
    }

    Ok(())
}

struct ComposeJob {
    background: Option<PathBuf>,
    catalog: Option<PathBuf>,
    garments: Vec<String>,
    overlays: Vec<Overlay>,
    output: Option<PathBuf>,
    multiplier: Option<f64>,
    seed: Option<u64>,
}

async fn compose(
    config: &AppConfig,
    job: ComposeJob,
    mut sink: impl FnMut(Notification) + Send + 'static,
) -> anyhow::Result<PathBuf> {
    let mut room_config = config.room();
    if let Some(multiplier) = job.multiplier {
        room_config.export_multiplier = multiplier;
    }
    let surface = match job.seed {
        Some(seed) => Surface::with_seed(room_config.surface, seed),
        None => Surface::new(room_config.surface),
    };
    log::info!(
        "Composing on a {}x{} surface, exporting at {}x",
        room_config.surface.width,
        room_config.surface.height,
        room_config.export_multiplier
    );
    let mut room = FittingRoom::with_surface(room_config, surface);

    // forward notifications until the room goes away
    let mut notifications = room.subscribe();
    let forwarder = tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            sink(notification);
        }
    });

    let result = dress_up(&mut room, job).await;
    drop(room);
    forwarder.await?;
    result
}

async fn dress_up(room: &mut FittingRoom, job: ComposeJob) -> anyhow::Result<PathBuf> {
    if let Some(path) = &job.catalog {
        room.load_catalog(|| open_catalog(path))?;
    }

    if let Some(path) = &job.background {
        let bytes = tokio::fs::read(path).await?;
        room.upload_background(bytes, None).await?;
    }

    for garment in &job.garments {
        room.add_garment(garment).await?;
    }

    for overlay in job.overlays {
        let source = ImageSource::Path(overlay.path);
        room.surface_mut().add_garment(&source, overlay.size).await?;
    }

    let export = room.export()?;
    let output = match job.output {
        Some(path) if path.is_dir() => path.join(&export.filename),
        Some(path) => path,
        None => PathBuf::from(&export.filename),
    };
    tokio::fs::write(&output, &export.png).await?;

    Ok(output)
}

fn print_notification(notification: Notification) {
    match notification.level {
        Level::Error => eprintln!("error: {}", notification.message),
        _ => println!("{}", notification.message),
    }
}

/// Zip bundles by extension, plain json otherwise.
fn open_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let is_bundle = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if is_bundle {
        let mut zip = ZipArchive::new(File::open(path)?)?;
        Catalog::from_zip(&mut zip)
    } else {
        Catalog::open(path)
    }
}

fn catalog_info(path: &Path) -> anyhow::Result<()> {
    let catalog = open_catalog(path)?;
    if catalog.is_empty() {
        println!("The wardrobe is empty");
        return Ok(());
    }

    for garment in catalog.iter() {
        println!(
            "{}\t{}\t{}\t{}x{}\t{}",
            garment.id,
            garment.name,
            garment.category,
            garment.default_size.width,
            garment.default_size.height,
            garment.locator
        );
    }

    Ok(())
}

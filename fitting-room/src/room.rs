use std::{
    fmt::Display,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::{
    catalog::{Catalog, CatalogError},
    compose::ExportError,
    decode::{ImageSource, decode},
    layer::LayerId,
    surface::{Surface, SurfaceConfig, SurfaceError},
    upload::{UploadError, UploadPolicy},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

/// A user-facing message about the outcome of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

/// Keyboard shortcuts the room reacts to.
///
/// `Undo` is not a history: like `Delete`, it removes the selected garment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Delete,
    Undo,
}

#[derive(Debug, Default)]
pub enum CatalogState {
    #[default]
    NotLoaded,
    Loaded(Catalog),
    /// Behaves like an empty catalog until loading is retried.
    Failed(String),
}

impl CatalogState {
    pub fn catalog(&self) -> Option<&Catalog> {
        match self {
            CatalogState::Loaded(catalog) => Some(catalog),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomConfig {
    pub surface: SurfaceConfig,
    pub upload: UploadPolicy,
    pub export_multiplier: f64,
    pub notification_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceConfig {
                decode_timeout: Some(Duration::from_secs(30)),
                ..SurfaceConfig::default()
            },
            upload: UploadPolicy::default(),
            export_multiplier: 2.0,
            notification_buffer: 64,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RoomError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("No garment with id {0} in the catalog")]
    UnknownGarment(String),
}

/// A rendered image ready to be offered as a download.
#[derive(Debug, Clone)]
pub struct Export {
    pub filename: String,
    pub png: Vec<u8>,
}

/// `virtual-fitting-<millis>.png`
pub fn export_filename(unix_millis: u128) -> String {
    format!("virtual-fitting-{unix_millis}.png")
}

/// One user's fitting session: the surface, the catalog they pick garments
/// from, and a stream of notifications describing what happened.
#[derive(Debug)]
pub struct FittingRoom {
    surface: Surface,
    catalog: CatalogState,
    config: RoomConfig,
    notifications: broadcast::Sender<Notification>,
}

impl FittingRoom {
    pub fn new(config: RoomConfig) -> Self {
        Self::with_surface(config, Surface::new(config.surface))
    }

    /// Use a prepared surface, e.g. one with a fixed placement seed.
    pub fn with_surface(config: RoomConfig, surface: Surface) -> Self {
        let (notifications, _) = broadcast::channel(config.notification_buffer.max(1));
        Self {
            surface,
            catalog: CatalogState::default(),
            config,
            notifications,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub fn catalog(&self) -> &CatalogState {
        &self.catalog
    }

    /// Run `load` and keep its result. A failure leaves the room with no
    /// garments to offer; calling this again retries.
    pub fn load_catalog(
        &mut self,
        load: impl FnOnce() -> Result<Catalog, CatalogError>,
    ) -> Result<usize, RoomError> {
        match load() {
            Ok(catalog) => {
                let count = catalog.len();
                if catalog.is_empty() {
                    self.notify(Level::Info, "The wardrobe is empty");
                }
                self.catalog = CatalogState::Loaded(catalog);
                Ok(count)
            }
            Err(err) => {
                self.catalog = CatalogState::Failed(err.to_string());
                self.fail("Could not load the clothes catalog", &err);
                Err(err.into())
            }
        }
    }

    pub async fn upload_background(
        &mut self,
        bytes: impl Into<Bytes>,
        declared_mime: Option<&str>,
    ) -> Result<(), RoomError> {
        let bytes = bytes.into();
        if let Err(err) = self.config.upload.check(&bytes, declared_mime) {
            self.fail("Upload rejected", &err);
            return Err(err.into());
        }

        let result = self
            .surface
            .set_background(&ImageSource::Bytes(bytes))
            .await
            .map(|layer| layer.id());
        match result {
            Ok(_) => {
                self.notify(Level::Success, "Background image set");
                Ok(())
            }
            Err(err) => {
                self.fail("Could not read the image", &err);
                Err(err.into())
            }
        }
    }

    pub fn remove_background(&mut self) -> bool {
        let removed = self.surface.remove_background().is_some();
        if removed {
            self.notify(Level::Success, "Background image removed");
        }
        removed
    }

    /// Load a catalog garment and put it on the surface.
    pub async fn add_garment(&mut self, garment_id: &str) -> Result<LayerId, RoomError> {
        let Some(garment) = self
            .catalog
            .catalog()
            .and_then(|catalog| catalog.get(garment_id))
            .cloned()
        else {
            let err = RoomError::UnknownGarment(garment_id.to_string());
            self.fail("Garment not found", &err);
            return Err(err);
        };

        self.notify(Level::Info, format!("Adding {}...", garment.name));
        let image = match decode(&garment.image, self.surface.config().decode_timeout).await {
            Ok(image) => image,
            Err(err) => {
                self.fail(&format!("Could not load {}", garment.name), &err);
                return Err(SurfaceError::from(err).into());
            }
        };

        let name = garment.name.clone();
        let target = garment.default_size;
        let id = self
            .surface
            .place_garment(image, target, Some(garment))?
            .id();
        self.notify(Level::Success, format!("{name} added"));
        Ok(id)
    }

    /// Remove every garment if `confirm` agrees. Returns how many went.
    pub fn clear_garments(&mut self, confirm: impl FnOnce() -> bool) -> usize {
        if !confirm() {
            log::debug!("Clearing cancelled");
            return 0;
        }
        let removed = self.surface.clear_garments();
        self.notify(Level::Success, "Canvas cleared");
        removed
    }

    /// Both shortcuts delete the selected garment; the background is never
    /// selectable, so it is never removed here.
    pub fn handle_shortcut(&mut self, shortcut: Shortcut) -> Option<LayerId> {
        let removed = self.surface.remove_selected().map(|layer| layer.id());
        log::debug!("{shortcut:?} removed {removed:?}");
        removed
    }

    pub fn export(&self) -> Result<Export, RoomError> {
        match self.surface.export_png(self.config.export_multiplier) {
            Ok(png) => {
                let millis = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|elapsed| elapsed.as_millis())
                    .unwrap_or_default();
                self.notify(Level::Success, "Image saved");
                Ok(Export {
                    filename: export_filename(millis),
                    png,
                })
            }
            Err(err) => {
                self.fail("Failed to save the image", &err);
                Err(err.into())
            }
        }
    }

    pub fn has_garments(&self) -> bool {
        self.surface.has_garments()
    }

    fn notify(&self, level: Level, message: impl Into<String>) {
        let message = message.into();
        match level {
            Level::Error => log::warn!("{message}"),
            _ => log::info!("{message}"),
        }
        // nobody listening is fine
        let _ = self.notifications.send(Notification { level, message });
    }

    fn fail(&self, context: &str, err: &dyn Display) {
        self.notify(Level::Error, format!("{context}: {err}"));
    }
}

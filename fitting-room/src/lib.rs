mod catalog;
mod compose;
mod decode;
mod geometry;
mod layer;
mod room;
mod surface;
mod upload;

#[cfg(test)]
mod testing;

pub use catalog::{CATALOG_MANIFEST, Catalog, CatalogError, Garment};
pub use compose::{ExportError, MAX_RENDER_PIXELS, export_png, render};
pub use decode::{ImageDecodeError, ImageSource, decode, decode_bytes};
pub use geometry::{Position, Scale, Size, fit_centered, random_origin, stretch_to};
pub use layer::{Layer, LayerId, LayerRole};
pub use room::{
    CatalogState, Export, FittingRoom, Level, Notification, RoomConfig, RoomError, Shortcut,
    export_filename,
};
pub use surface::{Surface, SurfaceConfig, SurfaceError};
pub use upload::{DEFAULT_MAX_UPLOAD_BYTES, UploadError, UploadPolicy};

use std::{fmt, sync::Arc};

use image::RgbaImage;

use crate::geometry::{Position, Scale, Size};

/// Identifies a layer on a surface.
///
/// There is only ever one background, so it uses a sentinel instead of a
/// counter. Garment ids are never reused by the surface that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerId {
    Background,
    Garment(u64),
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerId::Background => f.write_str("background"),
            LayerId::Garment(n) => write!(f, "garment-{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    Background,
    Garment,
}

/// One positioned, scaled image on a surface.
#[derive(Debug, Clone)]
pub struct Layer {
    pub(crate) id: LayerId,
    pub(crate) image: Arc<RgbaImage>,
    pub(crate) position: Position,
    pub(crate) scale: Scale,
}

impl Layer {
    pub(crate) fn new(
        id: LayerId,
        image: Arc<RgbaImage>,
        position: Position,
        scale: Scale,
    ) -> Self {
        Self {
            id,
            image,
            position,
            scale,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn role(&self) -> LayerRole {
        match self.id {
            LayerId::Background => LayerRole::Background,
            LayerId::Garment(_) => LayerRole::Garment,
        }
    }

    /// The background ignores pointer interaction.
    pub fn selectable(&self) -> bool {
        self.role() == LayerRole::Garment
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Size of the source raster before scaling.
    pub fn source_size(&self) -> Size {
        Size::new(self.image.width() as f64, self.image.height() as f64)
    }

    /// Size on the surface after scaling.
    pub fn scaled_size(&self) -> Size {
        let source = self.source_size();
        Size::new(source.width * self.scale.x, source.height * self.scale.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_as_sentinel_or_counter() {
        assert_eq!(LayerId::Background.to_string(), "background");
        assert_eq!(LayerId::Garment(3).to_string(), "garment-3");
    }

    #[test]
    fn scaled_size_uses_both_axes() {
        let layer = Layer::new(
            LayerId::Garment(0),
            Arc::new(RgbaImage::new(300, 400)),
            Position::default(),
            Scale { x: 0.5, y: 0.25 },
        );
        assert_eq!(layer.scaled_size(), Size::new(150.0, 100.0));
        assert!(layer.selectable());
        assert_eq!(layer.role(), LayerRole::Garment);
    }
}

use std::{collections::HashMap, sync::Arc, time::Duration};

use image::{Rgba, RgbaImage};

use crate::{
    catalog::Garment,
    compose::within_budget,
    decode::{ImageDecodeError, ImageSource, decode},
    geometry::{Position, Scale, Size, fit_centered, random_origin, stretch_to},
    layer::{Layer, LayerId},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    /// Painted under every layer when rendering.
    pub fill: Rgba<u8>,
    /// Upper bound for a single image load, `None` waits forever.
    pub decode_timeout: Option<Duration>,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 700,
            fill: Rgba([0, 0, 0, 0]),
            decode_timeout: None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SurfaceError {
    #[error("No layer with id {0}")]
    LayerNotFound(LayerId),
    #[error("The background can only be changed through the background operations")]
    ProtectedBackground,
    #[error("Target size must be positive, got {}x{}", .0.width, .0.height)]
    InvalidTarget(Size),
    #[error("Scale factors must be positive, got {}x{}", .0.x, .0.y)]
    InvalidScale(Scale),
    #[error("Failed to load image: {0}")]
    Decode(#[from] ImageDecodeError),
}

/// The compositing surface: a background plus a stack of garments.
///
/// The background lives outside the garment stack, so it is always drawn
/// first no matter when it was set. Mutations take `&mut self`; image
/// loading is the only await point. Callers that want several loads in
/// flight at once can run [`decode`] themselves and hand the results to
/// [`Surface::place_background`] / [`Surface::place_garment`], in which case
/// whichever background is placed last wins.
#[derive(Debug)]
pub struct Surface {
    config: SurfaceConfig,
    background: Option<Layer>,
    garments: Vec<Layer>,
    active: Option<LayerId>,
    garment_info: HashMap<LayerId, Garment>,
    next_garment: u64,
    rng: fastrand::Rng,
}

impl Surface {
    pub fn new(config: SurfaceConfig) -> Self {
        Self::with_rng(config, fastrand::Rng::new())
    }

    /// Same as [`Surface::new`] with reproducible garment placement.
    pub fn with_seed(config: SurfaceConfig, seed: u64) -> Self {
        Self::with_rng(config, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(config: SurfaceConfig, rng: fastrand::Rng) -> Self {
        Self {
            config,
            background: None,
            garments: Vec::new(),
            active: None,
            garment_info: HashMap::new(),
            next_garment: 0,
            rng,
        }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn size(&self) -> Size {
        Size::new(self.config.width as f64, self.config.height as f64)
    }

    pub async fn set_background(&mut self, source: &ImageSource) -> Result<&Layer, SurfaceError> {
        let image = decode(source, self.config.decode_timeout).await?;
        Ok(self.place_background(image))
    }

    /// Fit `image` inside the surface, centered, replacing any background.
    pub fn place_background(&mut self, image: RgbaImage) -> &Layer {
        let source = Size::new(image.width() as f64, image.height() as f64);
        let (scale, position) = fit_centered(self.size(), source);

        if self.background.take().is_some() {
            log::debug!("Replacing existing background");
        }
        log::info!(
            "Background set: {}x{} scaled by {:.3}",
            image.width(),
            image.height(),
            scale.x
        );

        self.background.insert(Layer::new(
            LayerId::Background,
            Arc::new(image),
            position,
            scale,
        ))
    }

    /// Returns the removed background, `None` if there was none.
    pub fn remove_background(&mut self) -> Option<Layer> {
        let removed = self.background.take();
        if removed.is_some() {
            log::info!("Background removed");
        }
        removed
    }

    pub async fn add_garment(
        &mut self,
        source: &ImageSource,
        target: Size,
    ) -> Result<&Layer, SurfaceError> {
        if !target.is_positive() || !within_budget(target.width, target.height) {
            return Err(SurfaceError::InvalidTarget(target));
        }
        let image = decode(source, self.config.decode_timeout).await?;
        self.place_garment(image, target, None)
    }

    /// Stretch `image` to `target`, drop it at a random spot inside the
    /// surface and make it the active selection.
    ///
    /// `garment` is kept in a side-table keyed by the new layer id.
    pub fn place_garment(
        &mut self,
        image: RgbaImage,
        target: Size,
        garment: Option<Garment>,
    ) -> Result<&Layer, SurfaceError> {
        if !target.is_positive() || !within_budget(target.width, target.height) {
            return Err(SurfaceError::InvalidTarget(target));
        }
        let source = Size::new(image.width() as f64, image.height() as f64);
        let scale = stretch_to(target, source);
        let bounds = self.size();
        let position = random_origin(&mut self.rng, bounds, target);

        let id = LayerId::Garment(self.next_garment);
        self.next_garment += 1;

        if let Some(garment) = garment {
            log::info!("Garment {} ({}) added as {id}", garment.id, garment.name);
            self.garment_info.insert(id, garment);
        } else {
            log::info!("Garment added as {id}");
        }

        self.garments.push(Layer::new(id, Arc::new(image), position, scale));
        self.active = Some(id);

        Ok(&self.garments[self.garments.len() - 1])
    }

    /// Remove one garment. The background is refused.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<Layer, SurfaceError> {
        let index = self.garment_index(id)?;
        let layer = self.garments.remove(index);
        self.garment_info.remove(&id);
        if self.active == Some(id) {
            self.active = None;
        }
        log::info!("Removed {id}");
        Ok(layer)
    }

    /// Remove the active garment, if any.
    pub fn remove_selected(&mut self) -> Option<Layer> {
        let id = self.active?;
        self.remove_layer(id).ok()
    }

    /// Remove every garment and return how many were removed.
    pub fn clear_garments(&mut self) -> usize {
        let removed = self.garments.len();
        self.garments.clear();
        self.garment_info.clear();
        self.active = None;
        log::info!("Cleared {removed} garments");
        removed
    }

    pub fn select(&mut self, id: LayerId) -> Result<(), SurfaceError> {
        self.garment_index(id)?;
        self.active = Some(id);
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&Layer> {
        self.active.and_then(|id| self.layer(id))
    }

    /// Move a garment above every other garment.
    pub fn bring_to_front(&mut self, id: LayerId) -> Result<(), SurfaceError> {
        let index = self.garment_index(id)?;
        let layer = self.garments.remove(index);
        self.garments.push(layer);
        Ok(())
    }

    pub fn move_layer(&mut self, id: LayerId, position: Position) -> Result<(), SurfaceError> {
        let index = self.garment_index(id)?;
        self.garments[index].position = position;
        Ok(())
    }

    /// Rescale a garment. The scaled size has to stay within
    /// [`MAX_RENDER_PIXELS`](crate::MAX_RENDER_PIXELS).
    pub fn scale_layer(&mut self, id: LayerId, scale: Scale) -> Result<(), SurfaceError> {
        if !(scale.x > 0.0 && scale.y > 0.0 && scale.x.is_finite() && scale.y.is_finite()) {
            return Err(SurfaceError::InvalidScale(scale));
        }
        let index = self.garment_index(id)?;
        let source = self.garments[index].source_size();
        if !within_budget(source.width * scale.x, source.height * scale.y) {
            return Err(SurfaceError::InvalidScale(scale));
        }
        self.garments[index].scale = scale;
        Ok(())
    }

    /// All layers, bottom to top.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.background.iter().chain(self.garments.iter())
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        match id {
            LayerId::Background => self.background.as_ref(),
            LayerId::Garment(_) => self.garments.iter().find(|layer| layer.id == id),
        }
    }

    pub fn background(&self) -> Option<&Layer> {
        self.background.as_ref()
    }

    /// Garments, bottom to top.
    pub fn garments(&self) -> &[Layer] {
        &self.garments
    }

    pub fn garment_info(&self, id: LayerId) -> Option<&Garment> {
        self.garment_info.get(&id)
    }

    pub fn has_garments(&self) -> bool {
        !self.garments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.garments.len() + usize::from(self.background.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn garment_index(&self, id: LayerId) -> Result<usize, SurfaceError> {
        if id == LayerId::Background {
            return Err(SurfaceError::ProtectedBackground);
        }
        self.garments
            .iter()
            .position(|layer| layer.id == id)
            .ok_or(SurfaceError::LayerNotFound(id))
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(SurfaceConfig::default())
    }
}

use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, RgbaImage, imageops};

use crate::{layer::Layer, surface::Surface};

/// Largest raster, in pixels, that rendering will allocate. Applies to the
/// output canvas and to each resampled layer.
pub const MAX_RENDER_PIXELS: u64 = 1 << 28;

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("Export multiplier must be positive, got {0}")]
    InvalidMultiplier(f64),
    #[error("Raster of {0}x{1} pixels is too large to render")]
    TooLarge(f64, f64),
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

pub(crate) fn within_budget(width: f64, height: f64) -> bool {
    width * height <= MAX_RENDER_PIXELS as f64
}

/// Compose every layer of `surface`, bottom to top, at `multiplier` times
/// the surface resolution.
pub fn render(surface: &Surface, multiplier: f64) -> Result<RgbaImage, ExportError> {
    if !(multiplier > 0.0 && multiplier.is_finite()) {
        return Err(ExportError::InvalidMultiplier(multiplier));
    }
    let config = surface.config();
    let width = (config.width as f64 * multiplier).round();
    let height = (config.height as f64 * multiplier).round();
    if !within_budget(width, height) {
        return Err(ExportError::TooLarge(width, height));
    }

    let mut canvas = ImageBuffer::from_pixel(width as u32, height as u32, config.fill);
    for layer in surface.layers() {
        draw_layer(&mut canvas, layer, multiplier)?;
    }

    log::debug!(
        "Rendered {} layers at {}x{}",
        surface.len(),
        canvas.width(),
        canvas.height()
    );
    Ok(canvas)
}

/// [`render`] encoded as PNG.
pub fn export_png(surface: &Surface, multiplier: f64) -> Result<Vec<u8>, ExportError> {
    let image = render(surface, multiplier)?;
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

fn draw_layer(canvas: &mut RgbaImage, layer: &Layer, multiplier: f64) -> Result<(), ExportError> {
    let size = layer.scaled_size();
    let width = (size.width * multiplier).round();
    let height = (size.height * multiplier).round();
    // nothing visible, or a degenerate source image
    if !(width >= 1.0 && height >= 1.0 && width.is_finite() && height.is_finite()) {
        log::debug!("Skipping {}: nothing to draw", layer.id());
        return Ok(());
    }

    let position = layer.position();
    let x = (position.x * multiplier).round();
    let y = (position.y * multiplier).round();
    let off_canvas = x >= canvas.width() as f64
        || y >= canvas.height() as f64
        || x + width <= 0.0
        || y + height <= 0.0;
    if off_canvas {
        log::debug!("Skipping {}: outside the surface", layer.id());
        return Ok(());
    }
    if !within_budget(width, height) {
        return Err(ExportError::TooLarge(width, height));
    }
    let (width, height) = (width as u32, height as u32);
    let (x, y) = (x as i64, y as i64);

    let source = layer.image();
    if source.dimensions() == (width, height) {
        imageops::overlay(canvas, source, x, y);
    } else {
        let scaled = imageops::resize(source, width, height, imageops::FilterType::Lanczos3);
        imageops::overlay(canvas, &scaled, x, y);
    }
    Ok(())
}

impl Surface {
    pub fn render(&self, multiplier: f64) -> Result<RgbaImage, ExportError> {
        render(self, multiplier)
    }

    pub fn export_png(&self, multiplier: f64) -> Result<Vec<u8>, ExportError> {
        export_png(self, multiplier)
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::{
        geometry::{Position, Scale, Size},
        surface::SurfaceConfig,
        testing::solid,
    };

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

    fn small_surface() -> Surface {
        Surface::with_seed(
            SurfaceConfig {
                width: 20,
                height: 10,
                ..SurfaceConfig::default()
            },
            3,
        )
    }

    #[test]
    fn output_size_follows_multiplier() {
        let surface = Surface::default();
        assert_eq!(render(&surface, 1.0).unwrap().dimensions(), (500, 700));
        assert_eq!(render(&surface, 2.0).unwrap().dimensions(), (1000, 1400));
        assert!(matches!(
            render(&surface, 0.0),
            Err(ExportError::InvalidMultiplier(_))
        ));
        assert!(matches!(
            render(&surface, f64::NAN),
            Err(ExportError::InvalidMultiplier(_))
        ));
    }

    #[test]
    fn oversized_output_is_refused_before_allocating() {
        let surface = Surface::default();
        assert!(matches!(
            render(&surface, 6.0e6),
            Err(ExportError::TooLarge(..))
        ));
        // 500x700 at 30x is about 315M pixels
        assert!(matches!(
            render(&surface, 30.0),
            Err(ExportError::TooLarge(..))
        ));
        assert!(render(&surface, 4.0).is_ok());
    }

    #[test]
    fn oversized_layer_is_refused() {
        let mut surface = small_surface();
        let id = surface
            .place_garment(solid(1, 1, RED), Size::new(1.0, 1.0), None)
            .unwrap()
            .id();
        // 10000x10000 fits the budget, twice that does not
        surface.scale_layer(id, Scale::uniform(10_000.0)).unwrap();
        surface.move_layer(id, Position::new(0.0, 0.0)).unwrap();

        assert!(matches!(
            surface.render(2.0),
            Err(ExportError::TooLarge(..))
        ));
    }

    #[test]
    fn layers_outside_the_surface_are_skipped() {
        let mut surface = small_surface();
        let id = surface
            .place_garment(solid(1, 1, RED), Size::new(1.0, 1.0), None)
            .unwrap()
            .id();
        surface.scale_layer(id, Scale::uniform(10_000.0)).unwrap();
        surface.move_layer(id, Position::new(50.0, 0.0)).unwrap();

        let out = surface.render(2.0).unwrap();
        assert!(out.pixels().all(|pixel| pixel == &Rgba([0, 0, 0, 0])));
    }

    #[test]
    fn background_is_letterboxed_over_fill() {
        let mut surface = Surface::with_seed(
            SurfaceConfig {
                width: 20,
                height: 10,
                fill: GREEN,
                ..SurfaceConfig::default()
            },
            0,
        );
        // square photo on a wide surface: 10x10 centered, 5px bars either side
        surface.place_background(solid(4, 4, BLUE));

        let out = surface.render(1.0).unwrap();
        assert_eq!(out.get_pixel(0, 5), &GREEN);
        assert_eq!(out.get_pixel(10, 5), &BLUE);
        assert_eq!(out.get_pixel(19, 5), &GREEN);
    }

    #[test]
    fn garments_draw_over_background_in_stack_order() {
        let mut surface = small_surface();
        surface.place_background(solid(20, 10, BLUE));
        let first = surface
            .place_garment(solid(2, 2, RED), Size::new(4.0, 4.0), None)
            .unwrap()
            .id();
        let second = surface
            .place_garment(solid(2, 2, GREEN), Size::new(4.0, 4.0), None)
            .unwrap()
            .id();
        surface.move_layer(first, Position::new(2.0, 2.0)).unwrap();
        surface.move_layer(second, Position::new(4.0, 4.0)).unwrap();

        let out = surface.render(1.0).unwrap();
        assert_eq!(out.get_pixel(0, 0), &BLUE);
        assert_eq!(out.get_pixel(2, 2), &RED);
        // overlap goes to the later garment
        assert_eq!(out.get_pixel(5, 5), &GREEN);

        surface.bring_to_front(first).unwrap();
        let out = surface.render(1.0).unwrap();
        assert_eq!(out.get_pixel(5, 5), &RED);
    }

    #[test]
    fn multiplier_scales_positions() {
        let mut surface = small_surface();
        let id = surface
            .place_garment(solid(1, 1, RED), Size::new(2.0, 2.0), None)
            .unwrap()
            .id();
        surface.move_layer(id, Position::new(3.0, 1.0)).unwrap();

        let out = surface.render(2.0).unwrap();
        assert_eq!(out.dimensions(), (40, 20));
        assert_eq!(out.get_pixel(6, 2), &RED);
        assert_eq!(out.get_pixel(9, 5), &RED);
        assert_eq!(out.get_pixel(10, 6), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn garments_hanging_off_the_edge_are_clipped() {
        let mut surface = small_surface();
        let id = surface
            .place_garment(solid(1, 1, RED), Size::new(6.0, 6.0), None)
            .unwrap()
            .id();
        surface.move_layer(id, Position::new(-3.0, 7.0)).unwrap();

        let out = surface.render(1.0).unwrap();
        assert_eq!(out.get_pixel(0, 9), &RED);
        assert_eq!(out.get_pixel(2, 7), &RED);
        assert_eq!(out.get_pixel(3, 7), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn clearing_garments_restores_background_render() {
        let mut surface = Surface::with_seed(SurfaceConfig::default(), 11);
        surface.place_background(solid(1000, 1400, BLUE));
        let background_only = surface.render(2.0).unwrap();

        for color in [RED, GREEN] {
            surface
                .place_garment(solid(300, 400, color), Size::new(150.0, 200.0), None)
                .unwrap();
        }
        assert_ne!(surface.render(2.0).unwrap(), background_only);

        surface.clear_garments();
        assert_eq!(surface.render(2.0).unwrap(), background_only);
    }

    #[test]
    fn export_is_lossless_png() {
        let mut surface = small_surface();
        surface.place_background(solid(20, 10, BLUE));

        let png = surface.export_png(1.0).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded, surface.render(1.0).unwrap());
    }
}

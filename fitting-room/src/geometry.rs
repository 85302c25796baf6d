use serde::Deserialize;

/// Width and height in surface units.
#[derive(Default, Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_positive(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

/// Top-left offset in surface coordinates.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Independent per-axis scale factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Scale {
    pub fn uniform(factor: f64) -> Self {
        Self {
            x: factor,
            y: factor,
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::uniform(1.0)
    }
}

/// Uniform scale that fits `image` inside `surface` keeping the aspect ratio,
/// centered. Images smaller than the surface are scaled up.
pub fn fit_centered(surface: Size, image: Size) -> (Scale, Position) {
    let scale = (surface.width / image.width).min(surface.height / image.height);
    let position = Position::new(
        (surface.width - image.width * scale) / 2.0,
        (surface.height - image.height * scale) / 2.0,
    );
    (Scale::uniform(scale), position)
}

/// Non-uniform scale that stretches `image` to exactly `target`.
pub fn stretch_to(target: Size, image: Size) -> Scale {
    Scale {
        x: target.width / image.width,
        y: target.height / image.height,
    }
}

/// Random top-left corner keeping a `target` box inside `surface`.
///
/// An axis where the box is larger than the surface collapses to 0.
pub fn random_origin(rng: &mut fastrand::Rng, surface: Size, target: Size) -> Position {
    let range_x = (surface.width - target.width).max(0.0);
    let range_y = (surface.height - target.height).max(0.0);
    Position::new(rng.f64() * range_x, rng.f64() * range_y)
}

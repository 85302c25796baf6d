use std::time::Duration;

use fitting_room::{DEFAULT_MAX_UPLOAD_BYTES, RoomConfig, SurfaceConfig, UploadPolicy};

use crate::utils::{env_or, process_env};

pub struct AppConfig {
    pub canvas: CanvasConfig,
    pub upload: UploadConfig,
    pub export: ExportConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            canvas: CanvasConfig::from_lookup(lookup)?,
            upload: UploadConfig::from_lookup(lookup)?,
            export: ExportConfig::from_lookup(lookup)?,
        })
    }

    pub fn room(&self) -> RoomConfig {
        let defaults = RoomConfig::default();
        RoomConfig {
            surface: SurfaceConfig {
                width: self.canvas.width,
                height: self.canvas.height,
                decode_timeout: self.canvas.decode_timeout,
                ..defaults.surface
            },
            upload: UploadPolicy {
                max_bytes: self.upload.max_bytes,
            },
            export_multiplier: self.export.multiplier,
            ..defaults
        }
    }
}

pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub decode_timeout: Option<Duration>,
}

impl CanvasConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let width = env_or(lookup, "FITTING_ROOM_WIDTH", 500u32)?;
        let height = env_or(lookup, "FITTING_ROOM_HEIGHT", 700u32)?;
        if width == 0 || height == 0 {
            anyhow::bail!("Canvas size must be positive, got {width}x{height}");
        }
        // 0 disables the timeout
        let timeout_secs = env_or(lookup, "FITTING_ROOM_DECODE_TIMEOUT_SECS", 30u64)?;

        Ok(Self {
            width,
            height,
            decode_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        })
    }
}

pub struct UploadConfig {
    pub max_bytes: usize,
}

impl UploadConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            max_bytes: env_or(lookup, "FITTING_ROOM_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

pub struct ExportConfig {
    pub multiplier: f64,
}

impl ExportConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let multiplier = env_or(lookup, "FITTING_ROOM_EXPORT_MULTIPLIER", 2.0f64)?;
        if !(multiplier > 0.0 && multiplier.is_finite()) {
            anyhow::bail!("Export multiplier must be positive, got {multiplier}");
        }
        Ok(Self { multiplier })
    }
}

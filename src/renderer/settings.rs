// ---------------------------------------------------------------------------
// RenderSettings
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

/// GPU adapter selection strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerPreference {
    LowPower,
    #[default]
    HighPerformance,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(value: PowerPreference) -> Self {
        match value {
            PowerPreference::LowPower => Self::LowPower,
            PowerPreference::HighPerformance => Self::HighPerformance,
        }
    }
}

/// Depth attachment format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthFormat {
    #[default]
    Depth32Float,
    Depth24Plus,
}

impl From<DepthFormat> for wgpu::TextureFormat {
    fn from(value: DepthFormat) -> Self {
        match value {
            DepthFormat::Depth32Float => Self::Depth32Float,
            DepthFormat::Depth24Plus => Self::Depth24Plus,
        }
    }
}

/// Configuration consumed when the GPU device is created.
///
/// | Field              | Default            |
/// |--------------------|--------------------|
/// | `width`, `height`  | 800 × 600          |
/// | `clear_color`      | `[0.1, 0.1, 0.1, 1.0]` |
/// | `power_preference` | `high_performance` |
/// | `depth_format`     | `depth32_float`    |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub clear_color: [f64; 4],
    pub power_preference: PowerPreference,
    pub depth_format: DepthFormat,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            power_preference: PowerPreference::default(),
            depth_format: DepthFormat::default(),
        }
    }
}

impl RenderSettings {
    #[must_use]
    pub fn wgpu_clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color { r, g, b, a }
    }

    /// Width over height, guarding against a zero height.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

//! Colors shared by the Vello painter and the Canvas2D renderer.

use pv_core::StageStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// CSS color string, `#RRGGBB` when opaque.
    pub fn to_css(self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!(
                "rgba({}, {}, {}, {:.3})",
                self.r,
                self.g,
                self.b,
                self.a as f32 / 255.0
            )
        }
    }
}

/// Theme-dependent colors for the pipeline canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: Rgba,
    pub node_fill: Rgba,
    pub text: Rgba,
    pub edge: Rgba,
    pub feedback_edge: Rgba,
    pub selection: Rgba,
    pub pending: Rgba,
    pub running: Rgba,
    pub success: Rgba,
    pub failed: Rgba,
}

impl Palette {
    pub fn light() -> Self {
        Self {
            background: Rgba::rgb(0xF5, 0xF5, 0xF7),
            node_fill: Rgba::rgb(0xFF, 0xFF, 0xFF),
            text: Rgba::rgb(0x1D, 0x1D, 0x1F),
            edge: Rgba::rgb(0x6B, 0x70, 0x80),
            feedback_edge: Rgba::rgb(0xA8, 0x55, 0xF7),
            selection: Rgba::rgb(0x0A, 0x84, 0xFF),
            pending: Rgba::rgb(0x9C, 0xA3, 0xAF),
            running: Rgba::rgb(0x3B, 0x82, 0xF6),
            success: Rgba::rgb(0x22, 0xC5, 0x5E),
            failed: Rgba::rgb(0xEF, 0x44, 0x44),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: Rgba::rgb(0x1C, 0x1C, 0x1E),
            node_fill: Rgba::rgb(0x2C, 0x2C, 0x2E),
            text: Rgba::rgb(0xF5, 0xF5, 0xF7),
            edge: Rgba::rgba(0xFF, 0xFF, 0xFF, 0x80),
            ..Self::light()
        }
    }

    /// Accent for a stage's border and status dot.
    pub fn status(&self, status: StageStatus) -> Rgba {
        match status {
            StageStatus::Pending => self.pending,
            StageStatus::Running => self.running,
            StageStatus::Success => self.success,
            StageStatus::Failed => self.failed,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::light()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn css_strings() {
        assert_eq!(Rgba::rgb(0x22, 0xC5, 0x5E).to_css(), "#22C55E");
        assert_eq!(Rgba::rgba(255, 255, 255, 0).to_css(), "rgba(255, 255, 255, 0.000)");
    }

    #[test]
    fn every_status_has_a_distinct_accent() {
        let palette = Palette::light();
        let accents = [
            palette.status(StageStatus::Pending),
            palette.status(StageStatus::Running),
            palette.status(StageStatus::Success),
            palette.status(StageStatus::Failed),
        ];
        for (i, a) in accents.iter().enumerate() {
            for b in &accents[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

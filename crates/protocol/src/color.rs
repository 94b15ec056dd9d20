use serde::{Deserialize, Serialize};

/// An RGBA color with 8-bit channels.
///
/// The planner reads channels with fixed meanings: blue carries the heatmap
/// signal, red marks sparkles and attribute triggers, and alpha scales how
/// visible a pixel is at all. Green only contributes to darkness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    pub const WHITE: Color = Color::opaque(255, 255, 255);

    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self::rgba(red, green, blue, 255)
    }

    /// Distance from white across all channels, scaled by opacity.
    ///
    /// `0.0` means the pixel is invisible (pure white or fully transparent);
    /// the maximum, `765.0`, is opaque black. Anything positive is worth
    /// drawing.
    pub fn darkness(&self) -> f64 {
        let distance = f64::from(255 - self.red)
            + f64::from(255 - self.green)
            + f64::from(255 - self.blue);
        distance * f64::from(self.alpha) / 255.0
    }

    pub fn is_visible(&self) -> bool {
        self.darkness() > 0.0
    }

    /// Inverted blue channel: 0 for pure blue, 255 for no blue at all.
    pub fn blueness(&self) -> u8 {
        255 - self.blue
    }

    pub fn has_blue(&self) -> bool {
        self.blue > 0
    }

    pub fn has_red(&self) -> bool {
        self.red > 0
    }

    /// Canonical grouping key: `#RRGGBB` in uppercase hex, with a `:AA`
    /// suffix only when the color is not fully opaque. Two pixels with the
    /// same key belong to the same stack band.
    pub fn key(&self) -> String {
        if self.alpha == 255 {
            format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
        } else {
            format!(
                "#{:02X}{:02X}{:02X}:{:02X}",
                self.red, self.green, self.blue, self.alpha
            )
        }
    }

    /// Parse a color key produced by [`Color::key`]. Accepts lowercase hex
    /// and an optional `:AA` alpha suffix.
    pub fn from_key(key: &str) -> Option<Self> {
        let rest = key.strip_prefix('#')?;
        let (rgb, alpha) = match rest.split_once(':') {
            Some((rgb, alpha)) => (rgb, u8::from_str_radix(alpha, 16).ok()?),
            None => (rest, 255),
        };
        if rgb.len() != 6 || !rgb.is_ascii() {
            return None;
        }
        let red = u8::from_str_radix(&rgb[0..2], 16).ok()?;
        let green = u8::from_str_radix(&rgb[2..4], 16).ok()?;
        let blue = u8::from_str_radix(&rgb[4..6], 16).ok()?;
        Some(Self::rgba(red, green, blue, alpha))
    }
}

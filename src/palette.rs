//! Color palette resolution
//!
//! Colors in a document are written as `#rrggbb`, as a numeric color index
//! (`2`, `634`), as a named base color with an optional offset (`kRed+2`,
//! `kAzure-3`, `red`), or as a name defined in a TOML palette file:
//!
//! ```toml
//! [metadata]
//! name = "paper"
//!
//! [colors]
//! signal = "#d62728"
//! background = "kAzure+1"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaletteError {
    #[error("Failed to read palette file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse palette TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Positive offsets darken, negative offsets lighten
    fn shifted(self, offset: i32) -> Self {
        let f = |c: u8| -> u8 {
            let c = c as f64;
            let v = if offset >= 0 {
                c * (1.0 - 0.15 * offset.min(6) as f64)
            } else {
                c + (255.0 - c) * 0.09 * (-offset).min(10) as f64
            };
            v.round().clamp(0.0, 255.0) as u8
        };
        Self::rgb(f(self.r), f(self.g), f(self.b))
    }
}

/// Named base colors and their numeric index
const BASE_COLORS: &[(&str, u32, Color)] = &[
    ("kWhite", 0, Color::rgb(255, 255, 255)),
    ("kBlack", 1, Color::rgb(0, 0, 0)),
    ("kGray", 920, Color::rgb(204, 204, 204)),
    ("kRed", 632, Color::rgb(255, 0, 0)),
    ("kGreen", 416, Color::rgb(0, 255, 0)),
    ("kBlue", 600, Color::rgb(0, 0, 255)),
    ("kYellow", 400, Color::rgb(255, 255, 0)),
    ("kMagenta", 616, Color::rgb(255, 0, 255)),
    ("kCyan", 432, Color::rgb(0, 255, 255)),
    ("kOrange", 800, Color::rgb(255, 204, 0)),
    ("kSpring", 820, Color::rgb(51, 255, 102)),
    ("kTeal", 840, Color::rgb(51, 153, 153)),
    ("kAzure", 860, Color::rgb(0, 153, 255)),
    ("kViolet", 880, Color::rgb(153, 51, 255)),
    ("kPink", 900, Color::rgb(255, 51, 153)),
];

/// The first ten numeric indices
const INDEXED: [Color; 10] = [
    Color::rgb(255, 255, 255),
    Color::rgb(0, 0, 0),
    Color::rgb(255, 0, 0),
    Color::rgb(0, 255, 0),
    Color::rgb(0, 0, 255),
    Color::rgb(255, 255, 0),
    Color::rgb(255, 0, 255),
    Color::rgb(0, 255, 255),
    Color::rgb(89, 212, 84),
    Color::rgb(89, 84, 216),
];

/// A palette: user-defined color names layered over the built-in colors
#[derive(Debug, Clone, Default)]
pub struct Palette {
    pub name: Option<String>,
    pub description: Option<String>,
    pub colors: HashMap<String, String>,
}

#[derive(Deserialize)]
struct TomlPalette {
    metadata: Option<TomlMetadata>,
    #[serde(default)]
    colors: HashMap<String, String>,
}

#[derive(Deserialize)]
struct TomlMetadata {
    name: Option<String>,
    description: Option<String>,
}

impl Palette {
    pub fn from_file(path: &Path) -> Result<Self, PaletteError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, PaletteError> {
        let parsed: TomlPalette = toml::from_str(content)?;
        Ok(Palette {
            name: parsed.metadata.as_ref().and_then(|m| m.name.clone()),
            description: parsed.metadata.as_ref().and_then(|m| m.description.clone()),
            colors: parsed.colors,
        })
    }

    /// Resolve a color specification, `None` when it is not understood
    pub fn resolve(&self, spec: &str) -> Option<Color> {
        self.resolve_depth(spec.trim(), 0)
    }

    /// Resolve a color specification, falling back to black
    pub fn resolve_or_default(&self, spec: &str) -> Color {
        self.resolve(spec).unwrap_or_else(|| {
            tracing::warn!(color = spec, "unknown color, using black");
            Color::BLACK
        })
    }

    fn resolve_depth(&self, spec: &str, depth: usize) -> Option<Color> {
        if let Some(alias) = self.colors.get(spec) {
            // palette entries may refer to other entries
            if depth < 8 {
                return self.resolve_depth(alias.trim(), depth + 1);
            }
            return None;
        }
        if spec.starts_with('#') {
            return Color::from_hex(spec);
        }
        if let Ok(index) = spec.parse::<u32>() {
            return from_index(index);
        }
        named(spec)
    }
}

fn from_index(index: u32) -> Option<Color> {
    if let Some(c) = INDEXED.get(index as usize) {
        return Some(*c);
    }
    BASE_COLORS
        .iter()
        .filter(|(_, base, _)| *base >= 10 && index + 10 >= *base && index < base + 20)
        .min_by_key(|(_, base, _)| (index as i64 - *base as i64).abs())
        .map(|(_, base, c)| c.shifted(index as i32 - *base as i32))
}

/// `kRed+2`, `kAzure-3`, `red`, `Red`
fn named(spec: &str) -> Option<Color> {
    let (name, offset) = match spec.find(['+', '-']) {
        Some(pos) => (&spec[..pos], spec[pos..].trim_start_matches('+').trim().parse::<i32>().ok()?),
        None => (spec, 0),
    };
    let name = name.trim();
    BASE_COLORS
        .iter()
        .find(|(n, _, _)| {
            n.eq_ignore_ascii_case(name) || n[1..].eq_ignore_ascii_case(name)
        })
        .map(|(_, _, c)| c.shifted(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let c = Color::from_hex("#1a2B3c").unwrap();
        assert_eq!(c, Color::rgb(0x1a, 0x2b, 0x3c));
        assert_eq!(c.to_hex(), "#1a2b3c");
        assert!(Color::from_hex("#12345").is_none());
    }

    #[test]
    fn test_named_with_offset() {
        let p = Palette::default();
        assert_eq!(p.resolve("kRed"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(p.resolve("red"), Some(Color::rgb(255, 0, 0)));
        let darker = p.resolve("kRed+2").unwrap();
        assert!(darker.r < 255 && darker.g == 0);
        let lighter = p.resolve("kBlue-4").unwrap();
        assert!(lighter.r > 0 && lighter.b == 255);
    }

    #[test]
    fn test_numeric_index() {
        let p = Palette::default();
        assert_eq!(p.resolve("1"), Some(Color::BLACK));
        assert_eq!(p.resolve("2"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(p.resolve("634"), p.resolve("kRed+2"));
        assert_eq!(p.resolve("858"), p.resolve("kAzure-2"));
    }

    #[test]
    fn test_toml_overlay() {
        let p = Palette::from_toml(
            r##"
[metadata]
name = "paper"

[colors]
signal = "#d62728"
bkg = "kAzure+1"
alias = "signal"
"##,
        )
        .unwrap();
        assert_eq!(p.name.as_deref(), Some("paper"));
        assert_eq!(p.resolve("signal"), Some(Color::rgb(0xd6, 0x27, 0x28)));
        assert_eq!(p.resolve("alias"), p.resolve("signal"));
        assert_eq!(p.resolve("bkg"), p.resolve("kAzure+1"));
    }

    #[test]
    fn test_unknown_falls_back_to_black() {
        let p = Palette::default();
        assert_eq!(p.resolve("nonsense"), None);
        assert_eq!(p.resolve_or_default("nonsense"), Color::BLACK);
    }

    #[test]
    fn test_invalid_toml_error() {
        assert!(Palette::from_toml("this is not valid toml {{{{").is_err());
    }
}

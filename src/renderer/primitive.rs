//! Drawing primitives recorded on pads, and the pixel-space shapes they flatten to

use crate::palette::Color;

/// Rectangle in normalized coordinates, `(x1, y1)` bottom left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    pub const FULL: Rect = Rect::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::FULL
    }
}

/// Pad margins as fractions of the pad size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 0.1,
            right: 0.1,
            bottom: 0.1,
            left: 0.1,
        }
    }
}

/// Axis ranges and decorations of a pad
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub x: (f64, f64),
    pub y: (f64, f64),
    pub log_x: bool,
    pub log_y: bool,
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    /// Tick labels replacing numeric labels on x, by bin center
    pub x_labels: Vec<(f64, String)>,
}

/// Which coordinate system a primitive is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coords {
    /// Normalized pad coordinates, 0..1 on both axes
    #[default]
    Ndc,
    /// Axis coordinates of the pad frame
    User,
}

/// Line drawing attributes. `style` 1 is solid, 2 dashed, 3 dotted, 4 dash-dot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    pub style: i32,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 1.0,
            style: 1,
        }
    }
}

impl Stroke {
    pub fn dash_pattern(&self) -> Option<&'static str> {
        match self.style {
            2 => Some("6,4"),
            3 => Some("1,3"),
            4 => Some("6,3,1,3"),
            _ => None,
        }
    }
}

/// Text alignment in the two-digit `hv` convention: `h` 1 left, 2 center,
/// 3 right; `v` 1 bottom, 2 middle, 3 top
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Align(pub i32);

impl Default for Align {
    fn default() -> Self {
        Align(11)
    }
}

impl Align {
    pub fn horizontal(self) -> i32 {
        (self.0 / 10).clamp(1, 3)
    }

    pub fn vertical(self) -> i32 {
        (self.0 % 10).clamp(1, 3)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub coords: Coords,
    /// Fraction of the pad height
    pub size: f64,
    pub color: Color,
    pub align: Align,
    pub angle: f64,
    pub font: i32,
}

impl Default for TextItem {
    fn default() -> Self {
        Self {
            text: String::new(),
            x: 0.0,
            y: 0.0,
            coords: Coords::Ndc,
            size: 0.05,
            color: Color::BLACK,
            align: Align::default(),
            angle: 0.0,
            font: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Line {
        from: (f64, f64),
        to: (f64, f64),
        coords: Coords,
        stroke: Stroke,
    },
    Polyline {
        points: Vec<(f64, f64)>,
        coords: Coords,
        stroke: Option<Stroke>,
        fill: Option<Color>,
    },
    Markers {
        points: Vec<(f64, f64)>,
        coords: Coords,
        color: Color,
        /// Radius as a fraction of the pad height
        size: f64,
        style: i32,
    },
    Box {
        rect: Rect,
        coords: Coords,
        stroke: Option<Stroke>,
        fill: Option<Color>,
    },
    Ellipse {
        center: (f64, f64),
        radii: (f64, f64),
        coords: Coords,
        stroke: Option<Stroke>,
        fill: Option<Color>,
    },
    Text(TextItem),
    /// Encoded image bytes placed in NDC
    Image { rect: Rect, data: Vec<u8> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    Bottom,
    Middle,
    Top,
}

/// A shape in canvas pixels, origin top left
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line {
        from: (f64, f64),
        to: (f64, f64),
        stroke: Stroke,
    },
    Polyline {
        points: Vec<(f64, f64)>,
        stroke: Option<Stroke>,
        fill: Option<Color>,
    },
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        stroke: Option<Stroke>,
        fill: Option<Color>,
    },
    Ellipse {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
        stroke: Option<Stroke>,
        fill: Option<Color>,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        size: f64,
        color: Color,
        anchor: Anchor,
        baseline: Baseline,
        angle: f64,
    },
    Image {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        data: Vec<u8>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_digits() {
        assert_eq!(Align(13).horizontal(), 1);
        assert_eq!(Align(13).vertical(), 3);
        assert_eq!(Align(22).horizontal(), 2);
        assert_eq!(Align(0).vertical(), 1);
    }

    #[test]
    fn test_dash_pattern() {
        let mut s = Stroke::default();
        assert_eq!(s.dash_pattern(), None);
        s.style = 2;
        assert_eq!(s.dash_pattern(), Some("6,4"));
    }
}

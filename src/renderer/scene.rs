//! Recording back end: canvases made of pads, each holding a display list

use std::path::{Path, PathBuf};

use crate::palette::Color;

use super::primitive::{
    Align, Anchor, Baseline, Coords, Frame, Margins, Primitive, Rect, Shape, Stroke, TextItem,
};
use super::{raster, svg, OutputFormat, RenderError, SvgConfig};

/// What a print writes out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintScope {
    /// The selected pad alone, stretched over the whole image
    Pad,
    /// The whole canvas with every pad
    Canvas,
}

/// Operations the drawing handlers need from a plotting back end
pub trait Backend {
    /// Create a canvas and make it current; its own pad is selected
    fn new_canvas(&mut self, name: &str, width: u32, height: u32);
    fn has_canvas(&self) -> bool;
    /// Create a pad on the current canvas and select it
    fn new_pad(&mut self, name: &str, rect: Rect);
    /// Select the canvas-level pad
    fn select_canvas(&mut self);
    fn set_pad_rect(&mut self, rect: Rect);
    fn set_margins(&mut self, margins: Margins);
    fn margins(&self) -> Margins;
    fn set_frame(&mut self, frame: Frame);
    fn frame(&self) -> Option<Frame>;
    fn draw(&mut self, primitive: Primitive);
    fn print(&mut self, url: &Path, scope: PrintScope) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pad {
    pub name: String,
    pub rect: Rect,
    pub margins: Margins,
    pub frame: Option<Frame>,
    pub primitives: Vec<Primitive>,
}

impl Pad {
    fn new(name: &str, rect: Rect) -> Self {
        Self {
            name: name.to_string(),
            rect,
            margins: Margins::default(),
            frame: None,
            primitives: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Pad 0 covers the canvas itself
    pub pads: Vec<Pad>,
    current: usize,
}

impl Canvas {
    fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            pads: vec![Pad::new(name, Rect::FULL)],
            current: 0,
        }
    }

    pub fn current_pad(&self) -> &Pad {
        &self.pads[self.current.min(self.pads.len() - 1)]
    }

    fn current_pad_mut(&mut self) -> &mut Pad {
        let i = self.current.min(self.pads.len() - 1);
        &mut self.pads[i]
    }

    /// Flatten to pixel-space shapes
    pub fn shapes(&self, scope: PrintScope) -> Vec<Shape> {
        let (w, h) = (self.width as f64, self.height as f64);
        let mut out = vec![Shape::Rect {
            x: 0.0,
            y: 0.0,
            w,
            h,
            stroke: None,
            fill: Some(Color::WHITE),
        }];
        match scope {
            PrintScope::Canvas => {
                for pad in &self.pads {
                    PadGeometry::new(pad, pad.rect, w, h).flatten(pad, &mut out);
                }
            }
            PrintScope::Pad => {
                let pad = self.current_pad();
                PadGeometry::new(pad, Rect::FULL, w, h).flatten(pad, &mut out);
            }
        }
        out
    }
}

/// Maps pad coordinates to canvas pixels
struct PadGeometry {
    px: f64,
    py: f64,
    pw: f64,
    ph: f64,
    margins: Margins,
    frame: Option<Frame>,
}

impl PadGeometry {
    fn new(pad: &Pad, rect: Rect, canvas_w: f64, canvas_h: f64) -> Self {
        Self {
            px: rect.x1 * canvas_w,
            py: (1.0 - rect.y2) * canvas_h,
            pw: rect.width() * canvas_w,
            ph: rect.height() * canvas_h,
            margins: pad.margins,
            frame: pad.frame.clone(),
        }
    }

    fn ndc(&self, x: f64, y: f64) -> (f64, f64) {
        (self.px + x * self.pw, self.py + (1.0 - y) * self.ph)
    }

    /// User coordinates to NDC through the frame; without a frame user
    /// coordinates are taken as NDC
    fn user_to_ndc(&self, x: f64, y: f64) -> (f64, f64) {
        let Some(frame) = &self.frame else {
            return (x, y);
        };
        let m = &self.margins;
        let fx = axis_fraction(x, frame.x, frame.log_x);
        let fy = axis_fraction(y, frame.y, frame.log_y);
        (
            m.left + (1.0 - m.left - m.right) * fx,
            m.bottom + (1.0 - m.top - m.bottom) * fy,
        )
    }

    fn point(&self, (x, y): (f64, f64), coords: Coords) -> (f64, f64) {
        match coords {
            Coords::Ndc => self.ndc(x, y),
            Coords::User => {
                let (nx, ny) = self.user_to_ndc(x, y);
                self.ndc(nx, ny)
            }
        }
    }

    fn flatten(&self, pad: &Pad, out: &mut Vec<Shape>) {
        if let Some(frame) = &pad.frame {
            self.frame_shapes(frame, out);
        }
        for primitive in &pad.primitives {
            self.primitive_shapes(primitive, out);
        }
    }

    fn text_shape(&self, item: &TextItem) -> Shape {
        let (x, y) = self.point((item.x, item.y), item.coords);
        Shape::Text {
            x,
            y,
            text: item.text.clone(),
            size: item.size * self.ph,
            color: item.color,
            anchor: match item.align.horizontal() {
                1 => Anchor::Start,
                2 => Anchor::Middle,
                _ => Anchor::End,
            },
            baseline: match item.align.vertical() {
                1 => Baseline::Bottom,
                2 => Baseline::Middle,
                _ => Baseline::Top,
            },
            angle: item.angle,
        }
    }

    fn primitive_shapes(&self, primitive: &Primitive, out: &mut Vec<Shape>) {
        match primitive {
            Primitive::Line {
                from,
                to,
                coords,
                stroke,
            } => out.push(Shape::Line {
                from: self.point(*from, *coords),
                to: self.point(*to, *coords),
                stroke: *stroke,
            }),
            Primitive::Polyline {
                points,
                coords,
                stroke,
                fill,
            } => out.push(Shape::Polyline {
                points: points.iter().map(|p| self.point(*p, *coords)).collect(),
                stroke: *stroke,
                fill: *fill,
            }),
            Primitive::Markers {
                points,
                coords,
                color,
                size,
                style,
            } => {
                let r = (size * self.ph).max(1.0);
                for p in points {
                    let (cx, cy) = self.point(*p, *coords);
                    // open styles draw an outline only
                    let open = matches!(style, 4 | 24 | 25 | 26 | 27 | 28);
                    let (stroke, fill) = if open {
                        (
                            Some(Stroke {
                                color: *color,
                                ..Stroke::default()
                            }),
                            None,
                        )
                    } else {
                        (None, Some(*color))
                    };
                    if matches!(style, 21 | 25) {
                        out.push(Shape::Rect {
                            x: cx - r,
                            y: cy - r,
                            w: 2.0 * r,
                            h: 2.0 * r,
                            stroke,
                            fill,
                        });
                    } else {
                        out.push(Shape::Ellipse {
                            cx,
                            cy,
                            rx: r,
                            ry: r,
                            stroke,
                            fill,
                        });
                    }
                }
            }
            Primitive::Box {
                rect,
                coords,
                stroke,
                fill,
            } => {
                let (x1, y1) = self.point((rect.x1, rect.y1), *coords);
                let (x2, y2) = self.point((rect.x2, rect.y2), *coords);
                out.push(Shape::Rect {
                    x: x1.min(x2),
                    y: y1.min(y2),
                    w: (x2 - x1).abs(),
                    h: (y2 - y1).abs(),
                    stroke: *stroke,
                    fill: *fill,
                });
            }
            Primitive::Ellipse {
                center,
                radii,
                coords,
                stroke,
                fill,
            } => {
                let (cx, cy) = self.point(*center, *coords);
                let (ex, ey) = self.point((center.0 + radii.0, center.1 + radii.1), *coords);
                out.push(Shape::Ellipse {
                    cx,
                    cy,
                    rx: (ex - cx).abs(),
                    ry: (ey - cy).abs(),
                    stroke: *stroke,
                    fill: *fill,
                });
            }
            Primitive::Text(item) => out.push(self.text_shape(item)),
            Primitive::Image { rect, data } => {
                let (x1, y1) = self.ndc(rect.x1, rect.y2);
                let (x2, y2) = self.ndc(rect.x2, rect.y1);
                out.push(Shape::Image {
                    x: x1,
                    y: y1,
                    w: x2 - x1,
                    h: y2 - y1,
                    data: data.clone(),
                });
            }
        }
    }

    /// Frame box, ticks, tick labels, axis titles and the pad title
    fn frame_shapes(&self, frame: &Frame, out: &mut Vec<Shape>) {
        let m = &self.margins;
        let (x0, y0) = self.ndc(m.left, m.bottom);
        let (x1, y1) = self.ndc(1.0 - m.right, 1.0 - m.top);
        out.push(Shape::Rect {
            x: x0,
            y: y1,
            w: x1 - x0,
            h: y0 - y1,
            stroke: Some(Stroke::default()),
            fill: None,
        });

        let label_size = 0.035;
        let tick_len = 0.015 * self.ph;
        let text = |text: String, x: f64, y: f64, align: i32, angle: f64, size: f64| {
            self.text_shape(&TextItem {
                text,
                x,
                y,
                size,
                align: Align(align),
                angle,
                ..TextItem::default()
            })
        };

        if frame.x_labels.is_empty() {
            for t in ticks(frame.x, frame.log_x) {
                let (nx, _) = self.user_to_ndc(t, frame.y.0);
                let (px, _) = self.ndc(nx, 0.0);
                out.push(Shape::Line {
                    from: (px, y0),
                    to: (px, y0 - tick_len),
                    stroke: Stroke::default(),
                });
                out.push(text(format_tick(t), nx, m.bottom - 0.02, 23, 0.0, label_size));
            }
        } else {
            for (center, label) in &frame.x_labels {
                let (nx, _) = self.user_to_ndc(*center, frame.y.0);
                out.push(text(label.clone(), nx, m.bottom - 0.02, 23, 0.0, label_size));
            }
        }
        for t in ticks(frame.y, frame.log_y) {
            let (_, ny) = self.user_to_ndc(frame.x.0, t);
            let (_, py) = self.ndc(0.0, ny);
            out.push(Shape::Line {
                from: (x0, py),
                to: (x0 + tick_len, py),
                stroke: Stroke::default(),
            });
            out.push(text(format_tick(t), m.left - 0.01, ny, 32, 0.0, label_size));
        }

        if !frame.x_title.is_empty() {
            out.push(text(frame.x_title.clone(), 1.0 - m.right, m.bottom * 0.3, 31, 0.0, 0.04));
        }
        if !frame.y_title.is_empty() {
            out.push(text(frame.y_title.clone(), m.left * 0.3, 1.0 - m.top, 33, 90.0, 0.04));
        }
        if !frame.title.is_empty() {
            out.push(text(frame.title.clone(), 0.5, 1.0 - m.top * 0.4, 22, 0.0, 0.05));
        }
    }
}

/// Position of `v` along `range` as a fraction
fn axis_fraction(v: f64, range: (f64, f64), log: bool) -> f64 {
    let (lo, hi) = range;
    if log && lo > 0.0 && hi > lo {
        if v <= 0.0 {
            return 0.0;
        }
        return (v.log10() - lo.log10()) / (hi.log10() - lo.log10());
    }
    if hi == lo {
        return 0.5;
    }
    (v - lo) / (hi - lo)
}

/// Round tick positions inside `range`
pub(crate) fn ticks(range: (f64, f64), log: bool) -> Vec<f64> {
    let (lo, hi) = range;
    if hi <= lo || !lo.is_finite() || !hi.is_finite() {
        return Vec::new();
    }
    if log && lo > 0.0 {
        let first = (lo.log10() - 1e-9).ceil() as i32;
        let last = (hi.log10() + 1e-9).floor() as i32;
        return (first..=last).map(|e| 10f64.powi(e)).collect();
    }
    let raw = (hi - lo) / 5.0;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);
    let mut out = Vec::new();
    let mut t = (lo / step).ceil() * step;
    while t <= hi + step * 1e-9 {
        // avoid printing -0
        out.push(if t.abs() < step * 1e-9 { 0.0 } else { t });
        t += step;
    }
    out
}

fn format_tick(v: f64) -> String {
    if v != 0.0 && (v.abs() >= 1e5 || v.abs() < 1e-3) {
        return format!("{:e}", v);
    }
    let s = format!("{:.4}", v);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Records everything drawn and prints it on demand
#[derive(Debug, Default)]
pub struct SceneBackend {
    canvases: Vec<Canvas>,
    current: Option<usize>,
    printed: Vec<PathBuf>,
    svg: SvgConfig,
}

impl SceneBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_svg_config(mut self, config: SvgConfig) -> Self {
        self.svg = config;
        self
    }

    pub fn canvases(&self) -> &[Canvas] {
        &self.canvases
    }

    pub fn current_canvas(&self) -> Option<&Canvas> {
        self.current.and_then(|i| self.canvases.get(i))
    }

    /// Every file written so far, in order
    pub fn printed(&self) -> &[PathBuf] {
        &self.printed
    }

    fn canvas_mut(&mut self) -> &mut Canvas {
        if self.current.is_none() {
            tracing::debug!("drawing without a canvas, creating a default one");
            self.new_canvas("c", 800, 600);
        }
        let i = self.current.unwrap_or(0);
        &mut self.canvases[i]
    }
}

impl Backend for SceneBackend {
    fn new_canvas(&mut self, name: &str, width: u32, height: u32) {
        self.canvases.push(Canvas::new(name, width.max(1), height.max(1)));
        self.current = Some(self.canvases.len() - 1);
    }

    fn has_canvas(&self) -> bool {
        self.current.is_some()
    }

    fn new_pad(&mut self, name: &str, rect: Rect) {
        let canvas = self.canvas_mut();
        canvas.pads.push(Pad::new(name, rect));
        canvas.current = canvas.pads.len() - 1;
    }

    fn select_canvas(&mut self) {
        self.canvas_mut().current = 0;
    }

    fn set_pad_rect(&mut self, rect: Rect) {
        self.canvas_mut().current_pad_mut().rect = rect;
    }

    fn set_margins(&mut self, margins: Margins) {
        self.canvas_mut().current_pad_mut().margins = margins;
    }

    fn margins(&self) -> Margins {
        self.current_canvas()
            .map(|c| c.current_pad().margins)
            .unwrap_or_default()
    }

    fn set_frame(&mut self, frame: Frame) {
        self.canvas_mut().current_pad_mut().frame = Some(frame);
    }

    fn frame(&self) -> Option<Frame> {
        self.current_canvas().and_then(|c| c.current_pad().frame.clone())
    }

    fn draw(&mut self, primitive: Primitive) {
        self.canvas_mut().current_pad_mut().primitives.push(primitive);
    }

    fn print(&mut self, url: &Path, scope: PrintScope) -> Result<(), RenderError> {
        let format = OutputFormat::from_path(url)?;
        let canvas = self
            .current_canvas()
            .ok_or_else(|| RenderError::NoCanvas(url.display().to_string()))?;
        let shapes = canvas.shapes(scope);
        let (w, h) = (canvas.width, canvas.height);
        match format {
            OutputFormat::Svg => {
                let text = svg::render_shapes(w, h, &shapes, &self.svg);
                std::fs::write(url, text).map_err(|source| RenderError::Io {
                    path: url.display().to_string(),
                    source,
                })?;
            }
            OutputFormat::Raster(fmt) => {
                let image = raster::render_shapes(w, h, &shapes);
                image
                    .save_with_format(url, fmt)
                    .map_err(|source| RenderError::Image {
                        path: url.display().to_string(),
                        source,
                    })?;
            }
        }
        tracing::info!(url = %url.display(), "printed");
        self.printed.push(url.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_selection() {
        let mut b = SceneBackend::new();
        assert!(!b.has_canvas());
        b.new_canvas("c1", 400, 300);
        b.new_pad("p1", Rect::new(0.0, 0.0, 0.5, 1.0));
        b.draw(Primitive::Text(TextItem::default()));
        b.select_canvas();
        b.draw(Primitive::Text(TextItem::default()));
        let canvas = b.current_canvas().unwrap();
        assert_eq!(canvas.pads.len(), 2);
        assert_eq!(canvas.pads[0].primitives.len(), 1);
        assert_eq!(canvas.pads[1].primitives.len(), 1);
    }

    #[test]
    fn test_user_coordinates_map_into_frame() {
        let mut b = SceneBackend::new();
        b.new_canvas("c", 100, 100);
        b.set_margins(Margins {
            top: 0.0,
            right: 0.0,
            bottom: 0.0,
            left: 0.0,
        });
        b.set_frame(Frame {
            x: (0.0, 10.0),
            y: (0.0, 10.0),
            ..Frame::default()
        });
        b.draw(Primitive::Line {
            from: (0.0, 0.0),
            to: (5.0, 10.0),
            coords: Coords::User,
            stroke: Stroke::default(),
        });
        let shapes = b.current_canvas().unwrap().shapes(PrintScope::Canvas);
        let line = shapes
            .iter()
            .rev()
            .find_map(|s| match s {
                Shape::Line { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .unwrap();
        assert_eq!(line, ((0.0, 100.0), (50.0, 0.0)));
    }

    #[test]
    fn test_ticks() {
        assert_eq!(ticks((0.0, 10.0), false), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(ticks((1.0, 1000.0), true), vec![1.0, 10.0, 100.0, 1000.0]);
        assert!(ticks((1.0, 1.0), false).is_empty());
    }

    #[test]
    fn test_print_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = SceneBackend::new();
        b.new_canvas("c", 10, 10);
        let err = b.print(&dir.path().join("out.pdf"), PrintScope::Canvas);
        assert!(matches!(err, Err(RenderError::UnsupportedFormat { .. })));
        assert!(b.printed().is_empty());
    }

    #[test]
    fn test_print_svg_and_png() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = SceneBackend::new();
        b.new_canvas("c", 40, 30);
        b.draw(Primitive::Box {
            rect: Rect::new(0.1, 0.1, 0.9, 0.9),
            coords: Coords::Ndc,
            stroke: None,
            fill: Some(Color::rgb(255, 0, 0)),
        });
        let svg_path = dir.path().join("out.svg");
        let png_path = dir.path().join("out.png");
        b.print(&svg_path, PrintScope::Canvas).unwrap();
        b.print(&png_path, PrintScope::Canvas).unwrap();
        assert!(std::fs::read_to_string(&svg_path).unwrap().contains("<svg"));
        let img = image::open(&png_path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (40, 30));
        assert_eq!(img.get_pixel(20, 15).0, [255, 0, 0]);
        assert_eq!(b.printed().len(), 2);
    }
}

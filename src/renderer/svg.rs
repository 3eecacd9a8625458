//! SVG generation from flattened canvas shapes

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::escape_xml;
use crate::palette::Color;

use super::primitive::{Anchor, Baseline, Shape, Stroke};
use super::SvgConfig;

/// Build SVG elements incrementally
pub struct SvgBuilder {
    config: SvgConfig,
    elements: Vec<String>,
    indent: usize,
}

impl SvgBuilder {
    pub fn new(config: SvgConfig) -> Self {
        Self {
            config,
            elements: vec![],
            indent: 1,
        }
    }

    fn prefix(&self) -> String {
        self.config.class_prefix.clone().unwrap_or_default()
    }

    fn indent_str(&self) -> String {
        if self.config.pretty_print {
            "  ".repeat(self.indent)
        } else {
            String::new()
        }
    }

    fn newline(&self) -> &str {
        if self.config.pretty_print {
            "\n"
        } else {
            ""
        }
    }

    fn class_attr(&self, kind: &str) -> String {
        format!(r#" class="{}{}""#, self.prefix(), kind)
    }

    pub fn add_rect(&mut self, x: f64, y: f64, w: f64, h: f64, styles: &str) {
        self.elements.push(format!(
            r#"{}<rect{} x="{}" y="{}" width="{}" height="{}"{}/>"#,
            self.indent_str(),
            self.class_attr("box"),
            fmt(x),
            fmt(y),
            fmt(w),
            fmt(h),
            styles
        ));
    }

    pub fn add_ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, styles: &str) {
        self.elements.push(format!(
            r#"{}<ellipse{} cx="{}" cy="{}" rx="{}" ry="{}"{}/>"#,
            self.indent_str(),
            self.class_attr("ellipse"),
            fmt(cx),
            fmt(cy),
            fmt(rx),
            fmt(ry),
            styles
        ));
    }

    pub fn add_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, styles: &str) {
        self.elements.push(format!(
            r#"{}<line{} x1="{}" y1="{}" x2="{}" y2="{}"{}/>"#,
            self.indent_str(),
            self.class_attr("line"),
            fmt(x1),
            fmt(y1),
            fmt(x2),
            fmt(y2),
            styles
        ));
    }

    pub fn add_polyline(&mut self, points: &[(f64, f64)], styles: &str) {
        if points.is_empty() {
            return;
        }
        self.elements.push(format!(
            r#"{}<path{} d="{}"{}/>"#,
            self.indent_str(),
            self.class_attr("graph"),
            points_to_d(points),
            styles
        ));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_text(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        size: f64,
        color: Color,
        anchor: Anchor,
        baseline: Baseline,
        angle: f64,
    ) {
        let anchor_str = match anchor {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        };
        let baseline_str = match baseline {
            Baseline::Bottom => "auto",
            Baseline::Middle => "middle",
            Baseline::Top => "hanging",
        };
        let rotate = if angle != 0.0 {
            format!(r#" transform="rotate({} {} {})""#, fmt(-angle), fmt(x), fmt(y))
        } else {
            String::new()
        };
        self.elements.push(format!(
            r#"{}<text{} x="{}" y="{}" font-size="{}" fill="{}" text-anchor="{}" dominant-baseline="{}"{}>{}</text>"#,
            self.indent_str(),
            self.class_attr("text"),
            fmt(x),
            fmt(y),
            fmt(size),
            color.to_hex(),
            anchor_str,
            baseline_str,
            rotate,
            escape_xml(text)
        ));
    }

    /// Embed encoded image bytes as a data url
    pub fn add_image(&mut self, x: f64, y: f64, w: f64, h: f64, data: &[u8]) {
        let mime = match image::guess_format(data) {
            Ok(image::ImageFormat::Jpeg) => "image/jpeg",
            Ok(image::ImageFormat::Gif) => "image/gif",
            Ok(image::ImageFormat::Bmp) => "image/bmp",
            _ => "image/png",
        };
        self.elements.push(format!(
            r#"{}<image{} x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="none" href="data:{};base64,{}"/>"#,
            self.indent_str(),
            self.class_attr("image"),
            fmt(x),
            fmt(y),
            fmt(w),
            fmt(h),
            mime,
            STANDARD.encode(data)
        ));
    }

    pub fn start_group(&mut self, id: Option<&str>) {
        let id_attr = id
            .map(|i| format!(r#" id="{}""#, escape_xml(i)))
            .unwrap_or_default();
        self.elements
            .push(format!("{}<g{}>", self.indent_str(), id_attr));
        self.indent += 1;
    }

    pub fn end_group(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.elements.push(format!("{}</g>", self.indent_str()));
    }

    /// Build the final SVG string
    pub fn build(self, width: u32, height: u32) -> String {
        let nl = self.newline();
        let mut svg = String::new();

        if self.config.standalone {
            svg.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
            svg.push_str(nl);
        }
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="{font}">"#,
            w = width,
            h = height,
            font = self.config.font_family
        ));
        svg.push_str(nl);
        for elem in &self.elements {
            svg.push_str(elem);
            svg.push_str(nl);
        }
        svg.push_str("</svg>");
        svg
    }
}

/// Render flattened shapes to an SVG document
pub fn render_shapes(width: u32, height: u32, shapes: &[Shape], config: &SvgConfig) -> String {
    let mut builder = SvgBuilder::new(config.clone());
    builder.start_group(None);
    for shape in shapes {
        match shape {
            Shape::Line { from, to, stroke } => {
                builder.add_line(from.0, from.1, to.0, to.1, &format_styles(Some(stroke), None));
            }
            Shape::Polyline {
                points,
                stroke,
                fill,
            } => builder.add_polyline(points, &format_styles(stroke.as_ref(), *fill)),
            Shape::Rect {
                x,
                y,
                w,
                h,
                stroke,
                fill,
            } => builder.add_rect(*x, *y, *w, *h, &format_styles(stroke.as_ref(), *fill)),
            Shape::Ellipse {
                cx,
                cy,
                rx,
                ry,
                stroke,
                fill,
            } => builder.add_ellipse(*cx, *cy, *rx, *ry, &format_styles(stroke.as_ref(), *fill)),
            Shape::Text {
                x,
                y,
                text,
                size,
                color,
                anchor,
                baseline,
                angle,
            } => builder.add_text(text, *x, *y, *size, *color, *anchor, *baseline, *angle),
            Shape::Image { x, y, w, h, data } => builder.add_image(*x, *y, *w, *h, data),
        }
    }
    builder.end_group();
    builder.build(width, height)
}

/// Stroke and fill as SVG attributes
fn format_styles(stroke: Option<&Stroke>, fill: Option<Color>) -> String {
    let mut parts = vec![];
    match fill {
        Some(c) => parts.push(format!(r#" fill="{}""#, c.to_hex())),
        None => parts.push(r#" fill="none""#.to_string()),
    }
    if let Some(s) = stroke {
        parts.push(format!(r#" stroke="{}""#, s.color.to_hex()));
        parts.push(format!(r#" stroke-width="{}""#, fmt(s.width)));
        if let Some(dash) = s.dash_pattern() {
            parts.push(format!(r#" stroke-dasharray="{}""#, dash));
        }
    }
    parts.join("")
}

fn points_to_d(points: &[(f64, f64)]) -> String {
    let mut d = String::new();
    for (i, (x, y)) in points.iter().enumerate() {
        if i > 0 {
            d.push(' ');
        }
        d.push_str(&format!("{}{} {}", if i == 0 { "M" } else { "L" }, fmt(*x), fmt(*y)));
    }
    d
}

/// Two decimals, trailing zeros dropped
fn fmt(v: f64) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

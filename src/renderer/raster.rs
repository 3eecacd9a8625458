//! Raster output of flattened shapes
//!
//! Lines, boxes, ellipses, filled polygons and embedded images are drawn;
//! text is left out of raster images.

use image::{imageops, Rgb, RgbImage};

use crate::palette::Color;

use super::primitive::{Shape, Stroke};

pub fn render_shapes(width: u32, height: u32, shapes: &[Shape]) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for shape in shapes {
        match shape {
            Shape::Line { from, to, stroke } => draw_line(&mut img, *from, *to, stroke),
            Shape::Polyline {
                points,
                stroke,
                fill,
            } => {
                if let Some(c) = fill {
                    fill_polygon(&mut img, points, *c);
                }
                if let Some(s) = stroke {
                    for w in points.windows(2) {
                        draw_line(&mut img, w[0], w[1], s);
                    }
                }
            }
            Shape::Rect {
                x,
                y,
                w,
                h,
                stroke,
                fill,
            } => {
                if let Some(c) = fill {
                    fill_rect(&mut img, *x, *y, *w, *h, *c);
                }
                if let Some(s) = stroke {
                    let corners = [(*x, *y), (x + w, *y), (x + w, y + h), (*x, y + h), (*x, *y)];
                    for c in corners.windows(2) {
                        draw_line(&mut img, c[0], c[1], s);
                    }
                }
            }
            Shape::Ellipse {
                cx,
                cy,
                rx,
                ry,
                stroke,
                fill,
            } => {
                if let Some(c) = fill {
                    fill_ellipse(&mut img, *cx, *cy, *rx, *ry, *c);
                }
                if let Some(s) = stroke {
                    let n = ((rx + ry) * 2.0).clamp(16.0, 720.0) as usize;
                    let points: Vec<(f64, f64)> = (0..=n)
                        .map(|i| {
                            let t = i as f64 / n as f64 * std::f64::consts::TAU;
                            (cx + rx * t.cos(), cy + ry * t.sin())
                        })
                        .collect();
                    for w in points.windows(2) {
                        draw_line(&mut img, w[0], w[1], s);
                    }
                }
            }
            Shape::Text { .. } => {}
            Shape::Image { x, y, w, h, data } => draw_image(&mut img, *x, *y, *w, *h, data),
        }
    }
    img
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Color) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, Rgb([color.r, color.g, color.b]));
    }
}

fn fill_rect(img: &mut RgbImage, x: f64, y: f64, w: f64, h: f64, color: Color) {
    let (x0, y0) = (x.round() as i64, y.round() as i64);
    let (x1, y1) = ((x + w).round() as i64, (y + h).round() as i64);
    for py in y0.max(0)..y1.min(img.height() as i64) {
        for px in x0.max(0)..x1.min(img.width() as i64) {
            put(img, px, py, color);
        }
    }
}

/// Whether the dash pattern is "on" at distance `d` along the line
fn dash_on(stroke: &Stroke, d: f64) -> bool {
    let Some(pattern) = stroke.dash_pattern() else {
        return true;
    };
    let segments: Vec<f64> = pattern
        .split(',')
        .filter_map(|s| s.parse::<f64>().ok())
        .map(|s| s * stroke.width.max(1.0))
        .collect();
    let total: f64 = segments.iter().sum();
    if total <= 0.0 {
        return true;
    }
    let mut rem = d % total;
    for (i, s) in segments.iter().enumerate() {
        if rem < *s {
            return i % 2 == 0;
        }
        rem -= s;
    }
    true
}

fn draw_line(img: &mut RgbImage, from: (f64, f64), to: (f64, f64), stroke: &Stroke) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let len = (dx * dx + dy * dy).sqrt();
    let steps = len.ceil().max(1.0) as usize;
    let half = ((stroke.width - 1.0) / 2.0).max(0.0).round() as i64;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        if !dash_on(stroke, t * len) {
            continue;
        }
        let (x, y) = (
            (from.0 + dx * t).round() as i64,
            (from.1 + dy * t).round() as i64,
        );
        for oy in -half..=half {
            for ox in -half..=half {
                put(img, x + ox, y + oy, stroke.color);
            }
        }
    }
}

/// Even-odd scanline fill
fn fill_polygon(img: &mut RgbImage, points: &[(f64, f64)], color: Color) {
    if points.len() < 3 {
        return;
    }
    let (min_y, max_y) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
    let y0 = min_y.floor().max(0.0) as i64;
    let y1 = max_y.ceil().min(img.height() as f64) as i64;
    for py in y0..y1 {
        let sy = py as f64 + 0.5;
        let mut xs: Vec<f64> = Vec::new();
        for i in 0..points.len() {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            if (a.1 <= sy && b.1 > sy) || (b.1 <= sy && a.1 > sy) {
                xs.push(a.0 + (sy - a.1) / (b.1 - a.1) * (b.0 - a.0));
            }
        }
        xs.sort_by(f64::total_cmp);
        for pair in xs.chunks(2) {
            if let [xa, xb] = pair {
                for px in xa.round() as i64..xb.round() as i64 {
                    put(img, px, py, color);
                }
            }
        }
    }
}

fn fill_ellipse(img: &mut RgbImage, cx: f64, cy: f64, rx: f64, ry: f64, color: Color) {
    if rx <= 0.0 || ry <= 0.0 {
        return;
    }
    for py in (cy - ry).floor() as i64..=(cy + ry).ceil() as i64 {
        for px in (cx - rx).floor() as i64..=(cx + rx).ceil() as i64 {
            let nx = (px as f64 + 0.5 - cx) / rx;
            let ny = (py as f64 + 0.5 - cy) / ry;
            if nx * nx + ny * ny <= 1.0 {
                put(img, px, py, color);
            }
        }
    }
}

fn draw_image(img: &mut RgbImage, x: f64, y: f64, w: f64, h: f64, data: &[u8]) {
    let decoded = match image::load_from_memory(data) {
        Ok(d) => d.to_rgb8(),
        Err(e) => {
            tracing::warn!(error = %e, "cannot decode embedded image");
            return;
        }
    };
    let (w, h) = (w.round().max(1.0) as u32, h.round().max(1.0) as u32);
    let scaled = imageops::resize(&decoded, w, h, imageops::FilterType::Triangle);
    imageops::overlay(img, &scaled, x.round() as i64, y.round() as i64);
}

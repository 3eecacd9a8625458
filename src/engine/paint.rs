//! Turning plot objects into primitives
//!
//! Everything here is pure: an object, its style and the pad frame go in,
//! primitives in user coordinates come out. Values are clamped to the frame.

use crate::objects::{Function, Graph, Histogram, Style};
use crate::palette::{Color, Palette};
use crate::renderer::{Coords, Frame, Primitive, Rect, Stroke};

const MARKER_SCALE: f64 = 0.006;

fn color(spec: Option<&str>, palette: &Palette, default: Color) -> Color {
    spec.map_or(default, |c| palette.resolve_or_default(c))
}

pub(crate) fn line_stroke(style: &Style, palette: &Palette, default: Color) -> Stroke {
    Stroke {
        color: color(style.line_color.as_deref(), palette, default),
        width: style.line_width.unwrap_or(1.0),
        style: style.line_style.unwrap_or(1),
    }
}

/// Fill color, `None` for hollow styles or when no color is set
pub(crate) fn fill_color(style: &Style, palette: &Palette) -> Option<Color> {
    if style.fill_style == Some(0) {
        return None;
    }
    style
        .fill_color
        .as_deref()
        .map(|c| palette.resolve_or_default(c))
}

pub(crate) fn markers(
    points: Vec<(f64, f64)>,
    coords: Coords,
    style: &Style,
    palette: &Palette,
) -> Primitive {
    Primitive::Markers {
        points,
        coords,
        color: color(style.marker_color.as_deref(), palette, Color::BLACK),
        size: style.marker_size.unwrap_or(1.0) * MARKER_SCALE,
        style: style.marker_style.unwrap_or(20),
    }
}

fn clamp(v: f64, (lo, hi): (f64, f64)) -> f64 {
    v.max(lo).min(hi)
}

fn padded(lo: f64, hi: f64, log: bool) -> (f64, f64) {
    if log {
        let lo = if lo > 0.0 { lo * 0.5 } else { 0.1 };
        let hi = if hi > lo { hi * 2.0 } else { lo * 10.0 };
        return (lo, hi);
    }
    let lo = if lo < 0.0 { lo * 1.05 } else { 0.0 };
    let hi = if hi > 0.0 { hi * 1.05 } else { 1.0 };
    (lo, hi)
}

/// Frame fitting a histogram, honoring the ranges and titles of its style
pub(crate) fn histogram_frame(h: &Histogram) -> Frame {
    let style = &h.style;
    let x_axis = h.axis(0);
    let x = style.x_range.unwrap_or_else(|| {
        x_axis.map_or((0.0, 1.0), |a| (a.bins.minimum(), a.bins.maximum()))
    });
    let log_y = style.log_y.unwrap_or(false);
    let y = style.y_range.unwrap_or_else(|| match h.axis(1) {
        Some(a) => (a.bins.minimum(), a.bins.maximum()),
        None if log_y => {
            let smallest = h
                .in_range_bins()
                .map(|g| h.bin_content(g))
                .filter(|v| *v > 0.0)
                .fold(f64::INFINITY, f64::min);
            padded(if smallest.is_finite() { smallest } else { 0.0 }, h.maximum(), true)
        }
        None => padded(h.minimum(), h.maximum(), false),
    });

    let axis_title = |i: usize| h.axis(i).map(|a| a.title.clone()).unwrap_or_default();
    let x_labels = x_axis
        .filter(|a| a.has_labels())
        .map(|a| {
            (1..=a.nbins())
                .filter_map(|b| a.label(b).map(|l| (a.center(b), l.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Frame {
        x,
        y,
        log_x: style.log_x.unwrap_or(false),
        log_y,
        title: style.title.clone().unwrap_or_else(|| h.title.clone()),
        x_title: style.x_title.clone().unwrap_or_else(|| axis_title(0)),
        y_title: style.y_title.clone().unwrap_or_else(|| axis_title(1)),
        x_labels,
    }
}

pub(crate) fn graph_frame(g: &Graph) -> Frame {
    let ((x0, x1), (y0, y1)) = g.bounds().unwrap_or(((0.0, 1.0), (0.0, 1.0)));
    let dy = if y1 > y0 { (y1 - y0) * 0.05 } else { 0.5 };
    frame_from_style(&g.style, &g.title, (x0, x1), (y0 - dy, y1 + dy))
}

pub(crate) fn function_frame(f: &Function) -> Frame {
    let samples = f.sample();
    let (lo, hi) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, y)| (lo.min(*y), hi.max(*y)));
    let (lo, hi) = if lo.is_finite() { (lo, hi) } else { (0.0, 1.0) };
    let dy = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
    frame_from_style(&f.style, &f.title, (f.min, f.max), (lo - dy, hi + dy))
}

fn frame_from_style(style: &Style, title: &str, x: (f64, f64), y: (f64, f64)) -> Frame {
    Frame {
        x: style.x_range.unwrap_or(x),
        y: style.y_range.unwrap_or(y),
        log_x: style.log_x.unwrap_or(false),
        log_y: style.log_y.unwrap_or(false),
        title: style.title.clone().unwrap_or_else(|| title.to_string()),
        x_title: style.x_title.clone().unwrap_or_default(),
        y_title: style.y_title.clone().unwrap_or_default(),
        x_labels: Vec::new(),
    }
}

/// Primitives for a histogram of any dimension
pub(crate) fn histogram(h: &Histogram, palette: &Palette, frame: &Frame) -> Vec<Primitive> {
    match h.dim() {
        1 => histogram_1d(h, palette, frame),
        2 => histogram_2d(h, palette, frame),
        _ => match h.project_3d(h.name.clone(), "x", [None, None, None]) {
            Ok(mut projected) => {
                tracing::warn!(name = %h.name, "3D histograms are drawn as their x projection");
                projected.style = h.style.clone();
                histogram_1d(&projected, palette, frame)
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot draw histogram");
                Vec::new()
            }
        },
    }
}

fn histogram_1d(h: &Histogram, palette: &Palette, frame: &Frame) -> Vec<Primitive> {
    let Some(axis) = h.axis(0) else {
        return Vec::new();
    };
    let style = &h.style;
    let default = if h.has_sumw2() { "pe" } else { "hist" };
    let opt = style.draw_option(default).to_lowercase().replace("same", "");
    let (opt, mut outline) = match opt.find("hist") {
        Some(_) => (opt.replace("hist", ""), true),
        None => (opt, false),
    };
    let errors = opt.contains('e');
    let points = opt.contains('p');
    let curve = opt.contains('l') || opt.contains('c');
    if !errors && !points && !curve {
        outline = true;
    }

    let (x0, x1) = frame.x;
    let base = clamp(0.0, frame.y);
    // (low, high, center, content, error) of bins touching the frame
    let bins: Vec<(f64, f64, f64, f64, f64)> = (1..=axis.nbins())
        .filter(|b| axis.up_edge(*b) > x0 && axis.low_edge(*b) < x1)
        .map(|b| {
            let g = h.global_bin(b, 0, 0);
            (
                axis.low_edge(b).max(x0),
                axis.up_edge(b).min(x1),
                axis.center(b),
                h.bin_content(g),
                h.bin_error(g),
            )
        })
        .collect();
    if bins.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let stroke = line_stroke(style, palette, Color::BLACK);
    if outline || fill_color(style, palette).is_some() {
        let mut steps = vec![(bins[0].0, base)];
        for (lo, hi, _, y, _) in &bins {
            let y = clamp(*y, frame.y);
            steps.push((*lo, y));
            steps.push((*hi, y));
        }
        steps.push((bins[bins.len() - 1].1, base));
        out.push(Primitive::Polyline {
            points: steps,
            coords: Coords::User,
            stroke: outline.then_some(stroke),
            fill: fill_color(style, palette),
        });
    }
    if curve {
        out.push(Primitive::Polyline {
            points: bins
                .iter()
                .filter(|b| b.2 >= x0 && b.2 <= x1)
                .map(|(_, _, c, y, _)| (*c, clamp(*y, frame.y)))
                .collect(),
            coords: Coords::User,
            stroke: Some(stroke),
            fill: None,
        });
    }
    if errors {
        let err_stroke = Stroke {
            color: color(style.marker_color.as_deref().or(style.line_color.as_deref()), palette, Color::BLACK),
            ..stroke
        };
        for (lo, hi, c, y, e) in &bins {
            if *y == 0.0 && *e == 0.0 {
                continue;
            }
            let yc = clamp(*y, frame.y);
            out.push(Primitive::Line {
                from: (*c, clamp(y - e, frame.y)),
                to: (*c, clamp(y + e, frame.y)),
                coords: Coords::User,
                stroke: err_stroke,
            });
            out.push(Primitive::Line {
                from: (*lo, yc),
                to: (*hi, yc),
                coords: Coords::User,
                stroke: err_stroke,
            });
        }
    }
    if points {
        let centers = bins
            .iter()
            .filter(|(_, _, c, y, _)| *c >= x0 && *c <= x1 && *y >= frame.y.0 && *y <= frame.y.1)
            .map(|(_, _, c, y, _)| (*c, *y))
            .collect();
        out.push(markers(centers, Coords::User, style, palette));
    }
    out
}

/// Blue to yellow gradient for 2D contents, `t` in 0..=1
fn gradient(t: f64) -> Color {
    const STOPS: [(f64, f64, f64); 5] = [
        (68.0, 1.0, 84.0),
        (59.0, 82.0, 139.0),
        (33.0, 145.0, 140.0),
        (94.0, 201.0, 98.0),
        (253.0, 231.0, 37.0),
    ];
    let t = t.clamp(0.0, 1.0) * (STOPS.len() - 1) as f64;
    let i = (t.floor() as usize).min(STOPS.len() - 2);
    let f = t - i as f64;
    let (a, b) = (STOPS[i], STOPS[i + 1]);
    let mix = |p: f64, q: f64| (p + (q - p) * f).round() as u8;
    Color::rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

fn histogram_2d(h: &Histogram, palette: &Palette, frame: &Frame) -> Vec<Primitive> {
    let (Some(ax), Some(ay)) = (h.axis(0), h.axis(1)) else {
        return Vec::new();
    };
    let opt = h.style.draw_option("col").to_lowercase();
    let boxes = opt.contains("box");
    let max = h.maximum();
    if !(max > 0.0) {
        return Vec::new();
    }
    let stroke = line_stroke(&h.style, palette, Color::BLACK);

    let mut out = Vec::new();
    for g in h.in_range_bins() {
        let v = h.bin_content(g);
        if v <= 0.0 {
            continue;
        }
        let [bx, by, _] = h.bin_coords(g);
        let (x1, x2) = (ax.low_edge(bx).max(frame.x.0), ax.up_edge(bx).min(frame.x.1));
        let (y1, y2) = (ay.low_edge(by).max(frame.y.0), ay.up_edge(by).min(frame.y.1));
        if x1 >= x2 || y1 >= y2 {
            continue;
        }
        let rect = if boxes {
            let s = (v / max).sqrt() / 2.0;
            let (cx, cy, w, hh) = ((x1 + x2) / 2.0, (y1 + y2) / 2.0, x2 - x1, y2 - y1);
            Rect::new(cx - w * s, cy - hh * s, cx + w * s, cy + hh * s)
        } else {
            Rect::new(x1, y1, x2, y2)
        };
        out.push(Primitive::Box {
            rect,
            coords: Coords::User,
            stroke: boxes.then_some(stroke),
            fill: (!boxes).then(|| gradient(v / max)),
        });
    }
    out
}

pub(crate) fn graph(g: &Graph, palette: &Palette, frame: &Frame) -> Vec<Primitive> {
    let style = &g.style;
    let opt = style
        .draw_option("p")
        .to_lowercase()
        .replace("same", "")
        .replace('a', "");
    let curve = opt.contains('l') || opt.contains('c');
    let points = opt.contains('p') || !curve;
    let stroke = line_stroke(style, palette, Color::BLACK);
    let inside = |x: f64, y: f64| {
        x >= frame.x.0 && x <= frame.x.1 && y >= frame.y.0 && y <= frame.y.1
    };

    let mut out = Vec::new();
    if curve {
        out.push(Primitive::Polyline {
            points: g
                .points
                .iter()
                .map(|p| (clamp(p.x, frame.x), clamp(p.y, frame.y)))
                .collect(),
            coords: Coords::User,
            stroke: Some(stroke),
            fill: fill_color(style, palette),
        });
    }
    for p in g.points.iter().filter(|p| inside(p.x, p.y)) {
        if p.ey > 0.0 {
            out.push(Primitive::Line {
                from: (p.x, clamp(p.y - p.ey, frame.y)),
                to: (p.x, clamp(p.y + p.ey, frame.y)),
                coords: Coords::User,
                stroke,
            });
        }
        if p.ex > 0.0 {
            out.push(Primitive::Line {
                from: (clamp(p.x - p.ex, frame.x), p.y),
                to: (clamp(p.x + p.ex, frame.x), p.y),
                coords: Coords::User,
                stroke,
            });
        }
    }
    if points {
        let pts = g
            .points
            .iter()
            .filter(|p| inside(p.x, p.y))
            .map(|p| (p.x, p.y))
            .collect();
        out.push(markers(pts, Coords::User, style, palette));
    }
    out
}

pub(crate) fn function(f: &Function, palette: &Palette, frame: &Frame) -> Vec<Primitive> {
    let style = &f.style;
    let red = palette.resolve("kRed").unwrap_or(Color::rgb(255, 0, 0));
    let stroke = Stroke {
        width: style.line_width.unwrap_or(2.0),
        ..line_stroke(style, palette, red)
    };
    let points: Vec<(f64, f64)> = f
        .sample()
        .into_iter()
        .filter(|(x, _)| *x >= frame.x.0 && *x <= frame.x.1)
        .map(|(x, y)| (x, clamp(y, frame.y)))
        .collect();
    if points.len() < 2 {
        return Vec::new();
    }
    vec![Primitive::Polyline {
        points,
        coords: Coords::User,
        stroke: Some(stroke),
        fill: None,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Bins;

    fn filled() -> Histogram {
        let mut h = Histogram::new_1d("h", "title", Bins::linspace(4, 0.0, 4.0)).unwrap();
        for (x, w) in [(0.5, 1.0), (1.5, 4.0), (2.5, 2.0)] {
            h.fill(&[x], w);
        }
        h
    }

    #[test]
    fn test_histogram_frame_pads_maximum() {
        let mut h = filled();
        h.style.x_title = Some("mass".into());
        let frame = histogram_frame(&h);
        assert_eq!(frame.x, (0.0, 4.0));
        assert_eq!(frame.y.0, 0.0);
        assert!((frame.y.1 - 4.2).abs() < 1e-9);
        assert_eq!(frame.title, "title");
        assert_eq!(frame.x_title, "mass");
    }

    #[test]
    fn test_frame_uses_style_range_and_labels() {
        let mut h = filled();
        h.style.x_range = Some((1.0, 3.0));
        h.axis_mut(0).unwrap().set_label(2, "two");
        let frame = histogram_frame(&h);
        assert_eq!(frame.x, (1.0, 3.0));
        assert_eq!(frame.x_labels, vec![(1.5, "two".to_string())]);
    }

    #[test]
    fn test_hist_outline_is_clamped_to_frame() {
        let mut h = filled();
        h.style.draw = Some("hist".into());
        let frame = Frame {
            x: (1.0, 4.0),
            y: (0.0, 3.0),
            ..Frame::default()
        };
        let prims = histogram(&h, &Palette::default(), &frame);
        assert_eq!(prims.len(), 1);
        let Primitive::Polyline { points, stroke, .. } = &prims[0] else {
            panic!("expected an outline");
        };
        assert!(stroke.is_some());
        assert_eq!(points.first(), Some(&(1.0, 0.0)));
        // the 4.0 bin is cut at the frame top
        assert_eq!(points[1], (1.0, 3.0));
        assert_eq!(points.last(), Some(&(4.0, 0.0)));
    }

    #[test]
    fn test_error_option_draws_bars_and_markers() {
        let mut h = filled();
        h.enable_sumw2();
        let frame = histogram_frame(&h);
        let prims = histogram(&h, &Palette::default(), &frame);
        let lines = prims.iter().filter(|p| matches!(p, Primitive::Line { .. })).count();
        // three non-empty bins, vertical and horizontal bar each
        assert_eq!(lines, 6);
        assert!(matches!(prims.last(), Some(Primitive::Markers { points, .. }) if points.len() == 4));
    }

    #[test]
    fn test_2d_colors_nonempty_bins() {
        let mut h = Histogram::new(
            "h2",
            "",
            vec![Bins::linspace(2, 0.0, 2.0), Bins::linspace(2, 0.0, 2.0)],
        )
        .unwrap();
        h.fill(&[0.5, 0.5], 1.0);
        h.fill(&[1.5, 1.5], 3.0);
        let frame = histogram_frame(&h);
        assert_eq!(frame.y, (0.0, 2.0));
        let prims = histogram(&h, &Palette::default(), &frame);
        assert_eq!(prims.len(), 2);
        assert!(matches!(&prims[1], Primitive::Box { fill: Some(c), .. } if *c == gradient(1.0)));
    }

    #[test]
    fn test_function_defaults_to_red() {
        let mut f = Function::new("f", "x*x", 0.0, 2.0).unwrap();
        f.npx = 5;
        let frame = function_frame(&f);
        let prims = function(&f, &Palette::default(), &frame);
        let Primitive::Polyline { points, stroke: Some(s), .. } = &prims[0] else {
            panic!("expected a curve");
        };
        assert_eq!(points.len(), 5);
        assert_eq!(s.color, Color::rgb(255, 0, 0));
        assert_eq!(s.width, 2.0);
    }

    #[test]
    fn test_graph_with_errors() {
        let g = Graph::from_arrays("g", &[1.0, 2.0], &[1.0, 2.0], &[0.1, 0.1], &[0.0, 0.5]);
        let frame = graph_frame(&g);
        let prims = graph(&g, &Palette::default(), &frame);
        let lines = prims.iter().filter(|p| matches!(p, Primitive::Line { .. })).count();
        assert_eq!(lines, 3);
        assert!(matches!(prims.last(), Some(Primitive::Markers { .. })));
    }

    #[test]
    fn test_fill_color_respects_hollow_style() {
        let style = Style {
            fill_color: Some("kBlue".into()),
            fill_style: Some(0),
            ..Style::default()
        };
        assert_eq!(fill_color(&style, &Palette::default()), None);
    }
}

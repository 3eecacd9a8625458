//! Canvas, pad and plot handlers
//!
//! A `Plot` draws into the current pad: frame from `Axes` or from the first
//! object drawn, then objects and decorations in document order, then the
//! legend, then its exports.

use crate::config::{join_path, Env, View};
use crate::error::format_errors;
use crate::names::{data_only, fully_qualified_name, name_only, underscape};
use crate::objects::{share, Bins, Function, ObjectRef, PlotObject, Style};
use crate::palette::Color;
use crate::renderer::{Align, Backend, Coords, Frame, PrintScope, Primitive, Rect, Stroke, TextItem};

use super::legend::{self, LegendEntry, LegendLook, LegendPosition};
use super::{attr, format_value, paint, Plotter};

const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 600;

/// Children a plot executes in document order
const PLOT_CONTENT: &[&str] = &[
    "Loop", "Scope", "Histo", "Graph", "TF1", "TLine", "TLatex", "Rect", "Ellipse", "Image",
];

/// Overlay `top,right,bottom,left` from the node text and named attributes
/// onto `m`; unset entries stay negative
fn read_margins(view: &View<'_>, node: &str, m: &mut [f64; 4]) {
    let parts: Vec<f64> = view.vec(node);
    if let [t, r, b, l, ..] = parts.as_slice() {
        *m = [*t, *r, *b, *l];
    }
    for (i, side) in ["top", "right", "bottom", "left"].iter().enumerate() {
        if let Some(v) = view.get::<f64>(&attr(node, side)) {
            m[i] = v;
        }
    }
}

/// Alignment keyword or numeric code
fn parse_align(text: &str) -> Option<Align> {
    match text.trim() {
        "top" | "t" => Some(Align(13)),
        "center" | "centered" | "c" => Some(Align(12)),
        "bottom" | "b" => Some(Align(11)),
        "special" | "s" => Some(Align(10)),
        other => other.parse().ok().map(Align),
    }
}

/// `x1,y1,x2,y2` from a `pos` vector or individual attributes
fn read_rect(view: &View<'_>, path: &str, default: Rect) -> Rect {
    let pos: Vec<f64> = view.vec(&attr(path, "pos"));
    if let [x1, y1, x2, y2, ..] = pos.as_slice() {
        return Rect::new(*x1, *y1, *x2, *y2);
    }
    Rect::new(
        view.get_or(&attr(path, "x1"), default.x1),
        view.get_or(&attr(path, "y1"), default.y1),
        view.get_or(&attr(path, "x2"), default.x2),
        view.get_or(&attr(path, "y2"), default.y2),
    )
}

impl<B: Backend> Plotter<B> {
    fn open_canvas(&mut self, path: &str, env: &Env<'_>) {
        let view = self.config.view(env);
        let mut width = view.get::<u32>("TCanvas:width");
        let mut height = view.get::<u32>("TCanvas:height");
        let local = join_path(path, "TCanvas");
        width = view.get::<u32>(&attr(&local, "width")).or(width);
        height = view.get::<u32>(&attr(&local, "height")).or(height);
        width = view.get::<u32>(&attr(path, "width")).or(width);
        height = view.get::<u32>(&attr(path, "height")).or(height);
        let name = view.string_or(&attr(path, "name"), "c");
        let (width, height) = (width.unwrap_or(DEFAULT_WIDTH), height.unwrap_or(DEFAULT_HEIGHT));
        tracing::debug!(path, name = %name, width, height, "new canvas");
        self.backend.new_canvas(&name, width, height);
    }

    /// Global `Margins`, then the plot's own `Margins`
    fn apply_plot_margins(&mut self, path: &str, env: &Env<'_>) {
        let mut m = [-1.0; 4];
        {
            let view = self.config.view(env);
            read_margins(&view, "Margins", &mut m);
            read_margins(&view, &join_path(path, "Margins"), &mut m);
        }
        self.set_margins(m);
    }

    fn set_margins(&mut self, m: [f64; 4]) {
        let mut margins = self.backend.margins();
        let [t, r, b, l] = m;
        if t >= 0.0 {
            margins.top = t;
        }
        if r >= 0.0 {
            margins.right = r;
        }
        if b >= 0.0 {
            margins.bottom = b;
        }
        if l >= 0.0 {
            margins.left = l;
        }
        tracing::info!(top = margins.top, right = margins.right, bottom = margins.bottom, left = margins.left, "margins");
        self.backend.set_margins(margins);
    }

    /// `Margins` node outside the plot-level lookup
    pub(super) fn exec_margins(&mut self, path: &str, env: &mut Env<'_>) {
        let mut m = [-1.0; 4];
        read_margins(&self.config.view(env), path, &mut m);
        self.set_margins(m);
    }

    /// `Canvas`: a canvas holding named pads, exported as a whole
    pub(super) fn exec_canvas(&mut self, path: &str, env: &mut Env<'_>) {
        let mut frame = env.child();
        self.open_canvas(path, &frame);

        let (was_in_canvas, was_scope) = (self.in_canvas, self.print_scope);
        self.in_canvas = true;
        self.exec_children(path, Some("Loop"), &mut frame);
        self.exec_children(path, Some("Pad"), &mut frame);

        self.backend.select_canvas();
        self.print_scope = PrintScope::Canvas;
        self.exec_children(path, Some("Export"), &mut frame);

        self.in_canvas = was_in_canvas;
        self.print_scope = was_scope;
    }

    /// `Pad`: a plot drawn over the whole canvas, then moved into place
    pub(super) fn exec_pad(&mut self, path: &str, env: &mut Env<'_>) {
        if !self.in_canvas {
            tracing::warn!(path, "Pad outside of a Canvas, skipping");
            return;
        }
        let (name, rect) = {
            let view = self.config.view(env);
            (view.string_or(&attr(path, "name"), ""), read_rect(&view, path, Rect::FULL))
        };
        if name.is_empty() {
            tracing::warn!(path, "skipping pad without name");
            return;
        }

        self.backend.new_pad(&name, Rect::FULL);
        let scope = self.print_scope;
        self.print_scope = PrintScope::Pad;
        self.exec_plot(path, env);
        self.backend.set_pad_rect(rect);
        self.print_scope = scope;
    }

    /// `Plot`: one frame worth of objects
    pub(super) fn exec_plot(&mut self, path: &str, env: &mut Env<'_>) {
        tracing::info!(path, "plot");
        let mut frame = env.child();
        self.drawn.clear();
        if !self.in_canvas {
            self.open_canvas(path, &frame);
        }
        self.apply_plot_margins(path, &frame);

        self.exec_children(path, Some("Axes"), &mut frame);
        self.exec_children_among(path, PLOT_CONTENT, &mut frame);
        for latex in self.config.children_of("", Some("TLatex"), 1) {
            self.exec_node(&latex, &mut frame);
        }
        self.exec_children_among(path, &["TLegend", "Legend"], &mut frame);
        self.exec_children(path, Some("Export"), &mut frame);
    }

    /// `Axes`: an explicit frame; binds `x_min`, `x_max`, `y_min`, `y_max`
    pub(super) fn exec_axes(&mut self, path: &str, env: &mut Env<'_>) {
        let (x, y, style) = {
            let view = self.config.view(env);
            let axis = |ls: [&str; 2], ar: [&str; 2], list: &str| {
                let mut bins = Bins::default();
                if let Some(spec) = view.one_of(&attr(path, ls[0]), &attr(path, ls[1])) {
                    bins = Bins::parse_linspace(&view.string_or(&spec, ""));
                }
                if let Some(spec) = view.one_of(&attr(path, ar[0]), &attr(path, ar[1])) {
                    bins = Bins::parse_arange(&view.string_or(&spec, ""));
                }
                if bins.is_empty() {
                    if let Some(spec) = view.string(&attr(path, list)) {
                        bins = Bins::from_value(&view, path, &spec);
                    }
                }
                bins
            };
            (
                axis(["x", "lsx"], ["xrange", "xr"], "bins_x"),
                axis(["y", "lsy"], ["yrange", "yr"], "bins_y"),
                Style::from_view(&view, path),
            )
        };
        if x.is_empty() {
            tracing::error!(path, "x bins invalid, no frame");
            return;
        }
        if y.is_empty() {
            tracing::error!(path, "y bins invalid, no frame");
            return;
        }

        env.set("x_min", format_value(x.minimum()));
        env.set("x_max", format_value(x.maximum()));
        env.set("y_min", format_value(y.minimum()));
        env.set("y_max", format_value(y.maximum()));

        self.backend.set_frame(Frame {
            x: style.x_range.unwrap_or((x.minimum(), x.maximum())),
            y: style.y_range.unwrap_or((y.minimum(), y.maximum())),
            log_x: style.log_x.unwrap_or(false),
            log_y: style.log_y.unwrap_or(false),
            title: style.title.unwrap_or_default(),
            x_title: style.x_title.unwrap_or_default(),
            y_title: style.y_title.unwrap_or_default(),
            x_labels: Vec::new(),
        });
    }

    /// `Histo`: draw one histogram, or one per name of a `names` template
    pub(super) fn exec_histo(&mut self, path: &str, env: &mut Env<'_>) {
        let template = {
            let view = self.config.view(env);
            view.exists(&attr(path, "names")).then(|| {
                let names: Vec<String> = view.vec(&attr(path, "names"));
                match names.as_slice() {
                    [single] if single.contains('*') => self.registry.glob(single),
                    _ => names,
                }
            })
        };

        let Some(names) = template else {
            let address = {
                let view = self.config.view(env);
                crate::registry::Registry::address(&view, path, "")
            };
            match address {
                Some((source, name)) => self.draw_histo(path, env, &source, &name),
                None => tracing::error!(path, "Histo without name"),
            }
            return;
        };

        if names.is_empty() {
            tracing::warn!(path, "Histo template matched nothing");
        }
        let data = self.config.view(env).string_or(&attr(path, "data"), "");
        for (i, full) in names.iter().enumerate() {
            let mut item = env.child();
            item.set("name", full.as_str());
            item.set("uname", underscape(full));
            item.set("i", i.to_string());
            let (source, name) = if full.contains('/') {
                (data_only(full), name_only(full))
            } else {
                (data.as_str(), full.as_str())
            };
            self.draw_histo(path, &mut item, source, name);
        }
    }

    fn draw_histo(&mut self, path: &str, env: &mut Env<'_>, source: &str, name: &str) {
        let found = {
            let view = self.config.view(env);
            self.registry.resolve_histogram(&view, path, source, name)
        };
        let Some(mut h) = found.and_then(|o| o.borrow().as_histogram().cloned()) else {
            tracing::error!(path, source, name, "cannot find histogram to draw");
            return;
        };
        env.set("ClassName", h.class_name());

        let (norm, style) = {
            let view = self.config.view(env);
            let norm = view
                .one_of(&join_path(path, "Norm"), &attr(path, "norm"))
                .filter(|p| view.get::<bool>(p).unwrap_or(true))
                .map(|p| view.get::<f64>(&p).filter(|v| *v > 0.0).unwrap_or(1.0));
            (norm, Style::from_view(&view, path))
        };
        let integral = h.integral(false);
        if let Some(target) = norm.filter(|_| integral > 0.0) {
            tracing::info!(name, target, integral, "normalize");
            h.scale(target / integral, false);
        }
        h.style.merge(&style);

        if self.backend.frame().is_none() {
            self.backend.set_frame(paint::histogram_frame(&h));
        }
        let frame = self.backend.frame().unwrap_or_default();
        for primitive in paint::histogram(&h, &self.palette, &frame) {
            self.backend.draw(primitive);
        }
        tracing::info!(path, name, "drew histogram");
        let fqn = fully_qualified_name(source, name);
        self.drawn.record(name, &fqn, share(PlotObject::Histogram(h)));
    }

    /// `Graph`
    pub(super) fn exec_graph(&mut self, path: &str, env: &mut Env<'_>) {
        let (found, address, style) = {
            let view = self.config.view(env);
            (
                self.registry.find_object(&view, path),
                crate::registry::Registry::address(&view, path, ""),
                Style::from_view(&view, path),
            )
        };
        let Some(mut g) = found.and_then(|o| o.borrow().as_graph().cloned()) else {
            tracing::error!(path, "cannot get graph");
            return;
        };
        env.set("ClassName", g.class_name());
        g.style.merge(&style);

        if self.backend.frame().is_none() {
            self.backend.set_frame(paint::graph_frame(&g));
        }
        let frame = self.backend.frame().unwrap_or_default();
        for primitive in paint::graph(&g, &self.palette, &frame) {
            self.backend.draw(primitive);
        }
        let (source, name) = address.unwrap_or_else(|| (String::new(), g.name.clone()));
        self.drawn.record(&name, &fully_qualified_name(&source, &name), share(PlotObject::Graph(g)));
    }

    /// `TF1`: a formula over a range, or a stored function
    pub(super) fn exec_tf1(&mut self, path: &str, env: &mut Env<'_>) {
        let built = {
            let view = self.config.view(env);
            match view.string(&attr(path, "formula")) {
                Some(formula) => build_function(&view, path, &formula),
                None => self
                    .registry
                    .find_object(&view, path)
                    .and_then(|o| o.borrow().as_function().cloned())
                    .map(|mut f| {
                        f.style.merge(&Style::from_view(&view, path));
                        f
                    }),
            }
        };
        let Some(f) = built else {
            tracing::error!(path, "cannot make function");
            return;
        };
        env.set("ClassName", f.class_name());

        if self.backend.frame().is_none() {
            self.backend.set_frame(paint::function_frame(&f));
        }
        let frame = self.backend.frame().unwrap_or_default();
        for primitive in paint::function(&f, &self.palette, &frame) {
            self.backend.draw(primitive);
        }
        let name = f.name.clone();
        self.drawn.record(&name, &name, share(PlotObject::Function(f)));
    }

    /// `TLine` in axis coordinates
    pub(super) fn exec_tline(&mut self, path: &str, env: &mut Env<'_>) {
        let (from, to, stroke) = {
            let view = self.config.view(env);
            let mut x: Vec<f64> = view.vec(&attr(path, "x"));
            let mut y: Vec<f64> = view.vec(&attr(path, "y"));
            x.resize(2, 0.0);
            y.resize(2, 0.0);
            for (i, p) in ["p1", "p2"].iter().enumerate() {
                if let [px, py, ..] = view.vec::<f64>(&attr(path, p)).as_slice() {
                    x[i] = *px;
                    y[i] = *py;
                }
            }
            let from = (view.get_or(&attr(path, "x1"), x[0]), view.get_or(&attr(path, "y1"), y[0]));
            let to = (view.get_or(&attr(path, "x2"), x[1]), view.get_or(&attr(path, "y2"), y[1]));
            let color = view
                .string(&attr(path, "color"))
                .map_or(Color::BLACK, |c| self.palette.resolve_or_default(&c));
            let stroke = Stroke {
                color,
                width: view.get_or(&attr(path, "width"), 1.0),
                style: view.get_or(&attr(path, "style"), 2),
            };
            (from, to, stroke)
        };
        tracing::info!(?from, ?to, "line");
        self.backend.draw(Primitive::Line {
            from,
            to,
            coords: Coords::User,
            stroke,
        });
    }

    /// `TLatex` at pad (`x`,`y`) or axis (`ux`,`uy`) coordinates
    pub(super) fn exec_tlatex(&mut self, path: &str, env: &mut Env<'_>) {
        let item = {
            let view = self.config.view(env);
            let Some(text) = view.string(&attr(path, "text")) else {
                return;
            };
            let f = |a: &str| view.get::<f64>(&attr(path, a));
            let (x, y, coords) = match (f("x"), f("y"), f("ux"), f("uy")) {
                (Some(x), Some(y), _, _) => (x, y, Coords::Ndc),
                (_, _, Some(x), Some(y)) => (x, y, Coords::User),
                _ => {
                    tracing::error!(path, "cannot draw latex, needs pad (x, y) or user (ux, uy) coordinates");
                    return;
                }
            };
            let size = match f("point") {
                Some(point) => point / 360.0,
                None => f("size").unwrap_or(0.05),
            };
            let color = view
                .string(&attr(path, "color"))
                .map_or(Color::BLACK, |c| self.palette.resolve_or_default(&c));
            TextItem {
                text,
                x,
                y,
                coords,
                size,
                color,
                align: view
                    .string(&attr(path, "align"))
                    .and_then(|a| parse_align(&a))
                    .unwrap_or_default(),
                angle: f("angle").unwrap_or(0.0),
                font: view.get_or(&attr(path, "font"), 42),
            }
        };
        self.backend.draw(Primitive::Text(item));
    }

    /// `Rect` from `x1,y1,x2,y2` (pad) or `ux1,uy1,ux2,uy2` (axis)
    pub(super) fn exec_rect(&mut self, path: &str, env: &mut Env<'_>) {
        let primitive = {
            let view = self.config.view(env);
            let user: Vec<Option<f64>> = ["ux1", "uy1", "ux2", "uy2"]
                .iter()
                .map(|a| view.get::<f64>(&attr(path, a)))
                .collect();
            let (rect, coords) = match user.as_slice() {
                [Some(x1), Some(y1), Some(x2), Some(y2)] => (Rect::new(*x1, *y1, *x2, *y2), Coords::User),
                _ => (read_rect(&view, path, Rect::new(0.0, 0.0, 0.0, 0.0)), Coords::Ndc),
            };
            let style = Style::from_view(&view, path);
            Primitive::Box {
                rect,
                coords,
                stroke: Some(paint::line_stroke(&style, &self.palette, Color::BLACK)),
                fill: paint::fill_color(&style, &self.palette),
            }
        };
        self.backend.draw(primitive);
    }

    /// `Ellipse` centered at `x,y` (pad) or `ux,uy` (axis) with radii `r` or `rx,ry`
    pub(super) fn exec_ellipse(&mut self, path: &str, env: &mut Env<'_>) {
        let primitive = {
            let view = self.config.view(env);
            let f = |a: &str| view.get::<f64>(&attr(path, a));
            let (center, coords) = match (f("ux"), f("uy")) {
                (Some(x), Some(y)) => ((x, y), Coords::User),
                _ => ((f("x").unwrap_or(0.5), f("y").unwrap_or(0.5)), Coords::Ndc),
            };
            let r = f("r").unwrap_or(0.1);
            let style = Style::from_view(&view, path);
            Primitive::Ellipse {
                center,
                radii: (f("rx").unwrap_or(r), f("ry").unwrap_or(r)),
                coords,
                stroke: Some(paint::line_stroke(&style, &self.palette, Color::BLACK)),
                fill: paint::fill_color(&style, &self.palette),
            }
        };
        self.backend.draw(primitive);
    }

    /// `Image`: a raster file placed at `pos`
    pub(super) fn exec_image(&mut self, path: &str, env: &mut Env<'_>) {
        let (url, rect) = {
            let view = self.config.view(env);
            let url = view
                .string(&attr(path, "url"))
                .or_else(|| view.string(&attr(path, "name")));
            (url, read_rect(&view, path, Rect::FULL))
        };
        let Some(url) = url else {
            tracing::error!(path, "Image without url");
            return;
        };
        let file = self.base.join(&url);
        match std::fs::read(&file) {
            Ok(data) => self.backend.draw(Primitive::Image { rect, data }),
            Err(e) => tracing::error!(url = %file.display(), error = %e, "image is null"),
        }
    }

    /// `TLegend`/`Legend` over what the plot has drawn so far
    pub(super) fn exec_legend(&mut self, path: &str, env: &mut Env<'_>) {
        let (position, look, entries) = {
            let view = self.config.view(env);
            let position = LegendPosition::from_view(&view, &join_path(path, "Position"));
            let text_size = view
                .get::<f64>(&attr(path, "text_point"))
                .map(|p| p / 360.0)
                .or_else(|| view.get(&attr(path, "text_size")));
            let fill = match view.get::<i32>(&attr(path, "fill_style")) {
                Some(0) => None,
                _ => Some(
                    view.string(&attr(path, "fill_color"))
                        .map_or(Color::WHITE, |c| self.palette.resolve_or_default(&c)),
                ),
            };
            let look = LegendLook {
                header: view.string(&attr(path, "title")),
                columns: view.get_or(&attr(path, "columns"), 1),
                text_size,
                border_size: view.get_or(&attr(path, "border_size"), 1.0),
                fill,
            };
            (position, look, self.legend_entries(&view, path))
        };
        let rect = position.resolve(&self.backend.margins());
        tracing::debug!(?rect, entries = entries.len(), "legend");
        for primitive in legend::primitives(rect, &look, &entries, &self.palette) {
            self.backend.draw(primitive);
        }
    }

    fn legend_entries(&self, view: &View<'_>, path: &str) -> Vec<LegendEntry> {
        let entry_paths = view.config.children_of(path, Some("Entry"), 1);
        if entry_paths.is_empty() {
            return self
                .drawn
                .default_entries()
                .map(|(name, object)| LegendEntry {
                    title: name.to_string(),
                    opt: "l".to_string(),
                    style: object.borrow().style().clone(),
                })
                .collect();
        }

        let mut entries = Vec::new();
        for entry in entry_paths {
            let Some(name) = view.string(&attr(&entry, "name")) else {
                continue;
            };
            let Some(object) = self.drawn.get(&name) else {
                tracing::warn!(path = %entry, name = %name, "legend entry for an object not drawn");
                continue;
            };
            entries.push(styled_entry(view, &entry, &name, object));
        }
        entries
    }

    /// `Export`: print the current pad or canvas
    pub(super) fn exec_export(&mut self, path: &str, env: &mut Env<'_>) {
        let Some(url) = self.config.view(env).string(&attr(path, "url")) else {
            return;
        };
        if url.contains(".json") {
            tracing::warn!(url = %url, "JSON export of pads is not supported, skipping");
            return;
        }
        let target = self.output_path(&url);
        if let Err(e) = self.backend.print(&target, self.print_scope) {
            tracing::error!(url = %target.display(), error = %e, "export failed");
        }
    }
}

fn styled_entry(view: &View<'_>, entry: &str, name: &str, object: &ObjectRef) -> LegendEntry {
    let mut style = object.borrow().style().clone();
    style.merge(&Style::from_view(view, entry));
    LegendEntry {
        title: view.string_or(&attr(entry, "title"), name),
        opt: view.string_or(&attr(entry, "opt"), "l"),
        style,
    }
}

fn build_function(view: &View<'_>, path: &str, formula: &str) -> Option<Function> {
    let name = view.string_or(&attr(path, "name"), "tf1");
    let range: Vec<f64> = view.vec(&attr(path, "range"));
    let (min, max) = match range.as_slice() {
        [lo, hi, ..] => (*lo, *hi),
        _ => (
            view.get_or(&attr(path, "min"), 0.0),
            view.get_or(&attr(path, "max"), 1.0),
        ),
    };
    let mut f = match Function::new(name.as_str(), formula, min, max) {
        Ok(f) => f,
        Err(errors) => {
            tracing::error!(path, "{}", format_errors(&errors, formula, &name));
            return None;
        }
    };
    let params: Vec<f64> = view.vec(&attr(path, "params"));
    for (i, p) in params.into_iter().enumerate() {
        f.set_parameter(i, p);
    }
    let mut i = 0;
    while let Some(p) = view.get::<f64>(&attr(path, &format!("p{}", i))) {
        f.set_parameter(i, p);
        i += 1;
    }
    f.npx = view.get_or(&attr(path, "npx"), f.npx);
    f.title = view.string_or(&attr(path, "title"), "");
    f.style = Style::from_view(view, path);
    Some(f)
}

//! Histogram transforms
//!
//! Every transform resolves its inputs through the registry and registers its
//! result under `save_as`. A missing `save_as` is a warning and a no-op,
//! except for the transforms that can work in place.

use std::collections::HashMap;
use std::rc::Rc;

use crate::config::{Env, View};
use crate::error::format_errors;
use crate::names::{data_only, name_only};
use crate::objects::{
    share, Axis, BinRange, Bins, Histogram, HistogramError, ObjectRef, PlotObject, Style,
};
use crate::parser::{eval, parse_expr};
use crate::registry::{ObjectKey, Registry};
use crate::renderer::Backend;

use super::{attr, format_value, Plotter};

/// Bin range from explicit bins (`lo_bin`/`hi_bin`) or values (`lo`/`hi`)
fn bin_range(
    view: &View<'_>,
    path: &str,
    bin_keys: (&str, &str),
    value_keys: (&str, &str),
    axis: &Axis,
) -> Option<BinRange> {
    if let Some(first) = view.get::<usize>(&attr(path, bin_keys.0)) {
        let last = view.get_or(&attr(path, bin_keys.1), axis.nbins());
        return Some((first, last));
    }
    let lo = view.get::<f64>(&attr(path, value_keys.0))?;
    let hi = view.get_or(&attr(path, value_keys.1), axis.bins.maximum());
    Some(axis.value_range(lo, hi))
}

/// Name of a projection slice, with `.` spelled `p`
fn slice_name(base: &str, lo: f64, hi: f64) -> String {
    format!("{}_{}_{}", base, format_value(lo), format_value(hi)).replace('.', "p")
}

impl<B: Backend> Plotter<B> {
    fn save_as(&self, path: &str, env: &Env<'_>) -> Option<String> {
        let name = self.config.view(env).string(&attr(path, "save_as"));
        if name.is_none() {
            tracing::warn!(path, "no save_as given, nothing to do");
        }
        name
    }

    /// Histogram named by the node, variant `A`/`B` for binary operators
    fn input(&mut self, path: &str, env: &Env<'_>, variant: &str) -> Option<Histogram> {
        let view = self.config.view(env);
        let found = self.registry.find_histogram(&view, path, variant);
        let histogram = found.and_then(|o| o.borrow().as_histogram().cloned());
        if histogram.is_none() {
            let (source, name) = Registry::address(&view, path, variant).unwrap_or_default();
            tracing::error!(path, source = %source, name = %name, "input histogram not found");
        }
        histogram
    }

    fn store(&mut self, name: &str, mut histogram: Histogram) {
        histogram.name = name.to_string();
        tracing::info!(name, class = histogram.class_name(), "registered");
        self.registry
            .insert(ObjectKey::bare(name), share(PlotObject::Histogram(histogram)));
    }

    /// Apply `op` to the histogram named by the node, in place
    ///
    /// A histogram read from a data file is a private copy, so it is
    /// registered under the node's bare name to make the change visible.
    fn modify_in_place(
        &mut self,
        path: &str,
        env: &Env<'_>,
        op: impl FnOnce(&mut Histogram) -> Result<(), HistogramError>,
    ) {
        let view = self.config.view(env);
        let Some((_, name)) = Registry::address(&view, path, "") else {
            tracing::error!(path, "no input name given");
            return;
        };
        let Some(object) = self.registry.find_histogram(&view, path, "") else {
            tracing::error!(path, name = %name, "input histogram not found");
            return;
        };
        let result = match object.borrow_mut().as_histogram_mut() {
            Some(h) => op(h),
            None => return,
        };
        if let Err(e) = result {
            tracing::error!(path, name = %name, error = %e, "transform failed");
            return;
        }
        self.ensure_registered(&name, object);
    }

    fn ensure_registered(&mut self, name: &str, object: ObjectRef) {
        let registered = self
            .registry
            .get(name)
            .is_some_and(|o| Rc::ptr_eq(&o, &object));
        if !registered {
            self.registry.insert(ObjectKey::bare(name), object);
        }
    }

    /// `Projection`: 3D projections onto one or two axes; 2D delegates
    pub(super) fn exec_projection(&mut self, path: &str, env: &mut Env<'_>) {
        let Some(source) = self.input(path, env, "") else {
            return;
        };
        let axes = self
            .config
            .view(env)
            .string_or(&attr(path, "axis"), "x")
            .to_lowercase();
        match (source.dim(), axes.as_str()) {
            (2, "x") => return self.exec_projection_x(path, env),
            (2, "y") => return self.exec_projection_y(path, env),
            (3, _) => {}
            (dim, _) => {
                tracing::error!(path, dim, axis = %axes, "cannot project this histogram");
                return;
            }
        }
        let Some(save_as) = self.save_as(path, env) else {
            return;
        };

        let ranges = {
            let view = self.config.view(env);
            let mut ranges = [None, None, None];
            for (i, a) in ["x", "y", "z"].iter().enumerate() {
                if axes.contains(a) {
                    continue;
                }
                let (b1, b2) = (format!("b{}1", a), format!("b{}2", a));
                let (v1, v2) = (format!("{}1", a), format!("{}2", a));
                if let Some(axis) = source.axis(i) {
                    ranges[i] = bin_range(
                        &view,
                        path,
                        (b1.as_str(), b2.as_str()),
                        (v1.as_str(), v2.as_str()),
                        axis,
                    );
                }
            }
            ranges
        };
        match source.project_3d(save_as.as_str(), &axes, ranges) {
            Ok(h) => self.store(&save_as, h),
            Err(e) => tracing::error!(path, error = %e, "projection failed"),
        }
    }

    /// `ProjectionX`: sum over a y range, or one projection per `step` slice
    pub(super) fn exec_projection_x(&mut self, path: &str, env: &mut Env<'_>) {
        let Some(source) = self.input(path, env, "") else {
            return;
        };
        let Some(save_as) = self.save_as(path, env) else {
            return;
        };
        let Some(y_axis) = source.axis(1) else {
            tracing::error!(path, name = %source.name, "ProjectionX needs a 2D histogram");
            return;
        };

        let (range, slices) = {
            let view = self.config.view(env);
            let range = bin_range(&view, path, ("b1", "b2"), ("y1", "y2"), y_axis);
            let step = view.get::<f64>(&attr(path, "step")).filter(|s| *s > 0.0);
            let lo = view.get::<f64>(&attr(path, "y1"));
            let hi = view.get::<f64>(&attr(path, "y2"));
            let slices = match (step, lo, hi) {
                (Some(step), Some(lo), Some(hi)) => {
                    let mut out = Vec::new();
                    let mut i = 0usize;
                    loop {
                        let a = lo + step * i as f64;
                        if a >= hi - step * 1e-9 {
                            break;
                        }
                        out.push((a, (a + step).min(hi)));
                        i += 1;
                    }
                    out
                }
                _ => Vec::new(),
            };
            (range, slices)
        };

        if slices.is_empty() {
            match source.projection_x(save_as.as_str(), range) {
                Ok(h) => self.store(&save_as, h),
                Err(e) => tracing::error!(path, error = %e, "projection failed"),
            }
            return;
        }
        for (lo, hi) in slices {
            // the upper edge belongs to the next slice
            let bins = y_axis.value_range(lo, hi - (hi - lo) * 1e-9);
            let name = slice_name(&save_as, lo, hi);
            match source.projection_x(name.as_str(), Some(bins)) {
                Ok(h) => self.store(&name, h),
                Err(e) => tracing::error!(path, error = %e, "projection failed"),
            }
        }
    }

    /// `ProjectionY`: sum over an x range
    pub(super) fn exec_projection_y(&mut self, path: &str, env: &mut Env<'_>) {
        let Some(source) = self.input(path, env, "") else {
            return;
        };
        let Some(save_as) = self.save_as(path, env) else {
            return;
        };
        let range = match source.axis(0) {
            Some(x_axis) if source.dim() == 2 => {
                let view = self.config.view(env);
                bin_range(&view, path, ("b1", "b2"), ("x1", "x2"), x_axis)
            }
            _ => None,
        };
        match source.projection_y(save_as.as_str(), range) {
            Ok(h) => self.store(&save_as, h),
            Err(e) => tracing::error!(path, error = %e, "projection failed"),
        }
    }

    /// `Add`: `A + mod * B`; a list of names is a `MultiAdd`
    pub(super) fn exec_add(&mut self, path: &str, env: &mut Env<'_>) {
        let is_list = {
            let view = self.config.view(env);
            view.exists(&attr(path, "names"))
                || view.string(&attr(path, "name")).is_some_and(|n| n.contains(','))
        };
        if is_list {
            return self.exec_multi_add(path, env);
        }
        let Some(save_as) = self.save_as(path, env) else {
            return;
        };
        let (Some(a), Some(b)) = (self.input(path, env, "A"), self.input(path, env, "B")) else {
            return;
        };
        let factor = self.config.view(env).get_or(&attr(path, "mod"), 1.0);
        let mut sum = a.clone_named(save_as.as_str());
        match sum.add(&b, factor) {
            Ok(()) => self.store(&save_as, sum),
            Err(e) => tracing::error!(path, error = %e, "Add failed"),
        }
    }

    /// `MultiAdd`: accumulate a list of histograms, each with its own factor
    pub(super) fn exec_multi_add(&mut self, path: &str, env: &mut Env<'_>) {
        let Some(save_as) = self.save_as(path, env) else {
            return;
        };
        let view = self.config.view(env);
        let names: Vec<String> = match view.string(&attr(path, "names")) {
            Some(_) => view.vec(&attr(path, "names")),
            None => view.vec(&attr(path, "name")),
        };
        let data = view.string_or(&attr(path, "data"), "");
        let mods: Vec<f64> = view.vec(&attr(path, "mods"));
        if names.is_empty() {
            tracing::warn!(path, "MultiAdd without names");
            return;
        }

        let mut sum: Option<Histogram> = None;
        for (i, full) in names.iter().enumerate() {
            let (source, name) = if full.contains('/') {
                (data_only(full), name_only(full))
            } else {
                (data.as_str(), full.as_str())
            };
            let found = self
                .registry
                .resolve_histogram(&view, path, source, name)
                .and_then(|o| o.borrow().as_histogram().cloned());
            let Some(h) = found else {
                tracing::error!(path, name = %full, "input histogram not found");
                return;
            };
            let factor = mods.get(i).copied().unwrap_or(1.0);
            match &mut sum {
                None => {
                    let mut first = h.clone_named(save_as.as_str());
                    first.enable_sumw2();
                    first.scale(factor, false);
                    sum = Some(first);
                }
                Some(acc) => {
                    if let Err(e) = acc.add(&h, factor) {
                        tracing::error!(path, name = %full, error = %e, "MultiAdd failed");
                        return;
                    }
                }
            }
        }
        if let Some(sum) = sum {
            self.store(&save_as, sum);
        }
    }

    /// `Divide`: `A / B` bin by bin
    pub(super) fn exec_divide(&mut self, path: &str, env: &mut Env<'_>) {
        let Some(save_as) = self.save_as(path, env) else {
            return;
        };
        let (Some(a), Some(b)) = (self.input(path, env, "A"), self.input(path, env, "B")) else {
            return;
        };
        let mut ratio = a.clone_named(save_as.as_str());
        match ratio.divide(&b) {
            Ok(()) => self.store(&save_as, ratio),
            Err(e) => tracing::error!(path, error = %e, "Divide failed"),
        }
    }

    /// `Rebin` onto `bins_x`/`bins_y`/`bins_z`
    pub(super) fn exec_rebin(&mut self, path: &str, env: &mut Env<'_>) {
        let Some(save_as) = self.save_as(path, env) else {
            return;
        };
        let Some(source) = self.input(path, env, "") else {
            return;
        };
        let edges: Vec<Bins> = {
            let view = self.config.view(env);
            ["bins_x", "bins_y", "bins_z"]
                .iter()
                .filter_map(|a| view.string(&attr(path, a)))
                .map(|spec| Bins::from_value(&view, path, &spec))
                .take_while(|b| !b.is_empty())
                .collect()
        };
        match source.rebin(save_as.as_str(), edges) {
            Ok(h) => self.store(&save_as, h),
            Err(e) => tracing::error!(path, error = %e, "Rebin failed"),
        }
    }

    /// `Scale` by `factor`; `opt="width"` also divides by bin width
    pub(super) fn exec_scale(&mut self, path: &str, env: &mut Env<'_>) {
        let (factor, width, save_as) = {
            let view = self.config.view(env);
            (
                view.get_or(&attr(path, "factor"), 1.0),
                view.string_or(&attr(path, "opt"), "").contains("width"),
                view.string(&attr(path, "save_as")),
            )
        };
        match save_as {
            Some(save_as) => {
                let Some(source) = self.input(path, env, "") else {
                    return;
                };
                let mut scaled = source.clone_named(save_as.as_str());
                scaled.scale(factor, width);
                self.store(&save_as, scaled);
            }
            None => self.modify_in_place(path, env, |h| {
                h.scale(factor, width);
                Ok(())
            }),
        }
    }

    /// `Smooth` with `n` passes
    pub(super) fn exec_smooth(&mut self, path: &str, env: &mut Env<'_>) {
        let (n, save_as) = {
            let view = self.config.view(env);
            (
                view.get_or(&attr(path, "n"), 1usize),
                view.string(&attr(path, "save_as")),
            )
        };
        match save_as {
            Some(save_as) => {
                let Some(source) = self.input(path, env, "") else {
                    return;
                };
                let mut smoothed = source.clone_named(save_as.as_str());
                match smoothed.smooth(n) {
                    Ok(()) => self.store(&save_as, smoothed),
                    Err(e) => tracing::error!(path, error = %e, "Smooth failed"),
                }
            }
            None => self.modify_in_place(path, env, |h| h.smooth(n)),
        }
    }

    /// `CDF`: running sum, backward unless `forward` is set
    pub(super) fn exec_cdf(&mut self, path: &str, env: &mut Env<'_>) {
        let Some(save_as) = self.save_as(path, env) else {
            return;
        };
        let Some(source) = self.input(path, env, "") else {
            return;
        };
        let forward = self.config.view(env).get_or(&attr(path, "forward"), false);
        self.store(&save_as, source.cumulative(forward, save_as.as_str()));
    }

    /// `Clone`, optionally keeping only an x sub-range
    pub(super) fn exec_clone(&mut self, path: &str, env: &mut Env<'_>) {
        let Some(save_as) = self.save_as(path, env) else {
            return;
        };
        let Some(source) = self.input(path, env, "") else {
            return;
        };
        let range = source.axis(0).and_then(|x_axis| {
            let view = self.config.view(env);
            bin_range(&view, path, ("b1", "b2"), ("x1", "x2"), x_axis)
        });
        let copy = match range {
            Some(range) => source.clone_x_range(save_as.as_str(), range),
            None => source.clone_named(save_as.as_str()),
        };
        self.store(&save_as, copy);
    }

    /// `SetBinError`: the same error on every in-range bin, in place
    pub(super) fn exec_set_bin_error(&mut self, path: &str, env: &mut Env<'_>) {
        let Some(value) = self.config.view(env).get::<f64>(&attr(path, "value")) else {
            tracing::warn!(path, "SetBinError without value");
            return;
        };
        self.modify_in_place(path, env, |h| {
            h.set_all_errors(value);
            Ok(())
        });
    }

    /// `BinLabels`: x axis labels, in bin order, on a copy
    pub(super) fn exec_bin_labels(&mut self, path: &str, env: &mut Env<'_>) {
        let Some(source) = self.input(path, env, "") else {
            return;
        };
        let (labels, target) = {
            let view = self.config.view(env);
            let target = view
                .string(&attr(path, "save_as"))
                .or_else(|| Registry::address(&view, path, "").map(|(_, n)| n))
                .unwrap_or_else(|| source.name.clone());
            (view.vec::<String>(&attr(path, "labels")), target)
        };
        let mut copy = source.clone_named(target.as_str());
        if let Some(axis) = copy.axis_mut(0) {
            if labels.len() > axis.nbins() {
                tracing::warn!(path, labels = labels.len(), bins = axis.nbins(), "more labels than bins");
            }
            for (i, label) in labels.into_iter().take(axis.nbins()).enumerate() {
                axis.set_label(i + 1, label);
            }
        }
        self.store(&target, copy);
    }

    /// `Sumw2`: track per-bin variances
    pub(super) fn exec_sumw2(&mut self, path: &str, env: &mut Env<'_>) {
        match self.config.view(env).string(&attr(path, "save_as")) {
            Some(save_as) => {
                let Some(source) = self.input(path, env, "") else {
                    return;
                };
                let mut copy = source.clone_named(save_as.as_str());
                copy.enable_sumw2();
                self.store(&save_as, copy);
            }
            None => self.modify_in_place(path, env, |h| {
                h.enable_sumw2();
                Ok(())
            }),
        }
    }

    /// `Style`: merge style attributes into an existing object
    pub(super) fn exec_style(&mut self, path: &str, env: &mut Env<'_>) {
        let (found, name, style) = {
            let view = self.config.view(env);
            (
                self.registry.find_object(&view, path),
                Registry::address(&view, path, "").map(|(_, n)| n),
                Style::from_view(&view, path),
            )
        };
        let (Some(object), Some(name)) = (found, name) else {
            tracing::error!(path, "Style target not found");
            return;
        };
        object.borrow_mut().style_mut().merge(&style);
        self.ensure_registered(&name, object);
    }

    /// `Draw`: fill a new histogram from a tabular source and register it
    ///
    /// Never served from the registry; an earlier histogram of the same
    /// name is replaced.
    pub(super) fn exec_draw(&mut self, path: &str, env: &mut Env<'_>) {
        let view = self.config.view(env);
        if self.registry.draw_histogram(&view, path).is_none() {
            tracing::error!(path, "Draw produced no histogram");
        }
    }

    /// `Assign`: evaluate `expr` over the statistics of a histogram and
    /// bind the result to `var` in the current frame
    pub(super) fn exec_assign(&mut self, path: &str, env: &mut Env<'_>) {
        let (var, expr) = {
            let view = self.config.view(env);
            (view.string(&attr(path, "var")), view.string(&attr(path, "expr")))
        };
        let (Some(var), Some(expr)) = (var, expr) else {
            tracing::warn!(path, "Assign needs var and expr");
            return;
        };
        let has_input = self.config.exists(&attr(path, "name"));
        let mut vars: HashMap<String, f64> = HashMap::new();
        if has_input {
            let Some(h) = self.input(path, env, "") else {
                return;
            };
            vars.extend(statistics(&h));
        }
        if let Some(value) = evaluate(path, &expr, &vars) {
            let value = format_value(value);
            tracing::info!(path, var = %var, value = %value, "assign");
            env.set(var, value);
        }
    }

    /// `ProcessLine`: evaluate `expr` and log the result
    pub(super) fn exec_process_line(&mut self, path: &str, env: &mut Env<'_>) {
        let Some(expr) = self.config.view(env).string(&attr(path, "expr")) else {
            tracing::warn!(path, "ProcessLine without expr");
            return;
        };
        if let Some(value) = evaluate(path, &expr, &HashMap::new()) {
            tracing::info!(path, expr = %expr, result = value, "process line");
        }
    }
}

/// Summary statistics a histogram exposes to expressions
fn statistics(h: &Histogram) -> Vec<(String, f64)> {
    [
        ("integral", h.integral(false)),
        ("mean", h.mean(0)),
        ("std_dev", h.std_dev(0)),
        ("entries", h.entries()),
        ("max", h.maximum()),
        ("min", h.minimum()),
        ("nbins_x", h.axis(0).map_or(0, Axis::nbins) as f64),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn evaluate(path: &str, expr: &str, vars: &HashMap<String, f64>) -> Option<f64> {
    let parsed = match parse_expr(expr) {
        Ok(parsed) => parsed,
        Err(errors) => {
            tracing::error!(path, "{}", format_errors(&errors, expr, path));
            return None;
        }
    };
    match eval(&parsed, vars, &[]) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(path, expr, error = %e, "cannot evaluate expression");
            None
        }
    }
}

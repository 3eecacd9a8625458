//! Binned histograms in one, two or three dimensions
//!
//! Bins are addressed by a global index that includes underflow and
//! overflow bins on every axis: for an axis with `n` bins, index 0 is the
//! underflow, `1..=n` are in range and `n + 1` is the overflow. The global
//! index is `bx + (nx + 2) * (by + (ny + 2) * bz)`.

use std::collections::BTreeMap;

use thiserror::Error;

use super::bins::Bins;
use super::style::Style;

/// Errors from histogram construction and arithmetic
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HistogramError {
    #[error("histogram '{name}' needs 1 to 3 axes, got {found}")]
    InvalidDimension { name: String, found: usize },

    #[error("axis {axis} of histogram '{name}' has no bins")]
    EmptyAxis { name: String, axis: usize },

    #[error("histograms '{left}' and '{right}' have incompatible binning")]
    IncompatibleBinning { left: String, right: String },

    #[error("{op} needs a {expected}D histogram, '{name}' is {found}D")]
    WrongDimension {
        op: &'static str,
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("histogram '{name}' expects {expected} values, got {found}")]
    SizeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// One histogram axis: its bin edges, title and optional bin labels
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub bins: Bins,
    pub title: String,
    labels: BTreeMap<usize, String>,
}

impl Axis {
    pub fn new(bins: Bins) -> Self {
        Self {
            bins,
            title: String::new(),
            labels: BTreeMap::new(),
        }
    }

    pub fn nbins(&self) -> usize {
        self.bins.nbins()
    }

    pub fn find_bin(&self, x: f64) -> usize {
        self.bins.find_bin(x)
    }

    pub fn low_edge(&self, bin: usize) -> f64 {
        let edges = &self.bins.edges;
        match bin {
            0 => f64::NEG_INFINITY,
            b if b <= edges.len() => edges[b - 1],
            _ => f64::INFINITY,
        }
    }

    pub fn up_edge(&self, bin: usize) -> f64 {
        let edges = &self.bins.edges;
        match bin {
            0 => edges.first().copied().unwrap_or(0.0),
            b if b < edges.len() => edges[b],
            _ => f64::INFINITY,
        }
    }

    pub fn center(&self, bin: usize) -> f64 {
        (self.low_edge(bin) + self.up_edge(bin)) / 2.0
    }

    /// Width of an in-range bin; flow bins report 1
    pub fn width(&self, bin: usize) -> f64 {
        if bin == 0 || bin > self.nbins() {
            return 1.0;
        }
        self.up_edge(bin) - self.low_edge(bin)
    }

    pub fn set_label(&mut self, bin: usize, label: impl Into<String>) {
        self.labels.insert(bin, label.into());
    }

    pub fn label(&self, bin: usize) -> Option<&str> {
        self.labels.get(&bin).map(String::as_str)
    }

    pub fn has_labels(&self) -> bool {
        !self.labels.is_empty()
    }

    /// First and last in-range bins covering the value range `[lo, hi]`
    pub fn value_range(&self, lo: f64, hi: f64) -> (usize, usize) {
        let first = self.find_bin(lo).max(1);
        let last = self.find_bin(hi).min(self.nbins());
        (first, last)
    }

    fn same_binning(&self, other: &Axis) -> bool {
        self.bins.edges.len() == other.bins.edges.len()
            && self
                .bins
                .edges
                .iter()
                .zip(&other.bins.edges)
                .all(|(a, b)| (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0))
    }
}

/// Inclusive bin range on one axis
pub type BinRange = (usize, usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub name: String,
    pub title: String,
    axes: Vec<Axis>,
    contents: Vec<f64>,
    sumw2: Option<Vec<f64>>,
    entries: f64,
    pub style: Style,
}

impl Histogram {
    /// Create an empty histogram with the given axes
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        axes: Vec<Bins>,
    ) -> Result<Self, HistogramError> {
        let name = name.into();
        if axes.is_empty() || axes.len() > 3 {
            return Err(HistogramError::InvalidDimension {
                name,
                found: axes.len(),
            });
        }
        if let Some(axis) = axes.iter().position(Bins::is_empty) {
            return Err(HistogramError::EmptyAxis { name, axis });
        }
        let axes: Vec<Axis> = axes.into_iter().map(Axis::new).collect();
        let size = axes.iter().map(|a| a.nbins() + 2).product();
        Ok(Self {
            name,
            title: title.into(),
            axes,
            contents: vec![0.0; size],
            sumw2: None,
            entries: 0.0,
            style: Style::default(),
        })
    }

    pub fn new_1d(
        name: impl Into<String>,
        title: impl Into<String>,
        bins: Bins,
    ) -> Result<Self, HistogramError> {
        Self::new(name, title, vec![bins])
    }

    /// Runtime class name in the conventional `TH<dim>D` spelling
    pub fn class_name(&self) -> &'static str {
        match self.dim() {
            1 => "TH1D",
            2 => "TH2D",
            _ => "TH3D",
        }
    }

    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    pub fn axis(&self, i: usize) -> Option<&Axis> {
        self.axes.get(i)
    }

    pub fn axis_mut(&mut self, i: usize) -> Option<&mut Axis> {
        self.axes.get_mut(i)
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn entries(&self) -> f64 {
        self.entries
    }

    pub fn set_entries(&mut self, entries: f64) {
        self.entries = entries;
    }

    pub fn has_sumw2(&self) -> bool {
        self.sumw2.is_some()
    }

    /// Track per-bin variances explicitly. Existing contents are assumed Poisson.
    pub fn enable_sumw2(&mut self) {
        if self.sumw2.is_none() {
            self.sumw2 = Some(self.contents.iter().map(|c| c.abs()).collect());
        }
    }

    /// Total number of bins including flow bins
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    fn nbins(&self, axis: usize) -> usize {
        self.axes.get(axis).map_or(0, Axis::nbins)
    }

    /// Global index from per-axis bin indices; missing axes use bin 0
    pub fn global_bin(&self, bx: usize, by: usize, bz: usize) -> usize {
        let sx = self.nbins(0) + 2;
        let sy = if self.dim() > 1 { self.nbins(1) + 2 } else { 1 };
        bx + sx * (by + sy * bz)
    }

    /// Per-axis bin indices of a global index
    pub fn bin_coords(&self, global: usize) -> [usize; 3] {
        let sx = self.nbins(0) + 2;
        let sy = if self.dim() > 1 { self.nbins(1) + 2 } else { 1 };
        [global % sx, (global / sx) % sy, global / (sx * sy)]
    }

    /// Global bin containing the point (extra coordinates are ignored)
    pub fn find_bin(&self, point: &[f64]) -> usize {
        let mut coords = [0usize; 3];
        for (i, axis) in self.axes.iter().enumerate() {
            coords[i] = axis.find_bin(point.get(i).copied().unwrap_or(0.0));
        }
        self.global_bin(coords[0], coords[1], coords[2])
    }

    /// Whether a global bin lies inside the range of every axis
    pub fn is_in_range(&self, global: usize) -> bool {
        let coords = self.bin_coords(global);
        self.axes
            .iter()
            .enumerate()
            .all(|(i, a)| coords[i] >= 1 && coords[i] <= a.nbins())
    }

    /// Global indices of all in-range bins, in global order
    pub fn in_range_bins(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.contents.len()).filter(move |g| self.is_in_range(*g))
    }

    pub fn fill(&mut self, point: &[f64], weight: f64) {
        let bin = self.find_bin(point);
        self.contents[bin] += weight;
        if let Some(w2) = &mut self.sumw2 {
            w2[bin] += weight * weight;
        }
        self.entries += 1.0;
    }

    pub fn bin_content(&self, global: usize) -> f64 {
        self.contents.get(global).copied().unwrap_or(0.0)
    }

    pub fn set_bin_content(&mut self, global: usize, value: f64) {
        if let Some(c) = self.contents.get_mut(global) {
            *c = value;
        }
    }

    pub fn bin_error(&self, global: usize) -> f64 {
        match &self.sumw2 {
            Some(w2) => w2.get(global).copied().unwrap_or(0.0).sqrt(),
            None => self.bin_content(global).abs().sqrt(),
        }
    }

    pub fn set_bin_error(&mut self, global: usize, error: f64) {
        self.enable_sumw2();
        if let Some(w2) = self.sumw2.as_mut().and_then(|w2| w2.get_mut(global)) {
            *w2 = error * error;
        }
    }

    /// All bin contents, flow bins included
    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    /// All bin errors, flow bins included
    pub fn errors(&self) -> Vec<f64> {
        (0..self.contents.len()).map(|g| self.bin_error(g)).collect()
    }

    /// Replace every bin content; `values` must cover the flow bins too
    pub fn set_contents(&mut self, values: Vec<f64>) -> Result<(), HistogramError> {
        if values.len() != self.contents.len() {
            return Err(self.size_mismatch(values.len()));
        }
        self.contents = values;
        Ok(())
    }

    /// Replace every bin error; enables variance tracking
    pub fn set_errors(&mut self, errors: &[f64]) -> Result<(), HistogramError> {
        if errors.len() != self.contents.len() {
            return Err(self.size_mismatch(errors.len()));
        }
        self.sumw2 = Some(errors.iter().map(|e| e * e).collect());
        Ok(())
    }

    fn size_mismatch(&self, found: usize) -> HistogramError {
        HistogramError::SizeMismatch {
            name: self.name.clone(),
            expected: self.contents.len(),
            found,
        }
    }

    /// Volume of a bin (product of the widths along every axis)
    pub fn bin_volume(&self, global: usize) -> f64 {
        let coords = self.bin_coords(global);
        self.axes
            .iter()
            .enumerate()
            .map(|(i, a)| a.width(coords[i]))
            .product()
    }

    /// Sum of in-range contents, optionally weighted by bin volume
    pub fn integral(&self, width: bool) -> f64 {
        self.in_range_bins()
            .map(|g| {
                let c = self.contents[g];
                if width {
                    c * self.bin_volume(g)
                } else {
                    c
                }
            })
            .sum()
    }

    /// Content-weighted mean along one axis
    pub fn mean(&self, axis: usize) -> f64 {
        let (sum_w, sum_wx, _) = self.moments(axis);
        if sum_w == 0.0 {
            0.0
        } else {
            sum_wx / sum_w
        }
    }

    /// Content-weighted standard deviation along one axis
    pub fn std_dev(&self, axis: usize) -> f64 {
        let (sum_w, sum_wx, sum_wx2) = self.moments(axis);
        if sum_w == 0.0 {
            return 0.0;
        }
        let mean = sum_wx / sum_w;
        (sum_wx2 / sum_w - mean * mean).max(0.0).sqrt()
    }

    fn moments(&self, axis: usize) -> (f64, f64, f64) {
        let Some(ax) = self.axes.get(axis) else {
            return (0.0, 0.0, 0.0);
        };
        self.in_range_bins().fold((0.0, 0.0, 0.0), |(w, wx, wx2), g| {
            let c = self.contents[g];
            let x = ax.center(self.bin_coords(g)[axis]);
            (w + c, wx + c * x, wx2 + c * x * x)
        })
    }

    /// Largest in-range content
    pub fn maximum(&self) -> f64 {
        self.in_range_bins()
            .map(|g| self.contents[g])
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest in-range content
    pub fn minimum(&self) -> f64 {
        self.in_range_bins()
            .map(|g| self.contents[g])
            .fold(f64::INFINITY, f64::min)
    }

    fn check_compatible(&self, other: &Histogram) -> Result<(), HistogramError> {
        let compatible = self.dim() == other.dim()
            && self
                .axes
                .iter()
                .zip(&other.axes)
                .all(|(a, b)| a.same_binning(b));
        if compatible {
            Ok(())
        } else {
            Err(HistogramError::IncompatibleBinning {
                left: self.name.clone(),
                right: other.name.clone(),
            })
        }
    }

    /// `self += factor * other`, bin by bin
    pub fn add(&mut self, other: &Histogram, factor: f64) -> Result<(), HistogramError> {
        self.check_compatible(other)?;
        self.enable_sumw2();
        let other_errors = other.errors();
        for (g, c) in self.contents.iter_mut().enumerate() {
            *c += factor * other.contents[g];
        }
        if let Some(w2) = &mut self.sumw2 {
            for (g, v) in w2.iter_mut().enumerate() {
                *v += factor * factor * other_errors[g] * other_errors[g];
            }
        }
        self.entries += other.entries;
        Ok(())
    }

    /// `self /= other`, bin by bin. Bins where the denominator is zero become zero.
    pub fn divide(&mut self, other: &Histogram) -> Result<(), HistogramError> {
        self.check_compatible(other)?;
        let e1 = self.errors();
        let e2 = other.errors();
        let mut w2 = vec![0.0; self.contents.len()];
        for (g, c) in self.contents.iter_mut().enumerate() {
            let (a, b) = (*c, other.contents[g]);
            if b == 0.0 {
                *c = 0.0;
                continue;
            }
            *c = a / b;
            w2[g] = (e1[g] * e1[g] * b * b + e2[g] * e2[g] * a * a) / (b * b * b * b);
        }
        self.sumw2 = Some(w2);
        Ok(())
    }

    /// Multiply every bin by `factor`; with `width`, divide by the bin volume first
    pub fn scale(&mut self, factor: f64, width: bool) {
        self.enable_sumw2();
        let volumes: Vec<f64> = (0..self.contents.len())
            .map(|g| if width { self.bin_volume(g) } else { 1.0 })
            .collect();
        for (g, c) in self.contents.iter_mut().enumerate() {
            *c *= factor / volumes[g];
        }
        if let Some(w2) = &mut self.sumw2 {
            for (g, v) in w2.iter_mut().enumerate() {
                let f = factor / volumes[g];
                *v *= f * f;
            }
        }
    }

    /// Smooth in-range contents `iterations` times with a (1, 2, 1) kernel
    ///
    /// 2D histograms use the separable 3x3 kernel. Neighbours outside the
    /// axis range are left out of the weighted average.
    pub fn smooth(&mut self, iterations: usize) -> Result<(), HistogramError> {
        if self.dim() > 2 {
            return Err(HistogramError::WrongDimension {
                op: "Smooth",
                name: self.name.clone(),
                expected: 2,
                found: self.dim(),
            });
        }
        let nx = self.nbins(0) as isize;
        let ny = if self.dim() == 2 { self.nbins(1) as isize } else { 1 };
        let weights = [1.0, 2.0, 1.0];
        for _ in 0..iterations {
            let source = self.contents.clone();
            for g in self.in_range_bins().collect::<Vec<_>>() {
                let [bx, by, _] = self.bin_coords(g);
                let (mut sum, mut norm) = (0.0, 0.0);
                for (dx, wx) in (-1isize..=1).zip(weights) {
                    let x = bx as isize + dx;
                    if x < 1 || x > nx {
                        continue;
                    }
                    let dys: &[isize] = if self.dim() == 2 { &[-1, 0, 1] } else { &[0] };
                    for dy in dys {
                        let y = by as isize + dy;
                        if self.dim() == 2 && (y < 1 || y > ny) {
                            continue;
                        }
                        let wy = if self.dim() == 2 { weights[(dy + 1) as usize] } else { 1.0 };
                        let w = wx * wy;
                        sum += w * source[self.global_bin(x as usize, y as usize, 0)];
                        norm += w;
                    }
                }
                if norm > 0.0 {
                    self.contents[g] = sum / norm;
                }
            }
        }
        Ok(())
    }

    /// Running sum over in-range bins in global order
    ///
    /// `forward` accumulates from the first bin; otherwise from the last.
    pub fn cumulative(&self, forward: bool, name: impl Into<String>) -> Histogram {
        let mut out = self.clone();
        out.name = name.into();
        out.sumw2 = None;
        let bins: Vec<usize> = self.in_range_bins().collect();
        let mut running = 0.0;
        let ordered: Box<dyn Iterator<Item = &usize>> = if forward {
            Box::new(bins.iter())
        } else {
            Box::new(bins.iter().rev())
        };
        for g in ordered {
            running += self.contents[*g];
            out.contents[*g] = running;
        }
        out
    }

    /// Project a 2D histogram onto its x axis, summing y bins in `y_range`
    ///
    /// Without a range every y bin, flow bins included, contributes.
    pub fn projection_x(
        &self,
        name: impl Into<String>,
        y_range: Option<BinRange>,
    ) -> Result<Histogram, HistogramError> {
        self.projection_2d(name.into(), 0, y_range)
    }

    /// Project a 2D histogram onto its y axis, summing x bins in `x_range`
    pub fn projection_y(
        &self,
        name: impl Into<String>,
        x_range: Option<BinRange>,
    ) -> Result<Histogram, HistogramError> {
        self.projection_2d(name.into(), 1, x_range)
    }

    fn projection_2d(
        &self,
        name: String,
        keep: usize,
        range: Option<BinRange>,
    ) -> Result<Histogram, HistogramError> {
        if self.dim() != 2 {
            return Err(HistogramError::WrongDimension {
                op: if keep == 0 { "ProjectionX" } else { "ProjectionY" },
                name: self.name.clone(),
                expected: 2,
                found: self.dim(),
            });
        }
        let mut ranges = [None, None, None];
        ranges[1 - keep] = range;
        self.project_onto(name, &[keep], ranges)
    }

    /// Project a 3D histogram onto one or two of its axes
    ///
    /// `axes` names the kept axes in output order (`"x"`, `"zy"`, ...).
    /// `ranges` restricts the summed axes.
    pub fn project_3d(
        &self,
        name: impl Into<String>,
        axes: &str,
        ranges: [Option<BinRange>; 3],
    ) -> Result<Histogram, HistogramError> {
        if self.dim() != 3 {
            return Err(HistogramError::WrongDimension {
                op: "Projection",
                name: self.name.clone(),
                expected: 3,
                found: self.dim(),
            });
        }
        let keep: Vec<usize> = axes
            .chars()
            .filter_map(|c| match c.to_ascii_lowercase() {
                'x' => Some(0),
                'y' => Some(1),
                'z' => Some(2),
                _ => None,
            })
            .collect();
        if keep.is_empty() || keep.len() > 2 || (keep.len() == 2 && keep[0] == keep[1]) {
            return Err(HistogramError::InvalidDimension {
                name: self.name.clone(),
                found: keep.len(),
            });
        }
        self.project_onto(name.into(), &keep, ranges)
    }

    fn project_onto(
        &self,
        name: String,
        keep: &[usize],
        ranges: [Option<BinRange>; 3],
    ) -> Result<Histogram, HistogramError> {
        let bins: Vec<Bins> = keep.iter().map(|k| self.axes[*k].bins.clone()).collect();
        let mut out = Histogram::new(name, self.title.clone(), bins)?;
        for (i, k) in keep.iter().enumerate() {
            if let Some(axis) = out.axes.get_mut(i) {
                axis.title = self.axes[*k].title.clone();
                axis.labels = self.axes[*k].labels.clone();
            }
        }
        out.sumw2 = Some(vec![0.0; out.contents.len()]);
        let errors = self.errors();
        for g in 0..self.contents.len() {
            let coords = self.bin_coords(g);
            let selected = (0..self.dim()).all(|a| {
                keep.contains(&a)
                    || ranges[a].map_or(true, |(lo, hi)| coords[a] >= lo && coords[a] <= hi)
            });
            if !selected {
                continue;
            }
            let mut target = [0usize; 3];
            for (i, k) in keep.iter().enumerate() {
                target[i] = coords[*k];
            }
            let t = out.global_bin(target[0], target[1], target[2]);
            out.contents[t] += self.contents[g];
            if let Some(w2) = &mut out.sumw2 {
                w2[t] += errors[g] * errors[g];
            }
        }
        out.entries = self.entries;
        Ok(out)
    }

    /// Re-bin onto new edges, one [`Bins`] per axis
    ///
    /// Each source bin is moved whole into the target bin containing its
    /// center.
    pub fn rebin(
        &self,
        name: impl Into<String>,
        edges: Vec<Bins>,
    ) -> Result<Histogram, HistogramError> {
        if edges.len() != self.dim() {
            return Err(HistogramError::WrongDimension {
                op: "Rebin",
                name: self.name.clone(),
                expected: edges.len(),
                found: self.dim(),
            });
        }
        let mut out = Histogram::new(name, self.title.clone(), edges)?;
        for (i, axis) in out.axes.iter_mut().enumerate() {
            axis.title = self.axes[i].title.clone();
        }
        out.sumw2 = Some(vec![0.0; out.contents.len()]);
        let errors = self.errors();
        for g in 0..self.contents.len() {
            let coords = self.bin_coords(g);
            let center: Vec<f64> = self
                .axes
                .iter()
                .enumerate()
                .map(|(i, a)| a.center(coords[i]))
                .collect();
            let t = out.find_bin(&center);
            out.contents[t] += self.contents[g];
            if let Some(w2) = &mut out.sumw2 {
                w2[t] += errors[g] * errors[g];
            }
        }
        out.entries = self.entries;
        Ok(out)
    }

    /// Zero every bin and the entry count
    pub fn reset(&mut self) {
        self.contents.iter_mut().for_each(|c| *c = 0.0);
        if let Some(w2) = &mut self.sumw2 {
            w2.iter_mut().for_each(|v| *v = 0.0);
        }
        self.entries = 0.0;
    }

    /// Copy of this histogram under a new name
    pub fn clone_named(&self, name: impl Into<String>) -> Histogram {
        let mut out = self.clone();
        out.name = name.into();
        out
    }

    /// Copy keeping only x bins in `range`; every other bin is zero
    pub fn clone_x_range(&self, name: impl Into<String>, range: BinRange) -> Histogram {
        let mut out = self.clone_named(name);
        out.reset();
        let errors = self.errors();
        for g in 0..self.contents.len() {
            let bx = self.bin_coords(g)[0];
            if bx >= range.0 && bx <= range.1 {
                out.contents[g] = self.contents[g];
                if let Some(w2) = &mut out.sumw2 {
                    w2[g] = errors[g] * errors[g];
                }
            }
        }
        out.entries = self.entries;
        out
    }

    /// Assign the same error to every in-range bin
    pub fn set_all_errors(&mut self, error: f64) {
        for g in self.in_range_bins().collect::<Vec<_>>() {
            self.set_bin_error(g, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h1(name: &str, values: &[f64]) -> Histogram {
        let mut h = Histogram::new_1d(name, "", Bins::linspace(values.len(), 0.0, values.len() as f64))
            .unwrap();
        for (i, v) in values.iter().enumerate() {
            h.set_bin_content(i + 1, *v);
        }
        h
    }

    fn h2() -> Histogram {
        let mut h = Histogram::new(
            "h2",
            "",
            vec![Bins::linspace(2, 0.0, 2.0), Bins::linspace(3, 0.0, 3.0)],
        )
        .unwrap();
        // content = 10 * bx + by
        for bx in 1..=2 {
            for by in 1..=3 {
                let g = h.global_bin(bx, by, 0);
                h.set_bin_content(g, (10 * bx + by) as f64);
            }
        }
        h
    }

    #[test]
    fn test_new_rejects_bad_axes() {
        assert!(matches!(
            Histogram::new("h", "", vec![]),
            Err(HistogramError::InvalidDimension { .. })
        ));
        assert!(matches!(
            Histogram::new("h", "", vec![Bins::default()]),
            Err(HistogramError::EmptyAxis { .. })
        ));
    }

    #[test]
    fn test_global_bin_layout() {
        let h = h2();
        assert_eq!(h.len(), 4 * 5);
        let g = h.global_bin(2, 3, 0);
        assert_eq!(h.bin_coords(g), [2, 3, 0]);
        assert_eq!(h.bin_content(g), 23.0);
        assert_eq!(h.class_name(), "TH2D");
    }

    #[test]
    fn test_fill_and_flow() {
        let mut h = Histogram::new_1d("h", "", Bins::linspace(2, 0.0, 2.0)).unwrap();
        h.fill(&[0.5], 1.0);
        h.fill(&[-1.0], 1.0);
        h.fill(&[5.0], 2.0);
        assert_eq!(h.contents(), &[1.0, 1.0, 0.0, 2.0]);
        assert_eq!(h.integral(false), 1.0);
        assert_eq!(h.entries(), 3.0);
    }

    #[test]
    fn test_add_and_incompatible() {
        let mut a = h1("a", &[1.0, 2.0, 3.0]);
        let b = h1("b", &[10.0, 20.0, 30.0]);
        a.add(&b, 1.0).unwrap();
        assert_eq!(&a.contents()[1..4], &[11.0, 22.0, 33.0]);
        let c = h1("c", &[1.0, 2.0]);
        assert!(matches!(
            a.add(&c, 1.0),
            Err(HistogramError::IncompatibleBinning { .. })
        ));
    }

    #[test]
    fn test_add_propagates_errors() {
        let mut a = h1("a", &[4.0]);
        let b = h1("b", &[9.0]);
        a.add(&b, 2.0).unwrap();
        // 4 + 4 * 9
        assert!((a.bin_error(1) - 40.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_divide_zero_denominator() {
        let mut a = h1("a", &[4.0, 3.0]);
        let b = h1("b", &[2.0, 0.0]);
        a.divide(&b).unwrap();
        assert_eq!(&a.contents()[1..3], &[2.0, 0.0]);
    }

    #[test]
    fn test_scale_width() {
        let mut h = Histogram::new_1d("h", "", Bins::from_edges(vec![0.0, 1.0, 3.0])).unwrap();
        h.set_bin_content(1, 2.0);
        h.set_bin_content(2, 4.0);
        h.scale(1.0, true);
        assert_eq!(&h.contents()[1..3], &[2.0, 2.0]);
        h.scale(0.5, false);
        assert_eq!(&h.contents()[1..3], &[1.0, 1.0]);
    }

    #[test]
    fn test_smooth_flattens_peak() {
        let mut h = h1("h", &[0.0, 0.0, 8.0, 0.0, 0.0]);
        h.smooth(1).unwrap();
        assert_eq!(h.bin_content(3), 4.0);
        assert_eq!(h.bin_content(2), 2.0);
        assert_eq!(h.bin_content(1), 0.0);
    }

    #[test]
    fn test_smooth_3d_rejected() {
        let mut h = Histogram::new(
            "h3",
            "",
            vec![Bins::linspace(1, 0.0, 1.0); 3],
        )
        .unwrap();
        assert!(h.smooth(1).is_err());
    }

    #[test]
    fn test_cumulative() {
        let h = h1("h", &[1.0, 2.0, 3.0]);
        let fwd = h.cumulative(true, "f");
        assert_eq!(&fwd.contents()[1..4], &[1.0, 3.0, 6.0]);
        let bwd = h.cumulative(false, "b");
        assert_eq!(&bwd.contents()[1..4], &[6.0, 5.0, 3.0]);
        assert_eq!(&h.contents()[1..4], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_projections() {
        let h = h2();
        let px = h.projection_x("px", None).unwrap();
        assert_eq!(&px.contents()[1..3], &[36.0, 66.0]);
        let px = h.projection_x("px", Some((2, 2))).unwrap();
        assert_eq!(&px.contents()[1..3], &[12.0, 22.0]);
        let py = h.projection_y("py", Some((1, 1))).unwrap();
        assert_eq!(&py.contents()[1..4], &[11.0, 12.0, 13.0]);
        assert!(px.projection_x("bad", None).is_err());
    }

    #[test]
    fn test_project_3d() {
        let mut h = Histogram::new(
            "h3",
            "",
            vec![
                Bins::linspace(2, 0.0, 2.0),
                Bins::linspace(2, 0.0, 2.0),
                Bins::linspace(2, 0.0, 2.0),
            ],
        )
        .unwrap();
        h.fill(&[0.5, 0.5, 0.5], 1.0);
        h.fill(&[1.5, 0.5, 1.5], 2.0);
        h.fill(&[1.5, 1.5, 1.5], 4.0);
        let pz = h.project_3d("pz", "z", [Some((2, 2)), None, None]).unwrap();
        assert_eq!(&pz.contents()[1..3], &[0.0, 6.0]);
        let pyx = h.project_3d("pyx", "yx", [None, None, None]).unwrap();
        assert_eq!(pyx.dim(), 2);
        assert_eq!(pyx.bin_content(pyx.global_bin(1, 2, 0)), 2.0);
        assert!(h.project_3d("bad", "q", [None, None, None]).is_err());
    }

    #[test]
    fn test_rebin() {
        let h = h1("h", &[1.0, 2.0, 3.0, 4.0]);
        let r = h
            .rebin("r", vec![Bins::from_edges(vec![0.0, 2.0, 4.0])])
            .unwrap();
        assert_eq!(&r.contents()[1..3], &[3.0, 7.0]);
        assert!(h.rebin("r", vec![Bins::linspace(1, 0.0, 1.0); 2]).is_err());
    }

    #[test]
    fn test_clone_x_range() {
        let h = h1("h", &[1.0, 2.0, 3.0, 4.0]);
        let c = h.clone_x_range("c", (2, 3));
        assert_eq!(&c.contents()[1..5], &[0.0, 2.0, 3.0, 0.0]);
        assert_eq!(c.name, "c");
    }

    #[test]
    fn test_set_all_errors() {
        let mut h = h1("h", &[1.0, 2.0]);
        h.set_all_errors(0.5);
        assert_eq!(h.bin_error(1), 0.5);
        assert_eq!(h.bin_error(2), 0.5);
        assert_eq!(h.bin_error(0), 0.0);
    }

    #[test]
    fn test_statistics() {
        let h = h1("h", &[1.0, 0.0, 1.0]);
        assert_eq!(h.mean(0), 1.5);
        assert_eq!(h.std_dev(0), 1.0);
        assert_eq!(h.maximum(), 1.0);
        assert_eq!(h.minimum(), 0.0);
    }
}

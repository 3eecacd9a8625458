//! Tabular record sources filled into histograms through draw expressions

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::format_errors;
use crate::objects::{Bins, Histogram};
use crate::parser::{eval, parse_draw, parse_expr, Expr};

use super::DataError;

/// Files per slice when a `.lis` list is split with `index`
pub const DEFAULT_SPLIT_BY: usize = 50;

/// Automatic binning per draw dimension
const AUTO_BINS: [usize; 3] = [100, 40, 20];

pub type Row = HashMap<String, f64>;

/// Rows of one named tree gathered from one or more JSON files
#[derive(Debug, Clone, Default)]
pub struct TabularSource {
    pub name: String,
    pub tree: String,
    pub files: Vec<PathBuf>,
    rows: Vec<Row>,
}

impl TabularSource {
    pub fn from_rows(name: impl Into<String>, tree: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            tree: tree.into(),
            files: Vec::new(),
            rows,
        }
    }

    /// Open `url`, either a JSON file or a `.lis` list of JSON files
    ///
    /// With a list, `index` selects the slice `[index * split_by, (index + 1) * split_by)`;
    /// otherwise `max_files` caps the number of files read.
    pub fn open(
        name: impl Into<String>,
        tree: impl Into<String>,
        url: &Path,
        index: Option<usize>,
        split_by: usize,
        max_files: Option<usize>,
    ) -> Result<Self, DataError> {
        let tree = tree.into();
        let files = if url.extension().is_some_and(|e| e == "lis") {
            let listed = read_list(url)?;
            match index {
                Some(i) => {
                    tracing::info!(index = i, split_by, "loading slice of file list");
                    listed.into_iter().skip(i.saturating_mul(split_by)).take(split_by).collect()
                }
                None => cap(listed, max_files),
            }
        } else {
            vec![url.to_path_buf()]
        };

        let mut source = Self::from_rows(name, tree, Vec::new());
        for file in &files {
            source.rows.extend(read_tree(file, &source.tree)?);
        }
        source.files = files;
        tracing::info!(
            name = %source.name,
            tree = %source.tree,
            files = source.files.len(),
            rows = source.rows.len(),
            "loaded tabular source"
        );
        Ok(source)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fill a histogram named `name` from `draw`, weighted by `select`
    ///
    /// `bins` is in axis order (x first); missing axes are binned
    /// automatically over the observed range. At most `max_rows` rows are
    /// read. Axis titles come from the draw expression unless `title` is given.
    pub fn draw(
        &self,
        name: &str,
        draw: &str,
        select: &str,
        title: Option<&str>,
        bins: Vec<Bins>,
        max_rows: Option<usize>,
    ) -> Result<Histogram, DataError> {
        let parsed = parse_draw(draw).map_err(|errors| DataError::Expression {
            expr: draw.to_string(),
            message: format_errors(&errors, draw, name),
        })?;
        if parsed.dim() == 0 || parsed.dim() > 3 {
            return Err(DataError::Dimension(parsed.dim()));
        }
        let selection = if select.trim().is_empty() {
            None
        } else {
            Some(parse_expr(select).map_err(|errors| DataError::Expression {
                expr: select.to_string(),
                message: format_errors(&errors, select, name),
            })?)
        };

        let dims: Vec<&Expr> = parsed.axis_order().collect();
        let mut points = Vec::new();
        for row in self.rows.iter().take(max_rows.unwrap_or(usize::MAX)) {
            let weight = match &selection {
                Some(s) => eval(s, row, &[])?,
                None => 1.0,
            };
            if weight == 0.0 || !weight.is_finite() {
                continue;
            }
            let point = dims
                .iter()
                .map(|e| eval(e, row, &[]))
                .collect::<Result<Vec<f64>, _>>()?;
            points.push((point, weight));
        }

        let axes = (0..dims.len())
            .map(|i| match bins.get(i) {
                Some(b) if !b.is_empty() => b.clone(),
                _ => auto_bins(AUTO_BINS[dims.len() - 1], points.iter().map(|(p, _)| p[i])),
            })
            .collect();

        let mut h = Histogram::new(name, title.unwrap_or_default(), axes)?;
        if title.is_none() {
            let spans: Vec<_> = parsed.dims.iter().map(|d| d.span.clone()).collect();
            for (i, axis_title) in axis_titles(draw, &spans).into_iter().enumerate() {
                if let Some(axis) = h.axis_mut(i) {
                    axis.title = axis_title;
                }
            }
        }
        for (point, weight) in &points {
            h.fill(point, *weight);
        }
        tracing::debug!(name, draw, select, filled = points.len(), "drew histogram from rows");
        Ok(h)
    }
}

/// Axis titles from the source text of each dimension, x first
fn axis_titles(draw: &str, spans: &[std::ops::Range<usize>]) -> Vec<String> {
    spans
        .iter()
        .rev()
        .map(|s| draw.get(s.clone()).unwrap_or_default().trim().to_string())
        .collect()
}

fn auto_bins(n: usize, values: impl Iterator<Item = f64>) -> Bins {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return Bins::linspace(n, 0.0, 1.0);
    }
    if lo == hi {
        return Bins::linspace(n, lo - 0.5, hi + 0.5);
    }
    // widen slightly so the maximum lands inside the last bin
    let pad = (hi - lo) * 1e-6;
    Bins::linspace(n, lo, hi + pad)
}

fn cap(files: Vec<PathBuf>, max_files: Option<usize>) -> Vec<PathBuf> {
    match max_files {
        Some(n) => files.into_iter().take(n).collect(),
        None => files,
    }
}

fn read_list(path: &Path) -> Result<Vec<PathBuf>, DataError> {
    let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| {
            let p = PathBuf::from(l);
            if p.is_absolute() || p.exists() {
                p
            } else {
                base.join(p)
            }
        })
        .collect())
}

fn read_tree(path: &Path, tree: &str) -> Result<Vec<Row>, DataError> {
    let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| DataError::Json {
        path: path.display().to_string(),
        source,
    })?;
    let Some(Value::Array(records)) = value.get(tree) else {
        return Err(DataError::MissingTree {
            tree: tree.to_string(),
            path: path.display().to_string(),
        });
    };
    Ok(records
        .iter()
        .map(|r| {
            let mut row = Row::new();
            flatten("", r, &mut row);
            row
        })
        .collect())
}

/// Numeric leaves of a record keyed by their dotted path
fn flatten(prefix: &str, value: &Value, row: &mut Row) {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_f64() {
                row.insert(prefix.to_string(), v);
            }
        }
        Value::Bool(b) => {
            row.insert(prefix.to_string(), if *b { 1.0 } else { 0.0 });
        }
        Value::Object(map) => {
            for (key, v) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&path, v, row);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows() -> TabularSource {
        let rows = (0..10)
            .map(|i| {
                let mut r = Row::new();
                r.insert("pt".into(), i as f64);
                r.insert("eta".into(), (i % 2) as f64);
                r
            })
            .collect();
        TabularSource::from_rows("d", "tree", rows)
    }

    #[test]
    fn test_draw_with_bins_and_selection() {
        let src = rows();
        let h = src
            .draw("h", "pt", "eta == 1", None, vec![Bins::linspace(2, 0.0, 10.0)], None)
            .unwrap();
        // odd pt: 1,3 in the first bin; 5,7,9 in the second
        assert_eq!(h.bin_content(1), 2.0);
        assert_eq!(h.bin_content(2), 3.0);
        assert_eq!(h.axis(0).unwrap().title, "pt");
    }

    #[test]
    fn test_selection_is_a_weight() {
        let src = rows();
        let h = src
            .draw("h", "pt", "2", None, vec![Bins::linspace(1, 0.0, 10.0)], None)
            .unwrap();
        assert_eq!(h.integral(false), 20.0);
    }

    #[test]
    fn test_auto_binning_2d_titles() {
        let src = rows();
        let h = src.draw("h2", "eta : pt*2", "", None, Vec::new(), Some(4)).unwrap();
        assert_eq!(h.dim(), 2);
        assert_eq!(h.axis(0).unwrap().nbins(), 40);
        assert_eq!(h.axis(1).unwrap().nbins(), 40);
        assert_eq!(h.axis(0).unwrap().title, "pt*2");
        assert_eq!(h.axis(1).unwrap().title, "eta");
        assert_eq!(h.integral(false), 4.0);
    }

    #[test]
    fn test_explicit_title_skips_axis_titles() {
        let src = rows();
        let h = src
            .draw("h2", "eta : pt", "", Some("momentum"), Vec::new(), None)
            .unwrap();
        assert_eq!(h.title, "momentum");
        assert_eq!(h.axis(0).unwrap().title, "");
        assert_eq!(h.axis(1).unwrap().title, "");
    }

    #[test]
    fn test_bad_expression() {
        let src = rows();
        assert!(matches!(
            src.draw("h", "pt +", "", None, Vec::new(), None),
            Err(DataError::Expression { .. })
        ));
        assert!(matches!(
            src.draw("h", "missing", "", None, Vec::new(), None),
            Err(DataError::Eval(_))
        ));
    }

    #[test]
    fn test_open_list_with_slice() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = String::new();
        for i in 0..3 {
            let file = dir.path().join(format!("f{}.json", i));
            std::fs::write(
                &file,
                format!(r#"{{"events": [{{"pt": {}, "jet": {{"e": 2}}}}]}}"#, i),
            )
            .unwrap();
            list.push_str(&format!("f{}.json\n", i));
        }
        let lis = dir.path().join("files.lis");
        std::fs::write(&lis, list).unwrap();

        let all = TabularSource::open("d", "events", &lis, None, DEFAULT_SPLIT_BY, Some(2)).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.rows()[0].get("jet.e"), Some(&2.0));

        let slice = TabularSource::open("d", "events", &lis, Some(1), 2, None).unwrap();
        assert_eq!(slice.len(), 1);
        assert_eq!(slice.rows()[0].get("pt"), Some(&2.0));

        let past_end = TabularSource::open("d", "events", &lis, Some(usize::MAX), 2, None).unwrap();
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_missing_tree() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("t.json");
        std::fs::write(&file, r#"{"other": []}"#).unwrap();
        assert!(matches!(
            TabularSource::open("d", "events", &file, None, DEFAULT_SPLIT_BY, None),
            Err(DataError::MissingTree { .. })
        ));
    }
}

//! Bin edge specifications

use crate::config::{join_path, View};

/// Upper bound on the bins a generated specification may describe
pub const MAX_BINS: usize = 1_000_000;

/// An ordered list of bin edges. `n` edges describe `n - 1` bins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bins {
    pub edges: Vec<f64>,
}

impl Bins {
    pub fn from_edges(edges: Vec<f64>) -> Self {
        Self { edges }
    }

    /// `n` uniform bins between `min` and `max`
    pub fn linspace(n: usize, min: f64, max: f64) -> Self {
        if n == 0 || max <= min {
            return Self::default();
        }
        if n > MAX_BINS {
            tracing::error!(n, max = MAX_BINS, "too many bins requested");
            return Self::default();
        }
        let width = (max - min) / n as f64;
        let edges = (0..=n).map(|i| min + width * i as f64).collect();
        Self { edges }
    }

    /// Bins of fixed `width` from `min`; the last edge is at or past `max`
    pub fn arange(min: f64, max: f64, width: f64) -> Self {
        if width <= 0.0 || max <= min {
            return Self::default();
        }
        let n = ((max - min) / width - 1e-9).ceil().max(1.0);
        if !n.is_finite() || n > MAX_BINS as f64 {
            tracing::error!(min, max, width, "too many bins requested");
            return Self::default();
        }
        let n = n as usize;
        let edges = (0..=n).map(|i| min + width * i as f64).collect();
        Self { edges }
    }

    pub fn nbins(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.nbins() == 0
    }

    pub fn minimum(&self) -> f64 {
        self.edges.first().copied().unwrap_or(0.0)
    }

    pub fn maximum(&self) -> f64 {
        self.edges.last().copied().unwrap_or(0.0)
    }

    /// Parse `"n,min,max"`
    pub fn parse_linspace(text: &str) -> Self {
        match parse_numbers(text).as_slice() {
            [n, min, max] if *n >= 1.0 => Self::linspace(*n as usize, *min, *max),
            _ => Self::default(),
        }
    }

    /// Parse `"min,max,width"`
    pub fn parse_arange(text: &str) -> Self {
        match parse_numbers(text).as_slice() {
            [min, max, width] => Self::arange(*min, *max, *width),
            _ => Self::default(),
        }
    }

    /// Parse an inline list of edges; non-increasing lists are rejected
    pub fn parse_list(text: &str) -> Self {
        let edges = parse_numbers(text);
        if edges.len() < 2 || edges.windows(2).any(|w| w[1] <= w[0]) {
            return Self::default();
        }
        Self { edges }
    }

    /// Read a bin description attached to the node at `node`
    ///
    /// Recognised forms, first match wins: `bins` (edge list), `linspace`,
    /// `arange`, `width` + `min` + `max`, `nBins` + `min` + `max`, and finally
    /// the node text as an edge list.
    pub fn from_node(view: &View<'_>, node: &str) -> Self {
        let attr = |name: &str| view.string(&format!("{}:{}", node, name));
        if let Some(list) = attr("bins") {
            return Self::parse_list(&list);
        }
        if let Some(ls) = attr("linspace") {
            return Self::parse_linspace(&ls);
        }
        if let Some(ar) = attr("arange") {
            return Self::parse_arange(&ar);
        }
        let min = view.get::<f64>(&format!("{}:min", node));
        let max = view.get::<f64>(&format!("{}:max", node));
        if let (Some(min), Some(max)) = (min, max) {
            if let Some(width) = view.get::<f64>(&format!("{}:width", node)) {
                return Self::arange(min, max, width);
            }
            if let Some(n) = view.get::<usize>(&format!("{}:nBins", node)) {
                return Self::linspace(n, min, max);
            }
        }
        match view.string(node) {
            Some(text) if !text.is_empty() => Self::parse_list(&text),
            _ => Self::default(),
        }
    }

    /// Resolve a `bins_x`-style value: either inline edges or a path to a bin node
    ///
    /// Paths are tried as given and relative to `scope`.
    pub fn from_value(view: &View<'_>, scope: &str, value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return Self::default();
        }
        if value.contains(',') && !parse_numbers(value).is_empty() {
            return Self::parse_list(value);
        }
        let scoped = join_path(scope, value);
        for candidate in [value, scoped.as_str()] {
            if view.config.tag_name(candidate).is_some() {
                return Self::from_node(view, candidate);
            }
        }
        tracing::warn!(bins = %value, "cannot resolve bin specification");
        Self::default()
    }

    /// Index of the bin containing `x` (1-based), 0 for underflow, `nbins + 1` for overflow
    pub fn find_bin(&self, x: f64) -> usize {
        let n = self.nbins();
        if n == 0 || x < self.minimum() || x.is_nan() {
            return 0;
        }
        if x >= self.maximum() {
            return n + 1;
        }
        self.edges.partition_point(|e| *e <= x)
    }
}

fn parse_numbers(text: &str) -> Vec<f64> {
    let parsed: Result<Vec<f64>, _> = text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<f64>)
        .collect();
    parsed.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Env};

    #[test]
    fn test_oversized_specifications_are_rejected() {
        assert!(Bins::parse_linspace("inf,0,1").is_empty());
        assert!(Bins::parse_linspace("1e12,0,1").is_empty());
        assert!(Bins::arange(0.0, 1.0, 1e-300).is_empty());
    }

    #[test]
    fn test_linspace() {
        let b = Bins::linspace(4, 0.0, 2.0);
        assert_eq!(b.edges, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(b.nbins(), 4);
        assert!(Bins::linspace(0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_arange() {
        let b = Bins::arange(0.0, 10.0, 2.5);
        assert_eq!(b.nbins(), 4);
        assert_eq!(b.maximum(), 10.0);
        let b = Bins::arange(0.0, 10.0, 3.0);
        assert_eq!(b.nbins(), 4);
        assert_eq!(b.maximum(), 12.0);
    }

    #[test]
    fn test_parse_list_rejects_unordered() {
        assert_eq!(Bins::parse_list("0, 1, 5").nbins(), 2);
        assert!(Bins::parse_list("0, 5, 1").is_empty());
        assert!(Bins::parse_list("abc").is_empty());
    }

    #[test]
    fn test_find_bin() {
        let b = Bins::from_edges(vec![0.0, 1.0, 2.0, 4.0]);
        assert_eq!(b.find_bin(-1.0), 0);
        assert_eq!(b.find_bin(0.0), 1);
        assert_eq!(b.find_bin(1.5), 2);
        assert_eq!(b.find_bin(3.9), 3);
        assert_eq!(b.find_bin(4.0), 4);
    }

    #[test]
    fn test_from_value_inline_and_path() {
        let config = Config::from_xml_str(
            r#"<config>
                <Bins><pt linspace="2,0,1"/><eta width="0.5" min="-1" max="1"/></Bins>
                <Plot><local bins="0,1,3"/></Plot>
            </config>"#,
        )
        .unwrap();
        let env = Env::new();
        let view = config.view(&env);
        assert_eq!(Bins::from_value(&view, "", "0, 2, 4").nbins(), 2);
        assert_eq!(Bins::from_value(&view, "", "Bins.pt").edges, vec![0.0, 0.5, 1.0]);
        assert_eq!(Bins::from_value(&view, "", "Bins.eta").nbins(), 4);
        assert_eq!(Bins::from_value(&view, "Plot", "local").nbins(), 2);
        assert!(Bins::from_value(&view, "", "Missing").is_empty());
    }
}

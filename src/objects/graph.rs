//! Point graphs with optional symmetric errors

use super::style::Style;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphPoint {
    pub x: f64,
    pub y: f64,
    pub ex: f64,
    pub ey: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Graph {
    pub name: String,
    pub title: String,
    pub points: Vec<GraphPoint>,
    pub style: Style,
}

impl Graph {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Build from parallel coordinate arrays; missing errors count as zero
    pub fn from_arrays(name: impl Into<String>, x: &[f64], y: &[f64], ex: &[f64], ey: &[f64]) -> Self {
        let mut graph = Self::new(name, "");
        for (i, (x, y)) in x.iter().zip(y).enumerate() {
            graph.push(
                *x,
                *y,
                ex.get(i).copied().unwrap_or(0.0),
                ey.get(i).copied().unwrap_or(0.0),
            );
        }
        graph
    }

    pub fn push(&mut self, x: f64, y: f64, ex: f64, ey: f64) {
        self.points.push(GraphPoint { x, y, ex, ey });
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.points.iter().any(|p| p.ex != 0.0 || p.ey != 0.0)
    }

    pub fn class_name(&self) -> &'static str {
        if self.has_errors() {
            "TGraphErrors"
        } else {
            "TGraph"
        }
    }

    /// `(min, max)` of x and y including error bars
    pub fn bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        if self.points.is_empty() {
            return None;
        }
        let mut x = (f64::INFINITY, f64::NEG_INFINITY);
        let mut y = (f64::INFINITY, f64::NEG_INFINITY);
        for p in &self.points {
            x = (x.0.min(p.x - p.ex), x.1.max(p.x + p.ex));
            y = (y.0.min(p.y - p.ey), y.1.max(p.y + p.ey));
        }
        Some((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_arrays() {
        let g = Graph::from_arrays("g", &[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[], &[0.5]);
        assert_eq!(g.len(), 3);
        assert_eq!(g.points[0].ey, 0.5);
        assert_eq!(g.points[2].ey, 0.0);
        assert_eq!(g.class_name(), "TGraphErrors");
    }

    #[test]
    fn test_bounds() {
        let g = Graph::from_arrays("g", &[1.0, 3.0], &[2.0, -1.0], &[0.5], &[]);
        assert_eq!(g.bounds(), Some(((0.5, 3.0), (-1.0, 2.0))));
        assert_eq!(Graph::new("e", "").bounds(), None);
        assert_eq!(Graph::new("e", "").class_name(), "TGraph");
    }
}

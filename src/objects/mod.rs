//! Plot objects: histograms, graphs and functions

pub mod bins;
pub mod function;
pub mod graph;
pub mod histogram;
pub mod style;

use std::cell::RefCell;
use std::rc::Rc;

pub use bins::Bins;
pub use function::Function;
pub use graph::Graph;
pub use histogram::{Axis, BinRange, Histogram, HistogramError};
pub use style::Style;

/// Any object that can be registered, transformed and drawn
#[derive(Debug, Clone, PartialEq)]
pub enum PlotObject {
    Histogram(Histogram),
    Graph(Graph),
    Function(Function),
}

/// Shared handle to a registered object
pub type ObjectRef = Rc<RefCell<PlotObject>>;

/// Wrap an object in a fresh shared handle
pub fn share(object: PlotObject) -> ObjectRef {
    Rc::new(RefCell::new(object))
}

impl PlotObject {
    pub fn name(&self) -> &str {
        match self {
            PlotObject::Histogram(h) => &h.name,
            PlotObject::Graph(g) => &g.name,
            PlotObject::Function(f) => &f.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            PlotObject::Histogram(h) => h.name = name,
            PlotObject::Graph(g) => g.name = name,
            PlotObject::Function(f) => f.name = name,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            PlotObject::Histogram(h) => &h.title,
            PlotObject::Graph(g) => &g.title,
            PlotObject::Function(f) => &f.title,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        match self {
            PlotObject::Histogram(h) => h.title = title,
            PlotObject::Graph(g) => g.title = title,
            PlotObject::Function(f) => f.title = title,
        }
    }

    /// Runtime class name (`TH1D`, `TGraph`, `TF1`, ...), used by typed glob queries
    pub fn class_name(&self) -> &'static str {
        match self {
            PlotObject::Histogram(h) => h.class_name(),
            PlotObject::Graph(g) => g.class_name(),
            PlotObject::Function(f) => f.class_name(),
        }
    }

    pub fn style(&self) -> &Style {
        match self {
            PlotObject::Histogram(h) => &h.style,
            PlotObject::Graph(g) => &g.style,
            PlotObject::Function(f) => &f.style,
        }
    }

    pub fn style_mut(&mut self) -> &mut Style {
        match self {
            PlotObject::Histogram(h) => &mut h.style,
            PlotObject::Graph(g) => &mut g.style,
            PlotObject::Function(f) => &mut f.style,
        }
    }

    pub fn as_histogram(&self) -> Option<&Histogram> {
        match self {
            PlotObject::Histogram(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_histogram_mut(&mut self) -> Option<&mut Histogram> {
        match self {
            PlotObject::Histogram(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_graph(&self) -> Option<&Graph> {
        match self {
            PlotObject::Graph(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            PlotObject::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_histogram(&self) -> bool {
        matches!(self, PlotObject::Histogram(_))
    }
}

impl From<Histogram> for PlotObject {
    fn from(h: Histogram) -> Self {
        PlotObject::Histogram(h)
    }
}

impl From<Graph> for PlotObject {
    fn from(g: Graph) -> Self {
        PlotObject::Graph(g)
    }
}

impl From<Function> for PlotObject {
    fn from(f: Function) -> Self {
        PlotObject::Function(f)
    }
}

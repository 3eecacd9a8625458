//! Vega Plotter - declarative plotting from XML documents
//!
//! A document lists data sources, transformations and figures. The
//! [`Plotter`] walks it node by node, keeps every histogram, graph and
//! function it loads or derives in a [`registry::Registry`], and draws
//! through a [`Backend`] that writes SVG or raster images.
//!
//! # Example
//!
//! ```rust
//! use vega_plotter::{Config, Plotter, SceneBackend};
//!
//! let config = Config::from_xml_str(r#"
//!     <config>
//!         <Data name="d">
//!             <HistogramData name="h" type="TH1D" bins_x="0,1,2" content="3,4"/>
//!         </Data>
//!         <Scale name="d/h" factor="2" save_as="h2"/>
//!     </config>
//! "#).unwrap();
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut plotter = Plotter::new(config, SceneBackend::new()).with_base_dir(dir.path());
//! plotter.make().unwrap();
//! assert!(plotter.registry().contains("h2"));
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod names;
pub mod objects;
pub mod palette;
pub mod parser;
pub mod registry;
pub mod renderer;

use std::path::{Path, PathBuf};

pub use config::{Config, ConfigError, Env};
pub use engine::{Handler, Plotter, RunError};
pub use error::ParseError;
pub use palette::{Color, Palette};
pub use renderer::{Backend, SceneBackend, SvgConfig};

/// Options for a complete run of one document
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// The XML document
    pub input: PathBuf,
    /// Palette overlay (TOML)
    pub palette: Option<PathBuf>,
    /// Directory relative urls resolve against
    pub base_dir: PathBuf,
    /// SVG output settings
    pub svg: SvgConfig,
}

impl RunOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            palette: None,
            base_dir: PathBuf::from("."),
            svg: SvgConfig::default(),
        }
    }

    /// Load a palette file over the built-in colors
    pub fn with_palette(mut self, palette: impl Into<PathBuf>) -> Self {
        self.palette = Some(palette.into());
        self
    }

    pub fn with_base_dir(mut self, base: impl Into<PathBuf>) -> Self {
        self.base_dir = base.into();
        self
    }

    pub fn with_svg(mut self, svg: SvgConfig) -> Self {
        self.svg = svg;
        self
    }
}

/// Load the palette named by `path`, or the built-in one
pub fn load_palette(path: Option<&Path>) -> Result<Palette, RunError> {
    match path {
        Some(path) => Ok(Palette::from_file(path)?),
        None => Ok(Palette::default()),
    }
}

/// Run a document read from disk with the scene back end
///
/// Returns the plotter so callers can inspect what was registered and printed.
pub fn run(options: &RunOptions) -> Result<Plotter, RunError> {
    let config = Config::from_file(&options.input)?;
    run_config(config, options)
}

/// Run an already loaded document with the scene back end
pub fn run_config(config: Config, options: &RunOptions) -> Result<Plotter, RunError> {
    let palette = load_palette(options.palette.as_deref())?;
    let backend = SceneBackend::new().with_svg_config(options.svg.clone());
    let mut plotter = Plotter::new(config, backend)
        .with_palette(palette)
        .with_base_dir(&options.base_dir);
    tracing::info!(input = %options.input.display(), "running");
    plotter.make()?;
    Ok(plotter)
}

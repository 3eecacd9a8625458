//! Rendering back end
//!
//! Drawing handlers talk to a [`Backend`]. The bundled [`SceneBackend`]
//! records canvases, pads and primitives, then flattens them to pixel-space
//! shapes and prints them as SVG or as a raster image.

pub mod config;
pub mod primitive;
pub mod raster;
pub mod scene;
pub mod svg;

use std::path::Path;

use thiserror::Error;

pub use config::SvgConfig;
pub use primitive::{Align, Coords, Frame, Margins, Primitive, Rect, Shape, Stroke, TextItem};
pub use scene::{Backend, Canvas, Pad, PrintScope, SceneBackend};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot print {url}: format '{ext}' is not supported")]
    UnsupportedFormat { url: String, ext: String },

    #[error("nothing to print to {0}: no canvas is open")]
    NoCanvas(String),

    #[error("cannot write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Output file kinds understood by the scene back end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Raster(image::ImageFormat),
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "svg" => Ok(OutputFormat::Svg),
            "png" => Ok(OutputFormat::Raster(image::ImageFormat::Png)),
            "jpg" | "jpeg" => Ok(OutputFormat::Raster(image::ImageFormat::Jpeg)),
            "bmp" => Ok(OutputFormat::Raster(image::ImageFormat::Bmp)),
            "gif" => Ok(OutputFormat::Raster(image::ImageFormat::Gif)),
            _ => Err(RenderError::UnsupportedFormat {
                url: path.display().to_string(),
                ext,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format() {
        assert_eq!(OutputFormat::from_path(Path::new("a/b.SVG")).unwrap(), OutputFormat::Svg);
        assert_eq!(
            OutputFormat::from_path(Path::new("plot.jpeg")).unwrap(),
            OutputFormat::Raster(image::ImageFormat::Jpeg)
        );
        assert!(matches!(
            OutputFormat::from_path(Path::new("plot.pdf")),
            Err(RenderError::UnsupportedFormat { ext, .. }) if ext == "pdf"
        ));
        assert!(OutputFormat::from_path(Path::new("noext")).is_err());
    }
}

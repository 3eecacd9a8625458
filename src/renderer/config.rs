//! Configuration for SVG output

/// Configuration options for SVG output
#[derive(Debug, Clone)]
pub struct SvgConfig {
    /// Whether to include the XML declaration
    pub standalone: bool,

    /// Whether to put each element on its own indented line
    pub pretty_print: bool,

    /// Prefix for CSS class names (e.g., "vp-" for "vp-box")
    pub class_prefix: Option<String>,

    /// Font family applied to the whole document
    pub font_family: String,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            standalone: true,
            pretty_print: true,
            class_prefix: Some("vp-".to_string()),
            font_family: "Helvetica, Arial, sans-serif".to_string(),
        }
    }
}

impl SvgConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_standalone(mut self, standalone: bool) -> Self {
        self.standalone = standalone;
        self
    }

    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    pub fn with_class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = Some(prefix.into());
        self
    }

    pub fn without_class_prefix(mut self) -> Self {
        self.class_prefix = None;
        self
    }

    pub fn with_font_family(mut self, font: impl Into<String>) -> Self {
        self.font_family = font.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SvgConfig::default();
        assert!(config.standalone);
        assert!(config.pretty_print);
        assert_eq!(config.class_prefix, Some("vp-".to_string()));
    }

    #[test]
    fn test_builder_pattern() {
        let config = SvgConfig::new()
            .with_standalone(false)
            .with_pretty_print(false)
            .with_class_prefix("my-")
            .with_font_family("serif");

        assert!(!config.standalone);
        assert!(!config.pretty_print);
        assert_eq!(config.class_prefix, Some("my-".to_string()));
        assert_eq!(config.font_family, "serif");
        assert_eq!(config.without_class_prefix().class_prefix, None);
    }
}

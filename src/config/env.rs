//! Scoped scalar variables and read-time `{name}` interpolation

use std::collections::HashMap;

use super::store::Config;

/// Upper bound on nested placeholder expansion
const MAX_INTERPOLATION_PASSES: usize = 8;

/// A frame of scalar variables linked to its enclosing frame
///
/// Loop constructs run their body in a [`Env::child`] frame, so loop
/// variables disappear with the frame and nested loops that reuse a
/// variable name shadow rather than clobber the outer binding.
#[derive(Debug, Default)]
pub struct Env<'p> {
    vars: HashMap<String, String>,
    parent: Option<&'p Env<'p>>,
}

impl Env<'static> {
    /// Create an empty root frame
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'p> Env<'p> {
    /// Open a child frame that sees every binding of this one
    pub fn child(&self) -> Env<'_> {
        Env {
            vars: HashMap::new(),
            parent: Some(self),
        }
    }

    /// Bind a variable in this frame
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Look a variable up in this frame, then in the enclosing frames
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.vars.get(name) {
            Some(v) => Some(v.as_str()),
            None => self.parent.and_then(|p| p.get(name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of enclosing frames
    pub fn depth(&self) -> usize {
        self.parent.map(|p| p.depth() + 1).unwrap_or(0)
    }

    /// Expand `{name}` placeholders
    ///
    /// A placeholder resolves to the nearest variable binding, then to the
    /// config value stored at the path `name`. Unknown placeholders are left
    /// verbatim so that text such as `#frac{a}{b}` survives untouched.
    pub fn interpolate(&self, text: &str, config: &Config) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_INTERPOLATION_PASSES {
            if !current.contains('{') {
                break;
            }
            let next = self.interpolate_once(&current, config);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// One pass over `text`, expanding innermost placeholders first
    fn interpolate_once(&self, text: &str, config: &Config) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(close) = rest.find('}') {
            let Some(open) = rest[..close].rfind('{') else {
                out.push_str(&rest[..=close]);
                rest = &rest[close + 1..];
                continue;
            };
            out.push_str(&rest[..open]);
            match self.lookup(&rest[open + 1..close], config) {
                Some(value) => out.push_str(&value),
                None => out.push_str(&rest[open..=close]),
            }
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        out
    }

    fn lookup(&self, key: &str, config: &Config) -> Option<String> {
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return None;
        }
        if let Some(v) = self.get(key) {
            return Some(v.to_string());
        }
        config.raw(key).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_config() -> Config {
        Config::from_xml_str("<config/>").unwrap()
    }

    #[test]
    fn test_child_sees_parent() {
        let mut root = Env::new();
        root.set("a", "1");
        let child = root.child();
        assert_eq!(child.get("a"), Some("1"));
        assert_eq!(child.depth(), 1);
    }

    #[test]
    fn test_child_binding_does_not_leak() {
        let root = Env::new();
        {
            let mut child = root.child();
            child.set("state", "x");
            assert_eq!(child.get("state"), Some("x"));
        }
        assert_eq!(root.get("state"), None);
    }

    #[test]
    fn test_shadowing() {
        let mut root = Env::new();
        root.set("v", "outer");
        let mut child = root.child();
        child.set("v", "inner");
        assert_eq!(child.get("v"), Some("inner"));
        assert_eq!(root.get("v"), Some("outer"));
    }

    #[test]
    fn test_interpolate_variables() {
        let config = empty_config();
        let mut env = Env::new();
        env.set("name", "h1");
        env.set("i", "3");
        assert_eq!(env.interpolate("hist_{name}_{i}", &config), "hist_h1_3");
    }

    #[test]
    fn test_interpolate_unknown_left_verbatim() {
        let config = empty_config();
        let env = Env::new();
        assert_eq!(env.interpolate("#frac{a}{b}", &config), "#frac{a}{b}");
    }

    #[test]
    fn test_interpolate_nested() {
        let config = empty_config();
        let mut env = Env::new();
        env.set("outer", "{inner}_x");
        env.set("inner", "y");
        assert_eq!(env.interpolate("{outer}", &config), "y_x");
    }

    #[test]
    fn test_interpolate_inner_placeholder_first() {
        let config = empty_config();
        let mut env = Env::new();
        env.set("which", "k");
        env.set("k", "7");
        assert_eq!(env.interpolate("bin_{{which}}", &config), "bin_7");
        assert_eq!(env.interpolate("{a{which}}", &config), "{ak}");
    }

    #[test]
    fn test_interpolate_config_fallback() {
        let config = Config::from_xml_str(r#"<config><Meta title="Run 9"/></config>"#).unwrap();
        let env = Env::new();
        assert_eq!(env.interpolate("{Meta:title}", &config), "Run 9");
    }

    #[test]
    fn test_interpolate_unclosed_brace() {
        let config = empty_config();
        let env = Env::new();
        assert_eq!(env.interpolate("a{b", &config), "a{b");
    }
}

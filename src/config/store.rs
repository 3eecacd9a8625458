//! Path-addressed configuration tree
//!
//! Paths look like `Plot[1].Axes:x`. Segments are separated by `.`, `[i]`
//! selects the i-th child carrying that tag (default 0) and `:attr` selects
//! an attribute. A node path without an attribute addresses the node's text.

use indexmap::IndexMap;

use super::env::Env;

/// Index of a node in the configuration arena
pub type NodeId = usize;

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) tag: String,
    pub(crate) attrs: IndexMap<String, String>,
    pub(crate) text: String,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(tag: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.into(),
            attrs: IndexMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent,
        }
    }
}

/// The document tree plus the mutation and query API used by the engine
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
}

/// A parsed path: node segments plus an optional attribute
#[derive(Debug, Clone, PartialEq)]
struct PathRef<'a> {
    segments: Vec<(&'a str, usize)>,
    attr: Option<&'a str>,
}

fn parse_path(path: &str) -> Option<PathRef<'_>> {
    let (node_part, attr) = match path.split_once(':') {
        Some((n, a)) => (n, Some(a)),
        None => (path, None),
    };
    let mut segments = Vec::new();
    for seg in node_part.split('.').filter(|s| !s.is_empty()) {
        match seg.split_once('[') {
            Some((tag, idx)) => {
                let idx = idx.strip_suffix(']')?.trim().parse::<usize>().ok()?;
                segments.push((tag, idx));
            }
            None => segments.push((seg, 0)),
        }
    }
    Some(PathRef { segments, attr })
}

/// Values that can be read out of an attribute string
pub trait ConfigValue: Sized {
    fn parse_value(raw: &str) -> Option<Self>;
}

impl ConfigValue for String {
    fn parse_value(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl ConfigValue for bool {
    fn parse_value(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        }
    }
}

macro_rules! numeric_config_value {
    ($($ty:ty),*) => {
        $(
            impl ConfigValue for $ty {
                fn parse_value(raw: &str) -> Option<Self> {
                    raw.trim().parse::<$ty>().ok()
                }
            }
        )*
    };
}

numeric_config_value!(f32, f64, i32, i64, u32, usize);

impl Config {
    /// Create an empty document whose root carries `tag`
    pub fn new(tag: &str) -> Self {
        Self {
            nodes: vec![Node::new(tag, None)],
            root: 0,
        }
    }

    /// Tag of the document root
    pub fn root_tag(&self) -> &str {
        &self.nodes[self.root].tag
    }

    pub(crate) fn add_node(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(tag, Some(parent)));
        self.nodes[parent].children.push(id);
        id
    }

    fn find_node(&self, segments: &[(&str, usize)]) -> Option<NodeId> {
        let mut current = self.root;
        for (tag, idx) in segments {
            current = self.nodes[current]
                .children
                .iter()
                .copied()
                .filter(|c| self.nodes[*c].tag == *tag)
                .nth(*idx)?;
        }
        Some(current)
    }

    pub(crate) fn node_id(&self, path: &str) -> Option<NodeId> {
        let p = parse_path(path)?;
        self.find_node(&p.segments)
    }

    /// Whether a node (or an attribute on it) exists at `path`
    pub fn exists(&self, path: &str) -> bool {
        let Some(p) = parse_path(path) else {
            return false;
        };
        match (self.find_node(&p.segments), p.attr) {
            (Some(id), Some(attr)) => self.nodes[id].attrs.contains_key(attr),
            (Some(_), None) => !p.segments.is_empty(),
            (None, _) => false,
        }
    }

    /// Uninterpolated value: an attribute, or the text of a node
    pub fn raw(&self, path: &str) -> Option<&str> {
        let p = parse_path(path)?;
        let id = self.find_node(&p.segments)?;
        match p.attr {
            Some(attr) => self.nodes[id].attrs.get(attr).map(String::as_str),
            None if p.segments.is_empty() => None,
            None => Some(self.nodes[id].text.trim()),
        }
    }

    /// Set an attribute or node text, creating missing nodes on the way
    pub fn set(&mut self, path: &str, value: impl Into<String>) {
        let Some(p) = parse_path(path) else {
            tracing::warn!(path = %path, "cannot set malformed config path");
            return;
        };
        let mut current = self.root;
        for (tag, idx) in &p.segments {
            let existing: Vec<NodeId> = self.nodes[current]
                .children
                .iter()
                .copied()
                .filter(|c| self.nodes[*c].tag == *tag)
                .collect();
            current = match existing.get(*idx) {
                Some(id) => *id,
                None => {
                    let mut id = self.add_node(current, tag);
                    for _ in existing.len()..*idx {
                        id = self.add_node(current, tag);
                    }
                    id
                }
            };
        }
        let value = value.into();
        match p.attr {
            Some(attr) => {
                self.nodes[current].attrs.insert(attr.to_string(), value);
            }
            None => self.nodes[current].text = value,
        }
    }

    /// Remove an attribute. Returns whether it existed.
    pub fn delete_attribute(&mut self, path: &str) -> bool {
        let Some(p) = parse_path(path) else {
            return false;
        };
        let (Some(id), Some(attr)) = (self.find_node(&p.segments), p.attr) else {
            return false;
        };
        self.nodes[id].attrs.shift_remove(attr).is_some()
    }

    /// Detach a node (and its subtree) from the document
    pub fn delete_node(&mut self, path: &str) -> bool {
        let Some(id) = self.node_id(path) else {
            return false;
        };
        let Some(parent) = self.nodes[id].parent else {
            return false;
        };
        self.nodes[parent].children.retain(|c| *c != id);
        self.nodes[id].parent = None;
        true
    }

    /// Tag of the node at `path`
    pub fn tag_name(&self, path: &str) -> Option<&str> {
        self.node_id(path).map(|id| self.nodes[id].tag.as_str())
    }

    /// Attribute names of the node at `path`, in document order
    pub fn attribute_names(&self, path: &str) -> Vec<String> {
        self.node_id(path)
            .map(|id| self.nodes[id].attrs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Ordered child paths, optionally restricted to one tag
    ///
    /// `depth` 1 lists immediate children; larger depths include
    /// descendants in document (pre-)order.
    pub fn children_of(&self, path: &str, tag: Option<&str>, depth: usize) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(id) = self.node_id(path) {
            self.collect_children(id, path, tag, depth, &mut out);
        }
        out
    }

    fn collect_children(
        &self,
        id: NodeId,
        path: &str,
        tag: Option<&str>,
        depth: usize,
        out: &mut Vec<String>,
    ) {
        if depth == 0 {
            return;
        }
        let mut seen: IndexMap<&str, usize> = IndexMap::new();
        for child in &self.nodes[id].children {
            let child_tag = self.nodes[*child].tag.as_str();
            let idx = seen.entry(child_tag).or_insert(0);
            let child_path = if path.is_empty() {
                format!("{}[{}]", child_tag, idx)
            } else {
                format!("{}.{}[{}]", path, child_tag, idx)
            };
            *idx += 1;
            if tag.map_or(true, |t| t == child_tag) {
                out.push(child_path.clone());
            }
            self.collect_children(*child, &child_path, tag, depth - 1, out);
        }
    }

    /// First path of the two spellings that exists
    pub fn one_of(&self, a: &str, b: &str) -> Option<String> {
        self.first_existing(&[a, b])
    }

    /// First of several candidate paths that exists
    pub fn first_existing(&self, candidates: &[&str]) -> Option<String> {
        candidates
            .iter()
            .find(|c| self.exists(c))
            .map(|c| c.to_string())
    }

    /// Find `relative` on the node at `scope` or the nearest enclosing node
    ///
    /// `resolve_scoped("Plot[0]", "Margins")` checks `Plot[0].Margins`, then
    /// the same relative path on every ancestor up to the root `Margins`.
    pub fn resolve_scoped(&self, scope: &str, relative: &str) -> Option<String> {
        let mut current = scope.to_string();
        loop {
            let candidate = join_path(&current, relative);
            if self.exists(&candidate) {
                return Some(candidate);
            }
            if current.is_empty() {
                return None;
            }
            current = parent_path(&current).to_string();
        }
    }

    /// Graft the root children of `other` below the node at `path`
    pub fn include(&mut self, path: &str, other: &Config) {
        let Some(target) = self.node_id(path) else {
            tracing::warn!(path = %path, "include target does not exist");
            return;
        };
        for child in other.nodes[other.root].children.clone() {
            self.copy_subtree(other, child, target);
        }
    }

    fn copy_subtree(&mut self, other: &Config, src: NodeId, parent: NodeId) {
        let id = self.add_node(parent, &other.nodes[src].tag);
        self.nodes[id].attrs = other.nodes[src].attrs.clone();
        self.nodes[id].text = other.nodes[src].text.clone();
        for child in &other.nodes[src].children {
            self.copy_subtree(other, *child, id);
        }
    }

    /// Borrow the store together with a variable scope for typed reads
    pub fn view<'a>(&'a self, env: &'a Env<'a>) -> View<'a> {
        View { config: self, env }
    }
}

/// Join a node path and a relative node/attribute path
pub fn join_path(base: &str, relative: &str) -> String {
    if base.is_empty() {
        relative.to_string()
    } else if relative.starts_with(':') {
        format!("{}{}", base, relative)
    } else {
        format!("{}.{}", base, relative)
    }
}

/// Node path of the parent of `path` (attribute part stripped)
pub fn parent_path(path: &str) -> &str {
    let node = path.split_once(':').map_or(path, |(n, _)| n);
    match node.rfind('.') {
        Some(pos) => &node[..pos],
        None => "",
    }
}

/// Read-only, interpolating accessor over a [`Config`] and an [`Env`]
#[derive(Clone, Copy)]
pub struct View<'a> {
    pub config: &'a Config,
    pub env: &'a Env<'a>,
}

impl<'a> View<'a> {
    pub fn exists(&self, path: &str) -> bool {
        self.config.exists(path)
    }

    /// Interpolated string value
    pub fn string(&self, path: &str) -> Option<String> {
        self.config
            .raw(path)
            .map(|raw| self.env.interpolate(raw, self.config))
    }

    pub fn string_or(&self, path: &str, default: &str) -> String {
        self.string(path).unwrap_or_else(|| default.to_string())
    }

    /// Typed value; `None` when missing or unparsable
    pub fn get<T: ConfigValue>(&self, path: &str) -> Option<T> {
        self.string(path).and_then(|s| T::parse_value(&s))
    }

    pub fn get_or<T: ConfigValue>(&self, path: &str, default: T) -> T {
        self.get(path).unwrap_or(default)
    }

    /// Comma-separated list; unparsable items are skipped
    pub fn vec<T: ConfigValue>(&self, path: &str) -> Vec<T> {
        match self.string(path) {
            Some(s) if !s.trim().is_empty() => s
                .split(',')
                .filter_map(|item| T::parse_value(item.trim()))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn one_of(&self, a: &str, b: &str) -> Option<String> {
        self.config.one_of(a, b)
    }

    /// Local attribute, then the `.style` child, then the `:style` reference
    pub fn styled(&self, node: &str, attr: &str) -> Option<String> {
        let local = format!("{}:{}", node, attr);
        if self.exists(&local) {
            return self.string(&local);
        }
        let style_child = join_path(node, &format!("style:{}", attr));
        if self.exists(&style_child) {
            return self.string(&style_child);
        }
        let style_ref = self.string(&format!("{}:style", node))?;
        let referenced = format!("{}:{}", style_ref, attr);
        if self.config.node_id(&style_ref).is_some() && self.exists(&referenced) {
            return self.string(&referenced);
        }
        None
    }

    /// Resolve a leaf attribute with local → style → enclosing precedence
    ///
    /// Order: `<node>:<attr>`, `<node>.style:<attr>`, the node referenced by
    /// `<node>:style`, then `<ancestor>:<attr>` walking up to the root.
    pub fn lookup(&self, node: &str, attr: &str) -> Option<String> {
        if let Some(value) = self.styled(node, attr) {
            return Some(value);
        }
        let mut current = parent_path(node).to_string();
        loop {
            let candidate = format!("{}:{}", current, attr);
            if !current.is_empty() && self.exists(&candidate) {
                return self.string(&candidate);
            }
            if current.is_empty() {
                return None;
            }
            current = parent_path(&current).to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        <config>
            <Margins>0.1, 0.2, 0.3, 0.4</Margins>
            <Plot name="first" size="3">
                <Histo name="h1" color="red"/>
                <Histo name="h2"/>
                <Margins top="0.05"/>
            </Plot>
            <Plot name="second"/>
        </config>
    "#;

    fn config() -> Config {
        Config::from_xml_str(DOC).unwrap()
    }

    #[test]
    fn test_parse_path() {
        let p = parse_path("Plot[1].Histo:name").unwrap();
        assert_eq!(p.segments, vec![("Plot", 1), ("Histo", 0)]);
        assert_eq!(p.attr, Some("name"));
        assert!(parse_path("Plot[x]").is_none());
    }

    #[test]
    fn test_exists_and_raw() {
        let c = config();
        assert!(c.exists("Plot"));
        assert!(c.exists("Plot[1]:name"));
        assert!(!c.exists("Plot[2]"));
        assert_eq!(c.raw("Plot[1]:name"), Some("second"));
        assert_eq!(c.raw("Plot.Histo[1]:name"), Some("h2"));
        assert_eq!(c.raw("Margins"), Some("0.1, 0.2, 0.3, 0.4"));
    }

    #[test]
    fn test_children_of() {
        let c = config();
        assert_eq!(c.children_of("", Some("Plot"), 1), vec!["Plot[0]", "Plot[1]"]);
        assert_eq!(
            c.children_of("Plot[0]", None, 1),
            vec!["Plot[0].Histo[0]", "Plot[0].Histo[1]", "Plot[0].Margins[0]"]
        );
        assert_eq!(c.children_of("", Some("Histo"), 2).len(), 2);
    }

    #[test]
    fn test_tag_name() {
        let c = config();
        assert_eq!(c.tag_name("Plot[0].Histo[1]"), Some("Histo"));
        assert_eq!(c.tag_name("Nope"), None);
    }

    #[test]
    fn test_set_creates_nodes() {
        let mut c = config();
        c.set("Extra.Deep:value", "7");
        assert_eq!(c.raw("Extra.Deep:value"), Some("7"));
        c.set("Plot[0]:name", "renamed");
        assert_eq!(c.raw("Plot:name"), Some("renamed"));
    }

    #[test]
    fn test_delete_attribute_and_node() {
        let mut c = config();
        assert!(c.delete_attribute("Plot[0]:size"));
        assert!(!c.exists("Plot[0]:size"));
        assert!(c.delete_node("Plot[0]"));
        assert_eq!(c.raw("Plot:name"), Some("second"));
        assert!(!c.delete_node(""));
    }

    #[test]
    fn test_one_of() {
        let c = config();
        assert_eq!(
            c.one_of("Plot[0]:missing", "Plot[0]:size"),
            Some("Plot[0]:size".to_string())
        );
        assert_eq!(c.one_of("Plot[0]:a", "Plot[0]:b"), None);
    }

    #[test]
    fn test_resolve_scoped_prefers_nearest() {
        let c = config();
        assert_eq!(
            c.resolve_scoped("Plot[0]", "Margins"),
            Some("Plot[0].Margins".to_string())
        );
        assert_eq!(c.resolve_scoped("Plot[1]", "Margins"), Some("Margins".to_string()));
    }

    #[test]
    fn test_typed_view() {
        let c = config();
        let env = Env::new();
        let v = c.view(&env);
        assert_eq!(v.get::<i32>("Plot:size"), Some(3));
        assert_eq!(v.get_or::<f64>("Plot:missing", 1.5), 1.5);
        assert_eq!(v.vec::<f64>("Margins"), vec![0.1, 0.2, 0.3, 0.4]);
        assert!(v.vec::<f64>("Plot:missing").is_empty());
    }

    #[test]
    fn test_view_interpolates_at_read_time() {
        let mut c = config();
        c.set("Plot[1]:title", "plot of {v}");
        let mut env = Env::new();
        env.set("v", "a");
        assert_eq!(c.view(&env).string("Plot[1]:title").unwrap(), "plot of a");
        env.set("v", "b");
        assert_eq!(c.view(&env).string("Plot[1]:title").unwrap(), "plot of b");
    }

    #[test]
    fn test_lookup_precedence() {
        let c = Config::from_xml_str(
            r#"<config>
                <Styles><Blue color="blue" width="4"/></Styles>
                <Plot color="green" fill="gray">
                    <Histo name="a" color="red"/>
                    <Histo name="b" style="Styles.Blue"/>
                    <Histo name="c"><style width="2"/></Histo>
                </Plot>
            </config>"#,
        )
        .unwrap();
        let env = Env::new();
        let v = c.view(&env);
        assert_eq!(v.lookup("Plot.Histo[0]", "color").as_deref(), Some("red"));
        assert_eq!(v.lookup("Plot.Histo[1]", "color").as_deref(), Some("blue"));
        assert_eq!(v.lookup("Plot.Histo[2]", "width").as_deref(), Some("2"));
        assert_eq!(v.lookup("Plot.Histo[2]", "fill").as_deref(), Some("gray"));
        assert_eq!(v.lookup("Plot.Histo[2]", "nothing"), None);
    }

    #[test]
    fn test_include() {
        let mut c = config();
        let other = Config::from_xml_str(r#"<config><HistogramData name="x"/></config>"#).unwrap();
        c.include("Plot[1]", &other);
        assert_eq!(c.raw("Plot[1].HistogramData:name"), Some("x"));
    }
}

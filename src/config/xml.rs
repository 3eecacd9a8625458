//! Reading and writing the configuration document as XML

use std::fmt::Write as _;
use std::path::Path;

use super::env::Env;
use super::store::{Config, Node, NodeId};
use super::ConfigError;

impl Config {
    /// Parse a document from XML text. The root element becomes the empty path.
    pub fn from_xml_str(text: &str) -> Result<Self, ConfigError> {
        let doc = roxmltree::Document::parse(text)?;
        let root = doc.root_element();
        let mut config = Config::new(root.tag_name().name());
        let root_id = config.root;
        fill_node(&mut config, root_id, root);
        Ok(config)
    }

    /// Read and parse a document from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_xml_str(&text)
    }

    /// Serialize the current tree
    ///
    /// With an environment, every attribute value and text node is
    /// interpolated first so the output records what the run actually used.
    pub fn to_xml(&self, env: Option<&Env<'_>>) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.write_node(self.root, 0, env, &mut out);
        out
    }

    /// Write [`Config::to_xml`] to a file
    pub fn write_xml(&self, path: impl AsRef<Path>, env: Option<&Env<'_>>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_xml(env)).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Flat `path = value` listing of every attribute and non-empty text
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for id in &self.nodes[self.root].children {
            self.dump_node(*id, "", &mut out);
        }
        out
    }

    fn dump_node(&self, id: NodeId, prefix: &str, out: &mut String) {
        let node = &self.nodes[id];
        let index = self.sibling_index(id);
        let path = if prefix.is_empty() {
            format!("{}[{}]", node.tag, index)
        } else {
            format!("{}.{}[{}]", prefix, node.tag, index)
        };
        let text = node.text.trim();
        if !text.is_empty() {
            let _ = writeln!(out, "{} = {}", path, text);
        }
        for (k, v) in &node.attrs {
            let _ = writeln!(out, "{}:{} = {}", path, k, v);
        }
        for child in &node.children {
            self.dump_node(*child, &path, out);
        }
    }

    fn sibling_index(&self, id: NodeId) -> usize {
        let node = &self.nodes[id];
        match node.parent {
            Some(parent) => self.nodes[parent]
                .children
                .iter()
                .take_while(|c| **c != id)
                .filter(|c| self.nodes[**c].tag == node.tag)
                .count(),
            None => 0,
        }
    }

    fn write_node(&self, id: NodeId, depth: usize, env: Option<&Env<'_>>, out: &mut String) {
        let node: &Node = &self.nodes[id];
        let indent = "  ".repeat(depth);
        let resolve = |s: &str| match env {
            Some(env) => env.interpolate(s, self),
            None => s.to_string(),
        };

        let _ = write!(out, "{}<{}", indent, node.tag);
        for (k, v) in &node.attrs {
            let _ = write!(out, " {}=\"{}\"", k, escape_xml(&resolve(v)));
        }

        let text = node.text.trim();
        if node.children.is_empty() && text.is_empty() {
            out.push_str("/>\n");
            return;
        }
        out.push('>');
        if node.children.is_empty() {
            let _ = writeln!(out, "{}</{}>", escape_xml(&resolve(text)), node.tag);
            return;
        }
        out.push('\n');
        if !text.is_empty() {
            let _ = writeln!(out, "{}  {}", indent, escape_xml(&resolve(text)));
        }
        for child in &node.children {
            self.write_node(*child, depth + 1, env, out);
        }
        let _ = writeln!(out, "{}</{}>", indent, node.tag);
    }
}

fn fill_node(config: &mut Config, id: NodeId, element: roxmltree::Node<'_, '_>) {
    for attr in element.attributes() {
        config.nodes[id]
            .attrs
            .insert(attr.name().to_string(), attr.value().to_string());
    }
    let mut text = String::new();
    for child in element.children() {
        if child.is_element() {
            let child_id = config.add_node(id, child.tag_name().name());
            fill_node(config, child_id, child);
        } else if child.is_text() {
            text.push_str(child.text().unwrap_or_default());
        }
    }
    config.nodes[id].text = text.trim().to_string();
}

/// Escape special XML characters
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

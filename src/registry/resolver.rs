//! Resolving configuration references to objects
//!
//! A node names its input with `name` (optionally `source/name`) and `data`.
//! Binary transforms use a variant suffix: `nameA`/`dataA`, `nameB`/`dataB`.

use std::path::Path;

use crate::config::View;
use crate::names::{data_only, name_only};
use crate::objects::{share, Bins, ObjectRef, PlotObject};

use super::{ObjectKey, Registry};

impl Registry {
    /// `(source, name)` named by the node at `path`
    pub fn address(view: &View<'_>, path: &str, variant: &str) -> Option<(String, String)> {
        let name = view.string(&format!("{}:name{}", path, variant))?;
        let data = view
            .string(&format!("{}:data{}", path, variant))
            .or_else(|| view.string(&format!("{}:data", path)))
            .unwrap_or_default();
        if data.is_empty() && name.contains('/') {
            return Some((data_only(&name).to_string(), name_only(&name).to_string()));
        }
        Some((data, name))
    }

    /// Find the histogram referenced by the node at `path`
    pub fn find_histogram(&mut self, view: &View<'_>, path: &str, variant: &str) -> Option<ObjectRef> {
        let (source, name) = Self::address(view, path, variant)?;
        self.resolve_histogram(view, path, &source, &name)
    }

    /// Resolve a histogram by source and name
    ///
    /// Registered objects win over data files. A histogram read from a data
    /// file is a fresh copy named `hist_<name>`, so transforms never alter
    /// the container. Tabular sources are drawn on demand using the draw
    /// attributes of the node at `path`.
    pub fn resolve_histogram(
        &mut self,
        view: &View<'_>,
        path: &str,
        source: &str,
        name: &str,
    ) -> Option<ObjectRef> {
        if let Some(found) = self.get(name).filter(|o| o.borrow().is_histogram()) {
            tracing::debug!(name, "found histogram in registry");
            return Some(found);
        }

        let source = self.default_source(source);
        if let Some(file) = self.files.get(&source) {
            if let Some(h) = file.get(name).and_then(PlotObject::as_histogram) {
                tracing::debug!(name, source = %source, "read histogram from data file");
                let copy = h.clone_named(format!("hist_{}", h.name));
                return Some(share(PlotObject::Histogram(copy)));
            }
        }

        if self.tables.contains_key(&source) {
            return self.draw_from_table(view, path, &source, name);
        }

        self.get_key(&ObjectKey::new(source.as_str(), name))
            .filter(|o| o.borrow().is_histogram())
    }

    /// Find any object referenced by the node at `path`
    pub fn find_object(&self, view: &View<'_>, path: &str) -> Option<ObjectRef> {
        let (source, name) = Self::address(view, path, "")?;
        if let Some(found) = self.get(&name) {
            return Some(found);
        }
        let source = self.default_source(&source);
        if let Some(object) = self.files.get(&source).and_then(|f| f.get(&name)) {
            return Some(share(object.clone()));
        }
        let found = self.get_key(&ObjectKey::new(source.as_str(), name.as_str()));
        if found.is_none() {
            tracing::warn!(source = %source, name = %name, "object was not found in any source");
        }
        found
    }

    /// Draw the node at `path` from its tabular source
    ///
    /// Always fills a new histogram, replacing whatever is registered under
    /// the same name. With no source given and a single tabular source
    /// loaded, that source is used.
    pub fn draw_histogram(&mut self, view: &View<'_>, path: &str) -> Option<ObjectRef> {
        let (source, name) = Self::address(view, path, "")?;
        let source = match self.tables.keys().next() {
            Some(only) if source.is_empty() && self.tables.len() == 1 => only.clone(),
            _ => source,
        };
        if !self.tables.contains_key(&source) {
            tracing::error!(source = %source, name = %name, "no tabular source to draw from");
            return None;
        }
        self.draw_from_table(view, path, &source, &name)
    }

    /// With no source given and a single data file loaded, use that file
    fn default_source(&self, source: &str) -> String {
        if source.is_empty() && self.files.len() == 1 {
            if let Some(only) = self.files.keys().next() {
                return only.clone();
            }
        }
        source.to_string()
    }

    fn draw_from_table(
        &mut self,
        view: &View<'_>,
        path: &str,
        source: &str,
        name: &str,
    ) -> Option<ObjectRef> {
        let table = self.tables.get(source)?;
        let attr = |a: &str| format!("{}:{}", path, a);
        let draw = view.string_or(&attr("draw"), "");
        let select = view.string_or(&attr("select"), "");
        let bins: Vec<Bins> = ["bins_x", "bins_y", "bins_z"]
            .iter()
            .map_while(|a| view.string(&attr(a)))
            .map(|spec| Bins::from_value(view, path, &spec))
            .collect();
        let max_rows = view.get::<usize>(&attr("N"));

        tracing::info!(source, name, draw = %draw, select = %select, "drawing from tabular source");
        let title = view.string(&attr("title"));
        match table.draw(name, &draw, &select, title.as_deref(), bins, max_rows) {
            Ok(h) => {
                let object = share(PlotObject::Histogram(h));
                self.insert(ObjectKey::bare(name), std::rc::Rc::clone(&object));
                Some(object)
            }
            Err(e) => {
                tracing::error!(source, name, error = %e, "draw failed");
                None
            }
        }
    }

    /// Open the source described by a `Data` node and register it
    ///
    /// Relative urls are taken from `base`.
    pub fn load_data_node(&mut self, view: &View<'_>, path: &str, base: &Path) -> Result<(), crate::data::DataError> {
        use crate::data::{DataFile, TabularSource, DEFAULT_SPLIT_BY};

        let attr = |a: &str| format!("{}:{}", path, a);
        let name = view.string_or(&attr("name"), "");
        let url = view.string(&attr("url")).map(|u| base.join(u));

        if let Some(tree) = view.string(&attr("treeName")) {
            let Some(url) = url else {
                tracing::error!(path, "tabular Data node without url");
                return Ok(());
            };
            let table = TabularSource::open(
                name,
                tree,
                &url,
                view.get::<i64>(&attr("index")).and_then(|i| usize::try_from(i).ok()),
                view.get_or(&attr("splitBy"), DEFAULT_SPLIT_BY),
                view.get::<i64>(&attr("maxFiles")).and_then(|i| usize::try_from(i).ok()),
            )?;
            self.add_table(table);
            return Ok(());
        }

        let file = match url {
            Some(url) => {
                let file = DataFile::open(name, &url)?;
                tracing::info!(name = %file.name, url = %url.display(), objects = file.len(), "opened data file");
                file
            }
            None => {
                let file = DataFile::from_config(name, view, path)?;
                let tmp = base.join(format!("tmp_{}.json", file.name));
                if let Err(e) = file.write(&tmp) {
                    tracing::warn!(path = %tmp.display(), error = %e, "cannot write inline data");
                }
                tracing::info!(name = %file.name, objects = file.len(), "built data from inline nodes");
                file
            }
        };
        self.add_file(file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Env};
    use crate::data::{DataFile, TabularSource};
    use crate::objects::Histogram;
    use std::collections::HashMap;
    use std::rc::Rc;

    fn file_with(name: &str, histo: &str, content: f64) -> DataFile {
        let mut file = DataFile::new(name);
        let mut h = Histogram::new_1d(histo, "", Bins::linspace(1, 0.0, 1.0)).unwrap();
        h.set_bin_content(1, content);
        file.insert(PlotObject::Histogram(h));
        file
    }

    #[test]
    fn test_registry_wins_over_file() {
        let config = Config::from_xml_str(r#"<config><Histo name="h"/></config>"#).unwrap();
        let env = Env::new();
        let view = config.view(&env);
        let mut reg = Registry::new();
        reg.add_file(file_with("d", "h", 1.0));
        let from_file = reg.find_histogram(&view, "Histo", "").unwrap();
        assert_eq!(from_file.borrow().name(), "hist_h");

        let registered = share(PlotObject::Histogram(
            Histogram::new_1d("h", "", Bins::linspace(1, 0.0, 1.0)).unwrap(),
        ));
        reg.insert(ObjectKey::bare("h"), Rc::clone(&registered));
        let found = reg.find_histogram(&view, "Histo", "").unwrap();
        assert!(Rc::ptr_eq(&found, &registered));
    }

    #[test]
    fn test_file_read_is_a_copy() {
        let config = Config::from_xml_str(r#"<config><Histo name="d/h"/></config>"#).unwrap();
        let env = Env::new();
        let view = config.view(&env);
        let mut reg = Registry::new();
        reg.add_file(file_with("d", "h", 3.0));
        let first = reg.find_histogram(&view, "Histo", "").unwrap();
        first.borrow_mut().as_histogram_mut().unwrap().scale(2.0, false);
        let second = reg.find_histogram(&view, "Histo", "").unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(second.borrow().as_histogram().unwrap().bin_content(1), 3.0);
    }

    #[test]
    fn test_variant_and_default_source() {
        let config = Config::from_xml_str(
            r#"<config><Add nameA="h" nameB="g" dataB="e"/></config>"#,
        )
        .unwrap();
        let env = Env::new();
        let view = config.view(&env);
        let mut reg = Registry::new();
        reg.add_file(file_with("d", "h", 1.0));
        assert!(reg.find_histogram(&view, "Add", "A").is_some());
        // dataB names a source that does not exist
        assert!(reg.find_histogram(&view, "Add", "B").is_none());
    }

    #[test]
    fn test_no_default_with_two_files() {
        let config = Config::from_xml_str(r#"<config><Histo name="h"/></config>"#).unwrap();
        let env = Env::new();
        let view = config.view(&env);
        let mut reg = Registry::new();
        reg.add_file(file_with("a", "h", 1.0));
        reg.add_file(file_with("b", "h", 2.0));
        assert!(reg.find_histogram(&view, "Histo", "").is_none());
    }

    #[test]
    fn test_draw_from_table_registers_bare_name() {
        let config = Config::from_xml_str(
            r#"<config><Histo data="t" name="hpt" draw="pt" bins_x="0,5,10"/></config>"#,
        )
        .unwrap();
        let env = Env::new();
        let view = config.view(&env);
        let mut reg = Registry::new();
        let rows = (0..10)
            .map(|i| HashMap::from([("pt".to_string(), i as f64)]))
            .collect();
        reg.add_table(TabularSource::from_rows("t", "tree", rows));
        let h = reg.find_histogram(&view, "Histo", "").unwrap();
        assert_eq!(h.borrow().as_histogram().unwrap().bin_content(1), 5.0);
        assert!(Rc::ptr_eq(&reg.get("hpt").unwrap(), &h));
    }

    #[test]
    fn test_draw_histogram_replaces_registered() {
        let config = Config::from_xml_str(
            r#"<config><Draw name="hpt" draw="pt" select="pt > 4" bins_x="0,5,10"/></config>"#,
        )
        .unwrap();
        let env = Env::new();
        let view = config.view(&env);
        let mut reg = Registry::new();
        let rows = (0..10)
            .map(|i| HashMap::from([("pt".to_string(), i as f64)]))
            .collect();
        reg.add_table(TabularSource::from_rows("t", "tree", rows));
        let stale = share(PlotObject::Histogram(
            Histogram::new_1d("hpt", "", Bins::linspace(1, 0.0, 1.0)).unwrap(),
        ));
        reg.insert(ObjectKey::bare("hpt"), Rc::clone(&stale));

        let drawn = reg.draw_histogram(&view, "Draw").unwrap();
        assert!(!Rc::ptr_eq(&drawn, &stale));
        assert!(Rc::ptr_eq(&reg.get("hpt").unwrap(), &drawn));
        let drawn = drawn.borrow();
        let h = drawn.as_histogram().unwrap();
        assert_eq!(h.bin_content(1), 0.0);
        assert_eq!(h.bin_content(2), 5.0);
    }

    #[test]
    fn test_find_object_graph() {
        let config = Config::from_xml_str(r#"<config><Graph name="g"/></config>"#).unwrap();
        let env = Env::new();
        let view = config.view(&env);
        let mut reg = Registry::new();
        let mut file = DataFile::new("d");
        file.insert(PlotObject::Graph(crate::objects::Graph::from_arrays("g", &[1.0], &[2.0], &[], &[])));
        reg.add_file(file);
        let g = reg.find_object(&view, "Graph").unwrap();
        assert_eq!(g.borrow().name(), "g");
        assert!(reg.find_histogram(&view, "Graph", "").is_none());
    }
}

//! Named object containers: JSON files and inline `HistogramData` nodes

use std::path::Path;

use indexmap::IndexMap;

use crate::config::{Config, View};
use crate::objects::{Bins, PlotObject};

use super::record::{ContainerFile, ObjectRecord};
use super::DataError;

/// An opened container. Objects keep their file order.
#[derive(Debug, Clone, Default)]
pub struct DataFile {
    pub name: String,
    objects: IndexMap<String, PlotObject>,
}

impl DataFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: IndexMap::new(),
        }
    }

    /// Read a JSON container from disk
    pub fn open(name: impl Into<String>, path: &Path) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let parsed: ContainerFile =
            serde_json::from_str(&text).map_err(|source| DataError::Json {
                path: path.display().to_string(),
                source,
            })?;
        let mut file = Self::new(name);
        for record in parsed.objects {
            let object = record.into_object()?;
            file.insert(object);
        }
        Ok(file)
    }

    /// Build a container from the `HistogramData` children of a `Data` node
    ///
    /// Each child carries `name`, `title`, `type` (default `TH1D`), bin
    /// specifications `bins_x`/`bins_y`/`bins_z`, and comma-separated
    /// `content`, `errors` and `labels`. Graph and function entries use
    /// `x`/`y`/`ex`/`ey` and `formula`/`params`/`min`/`max`.
    pub fn from_config(name: impl Into<String>, view: &View<'_>, node: &str) -> Result<Self, DataError> {
        let mut file = Self::new(name);
        for child in view.config.children_of(node, Some("HistogramData"), 1) {
            let attr = |a: &str| format!("{}:{}", child, a);
            let Some(object_name) = view.string(&attr("name")) else {
                tracing::warn!(path = %child, "HistogramData without a name, skipping");
                continue;
            };
            let bins = |a: &str| {
                view.string(&attr(a))
                    .map(|v| Bins::from_value(view, &child, &v).edges)
                    .unwrap_or_default()
            };
            let record = ObjectRecord {
                kind: view.string_or(&attr("type"), "TH1D"),
                name: object_name,
                title: view.string_or(&attr("title"), ""),
                bins_x: bins("bins_x"),
                bins_y: bins("bins_y"),
                bins_z: bins("bins_z"),
                content: view.vec(&attr("content")),
                errors: view.vec(&attr("errors")),
                labels: view.vec(&attr("labels")),
                entries: view.get(&attr("entries")),
                x: view.vec(&attr("x")),
                y: view.vec(&attr("y")),
                ex: view.vec(&attr("ex")),
                ey: view.vec(&attr("ey")),
                formula: view.string(&attr("formula")),
                params: view.vec(&attr("params")),
                min: view.get(&attr("min")),
                max: view.get(&attr("max")),
            };
            file.insert(record.into_object()?);
        }
        Ok(file)
    }

    pub fn insert(&mut self, object: PlotObject) {
        self.objects.insert(object.name().to_string(), object);
    }

    pub fn get(&self, name: &str) -> Option<&PlotObject> {
        self.objects.get(name)
    }

    /// Object names in file order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn objects(&self) -> impl Iterator<Item = &PlotObject> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn to_json(&self) -> Result<String, DataError> {
        let file = ContainerFile {
            objects: self.objects.values().map(ObjectRecord::from_object).collect(),
        };
        serde_json::to_string_pretty(&file).map_err(|source| DataError::Json {
            path: self.name.clone(),
            source,
        })
    }

    /// Write the container, replacing any existing file
    pub fn write(&self, path: &Path) -> Result<(), DataError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Describe every object as a `HistogramData` child of `node`
    pub fn inline_into(&self, config: &mut Config, node: &str) {
        let join = |v: &[f64]| {
            v.iter()
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        let existing = config.children_of(node, Some("HistogramData"), 1).len();
        for (i, object) in self.objects.values().enumerate() {
            let record = ObjectRecord::from_object(object);
            let path = format!("{}.HistogramData[{}]", node, existing + i);
            config.set(&format!("{}:name", path), record.name.as_str());
            config.set(&format!("{}:type", path), record.kind.as_str());
            let mut set = |key: &str, value: String| {
                if !value.is_empty() {
                    config.set(&format!("{}:{}", path, key), value);
                }
            };
            set("title", record.title.clone());
            set("bins_x", join(&record.bins_x));
            set("bins_y", join(&record.bins_y));
            set("bins_z", join(&record.bins_z));
            set("content", join(&record.content));
            set("errors", join(&record.errors));
            set("labels", record.labels.join(","));
            set("entries", record.entries.map(|e| e.to_string()).unwrap_or_default());
            set("x", join(&record.x));
            set("y", join(&record.y));
            set("ex", join(&record.ex));
            set("ey", join(&record.ey));
            set("formula", record.formula.clone().unwrap_or_default());
            set("params", join(&record.params));
            set("min", record.min.map(|v| v.to_string()).unwrap_or_default());
            set("max", record.max.map(|v| v.to_string()).unwrap_or_default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Env;

    #[test]
    fn test_from_config() {
        let config = Config::from_xml_str(
            r#"<config>
                <Data name="inline">
                    <HistogramData name="h1" title="first" bins_x="0,1,2" content="1,2"/>
                    <HistogramData name="h2" type="TH2D" bins_x="0,1" bins_y="0,1,2" content="5,6"/>
                    <HistogramData name="g" type="TGraph" x="1,2" y="3,4"/>
                    <HistogramData title="no name"/>
                </Data>
            </config>"#,
        )
        .unwrap();
        let env = Env::new();
        let file = DataFile::from_config("inline", &config.view(&env), "Data").unwrap();
        assert_eq!(file.names().collect::<Vec<_>>(), vec!["h1", "h2", "g"]);
        let h1 = file.get("h1").unwrap().as_histogram().unwrap();
        assert_eq!(h1.title, "first");
        assert_eq!(h1.integral(false), 3.0);
        assert_eq!(file.get("h2").unwrap().class_name(), "TH2D");
        assert_eq!(file.get("g").unwrap().as_graph().unwrap().len(), 2);
    }

    #[test]
    fn test_write_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let config = Config::from_xml_str(
            r#"<config><Data><HistogramData name="h" bins_x="0,1,2" content="1,2"/></Data></config>"#,
        )
        .unwrap();
        let env = Env::new();
        let file = DataFile::from_config("d", &config.view(&env), "Data").unwrap();
        file.write(&path).unwrap();
        let reopened = DataFile::open("d", &path).unwrap();
        assert_eq!(reopened.get("h"), file.get("h"));
    }

    #[test]
    fn test_open_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DataFile::open("d", &dir.path().join("nope.json")),
            Err(DataError::Io { .. })
        ));
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(DataFile::open("d", &bad), Err(DataError::Json { .. })));
    }

    #[test]
    fn test_inline_into_round_trip() {
        let mut config =
            Config::from_xml_str(r#"<config><Data name="d" url="x.json"/></config>"#).unwrap();
        let mut file = DataFile::new("d");
        let mut h = crate::objects::Histogram::new_1d("h", "", Bins::linspace(2, 0.0, 2.0)).unwrap();
        h.set_bin_content(2, 5.0);
        file.insert(PlotObject::Histogram(h));
        file.inline_into(&mut config, "Data");
        let env = Env::new();
        let rebuilt = DataFile::from_config("d", &config.view(&env), "Data").unwrap();
        let h = rebuilt.get("h").unwrap().as_histogram().unwrap();
        assert_eq!(h.bin_content(2), 5.0);
    }
}

//! Registry of loaded data sources and of objects produced during a run

mod resolver;

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::data::{DataFile, TabularSource};
use crate::names::{fully_qualified_name, GlobQuery};
use crate::objects::ObjectRef;

/// Address of a registered object. An empty source means a bare name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub source: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
        }
    }

    pub fn bare(name: impl Into<String>) -> Self {
        Self::new("", name)
    }

    pub fn fqn(&self) -> String {
        fully_qualified_name(&self.source, &self.name)
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    files: IndexMap<String, DataFile>,
    tables: IndexMap<String, TabularSource>,
    objects: BTreeMap<ObjectKey, ObjectRef>,
    /// Bare name to the most recent key registered under it
    bare: HashMap<String, ObjectKey>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, file: DataFile) {
        self.files.insert(file.name.clone(), file);
    }

    pub fn add_table(&mut self, table: TabularSource) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn file(&self, name: &str) -> Option<&DataFile> {
        self.files.get(name)
    }

    pub fn table(&self, name: &str) -> Option<&TabularSource> {
        self.tables.get(name)
    }

    /// Number of opened data sources of either kind
    pub fn source_count(&self) -> usize {
        self.files.len() + self.tables.len()
    }

    /// Register `object` under `key`, making it reachable by bare name as well
    pub fn insert(&mut self, key: ObjectKey, object: ObjectRef) {
        if let Some(previous) = self.objects.get(&key) {
            if !Rc::ptr_eq(previous, &object) {
                tracing::warn!(name = %key.fqn(), "overwriting registered object");
            }
        }
        if let Some(other) = self.bare.get(&key.name) {
            if other.source != key.source {
                tracing::debug!(
                    name = %key.name,
                    previous = %other.fqn(),
                    current = %key.fqn(),
                    "bare name now refers to a different source"
                );
            }
        }
        self.bare.insert(key.name.clone(), key.clone());
        self.objects.insert(key, object);
    }

    /// Look up by bare name
    pub fn get(&self, name: &str) -> Option<ObjectRef> {
        self.bare
            .get(name)
            .and_then(|key| self.objects.get(key))
            .cloned()
    }

    pub fn get_key(&self, key: &ObjectKey) -> Option<ObjectRef> {
        self.objects.get(key).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bare.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Every registered object once, in key order
    pub fn objects_for_output(&self) -> Vec<ObjectRef> {
        let mut out: Vec<ObjectRef> = Vec::new();
        for object in self.objects.values() {
            if !out.iter().any(|o| Rc::ptr_eq(o, object)) {
                out.push(Rc::clone(object));
            }
        }
        out
    }

    /// Names matching a single-wildcard query
    ///
    /// The contents of each data file come first in load order, then
    /// registered objects in key order. Names are reported fully qualified and each
    /// name appears once.
    pub fn glob(&self, query: &str) -> Vec<String> {
        let Some(q) = GlobQuery::parse(query) else {
            tracing::debug!(query, "query has no wildcard, nothing matched");
            return Vec::new();
        };
        let mut names: Vec<String> = Vec::new();
        let mut push = |name: String| {
            if !names.contains(&name) {
                names.push(name);
            }
        };
        for (source, file) in &self.files {
            for object in file.objects() {
                let fqn = fully_qualified_name(source, object.name());
                if q.matches(&fqn, object.class_name()) || q.matches(object.name(), object.class_name()) {
                    push(fqn);
                }
            }
        }
        for (key, object) in &self.objects {
            let class = object.borrow().class_name();
            let fqn = key.fqn();
            if q.matches(&fqn, class) || q.matches(&key.name, class) {
                push(fqn);
            }
        }
        names
    }
}

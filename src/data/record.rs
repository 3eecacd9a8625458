//! Serialized form of plot objects inside data containers

use serde::{Deserialize, Serialize};

use crate::objects::{Bins, Function, Graph, Histogram, PlotObject};

use super::DataError;

/// One object of a container file
///
/// Histogram contents are listed in global bin order (x fastest). Either
/// every bin including underflow and overflow is given, or only the
/// in-range bins.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bins_x: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bins_y: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bins_z: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub x: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub y: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ex: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ey: Vec<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Top level of a container file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerFile {
    #[serde(default)]
    pub objects: Vec<ObjectRecord>,
}

impl ObjectRecord {
    pub fn from_object(object: &PlotObject) -> Self {
        match object {
            PlotObject::Histogram(h) => {
                let edges = |i: usize| h.axis(i).map(|a| a.bins.edges.clone()).unwrap_or_default();
                let labels = h
                    .axis(0)
                    .filter(|a| a.has_labels())
                    .map(|a| {
                        (1..=a.nbins())
                            .map(|b| a.label(b).unwrap_or_default().to_string())
                            .collect()
                    })
                    .unwrap_or_default();
                Self {
                    kind: h.class_name().to_string(),
                    name: h.name.clone(),
                    title: h.title.clone(),
                    bins_x: edges(0),
                    bins_y: edges(1),
                    bins_z: edges(2),
                    content: h.contents().to_vec(),
                    errors: if h.has_sumw2() { h.errors() } else { Vec::new() },
                    labels,
                    entries: Some(h.entries()),
                    ..Self::default()
                }
            }
            PlotObject::Graph(g) => Self {
                kind: g.class_name().to_string(),
                name: g.name.clone(),
                title: g.title.clone(),
                x: g.points.iter().map(|p| p.x).collect(),
                y: g.points.iter().map(|p| p.y).collect(),
                ex: if g.has_errors() { g.points.iter().map(|p| p.ex).collect() } else { Vec::new() },
                ey: if g.has_errors() { g.points.iter().map(|p| p.ey).collect() } else { Vec::new() },
                ..Self::default()
            },
            PlotObject::Function(f) => Self {
                kind: f.class_name().to_string(),
                name: f.name.clone(),
                title: f.title.clone(),
                formula: Some(f.formula().to_string()),
                params: f.params.clone(),
                min: Some(f.min),
                max: Some(f.max),
                ..Self::default()
            },
        }
    }

    pub fn into_object(self) -> Result<PlotObject, DataError> {
        if self.kind.starts_with("TH") {
            return self.into_histogram().map(PlotObject::Histogram);
        }
        if self.kind.starts_with("TGraph") {
            let mut g = Graph::from_arrays(self.name, &self.x, &self.y, &self.ex, &self.ey);
            g.title = self.title;
            return Ok(PlotObject::Graph(g));
        }
        if self.kind == "TF1" {
            let formula = self.formula.unwrap_or_default();
            let mut f = Function::new(
                self.name.clone(),
                &formula,
                self.min.unwrap_or(0.0),
                self.max.unwrap_or(1.0),
            )
            .map_err(|errors| DataError::Expression {
                expr: formula.clone(),
                message: crate::error::format_errors(&errors, &formula, &self.name),
            })?;
            for (i, p) in self.params.iter().enumerate() {
                f.set_parameter(i, *p);
            }
            f.title = self.title;
            return Ok(PlotObject::Function(f));
        }
        Err(DataError::UnknownType {
            name: self.name,
            kind: self.kind,
        })
    }

    fn into_histogram(self) -> Result<Histogram, DataError> {
        let axes: Vec<Bins> = [self.bins_x, self.bins_y, self.bins_z]
            .into_iter()
            .filter(|e| !e.is_empty())
            .map(Bins::from_edges)
            .collect();
        let mut h = Histogram::new(self.name, self.title, axes)?;

        if !self.content.is_empty() {
            let full = expand_to_all_bins(&h, self.content)?;
            h.set_contents(full)?;
        }
        if !self.errors.is_empty() {
            let full = expand_to_all_bins(&h, self.errors)?;
            h.set_errors(&full)?;
        }
        if let Some(axis) = h.axis_mut(0) {
            for (i, label) in self.labels.into_iter().enumerate() {
                if !label.is_empty() {
                    axis.set_label(i + 1, label);
                }
            }
        }
        let entries = self
            .entries
            .unwrap_or_else(|| h.in_range_bins().map(|g| h.bin_content(g)).sum());
        h.set_entries(entries);
        Ok(h)
    }
}

/// Accept either every bin or only in-range bins and return every bin
fn expand_to_all_bins(h: &Histogram, values: Vec<f64>) -> Result<Vec<f64>, DataError> {
    if values.len() == h.len() {
        return Ok(values);
    }
    let in_range: Vec<usize> = h.in_range_bins().collect();
    if values.len() != in_range.len() {
        return Err(DataError::Histogram(
            crate::objects::HistogramError::SizeMismatch {
                name: h.name.clone(),
                expected: in_range.len(),
                found: values.len(),
            },
        ));
    }
    let mut full = vec![0.0; h.len()];
    for (g, v) in in_range.into_iter().zip(values) {
        full[g] = v;
    }
    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_content() {
        let record = ObjectRecord {
            kind: "TH1D".into(),
            name: "h1".into(),
            bins_x: vec![0.0, 1.0, 2.0],
            content: vec![3.0, 4.0],
            ..ObjectRecord::default()
        };
        let object = record.into_object().unwrap();
        let h = object.as_histogram().unwrap();
        assert_eq!(h.contents(), &[0.0, 3.0, 4.0, 0.0]);
        assert_eq!(h.entries(), 7.0);
    }

    #[test]
    fn test_wrong_content_length() {
        let record = ObjectRecord {
            kind: "TH1D".into(),
            name: "h1".into(),
            bins_x: vec![0.0, 1.0, 2.0],
            content: vec![3.0],
            ..ObjectRecord::default()
        };
        assert!(matches!(record.into_object(), Err(DataError::Histogram(_))));
    }

    #[test]
    fn test_unknown_type() {
        let record = ObjectRecord {
            kind: "TTree".into(),
            name: "t".into(),
            ..ObjectRecord::default()
        };
        assert!(matches!(record.into_object(), Err(DataError::UnknownType { .. })));
    }

    #[test]
    fn test_histogram_keeps_errors_and_labels() {
        let mut h = Histogram::new_1d("h", "t", Bins::linspace(2, 0.0, 2.0)).unwrap();
        h.set_bin_content(1, 4.0);
        h.set_bin_error(1, 0.5);
        h.axis_mut(0).unwrap().set_label(2, "b");
        let record = ObjectRecord::from_object(&PlotObject::Histogram(h.clone()));
        assert_eq!(record.labels, vec!["".to_string(), "b".to_string()]);
        let back = record.into_object().unwrap();
        let back = back.as_histogram().unwrap();
        assert_eq!(back.bin_error(1), 0.5);
        assert_eq!(back.axis(0).unwrap().label(2), Some("b"));
        assert_eq!(back.title, "t");
    }

    #[test]
    fn test_function_record() {
        let record: ObjectRecord = serde_json::from_str(
            r#"{"type": "TF1", "name": "f", "formula": "[0]*x", "params": [2], "min": 0, "max": 4}"#,
        )
        .unwrap();
        let object = record.into_object().unwrap();
        assert_eq!(object.as_function().unwrap().eval(3.0).unwrap(), 6.0);
    }
}

//! Legend placement and the record of what a plot has drawn

use indexmap::IndexMap;

use crate::config::View;
use crate::objects::{ObjectRef, Style};
use crate::palette::{Color, Palette};
use crate::renderer::{Align, Coords, Margins, Primitive, Rect, Stroke, TextItem};

use super::paint;

/// Legend box used when no position is given
pub const DEFAULT_LEGEND_RECT: Rect = Rect::new(0.1, 0.7, 0.5, 0.9);

/// Objects drawn on the current plot, addressable by bare and qualified name
#[derive(Debug, Default)]
pub(crate) struct Drawn {
    objects: IndexMap<String, ObjectRef>,
    /// Bare names of drawn histograms, in draw order
    histograms: Vec<String>,
}

impl Drawn {
    pub fn clear(&mut self) {
        self.objects.clear();
        self.histograms.clear();
    }

    pub fn record(&mut self, name: &str, fqn: &str, object: ObjectRef) {
        if object.borrow().is_histogram() && !self.histograms.iter().any(|n| n == name) {
            self.histograms.push(name.to_string());
        }
        self.objects.insert(fqn.to_string(), ObjectRef::clone(&object));
        self.objects.insert(name.to_string(), object);
    }

    pub fn get(&self, name: &str) -> Option<&ObjectRef> {
        self.objects.get(name)
    }

    /// Histograms that get an entry when a legend lists none explicitly
    pub fn default_entries(&self) -> impl Iterator<Item = (&str, &ObjectRef)> {
        self.histograms
            .iter()
            .filter_map(|n| self.objects.get(n).map(|o| (n.as_str(), o)))
    }
}

/// Legend position from a `Position` node
///
/// Explicit corners are used unless `pos` keywords are given. Keywords
/// (`top`, `bottom`, `left`, `right`, `vcenter`, `hcenter`) anchor the box
/// of size `w` x `h` against the pad margins plus `padding`.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendPosition {
    pub rect: Rect,
    pub keywords: String,
    pub width: f64,
    pub height: f64,
    /// top, right, bottom, left
    pub padding: [f64; 4],
}

impl Default for LegendPosition {
    fn default() -> Self {
        Self {
            rect: DEFAULT_LEGEND_RECT,
            keywords: String::new(),
            width: 0.4,
            height: 0.2,
            padding: [0.0; 4],
        }
    }
}

impl LegendPosition {
    pub fn from_view(view: &View<'_>, node: &str) -> Self {
        let d = Self::default();
        let f = |name: &str, default: f64| view.get_or(&format!("{}:{}", node, name), default);
        let padding: Vec<f64> = view.vec(&format!("{}:padding", node));
        Self {
            rect: Rect::new(
                f("x1", d.rect.x1),
                f("y1", d.rect.y1),
                f("x2", d.rect.x2),
                f("y2", d.rect.y2),
            ),
            keywords: view.string_or(&format!("{}:pos", node), ""),
            width: f("w", d.width),
            height: f("h", d.height),
            padding: match padding.as_slice() {
                [t, r, b, l, ..] => [*t, *r, *b, *l],
                _ => d.padding,
            },
        }
    }

    /// Final box in pad coordinates
    pub fn resolve(&self, margins: &Margins) -> Rect {
        let Rect {
            mut x1,
            mut y1,
            mut x2,
            mut y2,
        } = self.rect;
        let (w, h) = (self.width, self.height);
        let [pt, pr, pb, pl] = self.padding;
        let k = self.keywords.as_str();

        if k.contains("top") {
            y2 = 1.0 - margins.top - pt;
            y1 = y2 - h;
        }
        if k.contains("right") {
            x2 = 1.0 - margins.right - pr;
            x1 = x2 - w;
        }
        if k.contains("bottom") {
            y1 = margins.bottom + pb;
            y2 = y1 + h;
        }
        if k.contains("left") {
            x1 = margins.left + pl;
            x2 = x1 + w;
        }
        if k.contains("vcenter") {
            y1 = 0.5 - h / 2.0;
            y2 = 0.5 + h / 2.0;
        }
        if k.contains("hcenter") {
            x1 = 0.5 - w / 2.0;
            x2 = 0.5 + w / 2.0;
        }
        Rect::new(x1, y1, x2, y2)
    }
}

/// One row of a legend
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LegendEntry {
    pub title: String,
    /// Symbol letters: `l` line, `f` fill, `p` marker, `e` error bar
    pub opt: String,
    pub style: Style,
}

/// Box decoration and text settings
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LegendLook {
    pub header: Option<String>,
    pub columns: usize,
    /// Fraction of the pad height; derived from the row height when unset
    pub text_size: Option<f64>,
    pub border_size: f64,
    pub fill: Option<Color>,
}

impl Default for LegendLook {
    fn default() -> Self {
        Self {
            header: None,
            columns: 1,
            text_size: None,
            border_size: 1.0,
            fill: Some(Color::WHITE),
        }
    }
}

/// Lay out the legend box, header and entries
pub(crate) fn primitives(
    rect: Rect,
    look: &LegendLook,
    entries: &[LegendEntry],
    palette: &Palette,
) -> Vec<Primitive> {
    let mut out = vec![Primitive::Box {
        rect,
        coords: Coords::Ndc,
        stroke: (look.border_size > 0.0).then(|| Stroke {
            width: look.border_size,
            ..Stroke::default()
        }),
        fill: look.fill,
    }];

    let columns = look.columns.max(1);
    let rows = entries.len().div_ceil(columns) + usize::from(look.header.is_some());
    if rows == 0 {
        return out;
    }
    let row_h = rect.height() / rows as f64;
    let col_w = rect.width() / columns as f64;
    let text_size = look.text_size.unwrap_or((row_h * 0.6).min(0.05));

    let mut top = rect.y2;
    if let Some(header) = &look.header {
        out.push(Primitive::Text(TextItem {
            text: header.clone(),
            x: (rect.x1 + rect.x2) / 2.0,
            y: top - row_h / 2.0,
            size: text_size,
            align: Align(22),
            ..TextItem::default()
        }));
        top -= row_h;
    }

    for (i, entry) in entries.iter().enumerate() {
        let (row, col) = (i / columns, i % columns);
        let x0 = rect.x1 + col as f64 * col_w;
        let yc = top - (row as f64 + 0.5) * row_h;
        let symbol = Rect::new(x0 + col_w * 0.05, yc - row_h * 0.3, x0 + col_w * 0.25, yc + row_h * 0.3);
        out.extend(symbol_primitives(symbol, &entry.opt, &entry.style, palette));
        out.push(Primitive::Text(TextItem {
            text: entry.title.clone(),
            x: x0 + col_w * 0.3,
            y: yc,
            size: text_size,
            align: Align(12),
            ..TextItem::default()
        }));
    }
    out
}

fn symbol_primitives(area: Rect, opt: &str, style: &Style, palette: &Palette) -> Vec<Primitive> {
    let opt = opt.to_lowercase();
    let mut out = Vec::new();
    let (xc, yc) = ((area.x1 + area.x2) / 2.0, (area.y1 + area.y2) / 2.0);
    if opt.contains('f') {
        out.push(Primitive::Box {
            rect: area,
            coords: Coords::Ndc,
            stroke: Some(paint::line_stroke(style, palette, Color::BLACK)),
            fill: paint::fill_color(style, palette),
        });
    }
    if opt.contains('l') {
        out.push(Primitive::Line {
            from: (area.x1, yc),
            to: (area.x2, yc),
            coords: Coords::Ndc,
            stroke: paint::line_stroke(style, palette, Color::BLACK),
        });
    }
    if opt.contains('e') {
        out.push(Primitive::Line {
            from: (xc, area.y1),
            to: (xc, area.y2),
            coords: Coords::Ndc,
            stroke: paint::line_stroke(style, palette, Color::BLACK),
        });
    }
    if opt.contains('p') {
        out.push(paint::markers(vec![(xc, yc)], Coords::Ndc, style, palette));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Env};

    fn approx(a: Rect, b: Rect) -> bool {
        [(a.x1, b.x1), (a.y1, b.y1), (a.x2, b.x2), (a.y2, b.y2)]
            .iter()
            .all(|(p, q)| (p - q).abs() < 1e-9)
    }

    #[test]
    fn test_default_position() {
        let pos = LegendPosition::default();
        assert_eq!(pos.resolve(&Margins::default()), DEFAULT_LEGEND_RECT);
    }

    #[test]
    fn test_top_right_is_margin_aware() {
        let pos = LegendPosition {
            keywords: "top right".into(),
            padding: [0.02, 0.01, 0.0, 0.0],
            ..LegendPosition::default()
        };
        let margins = Margins {
            top: 0.05,
            right: 0.1,
            bottom: 0.12,
            left: 0.15,
        };
        assert!(approx(pos.resolve(&margins), Rect::new(0.49, 0.73, 0.89, 0.93)));
    }

    #[test]
    fn test_bottom_left_and_centers() {
        let margins = Margins::default();
        let pos = LegendPosition {
            keywords: "bottom left".into(),
            ..LegendPosition::default()
        };
        assert!(approx(pos.resolve(&margins), Rect::new(0.1, 0.1, 0.5, 0.3)));

        let pos = LegendPosition {
            keywords: "vcenter hcenter".into(),
            ..LegendPosition::default()
        };
        assert!(approx(pos.resolve(&margins), Rect::new(0.3, 0.4, 0.7, 0.6)));
    }

    #[test]
    fn test_position_from_config() {
        let config = Config::from_xml_str(
            r#"<config><TLegend><Position pos="top" w="0.3" h="0.1" padding="0.1,0,0,0" x1="0.2"/></TLegend></config>"#,
        )
        .unwrap();
        let env = Env::new();
        let pos = LegendPosition::from_view(&config.view(&env), "TLegend.Position");
        assert_eq!(pos.keywords, "top");
        assert_eq!(pos.width, 0.3);
        assert_eq!(pos.padding, [0.1, 0.0, 0.0, 0.0]);
        // x stays explicit, y follows the keyword
        assert!(approx(pos.resolve(&Margins::default()), Rect::new(0.2, 0.6, 0.5, 0.7)));
    }

    #[test]
    fn test_entries_are_laid_out_in_columns() {
        let entries: Vec<LegendEntry> = ["a", "b", "c"]
            .iter()
            .map(|t| LegendEntry {
                title: t.to_string(),
                opt: "l".into(),
                style: Style::default(),
            })
            .collect();
        let look = LegendLook {
            header: Some("head".into()),
            columns: 2,
            ..LegendLook::default()
        };
        let prims = primitives(Rect::new(0.0, 0.0, 1.0, 0.9), &look, &entries, &Palette::default());
        let texts: Vec<(String, f64, f64)> = prims
            .iter()
            .filter_map(|p| match p {
                Primitive::Text(t) => Some((t.text.clone(), t.x, t.y)),
                _ => None,
            })
            .collect();
        assert_eq!(texts.len(), 4);
        assert_eq!(texts[0].0, "head");
        // three rows of 0.3: header, then a b / c
        assert!((texts[1].2 - 0.45).abs() < 1e-9);
        assert!((texts[2].1 - 0.65).abs() < 1e-9);
        assert!((texts[3].2 - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_drawn_default_entries() {
        use crate::objects::{share, Bins, Histogram, PlotObject};
        let mut drawn = Drawn::default();
        let h = share(PlotObject::Histogram(
            Histogram::new_1d("h", "", Bins::linspace(1, 0.0, 1.0)).unwrap(),
        ));
        drawn.record("h", "d/h", ObjectRef::clone(&h));
        drawn.record("h", "d/h", h);
        assert!(drawn.get("d/h").is_some());
        assert_eq!(drawn.default_entries().count(), 1);
        drawn.clear();
        assert!(drawn.get("h").is_none());
    }
}

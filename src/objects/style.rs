//! Drawing style attached to plot objects

use crate::config::{ConfigValue, View};

/// Style properties read from a node's attributes
///
/// Every field is optional; unset fields fall back to the renderer's
/// defaults. Colors are kept as written and resolved by the palette at
/// draw time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    pub title: Option<String>,
    pub x_title: Option<String>,
    pub y_title: Option<String>,
    pub z_title: Option<String>,
    pub line_color: Option<String>,
    pub line_width: Option<f64>,
    pub line_style: Option<i32>,
    pub marker_color: Option<String>,
    pub marker_style: Option<i32>,
    pub marker_size: Option<f64>,
    pub fill_color: Option<String>,
    pub fill_style: Option<i32>,
    pub draw: Option<String>,
    pub x_range: Option<(f64, f64)>,
    pub y_range: Option<(f64, f64)>,
    pub log_x: Option<bool>,
    pub log_y: Option<bool>,
    pub log_z: Option<bool>,
}

impl Style {
    /// Read every style key from the node at `node`
    ///
    /// Keys resolve through [`View::styled`], so local attributes win over a
    /// `.style` child which wins over a referenced style node.
    pub fn from_view(view: &View<'_>, node: &str) -> Self {
        let s = |keys: &[&str]| keys.iter().find_map(|k| view.styled(node, k));
        let f = |keys: &[&str]| s(keys).and_then(|v| v.trim().parse::<f64>().ok());
        let i = |keys: &[&str]| s(keys).and_then(|v| v.trim().parse::<i32>().ok());
        let b = |keys: &[&str]| s(keys).and_then(|v| <bool as ConfigValue>::parse_value(&v));
        let range = |keys: &[&str]| {
            let values: Vec<f64> = s(keys)?
                .split(',')
                .filter_map(|v| v.trim().parse().ok())
                .collect();
            match values.as_slice() {
                [lo, hi] => Some((*lo, *hi)),
                _ => None,
            }
        };

        let color = s(&["color", "c"]);
        Self {
            title: s(&["title", "t"]),
            x_title: s(&["xtitle", "xt"]),
            y_title: s(&["ytitle", "yt"]),
            z_title: s(&["ztitle", "zt"]),
            line_color: s(&["lc", "line_color"]).or_else(|| color.clone()),
            line_width: f(&["lw", "line_width", "width"]),
            line_style: i(&["lst", "line_style"]),
            marker_color: s(&["mc", "marker_color"]).or_else(|| color.clone()),
            marker_style: i(&["mst", "marker_style"]),
            marker_size: f(&["ms", "marker_size"]),
            fill_color: s(&["fc", "fill_color"]),
            fill_style: i(&["fst", "fill_style"]),
            draw: s(&["draw", "opt"]),
            x_range: range(&["xr", "x_range"]),
            y_range: range(&["yr", "y_range"]),
            log_x: b(&["logx"]),
            log_y: b(&["logy"]),
            log_z: b(&["logz"]),
        }
    }

    /// Overlay every field set in `other` onto this style
    pub fn merge(&mut self, other: &Style) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field.clone();
                    }
                )*
            };
        }
        take!(
            title, x_title, y_title, z_title, line_color, line_width, line_style, marker_color,
            marker_style, marker_size, fill_color, fill_style, draw, x_range, y_range, log_x,
            log_y, log_z
        );
    }

    /// Draw option with `default` when unset
    pub fn draw_option(&self, default: &str) -> String {
        self.draw.clone().unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Env};

    #[test]
    fn test_from_view_aliases() {
        let config = Config::from_xml_str(
            r#"<config>
                <Histo color="red" lw="2" draw="hist" xr="0,5" logy="true"/>
            </config>"#,
        )
        .unwrap();
        let env = Env::new();
        let style = Style::from_view(&config.view(&env), "Histo");
        assert_eq!(style.line_color.as_deref(), Some("red"));
        assert_eq!(style.marker_color.as_deref(), Some("red"));
        assert_eq!(style.line_width, Some(2.0));
        assert_eq!(style.draw_option("pe"), "hist");
        assert_eq!(style.x_range, Some((0.0, 5.0)));
        assert_eq!(style.log_y, Some(true));
        assert_eq!(style.fill_color, None);
    }

    #[test]
    fn test_specific_color_wins_over_shared() {
        let config =
            Config::from_xml_str(r#"<config><Histo color="red" lc="blue"/></config>"#).unwrap();
        let env = Env::new();
        let style = Style::from_view(&config.view(&env), "Histo");
        assert_eq!(style.line_color.as_deref(), Some("blue"));
        assert_eq!(style.marker_color.as_deref(), Some("red"));
    }

    #[test]
    fn test_merge_only_overrides_set_fields() {
        let mut base = Style {
            line_color: Some("red".into()),
            line_width: Some(1.0),
            ..Style::default()
        };
        base.merge(&Style {
            line_width: Some(3.0),
            ..Style::default()
        });
        assert_eq!(base.line_color.as_deref(), Some("red"));
        assert_eq!(base.line_width, Some(3.0));
    }
}

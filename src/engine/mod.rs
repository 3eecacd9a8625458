//! Node dispatch engine
//!
//! [`Plotter`] walks the configuration document depth first, left to right,
//! and runs the handler registered for each tag. Handlers never fail the
//! run: a node that cannot be executed is logged and skipped so one broken
//! plot does not stop the others. Scalar variables live in an [`Env`] chain
//! that loop constructs extend with a child frame per iteration.

mod drawing;
mod legend;
mod paint;
mod transforms;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{join_path, Config, ConfigError, Env, View};
use crate::data::{DataError, DataFile};
use crate::objects::Bins;
use crate::palette::{Palette, PaletteError};
use crate::registry::Registry;
use crate::renderer::{Backend, PrintScope, SceneBackend};

pub use legend::{LegendPosition, DEFAULT_LEGEND_RECT};

use legend::Drawn;

/// Signature shared by every tag handler
pub type Handler<B> = fn(&mut Plotter<B>, &str, &mut Env<'_>);

/// Tags at the document root that other handlers consume, or that the
/// run executes itself before or after the main walk
const ROOT_CONSUMED: &[&str] = &["Data", "TFile", "ExportConfig", "TLatex", "Margins", "TCanvas", "Log"];

/// Fatal conditions that stop a run
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot load palette: {0}")]
    Palette(#[from] PaletteError),

    #[error("{declared} data source(s) declared but none could be opened")]
    NoDataSources { declared: usize },

    #[error("cannot write output container: {0}")]
    Output(#[source] DataError),
}

/// Interpreter over a configuration document
pub struct Plotter<B: Backend = SceneBackend> {
    config: Config,
    registry: Registry,
    backend: B,
    palette: Palette,
    base: PathBuf,
    output: Option<PathBuf>,
    drawn: Drawn,
    in_canvas: bool,
    print_scope: PrintScope,
    handlers: HashMap<&'static str, Handler<B>>,
}

impl<B: Backend> Plotter<B> {
    pub fn new(config: Config, backend: B) -> Self {
        Self {
            config,
            registry: Registry::new(),
            backend,
            palette: Palette::default(),
            base: PathBuf::from("."),
            output: None,
            drawn: Drawn::default(),
            in_canvas: false,
            print_scope: PrintScope::Canvas,
            handlers: Self::handler_table(),
        }
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Directory that relative urls are taken from
    pub fn with_base_dir(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = base.into();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Register (or replace) the handler for a tag
    pub fn register_handler(&mut self, tag: &'static str, handler: Handler<B>) {
        self.handlers.insert(tag, handler);
    }

    fn handler_table() -> HashMap<&'static str, Handler<B>> {
        let table: Vec<(&'static str, Handler<B>)> = vec![
            // structure and data
            ("Data", Self::exec_data),
            ("TFile", Self::exec_tfile),
            ("ExportConfig", Self::exec_export_config),
            ("Loop", Self::exec_loop),
            ("Scope", Self::exec_loop),
            ("Transforms", Self::exec_loop),
            ("Transform", Self::exec_loop),
            ("RangeLoop", Self::exec_range_loop),
            // drawing
            ("Canvas", Self::exec_canvas),
            ("Pad", Self::exec_pad),
            ("Plot", Self::exec_plot),
            ("Axes", Self::exec_axes),
            ("Margins", Self::exec_margins),
            ("Histo", Self::exec_histo),
            ("Graph", Self::exec_graph),
            ("TF1", Self::exec_tf1),
            ("TLine", Self::exec_tline),
            ("TLatex", Self::exec_tlatex),
            ("Rect", Self::exec_rect),
            ("Ellipse", Self::exec_ellipse),
            ("Image", Self::exec_image),
            ("TLegend", Self::exec_legend),
            ("Legend", Self::exec_legend),
            ("Export", Self::exec_export),
            // transforms
            ("Projection", Self::exec_projection),
            ("ProjectionX", Self::exec_projection_x),
            ("ProjectionY", Self::exec_projection_y),
            ("Add", Self::exec_add),
            ("MultiAdd", Self::exec_multi_add),
            ("Divide", Self::exec_divide),
            ("Rebin", Self::exec_rebin),
            ("Scale", Self::exec_scale),
            ("Smooth", Self::exec_smooth),
            ("CDF", Self::exec_cdf),
            ("Clone", Self::exec_clone),
            ("SetBinError", Self::exec_set_bin_error),
            ("BinLabels", Self::exec_bin_labels),
            ("SetBinLabels", Self::exec_bin_labels),
            ("Sumw2", Self::exec_sumw2),
            ("Style", Self::exec_style),
            ("Draw", Self::exec_draw),
            ("Assign", Self::exec_assign),
            ("ProcessLine", Self::exec_process_line),
        ];
        let mut handlers: HashMap<&'static str, Handler<B>> = table.into_iter().collect();
        // consumed by their parent node
        for tag in [
            "Entry",
            "Position",
            "HistogramData",
            "TCanvas",
            "style",
            "Norm",
            "OptStats",
            "Log",
        ] {
            handlers.insert(tag, Self::exec_nothing);
        }
        handlers
    }

    /// Run the whole document
    ///
    /// Data sources are opened first and the output container is written
    /// last. Fails only when data sources were declared and none of them
    /// could be opened, or when the output container cannot be written.
    pub fn make(&mut self) -> Result<(), RunError> {
        let mut env = Env::new();

        let data_nodes = self.config.children_of("", Some("Data"), 1);
        let mut opened = 0;
        for path in &data_nodes {
            if self.load_data(path, &mut env) {
                opened += 1;
            }
        }
        if !data_nodes.is_empty() && opened == 0 {
            tracing::error!(declared = data_nodes.len(), "no data source could be opened");
            return Err(RunError::NoDataSources {
                declared: data_nodes.len(),
            });
        }

        if let Some(tfile) = self.config.children_of("", Some("TFile"), 1).first() {
            self.exec_tfile(tfile, &mut env);
        }

        for path in self.config.children_of("", None, 1) {
            let consumed = self
                .config
                .tag_name(&path)
                .map_or(true, |tag| ROOT_CONSUMED.contains(&tag));
            if !consumed {
                self.exec_node(&path, &mut env);
            }
        }

        self.write_output()?;

        if let Some(export) = self.config.children_of("", Some("ExportConfig"), 1).first() {
            self.exec_export_config(export, &mut env);
        }
        Ok(())
    }

    /// Dispatch one node by its tag
    pub fn exec_node(&mut self, path: &str, env: &mut Env<'_>) {
        let Some(tag) = self.config.tag_name(path).map(str::to_string) else {
            tracing::debug!(path, "no node here");
            return;
        };
        match self.handlers.get(tag.as_str()).copied() {
            Some(handler) => {
                tracing::debug!(path, tag = %tag, depth = env.depth(), "exec");
                handler(self, path, env);
            }
            None => tracing::error!(path, tag = %tag, "no handler for tag, skipping"),
        }
    }

    /// Dispatch the immediate children of `path`, optionally only those with `tag`
    pub fn exec_children(&mut self, path: &str, tag: Option<&str>, env: &mut Env<'_>) {
        for child in self.config.children_of(path, tag, 1) {
            self.exec_node(&child, env);
        }
    }

    /// Dispatch the immediate children whose tag is in `tags`, in document order
    fn exec_children_among(&mut self, path: &str, tags: &[&str], env: &mut Env<'_>) {
        for child in self.config.children_of(path, None, 1) {
            let selected = self
                .config
                .tag_name(&child)
                .is_some_and(|t| tags.contains(&t));
            if selected {
                self.exec_node(&child, env);
            }
        }
    }

    fn exec_nothing(&mut self, _path: &str, _env: &mut Env<'_>) {}

    /// Loop over `states`, `arange` or `linspace`; without any, a plain scope
    fn exec_loop(&mut self, path: &str, env: &mut Env<'_>) {
        let (var, index, states) = {
            let view = self.config.view(env);
            (
                view.string_or(&attr(path, "var"), "state"),
                view.string_or(&attr(path, "index"), "i"),
                loop_states(&view, path),
            )
        };

        if states.is_empty() {
            tracing::debug!(path, "scope");
            self.exec_children(path, None, env);
            return;
        }

        for (i, state) in states.iter().enumerate() {
            tracing::info!(path, var = %var, state = %state, "loop");
            let mut frame = env.child();
            frame.set(var.as_str(), state.as_str());
            frame.set(index.as_str(), i.to_string());
            self.exec_children(path, None, &mut frame);
        }
    }

    /// Loop over adjacent bin edge pairs
    fn exec_range_loop(&mut self, path: &str, env: &mut Env<'_>) {
        let (vars, index, bins) = {
            let view = self.config.view(env);
            let mut vars: Vec<String> = view.vec(&attr(path, "vars"));
            if vars.len() < 2 {
                vars = vec!["min".to_string(), "max".to_string()];
            }
            let bins = if let Some(list) = view.string(&attr(path, "bins")) {
                Bins::from_value(&view, path, &list)
            } else if let Some(ls) = view.string(&attr(path, "linspace")) {
                Bins::parse_linspace(&ls)
            } else if let Some(ar) = view.string(&attr(path, "arange")) {
                Bins::parse_arange(&ar)
            } else {
                Bins::default()
            };
            (vars, view.string_or(&attr(path, "index"), "i"), bins)
        };

        if bins.is_empty() {
            tracing::warn!(path, "RangeLoop without bin edges, nothing to do");
            return;
        }

        for (i, pair) in bins.edges.windows(2).enumerate() {
            let (lo, hi) = (format_value(pair[0]), format_value(pair[1]));
            tracing::info!(path, lo = %lo, hi = %hi, "range loop");
            let mut frame = env.child();
            frame.set(vars[0].as_str(), lo);
            frame.set(vars[1].as_str(), hi);
            frame.set(index.as_str(), i.to_string());
            self.exec_children(path, None, &mut frame);
        }
    }

    fn exec_data(&mut self, path: &str, env: &mut Env<'_>) {
        self.load_data(path, env);
    }

    /// Open the source declared at `path`; returns whether it was opened
    fn load_data(&mut self, path: &str, env: &mut Env<'_>) -> bool {
        let (name, inline, has_url) = {
            let view = self.config.view(env);
            (
                view.string_or(&attr(path, "name"), ""),
                view.get_or(&attr(path, "inline"), false),
                view.exists(&attr(path, "url")),
            )
        };
        if name.is_empty() {
            tracing::warn!(path, "Data node without a name");
            return false;
        }

        let loaded = {
            let view = self.config.view(env);
            self.registry.load_data_node(&view, path, &self.base)
        };
        if let Err(e) = loaded {
            tracing::error!(path, name = %name, error = %e, "cannot open data source");
            return false;
        }

        if inline && has_url {
            if let Some(file) = self.registry.file(&name) {
                file.inline_into(&mut self.config, path);
                self.config.delete_attribute(&attr(path, "url"));
                tracing::info!(name = %name, "inlined data file into the configuration");
            }
        }
        true
    }

    fn exec_tfile(&mut self, path: &str, env: &mut Env<'_>) {
        let url = self.config.view(env).string(&attr(path, "url"));
        match url {
            Some(url) => {
                let target = self.base.join(url);
                tracing::info!(url = %target.display(), "output container opened in RECREATE mode");
                self.output = Some(target);
            }
            None => tracing::warn!(path, "TFile without url"),
        }
    }

    /// Write every registered object to the output container, if one was opened
    fn write_output(&self) -> Result<(), RunError> {
        let Some(target) = &self.output else {
            return Ok(());
        };
        let mut file = DataFile::new("output");
        for object in self.registry.objects_for_output() {
            file.insert(object.borrow().clone());
        }
        tracing::info!(url = %target.display(), objects = file.len(), "writing output container");
        file.write(target).map_err(RunError::Output)
    }

    /// Serialize the configuration as it stands, then drop the node
    fn exec_export_config(&mut self, path: &str, env: &mut Env<'_>) {
        let (url, yaml) = {
            let view = self.config.view(env);
            (view.string(&attr(path, "url")), view.get_or(&attr(path, "yaml"), false))
        };
        let Some(url) = url else {
            tracing::warn!(path, "ExportConfig without url");
            return;
        };
        self.config.delete_node(path);

        let target = self.base.join(&url);
        tracing::info!(url = %target.display(), "exporting configuration");
        if let Err(e) = self.config.write_xml(&target, Some(&*env)) {
            tracing::error!(url = %target.display(), error = %e, "cannot export configuration");
            return;
        }
        if yaml {
            let dump = target.with_extension("yaml");
            tracing::info!(url = %dump.display(), "dumping configuration");
            if let Err(e) = std::fs::write(&dump, self.config.dump()) {
                tracing::error!(url = %dump.display(), error = %e, "cannot dump configuration");
            }
        }
    }

    /// Resolve an output url against the base directory
    fn output_path(&self, url: &str) -> PathBuf {
        let target = self.base.join(url);
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(dir = %parent.display(), error = %e, "cannot create output directory");
            }
        }
        target
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }
}

/// Upper bound on the states a numeric loop expands to
const MAX_LOOP_STATES: usize = 10_000;

/// `<path>:<name>`
fn attr(path: &str, name: &str) -> String {
    join_path(path, &format!(":{}", name))
}

/// States of a loop node: `states` list, `arange` or `linspace`
///
/// `arange="start,stop,step"` excludes `stop`; `linspace="n,min,max"`
/// gives `n` evenly spaced values including both ends.
fn loop_states(view: &View<'_>, path: &str) -> Vec<String> {
    if view.exists(&attr(path, "states")) {
        return view.vec::<String>(&attr(path, "states"));
    }
    if let Some(spec) = view.string(&attr(path, "arange")) {
        return match numbers(&spec).as_slice() {
            [start, stop, step] if *step > 0.0 => {
                let n = state_count(((stop - start) / step - 1e-9).ceil(), &spec);
                (0..n).map(|i| format_value(start + step * i as f64)).collect()
            }
            _ => {
                tracing::warn!(arange = %spec, "arange must be start,stop,step with step > 0");
                Vec::new()
            }
        };
    }
    if let Some(spec) = view.string(&attr(path, "linspace")) {
        return match numbers(&spec).as_slice() {
            [n, min, max] if *n >= 1.0 => {
                let n = state_count(*n, &spec);
                if n == 1 {
                    return vec![format_value(*min)];
                }
                let step = (max - min) / (n - 1) as f64;
                (0..n).map(|i| format_value(min + step * i as f64)).collect()
            }
            _ => {
                tracing::warn!(linspace = %spec, "linspace must be n,min,max with n >= 1");
                Vec::new()
            }
        };
    }
    Vec::new()
}

/// Number of loop states, clamped to [`MAX_LOOP_STATES`]
fn state_count(n: f64, spec: &str) -> usize {
    if n.is_nan() || n <= 0.0 {
        return 0;
    }
    if n > MAX_LOOP_STATES as f64 {
        tracing::error!(spec, max = MAX_LOOP_STATES, "too many loop states, truncating");
        return MAX_LOOP_STATES;
    }
    n as usize
}

fn numbers(text: &str) -> Vec<f64> {
    text.split(',')
        .filter_map(|s| s.trim().parse::<f64>().ok())
        .collect()
}

/// Format a number for a scalar variable: integers without a fraction,
/// everything else to nine decimals with trailing zeros dropped
pub(crate) fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        return format!("{}", v as i64);
    }
    let s = format!("{:.9}", v);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigValue;
    use crate::objects::{share, Histogram, PlotObject};
    use crate::registry::ObjectKey;
    use pretty_assertions::assert_eq;

    /// Appends the interpolated `value` attribute to `Trace:log`
    fn trace(plotter: &mut Plotter, path: &str, env: &mut Env<'_>) {
        let value = plotter.config.view(env).string_or(&attr(path, "value"), "");
        let log = plotter.config.raw("Trace:log").unwrap_or_default().to_string();
        let log = if log.is_empty() { value } else { format!("{},{}", log, value) };
        plotter.config.set("Trace:log", log);
    }

    fn run(xml: &str) -> Plotter {
        let config = Config::from_xml_str(xml).unwrap();
        let mut plotter = Plotter::new(config, SceneBackend::new());
        plotter.register_handler("Trace", trace);
        plotter.make().unwrap();
        plotter
    }

    fn traced(plotter: &Plotter) -> String {
        plotter.config.raw("Trace:log").unwrap_or_default().to_string()
    }

    #[test]
    fn test_loop_binds_states_in_order() {
        let plotter = run(
            r#"<config>
                <Loop states="a, b, c" var="v">
                    <Trace value="{v}{i}"/>
                </Loop>
            </config>"#,
        );
        assert_eq!(traced(&plotter), "a0,b1,c2");
    }

    #[test]
    fn test_loop_variables_do_not_leak() {
        let plotter = run(
            r#"<config>
                <Loop states="x" var="v">
                    <Loop states="1,2" var="v" index="j">
                        <Trace value="{v}{j}"/>
                    </Loop>
                    <Trace value="{v}"/>
                </Loop>
                <Trace value="{v}"/>
            </config>"#,
        );
        assert_eq!(traced(&plotter), "10,21,x,{v}");
    }

    #[test]
    fn test_scope_without_states_runs_once() {
        let plotter = run(
            r#"<config>
                <Transforms>
                    <Trace value="once"/>
                </Transforms>
            </config>"#,
        );
        assert_eq!(traced(&plotter), "once");
    }

    #[test]
    fn test_numeric_loops() {
        let plotter = run(
            r#"<config>
                <Loop arange="0,1,0.25"><Trace value="{state}"/></Loop>
                <Loop linspace="3,0,1"><Trace value="{state}"/></Loop>
            </config>"#,
        );
        assert_eq!(traced(&plotter), "0,0.25,0.5,0.75,0,0.5,1");
    }

    #[test]
    fn test_numeric_loop_state_count_is_bounded() {
        let config = Config::from_xml_str(
            r#"<config>
                <Loop linspace="1e300,0,1"/>
                <Loop arange="0,1,1e-300"/>
                <Loop linspace="inf,0,1"/>
            </config>"#,
        )
        .unwrap();
        let env = Env::new();
        let view = config.view(&env);
        assert_eq!(loop_states(&view, "Loop[0]").len(), MAX_LOOP_STATES);
        assert_eq!(loop_states(&view, "Loop[1]").len(), MAX_LOOP_STATES);
        assert_eq!(loop_states(&view, "Loop[2]").len(), MAX_LOOP_STATES);
    }

    #[test]
    fn test_range_loop() {
        let plotter = run(
            r#"<config>
                <RangeLoop bins="0,1,5" vars="lo,hi">
                    <Trace value="{lo}-{hi}"/>
                </RangeLoop>
                <RangeLoop linspace="2,0,1">
                    <Trace value="{min}:{max}:{i}"/>
                </RangeLoop>
            </config>"#,
        );
        assert_eq!(traced(&plotter), "0-1,1-5,0:0.5:0,0.5:1:1");
    }

    #[test]
    fn test_unknown_tag_is_skipped() {
        let plotter = run(
            r#"<config>
                <Bogus/>
                <Trace value="after"/>
            </config>"#,
        );
        assert_eq!(traced(&plotter), "after");
    }

    #[test]
    fn test_no_data_sources_is_fatal() {
        let config = Config::from_xml_str(
            r#"<config><Data name="d" url="/nonexistent/file.json"/></config>"#,
        )
        .unwrap();
        let mut plotter = Plotter::new(config, SceneBackend::new());
        assert!(matches!(
            plotter.make(),
            Err(RunError::NoDataSources { declared: 1 })
        ));
    }

    #[test]
    fn test_export_config_removes_itself() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_xml_str(
            r#"<config>
                <Loop states="a"><Trace value="{state}"/></Loop>
                <ExportConfig url="exported.xml" yaml="true"/>
            </config>"#,
        )
        .unwrap();
        let mut plotter = Plotter::new(config, SceneBackend::new()).with_base_dir(dir.path());
        plotter.register_handler("Trace", trace);
        plotter.make().unwrap();

        let exported = std::fs::read_to_string(dir.path().join("exported.xml")).unwrap();
        assert!(!exported.contains("ExportConfig"));
        assert!(exported.contains("Trace"));
        assert!(dir.path().join("exported.yaml").exists());
    }

    #[test]
    fn test_output_container_holds_registry() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_xml_str(r#"<config><TFile url="out.json"/></config>"#).unwrap();
        let mut plotter = Plotter::new(config, SceneBackend::new()).with_base_dir(dir.path());
        let h = Histogram::new_1d("h", "", Bins::linspace(2, 0.0, 2.0)).unwrap();
        plotter
            .registry
            .insert(ObjectKey::bare("h"), share(PlotObject::Histogram(h)));
        plotter.make().unwrap();

        let file = DataFile::open("out", &dir.path().join("out.json")).unwrap();
        assert!(file.get("h").is_some());
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(-0.0), "0");
        assert_eq!(format_value(0.1 + 0.2), "0.3");
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(<f64 as ConfigValue>::parse_value(&format_value(1e-3)), Some(1e-3));
    }
}

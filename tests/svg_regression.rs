//! Pixel placement of drawn primitives in exported SVG
//!
//! Documents here avoid histograms so no frame is set and axis
//! coordinates map straight onto the pad.

use std::fs;
use std::path::Path;

use vega_plotter::{Config, Plotter, SceneBackend};

fn export(dir: &Path, body: &str) -> String {
    let xml = format!(
        r#"<config>
            <Plot>
                <TCanvas width="400" height="200"/>
                {}
                <Export url="out.svg"/>
            </Plot>
        </config>"#,
        body
    );
    let config = Config::from_xml_str(&xml).unwrap();
    let mut plotter = Plotter::new(config, SceneBackend::new()).with_base_dir(dir);
    plotter.make().unwrap();
    fs::read_to_string(dir.join("out.svg")).unwrap()
}

#[test]
fn test_canvas_size_and_background() {
    let dir = tempfile::tempdir().unwrap();
    let svg = export(dir.path(), "");
    assert!(svg.contains(r#"width="400" height="200" viewBox="0 0 400 200""#));
    assert!(svg.contains(r##"x="0" y="0" width="400" height="200" fill="#ffffff""##));
}

#[test]
fn test_rect_in_pad_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let svg = export(dir.path(), r#"<Rect x1="0" y1="0" x2="0.5" y2="0.5" fc="kRed"/>"#);
    assert!(svg.contains(r##"x="0" y="100" width="200" height="100" fill="#ff0000" stroke="#000000""##));
}

#[test]
fn test_ellipse_radii_follow_canvas_aspect() {
    let dir = tempfile::tempdir().unwrap();
    let svg = export(dir.path(), r#"<Ellipse x="0.5" y="0.5" r="0.25"/>"#);
    assert!(svg.contains(r#"cx="200" cy="100" rx="100" ry="50" fill="none""#));
}

#[test]
fn test_line_defaults_to_dashed() {
    let dir = tempfile::tempdir().unwrap();
    let svg = export(dir.path(), r#"<TLine x="0,1" y="0.5,0.5"/>"#);
    assert!(svg.contains(r#"x1="0" y1="100" x2="400" y2="100""#));
    assert!(svg.contains(r#"stroke-dasharray="6,4""#));
}

#[test]
fn test_latex_is_escaped_and_rotated() {
    let dir = tempfile::tempdir().unwrap();
    let svg = export(
        dir.path(),
        r#"<TLatex x="0.5" y="0.5" text="a &lt; b" angle="90" align="center" color="kBlue"/>"#,
    );
    assert!(svg.contains(">a &lt; b</text>"));
    assert!(svg.contains(r#"transform="rotate(-90 200 100)""#));
    assert!(svg.contains(r##"fill="#0000ff" text-anchor="start" dominant-baseline="middle""##));
}

#[test]
fn test_image_is_embedded() {
    let dir = tempfile::tempdir().unwrap();
    image::RgbImage::from_pixel(2, 2, image::Rgb([10, 20, 30]))
        .save(dir.path().join("logo.png"))
        .unwrap();
    let svg = export(dir.path(), r#"<Image url="logo.png" pos="0.5,0.5,1,1"/>"#);
    assert!(svg.contains(r#"x="200" y="0" width="200" height="100""#));
    assert!(svg.contains("href=\"data:image/png;base64,"));
}

#[test]
fn test_pads_are_placed_on_the_canvas() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::from_xml_str(
        r#"<config>
            <Canvas width="400" height="200">
                <Pad name="right" pos="0.5,0,1,1">
                    <Rect x1="0" y1="0" x2="1" y2="1" fc="kBlue"/>
                </Pad>
                <Export url="canvas.svg"/>
            </Canvas>
        </config>"#,
    )
    .unwrap();
    let mut plotter = Plotter::new(config, SceneBackend::new()).with_base_dir(dir.path());
    plotter.make().unwrap();
    let svg = fs::read_to_string(dir.path().join("canvas.svg")).unwrap();
    assert!(svg.contains(r##"x="200" y="0" width="200" height="200" fill="#0000ff""##));
}

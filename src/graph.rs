#![cfg(not(tarpaulin_include))]
use crate::error::{Error, Result};
use crate::model::{PlotPoint, SemiAxis};
use crate::projector::PlotView;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::io::Cursor;

/// Number of labelled ticks on each axis
pub const TICKS: usize = 11;

/// Annotations longer than this are left out of point labels
pub const MAX_LABEL_ANNOTATION: usize = 5;

const POINT_COLOR: RGBColor = RGBColor(0x88, 0x84, 0xd8);

/// Configuration options for plot rendering
///
/// The same plot is drawn at two sizes: inline in the plot tab, and in the
/// full-screen drawer (see [`GraphOptions::magnified`]).
#[derive(Clone, Debug, PartialEq)]
pub struct GraphOptions {
    /// Caption drawn above the chart. `None` uses the plot's name.
    pub title: Option<String>,

    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,

    /// Radius of each point marker in pixels
    pub point_radius: u32,

    /// Font size of point labels and semi-axis names
    pub font_size: u32,
}

impl Default for GraphOptions {
    /// Inline size: 800x500 pixels
    fn default() -> Self {
        Self {
            title: None,
            width: 800,
            height: 500,
            point_radius: 5,
            font_size: 12,
        }
    }
}

impl GraphOptions {
    /// Full-screen preset with bigger markers and text
    pub fn magnified() -> Self {
        Self {
            width: 1600,
            height: 900,
            point_radius: 8,
            font_size: 18,
            ..Self::default()
        }
    }
}

/// Label next to a point
///
/// The annotation is appended as `name: annotation` only when it is short
/// enough not to clutter the plot.
///
/// # Examples
/// ```
/// use cartesian_plot::graph::point_label;
/// use cartesian_plot::model::PlotPoint;
///
/// let p = PlotPoint { x: 1.0, y: 2.0, name: "alice".into(), annotation: "lead".into() };
/// assert_eq!(point_label(&p), "alice: lead");
/// ```
pub fn point_label(point: &PlotPoint) -> String {
    let length = point.annotation.chars().count();
    if length == 0 || length > MAX_LABEL_ANNOTATION {
        point.name.clone()
    } else {
        format!("{}: {}", point.name, point.annotation)
    }
}

fn render_err<E: std::fmt::Display>(err: E) -> Error {
    Error::Render(err.to_string())
}

/// Draws the plot onto any plotters backend
///
/// Layout:
/// * symmetric ranges from the view's domain, with [`TICKS`] labelled ticks
/// * bold reference lines through the origin
/// * the bound dimension names at the four axis tips
/// * one filled circle per valid point, labelled with [`point_label`]
fn draw<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    view: &PlotView,
    options: &GraphOptions,
) -> Result<()> {
    root.fill(&WHITE).map_err(render_err)?;

    let [x_min, x_max] = view.domain.x;
    let [y_min, y_max] = view.domain.y;
    let title = options.title.as_deref().unwrap_or(&view.name);
    let font = options.font_size;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", font * 2).into_font())
        .margin(20)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_labels(TICKS)
        .y_labels(TICKS)
        .light_line_style(&WHITE)
        .bold_line_style(&BLACK.mix(0.1))
        .draw()
        .map_err(render_err)?;

    // Reference lines through the origin
    let axis_style = BLACK.stroke_width(2);
    chart
        .draw_series(LineSeries::new(vec![(x_min, 0.0), (x_max, 0.0)], axis_style))
        .map_err(render_err)?;
    chart
        .draw_series(LineSeries::new(vec![(0.0, y_min), (0.0, y_max)], axis_style))
        .map_err(render_err)?;

    // Semi-axis names at the tips
    let tip = |axis: SemiAxis, at: (f64, f64), h: HPos, v: VPos| {
        let style = TextStyle::from(("sans-serif", font).into_font().style(FontStyle::Bold))
            .pos(Pos::new(h, v));
        Text::new(view.settings.slot(axis).name.clone(), at, style)
    };
    chart
        .draw_series([
            tip(SemiAxis::YPositive, (0.0, y_max), HPos::Left, VPos::Top),
            tip(SemiAxis::YNegative, (0.0, y_min), HPos::Left, VPos::Bottom),
            tip(SemiAxis::XNegative, (x_min, 0.0), HPos::Left, VPos::Bottom),
            tip(SemiAxis::XPositive, (x_max, 0.0), HPos::Right, VPos::Bottom),
        ])
        .map_err(render_err)?;

    let radius = options.point_radius;
    chart
        .draw_series(view.projection.valid.iter().map(|p| {
            EmptyElement::at((p.x, p.y))
                + Circle::new((0, 0), radius, POINT_COLOR.filled())
                + Text::new(
                    point_label(p),
                    (radius as i32 + 3, -(radius as i32) - 3),
                    ("sans-serif", font).into_font(),
                )
        }))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}

/// Renders the plot as an SVG document
///
/// # Arguments
/// * `view` - The plot to draw, as built by the workbench
/// * `options` - Size, title and marker settings
///
/// # Returns
/// * `Result<String>` - The SVG markup, or `Error::Render` if plotters fails
///   (for example when no font is available for the labels)
///
/// # Examples
/// ```no_run
/// use cartesian_plot::graph::{GraphOptions, render_svg};
/// use cartesian_plot::model::{AxisConfig, CartesianPlaneConfig, DataPoint, Dimension};
/// use cartesian_plot::projector::PlotView;
///
/// let dims: Vec<Dimension> = (1..=4).map(|i| Dimension::new(i, format!("d{i}"))).collect();
/// let settings = CartesianPlaneConfig::from_first_four(&dims).unwrap();
/// let axis = AxisConfig { id: 1, name: "mood".into(), settings: settings.clone() };
/// let rows = vec![DataPoint::new("bob").with("d1", 2.0).with("d2", 0.0).with("d3", 1.0).with("d4", 0.0)];
///
/// let view = PlotView::build(&axis, &settings, &rows);
/// let svg = render_svg(&view, &GraphOptions::default()).unwrap();
/// std::fs::write("mood.svg", svg).unwrap();
/// ```
pub fn render_svg(view: &PlotView, options: &GraphOptions) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        draw(&root, view, options)?;
    }
    Ok(svg)
}

/// Renders the plot as PNG bytes
///
/// Plotters draws into an in-memory RGB buffer which is then encoded with
/// `image`; nothing touches the filesystem.
///
/// # Arguments
/// * `view` - The plot to draw
/// * `options` - Pixel size; use [`GraphOptions::magnified`] for the full-screen drawer
///
/// # Returns
/// * `Result<Vec<u8>>` - PNG-encoded image or `Error::Render`
pub fn render_png(view: &PlotView, options: &GraphOptions) -> Result<Vec<u8>> {
    let (width, height) = (options.width, options.height);
    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        draw(&root, view, options)?;
    }

    let image = image::RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| Error::Render("pixel buffer has the wrong size".to_string()))?;
    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageOutputFormat::Png)
        .map_err(render_err)?;
    Ok(png.into_inner())
}

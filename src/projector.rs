use crate::domain::PlotDomain;
use crate::model::{AxisConfig, CartesianPlaneConfig, DataPoint, PlotPoint, SemiAxis};
use serde::Serialize;

/// Rows split by whether they can be drawn under one configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Projection {
    pub valid: Vec<PlotPoint>,
    pub invalid: Vec<DataPoint>,
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// Projects one row onto the plane.
///
/// Each display axis is the difference of its two opposing semi-axes:
/// `x = xPositive - xNegative`, `y = yPositive - yNegative`. Returns `None`
/// when any of the four attributes is absent or NaN; a present zero is fine.
pub fn project_point(point: &DataPoint, config: &CartesianPlaneConfig) -> Option<PlotPoint> {
    let value = |axis: SemiAxis| usable(point.attribute(&config.slot(axis).name));

    let x_pos = value(SemiAxis::XPositive)?;
    let x_neg = value(SemiAxis::XNegative)?;
    let y_pos = value(SemiAxis::YPositive)?;
    let y_neg = value(SemiAxis::YNegative)?;

    Some(PlotPoint {
        x: x_pos - x_neg,
        y: y_pos - y_neg,
        name: point.name.clone(),
        annotation: point.annotation.clone(),
    })
}

/// Partitions the whole row collection. Pure; nothing is cached between calls.
///
/// # Arguments
/// * `points` - Every row of the table, in table order
/// * `config` - The four dimensions bound to the semi-axes
///
/// # Returns
/// * `Projection` - Plottable points, and the rows missing at least one of
///   the four values (or holding NaN) kept aside for diagnostics
///
/// # Examples
/// ```
/// use cartesian_plot::model::{CartesianPlaneConfig, DataPoint, Dimension};
/// use cartesian_plot::projector::project;
///
/// let dims: Vec<Dimension> = (1..=4).map(|i| Dimension::new(i, format!("d{i}"))).collect();
/// let config = CartesianPlaneConfig::from_first_four(&dims).unwrap();
/// let rows = vec![
///     DataPoint::new("bob").with("d1", 1.0).with("d2", 3.0).with("d3", 0.0).with("d4", 0.0),
///     DataPoint::new("eve").with("d1", 1.0),
/// ];
///
/// let projection = project(&rows, &config);
/// assert_eq!((projection.valid[0].x, projection.valid[0].y), (-2.0, 0.0));
/// assert_eq!(projection.invalid[0].name, "eve");
/// ```
pub fn project(points: &[DataPoint], config: &CartesianPlaneConfig) -> Projection {
    let mut projection = Projection::default();
    for point in points {
        match project_point(point, config) {
            Some(plotted) => projection.valid.push(plotted),
            None => projection.invalid.push(point.clone()),
        }
    }
    projection
}

/// Everything needed to draw one plot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlotView {
    pub id: i64,
    pub name: String,
    /// Slots actually drawn; differs from the saved ones while previewing.
    pub settings: CartesianPlaneConfig,
    /// True when `settings` holds unsaved changes.
    pub preview: bool,
    pub projection: Projection,
    pub domain: PlotDomain,
}

impl PlotView {
    pub fn build(
        axis: &AxisConfig,
        settings: &CartesianPlaneConfig,
        points: &[DataPoint],
    ) -> Self {
        let projection = project(points, settings);
        let domain = PlotDomain::from_points(&projection.valid);
        PlotView {
            id: axis.id,
            name: axis.name.clone(),
            settings: settings.clone(),
            preview: *settings != axis.settings,
            projection,
            domain,
        }
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.projection.diagnostics(&self.settings)
    }
}

impl Projection {
    pub fn is_empty(&self) -> bool {
        self.valid.is_empty() && self.invalid.is_empty()
    }

    /// One line per unplottable row: its name and the four consulted values in
    /// xNegative, xPositive, yNegative, yPositive order.
    pub fn diagnostics(&self, config: &CartesianPlaneConfig) -> Vec<String> {
        self.invalid
            .iter()
            .map(|row| {
                let values: Vec<String> = SemiAxis::DIAGNOSTIC_ORDER
                    .iter()
                    .map(|axis| {
                        let name = &config.slot(*axis).name;
                        match row.attribute(name) {
                            Some(v) => format!("{name}={v}"),
                            None => format!("{name}=undefined"),
                        }
                    })
                    .collect();
                format!("{}: {}", row.name, values.join(" "))
            })
            .collect()
    }
}

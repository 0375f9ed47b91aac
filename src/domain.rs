use crate::model::PlotPoint;
use serde::Serialize;

/// Symmetric display ranges for the two plot axes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PlotDomain {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

// 20% of the full symmetric span, never less than one unit.
fn padded_range(max_abs: f64) -> [f64; 2] {
    let padding = f64::max(1.0, max_abs * 2.0 * 0.2);
    [(-max_abs - padding).floor(), (max_abs + padding).ceil()]
}

impl PlotDomain {
    pub const DEFAULT: PlotDomain = PlotDomain {
        x: [-10.0, 10.0],
        y: [-10.0, 10.0],
    };

    /// Ranges always stay centred on the origin, whatever the data distribution.
    ///
    /// Each axis spans the largest absolute coordinate plus 20% of the full
    /// span (at least 1), rounded outwards to integers. No points gives
    /// [`PlotDomain::DEFAULT`].
    ///
    /// # Examples
    /// ```
    /// use cartesian_plot::domain::PlotDomain;
    /// use cartesian_plot::model::PlotPoint;
    ///
    /// let p = PlotPoint { x: 3.0, y: -4.0, name: "bob".into(), annotation: String::new() };
    /// let domain = PlotDomain::from_points(&[p]);
    /// assert_eq!(domain.x, [-5.0, 5.0]);
    /// assert_eq!(domain.y, [-6.0, 6.0]);
    /// assert_eq!(PlotDomain::from_points(&[]), PlotDomain::DEFAULT);
    /// ```
    pub fn from_points(points: &[PlotPoint]) -> Self {
        if points.is_empty() {
            return PlotDomain::DEFAULT;
        }
        let max_abs_x = points.iter().map(|p| p.x.abs()).fold(0.0, f64::max);
        let max_abs_y = points.iter().map(|p| p.y.abs()).fold(0.0, f64::max);

        PlotDomain {
            x: padded_range(max_abs_x),
            y: padded_range(max_abs_y),
        }
    }
}

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One table column / measurable attribute.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Dimension {
    pub id: i64,
    pub name: String,
}

impl Dimension {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Dimension {
            id,
            name: name.into(),
        }
    }
}

/// One table row. `attributes` need not cover every dimension.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct DataPoint {
    pub name: String,
    #[serde(default)]
    pub annotation: String,
    #[serde(default, deserialize_with = "attributes_with_nan")]
    pub attributes: BTreeMap<String, f64>,
}

// `null` values are kept as NaN so that "present but not a number" stays
// distinguishable from a missing key.
fn attributes_with_nan<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Option<f64>> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| (k, v.unwrap_or(f64::NAN)))
        .collect())
}

impl DataPoint {
    pub fn new(name: impl Into<String>) -> Self {
        DataPoint {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with(mut self, dimension: &str, value: f64) -> Self {
        self.attributes.insert(dimension.to_string(), value);
        self
    }

    pub fn annotated(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = annotation.into();
        self
    }

    /// Raw attribute lookup: `None` when the key is absent.
    pub fn attribute(&self, dimension: &str) -> Option<f64> {
        self.attributes.get(dimension).copied()
    }

    /// Value shown in the table: missing or NaN reads as zero.
    pub fn display_value(&self, dimension: &str) -> f64 {
        match self.attribute(dimension) {
            Some(v) if !v.is_nan() => v,
            _ => 0.0,
        }
    }
}

/// Full table as returned by `GET /table`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TableData {
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub data_points: Vec<DataPoint>,
}

impl TableData {
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn row(&self, name: &str) -> Option<&DataPoint> {
        self.data_points.iter().find(|r| r.name == name)
    }

    pub fn has_dimension(&self, name: &str) -> bool {
        self.dimension(name).is_some()
    }

    pub fn has_row(&self, name: &str) -> bool {
        self.row(name).is_some()
    }
}

/// One of the four half-axes of a cartesian plot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SemiAxis {
    XPositive,
    XNegative,
    YPositive,
    YNegative,
}

impl SemiAxis {
    pub const ALL: [SemiAxis; 4] = [
        SemiAxis::XPositive,
        SemiAxis::XNegative,
        SemiAxis::YPositive,
        SemiAxis::YNegative,
    ];

    /// Order used when listing the raw values of an unplottable row.
    pub const DIAGNOSTIC_ORDER: [SemiAxis; 4] = [
        SemiAxis::XNegative,
        SemiAxis::XPositive,
        SemiAxis::YNegative,
        SemiAxis::YPositive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemiAxis::XPositive => "xPositive",
            SemiAxis::XNegative => "xNegative",
            SemiAxis::YPositive => "yPositive",
            SemiAxis::YNegative => "yNegative",
        }
    }
}

impl fmt::Display for SemiAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemiAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xpositive" | "x+" => Ok(SemiAxis::XPositive),
            "xnegative" | "x-" => Ok(SemiAxis::XNegative),
            "ypositive" | "y+" => Ok(SemiAxis::YPositive),
            "ynegative" | "y-" => Ok(SemiAxis::YNegative),
            _ => Err(format!("unknown semi-axis '{s}'")),
        }
    }
}

/// Binding of the four semi-axes to dimensions.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CartesianPlaneConfig {
    pub x_positive: Dimension,
    pub x_negative: Dimension,
    pub y_positive: Dimension,
    pub y_negative: Dimension,
}

impl CartesianPlaneConfig {
    pub fn slot(&self, axis: SemiAxis) -> &Dimension {
        match axis {
            SemiAxis::XPositive => &self.x_positive,
            SemiAxis::XNegative => &self.x_negative,
            SemiAxis::YPositive => &self.y_positive,
            SemiAxis::YNegative => &self.y_negative,
        }
    }

    pub fn set_slot(&mut self, axis: SemiAxis, dimension: Dimension) {
        match axis {
            SemiAxis::XPositive => self.x_positive = dimension,
            SemiAxis::XNegative => self.x_negative = dimension,
            SemiAxis::YPositive => self.y_positive = dimension,
            SemiAxis::YNegative => self.y_negative = dimension,
        }
    }

    /// Default binding for a new plot: the first four dimensions in table order.
    pub fn from_first_four(dimensions: &[Dimension]) -> Option<Self> {
        match dimensions {
            [a, b, c, d, ..] => Some(CartesianPlaneConfig {
                x_positive: a.clone(),
                x_negative: b.clone(),
                y_positive: c.clone(),
                y_negative: d.clone(),
            }),
            _ => None,
        }
    }
}

/// A named, persisted plot definition.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct AxisConfig {
    pub id: i64,
    pub name: String,
    pub settings: CartesianPlaneConfig,
}

/// Body of `POST /axis-settings` and `PUT /axis-settings/{id}`. The backend
/// replaces the whole configuration, so all four ids are always sent.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AxisConfigRequest {
    pub name: String,
    pub x_positive_criteria_id: i64,
    pub x_negative_criteria_id: i64,
    pub y_positive_criteria_id: i64,
    pub y_negative_criteria_id: i64,
}

impl AxisConfigRequest {
    pub fn new(name: &str, config: &CartesianPlaneConfig) -> Self {
        AxisConfigRequest {
            name: name.to_string(),
            x_positive_criteria_id: config.x_positive.id,
            x_negative_criteria_id: config.x_negative.id,
            y_positive_criteria_id: config.y_positive.id,
            y_negative_criteria_id: config.y_negative.id,
        }
    }
}

/// Snapshot returned by `GET /export` and accepted (its `data`) by `POST /import`.
///
/// `data` is kept as the backend sent it and written back untouched; its
/// sections are named `columns`/`rows` by the backend, `dimensions`/`dataPoints`
/// by older files. Unknown top-level fields survive in `extra`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ExportSnapshot {
    pub data: Value,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A row projected onto one plot. Derived, never persisted.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    pub name: String,
    pub annotation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_uses_backend_field_names() {
        let json = r#"{
            "dimensions": [{"id": 1, "name": "praise"}],
            "dataPoints": [{"name": "alice", "annotation": "", "attributes": {"praise": 3, "blame": null}}]
        }"#;
        let table: TableData = serde_json::from_str(json).unwrap();
        assert_eq!(table.dimensions[0], Dimension::new(1, "praise"));
        let row = &table.data_points[0];
        assert_eq!(row.attribute("praise"), Some(3.0));
        assert!(row.attribute("blame").unwrap().is_nan());
        assert_eq!(row.attribute("other"), None);
        assert_eq!(row.display_value("blame"), 0.0);
        assert_eq!(row.display_value("other"), 0.0);
    }

    #[test]
    fn request_carries_all_four_ids() {
        let dims: Vec<Dimension> = (1..=4).map(|i| Dimension::new(i, format!("d{i}"))).collect();
        let config = CartesianPlaneConfig::from_first_four(&dims).unwrap();
        let body = serde_json::to_value(AxisConfigRequest::new("plot", &config)).unwrap();
        assert_eq!(body["xPositiveCriteriaId"], 1);
        assert_eq!(body["xNegativeCriteriaId"], 2);
        assert_eq!(body["yPositiveCriteriaId"], 3);
        assert_eq!(body["yNegativeCriteriaId"], 4);
        assert_eq!(body["name"], "plot");
    }

    #[test]
    fn semi_axis_parses_wire_names() {
        for axis in SemiAxis::ALL {
            assert_eq!(axis.as_str().parse::<SemiAxis>(), Ok(axis));
        }
        assert!("z+".parse::<SemiAxis>().is_err());
    }

    #[test]
    fn first_four_needs_four_dimensions() {
        let dims: Vec<Dimension> = (1..=3).map(|i| Dimension::new(i, format!("d{i}"))).collect();
        assert!(CartesianPlaneConfig::from_first_four(&dims).is_none());
    }
}

#![allow(dead_code)]

use cartesian_plot::api::TableApi;
use cartesian_plot::error::{Error, Result};
use cartesian_plot::model::{
    AxisConfig, AxisConfigRequest, CartesianPlaneConfig, DataPoint, Dimension, ExportSnapshot,
    TableData,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    table: TableData,
    axes: Vec<AxisConfig>,
    next_dimension: i64,
    next_axis: i64,
}

/// In-memory backend. Records every call as `"METHOD path"` and can be told
/// to fail a given operation.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<State>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    imported: Mutex<Vec<Value>>,
}

/// Import payload as the backend reads it; older files use the
/// `dimensions`/`dataPoints` spelling.
#[derive(Deserialize)]
struct Incoming {
    #[serde(default, alias = "dimensions")]
    columns: Vec<Dimension>,
    #[serde(default, alias = "dataPoints")]
    rows: Vec<DataPoint>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend preloaded with `dims` columns named d1..dN and the given rows.
    pub fn with_table(dims: usize, rows: Vec<DataPoint>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.lock().unwrap();
            for i in 1..=dims as i64 {
                state.table.dimensions.push(Dimension::new(i, format!("d{i}")));
            }
            state.next_dimension = dims as i64;
            state.table.data_points = rows;
        }
        backend
    }

    pub fn add_axis(&self, name: &str, settings: CartesianPlaneConfig) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_axis += 1;
        let id = state.next_axis;
        state.axes.push(AxisConfig {
            id,
            name: name.to_string(),
            settings,
        });
        id
    }

    /// Removes a plot behind the client's back (another tab, another user).
    pub fn delete_axis_config_direct(&self, id: i64) {
        self.state.lock().unwrap().axes.retain(|a| a.id != id);
    }

    pub fn dims(&self) -> Vec<Dimension> {
        self.state.lock().unwrap().table.dimensions.clone()
    }

    pub fn table_now(&self) -> TableData {
        self.state.lock().unwrap().table.clone()
    }

    pub fn axes_now(&self) -> Vec<AxisConfig> {
        self.state.lock().unwrap().axes.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Every `data` object received by `POST /import`, verbatim.
    pub fn imported(&self) -> Vec<Value> {
        self.imported.lock().unwrap().clone()
    }

    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().unwrap().remove(operation);
    }

    fn record(&self, operation: &'static str, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(operation) {
            return Err(Error::Transport(format!("{operation} unavailable")));
        }
        Ok(())
    }

    fn settings_from(state: &State, request: &AxisConfigRequest) -> Result<CartesianPlaneConfig> {
        let find = |id: i64| {
            state
                .table
                .dimensions
                .iter()
                .find(|d| d.id == id)
                .cloned()
                .ok_or(Error::Server {
                    status: 400,
                    message: format!("unknown criteria {id}"),
                })
        };
        Ok(CartesianPlaneConfig {
            x_positive: find(request.x_positive_criteria_id)?,
            x_negative: find(request.x_negative_criteria_id)?,
            y_positive: find(request.y_positive_criteria_id)?,
            y_negative: find(request.y_negative_criteria_id)?,
        })
    }
}

pub fn settings(dims: &[Dimension]) -> CartesianPlaneConfig {
    CartesianPlaneConfig::from_first_four(dims).unwrap()
}

pub fn yes(_: &str) -> bool {
    true
}

pub fn no(_: &str) -> bool {
    false
}

impl TableApi for MockBackend {
    fn fetch_table(&self) -> Result<TableData> {
        self.record("fetch_table", "GET /table".into())?;
        Ok(self.table_now())
    }

    fn add_column(&self, column_name: &str) -> Result<()> {
        self.record("add_column", "POST /column".into())?;
        let mut state = self.state.lock().unwrap();
        state.next_dimension += 1;
        let id = state.next_dimension;
        state.table.dimensions.push(Dimension::new(id, column_name));
        Ok(())
    }

    fn add_row(&self, name: &str) -> Result<()> {
        self.record("add_row", "POST /row".into())?;
        self.state
            .lock()
            .unwrap()
            .table
            .data_points
            .push(DataPoint::new(name));
        Ok(())
    }

    fn rename_row(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.record("rename_row", format!("PUT /row/{old_name}/name"))?;
        let mut state = self.state.lock().unwrap();
        if let Some(row) = state.table.data_points.iter_mut().find(|r| r.name == old_name) {
            row.name = new_name.to_string();
        }
        Ok(())
    }

    fn update_cell(&self, row_id: &str, column_name: &str, value: f64) -> Result<()> {
        self.record("update_cell", "PUT /cell".into())?;
        let mut state = self.state.lock().unwrap();
        if let Some(row) = state.table.data_points.iter_mut().find(|r| r.name == row_id) {
            row.attributes.insert(column_name.to_string(), value);
        }
        Ok(())
    }

    fn update_annotation(&self, row_id: &str, annotation: &str) -> Result<()> {
        self.record("update_annotation", "PUT /annotation".into())?;
        let mut state = self.state.lock().unwrap();
        if let Some(row) = state.table.data_points.iter_mut().find(|r| r.name == row_id) {
            row.annotation = annotation.to_string();
        }
        Ok(())
    }

    fn delete_column(&self, column_name: &str) -> Result<()> {
        self.record("delete_column", format!("DELETE /column/{column_name}"))?;
        let mut state = self.state.lock().unwrap();
        let referenced = state.axes.iter().any(|a| {
            [
                &a.settings.x_positive,
                &a.settings.x_negative,
                &a.settings.y_positive,
                &a.settings.y_negative,
            ]
            .iter()
            .any(|d| d.name == column_name)
        });
        if referenced {
            return Err(Error::Server {
                status: 409,
                message: "Column is used by an axis setting".to_string(),
            });
        }
        state.table.dimensions.retain(|d| d.name != column_name);
        for row in &mut state.table.data_points {
            row.attributes.remove(column_name);
        }
        Ok(())
    }

    fn delete_row(&self, name: &str) -> Result<()> {
        self.record("delete_row", format!("DELETE /row/{name}"))?;
        self.state
            .lock()
            .unwrap()
            .table
            .data_points
            .retain(|r| r.name != name);
        Ok(())
    }

    fn export_table(&self) -> Result<ExportSnapshot> {
        self.record("export_table", "GET /export".into())?;
        let table = self.table_now();
        Ok(ExportSnapshot {
            data: json!({"columns": table.dimensions, "rows": table.data_points}),
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            version: "1.0".to_string(),
            extra: Map::new(),
        })
    }

    fn import_table(&self, data: &Value) -> Result<()> {
        self.record("import_table", "POST /import".into())?;
        self.imported.lock().unwrap().push(data.clone());
        let data: Incoming = serde_json::from_value(data.clone()).map_err(|e| Error::Server {
            status: 400,
            message: e.to_string(),
        })?;
        let mut state = self.state.lock().unwrap();
        for dimension in &data.columns {
            if !state.table.has_dimension(&dimension.name) {
                state.next_dimension += 1;
                let id = state.next_dimension;
                state.table.dimensions.push(Dimension::new(id, dimension.name.clone()));
            }
        }
        for row in &data.rows {
            state.table.data_points.retain(|r| r.name != row.name);
            state.table.data_points.push(row.clone());
        }
        Ok(())
    }

    fn list_axis_configs(&self) -> Result<Vec<AxisConfig>> {
        self.record("list_axis_configs", "GET /axis-settings".into())?;
        Ok(self.axes_now())
    }

    fn create_axis_config(&self, request: &AxisConfigRequest) -> Result<AxisConfig> {
        self.record("create_axis_config", "POST /axis-settings".into())?;
        let mut state = self.state.lock().unwrap();
        let settings = Self::settings_from(&state, request)?;
        state.next_axis += 1;
        let axis = AxisConfig {
            id: state.next_axis,
            name: request.name.clone(),
            settings,
        };
        state.axes.push(axis.clone());
        Ok(axis)
    }

    fn update_axis_config(&self, id: i64, request: &AxisConfigRequest) -> Result<AxisConfig> {
        self.record("update_axis_config", format!("PUT /axis-settings/{id}"))?;
        let mut state = self.state.lock().unwrap();
        let settings = Self::settings_from(&state, request)?;
        let axis = state
            .axes
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(Error::Server {
                status: 404,
                message: "Axis setting not found".to_string(),
            })?;
        axis.name = request.name.clone();
        axis.settings = settings;
        Ok(axis.clone())
    }

    fn delete_axis_config(&self, id: i64) -> Result<()> {
        self.record("delete_axis_config", format!("DELETE /axis-settings/{id}"))?;
        self.state.lock().unwrap().axes.retain(|a| a.id != id);
        Ok(())
    }
}

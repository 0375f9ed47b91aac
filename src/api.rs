//! The backend REST collaborator.
//!
//! | Operation            | Request                         |
//! |----------------------|---------------------------------|
//! | fetch table          | `GET /table`                    |
//! | add dimension        | `POST /column`                  |
//! | add row              | `POST /row`                     |
//! | rename row           | `PUT /row/{old_name}/name`      |
//! | update cell          | `PUT /cell`                     |
//! | update annotation    | `PUT /annotation`               |
//! | delete dimension     | `DELETE /column/{name}`         |
//! | delete row           | `DELETE /row/{name}`            |
//! | export               | `GET /export`                   |
//! | import               | `POST /import`                  |
//! | list axis configs    | `GET /axis-settings`            |
//! | create axis config   | `POST /axis-settings`           |
//! | update axis config   | `PUT /axis-settings/{id}`       |
//! | delete axis config   | `DELETE /axis-settings/{id}`    |
//!
//! The backend is the only persistent owner of tables and plots; callers
//! refresh the relevant collection wholesale after each mutation.

use crate::error::Result;
use crate::model::{AxisConfig, AxisConfigRequest, ExportSnapshot, TableData};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Synchronous client for the table backend.
///
/// `Sync` so that batched updates can be sent from several threads at once.
pub trait TableApi: Sync {
    fn fetch_table(&self) -> Result<TableData>;
    fn add_column(&self, column_name: &str) -> Result<()>;
    fn add_row(&self, name: &str) -> Result<()>;
    fn rename_row(&self, old_name: &str, new_name: &str) -> Result<()>;
    fn update_cell(&self, row_id: &str, column_name: &str, value: f64) -> Result<()>;
    fn update_annotation(&self, row_id: &str, annotation: &str) -> Result<()>;
    fn delete_column(&self, column_name: &str) -> Result<()>;
    fn delete_row(&self, name: &str) -> Result<()>;
    fn export_table(&self) -> Result<ExportSnapshot>;
    /// Merge import: rows and columns matching by name are overwritten.
    /// `data` is the snapshot's `data` object, sent as is.
    fn import_table(&self, data: &Value) -> Result<()>;
    fn list_axis_configs(&self) -> Result<Vec<AxisConfig>>;
    fn create_axis_config(&self, request: &AxisConfigRequest) -> Result<AxisConfig>;
    fn update_axis_config(&self, id: i64, request: &AxisConfigRequest) -> Result<AxisConfig>;
    fn delete_axis_config(&self, id: i64) -> Result<()>;

    /// Replace the bearer token sent with later requests.
    fn set_token(&mut self, _token: Option<String>) {}
}

// Request bodies, named after the backend's JSON fields.

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct AddColumnBody<'a> {
    pub column_name: &'a str,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct AddRowBody<'a> {
    pub name: &'a str,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct RenameRowBody<'a> {
    pub new_name: &'a str,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct UpdateCellBody<'a> {
    pub row_id: &'a str,
    pub column_name: &'a str,
    pub value: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct UpdateAnnotationBody<'a> {
    pub row_id: &'a str,
    pub annotation: &'a str,
}

#[derive(Serialize, Debug)]
pub struct ImportBody<'a> {
    pub data: &'a Value,
}

/// Error payload the backend sends with 4xx/5xx responses.
#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

use crate::api::TableApi;
use crate::edit::{Confirm, TableEdit};
use crate::error::{Error, Result};
use crate::model::{ExportSnapshot, TableData};
use crate::saving;
use log::{error, info};
use serde_json::Value;

/// Progress of the last fetch of a cached collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Unloaded,
    /// First fetch in flight; nothing to show yet.
    Loading,
    /// Re-fetch in flight; the previous data is still shown.
    Refreshing,
    Ready,
    /// Last fetch failed. Previously loaded data is kept.
    Failed,
}

/// Client-side cache of dimensions and rows.
///
/// The backend owns the table. Every mutation goes straight to the API and is
/// followed by a full re-fetch; nothing is merged locally.
#[derive(Debug, Default)]
pub struct TableStore {
    data: TableData,
    status: FetchStatus,
    loaded: bool,
    last_error: Option<String>,
}

/// Checks a name for a new column or row: not blank and not already taken.
pub fn validate_new_name<'a>(
    name: &str,
    existing: impl IntoIterator<Item = &'a str>,
    kind: &str,
) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation(format!("{kind} name cannot be empty.")));
    }
    if existing.into_iter().any(|n| n == name) {
        return Err(Error::validation(format!(
            "A {} with the same name already exists. Please choose another name.",
            kind.to_lowercase()
        )));
    }
    Ok(name.to_string())
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &TableData {
        &self.data
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    pub fn is_refreshing(&self) -> bool {
        self.status == FetchStatus::Refreshing
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Re-fetch dimensions and rows together.
    pub fn refresh<A: TableApi + ?Sized>(&mut self, api: &A) -> Result<()> {
        self.status = if self.loaded {
            FetchStatus::Refreshing
        } else {
            FetchStatus::Loading
        };
        match api.fetch_table() {
            Ok(data) => {
                self.data = data;
                self.loaded = true;
                self.status = FetchStatus::Ready;
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                error!("Error fetching table: {}", err);
                self.status = FetchStatus::Failed;
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn add_column<A: TableApi + ?Sized>(&mut self, api: &A, name: &str) -> Result<()> {
        let existing = self.data.dimensions.iter().map(|d| d.name.as_str());
        let name = validate_new_name(name, existing, "Column")?;
        api.add_column(&name).inspect_err(|e| error!("Error adding column: {}", e))?;
        info!("added column {}", name);
        self.refresh(api)
    }

    pub fn add_row<A: TableApi + ?Sized>(&mut self, api: &A, name: &str) -> Result<()> {
        let existing = self.data.data_points.iter().map(|r| r.name.as_str());
        let name = validate_new_name(name, existing, "Row")?;
        api.add_row(&name).inspect_err(|e| error!("Error adding row: {}", e))?;
        info!("added row {}", name);
        self.refresh(api)
    }

    /// Deletes a column (and its value in every row) after confirmation.
    /// Returns `Ok(false)` if the user declined.
    pub fn delete_column<A: TableApi + ?Sized>(
        &mut self,
        api: &A,
        name: &str,
        confirm: &mut dyn Confirm,
    ) -> Result<bool> {
        let prompt = format!(
            "Delete column '{name}'? Its values will be removed from every row."
        );
        if !confirm.confirm(&prompt) {
            return Ok(false);
        }
        api.delete_column(name)
            .inspect_err(|e| error!("Error deleting column {}: {}", name, e))?;
        self.refresh(api)?;
        Ok(true)
    }

    pub fn delete_row<A: TableApi + ?Sized>(
        &mut self,
        api: &A,
        name: &str,
        confirm: &mut dyn Confirm,
    ) -> Result<bool> {
        if !confirm.confirm(&format!("Delete row '{name}'?")) {
            return Ok(false);
        }
        api.delete_row(name)
            .inspect_err(|e| error!("Error deleting row {}: {}", name, e))?;
        self.refresh(api)?;
        Ok(true)
    }

    /// Sends a committed cell, annotation or row-name edit, then re-fetches.
    pub fn apply<A: TableApi + ?Sized>(&mut self, api: &A, edit: &TableEdit) -> Result<()> {
        let sent = match edit {
            TableEdit::Cell { row, column, value } => api.update_cell(row, column, *value),
            TableEdit::Annotation { row, annotation } => api.update_annotation(row, annotation),
            TableEdit::RenameRow { from, to } => api.rename_row(from, to),
        };
        sent.inspect_err(|e| error!("Error applying {:?}: {}", edit, e))?;
        self.refresh(api)
    }

    pub fn export<A: TableApi + ?Sized>(&self, api: &A) -> Result<ExportSnapshot> {
        api.export_table()
            .inspect_err(|e| error!("Error exporting table: {}", e))
    }

    /// Merges `data` into the backend table after confirmation. Rows and
    /// columns with matching names are overwritten.
    pub fn import<A: TableApi + ?Sized>(
        &mut self,
        api: &A,
        data: &Value,
        confirm: &mut dyn Confirm,
    ) -> Result<bool> {
        let (columns, rows) = saving::table_sections(data)?;
        let prompt = "Importing merges the file into the existing table. Rows and columns \
                      with the same names will be overwritten. Continue?";
        if !confirm.confirm(prompt) {
            return Ok(false);
        }
        api.import_table(data)
            .inspect_err(|e| error!("Error importing table: {}", e))?;
        info!("imported {} columns and {} rows", columns.len(), rows.len());
        self.refresh(api)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_names_are_trimmed_and_checked() {
        assert_eq!(
            validate_new_name("  speed ", ["size"], "Column").unwrap(),
            "speed"
        );
        assert!(validate_new_name("   ", ["size"], "Column").is_err());
        let dup = validate_new_name("size", ["size"], "Row").unwrap_err();
        assert!(dup.to_string().contains("row with the same name"));
    }
}

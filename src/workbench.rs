//! One user's session against the backend: both caches, the editor and the
//! stored token. Front ends (the CLI and the browser viewer) drive everything
//! through this type and only render what it returns.
//!
//! Failures are logged where they happen and always returned, so every front
//! end can show them next to the action that triggered them.

use crate::api::TableApi;
use crate::auth::TokenStore;
use crate::axis_store::{AxisConfigStore, AxisDraft, Selection};
use crate::config::Config;
use crate::edit::{Commit, Confirm, EditKey, Editor, Mutation};
use crate::error::{Error, Result};
use crate::model::{CartesianPlaneConfig, Dimension, ExportSnapshot, SemiAxis, TableData};
use crate::projector::PlotView;
use crate::saving;
use crate::table_store::TableStore;
use log::{error, info};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub struct Workbench<A: TableApi> {
    config: Config,
    api: A,
    tokens: TokenStore,
    table: TableStore,
    axes: AxisConfigStore,
    editor: Editor,
}

// Axis commits never ask for confirmation.
fn no_prompt(_: &str) -> bool {
    true
}

impl<A: TableApi> Workbench<A> {
    pub fn new(config: Config, api: A) -> Self {
        let tokens = TokenStore::new(config.token_path.clone());
        let axes = AxisConfigStore::new(config.debounce);
        Workbench {
            config,
            api,
            tokens,
            table: TableStore::new(),
            axes,
            editor: Editor::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn table(&self) -> &TableData {
        self.table.data()
    }

    pub fn table_store(&self) -> &TableStore {
        &self.table
    }

    pub fn axes(&self) -> &AxisConfigStore {
        &self.axes
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn greeting(&self) -> String {
        format!("Hello, {}", self.config.nickname)
    }

    /// Fetches the table and the plot list independently. Both are attempted;
    /// the first failure is returned.
    pub fn refresh_all(&mut self) -> Result<()> {
        let table = self.table.refresh(&self.api);
        let axes = self.axes.refresh(&self.api);
        table.and(axes)
    }

    // Table

    pub fn add_column(&mut self, name: &str) -> Result<()> {
        self.table.add_column(&self.api, name)
    }

    pub fn add_row(&mut self, name: &str) -> Result<()> {
        self.table.add_row(&self.api, name)
    }

    /// Deleting a column also refreshes the plots, since the backend may have
    /// refused or cascaded the change.
    pub fn delete_column(&mut self, name: &str, confirm: &mut dyn Confirm) -> Result<bool> {
        let deleted = self.table.delete_column(&self.api, name, confirm)?;
        if deleted {
            self.axes.refresh(&self.api)?;
        }
        Ok(deleted)
    }

    pub fn delete_row(&mut self, name: &str, confirm: &mut dyn Confirm) -> Result<bool> {
        self.table.delete_row(&self.api, name, confirm)
    }

    fn require_row(&self, row: &str) -> Result<()> {
        if self.table().has_row(row) {
            Ok(())
        } else {
            Err(Error::validation(format!("No row named '{row}'.")))
        }
    }

    fn require_dimension(&self, name: &str) -> Result<Dimension> {
        self.table()
            .dimension(name)
            .cloned()
            .ok_or_else(|| Error::validation(format!("No column named '{name}'.")))
    }

    // Editing

    pub fn open_cell(&mut self, row: &str, column: &str) -> Result<()> {
        self.require_row(row)?;
        self.require_dimension(column)?;
        let current = self
            .table()
            .row(row)
            .map_or(0.0, |r| r.display_value(column));
        self.editor.open_cell(row, column, current);
        Ok(())
    }

    pub fn open_annotation(&mut self, row: &str) -> Result<()> {
        self.require_row(row)?;
        let current = self
            .table()
            .row(row)
            .map(|r| r.annotation.clone())
            .unwrap_or_default();
        self.editor.open_annotation(row, &current);
        Ok(())
    }

    pub fn open_row_name(&mut self, row: &str) -> Result<()> {
        self.require_row(row)?;
        self.editor.open_row_name(row);
        Ok(())
    }

    pub fn input(&mut self, text: &str) -> bool {
        self.editor.input(text)
    }

    pub fn press(&mut self, key: EditKey, confirm: &mut dyn Confirm) -> Result<Commit> {
        let commit = self
            .editor
            .handle_key(key, self.table.data(), self.axes.configs(), confirm);
        self.send(commit)
    }

    /// Commit whatever editor is open, including an axis preview ("Save Changes").
    pub fn commit(&mut self, confirm: &mut dyn Confirm) -> Result<Commit> {
        let commit = self
            .editor
            .commit(self.table.data(), self.axes.configs(), confirm);
        self.send(commit)
    }

    pub fn save_axis(&mut self) -> Result<Commit> {
        self.commit(&mut no_prompt)
    }

    pub fn cancel_edit(&mut self) {
        self.editor.cancel();
    }

    fn send(&mut self, commit: Commit) -> Result<Commit> {
        if let Commit::Request(mutation) = &commit {
            match mutation {
                Mutation::Table(edit) => self.table.apply(&self.api, edit)?,
                Mutation::Axis { id, config } => {
                    if let Err(err) = self.axes.update_settings(&self.api, *id, config) {
                        // keep the preview so the user can retry or cancel
                        self.editor.reopen_axis(*id, config.clone());
                        return Err(err);
                    }
                }
            }
        }
        Ok(commit)
    }

    // Plots

    /// Starts (or continues) a local preview of `id` with one slot rebound.
    pub fn change_axis_slot(&mut self, id: i64, slot: SemiAxis, column: &str) -> Result<()> {
        let dimension = self.require_dimension(column)?;
        let axis = self.axes.get(id).ok_or(Error::UnknownAxis(id))?;
        self.editor.change_axis_slot(axis, slot, dimension);
        Ok(())
    }

    /// Settings a plot is drawn with: an open preview first, then queued
    /// inline changes, then what the backend has.
    pub fn display_settings(&self, id: i64) -> Option<CartesianPlaneConfig> {
        if let Some(pending) = self.editor.pending_axis(id) {
            return Some(pending.clone());
        }
        if let Some(queued) = self.axes.queued(id) {
            return Some(queued.clone());
        }
        self.axes.get(id).map(|a| a.settings.clone())
    }

    pub fn is_dirty(&self, id: i64) -> bool {
        self.editor.pending_axis(id).is_some() || self.axes.queued(id).is_some()
    }

    pub fn plot(&self, id: i64) -> Result<PlotView> {
        let axis = self.axes.get(id).ok_or(Error::UnknownAxis(id))?;
        let settings = self
            .display_settings(id)
            .unwrap_or_else(|| axis.settings.clone());
        Ok(PlotView::build(axis, &settings, &self.table().data_points))
    }

    pub fn selected_plot(&self) -> Option<PlotView> {
        let id = self.axes.selection().id()?;
        self.plot(id).ok()
    }

    pub fn select(&mut self, selection: Selection) -> Result<()> {
        self.axes.select(selection)
    }

    pub fn axis_draft(&self) -> Result<AxisDraft> {
        AxisConfigStore::draft(self.table())
    }

    pub fn create_axis(&mut self, draft: &AxisDraft) -> Result<i64> {
        self.axes.create(&self.api, draft, self.table.data())
    }

    pub fn rename_axis(&mut self, id: i64, name: &str) -> Result<bool> {
        self.axes.rename(&self.api, id, name)
    }

    pub fn request_delete_axis(&mut self, id: i64) -> Result<()> {
        self.axes.request_delete(id)
    }

    pub fn cancel_delete_axis(&mut self) {
        self.axes.cancel_delete();
    }

    pub fn confirm_delete_axis(&mut self) -> Result<Option<i64>> {
        let deleted = self.axes.confirm_delete(&self.api)?;
        if let Some(id) = deleted {
            if self.editor.pending_axis(id).is_some() {
                self.editor.cancel();
            }
        }
        Ok(deleted)
    }

    /// Request, confirm and delete in one go. Returns `Ok(false)` if declined.
    pub fn delete_axis(&mut self, id: i64, confirm: &mut dyn Confirm) -> Result<bool> {
        let name = self
            .axes
            .get(id)
            .map(|a| a.name.clone())
            .ok_or(Error::UnknownAxis(id))?;
        self.request_delete_axis(id)?;
        if !confirm.confirm(&format!("Delete plot '{name}'?")) {
            self.cancel_delete_axis();
            return Ok(false);
        }
        // the prompt is gone either way
        if let Err(e) = self.confirm_delete_axis() {
            self.cancel_delete_axis();
            return Err(e);
        }
        Ok(true)
    }

    /// Inline slot change without Save/Cancel: previewed at once, persisted by
    /// the next [`Workbench::flush_due`] after the quiet period.
    pub fn queue_axis_slot(
        &mut self,
        id: i64,
        slot: SemiAxis,
        column: &str,
        now: Instant,
    ) -> Result<()> {
        let dimension = self.require_dimension(column)?;
        let mut settings = match self.axes.queued(id) {
            Some(queued) => queued.clone(),
            None => self.axes.get(id).ok_or(Error::UnknownAxis(id))?.settings.clone(),
        };
        settings.set_slot(slot, dimension);
        self.axes.queue_update(id, settings, now)
    }

    pub fn flush_deadline(&self) -> Option<Instant> {
        self.axes.flush_deadline()
    }

    pub fn flush_due(&mut self, now: Instant) -> Result<usize> {
        self.axes.flush_due(&self.api, now)
    }

    // Snapshots

    pub fn export_snapshot(&self) -> Result<ExportSnapshot> {
        self.table.export(&self.api)
    }

    /// Writes the snapshot to `target`. A directory gets the dated default name.
    pub fn export_to(&self, target: &Path) -> Result<PathBuf> {
        let snapshot = self.export_snapshot()?;
        let path = if target.is_dir() {
            target.join(saving::default_export_name())
        } else {
            target.to_path_buf()
        };
        saving::save_snapshot(&snapshot, &path)
            .inspect_err(|e| error!("Error writing {}: {}", path.display(), e))?;
        Ok(path)
    }

    /// Validates a snapshot file locally, then merges it into the backend table.
    pub fn import_from(&mut self, path: &Path, confirm: &mut dyn Confirm) -> Result<bool> {
        let data = saving::load_import(path)
            .inspect_err(|e| error!("Error reading {}: {}", path.display(), e))?;
        self.import_data(&data, confirm)
    }

    pub fn import_data(&mut self, data: &Value, confirm: &mut dyn Confirm) -> Result<bool> {
        let imported = self.table.import(&self.api, data, confirm)?;
        if imported {
            self.axes.refresh(&self.api)?;
        }
        Ok(imported)
    }

    // Token

    pub fn login(&mut self, token: &str) -> Result<()> {
        self.tokens.save(token)?;
        self.api.set_token(self.tokens.load());
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        self.tokens.clear()?;
        self.api.set_token(None);
        info!("logged out");
        Ok(())
    }
}

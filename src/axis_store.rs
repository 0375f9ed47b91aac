//! Named plot definitions and the currently displayed one.
//!
//! The list is a cache of `GET /axis-settings`. Writes go to the backend and
//! are followed by one wholesale refresh. Inline slot changes can be queued
//! and flushed together after a quiet period instead of one PUT per change.

use crate::api::TableApi;
use crate::debounce::Debouncer;
use crate::error::{Error, Result};
use crate::model::{AxisConfig, AxisConfigRequest, CartesianPlaneConfig, Dimension, TableData};
use crate::table_store::FetchStatus;
use lazy_static::lazy_static;
use log::{error, info, warn};
use regex::Regex;
use std::thread;
use std::time::{Duration, Instant};

lazy_static! {
    static ref TAB_KEY: Regex = Regex::new(r"^axis-(\d+)$").unwrap();
}

/// Minimum number of dimensions before a plot can be defined.
pub const MIN_DIMENSIONS: usize = 4;

/// Which plot is active. Local state, never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Axis(i64),
}

impl Selection {
    /// Tab key used for the "nothing selected" state.
    pub const NONE_KEY: &'static str = "0";

    pub fn id(&self) -> Option<i64> {
        match self {
            Selection::None => None,
            Selection::Axis(id) => Some(*id),
        }
    }

    /// Tab key form: `axis-<id>`, or `"0"` for none.
    pub fn key(&self) -> String {
        match self {
            Selection::None => Self::NONE_KEY.to_string(),
            Selection::Axis(id) => format!("axis-{id}"),
        }
    }

    pub fn from_key(key: &str) -> Option<Selection> {
        if key == Self::NONE_KEY {
            return Some(Selection::None);
        }
        let caps = TAB_KEY.captures(key)?;
        caps[1].parse().ok().map(Selection::Axis)
    }
}

/// Form state for a plot that has not been created yet.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisDraft {
    pub name: String,
    pub settings: CartesianPlaneConfig,
}

/// Selection to fall back to when `deleted` disappears from `configs`:
/// the config right before it, else the first other one, else none.
pub fn replacement_after_delete(configs: &[AxisConfig], deleted: i64) -> Selection {
    let Some(index) = configs.iter().position(|c| c.id == deleted) else {
        return configs
            .first()
            .map_or(Selection::None, |c| Selection::Axis(c.id));
    };
    if index > 0 {
        return Selection::Axis(configs[index - 1].id);
    }
    configs
        .iter()
        .find(|c| c.id != deleted)
        .map_or(Selection::None, |c| Selection::Axis(c.id))
}

fn validate_tab_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Please enter tab name"));
    }
    Ok(name.to_string())
}

#[derive(Debug)]
pub struct AxisConfigStore {
    configs: Vec<AxisConfig>,
    status: FetchStatus,
    loaded: bool,
    selection: Selection,
    pending_delete: Option<i64>,
    queued: Debouncer<i64, CartesianPlaneConfig>,
}

impl AxisConfigStore {
    pub fn new(debounce: Duration) -> Self {
        AxisConfigStore {
            configs: Vec::new(),
            status: FetchStatus::Unloaded,
            loaded: false,
            selection: Selection::None,
            pending_delete: None,
            queued: Debouncer::new(debounce),
        }
    }

    pub fn configs(&self) -> &[AxisConfig] {
        &self.configs
    }

    pub fn get(&self, id: i64) -> Option<&AxisConfig> {
        self.configs.iter().find(|c| c.id == id)
    }

    fn require(&self, id: i64) -> Result<&AxisConfig> {
        self.get(id).ok_or(Error::UnknownAxis(id))
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

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn selected(&self) -> Option<&AxisConfig> {
        self.selection.id().and_then(|id| self.get(id))
    }

    pub fn select(&mut self, selection: Selection) -> Result<()> {
        if let Selection::Axis(id) = selection {
            self.require(id)?;
        }
        self.selection = selection;
        Ok(())
    }

    pub fn pending_delete(&self) -> Option<i64> {
        self.pending_delete
    }

    /// Re-fetch the list, drop queued edits for vanished plots and repair the
    /// selection. The previous list is kept if the fetch fails.
    pub fn refresh<A: TableApi + ?Sized>(&mut self, api: &A) -> Result<()> {
        self.status = if self.loaded {
            FetchStatus::Refreshing
        } else {
            FetchStatus::Loading
        };
        let configs = match api.list_axis_configs() {
            Ok(configs) => configs,
            Err(err) => {
                error!("Error fetching axis settings: {}", err);
                self.status = FetchStatus::Failed;
                return Err(err);
            }
        };
        self.configs = configs;
        self.loaded = true;
        self.status = FetchStatus::Ready;

        let before = self.queued.len();
        let configs = &self.configs;
        self.queued.retain(|id| configs.iter().any(|c| c.id == *id));
        if self.queued.len() < before {
            warn!("dropped {} queued update(s) for deleted plots", before - self.queued.len());
        }
        self.heal_selection();
        Ok(())
    }

    fn heal_selection(&mut self) {
        if self.configs.is_empty() {
            self.selection = Selection::None;
            return;
        }
        if self.pending_delete.is_some() {
            return;
        }
        let valid = matches!(self.selection, Selection::Axis(id) if self.get(id).is_some());
        if !valid {
            self.selection = Selection::Axis(self.configs[0].id);
        }
    }

    pub fn can_create(dimensions: &[Dimension]) -> bool {
        dimensions.len() >= MIN_DIMENSIONS
    }

    /// Starting point for the create form: empty name, first four dimensions.
    pub fn draft(table: &TableData) -> Result<AxisDraft> {
        let settings = CartesianPlaneConfig::from_first_four(&table.dimensions).ok_or_else(|| {
            Error::validation(format!(
                "At least {MIN_DIMENSIONS} columns are needed to create a plot."
            ))
        })?;
        Ok(AxisDraft {
            name: String::new(),
            settings,
        })
    }

    /// Creates the plot and makes it the active selection. Returns its id.
    pub fn create<A: TableApi + ?Sized>(
        &mut self,
        api: &A,
        draft: &AxisDraft,
        table: &TableData,
    ) -> Result<i64> {
        let name = validate_tab_name(&draft.name)?;
        if !Self::can_create(&table.dimensions) {
            return Err(Error::validation(format!(
                "At least {MIN_DIMENSIONS} columns are needed to create a plot."
            )));
        }
        for axis in crate::model::SemiAxis::ALL {
            let slot = draft.settings.slot(axis);
            if !table.dimensions.iter().any(|d| d.id == slot.id) {
                return Err(Error::validation(format!(
                    "Column '{}' selected for {} no longer exists.",
                    slot.name, axis
                )));
            }
        }

        let request = AxisConfigRequest::new(&name, &draft.settings);
        let created = api
            .create_axis_config(&request)
            .inspect_err(|e| error!("Error creating axis setting: {}", e))?;
        info!("created plot {} ({})", created.name, created.id);
        self.refresh(api)?;

        let id = match self.get(created.id) {
            Some(c) => c.id,
            None => self
                .configs
                .iter()
                .find(|c| c.name == name)
                .map_or(created.id, |c| c.id),
        };
        if self.get(id).is_some() {
            self.selection = Selection::Axis(id);
        }
        Ok(id)
    }

    /// Renames a plot. Returns `Ok(false)` without a request when the name is unchanged.
    pub fn rename<A: TableApi + ?Sized>(&mut self, api: &A, id: i64, name: &str) -> Result<bool> {
        let name = validate_tab_name(name)?;
        let current = self.require(id)?;
        if current.name == name {
            return Ok(false);
        }
        let request = AxisConfigRequest::new(&name, &current.settings);
        api.update_axis_config(id, &request)
            .inspect_err(|e| error!("Error renaming axis setting {}: {}", id, e))?;
        self.refresh(api)?;
        Ok(true)
    }

    /// Saves all four slots of one plot in a single PUT.
    pub fn update_settings<A: TableApi + ?Sized>(
        &mut self,
        api: &A,
        id: i64,
        settings: &CartesianPlaneConfig,
    ) -> Result<()> {
        let current = self.require(id)?;
        let request = AxisConfigRequest::new(&current.name, settings);
        api.update_axis_config(id, &request)
            .inspect_err(|e| error!("Error updating axis setting {}: {}", id, e))?;
        self.refresh(api)
    }

    /// Marks `id` as awaiting confirmation. Selection repair is paused meanwhile.
    pub fn request_delete(&mut self, id: i64) -> Result<()> {
        self.require(id)?;
        self.pending_delete = Some(id);
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Deletes the plot awaiting confirmation. Returns the deleted id, or
    /// `None` if nothing was pending.
    pub fn confirm_delete<A: TableApi + ?Sized>(&mut self, api: &A) -> Result<Option<i64>> {
        let Some(id) = self.pending_delete else {
            return Ok(None);
        };
        let replacement = replacement_after_delete(&self.configs, id);
        // a failed delete stays pending so it can be retried or cancelled
        api.delete_axis_config(id)
            .inspect_err(|e| error!("Error deleting axis setting {}: {}", id, e))?;
        self.pending_delete = None;
        info!("deleted plot {}", id);
        if self.selection == Selection::Axis(id) {
            self.selection = replacement;
        }
        self.refresh(api)?;
        Ok(Some(id))
    }

    /// Queue a full slot configuration for `id`; restarts the quiet period.
    pub fn queue_update(&mut self, id: i64, settings: CartesianPlaneConfig, now: Instant) -> Result<()> {
        self.require(id)?;
        self.queued.push(id, settings, now);
        Ok(())
    }

    pub fn queued(&self, id: i64) -> Option<&CartesianPlaneConfig> {
        self.queued.get(&id)
    }

    pub fn has_queued(&self) -> bool {
        !self.queued.is_empty()
    }

    pub fn flush_deadline(&self) -> Option<Instant> {
        self.queued.deadline()
    }

    /// Sends every queued update once the quiet period has passed.
    ///
    /// The PUTs run in parallel; afterwards the list is refreshed exactly once,
    /// whether or not the individual writes succeeded. Returns how many
    /// updates were sent, or the first error.
    pub fn flush_due<A: TableApi + ?Sized>(&mut self, api: &A, now: Instant) -> Result<usize> {
        let Some(batch) = self.queued.take_due(now) else {
            return Ok(0);
        };
        let requests: Vec<(i64, AxisConfigRequest)> = batch
            .into_iter()
            .filter_map(|(id, settings)| {
                self.get(id)
                    .map(|c| (id, AxisConfigRequest::new(&c.name, &settings)))
            })
            .collect();
        if requests.is_empty() {
            return Ok(0);
        }

        let results: Vec<Result<AxisConfig>> = thread::scope(|scope| {
            let handles: Vec<_> = requests
                .iter()
                .map(|(id, request)| scope.spawn(move || api.update_axis_config(*id, request)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(Error::Transport("update worker panicked".into())))
                })
                .collect()
        });

        let mut first_error = None;
        for ((id, _), result) in requests.iter().zip(results) {
            if let Err(err) = result {
                error!("Error updating axis setting {}: {}", id, err);
                first_error.get_or_insert(err);
            }
        }
        info!("flushed {} axis update(s)", requests.len());
        let refreshed = self.refresh(api);
        match first_error {
            Some(err) => Err(err),
            None => refreshed.map(|_| requests.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(id: i64) -> AxisConfig {
        let d = Dimension::new(1, "a");
        AxisConfig {
            id,
            name: format!("plot {id}"),
            settings: CartesianPlaneConfig {
                x_positive: d.clone(),
                x_negative: d.clone(),
                y_positive: d.clone(),
                y_negative: d,
            },
        }
    }

    #[test]
    fn replacement_prefers_previous_then_first() {
        let configs = vec![axis(1), axis(2), axis(3)];
        assert_eq!(replacement_after_delete(&configs, 2), Selection::Axis(1));
        assert_eq!(replacement_after_delete(&configs, 3), Selection::Axis(2));
        assert_eq!(replacement_after_delete(&configs, 1), Selection::Axis(2));
        assert_eq!(replacement_after_delete(&[axis(5)], 5), Selection::None);
    }

    #[test]
    fn tab_keys() {
        assert_eq!(Selection::Axis(12).key(), "axis-12");
        assert_eq!(Selection::None.key(), "0");
        assert_eq!(Selection::from_key("axis-12"), Some(Selection::Axis(12)));
        assert_eq!(Selection::from_key("0"), Some(Selection::None));
        assert_eq!(Selection::from_key("axis-"), None);
        assert_eq!(Selection::from_key("tab-3"), None);
    }

    #[test]
    fn empty_tab_name_is_rejected() {
        let err = validate_tab_name("  ").unwrap_err();
        assert_eq!(err.to_string(), "Please enter tab name");
        assert_eq!(validate_tab_name(" p ").unwrap(), "p");
    }

    #[test]
    fn draft_uses_first_four_dimensions() {
        let table = TableData {
            dimensions: (1..=5).map(|i| Dimension::new(i, format!("d{i}"))).collect(),
            data_points: vec![],
        };
        let draft = AxisConfigStore::draft(&table).unwrap();
        assert_eq!(draft.settings.x_positive.name, "d1");
        assert_eq!(draft.settings.x_negative.name, "d2");
        assert_eq!(draft.settings.y_positive.name, "d3");
        assert_eq!(draft.settings.y_negative.name, "d4");

        let small = TableData {
            dimensions: table.dimensions[..3].to_vec(),
            data_points: vec![],
        };
        assert!(AxisConfigStore::draft(&small).is_err());
    }
}

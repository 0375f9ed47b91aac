mod common;

use cartesian_plot::axis_store::{AxisConfigStore, AxisDraft, Selection};
use cartesian_plot::error::Error;
use cartesian_plot::model::{SemiAxis, TableData};
use common::{MockBackend, settings};
use std::time::{Duration, Instant};

const QUIET: Duration = Duration::from_millis(1000);

fn backend_with_axes(names: &[&str]) -> (MockBackend, Vec<i64>) {
    let backend = MockBackend::with_table(5, vec![]);
    let ids = names
        .iter()
        .map(|n| backend.add_axis(n, settings(&backend.dims())))
        .collect();
    (backend, ids)
}

fn loaded(backend: &MockBackend) -> AxisConfigStore {
    let mut store = AxisConfigStore::new(QUIET);
    store.refresh(backend).unwrap();
    backend.clear_calls();
    store
}

#[test]
fn first_load_selects_first_plot() {
    let (backend, ids) = backend_with_axes(&["A", "B"]);
    let store = loaded(&backend);
    assert_eq!(store.selection(), Selection::Axis(ids[0]));
    assert_eq!(store.selected().unwrap().name, "A");
}

#[test]
fn empty_list_selects_none() {
    let backend = MockBackend::with_table(5, vec![]);
    let store = loaded(&backend);
    assert_eq!(store.selection(), Selection::None);
    assert!(store.selected().is_none());
}

#[test]
fn deleting_the_active_middle_plot_selects_the_previous() {
    let (backend, ids) = backend_with_axes(&["A", "B", "C"]);
    let mut store = loaded(&backend);
    store.select(Selection::Axis(ids[1])).unwrap();

    store.request_delete(ids[1]).unwrap();
    assert_eq!(store.confirm_delete(&backend).unwrap(), Some(ids[1]));
    assert_eq!(store.selection(), Selection::Axis(ids[0]));
    assert_eq!(store.configs().len(), 2);
}

#[test]
fn deleting_the_first_plot_selects_the_next_remaining() {
    let (backend, ids) = backend_with_axes(&["A", "B"]);
    let mut store = loaded(&backend);
    store.request_delete(ids[0]).unwrap();
    store.confirm_delete(&backend).unwrap();
    assert_eq!(store.selection(), Selection::Axis(ids[1]));
}

#[test]
fn deleting_the_last_plot_yields_none() {
    let (backend, ids) = backend_with_axes(&["only"]);
    let mut store = loaded(&backend);
    store.request_delete(ids[0]).unwrap();
    store.confirm_delete(&backend).unwrap();
    assert_eq!(store.selection(), Selection::None);
    assert_eq!(store.selection().key(), "0");
}

#[test]
fn deleting_another_plot_keeps_selection() {
    let (backend, ids) = backend_with_axes(&["A", "B", "C"]);
    let mut store = loaded(&backend);
    store.select(Selection::Axis(ids[2])).unwrap();
    store.request_delete(ids[0]).unwrap();
    store.confirm_delete(&backend).unwrap();
    assert_eq!(store.selection(), Selection::Axis(ids[2]));
}

#[test]
fn pending_delete_suspends_reselection() {
    let (backend, ids) = backend_with_axes(&["A", "B"]);
    let mut store = loaded(&backend);
    store.select(Selection::Axis(ids[1])).unwrap();
    store.request_delete(ids[1]).unwrap();

    // someone else removes B while the prompt is open
    backend.delete_axis_config_direct(ids[1]);
    store.refresh(&backend).unwrap();
    assert_eq!(store.selection(), Selection::Axis(ids[1]));

    store.cancel_delete();
    store.refresh(&backend).unwrap();
    assert_eq!(store.selection(), Selection::Axis(ids[0]));
}

#[test]
fn cancelled_delete_sends_nothing() {
    let (backend, ids) = backend_with_axes(&["A"]);
    let mut store = loaded(&backend);
    store.request_delete(ids[0]).unwrap();
    store.cancel_delete();
    assert_eq!(store.confirm_delete(&backend).unwrap(), None);
    assert!(backend.calls().is_empty());
}

#[test]
fn failed_delete_stays_pending() {
    let (backend, ids) = backend_with_axes(&["A", "B"]);
    let mut store = loaded(&backend);
    store.select(Selection::Axis(ids[1])).unwrap();
    store.request_delete(ids[1]).unwrap();

    backend.fail("delete_axis_config");
    assert!(matches!(store.confirm_delete(&backend), Err(Error::Transport(_))));
    assert_eq!(store.pending_delete(), Some(ids[1]));
    assert_eq!(store.selection(), Selection::Axis(ids[1]));

    // B vanishes elsewhere meanwhile; healing waits for the dialog
    backend.delete_axis_config_direct(ids[1]);
    store.refresh(&backend).unwrap();
    assert_eq!(store.selection(), Selection::Axis(ids[1]));

    backend.recover("delete_axis_config");
    assert_eq!(store.confirm_delete(&backend).unwrap(), Some(ids[1]));
    assert_eq!(store.pending_delete(), None);
    assert_eq!(store.selection(), Selection::Axis(ids[0]));
}

#[test]
fn create_selects_the_new_plot() {
    let (backend, ids) = backend_with_axes(&["A"]);
    let mut store = loaded(&backend);
    let table = TableData {
        dimensions: backend.dims(),
        data_points: vec![],
    };
    let mut draft = AxisConfigStore::draft(&table).unwrap();
    draft.name = "  mood ".to_string();
    draft.settings.set_slot(SemiAxis::YNegative, table.dimensions[4].clone());

    let id = store.create(&backend, &draft, &table).unwrap();
    assert_ne!(id, ids[0]);
    assert_eq!(store.selection(), Selection::Axis(id));
    let created = store.get(id).unwrap();
    assert_eq!(created.name, "mood");
    assert_eq!(created.settings.y_negative.name, "d5");
    assert_eq!(backend.calls(), ["POST /axis-settings", "GET /axis-settings"]);
}

#[test]
fn create_validates_locally() {
    let backend = MockBackend::with_table(3, vec![]);
    let mut store = loaded(&backend);
    let small = TableData {
        dimensions: backend.dims(),
        data_points: vec![],
    };
    assert!(!AxisConfigStore::can_create(&small.dimensions));
    assert!(AxisConfigStore::draft(&small).is_err());

    let five = MockBackend::with_table(5, vec![]);
    let table = TableData {
        dimensions: five.dims(),
        data_points: vec![],
    };
    let draft = AxisDraft {
        name: String::new(),
        settings: settings(&table.dimensions),
    };
    let err = store.create(&backend, &draft, &table).unwrap_err();
    assert_eq!(err.to_string(), "Please enter tab name");

    let draft = AxisDraft {
        name: "p".into(),
        settings: settings(&table.dimensions),
    };
    assert!(matches!(
        store.create(&backend, &draft, &small),
        Err(Error::Validation(_))
    ));
    assert!(backend.calls().is_empty());
}

#[test]
fn rename_skips_unchanged_name() {
    let (backend, ids) = backend_with_axes(&["A"]);
    let mut store = loaded(&backend);
    assert!(!store.rename(&backend, ids[0], " A ").unwrap());
    assert!(backend.calls().is_empty());

    assert!(store.rename(&backend, ids[0], "Alpha").unwrap());
    assert_eq!(store.get(ids[0]).unwrap().name, "Alpha");
    assert_eq!(backend.count("PUT /axis-settings"), 1);
    assert!(store.rename(&backend, ids[0], "").is_err());
}

#[test]
fn update_sends_all_four_slots() {
    let (backend, ids) = backend_with_axes(&["A"]);
    let mut store = loaded(&backend);
    let mut new_settings = store.get(ids[0]).unwrap().settings.clone();
    new_settings.set_slot(SemiAxis::XPositive, backend.dims()[4].clone());
    store.update_settings(&backend, ids[0], &new_settings).unwrap();
    assert_eq!(store.get(ids[0]).unwrap().settings, new_settings);
    assert_eq!(store.get(ids[0]).unwrap().name, "A");
}

#[test]
fn debounced_edits_flush_once_with_latest_values() {
    let (backend, ids) = backend_with_axes(&["A", "B"]);
    let mut store = loaded(&backend);
    let dims = backend.dims();
    let t0 = Instant::now();

    let mut a = store.get(ids[0]).unwrap().settings.clone();
    a.set_slot(SemiAxis::XPositive, dims[4].clone());
    store.queue_update(ids[0], a.clone(), t0).unwrap();

    let mut b = store.get(ids[1]).unwrap().settings.clone();
    b.set_slot(SemiAxis::YNegative, dims[4].clone());
    store
        .queue_update(ids[1], b.clone(), t0 + Duration::from_millis(300))
        .unwrap();

    a.set_slot(SemiAxis::XNegative, dims[4].clone());
    store
        .queue_update(ids[0], a.clone(), t0 + Duration::from_millis(600))
        .unwrap();

    // still inside the quiet period of the last change
    assert_eq!(store.flush_due(&backend, t0 + Duration::from_millis(1500)).unwrap(), 0);
    assert!(backend.calls().is_empty());
    assert_eq!(store.flush_deadline(), Some(t0 + Duration::from_millis(1600)));

    let sent = store.flush_due(&backend, t0 + Duration::from_millis(1600)).unwrap();
    assert_eq!(sent, 2);
    assert_eq!(backend.count("PUT /axis-settings/"), 2);
    assert_eq!(backend.count("GET /axis-settings"), 1);
    assert_eq!(store.get(ids[0]).unwrap().settings, a);
    assert_eq!(store.get(ids[1]).unwrap().settings, b);
    assert!(!store.has_queued());
    assert_eq!(store.flush_deadline(), None);
}

#[test]
fn queued_edits_for_vanished_plots_are_dropped() {
    let (backend, ids) = backend_with_axes(&["A", "B"]);
    let mut store = loaded(&backend);
    let t0 = Instant::now();
    let settings_b = store.get(ids[1]).unwrap().settings.clone();
    store.queue_update(ids[1], settings_b, t0).unwrap();

    backend.delete_axis_config_direct(ids[1]);
    store.refresh(&backend).unwrap();
    assert!(store.queued(ids[1]).is_none());
    assert_eq!(store.flush_deadline(), None);
    backend.clear_calls();
    assert_eq!(store.flush_due(&backend, t0 + QUIET).unwrap(), 0);
    assert!(backend.calls().is_empty());
}

#[test]
fn failed_flush_still_refreshes_once() {
    let (backend, ids) = backend_with_axes(&["A"]);
    let mut store = loaded(&backend);
    let t0 = Instant::now();
    let s = store.get(ids[0]).unwrap().settings.clone();
    store.queue_update(ids[0], s, t0).unwrap();

    backend.fail("update_axis_config");
    let err = store.flush_due(&backend, t0 + QUIET).unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(backend.count("GET /axis-settings"), 1);
    assert!(!store.has_queued());
}

#[test]
fn unknown_ids_are_rejected() {
    let (backend, _) = backend_with_axes(&["A"]);
    let mut store = loaded(&backend);
    assert!(matches!(store.select(Selection::Axis(99)), Err(Error::UnknownAxis(99))));
    assert!(store.request_delete(99).is_err());
    assert!(store.rename(&backend, 99, "x").is_err());
}

//! Transient edit buffers.
//!
//! All open editors live in one `EditSession` value, so at most one of them can
//! be active at any time: opening an editor replaces whatever was open before.

use crate::model::{AxisConfig, CartesianPlaneConfig, Dimension, SemiAxis, TableData};
use log::debug;

/// Asks the user to approve a destructive action.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub enum EditSession {
    #[default]
    NoEdit,
    EditingCell {
        row: String,
        column: String,
        buffer: String,
    },
    EditingAnnotation {
        row: String,
        buffer: String,
    },
    EditingRowName {
        row: String,
        buffer: String,
    },
    /// Local preview of a plot's semi-axis bindings, not yet saved.
    EditingAxis {
        axis_id: i64,
        pending: CartesianPlaneConfig,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditKey {
    Enter,
    Blur,
    Escape,
}

/// A table write produced by committing an editor.
#[derive(Clone, Debug, PartialEq)]
pub enum TableEdit {
    Cell {
        row: String,
        column: String,
        value: f64,
    },
    Annotation {
        row: String,
        annotation: String,
    },
    RenameRow {
        from: String,
        to: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    Table(TableEdit),
    Axis {
        id: i64,
        config: CartesianPlaneConfig,
    },
}

/// Result of committing the current session.
#[derive(Clone, Debug, PartialEq)]
pub enum Commit {
    /// No editor was open (or the edited plot is gone).
    Nothing,
    /// The value did not change; no request needed.
    Unchanged,
    /// The user refused to clear the field.
    Declined,
    Request(Mutation),
}

/// Empty or unparseable input commits as zero.
pub fn parse_cell_value(buffer: &str) -> f64 {
    buffer
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[derive(Debug, Default)]
pub struct Editor {
    session: EditSession,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn is_editing(&self) -> bool {
        self.session != EditSession::NoEdit
    }

    fn replace(&mut self, session: EditSession) {
        if self.is_editing() {
            debug!("discarding open editor {:?}", self.session);
        }
        self.session = session;
    }

    /// Open the numeric editor seeded with the value currently shown.
    pub fn open_cell(&mut self, row: &str, column: &str, current: f64) {
        self.replace(EditSession::EditingCell {
            row: row.to_string(),
            column: column.to_string(),
            buffer: current.to_string(),
        });
    }

    pub fn open_annotation(&mut self, row: &str, current: &str) {
        self.replace(EditSession::EditingAnnotation {
            row: row.to_string(),
            buffer: current.to_string(),
        });
    }

    pub fn open_row_name(&mut self, row: &str) {
        self.replace(EditSession::EditingRowName {
            row: row.to_string(),
            buffer: row.to_string(),
        });
    }

    /// Replace the text of the open editor. Returns false when no text editor is open.
    pub fn input(&mut self, text: &str) -> bool {
        match &mut self.session {
            EditSession::EditingCell { buffer, .. }
            | EditSession::EditingAnnotation { buffer, .. }
            | EditSession::EditingRowName { buffer, .. } => {
                *buffer = text.to_string();
                true
            }
            EditSession::NoEdit | EditSession::EditingAxis { .. } => false,
        }
    }

    /// Change one semi-axis of `axis`. Starts a preview session seeded from the
    /// persisted settings unless this plot is already being edited.
    pub fn change_axis_slot(&mut self, axis: &AxisConfig, slot: SemiAxis, dimension: Dimension) {
        if let EditSession::EditingAxis { axis_id, pending } = &mut self.session {
            if *axis_id == axis.id {
                pending.set_slot(slot, dimension);
                return;
            }
        }
        let mut pending = axis.settings.clone();
        pending.set_slot(slot, dimension);
        self.replace(EditSession::EditingAxis {
            axis_id: axis.id,
            pending,
        });
    }

    /// Put back an axis preview after a failed save.
    pub fn reopen_axis(&mut self, axis_id: i64, pending: CartesianPlaneConfig) {
        self.session = EditSession::EditingAxis { axis_id, pending };
    }

    pub fn pending_axis(&self, id: i64) -> Option<&CartesianPlaneConfig> {
        match &self.session {
            EditSession::EditingAxis { axis_id, pending } if *axis_id == id => Some(pending),
            _ => None,
        }
    }

    /// Drop the current session without sending anything.
    pub fn cancel(&mut self) -> EditSession {
        std::mem::take(&mut self.session)
    }

    /// Keyboard/focus handling: Escape cancels, Enter or losing focus commits a
    /// text editor. Axis previews are only committed explicitly.
    pub fn handle_key(
        &mut self,
        key: EditKey,
        table: &TableData,
        axes: &[AxisConfig],
        confirm: &mut dyn Confirm,
    ) -> Commit {
        if key == EditKey::Escape {
            self.cancel();
            return Commit::Nothing;
        }
        if matches!(self.session, EditSession::EditingAxis { .. }) {
            return Commit::Nothing;
        }
        self.commit(table, axes, confirm)
    }

    /// Close the session and work out which request, if any, it calls for.
    ///
    /// Clearing an annotation or row name to the empty string needs
    /// confirmation; declining ends the session and leaves the old value.
    pub fn commit(
        &mut self,
        table: &TableData,
        axes: &[AxisConfig],
        confirm: &mut dyn Confirm,
    ) -> Commit {
        match std::mem::take(&mut self.session) {
            EditSession::NoEdit => Commit::Nothing,
            EditSession::EditingCell {
                row,
                column,
                buffer,
            } => {
                let value = parse_cell_value(&buffer);
                let current = table
                    .row(&row)
                    .map(|r| r.display_value(&column))
                    .unwrap_or(0.0);
                if value == current {
                    Commit::Unchanged
                } else {
                    Commit::Request(Mutation::Table(TableEdit::Cell { row, column, value }))
                }
            }
            EditSession::EditingAnnotation { row, buffer } => {
                let current = table.row(&row).map(|r| r.annotation.as_str()).unwrap_or("");
                if buffer == current {
                    Commit::Unchanged
                } else if buffer.is_empty()
                    && !confirm.confirm("Are you sure you want to clear this cell?")
                {
                    Commit::Declined
                } else {
                    Commit::Request(Mutation::Table(TableEdit::Annotation {
                        row,
                        annotation: buffer,
                    }))
                }
            }
            EditSession::EditingRowName { row, buffer } => {
                if buffer == row {
                    Commit::Unchanged
                } else if buffer.is_empty()
                    && !confirm.confirm("Are you sure you want to clear this cell?")
                {
                    Commit::Declined
                } else {
                    Commit::Request(Mutation::Table(TableEdit::RenameRow {
                        from: row,
                        to: buffer,
                    }))
                }
            }
            EditSession::EditingAxis { axis_id, pending } => {
                match axes.iter().find(|a| a.id == axis_id) {
                    None => Commit::Nothing,
                    Some(axis) if axis.settings == pending => Commit::Unchanged,
                    Some(_) => Commit::Request(Mutation::Axis {
                        id: axis_id,
                        config: pending,
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataPoint;

    fn table() -> TableData {
        TableData {
            dimensions: vec![Dimension::new(1, "a")],
            data_points: vec![DataPoint::new("r1").with("a", 2.0).annotated("hi")],
        }
    }

    fn yes(_: &str) -> bool {
        true
    }

    #[test]
    fn only_one_editor_is_open() {
        let mut editor = Editor::new();
        editor.open_cell("r1", "a", 2.0);
        editor.open_annotation("r1", "hi");
        assert!(matches!(
            editor.session(),
            EditSession::EditingAnnotation { .. }
        ));
    }

    #[test]
    fn cell_commit_skips_unchanged_value() {
        let mut editor = Editor::new();
        editor.open_cell("r1", "a", 2.0);
        editor.input("2.0");
        assert_eq!(editor.commit(&table(), &[], &mut yes), Commit::Unchanged);
        assert!(!editor.is_editing());
    }

    #[test]
    fn blank_cell_commits_zero() {
        let mut editor = Editor::new();
        editor.open_cell("r1", "a", 2.0);
        editor.input("   ");
        assert_eq!(
            editor.commit(&table(), &[], &mut yes),
            Commit::Request(Mutation::Table(TableEdit::Cell {
                row: "r1".into(),
                column: "a".into(),
                value: 0.0
            }))
        );
        assert_eq!(parse_cell_value("abc"), 0.0);
        assert_eq!(parse_cell_value("NaN"), 0.0);
        assert_eq!(parse_cell_value("-1.5"), -1.5);
    }

    #[test]
    fn missing_cell_is_compared_as_zero() {
        let mut editor = Editor::new();
        editor.open_cell("r1", "b", 0.0);
        assert_eq!(editor.commit(&table(), &[], &mut yes), Commit::Unchanged);
    }

    #[test]
    fn clearing_annotation_needs_confirmation() {
        let mut editor = Editor::new();
        editor.open_annotation("r1", "hi");
        editor.input("");
        let mut asked = Vec::new();
        let mut refuse = |prompt: &str| {
            asked.push(prompt.to_string());
            false
        };
        assert_eq!(
            editor.commit(&table(), &[], &mut refuse),
            Commit::Declined
        );
        assert_eq!(asked.len(), 1);
        assert!(!editor.is_editing());
    }

    #[test]
    fn escape_cancels_and_axis_ignores_enter() {
        let axis = AxisConfig {
            id: 9,
            name: "p".into(),
            settings: CartesianPlaneConfig {
                x_positive: Dimension::new(1, "a"),
                x_negative: Dimension::new(1, "a"),
                y_positive: Dimension::new(1, "a"),
                y_negative: Dimension::new(1, "a"),
            },
        };
        let mut editor = Editor::new();
        editor.change_axis_slot(&axis, SemiAxis::YNegative, Dimension::new(2, "b"));
        let axes = [axis];
        assert_eq!(
            editor.handle_key(EditKey::Enter, &table(), &axes, &mut yes),
            Commit::Nothing
        );
        assert!(editor.pending_axis(9).is_some());
        editor.handle_key(EditKey::Escape, &table(), &axes, &mut yes);
        assert!(editor.pending_axis(9).is_none());
    }
}

use crate::model::{Field, ProcessRequest, WizardEvent};
use crate::orchestrator::UiCommand;
use crate::wizard::ViewState;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// How long a dropped column-order row stays highlighted after moving.
pub const MOVE_HIGHLIGHT: Duration = Duration::from_millis(150);

const PANEL_ORDER: [Field; 5] = [
    Field::Columns,
    Field::GroupBy,
    Field::Aggregations,
    Field::OrderBy,
    Field::ColumnOrder,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    PathInput,
}

/// Terminal-only state layered over the wizard's `ViewState`.
pub struct UiState {
    pub view: ViewState,
    pub mode: Mode,
    pub focus: Field,
    cursors: [usize; 5],
    pub path_input: String,
    /// Column-order row currently being dragged.
    pub grabbed: Option<usize>,
    pub last_move: Option<(usize, Instant)>,
    pub info: String,
    pub show_help: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            view: ViewState::default(),
            mode: Mode::Browse,
            focus: Field::Columns,
            cursors: [0; 5],
            path_input: String::new(),
            grabbed: None,
            last_move: None,
            info: "Press u to choose files to upload".into(),
            show_help: false,
        }
    }
}

fn slot(field: Field) -> usize {
    PANEL_ORDER
        .iter()
        .position(|f| *f == field)
        .unwrap_or_default()
}

/// Split the prompt into paths; `;` separates multiple files.
pub fn parse_paths(input: &str) -> Vec<PathBuf> {
    input
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

impl UiState {
    pub fn cursor(&self, field: Field) -> usize {
        self.cursors[slot(field)]
    }

    pub fn visible_fields(&self) -> Vec<Field> {
        PANEL_ORDER
            .into_iter()
            .filter(|f| self.view.is_visible(*f))
            .collect()
    }

    fn reset_cursors(&mut self) {
        self.cursors = [0; 5];
        self.grabbed = None;
        self.last_move = None;
    }

    pub fn is_recently_moved(&self, index: usize) -> bool {
        matches!(self.last_move, Some((i, at)) if i == index && at.elapsed() < MOVE_HIGHLIGHT)
    }

    pub fn cycle_focus(&mut self, forward: bool) {
        let visible = self.visible_fields();
        if visible.is_empty() {
            return;
        }
        self.grabbed = None;
        let n = visible.len();
        let current = visible.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (current + 1) % n
        } else {
            (current + n - 1) % n
        };
        self.focus = visible[next];
    }

    /// Move the cursor; with a grabbed column-order row, the row travels with it.
    pub fn move_cursor(&mut self, down: bool) {
        let field = self.focus;
        let len = self.view.len(field);
        if len == 0 {
            return;
        }
        let from = self.cursor(field).min(len - 1);
        let to = if down {
            (from + 1).min(len - 1)
        } else {
            from.saturating_sub(1)
        };
        if field == Field::ColumnOrder && self.grabbed.is_some() && from != to {
            match self.view.move_column(from, to) {
                Ok(()) => {
                    self.grabbed = Some(to);
                    self.last_move = Some((to, Instant::now()));
                }
                Err(e) => {
                    self.info = e.to_string();
                    return;
                }
            }
        }
        self.cursors[slot(field)] = to;
    }

    /// Space: toggle a checkbox, pick the sort column, or grab/drop a column-order row.
    pub fn activate(&mut self) {
        let field = self.focus;
        let index = self.cursor(field);
        let res = match field {
            Field::Columns | Field::GroupBy | Field::Aggregations => {
                self.view.toggle(field, index).map(|_| ())
            }
            Field::OrderBy => self.view.select_order_by(index),
            Field::ColumnOrder => {
                if self.grabbed.take().is_some() {
                    self.last_move = Some((index, Instant::now()));
                    self.info = "Dropped".into();
                } else if index < self.view.len(field) {
                    self.grabbed = Some(index);
                    self.info = "Moving column: use ↑/↓, Space to drop".into();
                }
                Ok(())
            }
        };
        if let Err(e) = res {
            self.info = e.to_string();
        }
    }

    pub fn confirm_columns(&mut self) {
        match self.view.confirm_columns() {
            Ok(()) => {
                let cols = self.cursor(Field::Columns);
                self.reset_cursors();
                self.cursors[slot(Field::Columns)] = cols;
                self.focus = Field::GroupBy;
                self.info = format!(
                    "{} column(s) confirmed; press p to process",
                    self.view.column_order.len()
                );
            }
            Err(e) => self.info = e.to_string(),
        }
    }

    /// Start an upload; returns the paths to send when the wizard accepts it.
    pub fn submit_path_input(&mut self) -> Option<Vec<PathBuf>> {
        let paths = parse_paths(&self.path_input);
        if paths.is_empty() {
            self.info = "Enter at least one file path".into();
            return None;
        }
        self.mode = Mode::Browse;
        self.begin_upload(paths)
    }

    /// Upload command for files named with `--file`, sent once the UI is up.
    pub fn launch_upload(&mut self, files: &[PathBuf]) -> Option<UiCommand> {
        if files.is_empty() {
            return None;
        }
        self.begin_upload(files.to_vec()).map(UiCommand::Upload)
    }

    pub fn begin_upload(&mut self, paths: Vec<PathBuf>) -> Option<Vec<PathBuf>> {
        match self.view.begin_upload() {
            Ok(()) => {
                self.reset_cursors();
                self.focus = Field::Columns;
                self.info = format!("Uploading {} file(s)…", paths.len());
                Some(paths)
            }
            Err(e) => {
                self.info = e.to_string();
                None
            }
        }
    }

    pub fn begin_process(&mut self) -> Option<ProcessRequest> {
        self.grabbed = None;
        match self.view.begin_process() {
            Ok(req) => {
                self.info = "Processing…".into();
                Some(req)
            }
            Err(e) => {
                self.info = e.to_string();
                None
            }
        }
    }

    pub fn apply_event(&mut self, ev: WizardEvent) {
        let res = match ev {
            WizardEvent::UploadFinished(outcome) => {
                let res = self.view.complete_upload(outcome);
                if self.view.alert.is_none() {
                    self.info = format!(
                        "{} column(s) found; Space to select, Enter to confirm",
                        self.view.columns.len()
                    );
                } else {
                    self.info = "Upload failed".into();
                }
                res
            }
            WizardEvent::ProcessFinished(outcome) => {
                let res = self.view.complete_process(outcome);
                self.info = match self.view.last_download.as_ref() {
                    Some(d) if self.view.alert.is_none() => {
                        format!("Saved: {} (press y to copy path)", d.path.display())
                    }
                    _ => "Processing failed".into(),
                };
                res
            }
            WizardEvent::Info(msg) => {
                self.info = msg;
                Ok(())
            }
        };
        if let Err(e) = res {
            self.info = e.to_string();
        }
    }
}

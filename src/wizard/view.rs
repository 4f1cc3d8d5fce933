use super::WizardState;
use crate::error::{ProcessError, UploadError, WizardError};
use crate::model::{
    checked_items, AggregationChoice, DownloadRecord, Field, ProcessRequest, Toggle,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Single-choice list for the sort column. The first option is selected when populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBySelect {
    pub options: Vec<String>,
    pub selected: Option<usize>,
}

impl OrderBySelect {
    fn populate(&mut self, options: Vec<String>) {
        self.selected = if options.is_empty() { None } else { Some(0) };
        self.options = options;
    }

    pub fn value(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }
}

/// Everything the wizard panels display. Serializable so a snapshot can be rendered or
/// inspected without a terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub state: WizardState,
    pub loading: bool,
    pub alert: Option<String>,
    pub columns: Vec<Toggle<String>>,
    pub group_by: Vec<Toggle<String>>,
    pub aggregations: Vec<Toggle<AggregationChoice>>,
    pub order_by: OrderBySelect,
    pub column_order: Vec<String>,
    pub last_download: Option<DownloadRecord>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            state: WizardState::Idle,
            loading: false,
            alert: None,
            columns: Vec::new(),
            group_by: Vec::new(),
            aggregations: Vec::new(),
            order_by: OrderBySelect::default(),
            column_order: Vec::new(),
            last_download: None,
        }
    }
}

impl ViewState {
    fn reject(&self, action: &'static str) -> WizardError {
        warn!(action, state = %self.state, "rejected out-of-order wizard operation");
        WizardError::InvalidTransition {
            action,
            state: self.state,
        }
    }

    fn clear_options(&mut self) {
        self.group_by.clear();
        self.aggregations.clear();
        self.order_by = OrderBySelect::default();
        self.column_order.clear();
    }

    pub fn is_visible(&self, field: Field) -> bool {
        match field {
            Field::Columns => self.state.shows_column_selection(),
            _ => self.state.shows_options(),
        }
    }

    pub fn len(&self, field: Field) -> usize {
        match field {
            Field::Columns => self.columns.len(),
            Field::GroupBy => self.group_by.len(),
            Field::Aggregations => self.aggregations.len(),
            Field::OrderBy => self.order_by.options.len(),
            Field::ColumnOrder => self.column_order.len(),
        }
    }

    /// Index of the item in `field` whose value (column name) equals `value`.
    pub fn position(&self, field: Field, value: &str) -> Option<usize> {
        match field {
            Field::Columns => self.columns.iter().position(|t| t.item == value),
            Field::GroupBy => self.group_by.iter().position(|t| t.item == value),
            Field::Aggregations => self
                .aggregations
                .iter()
                .position(|t| t.item.column == value),
            Field::OrderBy => self.order_by.options.iter().position(|c| c == value),
            Field::ColumnOrder => self.column_order.iter().position(|c| c == value),
        }
    }

    pub fn begin_upload(&mut self) -> Result<(), WizardError> {
        if !self.state.can_begin_upload() {
            return Err(self.reject("upload"));
        }
        self.state = WizardState::Uploading;
        self.loading = true;
        self.alert = None;
        Ok(())
    }

    /// Apply the upload response. Columns are sorted and rendered unchecked; any failure
    /// raises an alert and returns the wizard to `Idle`.
    pub fn complete_upload(
        &mut self,
        outcome: Result<Vec<String>, UploadError>,
    ) -> Result<(), WizardError> {
        if self.state != WizardState::Uploading {
            return Err(self.reject("complete an upload"));
        }
        self.loading = false;
        self.clear_options();
        match outcome {
            Ok(mut names) => {
                names.sort();
                info!(count = names.len(), "columns discovered");
                self.columns = names.into_iter().map(Toggle::unchecked).collect();
                self.state = WizardState::ColumnsReady;
            }
            Err(e) => {
                warn!(error = %e, "upload failed");
                self.columns.clear();
                self.alert = Some(format!("Error uploading file: {e}"));
                self.state = WizardState::Idle;
            }
        }
        Ok(())
    }

    /// Flip a checkbox and return its new state.
    pub fn toggle(&mut self, field: Field, index: usize) -> Result<bool, WizardError> {
        if !self.is_visible(field) {
            return Err(self.reject("toggle a hidden panel"));
        }
        let checked = match field {
            Field::Columns => self.columns.get_mut(index).map(|t| &mut t.checked),
            Field::GroupBy => self.group_by.get_mut(index).map(|t| &mut t.checked),
            Field::Aggregations => self.aggregations.get_mut(index).map(|t| &mut t.checked),
            Field::OrderBy | Field::ColumnOrder => {
                return Err(self.reject("toggle a non-checkbox field"));
            }
        };
        let checked = checked.ok_or(WizardError::NoSuchItem { field, index })?;
        *checked = !*checked;
        Ok(*checked)
    }

    pub fn set_checked(
        &mut self,
        field: Field,
        index: usize,
        checked: bool,
    ) -> Result<(), WizardError> {
        let current = match field {
            Field::Columns => self.columns.get(index).map(|t| t.checked),
            Field::GroupBy => self.group_by.get(index).map(|t| t.checked),
            Field::Aggregations => self.aggregations.get(index).map(|t| t.checked),
            _ => None,
        };
        if current == Some(checked) {
            return Ok(());
        }
        self.toggle(field, index).map(|_| ())
    }

    pub fn select_order_by(&mut self, index: usize) -> Result<(), WizardError> {
        if !self.is_visible(Field::OrderBy) {
            return Err(self.reject("choose an order-by column"));
        }
        if index >= self.order_by.options.len() {
            return Err(WizardError::NoSuchItem {
                field: Field::OrderBy,
                index,
            });
        }
        self.order_by.selected = Some(index);
        Ok(())
    }

    /// Drag the column-order item at `from` so that it lands at `to`.
    pub fn move_column(&mut self, from: usize, to: usize) -> Result<(), WizardError> {
        if !self.is_visible(Field::ColumnOrder) {
            return Err(self.reject("reorder columns"));
        }
        let len = self.column_order.len();
        for index in [from, to] {
            if index >= len {
                return Err(WizardError::NoSuchItem {
                    field: Field::ColumnOrder,
                    index,
                });
            }
        }
        let item = self.column_order.remove(from);
        self.column_order.insert(to, item);
        debug!(from, to, "column moved");
        Ok(())
    }

    /// Build the dependent panels from the checked columns. An empty selection is allowed.
    pub fn confirm_columns(&mut self) -> Result<(), WizardError> {
        if !self.state.can_confirm_columns() {
            return Err(self.reject("confirm columns"));
        }
        let selected = checked_items(&self.columns);
        self.clear_options();
        for col in &selected {
            self.group_by.push(Toggle::unchecked(col.clone()));
            self.aggregations
                .push(Toggle::unchecked(AggregationChoice::sum(col.clone())));
        }
        self.order_by.populate(selected.clone());
        self.column_order = selected;
        self.state = WizardState::OptionsConfirmed;
        info!(selected = self.column_order.len(), "columns confirmed");
        Ok(())
    }

    /// Snapshot of what a process submission would carry right now.
    pub fn current_request(&self) -> ProcessRequest {
        ProcessRequest {
            columns: checked_items(&self.columns),
            group_by: checked_items(&self.group_by),
            aggregations: checked_items(&self.aggregations),
            order_by: self.order_by.value().map(str::to_string),
            column_order: self.column_order.clone(),
        }
    }

    pub fn begin_process(&mut self) -> Result<ProcessRequest, WizardError> {
        if !self.state.can_begin_process() {
            return Err(self.reject("process"));
        }
        let request = self.current_request();
        self.state = WizardState::Processing;
        self.loading = true;
        self.alert = None;
        Ok(request)
    }

    pub fn complete_process(
        &mut self,
        outcome: Result<DownloadRecord, ProcessError>,
    ) -> Result<(), WizardError> {
        if self.state != WizardState::Processing {
            return Err(self.reject("complete processing"));
        }
        self.loading = false;
        match outcome {
            Ok(record) => {
                info!(path = %record.path.display(), bytes = record.bytes, "spreadsheet saved");
                self.last_download = Some(record);
                self.state = WizardState::Done;
            }
            Err(e) => {
                warn!(error = %e, "processing failed");
                self.alert = Some(format!("Error processing data: {e}"));
                self.state = WizardState::Error;
            }
        }
        Ok(())
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }
}

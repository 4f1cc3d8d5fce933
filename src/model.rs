use crate::error::{ProcessError, UploadError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// File name every processed spreadsheet is saved under.
pub const DOWNLOAD_FILE_NAME: &str = "grouped_data.xlsx";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardConfig {
    pub base_url: String,
    pub upload_path: String,
    pub process_path: String,
    pub download_dir: PathBuf,
    pub user_agent: String,
}

impl WizardConfig {
    pub fn upload_url(&self) -> String {
        join_url(&self.base_url, &self.upload_path)
    }

    pub fn process_url(&self) -> String {
        join_url(&self.base_url, &self.process_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Form field names used by the process request, one per panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    Columns,
    GroupBy,
    Aggregations,
    OrderBy,
    ColumnOrder,
}

impl Field {
    pub fn form_key(self) -> &'static str {
        match self {
            Field::Columns => "columns",
            Field::GroupBy => "group_by",
            Field::Aggregations => "aggregations",
            Field::OrderBy => "order_by",
            Field::ColumnOrder => "column_order",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.form_key())
    }
}

/// A checkable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle<T> {
    pub item: T,
    pub checked: bool,
}

impl<T> Toggle<T> {
    pub fn unchecked(item: T) -> Self {
        Self {
            item,
            checked: false,
        }
    }
}

pub fn checked_items<T: Clone>(toggles: &[Toggle<T>]) -> Vec<T> {
    toggles
        .iter()
        .filter(|t| t.checked)
        .map(|t| t.item.clone())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggFunc {
    Sum,
}

impl AggFunc {
    pub fn as_str(self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
        }
    }
}

impl FromStr for AggFunc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(AggFunc::Sum),
            other => Err(format!("unsupported aggregation function: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationChoice {
    pub column: String,
    pub function: AggFunc,
}

impl AggregationChoice {
    pub fn sum(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            function: AggFunc::Sum,
        }
    }

    /// Value submitted in the `aggregations` field, e.g. `Cost:sum`.
    pub fn form_value(&self) -> String {
        format!("{}:{}", self.column, self.function.as_str())
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.column, self.function.as_str())
    }
}

impl FromStr for AggregationChoice {
    type Err = String;

    /// Column names may themselves contain `:`, so the function is taken after the last one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, func) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected <column>:<function>, got {s:?}"))?;
        Ok(Self {
            column: column.to_string(),
            function: func.parse()?,
        })
    }
}

/// Everything the process endpoint receives, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub columns: Vec<String>,
    pub group_by: Vec<String>,
    pub aggregations: Vec<AggregationChoice>,
    pub order_by: Option<String>,
    pub column_order: Vec<String>,
}

impl ProcessRequest {
    /// Flatten into URL-encoded form pairs. Repeated keys carry multi-valued fields and
    /// `order_by` is always present, empty when nothing is selected.
    pub fn form_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(
            self.columns.len()
                + self.group_by.len()
                + self.aggregations.len()
                + self.column_order.len()
                + 1,
        );
        for c in &self.columns {
            pairs.push((Field::Columns.form_key(), c.clone()));
        }
        for c in &self.group_by {
            pairs.push((Field::GroupBy.form_key(), c.clone()));
        }
        for a in &self.aggregations {
            pairs.push((Field::Aggregations.form_key(), a.form_value()));
        }
        pairs.push((
            Field::OrderBy.form_key(),
            self.order_by.clone().unwrap_or_default(),
        ));
        for c in &self.column_order {
            pairs.push((Field::ColumnOrder.form_key(), c.clone()));
        }
        pairs
    }
}

/// A local file opened for upload; its contents are streamed, not buffered.
#[derive(Debug)]
pub struct UploadFile {
    pub file_name: String,
    pub file: tokio::fs::File,
    pub len: u64,
}

impl UploadFile {
    pub fn mime_type(&self) -> &'static str {
        mime_for_name(&self.file_name)
    }
}

fn mime_for_name(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => "text/csv",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub path: PathBuf,
    pub bytes: u64,
    pub saved_at: String,
}

/// Results delivered from the orchestrator back to the UI thread.
#[derive(Debug)]
pub enum WizardEvent {
    UploadFinished(Result<Vec<String>, UploadError>),
    ProcessFinished(Result<DownloadRecord, ProcessError>),
    Info(String),
}

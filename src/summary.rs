//! Summary builders for headless output.

use crate::model::{checked_items, ProcessRequest};
use crate::wizard::ViewState;
use serde_json::json;

/// Discovered column names, in display order.
pub(crate) fn columns(view: &ViewState) -> Vec<String> {
    view.columns.iter().map(|t| t.item.clone()).collect()
}

fn list(items: &[String]) -> String {
    if items.is_empty() {
        "-".into()
    } else {
        items.join(", ")
    }
}

/// Pre-formatted lines describing what was submitted and where the result went.
pub(crate) fn build_text_summary(view: &ViewState, request: &ProcessRequest) -> Vec<String> {
    let aggregations: Vec<String> = request.aggregations.iter().map(|a| a.label()).collect();
    let mut lines = vec![
        format!("Columns:      {}", list(&columns(view))),
        format!("Selected:     {}", list(&request.columns)),
        format!("Group by:     {}", list(&request.group_by)),
        format!("Aggregations: {}", list(&aggregations)),
        format!("Order by:     {}", request.order_by.as_deref().unwrap_or("-")),
        format!("Column order: {}", list(&request.column_order)),
    ];
    if let Some(d) = view.last_download.as_ref() {
        lines.push(format!(
            "Saved:        {} ({} bytes, {})",
            d.path.display(),
            d.bytes,
            d.saved_at
        ));
    }
    lines
}

pub(crate) fn build_json_summary(view: &ViewState, request: &ProcessRequest) -> serde_json::Value {
    json!({
        "columns": columns(view),
        "selected": checked_items(&view.columns),
        "request": request,
        "form": request
            .form_pairs()
            .into_iter()
            .map(|(k, v)| json!([k, v]))
            .collect::<Vec<_>>(),
        "download": view.last_download,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DownloadRecord, Field};
    use std::path::PathBuf;

    fn done_view() -> (ViewState, ProcessRequest) {
        let mut v = ViewState::default();
        v.begin_upload().unwrap();
        v.complete_upload(Ok(vec!["b".into(), "a".into()])).unwrap();
        v.toggle(Field::Columns, 0).unwrap();
        v.confirm_columns().unwrap();
        v.toggle(Field::Aggregations, 0).unwrap();
        let req = v.begin_process().unwrap();
        v.complete_process(Ok(DownloadRecord {
            path: PathBuf::from("/tmp/grouped_data.xlsx"),
            bytes: 10,
            saved_at: "2026-10-18T00:00:00Z".into(),
        }))
        .unwrap();
        (v, req)
    }

    #[test]
    fn text_summary_lists_choices_and_download() {
        let (v, req) = done_view();
        let lines = build_text_summary(&v, &req);
        assert_eq!(lines[0], "Columns:      a, b");
        assert_eq!(lines[2], "Group by:     -");
        assert_eq!(lines[3], "Aggregations: a (sum)");
        assert_eq!(lines[4], "Order by:     a");
        assert!(lines[6].contains("grouped_data.xlsx (10 bytes"));
    }

    #[test]
    fn json_summary_includes_form_pairs() {
        let (v, req) = done_view();
        let doc = build_json_summary(&v, &req);
        assert_eq!(doc["columns"], json!(["a", "b"]));
        assert_eq!(doc["form"][1], json!(["aggregations", "a:sum"]));
        assert_eq!(doc["download"]["bytes"], json!(10));
    }
}

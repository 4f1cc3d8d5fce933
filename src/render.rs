//! Pure rendering of a `ViewState` into panel descriptions.
//!
//! Nothing here touches the terminal, so the same views back the TUI and the tests.

use crate::model::{Field, Toggle};
use crate::wizard::ViewState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Checkbox(bool),
    Radio(bool),
    Position(usize),
}

impl Marker {
    pub fn glyph(self) -> String {
        match self {
            Marker::Checkbox(true) => "[x]".into(),
            Marker::Checkbox(false) => "[ ]".into(),
            Marker::Radio(true) => "(•)".into(),
            Marker::Radio(false) => "( )".into(),
            Marker::Position(n) => format!("{n:>2}."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub label: String,
    pub marker: Marker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub field: Field,
    pub title: &'static str,
    pub items: Vec<ItemView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub loading: bool,
    pub phase: &'static str,
    pub alert: Option<String>,
    pub last_download: Option<String>,
}

pub fn panel_title(field: Field) -> &'static str {
    match field {
        Field::Columns => "Select Columns",
        Field::GroupBy => "Group By",
        Field::Aggregations => "Aggregations",
        Field::OrderBy => "Order By",
        Field::ColumnOrder => "Column Order",
    }
}

fn checkboxes<T>(toggles: &[Toggle<T>], label: impl Fn(&T) -> String) -> Vec<ItemView> {
    toggles
        .iter()
        .map(|t| ItemView {
            label: label(&t.item),
            marker: Marker::Checkbox(t.checked),
        })
        .collect()
}

pub fn panel(view: &ViewState, field: Field) -> PanelView {
    let items = match field {
        Field::Columns => checkboxes(&view.columns, String::clone),
        Field::GroupBy => checkboxes(&view.group_by, String::clone),
        Field::Aggregations => checkboxes(&view.aggregations, |a| a.label()),
        Field::OrderBy => view
            .order_by
            .options
            .iter()
            .enumerate()
            .map(|(i, c)| ItemView {
                label: c.clone(),
                marker: Marker::Radio(view.order_by.selected == Some(i)),
            })
            .collect(),
        Field::ColumnOrder => view
            .column_order
            .iter()
            .enumerate()
            .map(|(i, c)| ItemView {
                label: c.clone(),
                marker: Marker::Position(i + 1),
            })
            .collect(),
    };
    PanelView {
        field,
        title: panel_title(field),
        items,
    }
}

/// Visible panels in wizard order.
pub fn panels(view: &ViewState) -> Vec<PanelView> {
    [
        Field::Columns,
        Field::GroupBy,
        Field::Aggregations,
        Field::OrderBy,
        Field::ColumnOrder,
    ]
    .into_iter()
    .filter(|f| view.is_visible(*f))
    .map(|f| panel(view, f))
    .collect()
}

pub fn status(view: &ViewState) -> StatusView {
    StatusView {
        loading: view.loading,
        phase: view.state.label(),
        alert: view.alert.clone(),
        last_download: view
            .last_download
            .as_ref()
            .map(|d| format!("{} ({} bytes)", d.path.display(), d.bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_with(cols: &[&str], select: &[&str]) -> ViewState {
        let mut v = ViewState::default();
        v.begin_upload().unwrap();
        v.complete_upload(Ok(cols.iter().map(|c| c.to_string()).collect()))
            .unwrap();
        for c in select {
            let i = v.position(Field::Columns, c).unwrap();
            v.toggle(Field::Columns, i).unwrap();
        }
        v
    }

    #[test]
    fn idle_view_renders_no_panels() {
        assert!(panels(&ViewState::default()).is_empty());
    }

    #[test]
    fn uploaded_columns_render_in_sorted_order() {
        let v = view_with(&["b", "a", "c"], &[]);
        let rendered = panels(&v);
        assert_eq!(rendered.len(), 1);
        let labels: Vec<_> = rendered[0].items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["a", "b", "c"]);
        assert!(rendered[0]
            .items
            .iter()
            .all(|i| i.marker == Marker::Checkbox(false)));
    }

    #[test]
    fn confirmed_view_reveals_dependent_panels() {
        let mut v = view_with(&["x", "y", "z"], &["x", "y"]);
        v.confirm_columns().unwrap();
        let rendered = panels(&v);
        let titles: Vec<_> = rendered.iter().map(|p| p.title).collect();
        assert_eq!(
            titles,
            ["Select Columns", "Group By", "Aggregations", "Order By", "Column Order"]
        );
        for p in &rendered[1..] {
            assert_eq!(p.items.len(), 2, "{}", p.title);
        }
        let aggs: Vec<_> = rendered[2].items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(aggs, ["x (sum)", "y (sum)"]);
        assert_eq!(rendered[3].items[0].marker, Marker::Radio(true));
        assert_eq!(rendered[3].items[1].marker, Marker::Radio(false));
        assert_eq!(rendered[4].items[1].marker, Marker::Position(2));
    }

    #[test]
    fn status_reports_alert_and_loading() {
        let mut v = ViewState::default();
        v.begin_upload().unwrap();
        let s = status(&v);
        assert!(s.loading);
        assert_eq!(s.phase, "uploading");
        assert_eq!(s.alert, None);
    }

    #[test]
    fn marker_glyphs() {
        assert_eq!(Marker::Checkbox(true).glyph(), "[x]");
        assert_eq!(Marker::Radio(false).glyph(), "( )");
        assert_eq!(Marker::Position(3).glyph(), " 3.");
    }
}

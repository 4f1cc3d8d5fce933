use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("u", 11, "Choose file(s) to upload (separate with ;)"),
        key_line("tab", 9, "Next panel (shift-tab: previous)"),
        key_line("↑/↓", 9, "Move (j/k also work)"),
        key_line("space", 7, "Toggle / choose / grab and drop a column"),
        key_line("enter", 7, "Confirm selected columns, dismiss an alert"),
        key_line("p", 11, "Process and download grouped_data.xlsx"),
        key_line("y", 11, "Copy the downloaded path to the clipboard"),
        key_line("?", 11, "Toggle this help"),
        Line::from(""),
        Line::from("Column order:"),
        Line::from("  Press space on a column to pick it up, move it with ↑/↓,"),
        Line::from("  and press space again to drop it."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}

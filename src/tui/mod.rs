mod clipboard;
mod help;
mod state;

use crate::backend::{HttpBackend, WizardBackend};
use crate::cli::{build_config, Cli};
use crate::model::{Field, WizardEvent};
use crate::orchestrator::{self, UiCommand};
use crate::render::{self, PanelView};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Terminal,
};
use state::{Mode, UiState};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let backend: Arc<dyn WizardBackend> = Arc::new(HttpBackend::new(&cfg)?);

    let (event_tx, event_rx) = mpsc::unbounded_channel::<WizardEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(backend, cfg.download_dir, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<WizardEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::default();
    if let Some(cmd) = state.launch_upload(&args.files) {
        let _ = cmd_tx.send(cmd);
    }

    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if let (KeyModifiers::CONTROL, KeyCode::Char('c')) = (k.modifiers, k.code) {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
                if handle_key(&mut state, k.code, &cmd_tx) == KeyOutcome::Quit {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

fn handle_key(
    state: &mut UiState,
    code: KeyCode,
    cmd_tx: &UnboundedSender<UiCommand>,
) -> KeyOutcome {
    // The alert is modal: only dismissing or quitting gets through.
    if state.view.alert.is_some() {
        match code {
            KeyCode::Enter | KeyCode::Esc => state.view.dismiss_alert(),
            KeyCode::Char('q') => return KeyOutcome::Quit,
            _ => {}
        }
        return KeyOutcome::Continue;
    }

    if state.mode == Mode::PathInput {
        match code {
            KeyCode::Enter => {
                if let Some(paths) = state.submit_path_input() {
                    let _ = cmd_tx.send(UiCommand::Upload(paths));
                }
            }
            KeyCode::Esc => {
                state.mode = Mode::Browse;
                state.info = "Upload cancelled".into();
            }
            KeyCode::Backspace => {
                state.path_input.pop();
            }
            KeyCode::Char(c) => state.path_input.push(c),
            _ => {}
        }
        return KeyOutcome::Continue;
    }

    match code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Char('?') => state.show_help = !state.show_help,
        KeyCode::Esc => state.show_help = false,
        KeyCode::Char('u') => {
            if state.view.state.can_begin_upload() {
                state.mode = Mode::PathInput;
                state.info = "Type file path(s), Enter to upload, Esc to cancel".into();
            } else {
                state.info = format!("Busy: {}", state.view.state);
            }
        }
        KeyCode::Tab => state.cycle_focus(true),
        KeyCode::BackTab => state.cycle_focus(false),
        KeyCode::Up | KeyCode::Char('k') => state.move_cursor(false),
        KeyCode::Down | KeyCode::Char('j') => state.move_cursor(true),
        KeyCode::Char(' ') => state.activate(),
        KeyCode::Enter => {
            if state.focus == Field::Columns {
                state.confirm_columns();
            } else {
                state.activate();
            }
        }
        KeyCode::Char('p') => {
            if let Some(request) = state.begin_process() {
                let _ = cmd_tx.send(UiCommand::Process(request));
            }
        }
        KeyCode::Char('y') => match state.view.last_download.as_ref() {
            Some(d) => {
                let path = d.path.display().to_string();
                state.info = match clipboard::copy_to_clipboard(&path) {
                    Ok(()) => format!("✓ Copied to clipboard: {path}"),
                    Err(e) => format!("Clipboard copy failed: {e:#}"),
                };
            }
            None => state.info = "Nothing downloaded yet".into(),
        },
        _ => {}
    }
    KeyOutcome::Continue
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let title = Paragraph::new(Line::from(vec![
        Span::styled("sheet-wizard", Style::default().fg(Color::Yellow)),
        Span::raw("  upload → columns → options → download   "),
        Span::styled("? for help", Style::default().fg(Color::Gray)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    draw_body(chunks[1], f, state);
    draw_status(chunks[2], f, state);

    if state.show_help {
        draw_help_overlay(area, f);
    }
    if let Some(alert) = render::status(&state.view).alert {
        draw_alert(area, f, &alert);
    }
}

fn draw_help_overlay(area: Rect, f: &mut ratatui::Frame) {
    help::draw_help(centered(area, 64, 18), f);
}

fn draw_body(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut area = area;
    if state.mode == Mode::PathInput {
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);
        let input = Paragraph::new(format!("{}▏", state.path_input)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title("File(s) to upload"),
        );
        f.render_widget(input, parts[0]);
        area = parts[1];
    }

    let panels = render::panels(&state.view);
    if panels.is_empty() {
        let text = if state.view.loading {
            "Uploading…"
        } else {
            "No data yet. Press u and enter the path of a .csv or .xlsx file."
        };
        let p = Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Wizard"));
        f.render_widget(p, area);
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, panels.len() as u32); panels.len()])
        .split(area);
    for (panel, rect) in panels.iter().zip(columns.iter()) {
        draw_panel(*rect, f, state, panel);
    }
}

fn draw_panel(area: Rect, f: &mut ratatui::Frame, state: &UiState, panel: &PanelView) {
    let focused = state.focus == panel.field && state.mode == Mode::Browse;
    let cursor = state.cursor(panel.field);
    let items: Vec<ListItem> = panel
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut style = Style::default();
            if panel.field == Field::ColumnOrder {
                if state.grabbed == Some(i) {
                    style = style.fg(Color::Magenta).add_modifier(Modifier::BOLD);
                } else if state.is_recently_moved(i) {
                    style = style.fg(Color::Cyan);
                }
            }
            if focused && i == cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            ListItem::new(Line::from(vec![
                Span::raw(item.marker.glyph()),
                Span::raw(" "),
                Span::raw(item.label.clone()),
            ]))
            .style(style)
        })
        .collect();

    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(panel.title),
    );
    f.render_widget(list, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let status = render::status(&state.view);
    let mut spans = vec![Span::styled(
        format!("[{}] ", status.phase),
        Style::default().fg(Color::Gray),
    )];
    if status.loading {
        spans.push(Span::styled(
            "Loading… ",
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::raw(state.info.clone()));
    if let Some(last) = status.last_download {
        spans.push(Span::styled(
            format!("  last: {last}"),
            Style::default().fg(Color::Green),
        ));
    }
    let p = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_alert(area: Rect, f: &mut ratatui::Frame, message: &str) {
    let rect = centered(area, 60, 7);
    let p = Paragraph::new(vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to dismiss",
            Style::default().fg(Color::Gray),
        )),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title("Error"),
    );
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RequestError, UploadError};
    use ratatui::backend::TestBackend;
    use std::path::PathBuf;

    fn screen(state: &UiState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 30)).unwrap();
        terminal.draw(|f| draw(f.area(), f, state)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn confirmed() -> UiState {
        let mut s = UiState::default();
        s.begin_upload(vec![PathBuf::from("in.csv")]).unwrap();
        s.apply_event(WizardEvent::UploadFinished(Ok(vec!["y".into(), "x".into()])));
        s.activate();
        s.move_cursor(true);
        s.activate();
        s.confirm_columns();
        s
    }

    #[test]
    fn draws_every_panel_after_confirm() {
        let out = screen(&confirmed());
        for title in [
            "Select Columns",
            "Group By",
            "Aggregations",
            "Order By",
            "Column Order",
        ] {
            assert!(out.contains(title), "missing {title}");
        }
        assert!(out.contains("[ ] x (sum)"));
        assert!(out.contains("(•) x"));
    }

    #[test]
    fn alert_is_drawn_and_blocks_keys() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = UiState::default();
        s.begin_upload(vec![PathBuf::from("in.csv")]).unwrap();
        s.apply_event(WizardEvent::UploadFinished(Err(UploadError::Request(
            RequestError::Transport("connection refused".into()),
        ))));
        assert!(screen(&s).contains("Error uploading file"));

        assert_eq!(handle_key(&mut s, KeyCode::Char('u'), &tx), KeyOutcome::Continue);
        assert_eq!(s.mode, Mode::Browse);
        handle_key(&mut s, KeyCode::Enter, &tx);
        assert!(s.view.alert.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn process_key_sends_current_request() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = confirmed();
        handle_key(&mut s, KeyCode::Char('p'), &tx);
        match rx.try_recv().unwrap() {
            UiCommand::Process(req) => assert_eq!(req.column_order, ["x", "y"]),
            other => panic!("unexpected command: {other:?}"),
        }
        // A second press while processing is rejected locally.
        handle_key(&mut s, KeyCode::Char('p'), &tx);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn typed_paths_become_an_upload() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = UiState::default();
        handle_key(&mut s, KeyCode::Char('u'), &tx);
        for c in "a.csv;b.xlsx".chars() {
            handle_key(&mut s, KeyCode::Char(c), &tx);
        }
        handle_key(&mut s, KeyCode::Enter, &tx);
        match rx.try_recv().unwrap() {
            UiCommand::Upload(paths) => {
                assert_eq!(paths, [PathBuf::from("a.csv"), PathBuf::from("b.xlsx")])
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(s.view.loading);
        assert!(screen(&s).contains("Loading"));
    }
}

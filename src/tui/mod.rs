mod help;

use crate::model::{ConsoleConfig, ConsoleEvent};
use crate::orchestrator::{self, UiCommand};
use crate::page::{Button, ButtonId, Page, MESSAGE_CONTAINER_ID};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use help::draw_help;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Terminal,
};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

#[derive(Default)]
struct UiState {
    page: Page,
    show_help: bool,
    /// Feedback for key presses that never reach the backend.
    info: String,
}

pub async fn run(cfg: ConsoleConfig) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<ConsoleEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    let res = orchestrator::run_controller(&cfg, event_tx, cmd_rx).await;

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

/// Run the TUI loop on a dedicated thread. The page is owned here and nowhere else.
fn run_threaded(
    mut event_rx: UnboundedReceiver<ConsoleEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::default();
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now() - tick_rate;

    let res = 'ui: loop {
        // Apply completed requests in arrival order.
        loop {
            match event_rx.try_recv() {
                Ok(ev) => state.page.apply(ev),
                Err(TryRecvError::Empty) => break,
                // Controller is gone (startup failure or shutdown).
                Err(TryRecvError::Disconnected) => break 'ui Ok(()),
            }
        }

        if let Ok(size) = terminal.size() {
            let rows = message_rows(Rect::new(0, 0, size.width, size.height));
            state.page.set_viewport(rows);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        if !event::poll(Duration::from_millis(10)).unwrap_or(false) {
            continue;
        }
        let Ok(Event::Key(k)) = event::read() else {
            continue;
        };
        if k.kind != KeyEventKind::Press {
            continue;
        }

        if let (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) =
            (k.modifiers, k.code)
        {
            let _ = cmd_tx.send(UiCommand::Quit);
            break Ok(());
        }

        // A pending alert is modal: only dismissal gets through.
        if state.page.alert().is_some() {
            if matches!(k.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                state.page.dismiss_alert();
            }
            continue;
        }

        match k.code {
            KeyCode::Char('r') => click(&mut state, ButtonId::RunAgents, &cmd_tx),
            KeyCode::Char('s') => click(&mut state, ButtonId::StopAgents, &cmd_tx),
            KeyCode::Up | KeyCode::Char('k') => state.page.scroll_by(-1),
            KeyCode::Down | KeyCode::Char('j') => state.page.scroll_by(1),
            KeyCode::PageUp => state.page.scroll_by(-10),
            KeyCode::PageDown => state.page.scroll_by(10),
            KeyCode::Home => state.page.message_container.scroll_top = 0,
            KeyCode::End => state.page.scroll_to_bottom(),
            KeyCode::Char('?') => state.show_help = !state.show_help,
            KeyCode::Esc => state.show_help = false,
            _ => {}
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn click(state: &mut UiState, id: ButtonId, cmd_tx: &UnboundedSender<UiCommand>) {
    match state.page.click(id) {
        Some(cmd) => {
            state.info.clear();
            let _ = cmd_tx.send(cmd);
        }
        None => {
            state.info = format!("{} is disabled", state.page.button(id).label);
        }
    }
}

/// Button row, message container, status line.
fn layout(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area)
}

/// Log rows visible inside the bordered message container.
fn message_rows(area: Rect) -> usize {
    layout(area)[1].height.saturating_sub(2) as usize
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = layout(area);

    draw_buttons(chunks[0], f, &state.page);
    draw_messages(chunks[1], f, &state.page);
    draw_status(chunks[2], f, state);

    if state.show_help {
        let rect = centered(area, 60, 16);
        f.render_widget(Clear, rect);
        draw_help(rect, f);
    }
    if let Some(text) = state.page.alert() {
        draw_alert(area, f, text);
    }
}

fn button_span(button: &Button, key: char) -> Span<'static> {
    let text = format!(" [{key}] {} ", button.label);
    if button.disabled {
        Span::styled(
            text,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT),
        )
    } else {
        Span::styled(
            text,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    }
}

fn draw_buttons(area: Rect, f: &mut ratatui::Frame, page: &Page) {
    let line = Line::from(vec![
        button_span(&page.run_button, 'r'),
        Span::raw("  "),
        button_span(&page.stop_button, 's'),
    ]);
    let p = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title("agent-console"),
    );
    f.render_widget(p, area);
}

fn draw_messages(area: Rect, f: &mut ratatui::Frame, page: &Page) {
    let lines = page.log_messages.lines();
    let viewport = area.height.saturating_sub(2) as usize;
    let max_top = lines.len().saturating_sub(viewport);
    let top = page.message_container.scroll_top.min(max_top);

    let body: Vec<Line> = lines.into_iter().map(Line::from).collect();
    let p = Paragraph::new(body)
        .scroll((top.min(u16::MAX as usize) as u16, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(MESSAGE_CONTAINER_ID),
        );
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let (text, style) = if !state.info.is_empty() {
        (state.info.as_str(), Style::default().fg(Color::Yellow))
    } else if let Some(d) = state.page.last_diagnostic() {
        (d, Style::default().fg(Color::Red))
    } else {
        ("Press ? for help", Style::default().fg(Color::Gray))
    };
    let p = Paragraph::new(Line::from(Span::styled(text.to_string(), style)))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

fn draw_alert(area: Rect, f: &mut ratatui::Frame, text: &str) {
    let rect = centered(area, 50, 7);
    f.render_widget(Clear, rect);
    let p = Paragraph::new(vec![
        Line::from(text.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to dismiss",
            Style::default().fg(Color::Gray),
        )),
    ])
    .wrap(Wrap { trim: false })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title("Alert"),
    );
    f.render_widget(p, rect);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ButtonStates;
    use ratatui::backend::TestBackend;

    fn render(state: &UiState) -> String {
        render_sized(state, 60, 20)
    }

    fn render_sized(state: &UiState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(f.area(), f, state)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_log_lines_and_buttons() {
        let mut state = UiState::default();
        state.page.apply(ConsoleEvent::LogMessages(vec![
            "agent started".into(),
            "agent idle".into(),
        ]));
        state.page.apply(ConsoleEvent::ButtonStates(ButtonStates::idle()));

        let screen = render(&state);
        assert!(screen.contains("agent started"));
        assert!(screen.contains("agent idle"));
        assert!(screen.contains("[r] Run Agents"));
        assert!(screen.contains("[s] Stop Agents"));
    }

    #[test]
    fn alert_is_drawn_over_the_page() {
        let mut state = UiState::default();
        state.page.apply(ConsoleEvent::StopAgentsReply("Stopped.".into()));
        let screen = render(&state);
        assert!(screen.contains("Alert"));
        assert!(screen.contains("Stopped."));
    }

    #[test]
    fn queued_alert_follows_the_dismissed_one() {
        let mut state = UiState::default();
        state.page.apply(ConsoleEvent::StopAgentsReply("first".into()));
        state.page.apply(ConsoleEvent::StopAgentsReply("second".into()));
        assert!(render(&state).contains("first"));

        state.page.dismiss_alert();
        let screen = render(&state);
        assert!(screen.contains("second"));
        assert!(!screen.contains("first"));
    }

    #[test]
    fn one_step_up_from_the_end_moves_the_view() {
        let mut state = UiState::default();
        let lines: Vec<String> = (0..100).map(|i| format!("line{i}")).collect();
        state.page.apply(ConsoleEvent::LogMessages(lines));
        state
            .page
            .set_viewport(message_rows(Rect::new(0, 0, 40, 20)));

        state.page.scroll_to_bottom();
        let bottom = render_sized(&state, 40, 20);
        assert!(bottom.contains("line88"));
        assert!(bottom.contains("line99"));
        assert!(!bottom.contains("line87"));

        state.page.scroll_by(-1);
        let up = render_sized(&state, 40, 20);
        assert!(up.contains("line87"));
        assert!(!up.contains("line99"));
    }

    #[test]
    fn disabled_click_reports_instead_of_sending() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = UiState::default();
        state
            .page
            .apply(ConsoleEvent::ButtonStates(ButtonStates::idle()));

        click(&mut state, ButtonId::StopAgents, &tx);
        assert!(rx.try_recv().is_err());
        assert_eq!(state.info, "Stop Agents is disabled");

        click(&mut state, ButtonId::RunAgents, &tx);
        assert_eq!(rx.try_recv().unwrap(), UiCommand::RunAgents);
        assert!(state.info.is_empty());
    }
}

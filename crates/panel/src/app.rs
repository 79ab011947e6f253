use std::{
    collections::VecDeque,
    io, thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tombola_core::{
    printer::LineStyle, Button, ButtonPanel, DeviceStatus, Level, Receipt, TombolaError, Trigger,
    TriggerOutcome,
};
use tracing::{error, info, warn};

use crate::{
    block_font,
    device::{describe_reset, Device},
};

const TICK_RATE: Duration = Duration::from_millis(100);
// Terminals without release events only repeat presses; silence this long counts as a release.
const RELEASE_AFTER: Duration = Duration::from_millis(750);
const HISTORY_LEN: usize = 8;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// Front panel: simulated buttons, pool counts and the last receipt.
pub struct PanelApp {
    device: Device,
    buttons: ButtonPanel,
    held: Vec<(Button, Instant)>,
    status: Option<DeviceStatus>,
    last_receipt: Option<Receipt>,
    winners: Vec<String>,
    history: VecDeque<String>,
    message: String,
    should_quit: bool,
    theme: Theme,
}

impl PanelApp {
    pub fn new(device: Device) -> Self {
        let buttons = ButtonPanel::new(device.debounce());
        Self {
            device,
            buttons,
            held: Vec::new(),
            status: None,
            last_receipt: None,
            winners: Vec::new(),
            history: VecDeque::with_capacity(HISTORY_LEN),
            message: String::new(),
            should_quit: false,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.refresh_status();
        let printer_note = if self.device.has_printer() {
            "printer attached"
        } else {
            "no printer configured; receipts shown on screen"
        };
        self.set_message(format!("Ready • {printer_note}"));

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            match event_rx.recv().await {
                Some(AppEvent::Input(Event::Key(key))) => self.handle_key(key, Instant::now()),
                Some(AppEvent::Input(_)) => {}
                Some(AppEvent::Tick) => self.handle_tick(Instant::now()),
                None => break,
            }
            if self.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        info!("panel closed");
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        let button = match key.code {
            KeyCode::Char(' ') | KeyCode::Char('d') => Some(Button::Draw),
            KeyCode::Char('r') => Some(Button::Reset),
            KeyCode::Char('m') => Some(Button::Mode),
            _ => None,
        };
        if let Some(button) = button {
            let level = if key.kind == KeyEventKind::Release {
                Level::High
            } else {
                Level::Low
            };
            self.sample_button(button, level, now);
            return;
        }
        if key.kind == KeyEventKind::Release {
            return;
        }

        match key.code {
            KeyCode::Char('R') => self.dispatch(Trigger::ResetAll),
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            _ => {}
        }
    }

    fn handle_tick(&mut self, now: Instant) {
        let stale: Vec<Button> = self
            .held
            .iter()
            .filter(|(_, at)| now.saturating_duration_since(*at) >= RELEASE_AFTER)
            .map(|(button, _)| *button)
            .collect();
        for button in stale {
            self.sample_button(button, Level::High, now);
        }
    }

    fn sample_button(&mut self, button: Button, level: Level, now: Instant) {
        self.held.retain(|(held, _)| *held != button);
        if level == Level::Low {
            self.held.push((button, now));
        }
        if let Some(trigger) = self.buttons.sample(button, level, now) {
            self.dispatch(trigger);
        }
    }

    // Runs on the event loop, so it must never wait for the arbiter.
    fn dispatch(&mut self, trigger: Trigger) {
        match self.device.arbiter().try_submit(trigger) {
            Ok(outcome) => self.apply_outcome(outcome),
            Err(err) => self.apply_error(err),
        }
        self.refresh_status();
    }

    fn apply_outcome(&mut self, outcome: TriggerOutcome) {
        match &outcome {
            TriggerOutcome::Drawn { outcome: drawn, .. } => {
                self.winners = drawn.names().into_iter().map(str::to_string).collect();
                let mut message = format!("Drawn: {}", self.winners.join(", "));
                if let Some(question) = drawn.question() {
                    message.push_str(&format!(" • {question}"));
                }
                self.set_message(message);
            }
            TriggerOutcome::Reset(report) => {
                self.winners.clear();
                self.set_message(describe_reset(report));
            }
            TriggerOutcome::ModeChanged(mode) => self.set_message(format!("Mode: {mode}")),
        }
        if let Some(receipt) = self.device.receipt_for(&outcome) {
            self.emit(receipt);
        }
    }

    fn apply_error(&mut self, err: TombolaError) {
        if matches!(err, TombolaError::Busy) {
            self.set_message("Busy; press ignored".to_string());
            return;
        }
        if !err.is_recoverable() {
            error!(%err, "trigger failed");
        }
        self.set_message(err.to_string());
        if let Some(receipt) = self.device.receipt_for_error(&err) {
            self.emit(receipt);
        }
    }

    fn emit(&mut self, receipt: Receipt) {
        if let Err(err) = self.device.print(&receipt) {
            self.set_message(format!("Printer error: {err:#}"));
        }
        self.last_receipt = Some(receipt);
    }

    fn refresh_status(&mut self) {
        match self.device.arbiter().status() {
            Ok(status) => self.status = Some(status),
            Err(err) => {
                warn!(%err, "status refresh failed");
                self.status = None;
            }
        }
    }

    fn set_message(&mut self, message: String) {
        let stamped = format!("{} {}", Local::now().format("%H:%M:%S"), message);
        self.history.push_front(stamped);
        self.history.truncate(HISTORY_LEN);
        self.message = message;
    }

    fn draw(&self, frame: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(12),
                Constraint::Length(3),
                Constraint::Length(HISTORY_LEN as u16 + 2),
                Constraint::Length(1),
            ])
            .split(frame.size());

        self.draw_header(frame, rows[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(rows[1]);
        self.draw_winner(frame, body[0]);
        self.draw_receipt(frame, body[1]);

        self.draw_counts(frame, rows[2]);
        self.draw_history(frame, rows[3]);
        self.draw_help(frame, rows[4]);
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let mode = self
            .status
            .map(|status| status.mode.label())
            .unwrap_or("unknown");
        let line = Line::from(vec![
            Span::styled(
                "TOMBOLA",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  mode: "),
            Span::styled(
                mode,
                Style::default()
                    .fg(self.theme.warning)
                    .add_modifier(Modifier::BOLD),
            ),
        ]);
        let header = Paragraph::new(line)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, area);
    }

    fn draw_winner(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title(" Winner ");
        let inner_width = area.width.saturating_sub(2) as usize;
        let style = Style::default().fg(self.theme.success);

        let mut lines: Vec<Line> = Vec::new();
        match self.winners.first() {
            None => lines.push(Line::from(Span::styled(
                "Press space to draw",
                Style::default().fg(self.theme.muted),
            ))),
            Some(first) => {
                match block_font::render_name(first, inner_width) {
                    Some(rows) => {
                        lines.extend(rows.into_iter().map(|row| Line::from(Span::styled(row, style))))
                    }
                    None => lines.push(Line::from(Span::styled(
                        first.clone(),
                        style.add_modifier(Modifier::BOLD),
                    ))),
                }
                lines.push(Line::default());
                for name in &self.winners {
                    lines.push(Line::from(Span::styled(
                        name.clone(),
                        Style::default()
                            .fg(self.theme.primary_fg)
                            .add_modifier(Modifier::BOLD),
                    )));
                }
            }
        }

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(paragraph, area);
    }

    fn draw_receipt(&self, frame: &mut Frame, area: Rect) {
        let title = if self.device.has_printer() {
            " Last receipt (printed) "
        } else {
            " Last receipt "
        };
        let block = Block::default().borders(Borders::ALL).title(title);
        let lines: Vec<Line> = match self.last_receipt.as_ref() {
            Some(receipt) => receipt
                .lines()
                .iter()
                .map(|line| {
                    let style = match line.style {
                        LineStyle::Emphasized => Style::default().add_modifier(Modifier::BOLD),
                        LineStyle::Normal => Style::default(),
                    };
                    Line::from(Span::styled(line.text.clone(), style))
                })
                .collect(),
            None => vec![Line::from(Span::styled(
                "Nothing printed yet",
                Style::default().fg(self.theme.muted),
            ))],
        };
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false })
            .block(block);
        frame.render_widget(paragraph, area);
    }

    fn draw_counts(&self, frame: &mut Frame, area: Rect) {
        let line = match self.status {
            Some(status) => {
                let roster_color = if status.roster.remaining == 0 {
                    self.theme.danger
                } else {
                    self.theme.success
                };
                Line::from(vec![
                    Span::raw("Roster "),
                    Span::styled(
                        format!("{}/{}", status.roster.remaining, status.roster.total),
                        Style::default().fg(roster_color),
                    ),
                    Span::raw("    Questions "),
                    Span::styled(
                        format!("{}/{}", status.questions.remaining, status.questions.total),
                        Style::default().fg(self.theme.accent),
                    ),
                ])
            }
            None => Line::from(Span::styled(
                "Storage unavailable",
                Style::default().fg(self.theme.danger),
            )),
        };
        let counts = Paragraph::new(line)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Remaining "));
        frame.render_widget(counts, area);
    }

    fn draw_history(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = self
            .history
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let color = if index == 0 {
                    self.theme.primary_fg
                } else {
                    self.theme.muted
                };
                Line::from(Span::styled(entry.clone(), Style::default().fg(color)))
            })
            .collect();
        let history = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(" Activity "));
        frame.render_widget(history, area);
    }

    fn draw_help(&self, frame: &mut Frame, area: Rect) {
        let help = Paragraph::new(Line::from(Span::styled(
            "space/d draw • r reset roster • m mode • R reset all • q quit",
            Style::default().fg(self.theme.muted),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(help, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

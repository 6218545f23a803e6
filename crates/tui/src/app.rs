use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gamevault_core::{
    launch::{plan, Elevation, Executor, LaunchAction, SystemExecutor},
    Catalog, Dispatcher, FormTarget, GameForm, GameRecord, HostOs, LaunchError, LoadSummary,
    RecordError, RecordId,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::{
    form::{FormAction, FormModal},
    theme::Theme,
};

const TICK_RATE: Duration = Duration::from_millis(250);

enum AppEvent {
    Input(Event),
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Notice {
    level: Level,
    text: String,
}

enum Modal {
    Form(FormModal),
    ConfirmDelete { id: RecordId, name: String },
    ConfirmElevation { name: String, action: LaunchAction },
    Help,
}

/// Terminal front end over a [`Catalog`] and a launch [`Dispatcher`].
pub struct App<E: Executor = SystemExecutor> {
    catalog: Catalog,
    dispatcher: Dispatcher<E>,
    host: HostOs,
    theme: Theme,
    platforms: Vec<String>,
    state: UiState,
    modal: Option<Modal>,
}

impl<E: Executor> App<E> {
    pub fn new(
        catalog: Catalog,
        dispatcher: Dispatcher<E>,
        host: HostOs,
        theme: Theme,
        platforms: Vec<String>,
    ) -> Self {
        let mut app = Self {
            catalog,
            dispatcher,
            host,
            theme,
            platforms,
            state: UiState::default(),
            modal: None,
        };
        app.sync_selection();
        app
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        let result = loop {
            if let Err(err) = terminal.draw(|frame| self.draw(frame)) {
                break Err(err).context("failed to draw frame");
            }
            if self.state.should_quit {
                break Ok(());
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) || self.state.should_quit {
                break Ok(());
            }
        };

        restore_terminal(&mut terminal)?;
        info!("Terminal restored");
        result
    }

    /// Turn a load outcome into a status line.
    pub fn report_load(&mut self, summary: &LoadSummary) {
        let path = self.catalog.store().path().display().to_string();
        if let Some(err) = &summary.notice {
            self.notify(Level::Error, format!("Could not load library: {err}"));
        } else if summary.skipped > 0 {
            self.notify(
                Level::Warning,
                format!(
                    "Loaded {} games from {path}; holding back {} invalid entries",
                    summary.records, summary.skipped
                ),
            );
        } else {
            self.notify(
                Level::Info,
                format!("Loaded {} games from {path}", summary.records),
            );
        }
    }

    fn notify(&mut self, level: Level, text: String) {
        self.state.status = Notice { level, text };
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                self.handle_key(key);
                true
            }
            Some(AppEvent::Input(_)) | Some(AppEvent::Tick) => true,
            None => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return;
        }
        match self.modal.take() {
            Some(modal) => self.modal = self.handle_modal_key(modal, key),
            None => self.handle_browse_key(key),
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('r') {
                self.reload();
            }
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.state.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::PageDown => self.move_selection(self.state.list_height.max(1) as isize),
            KeyCode::PageUp => self.move_selection(-(self.state.list_height.max(1) as isize)),
            KeyCode::Char('g') | KeyCode::Home => self.move_selection(isize::MIN),
            KeyCode::Char('G') | KeyCode::End => self.move_selection(isize::MAX),
            KeyCode::Enter | KeyCode::Char('l') => self.launch_selected(),
            KeyCode::Char('a') => {
                self.modal = Some(Modal::Form(FormModal::new(
                    FormTarget::New,
                    GameForm::default(),
                    self.platforms.clone(),
                )));
            }
            KeyCode::Char('e') => match self.selected_record() {
                Some(record) => {
                    let form = GameForm::from_record(record);
                    let target = FormTarget::Edit(record.id());
                    self.modal = Some(Modal::Form(FormModal::new(
                        target,
                        form,
                        self.platforms.clone(),
                    )));
                }
                None => self.notify(Level::Warning, "Select a game to edit".to_string()),
            },
            KeyCode::Char('d') | KeyCode::Delete => match self.selected_record() {
                Some(record) => {
                    self.modal = Some(Modal::ConfirmDelete {
                        id: record.id(),
                        name: record.name.clone(),
                    });
                }
                None => self.notify(Level::Warning, "Select a game to delete".to_string()),
            },
            KeyCode::Char('?') => self.modal = Some(Modal::Help),
            _ => {}
        }
    }

    /// Returns the modal to keep open, if any.
    fn handle_modal_key(&mut self, modal: Modal, key: KeyEvent) -> Option<Modal> {
        match modal {
            Modal::Form(mut form) => match form.handle_key(key) {
                FormAction::Continue => Some(Modal::Form(form)),
                FormAction::Cancel => {
                    self.notify(Level::Info, "Edit cancelled".to_string());
                    None
                }
                FormAction::Submit => self.submit_form(form),
            },
            Modal::ConfirmDelete { id, name } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.delete(id);
                    None
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.notify(Level::Info, format!("Kept {name}"));
                    None
                }
                _ => Some(Modal::ConfirmDelete { id, name }),
            },
            Modal::ConfirmElevation { name, action } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.execute_launch(&name, &action, Elevation::Confirmed);
                    None
                }
                KeyCode::Char('n') | KeyCode::Char('N') => {
                    self.execute_launch(&name, &action, Elevation::Declined);
                    None
                }
                KeyCode::Esc => {
                    self.notify(Level::Info, format!("Launch of {name} cancelled"));
                    None
                }
                _ => Some(Modal::ConfirmElevation { name, action }),
            },
            Modal::Help => match key.code {
                KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => None,
                _ => Some(Modal::Help),
            },
        }
    }

    fn submit_form(&mut self, mut form: FormModal) -> Option<Modal> {
        let values = form.form();
        match self.catalog.submit(form.target(), &values) {
            Ok(committed) => {
                self.state.selected = Some(committed.id);
                self.sync_selection();
                let verb = if committed.created { "Added" } else { "Updated" };
                match committed.persist_error {
                    Some(err) => self.notify(
                        Level::Error,
                        format!("{verb} {} but could not save: {err}", values.name.trim()),
                    ),
                    None => self.notify(Level::Success, format!("{verb} {}", values.name.trim())),
                }
                None
            }
            Err(RecordError::Invalid(err)) => {
                form.reject(err);
                Some(Modal::Form(form))
            }
            Err(err @ RecordError::Unknown(_)) => {
                warn!("Form target vanished: {err}");
                self.sync_selection();
                self.notify(Level::Error, format!("Could not save: {err}"));
                None
            }
        }
    }

    fn delete(&mut self, id: RecordId) {
        match self.catalog.remove(id) {
            Ok(removed) => {
                self.sync_selection();
                match removed.persist_error {
                    Some(err) => self.notify(
                        Level::Error,
                        format!("Deleted {} but could not save: {err}", removed.record.name),
                    ),
                    None => self.notify(Level::Success, format!("Deleted {}", removed.record.name)),
                }
            }
            Err(err) => {
                self.sync_selection();
                self.notify(Level::Error, format!("Could not delete: {err}"));
            }
        }
    }

    fn reload(&mut self) {
        let summary = self.catalog.reload();
        // ids are reassigned on load; keep the list position instead
        self.state.selected = None;
        self.sync_selection();
        self.report_load(&summary);
    }

    fn launch_selected(&mut self) {
        let Some(record) = self.selected_record() else {
            self.notify(Level::Warning, "Select a game to launch".to_string());
            return;
        };
        let name = record.name.clone();
        match plan(&record.launch_path, self.host) {
            Ok(action) if action.needs_confirmation() => {
                self.modal = Some(Modal::ConfirmElevation { name, action });
            }
            Ok(action) => self.execute_launch(&name, &action, Elevation::Declined),
            Err(err) => self.report_launch_error(&name, err),
        }
    }

    fn execute_launch(&mut self, name: &str, action: &LaunchAction, elevation: Elevation) {
        match self.dispatcher.execute(action, elevation) {
            Ok(outcome) => {
                info!(game = name, method = ?outcome.method, fell_back = outcome.fell_back, "Game launched");
                let text = if outcome.fell_back {
                    format!("Launched {name} without administrator rights")
                } else {
                    format!("Launched {name}")
                };
                self.notify(Level::Success, text);
            }
            Err(err) => self.report_launch_error(name, err),
        }
    }

    fn report_launch_error(&mut self, name: &str, err: LaunchError) {
        match err {
            LaunchError::NoPath => {
                self.notify(Level::Warning, format!("No launch path set for {name}"));
            }
            err => {
                error!(game = name, "Launch failed: {err}");
                self.notify(Level::Error, format!("Could not launch {name}: {err}"));
            }
        }
    }

    fn selected_record(&self) -> Option<&GameRecord> {
        self.state.selected.and_then(|id| self.catalog.get(id))
    }

    /// Re-resolve the list cursor from the selected id. A vanished id falls
    /// back to the nearest row.
    fn sync_selection(&mut self) {
        let rows = self.catalog.sorted();
        let index = self
            .state
            .selected
            .and_then(|id| rows.iter().position(|record| record.id() == id))
            .or_else(|| {
                let last = rows.len().checked_sub(1)?;
                Some(self.state.list_state.selected().unwrap_or(0).min(last))
            });
        self.state.selected = index.map(|idx| rows[idx].id());
        self.state.list_state.select(index);
    }

    fn move_selection(&mut self, delta: isize) {
        let rows = self.catalog.sorted();
        let Some(last) = rows.len().checked_sub(1) else {
            return;
        };
        let current = self.state.list_state.selected().unwrap_or(0) as isize;
        let next = current.saturating_add(delta).clamp(0, last as isize) as usize;
        self.state.selected = Some(rows[next].id());
        self.state.list_state.select(Some(next));
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.background).fg(self.theme.text)),
            area,
        );
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(5),
                Constraint::Length(4),
            ])
            .split(area);
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);

        self.render_header(frame, rows[0]);
        self.render_game_list(frame, body[0]);
        self.render_game_info(frame, body[1]);
        self.render_status(frame, rows[2]);

        match &self.modal {
            Some(Modal::Form(form)) => {
                form.render(frame, centered_rect(72, 18, area), &self.theme);
            }
            Some(Modal::ConfirmDelete { name, .. }) => {
                let lines = vec![
                    Line::from(format!("Delete {name} from the library?")),
                    Line::from(""),
                    key_hints(&[("y", "delete"), ("n", "keep")]),
                ];
                self.render_dialog(frame, " Delete Game ", lines, self.theme.danger);
            }
            Some(Modal::ConfirmElevation { name, action }) => {
                let lines = vec![
                    Line::from(format!("Run {name} as administrator?")),
                    Line::from(Span::styled(
                        action.target().to_string(),
                        Style::default().fg(self.theme.muted),
                    )),
                    Line::from(""),
                    key_hints(&[("y", "elevate"), ("n", "normal launch"), ("Esc", "cancel")]),
                ];
                self.render_dialog(frame, " Administrator Rights ", lines, self.theme.warning);
            }
            Some(Modal::Help) => self.render_help(frame, area),
            None => {}
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled(
                " GAME VAULT ",
                Style::default()
                    .bg(self.theme.accent)
                    .fg(self.theme.on_accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  {} games", self.catalog.len())),
            Span::styled("   ? help", Style::default().fg(self.theme.muted)),
        ]);
        frame.render_widget(
            Paragraph::new(line).style(Style::default().bg(self.theme.header)),
            area,
        );
    }

    fn render_game_list(&mut self, frame: &mut Frame, area: Rect) {
        self.state.list_height = area.height.saturating_sub(2) as usize;
        let records = self.catalog.sorted();
        let items: Vec<ListItem> = records
            .iter()
            .map(|record| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        record.name.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(" · {}", record.platform),
                        Style::default().fg(self.theme.muted),
                    ),
                ]))
            })
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Library ")
            .style(Style::default().bg(self.theme.panel));
        if items.is_empty() {
            let paragraph = Paragraph::new("No games yet. Press a to add one.")
                .block(block)
                .style(Style::default().fg(self.theme.muted))
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }
        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(self.theme.selection_bg)
                    .fg(self.theme.selection_fg),
            )
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, area, &mut self.state.list_state);
    }

    fn render_game_info(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Game Details ")
            .style(Style::default().bg(self.theme.panel));
        let Some(record) = self.selected_record() else {
            let paragraph = Paragraph::new("No game selected")
                .block(block)
                .style(Style::default().fg(self.theme.muted));
            frame.render_widget(paragraph, area);
            return;
        };

        let label = |text: &'static str| Span::styled(text, Style::default().fg(self.theme.muted));
        let or_none = |value: &str| {
            if value.trim().is_empty() {
                "(none)".to_string()
            } else {
                value.to_string()
            }
        };
        let saved = record
            .saved_at()
            .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let mut lines = vec![
            Line::from(Span::styled(
                record.name.clone(),
                Style::default()
                    .fg(self.theme.accent_alt)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![label("Platform     "), Span::raw(record.platform.clone())]),
            Line::from(vec![
                label("Launch path  "),
                Span::raw(or_none(&record.launch_path)),
            ]),
            Line::from(vec![
                label("Opens with   "),
                Span::raw(describe_launch(&record.launch_path, self.host)),
            ]),
            Line::from(vec![label("Image        "), Span::raw(or_none(&record.image))]),
            Line::from(vec![label("Last saved   "), Span::raw(saved)]),
            Line::from(""),
        ];
        if record.description.trim().is_empty() {
            lines.push(Line::from(Span::styled(
                "No description",
                Style::default().fg(self.theme.muted),
            )));
        } else {
            lines.extend(record.description.lines().map(|line| Line::from(line.to_string())));
        }

        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let color = match self.state.status.level {
            Level::Info => self.theme.text,
            Level::Success => self.theme.success,
            Level::Warning => self.theme.warning,
            Level::Error => self.theme.danger,
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Status ")
            .style(Style::default().bg(self.theme.header));
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(
                self.state.status.text.clone(),
                Style::default().fg(color),
            )),
            key_hints(&[
                ("Enter", "launch"),
                ("a", "add"),
                ("e", "edit"),
                ("d", "delete"),
                ("Ctrl-R", "reload"),
                ("q", "quit"),
            ]),
        ])
        .block(block);
        frame.render_widget(paragraph, area);
    }

    fn render_dialog(&self, frame: &mut Frame, title: &str, lines: Vec<Line>, border: Color) {
        let area = centered_rect(56, lines.len() as u16 + 2, frame.size());
        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title.to_string())
                    .border_style(Style::default().fg(border)),
            )
            .style(Style::default().bg(self.theme.panel).fg(self.theme.text))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let entries = [
            ("j / k / ↑ / ↓", "move selection"),
            ("g / G / Home / End", "first / last game"),
            ("PgUp / PgDn", "page through the list"),
            ("Enter / l", "launch the selected game"),
            ("a", "add a game"),
            ("e", "edit the selected game"),
            ("d", "delete the selected game"),
            ("Ctrl-R", "reload the library file"),
            ("?", "toggle this help"),
            ("q / Esc", "quit"),
            ("", ""),
            ("Tab / Shift-Tab", "next / previous form field"),
            ("← / →", "cycle platforms (platform field)"),
            ("Ctrl-S", "save the form"),
        ];
        let lines: Vec<Line> = entries
            .iter()
            .map(|(key, action)| {
                Line::from(vec![
                    Span::styled(
                        format!("{key:<20}"),
                        Style::default()
                            .fg(self.theme.accent_alt)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(*action),
                ])
            })
            .collect();
        let rect = centered_rect(60, lines.len() as u16 + 2, area);
        frame.render_widget(Clear, rect);
        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Keys ")
                .style(Style::default().bg(self.theme.panel).fg(self.theme.text)),
        );
        frame.render_widget(paragraph, rect);
    }
}

fn describe_launch(path: &str, host: HostOs) -> String {
    match plan(path, host) {
        Ok(LaunchAction::Elevate { .. }) => "administrator prompt, then the executable".to_string(),
        Ok(LaunchAction::ShellOpenUri { launcher, .. }) => launcher.label().to_string(),
        Ok(LaunchAction::OsOpen { .. }) => "associated program".to_string(),
        Ok(LaunchAction::GenericOpen { program, .. }) => program.to_string(),
        Err(_) => "nothing to launch".to_string(),
    }
}

fn key_hints(pairs: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = Vec::new();
    for (idx, (key, action)) in pairs.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(*key, Style::default().add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(format!(" {action}")));
    }
    Line::from(spans)
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

struct UiState {
    selected: Option<RecordId>,
    list_state: ListState,
    list_height: usize,
    status: Notice,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            selected: None,
            list_state: ListState::default(),
            list_height: 1,
            status: Notice {
                level: Level::Info,
                text: "Ready".to_string(),
            },
            should_quit: false,
        }
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamevault_core::LibraryStore;
    use std::{cell::RefCell, fs};
    use tempfile::{tempdir, TempDir};

    #[derive(Default)]
    struct RecordingExecutor {
        calls: RefCell<Vec<String>>,
    }

    impl Executor for RecordingExecutor {
        fn run_elevated(&self, path: &str) -> io::Result<()> {
            self.calls.borrow_mut().push(format!("elevated {path}"));
            Ok(())
        }

        fn shell_open(&self, uri: &str) -> io::Result<()> {
            self.calls.borrow_mut().push(format!("shell {uri}"));
            Ok(())
        }

        fn os_open(&self, path: &str) -> io::Result<()> {
            self.calls.borrow_mut().push(format!("open {path}"));
            Ok(())
        }

        fn generic_open(&self, program: &str, path: &str) -> io::Result<()> {
            self.calls.borrow_mut().push(format!("{program} {path}"));
            Ok(())
        }

        fn exists(&self, _path: &str) -> bool {
            true
        }
    }

    fn app_with(dir: &TempDir, json: &str, host: HostOs) -> App<RecordingExecutor> {
        let path = dir.path().join("library.json");
        fs::write(&path, json).expect("seed library");
        let (catalog, summary) = Catalog::open(LibraryStore::new(path));
        let platforms = vec!["Steam".to_string(), "GoG".to_string()];
        let mut app = App::new(
            catalog,
            Dispatcher::new(RecordingExecutor::default()),
            host,
            Theme::default(),
            platforms,
        );
        app.report_load(&summary);
        app
    }

    fn press(app: &mut App<RecordingExecutor>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App<RecordingExecutor>, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn calls(app: &App<RecordingExecutor>) -> Vec<String> {
        app.dispatcher.executor().calls.borrow().clone()
    }

    #[test]
    fn add_game_through_form_selects_it() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut app = app_with(&dir, "[]", HostOs::OtherUnix);
        assert!(app.state.selected.is_none());

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Celeste");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));

        assert!(app.modal.is_none());
        assert_eq!(app.catalog.len(), 1);
        let selected = app.selected_record().expect("selection");
        assert_eq!(selected.name, "Celeste");
        assert_eq!(selected.platform, "Steam");
        assert_eq!(app.state.status.level, Level::Success);
        assert!(fs::read_to_string(dir.path().join("library.json"))?.contains("Celeste"));
        Ok(())
    }

    #[test]
    fn incomplete_form_stays_open() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut app = app_with(&dir, "[]", HostOs::OtherUnix);
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Celeste");
        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));

        assert!(matches!(app.modal, Some(Modal::Form(_))));
        assert!(app.catalog.is_empty());
        press(&mut app, KeyCode::Esc);
        assert!(app.modal.is_none());
        Ok(())
    }

    #[test]
    fn delete_requires_confirmation_and_moves_selection() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut app = app_with(
            &dir,
            r#"[{"name": "b", "platform": "Steam"}, {"name": "a", "platform": "GoG"}, {"name": "c", "platform": "GoG"}]"#,
            HostOs::OtherUnix,
        );
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected_record().map(|r| r.name.as_str()), Some("b"));

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.catalog.len(), 3);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.catalog.len(), 2);
        assert_eq!(app.selected_record().map(|r| r.name.as_str()), Some("c"));

        press(&mut app, KeyCode::Char('G'));
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.selected_record().map(|r| r.name.as_str()), Some("a"));
        Ok(())
    }

    #[test]
    fn windows_executable_asks_before_elevating() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut app = app_with(
            &dir,
            r#"[{"name": "Doom", "platform": "GoG", "launchPath": "C:\\Games\\DOOM.EXE"}]"#,
            HostOs::Windows,
        );
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.modal, Some(Modal::ConfirmElevation { .. })));
        assert!(calls(&app).is_empty());

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(calls(&app), vec![r"open C:\Games\DOOM.EXE".to_string()]);

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(calls(&app)[1], r"elevated C:\Games\DOOM.EXE");
        Ok(())
    }

    #[test]
    fn missing_launch_path_is_a_warning() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut app = app_with(&dir, r#"[{"name": "Braid", "platform": "Steam"}]"#, HostOs::MacOs);
        press(&mut app, KeyCode::Char('l'));
        assert!(calls(&app).is_empty());
        assert_eq!(app.state.status.level, Level::Warning);
        assert!(app.state.status.text.contains("Braid"));
        Ok(())
    }

    #[test]
    fn reload_picks_up_external_changes() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut app = app_with(&dir, "[]", HostOs::OtherUnix);
        fs::write(
            dir.path().join("library.json"),
            r#"[{"name": "Inside", "platform": "Steam", "launchPath": "steam://rungameid/304430"}]"#,
        )?;
        app.handle_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL));
        assert_eq!(app.catalog.len(), 1);

        press(&mut app, KeyCode::Enter);
        assert_eq!(calls(&app), vec!["xdg-open steam://rungameid/304430".to_string()]);
        Ok(())
    }
}

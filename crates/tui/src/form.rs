use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use gamevault_core::{FormTarget, GameForm, ValidationError};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::theme::Theme;

const MAX_INPUT_CHARS: usize = 2048;
const LABEL_WIDTH: u16 = 14;

/// Editable single or multi line text with a character cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set(&mut self, value: impl Into<String>) {
        *self = Self::new(value);
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.value.len())
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    pub fn insert(&mut self, ch: char) {
        if self.len() >= MAX_INPUT_CHARS || (ch.is_control() && ch != '\n') {
            return;
        }
        let idx = self.byte_index(self.cursor);
        self.value.insert(idx, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let idx = self.byte_index(self.cursor);
            self.value.remove(idx);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let idx = self.byte_index(self.cursor);
            self.value.remove(idx);
        }
    }

    /// Line and column of the cursor, counted in characters.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for ch in self.value.chars().take(self.cursor) {
            if ch == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    /// Slice of a single line value that fits `width`, keeping the cursor in view.
    fn window(&self, width: usize) -> (String, usize) {
        if width == 0 {
            return (String::new(), 0);
        }
        let start = (self.cursor + 1).saturating_sub(width);
        let text = self.value.chars().skip(start).take(width).collect();
        (text, self.cursor - start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Platform,
    LaunchPath,
    Image,
    Description,
}

impl Field {
    const ALL: [Field; 5] = [
        Field::Name,
        Field::Platform,
        Field::LaunchPath,
        Field::Image,
        Field::Description,
    ];

    fn index(self) -> usize {
        Self::ALL.iter().position(|field| *field == self).unwrap_or(0)
    }

    fn label(self) -> &'static str {
        match self {
            Field::Name => "Name*",
            Field::Platform => "Platform*",
            Field::LaunchPath => "Launch path",
            Field::Image => "Image",
            Field::Description => "Description",
        }
    }
}

impl From<ValidationError> for Field {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingName => Field::Name,
            ValidationError::MissingPlatform => Field::Platform,
        }
    }
}

/// What the app should do after a key reached the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    Continue,
    Submit,
    Cancel,
}

/// Add/edit dialog state.
#[derive(Debug, Clone)]
pub struct FormModal {
    target: FormTarget,
    inputs: [TextInput; 5],
    focus: Field,
    platforms: Vec<String>,
    error: Option<String>,
}

impl FormModal {
    pub fn new(target: FormTarget, form: GameForm, platforms: Vec<String>) -> Self {
        Self {
            target,
            inputs: [
                TextInput::new(form.name),
                TextInput::new(form.platform),
                TextInput::new(form.launch_path),
                TextInput::new(form.image),
                TextInput::new(form.description),
            ],
            focus: Field::Name,
            platforms,
            error: None,
        }
    }

    pub fn target(&self) -> FormTarget {
        self.target
    }

    pub fn focus(&self) -> Field {
        self.focus
    }

    pub fn form(&self) -> GameForm {
        let value = |field: Field| self.inputs[field.index()].value().to_string();
        GameForm {
            name: value(Field::Name),
            platform: value(Field::Platform),
            launch_path: value(Field::LaunchPath),
            image: value(Field::Image),
            description: value(Field::Description),
        }
    }

    /// Show a rejection and move to the offending field.
    pub fn reject(&mut self, err: ValidationError) {
        self.focus = Field::from(err);
        self.error = Some(err.to_string());
    }

    fn input_mut(&mut self) -> &mut TextInput {
        &mut self.inputs[self.focus.index()]
    }

    fn move_focus(&mut self, delta: isize) {
        let len = Field::ALL.len() as isize;
        let next = (self.focus.index() as isize + delta).rem_euclid(len);
        self.focus = Field::ALL[next as usize];
    }

    /// Step through the platform suggestions. A value not in the list starts
    /// from the first (or last) suggestion.
    pub fn cycle_platform(&mut self, delta: isize) {
        if self.platforms.is_empty() {
            return;
        }
        let len = self.platforms.len() as isize;
        let current = self.inputs[Field::Platform.index()].value().trim();
        let next = match self
            .platforms
            .iter()
            .position(|platform| platform.eq_ignore_ascii_case(current))
        {
            Some(idx) => (idx as isize + delta).rem_euclid(len),
            None if delta < 0 => len - 1,
            None => 0,
        };
        let choice = self.platforms[next as usize].clone();
        self.inputs[Field::Platform.index()].set(choice);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('s') => FormAction::Submit,
                _ => FormAction::Continue,
            };
        }
        match key.code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Tab | KeyCode::Down => self.move_focus(1),
            KeyCode::BackTab | KeyCode::Up => self.move_focus(-1),
            KeyCode::Enter if self.focus == Field::Description => self.input_mut().insert('\n'),
            KeyCode::Enter => self.move_focus(1),
            KeyCode::Left if self.focus == Field::Platform => self.cycle_platform(-1),
            KeyCode::Right if self.focus == Field::Platform => self.cycle_platform(1),
            KeyCode::Left => self.input_mut().move_cursor(-1),
            KeyCode::Right => self.input_mut().move_cursor(1),
            KeyCode::Home => self.input_mut().move_home(),
            KeyCode::End => self.input_mut().move_end(),
            KeyCode::Backspace => self.input_mut().backspace(),
            KeyCode::Delete => self.input_mut().delete(),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::ALT) => {
                self.input_mut().insert(ch)
            }
            _ => {}
        }
        self.error = None;
        FormAction::Continue
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        frame.render_widget(Clear, area);
        let title = match self.target {
            FormTarget::New => " Add Game ",
            FormTarget::Edit(_) => " Edit Game ",
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(theme.accent))
            .style(Style::default().bg(theme.panel).fg(theme.text));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(1),
                Constraint::Min(2),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        let value_width = rows[0].width.saturating_sub(LABEL_WIDTH) as usize;
        let mut cursor = None;
        let mut lines = Vec::new();
        for (row, field) in Field::ALL[..4].iter().enumerate() {
            let input = &self.inputs[field.index()];
            let (text, col) = input.window(value_width);
            let focused = *field == self.focus;
            let label_style = if focused {
                Style::default()
                    .fg(theme.accent_alt)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.muted)
            };
            let mut spans = vec![
                Span::styled(
                    format!("{:<width$}", field.label(), width = LABEL_WIDTH as usize),
                    label_style,
                ),
                Span::raw(text),
            ];
            if *field == Field::Platform && focused {
                spans.push(Span::styled("  ←/→", Style::default().fg(theme.muted)));
            }
            lines.push(Line::from(spans));
            if focused {
                cursor = Some((rows[0].x + LABEL_WIDTH + col as u16, rows[0].y + row as u16));
            }
        }
        frame.render_widget(Paragraph::new(lines), rows[0]);

        let description_focused = self.focus == Field::Description;
        let label_style = if description_focused {
            Style::default()
                .fg(theme.accent_alt)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.muted)
        };
        frame.render_widget(
            Paragraph::new(Span::styled(Field::Description.label(), label_style)),
            rows[1],
        );

        let description = &self.inputs[Field::Description.index()];
        let (line, col) = description.cursor_line_col();
        let height = rows[2].height.max(1) as usize;
        let scroll = line.saturating_sub(height - 1);
        frame.render_widget(
            Paragraph::new(description.value())
                .style(Style::default().bg(theme.background))
                .scroll((scroll as u16, 0)),
            rows[2],
        );
        if description_focused {
            let x = rows[2].x + (col as u16).min(rows[2].width.saturating_sub(1));
            cursor = Some((x, rows[2].y + (line - scroll) as u16));
        }

        if let Some(error) = &self.error {
            frame.render_widget(
                Paragraph::new(Span::styled(error.as_str(), Style::default().fg(theme.danger))),
                rows[3],
            );
        }
        let key = |text: &'static str| {
            Span::styled(text, Style::default().add_modifier(Modifier::BOLD))
        };
        let help = Line::from(vec![
            key("Ctrl-S"),
            Span::raw(" save  "),
            key("Tab"),
            Span::raw(" next field  "),
            key("Esc"),
            Span::raw(" cancel"),
        ]);
        frame.render_widget(
            Paragraph::new(help).style(Style::default().fg(theme.muted)),
            rows[4],
        );

        if let Some((x, y)) = cursor {
            frame.set_cursor(x, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(form: &mut FormModal, text: &str) {
        for ch in text.chars() {
            form.handle_key(press(KeyCode::Char(ch)));
        }
    }

    fn platforms() -> Vec<String> {
        ["Steam", "GoG", "Other"].iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn text_input_edits_by_character() {
        let mut input = TextInput::new("Pokémon");
        input.move_cursor(-1);
        input.backspace();
        input.insert('ó');
        assert_eq!(input.value(), "Pokémón");
        input.move_home();
        input.delete();
        assert_eq!(input.value(), "okémón");
        input.move_cursor(-5);
        input.move_end();
        input.insert('!');
        assert_eq!(input.value(), "okémón!");
    }

    #[test]
    fn cursor_tracks_lines() {
        let input = TextInput::new("first\nsecond");
        assert_eq!(input.cursor_line_col(), (1, 6));
        let (text, col) = TextInput::new("abcdefgh").window(4);
        assert_eq!(text, "fgh");
        assert_eq!(col, 3);
    }

    #[test]
    fn typing_builds_the_form() {
        let mut form = FormModal::new(FormTarget::New, GameForm::default(), platforms());
        type_text(&mut form, "Hades");
        form.handle_key(press(KeyCode::Enter));
        assert_eq!(form.focus(), Field::Platform);
        form.handle_key(press(KeyCode::Right));
        form.handle_key(press(KeyCode::Right));
        form.handle_key(press(KeyCode::Tab));
        type_text(&mut form, "steam://rungameid/1145360");
        form.handle_key(press(KeyCode::BackTab));
        form.handle_key(press(KeyCode::BackTab));
        form.handle_key(press(KeyCode::Up));
        assert_eq!(form.focus(), Field::Description);
        type_text(&mut form, "Roguelike");
        form.handle_key(press(KeyCode::Enter));
        type_text(&mut form, "Supergiant");

        let game = form.form();
        assert_eq!(game.name, "Hades");
        assert_eq!(game.platform, "GoG");
        assert_eq!(game.launch_path, "steam://rungameid/1145360");
        assert_eq!(game.description, "Roguelike\nSupergiant");
        assert_eq!(
            form.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)),
            FormAction::Submit
        );
        assert_eq!(form.handle_key(press(KeyCode::Esc)), FormAction::Cancel);
    }

    #[test]
    fn platform_cycle_wraps_and_starts_from_unknown() {
        let form = GameForm {
            platform: "itch.io".to_string(),
            ..GameForm::default()
        };
        let mut form = FormModal::new(FormTarget::New, form, platforms());
        form.cycle_platform(-1);
        assert_eq!(form.form().platform, "Other");
        form.cycle_platform(1);
        assert_eq!(form.form().platform, "Steam");
    }

    #[test]
    fn rejection_focuses_the_missing_field() {
        let mut form = FormModal::new(FormTarget::New, GameForm::default(), platforms());
        form.reject(ValidationError::MissingPlatform);
        assert_eq!(form.focus(), Field::Platform);
        assert!(form.error.is_some());
        form.handle_key(press(KeyCode::Char('x')));
        assert!(form.error.is_none());
    }
}

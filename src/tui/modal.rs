// Overlay widgets for the TUI
//
// Self-contained inputs that handle their own keys and return an action.
// The owning UiState variant holds the widget; the state handler acts on the
// returned action.

use crate::util::display_width;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Actions returned by text input handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Input consumed, nothing to do
    None,
    /// Buffer changed
    Changed,
    /// Typed character would exceed the width limit
    TooLong,
    Submit,
    Cancel,
}

/// A single text buffer with an optional display-width limit
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    pub title: String,
    pub value: String,
    max_width: Option<usize>,
    multiline: bool,
}

impl TextInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn max_width(mut self, cols: usize) -> Self {
        self.max_width = Some(cols);
        self
    }

    /// Alt+Enter inserts a newline; plain Enter still submits
    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    /// Append one character, respecting the width limit
    pub fn push(&mut self, ch: char) -> InputAction {
        if let Some(max) = self.max_width {
            let mut buf = [0u8; 4];
            if display_width(&self.value) + display_width(ch.encode_utf8(&mut buf)) > max {
                return InputAction::TooLong;
            }
        }
        self.value.push(ch);
        InputAction::Changed
    }

    pub fn handle_input(&mut self, key: &KeyEvent) -> InputAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => InputAction::Cancel,
            KeyCode::Char('c') if ctrl => InputAction::Cancel,
            KeyCode::Enter if self.multiline && key.modifiers.contains(KeyModifiers::ALT) => {
                self.value.push('\n');
                InputAction::Changed
            }
            KeyCode::Enter => InputAction::Submit,
            KeyCode::Backspace => {
                if self.value.pop().is_some() {
                    InputAction::Changed
                } else {
                    InputAction::None
                }
            }
            KeyCode::Char('u') if ctrl => {
                self.value.clear();
                InputAction::Changed
            }
            KeyCode::Char(ch) if !ctrl => self.push(ch),
            _ => InputAction::None,
        }
    }
}

/// Actions returned by picker input handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerAction {
    None,
    /// Index into the picker's full item list
    Submit(usize),
    Cancel,
}

/// Filterable single-choice list
#[derive(Debug, Clone, Default)]
pub struct Picker {
    pub title: String,
    items: Vec<String>,
    query: String,
    filtered: Vec<usize>,
    selected: usize,
}

impl Picker {
    pub fn new(title: impl Into<String>, items: Vec<String>) -> Self {
        let mut picker = Self {
            title: title.into(),
            items,
            ..Default::default()
        };
        picker.apply_filter();
        picker
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Replace labels in place, keeping filter and selection
    pub fn set_items(&mut self, items: Vec<String>) {
        self.items = items;
        self.apply_filter();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// (original index, label) of every item passing the filter
    pub fn visible(&self) -> impl Iterator<Item = (usize, &str)> {
        self.filtered.iter().map(|&i| (i, self.items[i].as_str()))
    }

    pub fn selected_position(&self) -> usize {
        self.selected
    }

    /// Original index of the highlighted item
    pub fn selected(&self) -> Option<usize> {
        self.filtered.get(self.selected).copied()
    }

    pub fn up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn down(&mut self) {
        if self.selected + 1 < self.filtered.len() {
            self.selected += 1;
        }
    }

    pub fn push_query(&mut self, ch: char) {
        self.query.push(ch);
        self.apply_filter();
    }

    pub fn pop_query(&mut self) {
        self.query.pop();
        self.apply_filter();
    }

    fn apply_filter(&mut self) {
        let query = self.query.to_lowercase();
        self.filtered = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| query.is_empty() || item.to_lowercase().contains(&query))
            .map(|(i, _)| i)
            .collect();
        if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len().saturating_sub(1);
        }
    }

    pub fn handle_input(&mut self, key: &KeyEvent) -> PickerAction {
        match key.code {
            KeyCode::Esc => PickerAction::Cancel,
            KeyCode::Enter => match self.selected() {
                Some(index) => PickerAction::Submit(index),
                None => PickerAction::None,
            },
            KeyCode::Up | KeyCode::BackTab => {
                self.up();
                PickerAction::None
            }
            KeyCode::Down | KeyCode::Tab => {
                self.down();
                PickerAction::None
            }
            KeyCode::Backspace => {
                self.pop_query();
                PickerAction::None
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.push_query(ch);
                PickerAction::None
            }
            _ => PickerAction::None,
        }
    }
}

/// One context menu entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem<A> {
    pub label: String,
    pub action: A,
}

impl<A> MenuItem<A> {
    pub fn new(label: impl Into<String>, action: A) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// Result of a key press on an open context menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuOutcome<A> {
    Open,
    Dismiss,
    Chosen(A),
}

/// Floating menu with type-to-filter and 1-9 shortcuts
#[derive(Debug, Clone)]
pub struct ContextMenu<A> {
    items: Vec<MenuItem<A>>,
    pub x: u16,
    pub y: u16,
    query: String,
    filtered: Vec<usize>,
    selected: usize,
}

impl<A: Clone> ContextMenu<A> {
    pub fn new(x: u16, y: u16, items: Vec<MenuItem<A>>) -> Self {
        let mut menu = Self {
            items,
            x,
            y,
            query: String::new(),
            filtered: Vec::new(),
            selected: 0,
        };
        menu.apply_filter();
        menu
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// (1-based shortcut number, item) for every entry passing the filter
    pub fn visible(&self) -> impl Iterator<Item = (usize, &MenuItem<A>)> {
        self.filtered.iter().map(|&i| (i + 1, &self.items[i]))
    }

    pub fn selected_position(&self) -> usize {
        self.selected
    }

    /// Width in columns needed by the longest numbered label
    pub fn width(&self) -> u16 {
        let longest = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| display_width(&format!("{} {}", i + 1, item.label)))
            .max()
            .unwrap_or(0)
            .max(display_width("Type to filter..."));
        (longest + 4) as u16
    }

    pub fn height(&self) -> u16 {
        self.items.len() as u16 + 3
    }

    fn apply_filter(&mut self) {
        let query = self.query.to_lowercase();
        self.filtered = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| query.is_empty() || item.label.to_lowercase().contains(&query))
            .map(|(i, _)| i)
            .collect();
        if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len().saturating_sub(1);
        }
    }

    fn move_down(&mut self) {
        if self.selected + 1 < self.filtered.len() {
            self.selected += 1;
        }
    }

    /// Choose the entry at a visible row, as a mouse click does
    pub fn choose_row(&self, row: usize) -> Option<A> {
        self.filtered.get(row).map(|&i| self.items[i].action.clone())
    }

    pub fn handle_input(&mut self, key: &KeyEvent) -> MenuOutcome<A> {
        match key.code {
            KeyCode::Esc => MenuOutcome::Dismiss,
            KeyCode::Char(' ') if self.query.is_empty() => MenuOutcome::Dismiss,
            KeyCode::Enter => match self.filtered.get(self.selected) {
                Some(&i) => MenuOutcome::Chosen(self.items[i].action.clone()),
                None => MenuOutcome::Open,
            },
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                MenuOutcome::Open
            }
            KeyCode::Char('k') if self.query.is_empty() => {
                self.selected = self.selected.saturating_sub(1);
                MenuOutcome::Open
            }
            KeyCode::Down => {
                self.move_down();
                MenuOutcome::Open
            }
            KeyCode::Char('j') if self.query.is_empty() => {
                self.move_down();
                MenuOutcome::Open
            }
            KeyCode::Backspace => {
                self.query.pop();
                self.apply_filter();
                MenuOutcome::Open
            }
            KeyCode::Char(ch @ '1'..='9') if self.query.is_empty() => {
                let number = ch as usize - '0' as usize;
                match self.items.get(number - 1) {
                    Some(item) => MenuOutcome::Chosen(item.action.clone()),
                    None => MenuOutcome::Open,
                }
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.query.push(ch);
                self.apply_filter();
                MenuOutcome::Open
            }
            _ => MenuOutcome::Open,
        }
    }
}

/// Actions returned by a yes/no prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    None,
    Confirm,
    Cancel,
}

/// y/Enter confirms, n/Esc cancels, anything else is ignored
pub fn confirm_input(key: &KeyEvent) -> ConfirmAction {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => ConfirmAction::Confirm,
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => ConfirmAction::Cancel,
        _ => ConfirmAction::None,
    }
}

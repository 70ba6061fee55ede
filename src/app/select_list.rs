use crate::app::LineEditor;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Rows each entry occupies on screen: title, description, spacer.
pub const ROW_HEIGHT: u16 = 3;
/// Title, filter line and help footer around the rows.
const LIST_CHROME_HEIGHT: u16 = 4;

pub trait ListEntry {
    fn title(&self) -> &str;
    fn description(&self) -> &str;
    fn filter_value(&self) -> &str {
        self.title()
    }
}

/// Plain row used for query results.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Entry {
    pub title: String,
    pub description: String,
    pub filter_value: String,
}

impl Entry {
    pub fn new(title: String, description: String) -> Self {
        Self {
            filter_value: title.clone(),
            title,
            description,
        }
    }

    pub fn with_filter_value(mut self, filter_value: String) -> Self {
        self.filter_value = filter_value;
        self
    }
}

impl ListEntry for Entry {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn filter_value(&self) -> &str {
        &self.filter_value
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterState {
    Unfiltered,
    /// The user is typing a filter; printable keys go to the filter text.
    Filtering,
    Applied,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListAction {
    None,
    /// Index into the full item list.
    Choose(usize),
    Quit,
}

/// Scrollable, filterable list of entries.
#[derive(Clone, Debug)]
pub struct SelectList<T> {
    pub title: String,
    items: Vec<T>,
    filtered: Vec<usize>,
    selected: usize,
    filter: FilterState,
    query: LineEditor,
    size: (u16, u16),
}

impl<T: ListEntry> SelectList<T> {
    pub fn new(title: impl Into<String>, items: Vec<T>) -> Self {
        let filtered = (0..items.len()).collect();
        Self {
            title: title.into(),
            items,
            filtered,
            selected: 0,
            filter: FilterState::Unfiltered,
            query: LineEditor::new(),
            size: (0, 0),
        }
    }

    /// Replaces the content; the filter and selection start over.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.query.clear();
        self.filter = FilterState::Unfiltered;
        self.selected = 0;
        self.apply_filter();
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn visible(&self) -> impl Iterator<Item = &T> {
        self.filtered
            .iter()
            .filter_map(|index| self.items.get(*index))
    }

    pub fn visible_len(&self) -> usize {
        self.filtered.len()
    }

    /// Position of the highlighted row among the visible rows.
    pub fn selected(&self) -> Option<usize> {
        (!self.filtered.is_empty()).then_some(self.selected)
    }

    #[cfg(test)]
    pub fn selected_item(&self) -> Option<&T> {
        self.filtered
            .get(self.selected)
            .and_then(|index| self.items.get(*index))
    }

    pub fn filter_state(&self) -> FilterState {
        self.filter
    }

    pub fn is_filtering(&self) -> bool {
        self.filter == FilterState::Filtering
    }

    pub fn query(&self) -> &LineEditor {
        &self.query
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        self.size = (width, height);
    }

    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    pub fn page_size(&self) -> usize {
        let rows = self.size.1.saturating_sub(LIST_CHROME_HEIGHT) / ROW_HEIGHT;
        usize::from(rows.max(1))
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> ListAction {
        if self.filter == FilterState::Filtering {
            self.handle_filter_key(key);
            return ListAction::None;
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_by(1),
            KeyCode::PageUp => self.move_by(-(self.page_size() as isize)),
            KeyCode::PageDown => self.move_by(self.page_size() as isize),
            KeyCode::Home | KeyCode::Char('g') => self.selected = 0,
            KeyCode::End | KeyCode::Char('G') => {
                self.selected = self.filtered.len().saturating_sub(1);
            }
            KeyCode::Char('/') => self.filter = FilterState::Filtering,
            KeyCode::Esc if self.filter == FilterState::Applied => self.clear_filter(),
            KeyCode::Esc | KeyCode::Char('q') => return ListAction::Quit,
            KeyCode::Enter => {
                if let Some(index) = self.filtered.get(self.selected) {
                    return ListAction::Choose(*index);
                }
            }
            _ => {}
        }
        ListAction::None
    }

    fn handle_filter_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Esc => self.clear_filter(),
            KeyCode::Enter | KeyCode::Tab => {
                self.filter = if self.query.text.trim().is_empty() {
                    FilterState::Unfiltered
                } else {
                    FilterState::Applied
                };
            }
            KeyCode::Up => self.move_by(-1),
            KeyCode::Down => self.move_by(1),
            _ => {
                if !key.modifiers.contains(KeyModifiers::CONTROL) && self.query.handle_key(key) {
                    self.apply_filter();
                }
            }
        }
    }

    fn clear_filter(&mut self) {
        self.query.clear();
        self.filter = FilterState::Unfiltered;
        self.apply_filter();
    }

    fn move_by(&mut self, delta: isize) {
        let last = self.filtered.len().saturating_sub(1);
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    fn apply_filter(&mut self) {
        let query = self.query.text.trim().to_lowercase();
        self.filtered = self
            .items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                (query.is_empty() || item.filter_value().to_lowercase().contains(&query))
                    .then_some(index)
            })
            .collect();

        if self.filtered.is_empty() {
            self.selected = 0;
        } else {
            self.selected = self.selected.min(self.filtered.len().saturating_sub(1));
        }
    }
}

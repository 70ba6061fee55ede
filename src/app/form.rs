use crate::app::LineEditor;
use crossterm::event::{KeyCode, KeyEvent};

pub type FieldValidator = fn(&str) -> Result<(), String>;

#[derive(Clone, Debug)]
pub struct TextField {
    pub placeholder: &'static str,
    pub editor: LineEditor,
    pub mask: Option<char>,
    validator: Option<FieldValidator>,
}

impl TextField {
    pub fn new(placeholder: &'static str) -> Self {
        Self {
            placeholder,
            editor: LineEditor::new(),
            mask: None,
            validator: None,
        }
    }

    pub fn masked(mut self, mask: char) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn validated(mut self, validator: FieldValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.editor.set_text(value);
        self
    }

    pub fn value(&self) -> &str {
        &self.editor.text
    }

    pub fn validate(&self) -> Result<(), String> {
        match self.validator {
            Some(validator) => validator(self.value()),
            None => Ok(()),
        }
    }
}

/// What a key did to the form.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormKey {
    Moved,
    Edited,
    Submit,
    Ignored,
}

/// Ordered fields plus a virtual submit slot at index `fields.len()`.
#[derive(Clone, Debug)]
pub struct Form {
    pub fields: Vec<TextField>,
    pub focus: usize,
}

impl Form {
    pub fn new(fields: Vec<TextField>) -> Self {
        Self { fields, focus: 0 }
    }

    pub fn submit_focused(&self) -> bool {
        self.focus == self.fields.len()
    }

    pub fn focused_field(&self) -> Option<&TextField> {
        self.fields.get(self.focus)
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> FormKey {
        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.advance();
                FormKey::Moved
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.retreat();
                FormKey::Moved
            }
            KeyCode::Enter if self.submit_focused() => FormKey::Submit,
            KeyCode::Enter => {
                self.advance();
                FormKey::Moved
            }
            _ => match self.fields.get_mut(self.focus) {
                Some(field) => {
                    if field.editor.handle_key(key) {
                        FormKey::Edited
                    } else {
                        FormKey::Ignored
                    }
                }
                None => FormKey::Ignored,
            },
        }
    }

    pub fn advance(&mut self) {
        self.focus = if self.focus >= self.fields.len() {
            0
        } else {
            self.focus + 1
        };
    }

    pub fn retreat(&mut self) {
        self.focus = if self.focus == 0 {
            self.fields.len()
        } else {
            self.focus - 1
        };
    }

    /// First failing field's error, in field order.
    pub fn validate(&self) -> Result<(), String> {
        self.fields.iter().try_for_each(TextField::validate)
    }

    pub fn values(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| field.value().to_string())
            .collect()
    }
}

pub fn require_non_empty(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err("value cannot be empty".to_string())
    } else {
        Ok(())
    }
}

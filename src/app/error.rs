use crate::app::{AppCommand, AppEvent, StageTag};
use crossterm::event::KeyCode;

/// Shows the fatal message stored in the shared context. The only way out is quitting.
#[derive(Clone, Debug, Default)]
pub struct ErrorStage;

impl ErrorStage {
    pub fn update(self, event: &AppEvent) -> (StageTag, Self, AppCommand) {
        match event {
            AppEvent::Key(key) if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) => {
                (StageTag::Exit, self, AppCommand::None)
            }
            _ => (StageTag::Error, self, AppCommand::None),
        }
    }
}

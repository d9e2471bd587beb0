mod error;
mod terminal_ui;

pub use error::UiError;
pub use terminal_ui::{screen_resolution, TerminalUi};

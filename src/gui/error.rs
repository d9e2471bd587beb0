use std::{borrow::Cow, error::Error, fmt::Display};

#[derive(Debug)]
pub enum UiError {
    IOError(std::io::Error),
    TerminalTooSmall { cols: u16, rows: u16 },
}

impl Display for UiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::IOError(error) => Cow::from(format!("terminal error: {error}")),
            Self::TerminalTooSmall { cols, rows } => {
                Cow::from(format!("terminal of {cols}x{rows} is too small to draw targets on"))
            }
        };

        write!(f, "{}", msg)
    }
}

impl Error for UiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IOError(error) => Some(error),
            Self::TerminalTooSmall { .. } => None,
        }
    }
}

impl From<std::io::Error> for UiError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

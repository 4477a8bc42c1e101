//! Error type shared by the pipeline, CLI and FFI surfaces.
//!
//! The pagination core itself never fails: every row is placed somewhere.
//! Errors only arise at the edges (unusable input, a form with nowhere to put
//! its output, bad JSON, file I/O).

use std::fmt;

#[derive(Debug)]
pub enum PrintFormError {
    /// Input could not be read as an HTML document.
    Parse(String),
    /// The form element has no parent, so the output container has nowhere to go.
    Detached,
    /// A font face passed to the measurer could not be parsed.
    Font(String),
    /// Override or report JSON was malformed.
    Config(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for PrintFormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintFormError::Parse(msg) => write!(f, "failed to parse input: {msg}"),
            PrintFormError::Detached => write!(f, "form element is not attached to a parent"),
            PrintFormError::Font(msg) => write!(f, "font error: {msg}"),
            PrintFormError::Config(e) => write!(f, "invalid configuration JSON: {e}"),
            PrintFormError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for PrintFormError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PrintFormError::Config(e) => Some(e),
            PrintFormError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PrintFormError {
    fn from(e: serde_json::Error) -> Self {
        PrintFormError::Config(e)
    }
}

impl From<std::io::Error> for PrintFormError {
    fn from(e: std::io::Error) -> Self {
        PrintFormError::Io(e)
    }
}

impl From<std::str::Utf8Error> for PrintFormError {
    fn from(e: std::str::Utf8Error) -> Self {
        PrintFormError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            PrintFormError::Detached.to_string(),
            "form element is not attached to a parent"
        );
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PrintFormError = json_err.into();
        assert!(err.to_string().starts_with("invalid configuration JSON"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn utf8_errors_become_parse_errors() {
        let bytes = [0xff_u8, 0xfe];
        let err: PrintFormError = std::str::from_utf8(&bytes).unwrap_err().into();
        assert!(matches!(err, PrintFormError::Parse(_)));
    }
}

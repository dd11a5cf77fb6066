use std::io;
use thiserror::Error;

/// Everything that can go wrong between reading a script and finishing it.
///
/// `Interrupted` is not a failure in the usual sense: it is how cooperative
/// cancellation unwinds, and the executor reports it separately from the
/// other variants.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The tokenizer or parser could not match the input.
    #[error("syntax error: {message}{}", position_suffix(.position))]
    Syntax {
        message: String,
        position: Option<usize>,
    },

    /// No handler is registered under the requested name.
    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// A redirection target could not be opened or written.
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A handler failed, or an expression could not be evaluated.
    #[error("{command}: {message}")]
    Runtime { command: String, message: String },

    /// The interrupt flag was raised while the script was running.
    #[error("execution interrupted")]
    Interrupted,
}

impl ScriptError {
    pub fn syntax(message: impl Into<String>, position: Option<usize>) -> Self {
        ScriptError::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn runtime(command: impl Into<String>, message: impl Into<String>) -> Self {
        ScriptError::Runtime {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, ScriptError::Interrupted)
    }
}

fn position_suffix(position: &Option<usize>) -> String {
    match position {
        Some(at) => format!(" (at offset {at})"),
        None => " (at end of input)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_mentions_offset() {
        let err = ScriptError::syntax("expected command name", Some(4));
        assert_eq!(
            err.to_string(),
            "syntax error: expected command name (at offset 4)"
        );

        let err = ScriptError::syntax("expected command name", None);
        assert_eq!(
            err.to_string(),
            "syntax error: expected command name (at end of input)"
        );
    }

    #[test]
    fn test_only_interrupted_is_interrupted() {
        assert!(ScriptError::Interrupted.is_interrupted());
        assert!(!ScriptError::runtime("cat", "boom").is_interrupted());
        assert!(!ScriptError::CommandNotFound("nope".into()).is_interrupted());
    }
}

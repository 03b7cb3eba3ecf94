//! Configuration errors with actionable messages.

use thiserror::Error;

/// A configuration problem the operator can fix.
///
/// Every variant carries enough context to say what is wrong and how to
/// fix it, since these surface once at startup and then the process exits.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// A value failed validation.
    #[error("invalid configuration: {message}\n\nHow to fix: {fix_hint}")]
    Invalid {
        /// What is wrong.
        message: String,
        /// How to fix it.
        fix_hint: String,
    },
    /// Several problems at once.
    #[error("{}", format_multiple(.0))]
    Multiple(Vec<ConfigurationError>),
}

impl ConfigurationError {
    /// Shorthand for an [`ConfigurationError::Invalid`] value.
    #[must_use]
    pub fn invalid(message: impl Into<String>, fix_hint: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
            fix_hint: fix_hint.into(),
        }
    }
}

fn format_multiple(errors: &[ConfigurationError]) -> String {
    let mut out = format!("{} configuration error(s):", errors.len());
    for (index, error) in errors.iter().enumerate() {
        out.push_str(&format!("\n\n{}. {error}", index + 1));
    }
    out
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigurationError>;

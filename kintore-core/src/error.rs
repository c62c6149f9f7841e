use thiserror::Error;

/// Sanitized, user-facing failure for a single action.
///
/// Every handler catches its own datastore/API errors, logs the diagnostic
/// detail server-side, and returns one of these. The message is the whole
/// contract; callers render it verbatim as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    Lookup(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Write(String),
    #[error("{0}")]
    Generation(String),
}

impl ActionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ActionError::Lookup(_) => "lookup",
            ActionError::Validation(_) => "validation",
            ActionError::Write(_) => "write",
            ActionError::Generation(_) => "generation",
        }
    }

    pub(crate) fn lookup(msg: &str) -> Self {
        ActionError::Lookup(msg.to_string())
    }

    pub(crate) fn validation(msg: &str) -> Self {
        ActionError::Validation(msg.to_string())
    }

    pub(crate) fn write(msg: &str) -> Self {
        ActionError::Write(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_the_display_form() {
        let e = ActionError::lookup("failed to fetch the exercise");
        assert_eq!(e.to_string(), "failed to fetch the exercise");
        assert_eq!(e.kind(), "lookup");
    }
}

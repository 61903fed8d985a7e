use std::borrow::Cow;

/// What went wrong in a tool call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ErrorKind {
    /// The arguments don't match the tool's schema.
    #[error("Invalid input")]
    InvalidInput,
    /// The tool ran and failed.
    #[error("Execution error")]
    ExecutionError,
    /// The model asked for a tool nobody offered.
    #[error("Tool not found")]
    NotFound,
}

/// A failed tool call. The reason is what the model gets to read.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[error("{}", self.reason())]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
}

impl Error {
    #[inline]
    fn of(kind: ErrorKind) -> Self {
        Self { kind, reason: None }
    }

    /// An [`ErrorKind::InvalidInput`] error.
    #[inline]
    pub fn invalid_input() -> Self {
        Self::of(ErrorKind::InvalidInput)
    }

    /// An [`ErrorKind::ExecutionError`] error.
    #[inline]
    pub fn execution_error() -> Self {
        Self::of(ErrorKind::ExecutionError)
    }

    /// An [`ErrorKind::NotFound`] error naming the missing tool.
    #[inline]
    pub fn not_found(name: &str) -> Self {
        Self::of(ErrorKind::NotFound).with_reason(format!("Tool '{name}' not found"))
    }

    /// Replaces the reason.
    #[inline]
    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns the kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the reason, or the kind's description when none was given.
    pub fn reason(&self) -> Cow<'_, str> {
        match &self.reason {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(self.kind.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason() {
        assert_eq!(Error::execution_error().to_string(), "Execution error");
        assert_eq!(
            Error::invalid_input().with_reason("missing field `query`").reason(),
            "missing field `query`"
        );
        let err = Error::not_found("fly");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Tool 'fly' not found");
    }
}

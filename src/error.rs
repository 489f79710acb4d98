//! Error type shared by signals, readyables and the lifecycle.
//!
//! [`ReadyError`] is the failure half of every [`Outcome`](crate::Outcome).
//! An outcome is computed once and then handed to every listener, so the
//! error is cheap to clone (`Arc<str>` payloads).
//!
//! Programming faults (activating twice, configuring after activation,
//! registering a setup too late) are **not** represented here: they panic.

use std::sync::Arc;
use thiserror::Error;

/// # Errors carried by a resolved [`Signal`](crate::Signal).
///
/// - [`ReadyError::Failed`]: a handler or external event reported failure.
/// - [`ReadyError::NotReady`]: a gated function was called before its gate succeeded.
/// - [`ReadyError::Setup`]: a lifecycle setup callback returned an error.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadyError {
    /// Work attached to the graph reported failure.
    #[error("failed: {error}")]
    Failed {
        /// The underlying error message.
        error: Arc<str>,
    },

    /// A readiness-gated function was invoked before its gate succeeded.
    #[error("function `{name}` is not ready")]
    NotReady {
        /// Name the gate was registered with.
        name: Arc<str>,
    },

    /// A lifecycle setup callback returned an error.
    #[error("setup failed: {error}")]
    Setup {
        /// The underlying error message.
        error: Arc<str>,
    },
}

impl ReadyError {
    /// Builds a [`ReadyError::Failed`] from a message.
    pub fn fail(error: impl Into<Arc<str>>) -> Self {
        ReadyError::Failed {
            error: error.into(),
        }
    }

    /// Captures any error's display text as a [`ReadyError::Failed`].
    ///
    /// # Example
    /// ```
    /// use readyvisor::ReadyError;
    ///
    /// let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
    /// let err = ReadyError::from_error(&io);
    /// assert_eq!(err.to_string(), "failed: port taken");
    /// ```
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        Self::fail(error.to_string())
    }

    /// Builds a [`ReadyError::NotReady`] for the named gate.
    pub fn not_ready(name: impl Into<Arc<str>>) -> Self {
        ReadyError::NotReady { name: name.into() }
    }

    /// Builds a [`ReadyError::Setup`] from a message.
    pub fn setup(error: impl Into<Arc<str>>) -> Self {
        ReadyError::Setup {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use readyvisor::ReadyError;
    ///
    /// assert_eq!(ReadyError::not_ready("lookup").as_label(), "not_ready");
    /// assert_eq!(ReadyError::fail("boom").as_label(), "ready_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ReadyError::Failed { .. } => "ready_failed",
            ReadyError::NotReady { .. } => "not_ready",
            ReadyError::Setup { .. } => "setup_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ReadyError::Failed { error } => format!("error: {error}"),
            ReadyError::NotReady { name } => format!("not ready: {name}"),
            ReadyError::Setup { error } => format!("setup: {error}"),
        }
    }

    /// True for the distinguished "called before ready" fault.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, ReadyError::NotReady { .. })
    }
}

impl From<&str> for ReadyError {
    fn from(error: &str) -> Self {
        ReadyError::fail(error)
    }
}

impl From<String> for ReadyError {
    fn from(error: String) -> Self {
        ReadyError::fail(error)
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(ReadyError::fail("x").as_label(), "ready_failed");
        assert_eq!(ReadyError::not_ready("f").as_label(), "not_ready");
        assert_eq!(ReadyError::setup("x").as_label(), "setup_failed");
    }

    #[test]
    fn clones_compare_equal() {
        let err = ReadyError::from("listener refused");
        assert_eq!(err.clone(), err);
        assert!(!err.is_not_ready());
        assert!(ReadyError::not_ready("lookup").is_not_ready());
    }

    #[test]
    fn messages_include_payload() {
        assert_eq!(ReadyError::setup("bad key").as_message(), "setup: bad key");
        assert_eq!(
            ReadyError::not_ready("lookup").to_string(),
            "function `lookup` is not ready"
        );
    }
}

use std::fmt;

use serde::Serialize;

/// Structured error type for the bridge. Replaces stringly-typed errors so
/// callers can tell "fix your input" from "the controller rejected this"
/// from "the controller is unreachable".
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "code", content = "detail")]
pub enum BridgeError {
    /// A mutation failed a syntax or consistency check. Detected before any
    /// write reaches the controller; never auto-retried.
    Validation { message: String },
    /// A referenced entity does not exist on the controller.
    NotFound { what: String },
    /// An index-based operation pointed outside the current list.
    InvalidIndex { what: String, index: usize },
    /// The controller returned a non-success status for a request we
    /// believed valid. Surfaced verbatim; not auto-retried.
    ControllerRejected {
        status: u16,
        status_text: String,
        body: String,
    },
    /// No response at all: connection failed or timed out. Kept distinct
    /// from `ControllerRejected` so callers can tell "said no" from
    /// "unreachable".
    Transport { message: String },
    /// A multi-step operation's verification did not observe the expected
    /// state within its retry budget. Remaining steps were aborted;
    /// already-applied side effects are not rolled back.
    PreconditionFailed { step: String, message: String },
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Validation { message } => write!(f, "{message}"),
            BridgeError::NotFound { what } => write!(f, "{what} not found"),
            BridgeError::InvalidIndex { what, index } => {
                write!(f, "Invalid {what} index: {index}")
            }
            BridgeError::ControllerRejected {
                status,
                status_text,
                body,
            } => {
                write!(f, "Controller rejected request: {status} {status_text}: {body}")
            }
            BridgeError::Transport { message } => {
                write!(f, "Controller unreachable: {message}")
            }
            BridgeError::PreconditionFailed { step, message } => {
                write!(f, "Precondition failed at {step}: {message}")
            }
        }
    }
}

impl std::error::Error for BridgeError {}

impl BridgeError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        BridgeError::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a verification-step failure.
    pub fn precondition(step: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::PreconditionFailed {
            step: step.into(),
            message: message.into(),
        }
    }

    /// True when the error is retryable from the caller's point of view
    /// (the controller never saw, or never answered, the request).
    pub fn is_transport(&self) -> bool {
        matches!(self, BridgeError::Transport { .. })
    }

    /// True when the controller reports the entity as absent, either via our
    /// own taxonomy or a raw 404 rejection.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BridgeError::NotFound { .. } | BridgeError::ControllerRejected { status: 404, .. }
        )
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(e: reqwest::Error) -> Self {
        // Connect/timeout means no response was received; everything else
        // happened after the controller answered.
        if e.is_connect() || e.is_timeout() {
            BridgeError::Transport {
                message: e.to_string(),
            }
        } else if let Some(status) = e.status() {
            BridgeError::ControllerRejected {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
                body: e.to_string(),
            }
        } else {
            BridgeError::Transport {
                message: e.to_string(),
            }
        }
    }
}

/// Allow converting BridgeError to String at the tool-dispatch boundary.
impl From<BridgeError> for String {
    fn from(e: BridgeError) -> String {
        e.to_string()
    }
}

//! # Framework Errors
//!
//! This module defines the error taxonomy shared by the whole runtime.
//!
//! Two families live in [`ActorError`]:
//!
//! - **Supervised failures** ([`ActorError::Handler`], [`ActorError::Killed`]). These are
//!   caught at the dispatch boundary and routed to the actor's supervisor as an `Exit`.
//! - **Contract violations** (everything else). These are returned straight to the caller
//!   that triggered them and never enter the supervision tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used by supervisors to decide which failures they trap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaultKind(String);

impl FaultKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// Kind carried by [`ActorError::Killed`].
    pub fn killed() -> Self {
        Self::new("killed")
    }

    /// Kind assigned to panics caught inside a handler.
    pub fn panic() -> Self {
        Self::new("panic")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FaultKind {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

/// A failure raised by a behavior while handling a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
}

impl Fault {
    pub fn new(kind: impl Into<FaultKind>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Wraps any error under the given kind, keeping its rendered message.
    pub fn from_error(kind: impl Into<FaultKind>, error: &dyn std::error::Error) -> Self {
        Self::new(kind, error.to_string())
    }
}

/// Errors that can occur within the actor runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActorError {
    #[error("Actor {0} used before its reference was bound")]
    Initialization(String),
    #[error("Actor {actor}: invalid lifecycle transition {from} -> {to}")]
    InvalidTransition {
        actor: String,
        from: &'static str,
        to: &'static str,
    },
    #[error("Actor {0} is terminated")]
    Terminated(String),
    #[error("Actor {0} killed by message")]
    Killed(String),
    #[error("Actor {actor} handler failed: {fault}")]
    Handler { actor: String, fault: Fault },
    #[error("Actor {child} is already supervised by {supervisor}")]
    AlreadyLinked { child: String, supervisor: String },
    #[error("Actor {0} cannot supervise itself")]
    SelfLink(String),
    #[error("Actor {0} has no reply target in scope")]
    NoReplyTarget(String),
    #[error("Mailbox of actor {0} is full")]
    MailboxFull(String),
    #[error("Dispatcher is shut down")]
    DispatcherInactive,
    #[error("Dispatcher error: {0}")]
    Dispatcher(String),
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ActorError {
    /// Returns the fault kind for failures that are subject to supervision.
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            ActorError::Killed(_) => Some(FaultKind::killed()),
            ActorError::Handler { fault, .. } => Some(fault.kind.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_handler_and_kill_failures_are_supervised() {
        let handler = ActorError::Handler {
            actor: "counter".into(),
            fault: Fault::new("io", "disk full"),
        };
        assert_eq!(handler.fault_kind(), Some(FaultKind::new("io")));
        assert_eq!(
            ActorError::Killed("counter".into()).fault_kind(),
            Some(FaultKind::killed())
        );
        assert_eq!(ActorError::Terminated("counter".into()).fault_kind(), None);
        assert_eq!(ActorError::Initialization("counter".into()).fault_kind(), None);
    }

    #[test]
    fn handler_error_renders_fault() {
        let err = ActorError::Handler {
            actor: "counter".into(),
            fault: Fault::new("io", "disk full"),
        };
        assert_eq!(err.to_string(), "Actor counter handler failed: io: disk full");
    }
}

//! # Messages & Envelopes
//!
//! This module defines what travels through a [`Mailbox`](crate::framework::Mailbox).
//!
//! Every unit of mailbox content is an [`Envelope`]: a [`Payload`] plus delivery
//! metadata (the sender reference for replies and an optional [`ReplyToken`] for
//! `ask`). A payload is either an opaque application value or a [`LifeCycleMessage`].
//! Both kinds share the same queue, so system traffic is never reordered relative to
//! the ordinary messages sent around it.

use crate::framework::actor_ref::ActorRef;
use crate::framework::behavior::Behavior;
use crate::framework::error::ActorError;
use std::any::Any;
use std::fmt;
use tokio::sync::oneshot;

/// An opaque application message. Behaviors match on it with `downcast_ref`.
pub type Message = dyn Any + Send;

/// Result delivered to a caller blocked in `ask`.
pub type Reply = Result<Box<Message>, ActorError>;

/// One-shot channel carrying the answer to an `ask`.
pub type ReplyToken = oneshot::Sender<Reply>;

/// Marker value handed to a behavior when its idle timeout fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveTimeout;

/// System messages understood by every actor, handled ahead of user behavior.
pub enum LifeCycleMessage {
    /// Replace (`Some`) or clear (`None`) the active behavior override.
    HotSwap(Option<Box<dyn Behavior>>),
    Restart(ActorError),
    Exit(ActorRef, ActorError),
    Link(ActorRef),
    Unlink(ActorRef),
    UnlinkAndStop(ActorRef),
    Kill,
    Init,
    InitTransactionalState,
    Shutdown,
    PreRestart(ActorError),
    PostRestart(ActorError),
    /// Idle timer expiry, tagged with the generation of the timer that produced it.
    ReceiveTimeout(u64),
}

impl LifeCycleMessage {
    pub fn name(&self) -> &'static str {
        match self {
            LifeCycleMessage::HotSwap(_) => "HotSwap",
            LifeCycleMessage::Restart(_) => "Restart",
            LifeCycleMessage::Exit(..) => "Exit",
            LifeCycleMessage::Link(_) => "Link",
            LifeCycleMessage::Unlink(_) => "Unlink",
            LifeCycleMessage::UnlinkAndStop(_) => "UnlinkAndStop",
            LifeCycleMessage::Kill => "Kill",
            LifeCycleMessage::Init => "Init",
            LifeCycleMessage::InitTransactionalState => "InitTransactionalState",
            LifeCycleMessage::Shutdown => "Shutdown",
            LifeCycleMessage::PreRestart(_) => "PreRestart",
            LifeCycleMessage::PostRestart(_) => "PostRestart",
            LifeCycleMessage::ReceiveTimeout(_) => "ReceiveTimeout",
        }
    }
}

impl fmt::Debug for LifeCycleMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifeCycleMessage::HotSwap(behavior) => {
                write!(f, "HotSwap({})", if behavior.is_some() { "Some" } else { "None" })
            }
            LifeCycleMessage::Restart(cause)
            | LifeCycleMessage::PreRestart(cause)
            | LifeCycleMessage::PostRestart(cause) => write!(f, "{}({cause})", self.name()),
            LifeCycleMessage::Exit(child, cause) => write!(f, "Exit({}, {cause})", child.name()),
            LifeCycleMessage::Link(child)
            | LifeCycleMessage::Unlink(child)
            | LifeCycleMessage::UnlinkAndStop(child) => {
                write!(f, "{}({})", self.name(), child.name())
            }
            LifeCycleMessage::ReceiveTimeout(generation) => write!(f, "ReceiveTimeout({generation})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Mailbox content.
pub enum Payload {
    User(Box<Message>),
    System(LifeCycleMessage),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::User(_) => f.write_str("User(..)"),
            Payload::System(msg) => write!(f, "System({msg:?})"),
        }
    }
}

/// A message plus its delivery metadata.
pub struct Envelope {
    pub payload: Payload,
    pub sender: Option<ActorRef>,
    pub reply_to: Option<ReplyToken>,
}

impl Envelope {
    pub fn user(message: Box<Message>, sender: Option<ActorRef>) -> Self {
        Self {
            payload: Payload::User(message),
            sender,
            reply_to: None,
        }
    }

    pub fn ask(message: Box<Message>, reply_to: ReplyToken) -> Self {
        Self {
            payload: Payload::User(message),
            sender: None,
            reply_to: Some(reply_to),
        }
    }

    pub fn system(message: LifeCycleMessage) -> Self {
        Self {
            payload: Payload::System(message),
            sender: None,
            reply_to: None,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self.payload, Payload::System(_))
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("payload", &self.payload)
            .field("sender", &self.sender.as_ref().map(|s| s.name().to_string()))
            .field("ask", &self.reply_to.is_some())
            .finish()
    }
}

//! # Behaviors
//!
//! A [`Behavior`] is a function from a message to an outcome. The outcome is explicit:
//! [`Handled::Unhandled`] means "no case for this payload" and is silently ignored by the
//! runtime, while `Err(Fault)` is a real failure that enters supervision.
//!
//! [`Actor`] extends `Behavior` with lifecycle hooks. The actor instance is the base
//! behavior; a hot-swapped override, when present, takes precedence until cleared.

use crate::framework::actor_ref::ActorRef;
use crate::framework::error::{ActorError, Fault};
use crate::framework::message::{LifeCycleMessage, Message, ReplyToken};
use std::any::Any;
use tracing::warn;

/// Outcome of applying a behavior to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Done,
    Unhandled,
}

pub type HandlerResult = Result<Handled, Fault>;

/// Message-handling behavior. Handlers run to completion and must not block.
pub trait Behavior: Send + 'static {
    fn receive(&mut self, ctx: &mut Context, message: &Message) -> HandlerResult;

    /// Whether this behavior wants [`ReceiveTimeout`](crate::framework::ReceiveTimeout).
    fn handles_receive_timeout(&self) -> bool {
        false
    }
}

/// A user actor: the base behavior plus lifecycle hooks, all optional.
pub trait Actor: Behavior {
    fn init(&mut self, _ctx: &mut Context) {}

    fn init_transactional_state(&mut self, _ctx: &mut Context) {}

    fn shutdown(&mut self, _ctx: &mut Context) {}

    /// Called on the failed instance before it is replaced.
    fn pre_restart(&mut self, _ctx: &mut Context, _cause: &ActorError) {}

    /// Called on the fresh instance after a restart.
    fn post_restart(&mut self, _ctx: &mut Context, _cause: &ActorError) {}
}

/// Closure-backed behavior, mostly useful for hot-swapping.
pub struct FnBehavior<F> {
    receive: F,
    handles_timeout: bool,
}

impl<F> FnBehavior<F>
where
    F: FnMut(&mut Context, &Message) -> HandlerResult + Send + 'static,
{
    /// Declares interest in `ReceiveTimeout` for this closure.
    pub fn with_receive_timeout(mut self) -> Self {
        self.handles_timeout = true;
        self
    }
}

impl<F> Behavior for FnBehavior<F>
where
    F: FnMut(&mut Context, &Message) -> HandlerResult + Send + 'static,
{
    fn receive(&mut self, ctx: &mut Context, message: &Message) -> HandlerResult {
        (self.receive)(ctx, message)
    }

    fn handles_receive_timeout(&self) -> bool {
        self.handles_timeout
    }
}

pub fn behavior_fn<F>(receive: F) -> FnBehavior<F>
where
    F: FnMut(&mut Context, &Message) -> HandlerResult + Send + 'static,
{
    FnBehavior {
        receive,
        handles_timeout: false,
    }
}

/// Per-message view handed to a behavior.
pub struct Context {
    myself: ActorRef,
    sender: Option<ActorRef>,
    reply_to: Option<ReplyToken>,
}

impl Context {
    pub(crate) fn new(
        myself: ActorRef,
        sender: Option<ActorRef>,
        reply_to: Option<ReplyToken>,
    ) -> Self {
        Self {
            myself,
            sender,
            reply_to,
        }
    }

    pub fn myself(&self) -> &ActorRef {
        &self.myself
    }

    pub fn sender(&self) -> Option<&ActorRef> {
        self.sender.as_ref()
    }

    /// Answers the current message: the `ask` token if there is one, else the sender.
    pub fn reply<T: Any + Send>(&mut self, value: T) -> Result<(), ActorError> {
        if let Some(token) = self.reply_to.take() {
            if token.send(Ok(Box::new(value))).is_err() {
                warn!(actor = %self.myself.name(), "Asker went away before the reply");
            }
            return Ok(());
        }
        match &self.sender {
            Some(sender) => sender.send(value, Some(&self.myself)),
            None => Err(ActorError::NoReplyTarget(self.myself.name().to_string())),
        }
    }

    /// Queues a behavior swap for this actor; it takes effect after the current message.
    pub fn hot_swap(&self, behavior: Option<Box<dyn Behavior>>) -> Result<(), ActorError> {
        self.myself
            .send_system(LifeCycleMessage::HotSwap(behavior))
    }

    /// Queues a `Link` so this actor starts supervising `child`.
    pub fn link(&self, child: &ActorRef) -> Result<(), ActorError> {
        self.myself
            .send_system(LifeCycleMessage::Link(child.clone()))
    }

    pub fn unlink(&self, child: &ActorRef) -> Result<(), ActorError> {
        self.myself
            .send_system(LifeCycleMessage::Unlink(child.clone()))
    }

    pub(crate) fn take_reply_token(&mut self) -> Option<ReplyToken> {
        self.reply_to.take()
    }
}

//! Core actor runtime.
//!
//! This module provides the building blocks every actor is made of: references,
//! mailboxes, behaviors, the dispatcher that runs them and the seams (timers, remote
//! transport) the runtime talks to.
//!
//! # Main Components
//!
//! - [`ActorRef`] - Cloneable handle: lifecycle, send/ask, links, hot-swap
//! - [`Behavior`] / [`Actor`] - Message handling and lifecycle hooks
//! - [`Props`] - Creation recipe: factory, name, timeout, supervision settings
//! - [`Mailbox`] - FIFO queue with front insertion for system messages
//! - [`Dispatcher`] - Runs every registered mailbox on a shared worker pool
//! - [`ActorError`] - Common error type
//!
//! # Testing
//!
//! See [`mock`] module for doubles of the timer and the remote transport.

pub mod actor_ref;
pub mod behavior;
pub(crate) mod cell;
pub mod dispatcher;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod mock;
pub mod props;
pub mod timeout;
pub mod transport;

pub use actor_ref::{ActorId, ActorRef, LifecycleState};
pub use behavior::{behavior_fn, Actor, Behavior, Context, FnBehavior, Handled, HandlerResult};
pub use dispatcher::{Dispatcher, MessageInvoker};
pub use error::{ActorError, Fault, FaultKind};
pub use mailbox::Mailbox;
pub use message::{Envelope, LifeCycleMessage, Message, Payload, Reply, ReplyToken, ReceiveTimeout};
pub use props::{ActorFactory, Props};
pub use timeout::{ScheduleHandle, TimeoutScheduler, TokioScheduler};
pub use transport::{RemoteAddress, RemoteTransport};

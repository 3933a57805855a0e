//! # Actor References
//!
//! [`ActorRef`] is the durable, cloneable handle to one actor. It carries the identity,
//! the lifecycle state and the mailbox; the mutable actor state itself lives in an
//! [`ActorCell`](crate::framework::cell::ActorCell) that only the dispatcher touches.
//!
//! Lifecycle is strictly monotonic: `NEW -> STARTED -> SHUTDOWN` (or `NEW -> SHUTDOWN`
//! for an actor stopped before it ever ran).

use crate::framework::behavior::Behavior;
use crate::framework::cell::{ActorCell, CellInvoker};
use crate::framework::error::ActorError;
use crate::framework::mailbox::Mailbox;
use crate::framework::message::{Envelope, LifeCycleMessage, Message};
use crate::framework::transport::RemoteAddress;
use crate::lifecycle::system::SystemInner;
use crate::supervision::strategy::Permanence;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};

pub type ActorId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    New,
    Started,
    Shutdown,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::New => "NEW",
            LifecycleState::Started => "STARTED",
            LifecycleState::Shutdown => "SHUTDOWN",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LifecycleState::New,
            1 => LifecycleState::Started,
            _ => LifecycleState::Shutdown,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) struct ActorShared {
    id: ActorId,
    name: String,
    state: AtomicU8,
    mailbox: Arc<Mailbox>,
    remote: Option<RemoteAddress>,
    capability: Option<String>,
    permanence: Permanence,
    parked: Mutex<Option<ActorCell>>,
    system: Weak<SystemInner>,
}

#[derive(Clone)]
pub struct ActorRef {
    inner: Arc<ActorShared>,
}

impl ActorRef {
    pub(crate) fn local(
        id: ActorId,
        name: String,
        mailbox: Arc<Mailbox>,
        cell: ActorCell,
        system: Weak<SystemInner>,
    ) -> Self {
        let capability = cell.props().capability.clone();
        let permanence = cell.props().permanence;
        Self {
            inner: Arc::new(ActorShared {
                id,
                name,
                state: AtomicU8::new(LifecycleState::New as u8),
                mailbox,
                remote: None,
                capability,
                permanence,
                parked: Mutex::new(Some(cell)),
                system,
            }),
        }
    }

    pub(crate) fn remote(
        id: ActorId,
        name: String,
        address: RemoteAddress,
        system: Weak<SystemInner>,
    ) -> Self {
        let mailbox = Arc::new(Mailbox::new(name.clone(), None));
        Self {
            inner: Arc::new(ActorShared {
                id,
                name,
                state: AtomicU8::new(LifecycleState::Started as u8),
                mailbox,
                remote: Some(address),
                capability: None,
                permanence: Permanence::Permanent,
                parked: Mutex::new(None),
                system,
            }),
        }
    }

    pub fn id(&self) -> ActorId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    pub fn capability(&self) -> Option<&str> {
        self.inner.capability.as_deref()
    }

    pub fn permanence(&self) -> Permanence {
        self.inner.permanence
    }

    pub fn remote_address(&self) -> Option<&RemoteAddress> {
        self.inner.remote.as_ref()
    }

    pub fn is_remote(&self) -> bool {
        self.inner.remote.is_some()
    }

    /// Number of envelopes waiting in the local mailbox.
    pub fn pending_messages(&self) -> usize {
        self.inner.mailbox.len()
    }

    /// `NEW -> STARTED`: binds the cell to this reference and hands it to the dispatcher.
    pub fn start(&self) -> Result<(), ActorError> {
        self.transition(LifecycleState::New, LifecycleState::Started)?;
        let Some(system) = self.system() else {
            self.mark_shutdown();
            return Err(ActorError::Terminated(self.name().to_string()));
        };
        let Some(mut cell) = self.inner.parked.lock().take() else {
            return Err(ActorError::Initialization(self.name().to_string()));
        };
        cell.bind(self.clone());

        self.inner
            .mailbox
            .prepend(Envelope::system(LifeCycleMessage::Init));
        let invoker = Arc::new(CellInvoker::new(cell));
        if let Err(e) = system
            .dispatcher
            .register_handler(self.id(), self.inner.mailbox.clone(), invoker)
        {
            self.mark_shutdown();
            system.release(self);
            return Err(e);
        }
        info!(actor = %self.name(), id = self.id(), "Actor started");
        Ok(())
    }

    /// Moves the actor to SHUTDOWN. Stopping a stopped actor is a no-op.
    ///
    /// A running actor finishes its current message, runs its `shutdown` hook and stops
    /// its linked children; anything still queued is discarded.
    pub fn stop(&self) -> Result<(), ActorError> {
        if self.transition(LifecycleState::New, LifecycleState::Shutdown).is_ok() {
            self.inner.parked.lock().take();
            if let Some(system) = self.system() {
                system.release(self);
            }
            info!(actor = %self.name(), "Actor stopped before start");
            return Ok(());
        }
        if self
            .transition(LifecycleState::Started, LifecycleState::Shutdown)
            .is_ok()
        {
            if self.is_remote() {
                if let Some(system) = self.system() {
                    system.release(self);
                }
                debug!(actor = %self.name(), "Remote reference released");
                return Ok(());
            }
            self.inner
                .mailbox
                .prepend(Envelope::system(LifeCycleMessage::Shutdown));
            debug!(actor = %self.name(), "Stop requested");
        }
        Ok(())
    }

    /// Fire-and-forget send. `sender` becomes the reply address seen by the recipient.
    pub fn send<T: Any + Send>(
        &self,
        message: T,
        sender: Option<&ActorRef>,
    ) -> Result<(), ActorError> {
        self.deliver(Envelope::user(Box::new(message), sender.cloned()))
    }

    pub fn tell<T: Any + Send>(&self, message: T) -> Result<(), ActorError> {
        self.send(message, None)
    }

    /// Sends `message` and waits for the reply.
    ///
    /// Returns `Ok(None)` when `timeout` elapses or the handler finishes without replying,
    /// and `Err(cause)` when handling the message failed.
    pub async fn ask<T: Any + Send>(
        &self,
        message: T,
        timeout: Duration,
    ) -> Result<Option<Box<Message>>, ActorError> {
        let (reply_to, reply) = oneshot::channel();
        self.deliver(Envelope::ask(Box::new(message), reply_to))?;
        match tokio::time::timeout(timeout, reply).await {
            Ok(Ok(result)) => result.map(Some),
            Ok(Err(_)) => Ok(None),
            Err(_) => {
                debug!(actor = %self.name(), ?timeout, "Ask timed out");
                Ok(None)
            }
        }
    }

    /// [`ask`](Self::ask) with the reply downcast to `R`; a reply of another type is `None`.
    pub async fn ask_as<R: Any, T: Any + Send>(
        &self,
        message: T,
        timeout: Duration,
    ) -> Result<Option<R>, ActorError> {
        let reply = self.ask(message, timeout).await?;
        Ok(reply.and_then(|boxed| boxed.downcast::<R>().ok()).map(|r| *r))
    }

    /// Replaces (`Some`) or clears (`None`) the active behavior once queued messages
    /// ahead of the swap have been handled.
    pub fn hot_swap(&self, behavior: Option<Box<dyn Behavior>>) -> Result<(), ActorError> {
        self.send_system(LifeCycleMessage::HotSwap(behavior))
    }

    /// Fails the actor with [`ActorError::Killed`] when the message is processed.
    pub fn kill(&self) -> Result<(), ActorError> {
        self.send_system(LifeCycleMessage::Kill)
    }

    /// Makes this actor the supervisor of `child`.
    pub fn link(&self, child: &ActorRef) -> Result<(), ActorError> {
        let system = self.live_system()?;
        system.link(self, child)
    }

    pub fn unlink(&self, child: &ActorRef) -> Result<bool, ActorError> {
        let system = self.live_system()?;
        Ok(system.links.unlink(self.id(), child.id()))
    }

    /// Queues an `UnlinkAndStop` for `child` in this actor's mailbox.
    pub fn unlink_and_stop(&self, child: &ActorRef) -> Result<(), ActorError> {
        self.send_system(LifeCycleMessage::UnlinkAndStop(child.clone()))
    }

    pub fn supervisor(&self) -> Option<ActorRef> {
        self.system().and_then(|s| s.supervisor_of(self.id()))
    }

    pub fn children(&self) -> Vec<ActorRef> {
        self.system()
            .map(|s| s.children_of(self.id()))
            .unwrap_or_default()
    }

    /// Appends a system message behind everything already queued.
    pub fn send_system(&self, message: LifeCycleMessage) -> Result<(), ActorError> {
        self.deliver(Envelope::system(message))
    }

    /// Queues a system message ahead of everything already queued.
    pub(crate) fn prepend_system(&self, message: LifeCycleMessage) -> Result<(), ActorError> {
        self.ensure_running()?;
        self.inner.mailbox.prepend(Envelope::system(message));
        Ok(())
    }

    pub(crate) fn mark_shutdown(&self) {
        self.inner
            .state
            .store(LifecycleState::Shutdown as u8, Ordering::SeqCst);
    }

    pub(crate) fn system(&self) -> Option<Arc<SystemInner>> {
        self.inner.system.upgrade()
    }

    fn live_system(&self) -> Result<Arc<SystemInner>, ActorError> {
        self.system()
            .ok_or_else(|| ActorError::Terminated(self.name().to_string()))
    }

    fn ensure_running(&self) -> Result<(), ActorError> {
        if self.state() == LifecycleState::Shutdown {
            return Err(ActorError::Terminated(self.name().to_string()));
        }
        Ok(())
    }

    fn deliver(&self, envelope: Envelope) -> Result<(), ActorError> {
        self.ensure_running()?;
        if let Some(address) = &self.inner.remote {
            let system = self.live_system()?;
            let transport = system.transport.as_ref().ok_or_else(|| {
                ActorError::Transport(format!("no transport configured for {address}"))
            })?;
            return transport.deliver(address, self.name(), envelope);
        }
        self.inner.mailbox.append(envelope)
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), ActorError> {
        self.inner
            .state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|current| ActorError::InvalidTransition {
                actor: self.name().to_string(),
                from: LifecycleState::from_u8(current).as_str(),
                to: to.as_str(),
            })
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ActorRef {}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .field("remote", &self.inner.remote)
            .finish()
    }
}

//! # Actor Cell
//!
//! The cell owns everything mutable about one actor: the live instance, the hot-swapped
//! override, the pending idle timer and the restart statistics of the subtree it
//! supervises. Only the dispatcher worker for that actor ever touches it, one envelope
//! at a time, which is what keeps actor state free of locks.
//!
//! ## Dispatch order for one envelope
//!
//! 1. While the actor waits for its supervisor after a failure, ordinary payloads are
//!    held back in arrival order; system messages still run.
//! 2. A `ReceiveTimeout` from a superseded timer, or one nobody is interested in, is
//!    dropped (it lost a race with a message or a hot-swap).
//! 3. Any pending idle timer is cancelled.
//! 4. System messages are handled by the runtime; ordinary payloads go to the active
//!    behavior (override first, else the instance). `Handled::Unhandled` is ignored.
//! 5. A failure (`Err` from the behavior, a caught panic, or `Kill`) is reported to the
//!    supervisor as `Exit(self, cause)` and the actor holds further payloads until
//!    `PostRestart`; without a supervisor the actor shuts down.
//! 6. If the actor is still running and the envelope was not itself a `ReceiveTimeout`,
//!    the idle timer is scheduled again when the active behavior wants it. Held payloads
//!    are then replayed on the fresh instance.

use crate::framework::actor_ref::{ActorRef, LifecycleState};
use crate::framework::behavior::{Actor, Behavior, Context, Handled};
use crate::framework::dispatcher::MessageInvoker;
use crate::framework::error::{ActorError, Fault, FaultKind};
use crate::framework::message::{
    Envelope, LifeCycleMessage, Message, Payload, ReceiveTimeout, ReplyToken,
};
use crate::framework::props::Props;
use crate::framework::timeout::{ScheduleHandle, TimeoutScheduler};
use crate::lifecycle::system::SystemInner;
use crate::supervision::strategy::{Permanence, Propagation, RestartStatistics};
use async_trait::async_trait;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

pub(crate) struct ActorCell {
    name: String,
    props: Props,
    myself: Option<ActorRef>,
    instance: Option<Box<dyn Actor>>,
    swapped: Option<Box<dyn Behavior>>,
    timer: Option<ScheduleHandle>,
    /// Bumped whenever a timer is armed or cancelled; only the current one may fire.
    timer_generation: u64,
    scheduler: Arc<dyn TimeoutScheduler>,
    restarts: RestartStatistics,
    suspended: bool,
    held: VecDeque<Envelope>,
}

impl ActorCell {
    pub(crate) fn new(name: String, props: Props, scheduler: Arc<dyn TimeoutScheduler>) -> Self {
        Self {
            name,
            props,
            myself: None,
            instance: None,
            swapped: None,
            timer: None,
            timer_generation: 0,
            scheduler,
            restarts: RestartStatistics::new(),
            suspended: false,
            held: VecDeque::new(),
        }
    }

    pub(crate) fn props(&self) -> &Props {
        &self.props
    }

    pub(crate) fn bind(&mut self, myself: ActorRef) {
        self.myself = Some(myself);
    }

    /// Processes one envelope.
    ///
    /// Fails only with [`ActorError::Initialization`] when the cell is driven before it
    /// was bound to its reference or initialized; every other failure is routed through
    /// supervision here and never returned.
    pub(crate) fn invoke(&mut self, envelope: Envelope) -> Result<(), ActorError> {
        let myself = self
            .myself
            .clone()
            .ok_or_else(|| ActorError::Initialization(self.name.clone()))?;
        if myself.state() == LifecycleState::Shutdown {
            if let Payload::System(LifeCycleMessage::Shutdown) = envelope.payload {
                self.terminate(&myself);
            } else {
                trace!(actor = %self.name, payload = ?envelope.payload, "Dropping message for stopped actor");
            }
            return Ok(());
        }

        let is_init = matches!(envelope.payload, Payload::System(LifeCycleMessage::Init));
        if self.instance.is_none() && !is_init {
            return Err(ActorError::Initialization(self.name.clone()));
        }

        if self.suspended && !envelope.is_system() {
            trace!(actor = %self.name, held = self.held.len() + 1, "Holding message until restart");
            self.held.push_back(envelope);
            return Ok(());
        }

        let expired = match envelope.payload {
            Payload::System(LifeCycleMessage::ReceiveTimeout(generation)) => {
                if generation != self.timer_generation
                    || self.suspended
                    || !self.wants_receive_timeout()
                {
                    trace!(actor = %self.name, generation, "Discarding stale ReceiveTimeout");
                    return Ok(());
                }
                true
            }
            _ => false,
        };

        self.cancel_timeout();

        let Envelope {
            payload,
            sender,
            reply_to,
        } = envelope;

        let mut ctx = Context::new(myself.clone(), sender, reply_to);
        let outcome = match payload {
            Payload::System(message) => {
                debug!(actor = %self.name, ?message, "System message");
                self.handle_system(&mut ctx, message)
            }
            Payload::User(message) => self.apply_behavior(&mut ctx, &*message),
        };
        if let Err(cause) = outcome {
            self.fail(&myself, ctx.take_reply_token(), cause);
        }

        if myself.state() == LifecycleState::Started && !self.suspended {
            if !expired {
                self.schedule_timeout(&myself);
            }
            self.replay_held()?;
        }
        Ok(())
    }

    /// Feeds payloads held during a failure to the current instance, oldest first.
    fn replay_held(&mut self) -> Result<(), ActorError> {
        if self.held.is_empty() {
            return Ok(());
        }
        debug!(actor = %self.name, held = self.held.len(), "Replaying held messages");
        // A failure during replay suspends again and re-holds whatever is left, in order.
        for envelope in std::mem::take(&mut self.held) {
            self.invoke(envelope)?;
        }
        Ok(())
    }

    fn handle_system(
        &mut self,
        ctx: &mut Context,
        message: LifeCycleMessage,
    ) -> Result<(), ActorError> {
        match message {
            LifeCycleMessage::HotSwap(behavior) => {
                debug!(actor = %self.name, swapped = behavior.is_some(), "Behavior swapped");
                self.swapped = behavior;
                Ok(())
            }
            LifeCycleMessage::Restart(cause) => {
                self.restart(ctx.myself(), &cause);
                Ok(())
            }
            LifeCycleMessage::Exit(child, cause) => self.trap_exit(ctx.myself(), &child, cause),
            LifeCycleMessage::Link(child) => {
                if let Err(e) = ctx.myself().link(&child) {
                    warn!(actor = %self.name, child = %child.name(), error = %e, "Link refused");
                }
                Ok(())
            }
            LifeCycleMessage::Unlink(child) => {
                let _ = ctx.myself().unlink(&child);
                Ok(())
            }
            LifeCycleMessage::UnlinkAndStop(child) => {
                let _ = ctx.myself().unlink(&child);
                let _ = child.stop();
                Ok(())
            }
            LifeCycleMessage::Kill => Err(ActorError::Killed(self.name.clone())),
            LifeCycleMessage::Init => {
                self.instance = Some((self.props.factory)());
                self.run_hook(|actor| actor.init(ctx))
            }
            LifeCycleMessage::InitTransactionalState => {
                self.run_hook(|actor| actor.init_transactional_state(ctx))
            }
            LifeCycleMessage::Shutdown => {
                ctx.myself().mark_shutdown();
                self.terminate(ctx.myself());
                Ok(())
            }
            LifeCycleMessage::PreRestart(cause) => {
                if let Some(callback) = &self.props.callbacks.pre_restart {
                    callback(ctx.myself(), &cause);
                }
                self.run_hook(|actor| actor.pre_restart(ctx, &cause))
            }
            LifeCycleMessage::PostRestart(cause) => {
                self.suspended = false;
                if let Some(callback) = &self.props.callbacks.post_restart {
                    callback(ctx.myself(), &cause);
                }
                self.run_hook(|actor| actor.post_restart(ctx, &cause))
            }
            LifeCycleMessage::ReceiveTimeout(_) => self.apply_behavior(ctx, &ReceiveTimeout),
        }
    }

    fn apply_behavior(&mut self, ctx: &mut Context, message: &Message) -> Result<(), ActorError> {
        let swapped = &mut self.swapped;
        let instance = &mut self.instance;
        let result = catch_unwind(AssertUnwindSafe(|| match swapped {
            Some(behavior) => behavior.receive(ctx, message),
            None => match instance {
                Some(actor) => actor.receive(ctx, message),
                None => Ok(Handled::Unhandled),
            },
        }));
        match result {
            Ok(Ok(Handled::Done)) => Ok(()),
            Ok(Ok(Handled::Unhandled)) => {
                trace!(actor = %self.name, "Unhandled message ignored");
                Ok(())
            }
            Ok(Err(fault)) => Err(self.handler_error(fault)),
            Err(panic) => Err(self.handler_error(Fault::new(
                FaultKind::panic(),
                panic_message(&*panic),
            ))),
        }
    }

    fn run_hook<F>(&mut self, hook: F) -> Result<(), ActorError>
    where
        F: FnOnce(&mut dyn Actor),
    {
        let Some(actor) = self.instance.as_mut() else {
            return Ok(());
        };
        catch_unwind(AssertUnwindSafe(|| hook(actor.as_mut()))).map_err(|panic| {
            self.handler_error(Fault::new(FaultKind::panic(), panic_message(&*panic)))
        })
    }

    fn handler_error(&self, fault: Fault) -> ActorError {
        ActorError::Handler {
            actor: self.name.clone(),
            fault,
        }
    }

    /// Replaces the instance. A supervisor restarts its own subtree along with it, so
    /// children held after a failure it escalated come back too.
    fn restart(&mut self, myself: &ActorRef, cause: &ActorError) {
        info!(actor = %self.name, cause = %cause, "Restarting");
        self.swapped = None;
        self.restarts.reset();
        self.instance = Some((self.props.factory)());
        if let Some(system) = myself.system() {
            for child in system.children_of(myself.id()) {
                self.restart_child(&system, myself, &child, cause);
            }
        }
    }

    /// Reports a failure upward, or shuts the actor down when nobody supervises it.
    fn fail(&mut self, myself: &ActorRef, reply_to: Option<ReplyToken>, cause: ActorError) {
        warn!(actor = %self.name, error = %cause, "Actor failed");
        if let Some(token) = reply_to {
            let _ = token.send(Err(cause.clone()));
        }

        if let Some(supervisor) = myself.supervisor() {
            match supervisor.send_system(LifeCycleMessage::Exit(myself.clone(), cause)) {
                Ok(()) => {
                    self.suspended = true;
                    return;
                }
                Err(e) => {
                    debug!(actor = %self.name, supervisor = %supervisor.name(), error = %e, "Supervisor unreachable")
                }
            }
        }

        info!(actor = %self.name, "No supervisor, shutting down");
        myself.mark_shutdown();
        self.terminate(myself);
    }

    /// Supervisor side of a child failure.
    fn trap_exit(
        &mut self,
        myself: &ActorRef,
        child: &ActorRef,
        cause: ActorError,
    ) -> Result<(), ActorError> {
        let Some(system) = myself.system() else {
            return Ok(());
        };
        if !system.links.is_linked(myself.id(), child.id()) {
            // Unlinked while the Exit was in flight: nobody supervises it any more.
            debug!(actor = %self.name, child = %child.name(), "Exit from unlinked actor, stopping it");
            let _ = child.stop();
            return Ok(());
        }

        let temporary = child.permanence() == Permanence::Temporary;
        if temporary {
            self.stop_child(&system, myself, child);
        }

        let trapped = cause
            .fault_kind()
            .is_some_and(|kind| self.props.trap_exit.contains(&kind));
        if !trapped {
            warn!(actor = %self.name, child = %child.name(), cause = %cause, "Fault not trapped, re-raising");
            return Err(cause);
        }

        let strategy = self.props.restart_strategy;
        if self.restarts.exceeds(&strategy, Instant::now()) {
            warn!(
                actor = %self.name,
                child = %child.name(),
                max_retries = strategy.max_retries,
                within = ?strategy.within,
                "Restart budget exhausted, escalating"
            );
            self.restarts.reset();
            return Err(cause);
        }
        debug!(
            actor = %self.name,
            child = %child.name(),
            failures = self.restarts.failure_count(),
            "Fault trapped"
        );

        let targets = match strategy.propagation {
            Propagation::OneForOne if temporary => Vec::new(),
            Propagation::OneForOne => vec![child.clone()],
            Propagation::AllForOne => system.children_of(myself.id()),
        };
        for target in targets {
            self.restart_child(&system, myself, &target, &cause);
        }
        Ok(())
    }

    fn restart_child(
        &self,
        system: &SystemInner,
        myself: &ActorRef,
        target: &ActorRef,
        cause: &ActorError,
    ) {
        match target.permanence() {
            Permanence::Temporary => self.stop_child(system, myself, target),
            Permanence::Permanent => {
                debug!(actor = %self.name, child = %target.name(), "Scheduling child restart");
                // Prepended in reverse so the child sees PreRestart, Restart, PostRestart.
                let queued = target
                    .prepend_system(LifeCycleMessage::PostRestart(cause.clone()))
                    .and_then(|_| target.prepend_system(LifeCycleMessage::Restart(cause.clone())))
                    .and_then(|_| target.prepend_system(LifeCycleMessage::PreRestart(cause.clone())));
                if let Err(e) = queued {
                    debug!(actor = %self.name, child = %target.name(), error = %e, "Child gone before restart");
                }
            }
        }
    }

    fn stop_child(&self, system: &SystemInner, myself: &ActorRef, child: &ActorRef) {
        info!(actor = %self.name, child = %child.name(), "Stopping temporary child");
        system.links.unlink(myself.id(), child.id());
        let _ = child.stop();
    }

    /// Final teardown: runs the shutdown hook, stops linked children and leaves the
    /// dispatcher. The reference must already be in SHUTDOWN.
    fn terminate(&mut self, myself: &ActorRef) {
        self.cancel_timeout();
        if self.instance.is_some() {
            let mut ctx = Context::new(myself.clone(), None, None);
            if let Err(e) = self.run_hook(|actor| actor.shutdown(&mut ctx)) {
                warn!(actor = %self.name, error = %e, "Shutdown hook failed");
            }
        }
        self.instance = None;
        self.swapped = None;
        if !self.held.is_empty() {
            debug!(actor = %self.name, dropped = self.held.len(), "Discarding held messages");
            self.held.clear();
        }
        if let Some(system) = myself.system() {
            system.release(myself);
        }
        info!(actor = %self.name, "Actor stopped");
    }

    fn wants_receive_timeout(&self) -> bool {
        match (&self.swapped, &self.instance) {
            (Some(behavior), _) => behavior.handles_receive_timeout(),
            (None, Some(actor)) => actor.handles_receive_timeout(),
            (None, None) => false,
        }
    }

    fn schedule_timeout(&mut self, myself: &ActorRef) {
        let Some(delay) = self.props.receive_timeout else {
            return;
        };
        if self.wants_receive_timeout() {
            self.timer_generation += 1;
            self.timer = Some(self.scheduler.schedule_once(
                myself,
                LifeCycleMessage::ReceiveTimeout(self.timer_generation),
                delay,
            ));
        }
    }

    fn cancel_timeout(&mut self) {
        if let Some(handle) = self.timer.take() {
            // A sleep that already woke up cannot be aborted; its message is stale now.
            self.timer_generation += 1;
            self.scheduler.unschedule(handle);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Dispatcher-facing wrapper; the async lock is the per-actor mutual exclusion.
pub(crate) struct CellInvoker {
    cell: tokio::sync::Mutex<ActorCell>,
}

impl CellInvoker {
    pub(crate) fn new(cell: ActorCell) -> Self {
        Self {
            cell: tokio::sync::Mutex::new(cell),
        }
    }
}

#[async_trait]
impl MessageInvoker for CellInvoker {
    async fn invoke(&self, envelope: Envelope) {
        let mut cell = self.cell.lock().await;
        if let Err(e) = cell.invoke(envelope) {
            error!(actor = %cell.name, error = %e, "Envelope rejected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::behavior::HandlerResult;
    use crate::framework::mock::RecordingScheduler;

    struct Silent;

    impl Behavior for Silent {
        fn receive(&mut self, _ctx: &mut Context, _message: &Message) -> HandlerResult {
            Ok(Handled::Done)
        }
    }

    impl Actor for Silent {}

    #[test]
    fn unbound_cell_reports_initialization_error() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let mut cell = ActorCell::new("orphan".into(), Props::new(|| Silent), scheduler);

        let err = cell
            .invoke(Envelope::user(Box::new(1u32), None))
            .unwrap_err();
        assert_eq!(err, ActorError::Initialization("orphan".into()));
    }

    #[test]
    fn panic_payloads_are_rendered() {
        let from_str: Box<dyn Any + Send> = Box::new("boom");
        let from_string: Box<dyn Any + Send> = Box::new(String::from("bang"));
        let opaque: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*from_str), "boom");
        assert_eq!(panic_message(&*from_string), "bang");
        assert_eq!(panic_message(&*opaque), "handler panicked");
    }
}

//! Idle-timeout scheduling.
//!
//! The runtime only ever calls [`TimeoutScheduler::schedule_once`] and
//! [`TimeoutScheduler::unschedule`]; the fired message comes back through the
//! recipient's mailbox like any other system message.

use crate::framework::actor_ref::ActorRef;
use crate::framework::message::LifeCycleMessage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

/// Opaque cancellation handle returned by `schedule_once`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleHandle(pub u64);

pub trait TimeoutScheduler: Send + Sync {
    fn schedule_once(
        &self,
        recipient: &ActorRef,
        message: LifeCycleMessage,
        delay: Duration,
    ) -> ScheduleHandle;

    fn unschedule(&self, handle: ScheduleHandle);
}

/// Default scheduler: one sleeping task per pending timer on the given runtime.
pub struct TokioScheduler {
    runtime: Handle,
    pending: Arc<Mutex<HashMap<u64, AbortHandle>>>,
    next_id: AtomicU64,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

impl TimeoutScheduler for TokioScheduler {
    fn schedule_once(
        &self,
        recipient: &ActorRef,
        message: LifeCycleMessage,
        delay: Duration,
    ) -> ScheduleHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let recipient = recipient.clone();
        let pending = self.pending.clone();
        // Hold the lock across spawn so the task cannot remove its entry before it exists.
        let mut guard = self.pending.lock();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            pending.lock().remove(&id);
            trace!(actor = %recipient.name(), ?message, "Timer fired");
            if let Err(e) = recipient.send_system(message) {
                debug!(actor = %recipient.name(), error = %e, "Timer target gone");
            }
        });
        guard.insert(id, task.abort_handle());
        ScheduleHandle(id)
    }

    fn unschedule(&self, handle: ScheduleHandle) {
        if let Some(task) = self.pending.lock().remove(&handle.0) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::framework::behavior::{Actor, Behavior, Context, Handled, HandlerResult};
    use crate::framework::message::Message;
    use crate::framework::props::Props;
    use crate::lifecycle::ActorSystem;

    struct Inert;

    impl Behavior for Inert {
        fn receive(&mut self, _ctx: &mut Context, _message: &Message) -> HandlerResult {
            Ok(Handled::Unhandled)
        }
    }

    impl Actor for Inert {}

    #[tokio::test]
    async fn fired_timer_lands_in_the_mailbox() {
        let system = ActorSystem::new(RuntimeConfig::default()).unwrap();
        // Never started, so the envelope stays queued where we can see it.
        let target = system.actor_of(Props::new(|| Inert));
        let scheduler = TokioScheduler::new(tokio::runtime::Handle::current());

        scheduler.schedule_once(
            &target,
            LifeCycleMessage::ReceiveTimeout(1),
            Duration::from_millis(10),
        );
        assert_eq!(scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(target.pending_messages(), 1);
    }

    #[tokio::test]
    async fn unscheduled_timer_never_fires() {
        let system = ActorSystem::new(RuntimeConfig::default()).unwrap();
        let target = system.actor_of(Props::new(|| Inert));
        let scheduler = TokioScheduler::new(tokio::runtime::Handle::current());

        let handle = scheduler.schedule_once(
            &target,
            LifeCycleMessage::ReceiveTimeout(1),
            Duration::from_millis(20),
        );
        scheduler.unschedule(handle);
        assert_eq!(scheduler.pending(), 0);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(target.pending_messages(), 0);
    }
}

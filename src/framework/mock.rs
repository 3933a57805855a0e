//! # Mock Framework
//!
//! Test doubles for the runtime's two outward seams.
//!
//! - [`RecordingScheduler`] replaces the Tokio timer. Idle timeouts are recorded instead of
//!   armed, and a test fires them by hand with [`RecordingScheduler::fire_next`], which
//!   makes receive-timeout behavior deterministic.
//! - [`RecordingTransport`] stands in for the remote wire. Every envelope handed to a
//!   remote reference arrives on a channel the test controls; use
//!   [`expect_delivery`] to pull the next one.
//!
//! ```ignore
//! let scheduler = Arc::new(RecordingScheduler::default());
//! let system = ActorSystem::builder(RuntimeConfig::default())
//!     .scheduler(scheduler.clone())
//!     .build()?;
//! // ... start an actor with a receive timeout, let it go idle ...
//! assert!(scheduler.fire_next());
//! ```

use crate::framework::actor_ref::ActorRef;
use crate::framework::error::ActorError;
use crate::framework::message::{Envelope, LifeCycleMessage};
use crate::framework::timeout::{ScheduleHandle, TimeoutScheduler};
use crate::framework::transport::{RemoteAddress, RemoteTransport};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

// =============================================================================
// SCHEDULER
// =============================================================================

struct Scheduled {
    handle: ScheduleHandle,
    recipient: ActorRef,
    message: LifeCycleMessage,
    delay: Duration,
}

/// Scheduler that records requests and only delivers them when told to.
#[derive(Default)]
pub struct RecordingScheduler {
    pending: Mutex<VecDeque<Scheduled>>,
    cancelled: AtomicU64,
    next_id: AtomicU64,
}

impl RecordingScheduler {
    /// Timers scheduled and neither fired nor cancelled.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Delays of the pending timers, oldest first.
    pub fn delays(&self) -> Vec<Duration> {
        self.pending.lock().iter().map(|s| s.delay).collect()
    }

    /// Number of `unschedule` calls that hit a pending timer.
    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Delivers the oldest pending timer as if it had elapsed. Returns `false` when
    /// nothing was pending.
    pub fn fire_next(&self) -> bool {
        let Some(scheduled) = self.pending.lock().pop_front() else {
            return false;
        };
        let _ = scheduled.recipient.send_system(scheduled.message);
        true
    }
}

impl TimeoutScheduler for RecordingScheduler {
    fn schedule_once(
        &self,
        recipient: &ActorRef,
        message: LifeCycleMessage,
        delay: Duration,
    ) -> ScheduleHandle {
        let handle = ScheduleHandle(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.pending.lock().push_back(Scheduled {
            handle,
            recipient: recipient.clone(),
            message,
            delay,
        });
        handle
    }

    fn unschedule(&self, handle: ScheduleHandle) {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|s| s.handle != handle);
        if pending.len() < before {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// One envelope handed to the transport.
#[derive(Debug)]
pub struct RemoteDelivery {
    pub address: RemoteAddress,
    pub actor: String,
    pub envelope: Envelope,
}

/// Transport that forwards every delivery to a test-owned channel.
pub struct RecordingTransport {
    sender: mpsc::UnboundedSender<RemoteDelivery>,
    failure: Mutex<Option<ActorError>>,
}

impl RecordingTransport {
    /// Creates the transport and the receiver that observes its deliveries.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RemoteDelivery>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                failure: Mutex::new(None),
            },
            receiver,
        )
    }

    /// Makes every following delivery fail with `error`.
    pub fn fail_with(&self, error: ActorError) {
        *self.failure.lock() = Some(error);
    }
}

impl RemoteTransport for RecordingTransport {
    fn deliver(
        &self,
        address: &RemoteAddress,
        actor: &str,
        envelope: Envelope,
    ) -> Result<(), ActorError> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        self.sender
            .send(RemoteDelivery {
                address: address.clone(),
                actor: actor.to_string(),
                envelope,
            })
            .map_err(|_| ActorError::Transport(format!("{address} unreachable")))
    }
}

/// Helper to pull the next delivery, or `None` if nothing arrives within a second.
pub async fn expect_delivery(
    receiver: &mut mpsc::UnboundedReceiver<RemoteDelivery>,
) -> Option<RemoteDelivery> {
    tokio::time::timeout(Duration::from_secs(1), receiver.recv())
        .await
        .ok()
        .flatten()
}

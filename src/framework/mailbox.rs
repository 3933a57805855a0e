//! # Mailbox
//!
//! An ordered, thread-safe inbox of [`Envelope`]s owned by exactly one actor.
//!
//! All mutations go through a single `parking_lot` lock; the lone consumer parks on a
//! Tokio [`Notify`] while the queue is empty. `append` stores a wake permit even when no
//! consumer is parked yet, so an arrival between "saw empty" and "started waiting" is
//! never lost.

use crate::framework::error::ActorError;
use crate::framework::message::Envelope;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;
use tracing::trace;

#[derive(Default)]
struct MailboxState {
    envelopes: VecDeque<Envelope>,
    interrupted: bool,
}

/// Per-actor FIFO queue with blocking drain and one-shot interrupt.
pub struct Mailbox {
    owner: String,
    state: Mutex<MailboxState>,
    wakeup: Notify,
    capacity: Option<usize>,
}

impl Mailbox {
    /// Creates a mailbox. `capacity` bounds ordinary appends; `None` is unbounded.
    pub fn new(owner: impl Into<String>, capacity: Option<usize>) -> Self {
        Self {
            owner: owner.into(),
            state: Mutex::new(MailboxState::default()),
            wakeup: Notify::new(),
            capacity,
        }
    }

    /// Adds an envelope at the tail and wakes the consumer.
    pub fn append(&self, envelope: Envelope) -> Result<(), ActorError> {
        {
            let mut state = self.state.lock();
            if let Some(capacity) = self.capacity {
                if state.envelopes.len() >= capacity {
                    return Err(ActorError::MailboxFull(self.owner.clone()));
                }
            }
            state.envelopes.push_back(envelope);
        }
        self.wakeup.notify_one();
        Ok(())
    }

    /// Adds an envelope at the head, ahead of everything pending. Never bounded.
    pub fn prepend(&self, envelope: Envelope) {
        self.state.lock().envelopes.push_front(envelope);
        self.wakeup.notify_one();
    }

    /// Waits until at least one envelope is queued or the mailbox is interrupted, then
    /// moves every queued envelope into `destination` in FIFO order.
    ///
    /// An interrupt is consumed by the call that observes it: that call discards the
    /// pending envelopes and returns without adding anything.
    pub async fn drain_into(&self, destination: &mut Vec<Envelope>) {
        loop {
            {
                let mut state = self.state.lock();
                if state.interrupted {
                    state.interrupted = false;
                    let dropped = state.envelopes.len();
                    state.envelopes.clear();
                    trace!(actor = %self.owner, dropped, "Mailbox interrupted");
                    return;
                }
                if !state.envelopes.is_empty() {
                    destination.extend(state.envelopes.drain(..));
                    return;
                }
            }
            self.wakeup.notified().await;
        }
    }

    /// Wakes any blocked consumer; the next `drain_into` returns empty without waiting.
    pub fn interrupt(&self) {
        self.state.lock().interrupted = true;
        self.wakeup.notify_waiters();
        self.wakeup.notify_one();
    }

    pub fn len(&self) -> usize {
        self.state.lock().envelopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::message::{Envelope, Payload};
    use std::sync::Arc;
    use std::time::Duration;

    fn numbered(n: u32) -> Envelope {
        Envelope::user(Box::new(n), None)
    }

    fn numbers(batch: &[Envelope]) -> Vec<u32> {
        batch
            .iter()
            .map(|e| match &e.payload {
                Payload::User(m) => *m.downcast_ref::<u32>().unwrap(),
                Payload::System(_) => panic!("unexpected system message"),
            })
            .collect()
    }

    #[tokio::test]
    async fn drains_everything_in_fifo_order() {
        let mailbox = Mailbox::new("fifo", None);
        for n in 0..5 {
            mailbox.append(numbered(n)).unwrap();
        }
        mailbox.prepend(numbered(99));

        let mut batch = Vec::new();
        mailbox.drain_into(&mut batch).await;
        assert_eq!(numbers(&batch), vec![99, 0, 1, 2, 3, 4]);
        assert!(mailbox.is_empty());
    }

    #[tokio::test]
    async fn blocked_consumer_wakes_on_append() {
        let mailbox = Arc::new(Mailbox::new("wake", None));
        let consumer = {
            let mailbox = mailbox.clone();
            tokio::spawn(async move {
                let mut batch = Vec::new();
                mailbox.drain_into(&mut batch).await;
                numbers(&batch)
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        mailbox.append(numbered(7)).unwrap();

        let drained = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer never woke")
            .unwrap();
        assert_eq!(drained, vec![7]);
    }

    #[tokio::test]
    async fn interrupt_unblocks_waiter_promptly() {
        let mailbox = Arc::new(Mailbox::new("interrupt", None));
        let consumer = {
            let mailbox = mailbox.clone();
            tokio::spawn(async move {
                let mut batch = Vec::new();
                mailbox.drain_into(&mut batch).await;
                batch.len()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        mailbox.interrupt();

        let drained = tokio::time::timeout(Duration::from_millis(500), consumer)
            .await
            .expect("interrupt did not unblock the consumer")
            .unwrap();
        assert_eq!(drained, 0);
    }

    #[tokio::test]
    async fn interrupt_is_one_shot_and_discards_pending() {
        let mailbox = Mailbox::new("one-shot", None);
        mailbox.append(numbered(1)).unwrap();
        mailbox.interrupt();

        let mut batch = Vec::new();
        mailbox.drain_into(&mut batch).await;
        assert!(batch.is_empty());
        assert!(mailbox.is_empty());

        mailbox.append(numbered(2)).unwrap();
        mailbox.drain_into(&mut batch).await;
        assert_eq!(numbers(&batch), vec![2]);
    }

    #[test]
    fn bounded_mailbox_rejects_appends_but_not_prepends() {
        let mailbox = Mailbox::new("bounded", Some(1));
        mailbox.append(numbered(1)).unwrap();
        assert_eq!(
            mailbox.append(numbered(2)),
            Err(ActorError::MailboxFull("bounded".into()))
        );
        mailbox.prepend(numbered(0));
        assert_eq!(mailbox.len(), 2);
    }
}

//! # Dispatcher
//!
//! Multiplexes many actor mailboxes onto a small pool of worker threads.
//!
//! The dispatcher owns a dedicated Tokio runtime sized from [`DispatcherConfig`] and a
//! registry mapping actor id -> [`MessageInvoker`]. Registering an actor spawns one
//! worker task for it on that runtime; the task blocks in
//! [`Mailbox::drain_into`](crate::framework::Mailbox::drain_into) and then invokes the
//! current invoker once per drained envelope, in order. The Tokio scheduler spreads those
//! tasks across the pool, while each invoker serializes its own invocations, so two
//! workers never run the same actor at once.

use crate::config::{DispatcherConfig, DispatcherKind};
use crate::framework::actor_ref::ActorId;
use crate::framework::error::ActorError;
use crate::framework::mailbox::Mailbox;
use crate::framework::message::Envelope;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info, trace};

/// Something that processes one envelope for one actor.
///
/// Implementations must catch their own failures: an invoker never brings the worker
/// loop down.
#[async_trait]
pub trait MessageInvoker: Send + Sync {
    async fn invoke(&self, envelope: Envelope);
}

struct Registration {
    mailbox: Arc<Mailbox>,
    invoker: Arc<dyn MessageInvoker>,
}

#[derive(Default)]
struct Registry {
    handlers: Mutex<HashMap<ActorId, Registration>>,
    active: AtomicBool,
}

impl Registry {
    fn invoker(&self, key: ActorId) -> Option<Arc<dyn MessageInvoker>> {
        self.handlers.lock().get(&key).map(|r| r.invoker.clone())
    }
}

pub struct Dispatcher {
    name: String,
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(name: impl Into<String>, config: &DispatcherConfig) -> Result<Self, ActorError> {
        let name = name.into();
        let mut builder = Builder::new_multi_thread();
        builder
            .worker_threads(config.worker_threads())
            .max_blocking_threads(config.max_pool_size.max(1))
            .thread_keep_alive(config.keep_alive)
            .thread_name(format!("{name}-worker"))
            .enable_all();
        if config.fair {
            builder.global_queue_interval(1);
        }
        let runtime = builder
            .build()
            .map_err(|e| ActorError::Dispatcher(e.to_string()))?;
        let handle = runtime.handle().clone();

        let registry = Arc::new(Registry::default());
        registry.active.store(true, Ordering::SeqCst);

        let kind = match config.kind {
            DispatcherKind::ThreadPool => "thread_pool",
            DispatcherKind::Reactor => "reactor",
        };
        info!(dispatcher = %name, kind, workers = config.worker_threads(), "Dispatcher started");

        Ok(Self {
            name,
            runtime: Mutex::new(Some(runtime)),
            handle,
            registry,
        })
    }

    /// Handle to the runtime backing this dispatcher, for collaborators such as timers.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn is_active(&self) -> bool {
        self.registry.active.load(Ordering::SeqCst)
    }

    /// Registers `invoker` for `key`. Re-registering a key replaces its invoker; the
    /// existing worker keeps draining the same mailbox and picks up the new invoker.
    pub fn register_handler(
        &self,
        key: ActorId,
        mailbox: Arc<Mailbox>,
        invoker: Arc<dyn MessageInvoker>,
    ) -> Result<(), ActorError> {
        let mut handlers = self.registry.handlers.lock();
        if !self.is_active() {
            return Err(ActorError::DispatcherInactive);
        }
        if let Some(existing) = handlers.get_mut(&key) {
            debug!(dispatcher = %self.name, %key, "Replacing invoker");
            existing.invoker = invoker;
            return Ok(());
        }
        handlers.insert(
            key,
            Registration {
                mailbox: mailbox.clone(),
                invoker,
            },
        );
        drop(handlers);

        self.handle
            .spawn(run_worker(self.registry.clone(), key, mailbox));
        debug!(dispatcher = %self.name, %key, "Registered");
        Ok(())
    }

    /// Removes `key`. Its worker exits at the next envelope or wake-up.
    pub fn unregister_handler(&self, key: ActorId) {
        let removed = self.registry.handlers.lock().remove(&key);
        if let Some(registration) = removed {
            registration.mailbox.interrupt();
            debug!(dispatcher = %self.name, %key, "Unregistered");
        }
    }

    pub fn is_registered(&self, key: ActorId) -> bool {
        self.registry.handlers.lock().contains_key(&key)
    }

    /// Stops accepting registrations, interrupts every mailbox so parked workers unwind,
    /// then tears the runtime down. Calling it again is a no-op.
    pub fn shutdown(&self) {
        let registrations: Vec<Registration> = {
            let mut handlers = self.registry.handlers.lock();
            if !self.registry.active.swap(false, Ordering::SeqCst) {
                return;
            }
            handlers.drain().map(|(_, r)| r).collect()
        };
        for registration in &registrations {
            registration.mailbox.interrupt();
        }
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
        info!(dispatcher = %self.name, actors = registrations.len(), "Dispatcher shut down");
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_worker(registry: Arc<Registry>, key: ActorId, mailbox: Arc<Mailbox>) {
    let mut batch = Vec::new();
    loop {
        mailbox.drain_into(&mut batch).await;
        for envelope in batch.drain(..) {
            let Some(invoker) = registry.invoker(key) else {
                trace!(%key, "Worker exiting, actor unregistered");
                return;
            };
            invoker.invoke(envelope).await;
        }
        if registry.invoker(key).is_none() {
            trace!(%key, "Worker exiting, actor unregistered");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::message::Payload;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Recording {
        tag: &'static str,
        seen: mpsc::UnboundedSender<(&'static str, u32)>,
    }

    #[async_trait]
    impl MessageInvoker for Recording {
        async fn invoke(&self, envelope: Envelope) {
            if let Payload::User(message) = envelope.payload {
                let n = *message.downcast_ref::<u32>().unwrap();
                let _ = self.seen.send((self.tag, n));
            }
        }
    }

    struct Overlap {
        in_flight: AtomicUsize,
        max_seen: AtomicUsize,
        done: AtomicUsize,
    }

    #[async_trait]
    impl MessageInvoker for Overlap {
        async fn invoke(&self, _envelope: Envelope) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.done.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn delivers_in_drain_order() {
        let dispatcher = Dispatcher::new("order", &DispatcherConfig::default()).unwrap();
        let mailbox = Arc::new(Mailbox::new("a", None));
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher
            .register_handler(1, mailbox.clone(), Arc::new(Recording { tag: "a", seen: tx }))
            .unwrap();

        for n in 0..100u32 {
            mailbox.append(Envelope::user(Box::new(n), None)).unwrap();
        }
        for expected in 0..100u32 {
            let (_, n) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(n, expected);
        }
    }

    #[tokio::test]
    async fn re_registering_replaces_the_invoker() {
        let dispatcher = Dispatcher::new("replace", &DispatcherConfig::default()).unwrap();
        let mailbox = Arc::new(Mailbox::new("a", None));
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher
            .register_handler(1, mailbox.clone(), Arc::new(Recording { tag: "old", seen: tx.clone() }))
            .unwrap();
        dispatcher
            .register_handler(1, mailbox.clone(), Arc::new(Recording { tag: "new", seen: tx }))
            .unwrap();

        mailbox.append(Envelope::user(Box::new(1u32), None)).unwrap();
        let (tag, _) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tag, "new");
        assert!(tokio::time::timeout(Duration::from_millis(50), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn one_actor_is_never_invoked_concurrently() {
        let dispatcher = Dispatcher::new("exclusive", &DispatcherConfig::default()).unwrap();
        let mailbox = Arc::new(Mailbox::new("a", None));
        let invoker = Arc::new(Overlap {
            in_flight: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
        });
        dispatcher
            .register_handler(1, mailbox.clone(), invoker.clone())
            .unwrap();

        for n in 0..500u32 {
            mailbox.append(Envelope::user(Box::new(n), None)).unwrap();
        }
        tokio::time::timeout(Duration::from_secs(5), async {
            while invoker.done.load(Ordering::SeqCst) < 500 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(invoker.max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_rejects_registrations() {
        let dispatcher = Dispatcher::new("down", &DispatcherConfig::reactor()).unwrap();
        let mailbox = Arc::new(Mailbox::new("a", None));
        let (tx, _rx) = mpsc::unbounded_channel();
        dispatcher
            .register_handler(1, mailbox.clone(), Arc::new(Recording { tag: "a", seen: tx.clone() }))
            .unwrap();

        dispatcher.shutdown();
        dispatcher.shutdown();

        assert!(!dispatcher.is_active());
        assert!(!dispatcher.is_registered(1));
        let err = dispatcher
            .register_handler(2, mailbox, Arc::new(Recording { tag: "b", seen: tx }))
            .unwrap_err();
        assert_eq!(err, ActorError::DispatcherInactive);
    }
}

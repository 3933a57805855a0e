use crate::config::RuntimeConfig;
use crate::framework::actor_ref::{ActorId, ActorRef, LifecycleState};
use crate::framework::cell::ActorCell;
use crate::framework::dispatcher::Dispatcher;
use crate::framework::error::ActorError;
use crate::framework::mailbox::Mailbox;
use crate::framework::props::Props;
use crate::framework::timeout::{TimeoutScheduler, TokioScheduler};
use crate::framework::transport::{RemoteAddress, RemoteTransport};
use crate::supervision::config::SupervisorConfig;
use crate::supervision::links::{LinkError, LinkTable};
use crate::supervision::supervisor::SupervisorActor;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// State shared by every reference created through one [`ActorSystem`].
pub(crate) struct SystemInner {
    pub(crate) config: RuntimeConfig,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) scheduler: Arc<dyn TimeoutScheduler>,
    pub(crate) transport: Option<Arc<dyn RemoteTransport>>,
    pub(crate) links: LinkTable,
    actors: RwLock<HashMap<ActorId, ActorRef>>,
    next_id: AtomicU64,
}

impl SystemInner {
    pub(crate) fn actor(&self, id: ActorId) -> Option<ActorRef> {
        self.actors.read().get(&id).cloned()
    }

    pub(crate) fn supervisor_of(&self, id: ActorId) -> Option<ActorRef> {
        self.links.parent(id).and_then(|parent| self.actor(parent))
    }

    pub(crate) fn children_of(&self, id: ActorId) -> Vec<ActorRef> {
        self.links
            .children(id)
            .into_iter()
            .filter_map(|child| self.actor(child))
            .collect()
    }

    pub(crate) fn link(&self, parent: &ActorRef, child: &ActorRef) -> Result<(), ActorError> {
        self.links
            .link(parent.id(), child.id())
            .map_err(|e| match e {
                LinkError::SelfLink => ActorError::SelfLink(parent.name().to_string()),
                LinkError::AlreadyLinked(existing) => ActorError::AlreadyLinked {
                    child: child.name().to_string(),
                    supervisor: self
                        .actor(existing)
                        .map(|s| s.name().to_string())
                        .unwrap_or_else(|| format!("actor-{existing}")),
                },
            })?;
        debug!(supervisor = %parent.name(), child = %child.name(), "Linked");
        Ok(())
    }

    /// Forgets a stopped actor: drops its links, stops the children it supervised and
    /// removes it from the dispatcher and the arena.
    pub(crate) fn release(&self, actor: &ActorRef) {
        for child in self.links.detach(actor.id()) {
            if let Some(child) = self.actor(child) {
                debug!(supervisor = %actor.name(), child = %child.name(), "Stopping linked child");
                let _ = child.stop();
            }
        }
        self.dispatcher.unregister_handler(actor.id());
        self.actors.write().remove(&actor.id());
    }

    fn next_id(&self) -> ActorId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Builder for an [`ActorSystem`] with non-default collaborators.
pub struct ActorSystemBuilder {
    config: RuntimeConfig,
    scheduler: Option<Arc<dyn TimeoutScheduler>>,
    transport: Option<Arc<dyn RemoteTransport>>,
}

impl ActorSystemBuilder {
    /// Replaces the Tokio-backed idle-timeout scheduler.
    pub fn scheduler(mut self, scheduler: Arc<dyn TimeoutScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Transport used to deliver messages to remote references.
    pub fn transport(mut self, transport: Arc<dyn RemoteTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<ActorSystem, ActorError> {
        let dispatcher = Dispatcher::new(self.config.name.clone(), &self.config.dispatcher)?;
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TokioScheduler::new(dispatcher.handle().clone())));
        info!(system = %self.config.name, remote = self.transport.is_some(), "Actor system up");
        Ok(ActorSystem {
            inner: Arc::new(SystemInner {
                config: self.config,
                dispatcher,
                scheduler,
                transport: self.transport,
                links: LinkTable::new(),
                actors: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        })
    }
}

/// Owner of the dispatcher, the link table and every actor created through it.
///
/// Dropping the system shuts it down.
///
/// # Example
///
/// ```ignore
/// let system = ActorSystem::new(RuntimeConfig::default())?;
/// let counter = system.spawn(Props::new(Counter::default).with_name("counter"))?;
/// counter.tell(Increment)?;
/// let total = counter.ask_as::<u64, _>(Total, Duration::from_secs(1)).await?;
/// system.shutdown();
/// ```
pub struct ActorSystem {
    inner: Arc<SystemInner>,
}

impl ActorSystem {
    pub fn new(config: RuntimeConfig) -> Result<Self, ActorError> {
        Self::builder(config).build()
    }

    pub fn builder(config: RuntimeConfig) -> ActorSystemBuilder {
        ActorSystemBuilder {
            config,
            scheduler: None,
            transport: None,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Creates an actor in NEW state. Nothing runs until [`ActorRef::start`].
    pub fn actor_of(&self, props: Props) -> ActorRef {
        let id = self.inner.next_id();
        let name = props.name.clone().unwrap_or_else(|| format!("actor-{id}"));
        let mailbox = Arc::new(Mailbox::new(
            name.clone(),
            self.inner.config.dispatcher.queue_capacity,
        ));
        let cell = ActorCell::new(name.clone(), props, self.inner.scheduler.clone());
        let actor = ActorRef::local(id, name, mailbox, cell, Arc::downgrade(&self.inner));
        self.inner.actors.write().insert(id, actor.clone());
        debug!(actor = %actor.name(), id, "Actor created");
        actor
    }

    /// [`actor_of`](Self::actor_of) followed by `start`.
    pub fn spawn(&self, props: Props) -> Result<ActorRef, ActorError> {
        let actor = self.actor_of(props);
        actor.start()?;
        Ok(actor)
    }

    /// Reference to an actor living behind the configured [`RemoteTransport`].
    pub fn remote_actor_for(&self, name: impl Into<String>, address: RemoteAddress) -> ActorRef {
        let id = self.inner.next_id();
        let actor = ActorRef::remote(id, name.into(), address, Arc::downgrade(&self.inner));
        self.inner.actors.write().insert(id, actor.clone());
        debug!(actor = %actor.name(), address = ?actor.remote_address(), "Remote reference created");
        actor
    }

    /// Starts a supervisor and links then starts each configured child under it.
    pub fn supervise(&self, config: SupervisorConfig) -> Result<ActorRef, ActorError> {
        let props = Props::new(|| SupervisorActor)
            .with_name(config.name)
            .trap_exit(config.trap_exit)
            .with_restart_strategy(config.strategy);
        let supervisor = self.spawn(props)?;
        for child in config.children {
            let child = self.actor_of(child.into_props());
            supervisor.link(&child)?;
            child.start()?;
        }
        info!(
            supervisor = %supervisor.name(),
            children = supervisor.children().len(),
            strategy = ?config.strategy.propagation,
            "Supervision tree started"
        );
        Ok(supervisor)
    }

    pub fn actor(&self, id: ActorId) -> Option<ActorRef> {
        self.inner.actor(id)
    }

    /// Running actors tagged with `tag`, in creation order.
    pub fn actors_with_capability(&self, tag: &str) -> Vec<ActorRef> {
        let mut found: Vec<ActorRef> = self
            .inner
            .actors
            .read()
            .values()
            .filter(|a| a.capability() == Some(tag) && a.state() != LifecycleState::Shutdown)
            .cloned()
            .collect();
        found.sort_by_key(ActorRef::id);
        found
    }

    pub fn is_active(&self) -> bool {
        self.inner.dispatcher.is_active()
    }

    /// Stops every actor without running further handlers and tears the dispatcher down.
    pub fn shutdown(&self) {
        if !self.inner.dispatcher.is_active() {
            return;
        }
        let actors: Vec<ActorRef> = self.inner.actors.write().drain().map(|(_, a)| a).collect();
        for actor in &actors {
            actor.mark_shutdown();
        }
        self.inner.dispatcher.shutdown();
        info!(system = %self.inner.config.name, actors = actors.len(), "Actor system shut down");
    }
}

impl Drop for ActorSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::behavior::{Actor, Behavior, Context, Handled, HandlerResult};
    use crate::framework::message::Message;

    struct Idle;

    impl Behavior for Idle {
        fn receive(&mut self, _ctx: &mut Context, _message: &Message) -> HandlerResult {
            Ok(Handled::Unhandled)
        }
    }

    impl Actor for Idle {}

    #[tokio::test]
    async fn default_names_come_from_ids() {
        let system = ActorSystem::new(RuntimeConfig::default()).unwrap();
        let first = system.actor_of(Props::new(|| Idle));
        let second = system.actor_of(Props::new(|| Idle).with_name("named"));
        assert_eq!(first.name(), format!("actor-{}", first.id()));
        assert_eq!(second.name(), "named");
        assert_eq!(first.state(), LifecycleState::New);
    }

    #[tokio::test]
    async fn link_errors_name_the_existing_supervisor() {
        let system = ActorSystem::new(RuntimeConfig::default()).unwrap();
        let a = system.actor_of(Props::new(|| Idle).with_name("a"));
        let b = system.actor_of(Props::new(|| Idle).with_name("b"));
        let child = system.actor_of(Props::new(|| Idle).with_name("child"));

        a.link(&child).unwrap();
        a.link(&child).unwrap();
        assert_eq!(
            b.link(&child).unwrap_err(),
            ActorError::AlreadyLinked {
                child: "child".into(),
                supervisor: "a".into()
            }
        );
        assert_eq!(a.link(&a).unwrap_err(), ActorError::SelfLink("a".into()));
        assert_eq!(child.supervisor(), Some(a.clone()));
    }

    #[tokio::test]
    async fn stopping_a_new_actor_releases_it() {
        let system = ActorSystem::new(RuntimeConfig::default()).unwrap();
        let actor = system.actor_of(Props::new(|| Idle));
        actor.stop().unwrap();
        assert_eq!(actor.state(), LifecycleState::Shutdown);
        assert!(system.actor(actor.id()).is_none());
        assert!(actor.start().is_err());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let system = ActorSystem::new(RuntimeConfig::default()).unwrap();
        let actor = system.spawn(Props::new(|| Idle)).unwrap();
        system.shutdown();
        system.shutdown();
        assert!(!system.is_active());
        assert_eq!(actor.state(), LifecycleState::Shutdown);
        assert!(actor.tell(1u8).is_err());
    }
}

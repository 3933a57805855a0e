//! Creation recipe for an actor.

use crate::framework::behavior::Actor;
use crate::framework::error::FaultKind;
use crate::supervision::config::RestartCallbacks;
use crate::supervision::strategy::{Permanence, RestartStrategy};
use std::sync::Arc;
use std::time::Duration;

/// Builds a fresh actor instance; called on first start and on every restart.
pub type ActorFactory = Arc<dyn Fn() -> Box<dyn Actor> + Send + Sync>;

#[derive(Clone)]
pub struct Props {
    pub(crate) factory: ActorFactory,
    pub(crate) name: Option<String>,
    pub(crate) capability: Option<String>,
    pub(crate) permanence: Permanence,
    pub(crate) receive_timeout: Option<Duration>,
    pub(crate) trap_exit: Vec<FaultKind>,
    pub(crate) restart_strategy: RestartStrategy,
    pub(crate) callbacks: RestartCallbacks,
}

impl Props {
    pub fn new<A, F>(factory: F) -> Self
    where
        A: Actor,
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self::from_factory(Arc::new(move || Box::new(factory()) as Box<dyn Actor>))
    }

    pub fn from_factory(factory: ActorFactory) -> Self {
        Self {
            factory,
            name: None,
            capability: None,
            permanence: Permanence::Permanent,
            receive_timeout: None,
            trap_exit: Vec::new(),
            restart_strategy: RestartStrategy::default(),
            callbacks: RestartCallbacks::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_capability(mut self, tag: impl Into<String>) -> Self {
        self.capability = Some(tag.into());
        self
    }

    pub fn with_permanence(mut self, permanence: Permanence) -> Self {
        self.permanence = permanence;
        self
    }

    /// Idle period after which a behavior interested in it receives `ReceiveTimeout`.
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = Some(timeout);
        self
    }

    /// Fault kinds this actor intercepts from its children instead of re-raising.
    pub fn trap_exit<I, K>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<FaultKind>,
    {
        self.trap_exit = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_restart_strategy(mut self, strategy: RestartStrategy) -> Self {
        self.restart_strategy = strategy;
        self
    }

    pub fn with_restart_callbacks(mut self, callbacks: RestartCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }
}

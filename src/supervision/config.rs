//! Already-parsed supervision descriptors.
//!
//! A [`SupervisorConfig`] names the strategy, the trapped fault kinds and the children to
//! start under the supervisor. Where it came from (a builder, a config file decoded
//! elsewhere) does not matter here.

use crate::framework::actor_ref::ActorRef;
use crate::framework::behavior::Actor;
use crate::framework::error::{ActorError, FaultKind};
use crate::framework::props::{ActorFactory, Props};
use crate::supervision::strategy::{Permanence, RestartStrategy};
use std::sync::Arc;
use std::time::Duration;

pub type RestartCallback = Arc<dyn Fn(&ActorRef, &ActorError) + Send + Sync>;

/// Hooks run around a restart, in addition to the actor's own `pre_restart`/`post_restart`.
#[derive(Clone, Default)]
pub struct RestartCallbacks {
    pub pre_restart: Option<RestartCallback>,
    pub post_restart: Option<RestartCallback>,
}

/// One child to be started and linked under a supervisor.
pub struct SupervisedActor {
    props: Props,
}

impl SupervisedActor {
    pub fn new<A, F>(factory: F) -> Self
    where
        A: Actor,
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self {
            props: Props::new(factory),
        }
    }

    pub fn from_factory(factory: ActorFactory) -> Self {
        Self {
            props: Props::from_factory(factory),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.props = self.props.with_name(name);
        self
    }

    /// Tags the actor with the interface it serves, for lookup by capability.
    pub fn capability(mut self, tag: impl Into<String>) -> Self {
        self.props = self.props.with_capability(tag);
        self
    }

    pub fn permanence(mut self, permanence: Permanence) -> Self {
        self.props = self.props.with_permanence(permanence);
        self
    }

    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.props = self.props.with_receive_timeout(timeout);
        self
    }

    pub fn callbacks(mut self, callbacks: RestartCallbacks) -> Self {
        self.props = self.props.with_restart_callbacks(callbacks);
        self
    }

    pub fn into_props(self) -> Props {
        self.props
    }
}

pub struct SupervisorConfig {
    pub name: String,
    pub strategy: RestartStrategy,
    pub trap_exit: Vec<FaultKind>,
    pub children: Vec<SupervisedActor>,
}

impl SupervisorConfig {
    pub fn new(name: impl Into<String>, strategy: RestartStrategy) -> Self {
        Self {
            name: name.into(),
            strategy,
            trap_exit: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn trap(mut self, kind: impl Into<FaultKind>) -> Self {
        self.trap_exit.push(kind.into());
        self
    }

    pub fn child(mut self, child: SupervisedActor) -> Self {
        self.children.push(child);
        self
    }
}

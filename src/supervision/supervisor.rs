//! The actor started by [`ActorSystem::supervise`](crate::lifecycle::ActorSystem::supervise).
//!
//! It has no message cases of its own; all of its work happens in the runtime's handling
//! of `Exit` from its children.

use crate::framework::behavior::{Actor, Behavior, Context, Handled, HandlerResult};
use crate::framework::message::Message;
use tracing::debug;

pub struct SupervisorActor;

impl Behavior for SupervisorActor {
    fn receive(&mut self, _ctx: &mut Context, _message: &Message) -> HandlerResult {
        Ok(Handled::Unhandled)
    }
}

impl Actor for SupervisorActor {
    fn init(&mut self, ctx: &mut Context) {
        debug!(supervisor = %ctx.myself().name(), "Supervisor ready");
    }
}

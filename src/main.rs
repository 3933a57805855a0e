//! # Actor Runtime Demo
//!
//! Starts a one-for-one supervisor over two counters, kills one and fails the other with
//! a handler error. Each comes back alone, with fresh state; the increment sent right
//! behind the failure is held and lands on the new instance.

use actor_runtime::config::RuntimeConfig;
use actor_runtime::framework::{Actor, ActorError, Behavior, Context, Fault, Handled, HandlerResult, Message};
use actor_runtime::lifecycle::{setup_tracing, ActorSystem};
use actor_runtime::supervision::{RestartStrategy, SupervisedActor, SupervisorConfig};
use std::time::Duration;
use tracing::{info, Instrument};

struct Increment;
struct Total;
struct Explode;

#[derive(Default)]
struct Counter {
    count: u64,
}

impl Behavior for Counter {
    fn receive(&mut self, ctx: &mut Context, message: &Message) -> HandlerResult {
        if message.is::<Increment>() {
            self.count += 1;
        } else if message.is::<Total>() {
            let _ = ctx.reply(self.count);
        } else if message.is::<Explode>() {
            return Err(Fault::new("io", "simulated disk failure"));
        } else {
            return Ok(Handled::Unhandled);
        }
        Ok(Handled::Done)
    }
}

impl Actor for Counter {
    fn post_restart(&mut self, ctx: &mut Context, cause: &ActorError) {
        info!(actor = %ctx.myself().name(), %cause, "Counter back with fresh state");
    }
}

#[tokio::main]
async fn main() -> Result<(), ActorError> {
    setup_tracing();

    let config = RuntimeConfig::default();
    let ask_timeout = config.default_ask_timeout;
    let system = ActorSystem::new(config)?;

    let supervisor = system.supervise(
        SupervisorConfig::new("counters", RestartStrategy::one_for_one(3, Duration::from_secs(5)))
            .trap("io")
            .trap("killed")
            .child(SupervisedActor::new(Counter::default).name("left").capability("counter"))
            .child(SupervisedActor::new(Counter::default).name("right").capability("counter")),
    )?;

    let counters = system.actors_with_capability("counter");
    info!(supervisor = %supervisor.name(), counters = counters.len(), "Tree running");
    let [left, right] = counters.as_slice() else {
        return Err(ActorError::Initialization("counters".to_string()));
    };

    for _ in 0..3 {
        left.tell(Increment)?;
        right.tell(Increment)?;
    }

    let span = tracing::info_span!("failure");
    async {
        left.kill()?;
        right.tell(Explode)?;
        right.tell(Increment)?;
        Ok::<_, ActorError>(())
    }
    .instrument(span)
    .await?;

    let left_total = left.ask_as::<u64, _>(Total, ask_timeout).await?;
    let right_total = right.ask_as::<u64, _>(Total, ask_timeout).await?;
    info!(?left_total, ?right_total, "Totals after restart");

    system.shutdown();
    Ok(())
}

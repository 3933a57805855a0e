#![allow(dead_code)]

use actor_runtime::framework::{Actor, ActorError, Behavior, Context, Fault, Handled, HandlerResult, Message};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const ASK: Duration = Duration::from_secs(2);

pub struct Increment;
pub struct Total;
pub struct Fail(pub &'static str);

/// Counter that fails on demand and counts how many instances its factory built.
pub struct Worker {
    count: u64,
}

impl Behavior for Worker {
    fn receive(&mut self, ctx: &mut Context, message: &Message) -> HandlerResult {
        if message.is::<Increment>() {
            self.count += 1;
        } else if message.is::<Total>() {
            ctx.reply(self.count)
                .map_err(|e| Fault::from_error("reply", &e))?;
        } else if let Some(Fail(kind)) = message.downcast_ref::<Fail>() {
            return Err(Fault::new(*kind, "requested failure"));
        } else {
            return Ok(Handled::Unhandled);
        }
        Ok(Handled::Done)
    }
}

impl Actor for Worker {}

pub fn worker(starts: &Arc<AtomicUsize>) -> impl Fn() -> Worker + Send + Sync + 'static {
    let starts = starts.clone();
    move || {
        starts.fetch_add(1, Ordering::SeqCst);
        Worker { count: 0 }
    }
}

pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub fn count(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Polls `condition` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

pub fn handler_kind(error: &ActorError) -> Option<String> {
    error.fault_kind().map(|k| k.as_str().to_string())
}

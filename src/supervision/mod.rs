//! Fault handling: link trees, restart strategies and supervisor descriptors.
//!
//! A failing actor reports `Exit(child, cause)` to the actor it is linked under. That
//! supervisor restarts the child (or all of its children) when the fault kind is trapped
//! and the restart budget allows it; otherwise it fails itself with the same cause and the
//! decision moves one level up.

pub mod config;
pub mod links;
pub mod strategy;
pub mod supervisor;

pub use config::{RestartCallback, RestartCallbacks, SupervisedActor, SupervisorConfig};
pub use links::{LinkError, LinkTable};
pub use strategy::{Permanence, Propagation, RestartStatistics, RestartStrategy};
pub use supervisor::SupervisorActor;

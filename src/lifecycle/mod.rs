//! System orchestration and observability setup.
//!
//! # Main Components
//!
//! - [`ActorSystem`] - Owns the dispatcher, the link table and every actor it created
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod system;
pub mod tracing;

pub use system::{ActorSystem, ActorSystemBuilder};
pub use tracing::*;

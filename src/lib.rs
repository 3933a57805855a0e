#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Actor Runtime
//!
//! > **Supervised, dispatcher-driven actors on Tokio.**
//!
//! This crate runs many lightweight actors on a small shared pool of worker threads. Each
//! actor owns private state, handles one message at a time and is reached only through a
//! cloneable [`ActorRef`](framework::ActorRef). Failures are not handled where they
//! happen: they travel up a tree of linked supervisors that restart, stop or escalate.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Let it crash
//! A handler that hits an error returns it (or panics). The runtime catches it at the
//! dispatch boundary and hands the decision to the supervisor, which owns a restart
//! strategy:
//! - **One-for-one**: restart only the failed child.
//! - **All-for-one**: restart every child of the supervisor.
//! - **Budget**: more than `max_retries` failures inside `within` escalates instead.
//!
//! A failed actor holds its queued messages until the supervisor has decided, then hands
//! them to the fresh instance. Temporary actors are stopped on their first failure.
//!
//! ### One message at a time
//! The dispatcher may run an actor on any worker thread, but never on two at once, and
//! always in mailbox order. Actor state therefore needs no locks.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Type-Safe Error Handling
//! Everything returns [`ActorError`](framework::ActorError). Handler failures carry a
//! [`Fault`](framework::Fault) whose kind is what supervisors match on when trapping.
//!
//! ### 2. System Messages Jump the Queue
//! Lifecycle control (init, restart, shutdown) is prepended to the mailbox, so it
//! overtakes ordinary traffic; user messages keep their relative order.
//!
//! ### 3. Observability
//! We use `tracing` everywhere with structured logging keyed by actor name.
//! See the [`lifecycle::tracing`] module for details.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! References, mailboxes, behaviors and the dispatcher.
//! - **Key items**: [`ActorRef`](framework::ActorRef), [`Actor`](framework::Actor),
//!   [`Props`](framework::Props), [`Dispatcher`](framework::Dispatcher).
//!
//! ### 2. Fault Handling ([`supervision`])
//! Link trees, restart strategies and restart statistics.
//! - **Key items**: [`RestartStrategy`](supervision::RestartStrategy),
//!   [`SupervisorConfig`](supervision::SupervisorConfig).
//!
//! ### 3. The Orchestrator ([`lifecycle`])
//! - **Role**: Owns the dispatcher and every actor; builds supervision trees.
//! - **Key items**: [`ActorSystem`](lifecycle::ActorSystem),
//!   [`shutdown`](lifecycle::ActorSystem::shutdown).
//!
//! ### 4. Settings ([`config`])
//! Serde-decodable dispatcher and runtime configuration.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the supervision demo with info logs
//! RUST_LOG=info cargo run
//!
//! # Run the tests
//! cargo test
//! ```

pub mod config;
pub mod framework;
pub mod lifecycle;
pub mod supervision;

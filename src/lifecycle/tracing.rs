//! # Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging with the `tracing` crate.
//! Every runtime event carries the actor name as a structured field, so one actor's
//! history can be pulled out of an interleaved log with a plain filter.
//!
//! ## Configuration
//!
//! Log levels come from the `RUST_LOG` environment variable. The compact format hides the
//! module prefix (`with_target(false)`); the `actor` field identifies the source instead.
//!
//! ```bash
//! # Lifecycle and supervision decisions
//! RUST_LOG=info cargo run
//!
//! # Plus system messages, links and restart scheduling
//! RUST_LOG=debug cargo run
//!
//! # Plus timer firings, unhandled messages and worker exits
//! RUST_LOG=trace cargo run
//! ```
//!
//! ## What Gets Traced
//!
//! | Level   | Events                                                              |
//! |---------|---------------------------------------------------------------------|
//! | `info`  | dispatcher and system start/stop, actor start/stop, restarts        |
//! | `warn`  | handler failures, untrapped faults, exhausted restart budgets       |
//! | `debug` | system messages, links, restart scheduling, ask timeouts            |
//! | `trace` | unhandled messages, stale `ReceiveTimeout`s, timers, worker exits   |
//!
//! ## Supervision Trace Example
//!
//! **With `RUST_LOG=info`**, a trapped failure of a one-for-one child looks like:
//!
//! ```text
//!  WARN Actor failed actor="worker-1" error=Actor worker-1 handler failed: io: disk full
//!  INFO Restarting actor="worker-1" cause=Actor worker-1 handler failed: io: disk full
//! ```
//!
//! and a fourth failure inside a `(3, 5s)` window adds:
//!
//! ```text
//!  WARN Restart budget exhausted, escalating actor="root" child="worker-1" max_retries=3 within=5s
//!  WARN Actor failed actor="root" error=Actor worker-1 handler failed: io: disk full
//! ```

/// Installs the global `fmt` subscriber. Call once, from the binary.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // actor names are carried as fields
        .compact()
        .init();
}

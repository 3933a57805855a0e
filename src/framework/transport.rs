//! Remote delivery seam.
//!
//! A reference created with
//! [`ActorSystem::remote_actor_for`](crate::lifecycle::ActorSystem::remote_actor_for) has
//! no local mailbox: every envelope sent to it is handed to the configured
//! [`RemoteTransport`]. The wire protocol behind that trait is not this crate's business.

use crate::framework::error::ActorError;
use crate::framework::message::Envelope;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteAddress {
    pub host: String,
    pub port: u16,
}

impl RemoteAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Outbound path for remote references. Implementations must preserve the order of
/// envelopes handed to them for the same `(address, actor)` pair.
pub trait RemoteTransport: Send + Sync {
    fn deliver(
        &self,
        address: &RemoteAddress,
        actor: &str,
        envelope: Envelope,
    ) -> Result<(), ActorError>;
}

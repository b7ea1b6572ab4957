//! The agent identity registry: read-only lookups of agent profiles.

use crate::error::RegistryError;
use crate::id::{ActorAddress, AgentId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Registry-side status of an agent.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    /// Accepting calls.
    Active,
    /// Temporarily not accepting calls.
    Paused,
    /// Keys or operator known to be compromised.
    Compromised,
}

/// Routing and address metadata for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Public identifier.
    pub agent_id: AgentId,
    /// Owner of the registration.
    pub owner: String,
    /// Ledger address whose partition holds this agent's records.
    pub address: ActorAddress,
    /// Primary endpoint URL.
    pub url: String,
    /// Registry status.
    pub status: AgentStatus,
    /// Registration time, seconds since the epoch.
    pub created_at: u64,
    /// Last update time, seconds since the epoch.
    pub updated_at: u64,
}

/// Protocol-external agent directory.
///
/// Consumed read-only: the provenance protocol resolves callee identifiers
/// and ledger addresses through it and never writes.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Look up an agent by its public identifier.
    async fn resolve_by_identifier(
        &self,
        id: &AgentId,
    ) -> Result<Option<AgentProfile>, RegistryError>;

    /// Look up an agent by its endpoint URL.
    async fn resolve_by_url(&self, url: &str) -> Result<Option<AgentProfile>, RegistryError>;
}

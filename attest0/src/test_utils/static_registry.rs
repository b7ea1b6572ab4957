//! StaticRegistry — a fixed, in-memory agent directory.

use crate::error::RegistryError;
use crate::id::{ActorAddress, AgentId};
use crate::registry::{AgentProfile, AgentRegistry, AgentStatus};
use async_trait::async_trait;
use std::collections::HashMap;

/// Registry backed by a `HashMap` filled at construction time.
#[derive(Default)]
pub struct StaticRegistry {
    profiles: HashMap<AgentId, AgentProfile>,
}

impl StaticRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active agent.
    #[must_use]
    pub fn with_agent(
        mut self,
        agent_id: impl Into<AgentId>,
        address: impl Into<ActorAddress>,
        url: impl Into<String>,
    ) -> Self {
        let agent_id = agent_id.into();
        self.profiles.insert(
            agent_id.clone(),
            AgentProfile {
                agent_id,
                owner: "test".into(),
                address: address.into(),
                url: url.into(),
                status: AgentStatus::Active,
                created_at: 0,
                updated_at: 0,
            },
        );
        self
    }
}

#[async_trait]
impl AgentRegistry for StaticRegistry {
    async fn resolve_by_identifier(
        &self,
        id: &AgentId,
    ) -> Result<Option<AgentProfile>, RegistryError> {
        Ok(self.profiles.get(id).cloned())
    }

    async fn resolve_by_url(&self, url: &str) -> Result<Option<AgentProfile>, RegistryError> {
        Ok(self.profiles.values().find(|p| p.url == url).cloned())
    }
}

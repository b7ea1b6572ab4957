//! One agent's tracing session.

use crate::config::TraceConfig;
use crate::inbound::TracedHandler;
use crate::observe::{InteractionObserver, LedgerObserver};
use crate::outbound::{Callee, TracedClient};
use attest0::{AgentProfile, AgentRegistry, LedgerError, RequestHandler, Transport};
use attest_ledger::InteractionLedger;
use std::sync::Arc;

/// Shared state for every wrapper one agent creates: its ledger client,
/// the registry, and the observe port.
///
/// ```no_run
/// # async fn demo(
/// #     ledger: std::sync::Arc<attest_ledger::InteractionLedger>,
/// #     registry: std::sync::Arc<dyn attest0::AgentRegistry>,
/// #     transport: std::sync::Arc<dyn attest0::Transport>,
/// #     handler: std::sync::Arc<dyn attest0::RequestHandler>,
/// # ) -> Result<(), attest0::LedgerError> {
/// use attest_trace::{Callee, TraceConfig, Tracer};
///
/// let config = TraceConfig::from_lookup(|key| std::env::var(key).ok());
/// let tracer = Tracer::initialize(ledger, registry, config).await?;
/// let client = tracer.wrap_client(transport, Callee::Url("http://agent-2".into()));
/// let server = tracer.wrap_handler(handler);
/// # let _ = (client, server);
/// # Ok(())
/// # }
/// ```
pub struct Tracer {
    ledger: Arc<InteractionLedger>,
    registry: Arc<dyn AgentRegistry>,
    observer: Arc<dyn InteractionObserver>,
    config: TraceConfig,
    profile: Option<AgentProfile>,
}

impl Tracer {
    /// A session that assumes the agent is already enlisted.
    pub fn new(
        ledger: Arc<InteractionLedger>,
        registry: Arc<dyn AgentRegistry>,
        config: TraceConfig,
    ) -> Self {
        let observer = Arc::new(LedgerObserver::new(Arc::clone(&ledger), config.log_timeout));
        Self {
            ledger,
            registry,
            observer,
            config,
            profile: None,
        }
    }

    /// Enlist the agent (an existing enlistment is fine) and look up its
    /// own registry profile.
    ///
    /// Enlist failures are returned. A registry that cannot be reached, or
    /// does not know the agent, only produces a warning.
    pub async fn initialize(
        ledger: Arc<InteractionLedger>,
        registry: Arc<dyn AgentRegistry>,
        config: TraceConfig,
    ) -> Result<Self, LedgerError> {
        ledger.enlist().await?;
        let mut tracer = Self::new(ledger, registry, config);

        let agent_id = tracer.ledger.agent_id().clone();
        match tracer.registry.resolve_by_identifier(&agent_id).await {
            Ok(Some(profile)) => {
                let signer = tracer.ledger.actor();
                if let Some(actor) = signer.filter(|a| *a != profile.address) {
                    tracing::warn!(
                        %agent_id,
                        registered = %profile.address,
                        signer = %actor,
                        "registry address differs from ledger signer"
                    );
                }
                tracing::info!(%agent_id, url = %profile.url, "tracing session ready");
                tracer.profile = Some(profile);
            }
            Ok(None) => tracing::warn!(%agent_id, "agent not found in registry"),
            Err(e) => tracing::warn!(%agent_id, error = %e, "registry lookup failed"),
        }
        Ok(tracer)
    }

    /// Replace the observe port. Wrappers created afterwards use it.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn InteractionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The agent's registry profile, if [`initialize`](Self::initialize)
    /// found one.
    pub fn profile(&self) -> Option<&AgentProfile> {
        self.profile.as_ref()
    }

    /// The ledger client shared by every wrapper.
    pub fn ledger(&self) -> &Arc<InteractionLedger> {
        &self.ledger
    }

    /// Trace calls made through `transport` to `callee`.
    pub fn wrap_client(&self, transport: Arc<dyn Transport>, callee: Callee) -> TracedClient {
        TracedClient::new(
            transport,
            Arc::clone(&self.observer),
            Arc::clone(&self.registry),
            self.ledger.agent_id().clone(),
            callee,
            self.config.clone(),
        )
    }

    /// Trace requests handled by `handler`.
    pub fn wrap_handler(&self, handler: Arc<dyn RequestHandler>) -> TracedHandler {
        TracedHandler::new(
            handler,
            Arc::clone(&self.observer),
            self.ledger.agent_id().clone(),
            self.config.clone(),
        )
    }
}

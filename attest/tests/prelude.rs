//! The prelude is enough to build and inspect the protocol's data types.

use attest::prelude::*;

#[test]
fn prelude_exposes_protocol_types() {
    let envelope = TraceEnvelope {
        caller_id: AgentId::new("agent_1"),
        callee_id: AgentId::new("agent_2"),
        ..Default::default()
    };
    assert!(envelope.interaction_id.is_empty());
    assert_eq!(LedgerConfig::new("logic").logic_id(), &LogicId::new("logic"));
}

#[test]
fn trace_config_defaults() {
    assert_eq!(TraceConfig::default().timeout(), attest::attest_trace::DEFAULT_LOG_TIMEOUT);
}

#[cfg(feature = "ledger-memory")]
#[tokio::test]
async fn prelude_wires_a_memory_ledger() {
    use std::sync::Arc;

    let memory = MemoryLedger::new("logic");
    let conn = Arc::new(memory.connect("0xa1"));
    let ledger = InteractionLedger::connect(conn.clone(), conn, "agent_1", LedgerConfig::new("logic"))
        .await
        .unwrap();
    ledger.enlist().await.unwrap();
    assert!(ledger.is_enlisted().await);
}

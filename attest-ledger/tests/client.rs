//! Write-side behaviour of InteractionLedger against the in-memory ledger.

use attest0::{ActorAddress, InteractionId, LedgerError, STATUS_OK};
use attest_ledger::{InteractionLedger, LedgerConfig, LogRequest, LogResponse};
use attest_ledger_memory::{MemoryLedger, OutputEncoding};
use std::sync::Arc;

async fn client_for(ledger: &MemoryLedger, actor: &str, agent: &str) -> InteractionLedger {
    let conn = Arc::new(ledger.connect(actor));
    InteractionLedger::connect(conn.clone(), conn, agent, LedgerConfig::new("logic"))
        .await
        .unwrap()
}

fn outgoing(id: &str) -> LogRequest {
    LogRequest {
        interaction_id: InteractionId::new(id),
        counterparty: "agent_2".into(),
        is_sender: true,
        request_hash: "rq".into(),
        intent: "ping".into(),
        ..Default::default()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connect
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn connect_rejects_empty_or_unknown_logic() {
    let ledger = MemoryLedger::new("logic");
    let conn = Arc::new(ledger.connect("0xa1"));

    let empty = InteractionLedger::connect(conn.clone(), conn.clone(), "a", LedgerConfig::new("")).await;
    assert!(matches!(empty, Err(LedgerError::ContractLoad { .. })));

    let wrong = InteractionLedger::connect(conn.clone(), conn, "a", LedgerConfig::new("other")).await;
    match wrong {
        Err(LedgerError::ContractLoad { logic_id, .. }) => assert_eq!(logic_id, "other"),
        other => panic!("expected ContractLoad, got {other:?}"),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Enlist
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn enlist_is_idempotent() {
    let ledger = MemoryLedger::new("logic");
    let client = client_for(&ledger, "0xa1", "agent_1").await;
    client.enlist().await.unwrap();
    client.enlist().await.unwrap();
    assert!(client.is_enlisted().await);
    assert!(ledger.is_enlisted(&ActorAddress::new("0xa1")).await);
}

#[tokio::test]
async fn failed_enlist_makes_writes_fail_fast() {
    let ledger = MemoryLedger::new("logic");
    let client = client_for(&ledger, "0xa1", "agent_1").await;

    ledger.fail_writes("node unavailable").await;
    let err = client.enlist().await.unwrap_err();
    assert!(matches!(err, LedgerError::Transaction { .. }));
    ledger.clear_faults().await;

    let err = client.log_request(outgoing("")).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotEnlisted(_)));
    assert!(ledger.records(&ActorAddress::new("0xa1")).await.is_empty());

    client.enlist().await.unwrap();
    assert!(client.log_request(outgoing("")).await.is_ok());
}

#[tokio::test]
async fn writing_without_enlisting_is_not_enlisted() {
    let ledger = MemoryLedger::new("logic");
    let client = client_for(&ledger, "0xa1", "agent_1").await;
    let err = client.log_request(outgoing("")).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotEnlisted(_)));
}

#[tokio::test]
async fn writes_need_a_signer() {
    let ledger = MemoryLedger::new("logic");
    let reader = Arc::new(ledger.read_only());
    let client = InteractionLedger::connect(reader.clone(), reader, "agent_1", LedgerConfig::new("logic"))
        .await
        .unwrap();
    assert!(client.actor().is_none());
    let err = client.log_request(outgoing("")).await.unwrap_err();
    assert!(matches!(err, LedgerError::SignerRequired(_)));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Id lifecycle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn empty_id_mints_distinct_ids() {
    let ledger = MemoryLedger::new("logic");
    let client = client_for(&ledger, "0xa1", "agent_1").await;
    client.enlist().await.unwrap();

    let a = client.log_request(outgoing("")).await.unwrap();
    let b = client.log_request(outgoing("")).await.unwrap();
    assert!(!a.is_empty());
    assert_ne!(a, b);
}

#[tokio::test]
async fn given_id_is_echoed() {
    let ledger = MemoryLedger::new("logic");
    let client = client_for(&ledger, "0xa1", "agent_1").await;
    client.enlist().await.unwrap();

    let id = client.log_request(outgoing("ix_from_caller")).await.unwrap();
    assert_eq!(id, InteractionId::new("ix_from_caller"));
}

#[tokio::test]
async fn minted_id_survives_every_output_encoding() {
    for encoding in [
        OutputEncoding::Structured,
        OutputEncoding::JsonBytes,
        OutputEncoding::Opaque,
    ] {
        let ledger = MemoryLedger::new("logic");
        let client = client_for(&ledger, "0xa1", "agent_1").await;
        client.enlist().await.unwrap();
        ledger.set_encoding(encoding).await;

        let id = client.log_request(outgoing("")).await.unwrap();
        let records = ledger.records(&ActorAddress::new("0xa1")).await;
        assert_eq!(records[0].interaction_id, id, "{encoding:?}");
    }
}

#[tokio::test]
async fn intent_is_defaulted_and_clamped() {
    let ledger = MemoryLedger::new("logic");
    let client = client_for(&ledger, "0xa1", "agent_1").await;
    client.enlist().await.unwrap();

    let mut req = outgoing("ix_a");
    req.intent = String::new();
    client.log_request(req).await.unwrap();
    let mut req = outgoing("ix_b");
    req.intent = "x".repeat(80);
    client.log_request(req).await.unwrap();

    let records = ledger.records(&ActorAddress::new("0xa1")).await;
    assert_eq!(records[0].intent, "agent_interaction");
    assert_eq!(records[1].intent.len(), 50);
    assert!(records[0].timestamp > 0);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Responses
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn log_response_for_unlogged_id_is_interaction_not_found() {
    let ledger = MemoryLedger::new("logic");
    let client = client_for(&ledger, "0xa1", "agent_1").await;
    client.enlist().await.unwrap();

    let err = client
        .log_response(LogResponse {
            interaction_id: InteractionId::new("ix_never"),
            counterparty: "agent_2".into(),
            response_hash: "rs".into(),
            status_code: STATUS_OK,
            ..Default::default()
        })
        .await
        .unwrap_err();
    match err {
        LedgerError::InteractionNotFound(id) => assert_eq!(id, "ix_never"),
        other => panic!("expected InteractionNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn request_then_response_completes_record() {
    let ledger = MemoryLedger::new("logic");
    let client = client_for(&ledger, "0xa1", "agent_1").await;
    client.enlist().await.unwrap();

    let id = client.log_request(outgoing("")).await.unwrap();
    client
        .log_response(LogResponse {
            interaction_id: id.clone(),
            counterparty: "agent_2".into(),
            is_sender: false,
            response_hash: "rs".into(),
            status_code: STATUS_OK,
            timestamp: 0,
        })
        .await
        .unwrap();

    let actor = ActorAddress::new("0xa1");
    let record = client.get_interaction(&actor, &id).await.unwrap().unwrap();
    assert_eq!(record.status_code, STATUS_OK);
    assert_eq!(record.response_hash, "rs");

    let stats = client.get_stats(&actor).await.unwrap().unwrap();
    assert_eq!(stats.requests_sent, 1);
    assert_eq!(stats.success_count, 1);
    assert_eq!(stats.unique_counterparties, 1);
}

#[tokio::test]
async fn write_failure_is_a_transaction_error() {
    let ledger = MemoryLedger::new("logic");
    let client = client_for(&ledger, "0xa1", "agent_1").await;
    client.enlist().await.unwrap();
    ledger.fail_writes("fuel exhausted").await;

    let err = client.log_request(outgoing("")).await.unwrap_err();
    match err {
        LedgerError::Transaction { source, .. } => {
            assert_eq!(source.map(|e| e.message).as_deref(), Some("fuel exhausted"));
        }
        other => panic!("expected Transaction, got {other:?}"),
    }
}

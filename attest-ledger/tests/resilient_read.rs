//! Indexed reads and raw partition traversal must agree.

use async_trait::async_trait;
use attest0::{
    ActorAddress, Correlation, InteractionId, Invocation, LedgerError, LogicId, PartitionReader,
    RawOutput, RoutineCall, RoutineInvoker, RpcError, StatePath,
};
use attest_ledger::{InteractionLedger, LedgerConfig, LogRequest, LogResponse};
use attest_ledger_memory::{IndexState, MemoryLedger, OutputEncoding};
use serde_json::{Value, json};
use std::sync::Arc;

async fn seeded(count: usize) -> (MemoryLedger, InteractionLedger, Vec<InteractionId>) {
    let ledger = MemoryLedger::new("logic");
    let conn = Arc::new(ledger.connect("0xa1"));
    let client = InteractionLedger::connect(conn.clone(), conn, "agent_1", LedgerConfig::new("logic"))
        .await
        .unwrap();
    client.enlist().await.unwrap();

    let mut ids = Vec::new();
    for i in 0..count {
        let id = client
            .log_request(LogRequest {
                counterparty: format!("agent_{}", i % 2 + 2).into(),
                is_sender: i % 2 == 0,
                request_hash: format!("rq{i}"),
                intent: "ping".into(),
                timestamp: 1_700_000_000 + i as u64,
                correlation: Correlation {
                    context_id: format!("ctx{i}"),
                    end_user_id: "user_7".into(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();
        if i % 3 == 0 {
            client
                .log_response(LogResponse {
                    interaction_id: id.clone(),
                    counterparty: format!("agent_{}", i % 2 + 2).into(),
                    is_sender: i % 2 != 0,
                    response_hash: format!("rs{i}"),
                    status_code: 200,
                    timestamp: 1_700_000_100,
                })
                .await
                .unwrap();
        }
        ids.push(id);
    }
    (ledger, client, ids)
}

fn me() -> ActorAddress {
    ActorAddress::new("0xa1")
}

#[tokio::test]
async fn missing_index_falls_back_to_identical_record() {
    let (ledger, client, ids) = seeded(4).await;

    let mut indexed = Vec::new();
    for id in &ids {
        indexed.push(client.get_interaction(&me(), id).await.unwrap().unwrap());
    }

    ledger.set_index(IndexState::Missing).await;
    for (id, expected) in ids.iter().zip(&indexed) {
        let raw = client.get_interaction(&me(), id).await.unwrap().unwrap();
        assert_eq!(&raw, expected);
    }
}

#[tokio::test]
async fn stale_index_falls_back_only_for_ids_this_client_logged() {
    let (ledger, client, ids) = seeded(2).await;
    ledger.set_index(IndexState::Stale).await;

    let found = client.get_interaction(&me(), &ids[1]).await.unwrap();
    assert_eq!(found.map(|r| r.interaction_id), Some(ids[1].clone()));

    // A second client over the same partition never logged these ids.
    let conn = Arc::new(ledger.read_only());
    let auditor = InteractionLedger::connect(conn.clone(), conn, "auditor", LedgerConfig::new("logic"))
        .await
        .unwrap();
    assert_eq!(auditor.get_interaction(&me(), &ids[1]).await.unwrap(), None);
}

#[tokio::test]
async fn stale_fallback_forgets_ids_beyond_capacity() {
    let ledger = MemoryLedger::new("logic");
    let conn = Arc::new(ledger.connect("0xa1"));
    let config = LedgerConfig::new("logic").known_ids(2);
    let client = InteractionLedger::connect(conn.clone(), conn, "agent_1", config)
        .await
        .unwrap();
    client.enlist().await.unwrap();

    let mut ids = Vec::new();
    for i in 0..3 {
        let id = client
            .log_request(LogRequest {
                counterparty: "agent_2".into(),
                is_sender: true,
                request_hash: format!("rq{i}"),
                ..Default::default()
            })
            .await
            .unwrap();
        ids.push(id);
    }
    ledger.set_index(IndexState::Stale).await;

    assert_eq!(client.get_interaction(&me(), &ids[0]).await.unwrap(), None);
    for id in &ids[1..] {
        let found = client.get_interaction(&me(), id).await.unwrap();
        assert_eq!(found.map(|r| r.interaction_id), Some(id.clone()));
    }
}

#[tokio::test]
async fn bare_hex_actor_reads_the_prefixed_partition() {
    let hex = "ab".repeat(32);
    let ledger = MemoryLedger::new("logic");
    let conn = Arc::new(ledger.connect(format!("0x{hex}")));
    let client = InteractionLedger::connect(conn.clone(), conn, "agent_1", LedgerConfig::new("logic"))
        .await
        .unwrap();
    client.enlist().await.unwrap();
    let id = client
        .log_request(LogRequest {
            counterparty: "agent_2".into(),
            is_sender: true,
            request_hash: "rq".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let bare = ActorAddress::new(format!(" {hex} "));
    let found = client.get_interaction(&bare, &id).await.unwrap();
    assert_eq!(found.map(|r| r.interaction_id), Some(id));
    assert_eq!(client.list_interactions(&bare, 10, 0).await.unwrap().total, 1);
    assert_eq!(client.get_stats(&bare).await.unwrap().map(|s| s.requests_sent), Some(1));

    ledger.set_index(IndexState::Missing).await;
    assert_eq!(client.list_interactions(&bare, 10, 0).await.unwrap().total, 1);
}

#[tokio::test]
async fn unknown_id_is_none_without_fallback() {
    let (_ledger, client, _) = seeded(2).await;
    let missing = client
        .get_interaction(&me(), &InteractionId::new("ix_nope"))
        .await
        .unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn list_pages_agree_across_paths() {
    let (ledger, client, ids) = seeded(7).await;

    let indexed = client.list_interactions(&me(), 3, 2).await.unwrap();
    assert_eq!(indexed.total, 7);
    let got: Vec<_> = indexed.records.iter().map(|r| r.interaction_id.clone()).collect();
    assert_eq!(got, vec![ids[4].clone(), ids[3].clone(), ids[2].clone()]);

    ledger.set_index(IndexState::Missing).await;
    let raw = client.list_interactions(&me(), 3, 2).await.unwrap();
    assert_eq!(raw, indexed);

    let past_end = client.list_interactions(&me(), 5, 10).await.unwrap();
    assert!(past_end.records.is_empty());
    assert_eq!(past_end.total, 7);

    let recent = client.recent(&me(), 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].interaction_id, ids[6]);
}

#[tokio::test]
async fn stats_agree_across_paths() {
    let (ledger, client, _) = seeded(5).await;
    let indexed = client.get_stats(&me()).await.unwrap().unwrap();
    assert_eq!(indexed.requests_sent, 3);
    assert_eq!(indexed.requests_received, 2);
    assert_eq!(indexed.unique_counterparties, 2);

    ledger.set_index(IndexState::Missing).await;
    let raw = client.get_stats(&me()).await.unwrap().unwrap();
    assert_eq!(raw, indexed);
}

#[tokio::test]
async fn never_written_partition_is_definitely_absent() {
    let (ledger, client, ids) = seeded(1).await;
    ledger.set_index(IndexState::Missing).await;
    let nobody = ActorAddress::new("0xnobody");

    assert_eq!(client.get_interaction(&nobody, &ids[0]).await.unwrap(), None);
    let page = client.list_interactions(&nobody, 10, 0).await.unwrap();
    assert!(page.records.is_empty());
    assert_eq!(page.total, 0);
    assert_eq!(client.get_stats(&nobody).await.unwrap(), None);
}

#[tokio::test]
async fn other_read_failures_are_query_errors() {
    let (ledger, client, ids) = seeded(1).await;
    ledger.fail_reads("connection reset").await;

    let err = client.get_interaction(&me(), &ids[0]).await.unwrap_err();
    assert!(matches!(err, LedgerError::Query { .. }));
    assert!(matches!(
        client.get_stats(&me()).await.unwrap_err(),
        LedgerError::Query { .. }
    ));
}

#[tokio::test]
async fn undecodable_read_output_is_a_query_error() {
    let (ledger, client, ids) = seeded(1).await;
    ledger.set_encoding(OutputEncoding::Opaque).await;
    let err = client.get_interaction(&me(), &ids[0]).await.unwrap_err();
    assert!(matches!(err, LedgerError::Query { .. }));

    ledger.set_encoding(OutputEncoding::JsonBytes).await;
    assert!(client.get_interaction(&me(), &ids[0]).await.unwrap().is_some());
}

/// A node that answers every read routine with the same output.
struct FixedAnswer(RawOutput);

#[async_trait]
impl RoutineInvoker for FixedAnswer {
    async fn load(&self, _logic_id: &LogicId) -> Result<(), RpcError> {
        Ok(())
    }

    fn signer(&self) -> Option<ActorAddress> {
        Some(me())
    }

    async fn invoke(&self, _call: RoutineCall) -> Result<Invocation, RpcError> {
        Ok(Invocation::Output(self.0.clone()))
    }
}

#[async_trait]
impl PartitionReader for FixedAnswer {
    async fn read_field(&self, _actor: &ActorAddress, _path: &StatePath) -> Result<Value, RpcError> {
        Err(RpcError::new("partition reads disabled"))
    }
}

async fn answering(output: RawOutput) -> InteractionLedger {
    let node = Arc::new(FixedAnswer(output));
    InteractionLedger::connect(node.clone(), node, "agent_1", LedgerConfig::new("logic"))
        .await
        .unwrap()
}

#[tokio::test]
async fn opaque_answer_with_an_id_inside_is_a_query_error() {
    let mut bytes = vec![0x0e, 0x01];
    bytes.extend_from_slice(b"ix_00ab");
    bytes.extend_from_slice(&[0x02, 0x00, 0xc8]);
    let client = answering(RawOutput::Bytes(bytes)).await;
    let id = InteractionId::new("ix_00ab");

    assert!(matches!(
        client.get_interaction(&me(), &id).await,
        Err(LedgerError::Query { .. })
    ));
    assert!(matches!(
        client.list_interactions(&me(), 10, 0).await,
        Err(LedgerError::Query { .. })
    ));
    assert!(matches!(
        client.get_stats(&me()).await,
        Err(LedgerError::Query { .. })
    ));
}

#[tokio::test]
async fn answer_without_expected_keys_is_a_query_error() {
    let client = answering(RawOutput::Structured(json!({ "interaction_id": "ix_1" }))).await;

    assert!(matches!(
        client.get_interaction(&me(), &InteractionId::new("ix_1")).await,
        Err(LedgerError::Query { .. })
    ));
    assert!(matches!(
        client.list_interactions(&me(), 10, 0).await,
        Err(LedgerError::Query { .. })
    ));
    assert!(matches!(
        client.get_stats(&me()).await,
        Err(LedgerError::Query { .. })
    ));
}

#[tokio::test]
async fn explicit_not_found_is_still_absent() {
    let client = answering(RawOutput::Structured(json!({ "found": false }))).await;

    assert_eq!(
        client.get_interaction(&me(), &InteractionId::new("ix_1")).await.unwrap(),
        None
    );
    assert_eq!(client.get_stats(&me()).await.unwrap(), None);
}

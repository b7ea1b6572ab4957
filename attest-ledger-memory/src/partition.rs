//! One actor's slice of ledger state.

use attest0::logic::{field, stat};
use attest0::record::{AgentInteractionStats, Correlation, InteractionRecord, STATUS_PENDING};
use attest0::{AgentId, InteractionId};
use serde_json::{Map, Value, json};
use std::collections::HashSet;

/// Arguments of a `LogRequest` call, already parsed.
pub(crate) struct RequestEntry {
    pub interaction_id: String,
    pub counterparty: String,
    pub is_sender: bool,
    pub request_hash: String,
    pub intent: String,
    pub timestamp: u64,
    pub correlation: Correlation,
}

/// Arguments of a `LogResponse` call, already parsed.
pub(crate) struct ResponseEntry {
    pub interaction_id: String,
    pub is_sender: bool,
    pub response_hash: String,
    pub status_code: u16,
    pub timestamp: u64,
}

pub(crate) struct Partition {
    agent_id: String,
    records: Vec<InteractionRecord>,
    stats: AgentInteractionStats,
    counterparties: HashSet<String>,
}

impl Partition {
    pub fn new(agent_id: String) -> Self {
        Self {
            agent_id,
            records: Vec::new(),
            stats: AgentInteractionStats::default(),
            counterparties: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn contains(&self, interaction_id: &str) -> bool {
        self.find(interaction_id).is_some()
    }

    pub fn find(&self, interaction_id: &str) -> Option<&InteractionRecord> {
        self.records
            .iter()
            .find(|r| r.interaction_id.as_str() == interaction_id)
    }

    pub fn get(&self, index: usize) -> Option<&InteractionRecord> {
        self.records.get(index)
    }

    /// Most recent first.
    pub fn page(&self, limit: usize, offset: usize) -> Vec<&InteractionRecord> {
        self.records.iter().rev().skip(offset).take(limit).collect()
    }

    pub fn stats(&self) -> &AgentInteractionStats {
        &self.stats
    }

    pub fn log_request(&mut self, entry: RequestEntry) {
        let me = AgentId::new(self.agent_id.clone());
        let other = AgentId::new(entry.counterparty.clone());
        let (caller_id, callee_id) = if entry.is_sender {
            self.stats.requests_sent += 1;
            (me, other)
        } else {
            self.stats.requests_received += 1;
            (other, me)
        };
        self.touch(&entry.counterparty, entry.timestamp);

        self.records.push(InteractionRecord {
            interaction_id: InteractionId::new(entry.interaction_id),
            caller_id,
            callee_id,
            request_hash: entry.request_hash,
            response_hash: String::new(),
            intent: entry.intent,
            status_code: STATUS_PENDING,
            timestamp: entry.timestamp,
            correlation: entry.correlation,
        });
    }

    pub fn log_response(&mut self, entry: ResponseEntry) -> Result<(), String> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.interaction_id.as_str() == entry.interaction_id)
            .ok_or_else(|| format!("Interaction not found: {}", entry.interaction_id))?;
        if !record.is_pending() {
            return Err(format!(
                "interaction already completed: {}",
                entry.interaction_id
            ));
        }
        record.response_hash = entry.response_hash;
        record.status_code = entry.status_code;
        let success = record.is_success();

        if entry.is_sender {
            self.stats.responses_sent += 1;
        }
        if success {
            self.stats.success_count += 1;
        }
        self.stats.last_interaction_at = self.stats.last_interaction_at.max(entry.timestamp);
        Ok(())
    }

    fn touch(&mut self, counterparty: &str, timestamp: u64) {
        if self.counterparties.insert(counterparty.to_owned()) {
            self.stats.unique_counterparties = self.counterparties.len() as u64;
        }
        self.stats.last_interaction_at = self.stats.last_interaction_at.max(timestamp);
    }

    /// Scalar value by storage name.
    pub fn scalar(&self, name: &str) -> Option<Value> {
        let value = match name {
            attest0::logic::AGENT_ID => json!(self.agent_id),
            stat::REQUESTS_SENT => json!(self.stats.requests_sent),
            stat::REQUESTS_RECEIVED => json!(self.stats.requests_received),
            stat::RESPONSES_SENT => json!(self.stats.responses_sent),
            stat::SUCCESS_COUNT => json!(self.stats.success_count),
            stat::UNIQUE_COUNTERPARTIES => json!(self.stats.unique_counterparties),
            stat::LAST_INTERACTION_AT => json!(self.stats.last_interaction_at),
            _ => return None,
        };
        Some(value)
    }
}

/// A record as the logic stores it: one flat object.
pub(crate) fn flatten(record: &InteractionRecord) -> Map<String, Value> {
    let c = &record.correlation;
    let pairs = [
        (field::INTERACTION_ID, json!(record.interaction_id)),
        (field::CALLER_ID, json!(record.caller_id)),
        (field::CALLEE_ID, json!(record.callee_id)),
        (field::REQUEST_HASH, json!(record.request_hash)),
        (field::RESPONSE_HASH, json!(record.response_hash)),
        (field::INTENT, json!(record.intent)),
        (field::STATUS_CODE, json!(record.status_code)),
        (field::TIMESTAMP, json!(record.timestamp)),
        (field::CONTEXT_ID, json!(c.context_id)),
        (field::TASK_ID, json!(c.task_id)),
        (field::MESSAGE_ID, json!(c.message_id)),
        (field::END_USER_ID, json!(c.end_user_id)),
        (field::END_USER_SESSION_ID, json!(c.end_user_session_id)),
    ];
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect()
}

pub(crate) fn stats_value(stats: &AgentInteractionStats) -> Value {
    json!({
        "requests_sent": stats.requests_sent,
        "requests_received": stats.requests_received,
        "responses_sent": stats.responses_sent,
        "success_count": stats.success_count,
        "unique_counterparties": stats.unique_counterparties,
        "last_interaction_at": stats.last_interaction_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str, counterparty: &str, is_sender: bool, ts: u64) -> RequestEntry {
        RequestEntry {
            interaction_id: id.into(),
            counterparty: counterparty.into(),
            is_sender,
            request_hash: "rq".into(),
            intent: "ping".into(),
            timestamp: ts,
            correlation: Correlation::default(),
        }
    }

    #[test]
    fn sender_flag_decides_roles_and_counters() {
        let mut p = Partition::new("agent_1".into());
        p.log_request(request("ix_1", "agent_2", true, 10));
        p.log_request(request("ix_2", "agent_3", false, 11));

        let out = p.find("ix_1").unwrap();
        assert_eq!(out.caller_id.as_str(), "agent_1");
        assert_eq!(out.callee_id.as_str(), "agent_2");
        let inc = p.find("ix_2").unwrap();
        assert_eq!(inc.caller_id.as_str(), "agent_3");
        assert_eq!(inc.callee_id.as_str(), "agent_1");

        assert_eq!(p.stats().requests_sent, 1);
        assert_eq!(p.stats().requests_received, 1);
        assert_eq!(p.stats().unique_counterparties, 2);
        assert_eq!(p.stats().last_interaction_at, 11);
    }

    #[test]
    fn response_completes_once() {
        let mut p = Partition::new("agent_2".into());
        p.log_request(request("ix_1", "agent_1", false, 10));
        let done = |sender| ResponseEntry {
            interaction_id: "ix_1".into(),
            is_sender: sender,
            response_hash: "rs".into(),
            status_code: 200,
            timestamp: 12,
        };
        p.log_response(done(true)).unwrap();
        assert!(p.log_response(done(true)).is_err());

        let r = p.find("ix_1").unwrap();
        assert_eq!(r.status_code, 200);
        assert_eq!(p.stats().responses_sent, 1);
        assert_eq!(p.stats().success_count, 1);
    }

    #[test]
    fn unknown_response_is_rejected() {
        let mut p = Partition::new("agent_2".into());
        let err = p
            .log_response(ResponseEntry {
                interaction_id: "ix_9".into(),
                is_sender: true,
                response_hash: "rs".into(),
                status_code: 200,
                timestamp: 1,
            })
            .unwrap_err();
        assert!(err.contains("Interaction not found"));
    }

    #[test]
    fn page_is_most_recent_first() {
        let mut p = Partition::new("a".into());
        for i in 0..5 {
            p.log_request(request(&format!("ix_{i}"), "b", true, i));
        }
        let ids: Vec<_> = p.page(2, 1).iter().map(|r| r.interaction_id.0.clone()).collect();
        assert_eq!(ids, vec!["ix_3", "ix_2"]);
    }
}

//! Canonical encoding, event hash chaining, and the append-only event store.
//!
//! The hash chain is SHA-256 over a canonical JSON encoding, not the
//! non-cryptographic rolling hash used for internal stream fingerprinting
//! elsewhere in this lineage — this chain must be independently verifiable
//! by any external holder of the exported log, on any platform.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Sentinel previous-hash for the first event in a run.
pub const GENESIS: &str = "GENESIS";

/// The closed set of event types the kernel emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    RunCreated,
    RunStarted,
    RunStopped,
    AgentCreated,
    OrderPlaced,
    TradeExecuted,
    BalanceUpdated,
    OrderRejected,
    OrderCancelled,
    RateLimitHit,
    DecayApplied,
    AgentBankrupt,
    TickStart,
    TickEnd,
}

impl EventType {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            EventType::RunCreated => "RUN_CREATED",
            EventType::RunStarted => "RUN_STARTED",
            EventType::RunStopped => "RUN_STOPPED",
            EventType::AgentCreated => "AGENT_CREATED",
            EventType::OrderPlaced => "ORDER_PLACED",
            EventType::TradeExecuted => "TRADE_EXECUTED",
            EventType::BalanceUpdated => "BALANCE_UPDATED",
            EventType::OrderRejected => "ORDER_REJECTED",
            EventType::OrderCancelled => "ORDER_CANCELLED",
            EventType::RateLimitHit => "RATE_LIMIT_HIT",
            EventType::DecayApplied => "DECAY_APPLIED",
            EventType::AgentBankrupt => "AGENT_BANKRUPT",
            EventType::TickStart => "TICK_START",
            EventType::TickEnd => "TICK_END",
        }
    }
}

/// A single appended, hash-chained event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub run_id: String,
    pub tick_id: u64,
    pub event_seq: u64,
    pub event_type: EventType,
    pub agent_id: Option<String>,
    pub payload: Value,
    pub prev_hash: String,
    pub event_hash: String,
    /// Informational only; excluded from the hash input.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Encode a JSON value canonically: `serde_json::Value`'s object map is
/// `BTreeMap`-backed (the `preserve_order` feature is not enabled anywhere in
/// this crate), so keys are already sorted; compact serialization then gives
/// a whitespace-free, deterministic byte string.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).expect("canonical JSON values are always serializable")
}

/// Compute the hash-chained `event_hash` for the given fields. `created_at`
/// is deliberately absent from this input.
pub fn compute_event_hash(
    run_id: &str,
    tick_id: u64,
    event_seq: u64,
    event_type: EventType,
    agent_id: Option<&str>,
    payload: &Value,
    prev_hash: &str,
) -> String {
    let hashable = json!({
        "run_id": run_id,
        "tick_id": tick_id,
        "event_seq": event_seq,
        "event_type": event_type.as_wire_str(),
        "agent_id": agent_id,
        "payload": payload,
        "prev_hash": prev_hash,
    });
    let bytes = canonical_bytes(&hashable);
    let digest = Sha256::digest(&bytes);
    hex::encode(digest)
}

/// Append-only, hash-chained log of every event emitted by a run.
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
    next_event_seq: u64,
    last_hash: String,
}

impl EventStore {
    pub fn new() -> Self {
        EventStore {
            events: Vec::new(),
            next_event_seq: 0,
            last_hash: GENESIS.to_string(),
        }
    }

    /// Append a new event, assigning its sequence number and chaining hash.
    pub fn append(
        &mut self,
        run_id: &str,
        tick_id: u64,
        event_type: EventType,
        agent_id: Option<String>,
        payload: Value,
    ) -> &Event {
        let event_seq = self.next_event_seq;
        self.next_event_seq += 1;
        let prev_hash = self.last_hash.clone();
        let event_hash = compute_event_hash(
            run_id,
            tick_id,
            event_seq,
            event_type,
            agent_id.as_deref(),
            &payload,
            &prev_hash,
        );
        self.last_hash = event_hash.clone();
        let event = Event {
            id: event_seq,
            run_id: run_id.to_string(),
            tick_id,
            event_seq,
            event_type,
            agent_id,
            payload,
            prev_hash,
            event_hash,
            created_at: chrono::Utc::now(),
        };
        self.events.push(event);
        self.events.last().expect("just pushed")
    }

    pub fn all(&self) -> &[Event] {
        &self.events
    }

    pub fn by_type(&self, event_type: EventType) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(move |e| e.event_type == event_type)
    }

    pub fn by_agent<'a>(&'a self, agent_id: &'a str) -> impl Iterator<Item = &'a Event> {
        self.events
            .iter()
            .filter(move |e| e.agent_id.as_deref() == Some(agent_id))
    }

    pub fn by_tick(&self, tick_id: u64) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.tick_id == tick_id)
    }

    pub fn last_hash(&self) -> &str {
        &self.last_hash
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Recompute every hash from [`GENESIS`] and compare against the stored
    /// value. The stored `event_hash` is never trusted, only ever checked.
    pub fn verify_chain(&self) -> ChainVerification {
        let mut prev = GENESIS.to_string();
        for (idx, event) in self.events.iter().enumerate() {
            if event.prev_hash != prev {
                return ChainVerification::Invalid { at_index: idx };
            }
            let recomputed = compute_event_hash(
                &event.run_id,
                event.tick_id,
                event.event_seq,
                event.event_type,
                event.agent_id.as_deref(),
                &event.payload,
                &event.prev_hash,
            );
            if recomputed != event.event_hash {
                return ChainVerification::Invalid { at_index: idx };
            }
            prev = recomputed;
        }
        ChainVerification::Valid
    }

    /// Export every event as one canonical JSON object per line (NDJSON).
    pub fn export_ndjson(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            let value = serde_json::to_value(event).expect("Event always serializes");
            out.push_str(&String::from_utf8(canonical_bytes(&value)).expect("valid utf8"));
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainVerification {
    Valid,
    Invalid { at_index: usize },
}

impl ChainVerification {
    pub fn is_valid(self) -> bool {
        matches!(self, ChainVerification::Valid)
    }
}

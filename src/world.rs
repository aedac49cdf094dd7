//! World state: agents, orders, trades, and the counters that drive the
//! deterministic id generator. Owned exclusively by [`crate::kernel::Kernel`];
//! nothing outside the kernel mutates it directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::amount::Amount;

pub type AgentId = String;
pub type OrderId = u64;
pub type TradeId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Active,
    Bankrupt,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub api_key_fingerprint: String,
    pub cash: Amount,
    pub asset: Amount,
    pub status: AgentStatus,
    pub actions_this_tick: u32,
    pub bankrupt_at_tick: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub agent_id: AgentId,
    pub side: Side,
    pub price: Amount,
    pub quantity: Amount,
    pub filled_quantity: Amount,
    pub status: OrderStatus,
    pub tick_created: u64,
    /// Globally monotonic across all orders of the run; the sole determinant
    /// of intra-price-level priority.
    pub sequence: u64,
}

impl Order {
    pub fn remaining(&self) -> Amount {
        self.quantity - self.filled_quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub tick: u64,
    pub price: Amount,
    pub quantity: Amount,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buyer_agent_id: AgentId,
    pub seller_agent_id: AgentId,
    pub total_fee: Amount,
    pub aggressor_side: Side,
}

/// A top-of-book aggregated price level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Amount,
    pub quantity: Amount,
}

/// Deterministic id generator: `SHA256("{seed}-{counter}")` reshaped into a
/// UUID-v4-looking string. Its output depends strictly on the sequence of
/// calls, which in turn is determined entirely by the ordered action log.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: u32,
    counter: u64,
}

impl IdGenerator {
    pub fn new(seed: u32) -> Self {
        IdGenerator { seed, counter: 0 }
    }

    pub fn next_id(&mut self) -> String {
        let input = format!("{}-{}", self.seed, self.counter);
        self.counter += 1;
        let digest = Sha256::digest(input.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[0..16]);
        bytes[6] = (bytes[6] & 0x0F) | 0x40; // version 4
        bytes[8] = (bytes[8] & 0x3F) | 0x80; // variant 10xx
        format!(
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            bytes[0], bytes[1], bytes[2], bytes[3],
            bytes[4], bytes[5],
            bytes[6], bytes[7],
            bytes[8], bytes[9],
            bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
        )
    }
}

/// Agents, orders, trades, and the counters that derive from them.
#[derive(Debug)]
pub struct World {
    pub agents: HashMap<AgentId, Agent>,
    pub agents_by_fingerprint: HashMap<String, AgentId>,
    /// Agent ids in creation order, since `agents` (a `HashMap`) cannot
    /// recover it. Consulted wherever the spec requires "insertion order"
    /// (e.g. the decay sweep) rather than id or price ordering.
    pub agent_order: Vec<AgentId>,
    pub orders: HashMap<OrderId, Order>,
    pub trades: Vec<Trade>,
    pub current_tick: u64,
    pub next_order_sequence: u64,
    pub next_order_id: OrderId,
    pub next_trade_id: TradeId,
    pub total_volume: Amount,
    pub total_fees: Amount,
    pub id_gen: IdGenerator,
}

impl World {
    pub fn new(seed: u32) -> Self {
        World {
            agents: HashMap::new(),
            agents_by_fingerprint: HashMap::new(),
            agent_order: Vec::new(),
            orders: HashMap::new(),
            trades: Vec::new(),
            current_tick: 0,
            next_order_sequence: 0,
            next_order_id: 0,
            next_trade_id: 0,
            total_volume: Amount::ZERO,
            total_fees: Amount::ZERO,
            id_gen: IdGenerator::new(seed),
        }
    }

    pub fn next_order_id(&mut self) -> OrderId {
        let id = self.next_order_id;
        self.next_order_id += 1;
        id
    }

    pub fn next_trade_id(&mut self) -> TradeId {
        let id = self.next_trade_id;
        self.next_trade_id += 1;
        id
    }

    pub fn next_order_sequence(&mut self) -> u64 {
        let seq = self.next_order_sequence;
        self.next_order_sequence += 1;
        seq
    }

    pub fn agent(&self, agent_id: &str) -> Option<&Agent> {
        self.agents.get(agent_id)
    }

    pub fn agent_by_fingerprint(&self, fingerprint: &str) -> Option<&Agent> {
        self.agents_by_fingerprint
            .get(fingerprint)
            .and_then(|id| self.agents.get(id))
    }

    pub fn open_orders_of(&self, agent_id: &str) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self
            .orders
            .values()
            .filter(|o| o.agent_id == agent_id && o.status == OrderStatus::Open)
            .collect();
        orders.sort_by_key(|o| o.sequence);
        orders
    }

    pub fn recent_trades(&self, limit: usize) -> &[Trade] {
        let start = self.trades.len().saturating_sub(limit);
        &self.trades[start..]
    }

    pub fn active_agent_count(&self) -> usize {
        self.agents
            .values()
            .filter(|a| a.status == AgentStatus::Active)
            .count()
    }

    pub fn bankrupt_agent_count(&self) -> usize {
        self.agents
            .values()
            .filter(|a| a.status == AgentStatus::Bankrupt)
            .count()
    }
}

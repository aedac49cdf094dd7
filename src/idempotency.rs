//! Idempotency cache for `submit_actions` retries.
//!
//! Keyed per-agent (so two agents may reuse the same caller-supplied key
//! without colliding), bounded by a 100-tick flush — a pragmatic bound, not a
//! correctness requirement; the contract it must uphold is that a replayed
//! key returns the exact result object observed the first time, with zero
//! new side effects.

use std::collections::HashMap;

use crate::kernel::SubmitResult;

const FLUSH_INTERVAL_TICKS: u64 = 100;

#[derive(Debug, Default)]
pub struct IdempotencyCache {
    entries: HashMap<(String, String), SubmitResult>,
    last_flush_tick: u64,
}

impl IdempotencyCache {
    pub fn new() -> Self {
        IdempotencyCache::default()
    }

    pub fn get(&self, agent_id: &str, key: &str) -> Option<&SubmitResult> {
        self.entries.get(&(agent_id.to_string(), key.to_string()))
    }

    pub fn put(&mut self, agent_id: &str, key: &str, result: SubmitResult) {
        self.entries
            .insert((agent_id.to_string(), key.to_string()), result);
    }

    /// Called once per tick advance; clears the cache every
    /// [`FLUSH_INTERVAL_TICKS`] ticks.
    pub fn maybe_flush(&mut self, current_tick: u64) {
        if current_tick >= self.last_flush_tick + FLUSH_INTERVAL_TICKS {
            self.entries.clear();
            self.last_flush_tick = current_tick;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::SubmitResult;

    #[test]
    fn replayed_key_returns_cached_result() {
        let mut cache = IdempotencyCache::new();
        let result = SubmitResult {
            tick_id: 0,
            results: vec![],
        };
        cache.put("agent-1", "key-a", result.clone());
        let fetched = cache.get("agent-1", "key-a").unwrap();
        assert_eq!(fetched.tick_id, result.tick_id);
    }

    #[test]
    fn different_agents_do_not_collide_on_same_key() {
        let mut cache = IdempotencyCache::new();
        cache.put(
            "agent-1",
            "key-a",
            SubmitResult {
                tick_id: 0,
                results: vec![],
            },
        );
        assert!(cache.get("agent-2", "key-a").is_none());
    }

    #[test]
    fn flush_clears_after_interval() {
        let mut cache = IdempotencyCache::new();
        cache.put(
            "agent-1",
            "key-a",
            SubmitResult {
                tick_id: 0,
                results: vec![],
            },
        );
        cache.maybe_flush(50);
        assert!(cache.get("agent-1", "key-a").is_some());
        cache.maybe_flush(100);
        assert!(cache.get("agent-1", "key-a").is_none());
    }
}

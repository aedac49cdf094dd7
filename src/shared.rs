//! Single-owner lock wrapper for embedding applications.
//!
//! §5 of the design requires that the kernel itself stay a plain,
//! un-synchronized struct — any locking is the embedding application's
//! concern, layered on top rather than built into [`crate::kernel::Kernel`].
//! This mirrors the teacher's own pattern of wrapping shared engine state in
//! `parking_lot::RwLock`/`Mutex` from the outside (see `main.rs`'s
//! `ParkingRwLock` usage) rather than making the engine type interior-mutable.

use parking_lot::Mutex;

use crate::kernel::{Action, Kernel, SubmitResult};
use crate::KernelError;

/// A [`Kernel`] behind a `parking_lot::Mutex`, safe to share across threads
/// or async tasks via an `Arc`. Every call simply locks, delegates, unlocks —
/// the kernel itself never suspends mid-call (§5), so lock hold times are
/// bounded by a single tick's worth of work.
pub struct SharedKernel {
    inner: Mutex<Kernel>,
}

impl SharedKernel {
    pub fn new(kernel: Kernel) -> Self {
        SharedKernel {
            inner: Mutex::new(kernel),
        }
    }

    pub fn submit_actions(
        &self,
        agent_id: &str,
        actions: Vec<Action>,
        idempotency_key: &str,
    ) -> SubmitResult {
        self.inner.lock().submit_actions(agent_id, actions, idempotency_key)
    }

    pub fn advance_tick(&self) -> Result<(), KernelError> {
        self.inner.lock().advance_tick()
    }

    /// Run a read-only query against the locked kernel, returning an owned
    /// value (queries must never leak a reference tied to the lock guard).
    pub fn with_kernel<T>(&self, f: impl FnOnce(&Kernel) -> T) -> T {
        f(&self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Side;
    use crate::{Amount, RunConfig};

    fn config() -> RunConfig {
        RunConfig {
            initial_cash: Amount::parse("1000").unwrap(),
            initial_asset: Amount::parse("10").unwrap(),
            trading_fee_bps: 0,
            decay_rate_bps: 0,
            decay_interval_ticks: 0,
            max_actions_per_tick: 5,
            min_price: Amount::parse("0.01").unwrap(),
            max_price: Amount::parse("100000").unwrap(),
            min_quantity: Amount::parse("0.00000001").unwrap(),
        }
    }

    #[test]
    fn shared_kernel_serializes_calls_through_the_lock() {
        let mut kernel = Kernel::new("run-shared", config(), 1).unwrap();
        kernel.start().unwrap();
        let agent = kernel.create_agent("alice");
        let shared = SharedKernel::new(kernel);

        shared.submit_actions(
            &agent.agent_id,
            vec![Action::PlaceLimitOrder {
                side: Side::Ask,
                price: "10".to_string(),
                quantity: "1".to_string(),
            }],
            "k1",
        );
        shared.advance_tick().unwrap();

        let tick = shared.with_kernel(|k| k.current_tick());
        assert_eq!(tick, 1);
    }
}

//! Deterministic, event-sourced multi-agent market simulation kernel.
//!
//! The kernel is the single owner of world state and the event log; every
//! observable transition flows through [`kernel::Kernel::submit_actions`] and
//! [`kernel::Kernel::advance_tick`]. Given the same `(config, seed, ordered
//! actions)` two kernels produce byte-identical event hash chains.

pub mod amount;
pub mod config;
pub mod error;
pub mod events;
pub mod idempotency;
pub mod kernel;
pub mod matching;
pub mod rng;
pub mod shared;
pub mod world;

pub use amount::Amount;
pub use config::RunConfig;
pub use error::{KernelError, RejectionReason};
pub use kernel::{Action, ActionResult, Kernel, SubmitResult};
pub use shared::SharedKernel;

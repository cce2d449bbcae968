//! Store Client Module
//!
//! The access layer between a worker and the partitioned store.
//!
//! ## Core Concepts
//! - **Transport**: the carrier of operations to the store. In-process runs
//!   use `LocalTransport`; a deployment would swap in an RPC-backed
//!   implementation behind the same trait. Carrier failures surface as
//!   `StoreError::Transport` and are never retried by the client.
//! - **Route retry**: a split racing an operation answers
//!   `MigrationInProgress`; the client re-resolves with jittered backoff a
//!   bounded number of times before surfacing the error. Retries reuse the
//!   operation id, so the store absorbs replays instead of double-applying.

pub mod store_client;
pub mod transport;

#[cfg(test)]
mod tests;

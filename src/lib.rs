//! A small banking ledger: accounts holding a non-negative balance in minor currency units,
//! deposits, withdrawals and transfers applied atomically, and a per-account transaction history.
//!
//! The [`ledger`] module holds the domain and the storage contracts, [`io`] the CSV adapters,
//! and [`processors`] the batch driver used by the binary.

pub mod config;
pub mod io;
pub mod ledger;
pub mod processors;
pub mod telemetry;

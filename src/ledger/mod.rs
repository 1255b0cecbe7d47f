//! This module contains the domain logic of the ledger
//!
//! The [`LedgerEngine`] implements the [`Ledger`] operations (deposit, withdrawal and transfer) as
//! atomic units of work over a [`LedgerStore`], which owns the account balances ([`AccountStore`])
//! and the append-only history of every account ([`TransactionLog`]).
//!
//! The [`MemoryLedgerStore`] is an implementation of a [`LedgerStore`] that uses memory to store
//! accounts and transactions, locking account rows individually.
//

mod account;
mod amount;
mod command;
mod engine;
mod error;
mod memory;
mod store;
mod transaction;

pub use account::{Account, AccountId, AccountStore, Precondition};
pub use amount::{Amount, MINOR_UNIT_SCALE};
pub use command::LedgerCommand;
pub use engine::{history, BalanceReceipt, Ledger, LedgerEngine, TransferReceipt};
pub use error::{AccountIdError, AmountError, LedgerError, Result, StoreError, StoreResult};
pub use memory::MemoryLedgerStore;
pub use store::{LedgerStore, StoreTransaction};
pub use transaction::{
  NewTransaction, Page, Transaction, TransactionId, TransactionKind, TransactionLog,
};

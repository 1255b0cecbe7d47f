use async_trait::async_trait;

use super::{
  account::{Account, AccountId, AccountStore},
  amount::Amount,
  error::StoreResult,
  transaction::{Page, Transaction, TransactionLog},
};

/// An all-or-nothing unit of work over a fixed set of accounts.
///
/// Balance adjustments and log entries staged through it become visible together on
/// [`StoreTransaction::commit`]. Dropping the unit without committing aborts it and
/// releases the accounts it holds, leaving no trace.
#[async_trait]
pub trait StoreTransaction: AccountStore + TransactionLog + Send {
  /// Applies the staged changes and returns the appended entries as stored, in append order.
  async fn commit(self: Box<Self>) -> StoreResult<Vec<Transaction>>;
}

/// Interface implemented by the storage backends of the ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
  /// Starts a unit of work holding exclusive access to `accounts` until it is committed or dropped.
  /// Implementations must acquire the accounts in ascending [`AccountId`] order,
  /// so that concurrent units over the same pair of accounts can not deadlock.
  async fn begin<'a>(
    &'a self,
    accounts: &[AccountId],
  ) -> StoreResult<Box<dyn StoreTransaction + 'a>>;

  /// Creates an account with a zero balance.
  async fn open_account(&self, account_id: &AccountId) -> StoreResult<Account>;

  async fn account_exists(&self, account_id: &AccountId) -> StoreResult<bool>;

  /// Last committed balance of the account.
  async fn get_balance(&self, account_id: &AccountId) -> StoreResult<Amount>;

  /// Committed entries of the account, most recent first.
  async fn list_by_account(&self, account_id: &AccountId, page: Page)
    -> StoreResult<Vec<Transaction>>;

  /// Every account ordered by id.
  async fn accounts(&self) -> StoreResult<Vec<Account>>;
}

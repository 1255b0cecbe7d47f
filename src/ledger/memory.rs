use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use super::{
  account::{Account, AccountId, AccountStore, Precondition},
  amount::Amount,
  error::{StoreError, StoreResult},
  store::{LedgerStore, StoreTransaction},
  transaction::{NewTransaction, Page, Transaction, TransactionId, TransactionLog},
};

#[derive(Debug)]
struct AccountRow {
  balance: Amount,
  opened_at: DateTime<Utc>,
}

/// Implementation of the [`LedgerStore`] that keeps accounts and the transaction log in memory.
///
/// Every account row has its own lock. A unit of work locks the rows it touches in ascending
/// id order, stages its changes, and applies them all at once on commit while still holding the
/// locks, so operations on the same account are serialized and unrelated accounts never contend.
/// The log of an account is only written while its row is locked.
#[derive(Debug)]
pub struct MemoryLedgerStore {
  accounts: DashMap<AccountId, Arc<Mutex<AccountRow>>>,
  log: DashMap<AccountId, Vec<Transaction>>,
  next_transaction_id: AtomicU64,
}

impl MemoryLedgerStore {
  pub fn new() -> Self {
    Self {
      accounts: DashMap::new(),
      log: DashMap::new(),
      next_transaction_id: AtomicU64::new(1),
    }
  }

  fn row(&self, account_id: &AccountId) -> StoreResult<Arc<Mutex<AccountRow>>> {
    self
      .accounts
      .get(account_id)
      .map(|row| Arc::clone(row.value()))
      .ok_or_else(|| StoreError::AccountNotFound(account_id.clone()))
  }

  fn next_transaction_id(&self) -> TransactionId {
    self.next_transaction_id.fetch_add(1, Ordering::SeqCst)
  }

  /// Seeds an account with a balance, bypassing the transaction log.
  #[cfg(test)]
  pub(crate) fn insert_account(&self, account_id: &str, minor_units: i64) -> AccountId {
    let account_id = AccountId::parse(account_id).unwrap();
    self.accounts.insert(
      account_id.clone(),
      Arc::new(Mutex::new(AccountRow {
        balance: Amount::from_minor_units(minor_units),
        opened_at: Utc::now(),
      })),
    );
    account_id
  }
}

impl Default for MemoryLedgerStore {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
  async fn begin<'a>(
    &'a self,
    accounts: &[AccountId],
  ) -> StoreResult<Box<dyn StoreTransaction + 'a>> {
    let mut account_ids = accounts.to_vec();
    account_ids.sort();
    account_ids.dedup();

    // Resolve every row before locking any, so a missing account fails without waiting.
    let rows = account_ids
      .into_iter()
      .map(|account_id| self.row(&account_id).map(|row| (account_id, row)))
      .collect::<StoreResult<Vec<_>>>()?;

    let mut locked = BTreeMap::new();
    for (account_id, row) in rows {
      trace!(account = %account_id, "Locking account row");
      locked.insert(account_id, row.lock_owned().await);
    }

    Ok(Box::new(MemoryTransaction {
      store: self,
      rows: locked,
      staged: HashMap::new(),
      entries: Vec::new(),
    }))
  }

  async fn open_account(&self, account_id: &AccountId) -> StoreResult<Account> {
    match self.accounts.entry(account_id.clone()) {
      Entry::Occupied(_) => Err(StoreError::AccountExists(account_id.clone())),
      Entry::Vacant(entry) => {
        let opened_at = Utc::now();
        entry.insert(Arc::new(Mutex::new(AccountRow {
          balance: Amount::ZERO,
          opened_at,
        })));
        Ok(Account {
          id: account_id.clone(),
          balance: Amount::ZERO,
          opened_at,
        })
      }
    }
  }

  async fn account_exists(&self, account_id: &AccountId) -> StoreResult<bool> {
    Ok(self.accounts.contains_key(account_id))
  }

  async fn get_balance(&self, account_id: &AccountId) -> StoreResult<Amount> {
    let row = self.row(account_id)?;
    let balance = row.lock().await.balance;
    Ok(balance)
  }

  async fn list_by_account(
    &self,
    account_id: &AccountId,
    page: Page,
  ) -> StoreResult<Vec<Transaction>> {
    let row = self.row(account_id)?;
    let _guard = row.lock().await;
    let entries = match self.log.get(account_id) {
      Some(entries) => page.slice(entries.iter().rev().cloned()),
      None => Vec::new(),
    };
    Ok(entries)
  }

  /// Reads every row in id order, waiting on each row lock in turn. Rows are released as soon as
  /// they are read, so the report is consistent per account but not a point-in-time snapshot
  /// across accounts.
  async fn accounts(&self) -> StoreResult<Vec<Account>> {
    let mut rows = self
      .accounts
      .iter()
      .map(|row| (row.key().clone(), Arc::clone(row.value())))
      .collect::<Vec<_>>();
    rows.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut accounts = Vec::with_capacity(rows.len());
    for (id, row) in rows {
      let row = row.lock().await;
      accounts.push(Account {
        id,
        balance: row.balance,
        opened_at: row.opened_at,
      });
    }
    Ok(accounts)
  }
}

/// A unit of work of the [`MemoryLedgerStore`].
struct MemoryTransaction<'a> {
  store: &'a MemoryLedgerStore,
  rows: BTreeMap<AccountId, OwnedMutexGuard<AccountRow>>,
  staged: HashMap<AccountId, Amount>,
  entries: Vec<NewTransaction>,
}

impl<'a> MemoryTransaction<'a> {
  fn current_balance(&self, account_id: &AccountId) -> StoreResult<Amount> {
    match self.staged.get(account_id) {
      Some(balance) => Ok(*balance),
      None => self
        .rows
        .get(account_id)
        .map(|row| row.balance)
        .ok_or_else(|| StoreError::OutOfScope(account_id.clone())),
    }
  }
}

#[async_trait]
impl<'a> AccountStore for MemoryTransaction<'a> {
  async fn get_balance(&mut self, account_id: &AccountId) -> StoreResult<Amount> {
    self.current_balance(account_id)
  }

  async fn adjust_balance(
    &mut self,
    account_id: &AccountId,
    delta: Amount,
    precondition: Precondition,
  ) -> StoreResult<Amount> {
    let balance = self.current_balance(account_id)?;
    if !precondition.holds(balance) {
      return Err(StoreError::PreconditionFailed {
        account_id: account_id.clone(),
        balance,
      });
    }
    let updated = balance
      .checked_add(delta)
      .ok_or_else(|| StoreError::BalanceOverflow(account_id.clone()))?;
    self.staged.insert(account_id.clone(), updated);
    Ok(updated)
  }
}

#[async_trait]
impl<'a> TransactionLog for MemoryTransaction<'a> {
  async fn append(&mut self, entry: NewTransaction) -> StoreResult<()> {
    if !self.rows.contains_key(entry.account_id()) {
      return Err(StoreError::OutOfScope(entry.account_id().clone()));
    }
    self.entries.push(entry);
    Ok(())
  }
}

#[async_trait]
impl<'a> StoreTransaction for MemoryTransaction<'a> {
  async fn commit(self: Box<Self>) -> StoreResult<Vec<Transaction>> {
    let MemoryTransaction {
      store,
      mut rows,
      staged,
      entries,
    } = *self;

    if let Some((account_id, _)) = staged.iter().find(|(_, balance)| balance.is_negative()) {
      return Err(StoreError::NegativeBalance(account_id.clone()));
    }

    for (account_id, balance) in staged {
      if let Some(row) = rows.get_mut(&account_id) {
        row.balance = balance;
      }
    }
    // Stamped while the rows are still locked, so ids follow commit order.
    let committed_at = Utc::now();
    let committed = entries
      .into_iter()
      .map(|entry| entry.into_transaction(store.next_transaction_id(), committed_at))
      .collect::<Vec<_>>();
    for entry in &committed {
      store
        .log
        .entry(entry.account_id.clone())
        .or_insert_with(Vec::new)
        .push(entry.clone());
    }

    // Rows are unlocked only once balances and entries are all in place.
    drop(rows);
    Ok(committed)
  }
}

#[cfg(test)]
mod tests {

  use std::time::Duration;

  use super::*;

  fn account(id: &str) -> AccountId {
    AccountId::parse(id).unwrap()
  }

  fn cents(minor_units: i64) -> Amount {
    Amount::from_minor_units(minor_units)
  }

  #[tokio::test]
  async fn open_account_starts_at_zero() {
    let store = MemoryLedgerStore::new();

    let opened = store.open_account(&account("alice")).await.unwrap();

    assert_eq!(opened.balance, Amount::ZERO);
    assert_eq!(store.get_balance(&opened.id).await, Ok(Amount::ZERO));
    assert_eq!(store.account_exists(&opened.id).await, Ok(true));
    assert_eq!(store.account_exists(&account("bob")).await, Ok(false));
  }

  #[tokio::test]
  async fn open_account_twice_fails() {
    let store = MemoryLedgerStore::new();
    store.insert_account("alice", 500);

    let result = store.open_account(&account("alice")).await;

    assert_eq!(result, Err(StoreError::AccountExists(account("alice"))));
    assert_eq!(store.get_balance(&account("alice")).await, Ok(cents(500)));
  }

  #[tokio::test]
  async fn get_balance_unknown_account() {
    let store = MemoryLedgerStore::new();

    let result = store.get_balance(&account("ghost")).await;

    assert_eq!(result, Err(StoreError::AccountNotFound(account("ghost"))));
  }

  #[tokio::test]
  async fn begin_with_unknown_account_fails() {
    let store = MemoryLedgerStore::new();
    let alice = store.insert_account("alice", 500);

    let result = store.begin(&[alice, account("ghost")]).await;

    assert_eq!(
      result.err(),
      Some(StoreError::AccountNotFound(account("ghost")))
    );
  }

  #[tokio::test]
  async fn adjust_balance_is_staged_until_commit() {
    let store = MemoryLedgerStore::new();
    let alice = store.insert_account("alice", 10000);

    let mut unit = store.begin(&[alice.clone()]).await.unwrap();
    let staged = unit
      .adjust_balance(&alice, cents(-3000), Precondition::AtLeast(cents(3000)))
      .await;
    assert_eq!(staged, Ok(cents(7000)));
    assert_eq!(unit.get_balance(&alice).await, Ok(cents(7000)));
    unit.commit().await.unwrap();

    assert_eq!(store.get_balance(&alice).await, Ok(cents(7000)));
  }

  #[tokio::test]
  async fn adjust_balance_precondition_failure_leaves_balance() {
    let store = MemoryLedgerStore::new();
    let alice = store.insert_account("alice", 7000);

    let mut unit = store.begin(&[alice.clone()]).await.unwrap();
    let result = unit
      .adjust_balance(&alice, cents(-8000), Precondition::AtLeast(cents(8000)))
      .await;

    assert_eq!(
      result,
      Err(StoreError::PreconditionFailed {
        account_id: alice.clone(),
        balance: cents(7000),
      })
    );
    assert_eq!(unit.get_balance(&alice).await, Ok(cents(7000)));
  }

  #[tokio::test]
  async fn adjust_balance_outside_scope_fails() {
    let store = MemoryLedgerStore::new();
    let alice = store.insert_account("alice", 100);
    let bob = store.insert_account("bob", 100);

    let mut unit = store.begin(&[alice]).await.unwrap();
    let result = unit
      .adjust_balance(&bob, cents(100), Precondition::Always)
      .await;

    assert_eq!(result, Err(StoreError::OutOfScope(bob)));
  }

  #[tokio::test]
  async fn adjust_balance_overflow_fails() {
    let store = MemoryLedgerStore::new();
    let alice = store.insert_account("alice", i64::MAX);

    let mut unit = store.begin(&[alice.clone()]).await.unwrap();
    let result = unit
      .adjust_balance(&alice, cents(1), Precondition::Always)
      .await;

    assert_eq!(result, Err(StoreError::BalanceOverflow(alice)));
  }

  #[tokio::test]
  async fn commit_refuses_negative_balances() {
    let store = MemoryLedgerStore::new();
    let alice = store.insert_account("alice", 100);

    let mut unit = store.begin(&[alice.clone()]).await.unwrap();
    unit
      .adjust_balance(&alice, cents(-200), Precondition::Always)
      .await
      .unwrap();
    let result = unit.commit().await;

    assert_eq!(result, Err(StoreError::NegativeBalance(alice.clone())));
    assert_eq!(store.get_balance(&alice).await, Ok(cents(100)));
  }

  #[tokio::test]
  async fn dropped_unit_is_rolled_back() {
    let store = MemoryLedgerStore::new();
    let alice = store.insert_account("alice", 5000);
    let bob = store.insert_account("bob", 1000);

    {
      let mut unit = store.begin(&[alice.clone(), bob.clone()]).await.unwrap();
      unit
        .adjust_balance(&alice, cents(-2000), Precondition::AtLeast(cents(2000)))
        .await
        .unwrap();
      unit
        .append(NewTransaction::transfer_out(alice.clone(), bob.clone(), cents(2000)))
        .await
        .unwrap();
    }

    assert_eq!(store.get_balance(&alice).await, Ok(cents(5000)));
    assert_eq!(store.get_balance(&bob).await, Ok(cents(1000)));
    assert_eq!(store.list_by_account(&alice, Page::all()).await, Ok(vec![]));
  }

  #[tokio::test]
  async fn commit_assigns_increasing_ids_in_append_order() {
    let store = MemoryLedgerStore::new();
    let alice = store.insert_account("alice", 0);

    let mut unit = store.begin(&[alice.clone()]).await.unwrap();
    unit
      .append(NewTransaction::deposit(alice.clone(), cents(100)))
      .await
      .unwrap();
    unit
      .append(NewTransaction::deposit(alice.clone(), cents(200)))
      .await
      .unwrap();
    let committed = unit.commit().await.unwrap();

    assert_eq!(
      committed
        .iter()
        .map(|entry| (entry.id, entry.amount.minor_units()))
        .collect::<Vec<_>>(),
      vec![(1, 100), (2, 200)]
    );
    assert_eq!(committed[0].created_at, committed[1].created_at);
  }

  #[tokio::test]
  async fn ids_follow_commit_order_across_accounts() {
    let store = MemoryLedgerStore::new();
    let alice = store.insert_account("alice", 0);
    let bob = store.insert_account("bob", 0);

    let mut first_staged = store.begin(&[alice.clone()]).await.unwrap();
    first_staged
      .append(NewTransaction::deposit(alice.clone(), cents(100)))
      .await
      .unwrap();
    let mut second_staged = store.begin(&[bob.clone()]).await.unwrap();
    second_staged
      .append(NewTransaction::deposit(bob.clone(), cents(200)))
      .await
      .unwrap();

    let bob_entries = second_staged.commit().await.unwrap();
    let alice_entries = first_staged.commit().await.unwrap();

    assert_eq!(bob_entries[0].id, 1);
    assert_eq!(alice_entries[0].id, 2);
    assert!(alice_entries[0].created_at >= bob_entries[0].created_at);
  }

  #[tokio::test]
  async fn failed_commit_consumes_no_ids() {
    let store = MemoryLedgerStore::new();
    let alice = store.insert_account("alice", 100);

    let mut unit = store.begin(&[alice.clone()]).await.unwrap();
    unit
      .adjust_balance(&alice, cents(-200), Precondition::Always)
      .await
      .unwrap();
    unit
      .append(NewTransaction::withdraw(alice.clone(), cents(200)))
      .await
      .unwrap();
    assert!(unit.commit().await.is_err());

    let mut unit = store.begin(&[alice.clone()]).await.unwrap();
    unit
      .append(NewTransaction::deposit(alice.clone(), cents(1)))
      .await
      .unwrap();
    let committed = unit.commit().await.unwrap();

    assert_eq!(committed[0].id, 1);
  }

  #[tokio::test]
  async fn append_outside_scope_fails() {
    let store = MemoryLedgerStore::new();
    let alice = store.insert_account("alice", 0);
    let bob = store.insert_account("bob", 0);

    let mut unit = store.begin(&[alice]).await.unwrap();
    let result = unit.append(NewTransaction::deposit(bob.clone(), cents(1))).await;

    assert_eq!(result, Err(StoreError::OutOfScope(bob)));
  }

  #[tokio::test]
  async fn list_by_account_most_recent_first() {
    let store = MemoryLedgerStore::new();
    let alice = store.insert_account("alice", 0);

    for amount in 1..=7 {
      let mut unit = store.begin(&[alice.clone()]).await.unwrap();
      unit
        .append(NewTransaction::deposit(alice.clone(), cents(amount)))
        .await
        .unwrap();
      unit.commit().await.unwrap();
    }

    let amounts = |entries: Vec<Transaction>| {
      entries
        .into_iter()
        .map(|entry| entry.amount.minor_units())
        .collect::<Vec<_>>()
    };

    let all = store.list_by_account(&alice, Page::all()).await.unwrap();
    assert_eq!(amounts(all), vec![7, 6, 5, 4, 3, 2, 1]);

    let recent = store.list_by_account(&alice, Page::recent(5)).await.unwrap();
    assert_eq!(amounts(recent), vec![7, 6, 5, 4, 3]);

    let tail = store.list_by_account(&alice, Page::new(5, 5)).await.unwrap();
    assert_eq!(amounts(tail), vec![2, 1]);
  }

  #[tokio::test]
  async fn list_by_unknown_account_fails() {
    let store = MemoryLedgerStore::new();

    let result = store.list_by_account(&account("ghost"), Page::all()).await;

    assert_eq!(result, Err(StoreError::AccountNotFound(account("ghost"))));
  }

  #[tokio::test]
  async fn accounts_are_ordered_by_id() {
    let store = MemoryLedgerStore::new();
    store.insert_account("carol", 300);
    store.insert_account("alice", 100);
    store.insert_account("bob", 200);

    let accounts = store.accounts().await.unwrap();

    assert_eq!(
      accounts
        .iter()
        .map(|account| (account.id.as_str(), account.balance.minor_units()))
        .collect::<Vec<_>>(),
      vec![("alice", 100), ("bob", 200), ("carol", 300)]
    );
  }

  #[tokio::test]
  async fn units_over_the_same_account_are_serialized() {
    let store = Arc::new(MemoryLedgerStore::new());
    let alice = store.insert_account("alice", 100);

    let unit = store.begin(&[alice.clone()]).await.unwrap();

    let blocked = {
      let store = Arc::clone(&store);
      let alice = alice.clone();
      tokio::spawn(async move {
        let mut unit = store.begin(&[alice.clone()]).await.unwrap();
        let balance = unit.get_balance(&alice).await.unwrap();
        unit
          .adjust_balance(&alice, cents(-balance.minor_units()), Precondition::AtLeast(balance))
          .await
          .unwrap();
        unit.commit().await.unwrap();
        balance
      })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!blocked.is_finished());

    let mut unit = unit;
    unit
      .adjust_balance(&alice, cents(50), Precondition::Always)
      .await
      .unwrap();
    unit.commit().await.unwrap();

    assert_eq!(blocked.await.unwrap(), cents(150));
    assert_eq!(store.get_balance(&alice).await, Ok(Amount::ZERO));
  }
}
